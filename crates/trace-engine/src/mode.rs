//! Dashboard game modes and the engine backing each one.
//!
//! The shell keeps a `GameMode` value for whichever screen is mounted; there
//! is no global "current mode".

use serde::{Deserialize, Serialize};

/// Engine family a mode drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineKind {
    /// Sliding-tile A* solver
    Puzzle,
    /// BFS / DFS / Dijkstra traversal
    Graph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    Algo,
    Net,
    Struct,
    Bash,
    Graph,
    DpGrid,
    NumTheory,
    Sorting,
    Deadlock,
    Pipeline,
    Zebra,
    Boolean,
    Tangram,
    NPuzzle,
}

impl GameMode {
    /// Menu order
    pub const ALL: [GameMode; 14] = [
        GameMode::Algo,
        GameMode::Net,
        GameMode::Struct,
        GameMode::Bash,
        GameMode::Graph,
        GameMode::DpGrid,
        GameMode::NumTheory,
        GameMode::Sorting,
        GameMode::Deadlock,
        GameMode::Pipeline,
        GameMode::Zebra,
        GameMode::Boolean,
        GameMode::Tangram,
        GameMode::NPuzzle,
    ];

    pub fn title(self) -> &'static str {
        match self {
            GameMode::Algo => "Algorithmic Path",
            GameMode::Net => "NetConfig 42",
            GameMode::Struct => "DataStruct Duel",
            GameMode::Bash => "ShellScript Scramble",
            GameMode::Graph => "Graph Theory Quest",
            GameMode::DpGrid => "Dynamic Grid",
            GameMode::NumTheory => "Number Theory",
            GameMode::Sorting => "Sorting Wars",
            GameMode::Deadlock => "Deadlock Manager",
            GameMode::Pipeline => "Pipeline Flow",
            GameMode::Zebra => "Zebra Deduction",
            GameMode::Boolean => "Boolean Builder",
            GameMode::Tangram => "Tangram Geo",
            GameMode::NPuzzle => "n-Puzzle",
        }
    }

    /// Topic shown under the title
    pub fn topic(self) -> &'static str {
        match self {
            GameMode::Algo => "Visual Logic & Recursion",
            GameMode::Net => "IPs & Routing Protocols",
            GameMode::Struct => "Time Complexity (Big O)",
            GameMode::Bash => "Bash & Piping",
            GameMode::Graph => "BFS, DFS, Dijkstra",
            GameMode::DpGrid => "Dynamic Programming",
            GameMode::NumTheory => "Primes & Modular Math",
            GameMode::Sorting => "Algorithm Visualization",
            GameMode::Deadlock => "Mutex & Race Conditions",
            GameMode::Pipeline => "Async Data Streams",
            GameMode::Zebra => "Constraint Satisfaction",
            GameMode::Boolean => "Logic Gates & Circuits",
            GameMode::Tangram => "Spatial Reasoning",
            GameMode::NPuzzle => "Heuristic Search",
        }
    }

    /// Engine in this crate that backs the mode, if any
    pub fn engine(self) -> Option<EngineKind> {
        match self {
            GameMode::Graph => Some(EngineKind::Graph),
            GameMode::NPuzzle => Some(EngineKind::Puzzle),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_backed_modes() {
        let backed: Vec<_> = GameMode::ALL
            .into_iter()
            .filter_map(|mode| mode.engine().map(|engine| (mode, engine)))
            .collect();
        assert_eq!(
            backed,
            vec![
                (GameMode::Graph, EngineKind::Graph),
                (GameMode::NPuzzle, EngineKind::Puzzle)
            ]
        );
    }

    #[test]
    fn test_mode_json_names() {
        assert_eq!(serde_json::to_string(&GameMode::NPuzzle).unwrap(), "\"N_PUZZLE\"");
        assert_eq!(
            serde_json::from_str::<GameMode>("\"DP_GRID\"").unwrap(),
            GameMode::DpGrid
        );
        assert_eq!(GameMode::Graph.topic(), "BFS, DFS, Dijkstra");
    }
}
