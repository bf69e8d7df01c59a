//! CLI entry point for the trace engines.
//!
//! Usage:
//!   trace-engine solve <board.json> [options]
//!   trace-engine traverse <graph.json> --source <ID> [options]
//!   trace-engine replay <trace.json> --kind puzzle|graph [--at <N>]
//!   trace-engine modes
//!
//! Every command prints JSON on stdout. Logs go to stderr and are filtered
//! with `RUST_LOG` (default: `warn`).

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use trace_engine::{
    run, solve, Algorithm, EngineError, EngineKind, GameMode, GraphTrace, Playback, PuzzleState,
    PuzzleTrace, Replay, SolveOutcome, SolverConfig, Trace, TraversalConfig,
};

#[derive(Parser)]
#[command(name = "trace-engine")]
#[command(about = "Replayable traces for sliding-tile search and graph traversal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a sliding-tile board with A* and print the trace
    Solve {
        /// Path to board JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read board from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// Maximum pending frontier entries
        #[arg(long, default_value = "500000")]
        max_frontier: usize,

        /// Maximum recorded trace steps
        #[arg(long, default_value = "1000000")]
        max_steps: usize,
    },
    /// Traverse a graph and print the trace
    Traverse {
        /// Path to graph JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read graph from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// Start node
        #[arg(long)]
        source: String,

        /// Stop at this node and reconstruct the path to it
        #[arg(long)]
        target: Option<String>,

        /// bfs, dfs or dijkstra
        #[arg(long, default_value = "dijkstra")]
        algorithm: Algorithm,

        /// Maximum recorded trace steps
        #[arg(long, default_value = "100000")]
        max_steps: usize,

        /// Maximum node ids across all recorded frontier snapshots
        #[arg(long, default_value = "1000000")]
        max_frontier_entries: usize,
    },
    /// Replay a serialized trace and print the view at a cursor position
    Replay {
        /// Path to trace JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Which engine produced the trace
        #[arg(long, value_enum)]
        kind: TraceKind,

        /// Number of steps to apply (default: all)
        #[arg(long)]
        at: Option<usize>,
    },
    /// List the dashboard game modes
    Modes,
}

#[derive(Clone, Copy, ValueEnum)]
enum TraceKind {
    Puzzle,
    Graph,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("must provide either a file path or --stdin")]
    NoInput,
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Board request for `solve`
#[derive(Debug, Deserialize)]
struct SolveRequest {
    initial: PuzzleState,
    /// Canonical goal when absent
    #[serde(default)]
    goal: Option<PuzzleState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplayOutput<'a, V: Serialize> {
    position: usize,
    length: usize,
    /// Step applied last, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<serde_json::Value>,
    view: &'a V,
    /// Whether the stored summary agrees with a full replay of the steps
    summary_matches: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModeOutput {
    mode: GameMode,
    title: &'static str,
    topic: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<EngineKind>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match execute(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn execute(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Solve {
            file,
            stdin,
            max_frontier,
            max_steps,
        } => {
            let request: SolveRequest = serde_json::from_str(&read_input(file, stdin)?)?;
            let goal = match request.goal {
                Some(goal) => goal,
                None => PuzzleState::solved(request.initial.size())?,
            };
            let config = SolverConfig {
                max_frontier,
                max_steps,
            };

            let outcome = solve(&request.initial, &goal, &config)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            Ok(match outcome {
                SolveOutcome::Solved(_) => ExitCode::SUCCESS,
                SolveOutcome::Unsolvable(_) => ExitCode::from(1),
            })
        }
        Commands::Traverse {
            file,
            stdin,
            source,
            target,
            algorithm,
            max_steps,
            max_frontier_entries,
        } => {
            let graph = serde_json::from_str(&read_input(file, stdin)?)?;
            let config = TraversalConfig {
                algorithm,
                target: target.map(Into::into),
                max_steps,
                max_frontier_entries,
            };

            let trace = run(&graph, &source.into(), &config)?;
            println!("{}", serde_json::to_string_pretty(&trace)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Replay { file, kind, at } => {
            let json = read_input(Some(file), false)?;
            match kind {
                TraceKind::Puzzle => {
                    let trace: PuzzleTrace = serde_json::from_str(&json)?;
                    let playback = trace.playback();
                    print_replay(&trace, playback, at, trace.initial_view())?;
                }
                TraceKind::Graph => {
                    let trace: GraphTrace = serde_json::from_str(&json)?;
                    let playback = trace.playback()?;
                    print_replay(&trace, playback, at, trace.initial_view()?)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Modes => {
            let modes: Vec<_> = GameMode::ALL
                .into_iter()
                .map(|mode| ModeOutput {
                    mode,
                    title: mode.title(),
                    topic: mode.topic(),
                    engine: mode.engine(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&modes)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_replay<V>(
    trace: &Trace<V::Id, V::Edge, V::Summary>,
    mut playback: Playback<'_, V>,
    at: Option<usize>,
    initial: V,
) -> Result<(), CliError>
where
    V: Replay + Serialize,
    V::Id: Clone + Serialize,
    V::Edge: Clone + Serialize,
    V::Summary: PartialEq,
{
    let rebuilt = Trace::from_steps(initial, trace.steps().to_vec())?;

    playback.seek(at.unwrap_or(trace.len()))?;
    let step = match playback.current_step() {
        Some(step) => Some(serde_json::to_value(step)?),
        None => None,
    };

    let output = ReplayOutput {
        position: playback.position(),
        length: playback.len(),
        step,
        view: playback.view(),
        summary_matches: rebuilt.summary() == trace.summary(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_input(file: Option<PathBuf>, stdin: bool) -> Result<String, CliError> {
    if stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|source| CliError::Read {
                path: "stdin".to_string(),
                source,
            })?;
        Ok(buffer)
    } else if let Some(path) = file {
        fs::read_to_string(&path).map_err(|source| CliError::Read {
            path: path.display().to_string(),
            source,
        })
    } else {
        Err(CliError::NoInput)
    }
}
