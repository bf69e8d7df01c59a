//! Step traces shared by both engines.
//!
//! A run records every atomic event into a [`Trace`] and hands it back
//! complete. Renderers walk the trace with a cursor
//! ([`crate::playback::Playback`]) and rebuild what to draw by replaying a
//! step prefix onto a [`Replay`] view, so no engine state is needed after the
//! call returns.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Resource, Result};

/// One event emitted during a run.
///
/// `I` identifies nodes (search ids for the puzzle engine, graph node ids
/// for traversals) and `E` names the edge that was relaxed (a move or an
/// edge index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AlgorithmStep<I, E> {
    /// A node was taken off the frontier and finalised
    NodeVisited { id: I },
    /// A strictly shorter distance to `to` was found through `from`
    #[serde(rename_all = "camelCase")]
    EdgeRelaxed {
        from: I,
        to: I,
        new_distance: u64,
        via: E,
    },
    /// Pending nodes, in the order they will be taken
    FrontierUpdated { ids: Vec<I> },
    /// Final path from the start node to the target
    PathReconstructed { ids: Vec<I> },
}

impl<I, E> AlgorithmStep<I, E> {
    pub fn is_visit(&self) -> bool {
        matches!(self, AlgorithmStep::NodeVisited { .. })
    }

    pub fn is_relaxation(&self) -> bool {
        matches!(self, AlgorithmStep::EdgeRelaxed { .. })
    }
}

/// A view that can be rebuilt step by step from a trace.
///
/// Applying steps must depend only on the view and the step, so the view
/// after any prefix is a pure function of that prefix.
pub trait Replay: Clone {
    type Id;
    type Edge;
    type Summary;

    /// Apply step number `index`, rejecting steps that do not fit the view.
    fn apply(&mut self, index: usize, step: &AlgorithmStep<Self::Id, Self::Edge>) -> Result<()>;

    /// Result summary implied by the steps applied so far.
    fn summarize(&self) -> Self::Summary;
}

/// Complete, immutable record of one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace<I, E, S> {
    steps: Vec<AlgorithmStep<I, E>>,
    summary: S,
}

impl<I, E, S> Trace<I, E, S> {
    pub(crate) fn new(steps: Vec<AlgorithmStep<I, E>>, summary: S) -> Self {
        Self { steps, summary }
    }

    /// Rebuild a trace from a bare step list by replaying it onto `initial`.
    ///
    /// The summary is derived from the replayed view, so a serialized step
    /// list is enough to restore a run without invoking the engine again.
    pub fn from_steps<V>(initial: V, steps: Vec<AlgorithmStep<I, E>>) -> Result<Self>
    where
        V: Replay<Id = I, Edge = E, Summary = S>,
    {
        let mut view = initial;
        for (index, step) in steps.iter().enumerate() {
            view.apply(index, step)?;
        }
        Ok(Self::new(steps, view.summarize()))
    }

    pub fn steps(&self) -> &[AlgorithmStep<I, E>] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&AlgorithmStep<I, E>> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn summary(&self) -> &S {
        &self.summary
    }

    pub fn into_parts(self) -> (Vec<AlgorithmStep<I, E>>, S) {
        (self.steps, self.summary)
    }
}

/// Bounded step log used while an engine runs.
#[derive(Debug)]
pub(crate) struct Recorder<I, E> {
    steps: Vec<AlgorithmStep<I, E>>,
    limit: usize,
    /// Ids carried by `FrontierUpdated` and `PathReconstructed` so far
    entries: usize,
    entry_limit: usize,
}

impl<I, E> Recorder<I, E> {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            steps: Vec::new(),
            limit,
            entries: 0,
            entry_limit: usize::MAX,
        }
    }

    /// Also bound the total number of ids in list-carrying steps.
    pub(crate) fn with_entry_limit(mut self, entry_limit: usize) -> Self {
        self.entry_limit = entry_limit;
        self
    }

    pub(crate) fn record(&mut self, step: AlgorithmStep<I, E>) -> Result<()> {
        if self.steps.len() >= self.limit {
            tracing::warn!(limit = self.limit, "trace step limit reached, aborting run");
            return Err(EngineError::ResourceExhausted {
                resource: Resource::TraceSteps,
                limit: self.limit,
            });
        }
        let carried = match &step {
            AlgorithmStep::FrontierUpdated { ids } | AlgorithmStep::PathReconstructed { ids } => {
                ids.len()
            }
            _ => 0,
        };
        let entries = self.entries.saturating_add(carried);
        if entries > self.entry_limit {
            tracing::warn!(
                limit = self.entry_limit,
                "trace entry limit reached, aborting run"
            );
            return Err(EngineError::ResourceExhausted {
                resource: Resource::TraceEntries,
                limit: self.entry_limit,
            });
        }
        self.entries = entries;
        self.steps.push(step);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn finish<S>(self, summary: S) -> Trace<I, E, S> {
        Trace::new(self.steps, summary)
    }
}
