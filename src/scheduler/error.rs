/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the global scheduler.
//!
//! Two failure layers are modelled:
//!
//! * [`BlockedTask`] — why one ready task could not be placed in this pass
//!   (carries its exact start-time window).
//! * [`ScheduleError`] — top-level failure returned from
//!   [`GlobalScheduler::solve()`](super::GlobalScheduler::solve).
//!
//! Every variant carries enough structured data for the caller to log a
//! fully-qualified `tracing` event or serialize the reason verbatim; the
//! JSON adapter renders `ScheduleError` as the `reason` string of an
//! invalid result. **Do not** collapse these into `anyhow::Error` — the
//! structured variants are intentional.

use thiserror::Error;

// ── Blocked-task diagnostic ───────────────────────────────────────────────────

/// A ready task that found no feasible start time, with its window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTask {
    /// Task identifier.
    pub task: String,

    /// Earliest start permitted by its predecessors' finish times.
    pub earliest_start: u64,

    /// Latest start permitted by its deadline, or `None` when the duration
    /// alone exceeds the deadline.
    pub latest_start: Option<u64>,
}

impl std::fmt::Display for BlockedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.latest_start {
            Some(latest) => write!(
                f,
                "'{}' (earliest_start={}, latest_start={})",
                self.task, self.earliest_start, latest
            ),
            None => write!(
                f,
                "'{}' (earliest_start={}, duration exceeds deadline)",
                self.task, self.earliest_start
            ),
        }
    }
}

// ── Top-level scheduling errors ───────────────────────────────────────────────

/// Top-level error returned by
/// [`GlobalScheduler::solve()`](super::GlobalScheduler::solve).
///
/// Structural errors come from preflight; infeasibility from the placement
/// loop; `Internal` marks invariant breakage that indicates a bug rather
/// than bad input. No partial schedule accompanies any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// An assignment key does not name a known task.
    #[error("assignment references unknown task '{task}'")]
    UnknownTask { task: String },

    /// An assignment value does not name a known node.
    #[error("task '{task}' is assigned to unknown node '{node}'")]
    UnknownNode { task: String, node: String },

    /// A dependency endpoint does not name a known task.
    #[error("dependency ({before} → {after}) references unknown task '{unknown}'")]
    UnknownDependency {
        before: String,
        after: String,
        unknown: String,
    },

    /// The dependency set contains a cycle over the scheduled tasks.
    #[error("dependency cycle among tasks: {}", .tasks.join(", "))]
    DependencyCycle { tasks: Vec<String> },

    /// A scheduled task depends on one that is not part of the assignment,
    /// so its finish time can never be known.
    #[error("task '{task}' depends on '{predecessor}', which is not scheduled")]
    MissingPredecessor { task: String, predecessor: String },

    /// The ready set was non-empty but no ready task had a feasible start.
    #[error("no feasible start time for ready task(s): {}",
        .blocked.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    NoFeasiblePlacement { blocked: Vec<BlockedTask> },

    /// An internal invariant was violated — a bug, not an input problem.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
