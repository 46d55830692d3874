/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Phase 4 – per-node execution timeline.
//!
//! [`LocalScheduler`] plans one node's task set against a single resource
//! (cpu). Tasks are taken earliest-deadline-first; each scans start slots
//! from zero for the first window its cpu demand fits, and commits there
//! even when that window ends past the deadline — lateness is reported, not
//! avoided. The outcome carries per-task start/lateness, the node's total
//! idle cpu after placement, and a penalty count (one per unplaced or late
//! task).

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::envelope::NodeEnvelope;

// ── Inputs ────────────────────────────────────────────────────────────────────

/// One task as the local planner sees it: demands plus an explicit duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTask {
    pub id: String,
    pub cpu: u64,
    pub ram: u64,
    pub duration: u64,
    pub deadline: u64,
}

impl LocalTask {
    pub fn new(id: impl Into<String>, cpu: u64, ram: u64, duration: u64, deadline: u64) -> Self {
        Self {
            id: id.into(),
            cpu,
            ram,
            duration,
            deadline,
        }
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// Where one task ended up on the node's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskExecution {
    /// First occupied slot, or `None` when no window fit.
    pub start: Option<u64>,

    /// Whether the task finishes by its deadline. Always `false` for
    /// unplaced tasks.
    pub meets_deadline: bool,
}

/// Result of one local planning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOutcome {
    /// task id → execution info, in placement (deadline) order.
    pub executions: IndexMap<String, TaskExecution>,

    /// Sum of remaining cpu across all slots after placement.
    pub total_idle: u64,

    /// Count of tasks that did not fit or finished late.
    pub penalty: u64,
}

// ── LocalScheduler ────────────────────────────────────────────────────────────

/// Single-node, cpu-only timeline planner.
pub struct LocalScheduler {
    node_id: String,
    tasks: Vec<LocalTask>,
    envelope: NodeEnvelope,
    time_slots: BTreeSet<u64>,
}

impl LocalScheduler {
    /// Capture one node's planning inputs. The envelope is deep-copied; the
    /// caller's copy stays untouched.
    pub fn new(
        node_id: impl Into<String>,
        tasks: Vec<LocalTask>,
        envelope: &NodeEnvelope,
        time_slots: BTreeSet<u64>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            tasks,
            envelope: envelope.clone(),
            time_slots,
        }
    }

    /// Place every task earliest-deadline-first and report the timeline.
    pub fn solve(&self) -> LocalOutcome {
        info!(
            node = %self.node_id,
            task_count = self.tasks.len(),
            "=== LocalScheduler::solve() ==="
        );

        // Stable sort: equal deadlines keep input order.
        let mut ordered: Vec<&LocalTask> = self.tasks.iter().collect();
        ordered.sort_by_key(|t| t.deadline);

        let horizon = self.time_slots.iter().next_back().copied();
        let mut envelope = self.envelope.clone();
        let mut executions = IndexMap::new();
        let mut penalty = 0u64;

        for task in ordered {
            let mut start = horizon
                .and_then(|max_slot| (max_slot + 1).checked_sub(task.duration))
                .and_then(|last_start| {
                    (0..=last_start).find(|&s| envelope.can_fit(s, task.duration, task.cpu, 0))
                });

            if let Some(s) = start {
                // can_fit vouched for the window; a refused commit leaves the
                // task unplaced.
                if let Err(e) = envelope.commit(s, task.duration, task.cpu, 0) {
                    warn!(node = %self.node_id, task = %task.id, error = %e, "commit refused");
                    start = None;
                }
            }
            let meets_deadline = start.is_some_and(|s| s + task.duration <= task.deadline);

            match start {
                None => {
                    warn!(node = %self.node_id, task = %task.id, "no cpu window fits");
                    penalty += 1;
                }
                Some(s) if !meets_deadline => {
                    debug!(node = %self.node_id, task = %task.id, start = s, "placed but finishes late");
                    penalty += 1;
                }
                Some(s) => {
                    debug!(node = %self.node_id, task = %task.id, start = s, "✓ placed");
                }
            }

            executions.insert(
                task.id.clone(),
                TaskExecution {
                    start,
                    meets_deadline,
                },
            );
        }

        let total_idle = envelope.idle_cpu();
        info!(
            node = %self.node_id,
            total_idle,
            penalty,
            "=== Local planning complete ==="
        );

        LocalOutcome {
            executions,
            total_idle,
            penalty,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
