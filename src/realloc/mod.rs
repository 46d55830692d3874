//! Phase 3 – event-driven schedule repair.
//!
//! [`DynamicReallocator`] mutates a working copy of an existing schedule in
//! response to a [`FleetEvent`] stream:
//!
//! * [`FleetEvent::NodeFailure`] evicts every task scheduled on the failed
//!   node and removes the node's envelope entirely.
//! * [`FleetEvent::NewTask`] appends the task to the registry and queues it
//!   for placement. Its duration comes from the shared duration map the
//!   reallocator was constructed with (defaulting to one slot) — the task
//!   record itself carries no duration and none is inferred from it.
//!
//! All events are applied first, building the re-placement queue in
//! encounter order; placement then runs greedily per queued task: nodes are
//! scanned in caller input order and each node's start slots from zero
//! upward, committing at the first window the envelope admits. Every
//! successful placement bumps the change penalty, the proxy for how much
//! the repair disrupted the plan. Tasks with no feasible window stay in the
//! failed list; they are not retried.
//!
//! This is best-effort local repair: re-placed tasks are not re-checked
//! against dependency order, so a repaired schedule can violate
//! `finish(pred) ≤ start(succ)` for re-placed pairs.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::envelope::EnvelopeMap;
use crate::task::{duration_of, Node, Placement, Schedule, Task};

// ── Events ────────────────────────────────────────────────────────────────────

/// A runtime change the planner must absorb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEvent {
    /// A node left the fleet; everything scheduled on it must move.
    NodeFailure(String),

    /// A task arrived after planning; it must be fitted into spare capacity.
    NewTask(Task),
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of applying one event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReallocOutcome {
    /// The repaired schedule.
    pub schedule: Schedule,

    /// Every task the repair attempted to (re-)place — evictions then
    /// arrivals, in encounter order.
    pub reassigned: Vec<String>,

    /// Tasks with no feasible placement, in encounter order, deduplicated.
    pub failed: Vec<String>,

    /// Phase-1 cost plus the change penalty.
    pub total_cost: i64,

    /// Number of placements performed during the repair.
    pub change_penalty: u64,
}

// ── DynamicReallocator ────────────────────────────────────────────────────────

/// Owns a mutable working copy of the schedule and its residual envelopes.
pub struct DynamicReallocator {
    tasks: IndexMap<String, Task>,
    nodes: Vec<Node>,
    schedule: Schedule,
    envelopes: EnvelopeMap,
    durations: HashMap<String, u64>,
    phase1_cost: i64,
    change_penalty: u64,
}

impl DynamicReallocator {
    /// Seed the working state. `envelopes` is the residual capacity left by
    /// the global scheduler; both it and the schedule are deep-copied.
    pub fn new(
        tasks: &[Task],
        nodes: &[Node],
        schedule: &Schedule,
        envelopes: &EnvelopeMap,
        durations: HashMap<String, u64>,
        phase1_cost: i64,
    ) -> Self {
        Self {
            tasks: tasks.iter().map(|t| (t.id.clone(), t.clone())).collect(),
            nodes: nodes.to_vec(),
            schedule: schedule.clone(),
            envelopes: envelopes.clone(),
            durations,
            phase1_cost,
            change_penalty: 0,
        }
    }

    /// Apply `events` in order, then re-place everything they displaced.
    pub fn apply(&mut self, events: Vec<FleetEvent>) -> ReallocOutcome {
        info!(
            event_count = events.len(),
            scheduled = self.schedule.len(),
            "=== DynamicReallocator::apply() ==="
        );

        let queue = self.ingest_events(events);
        let mut failed: Vec<String> = Vec::new();

        for task_id in &queue {
            if self.place(task_id) {
                debug!(task = %task_id, "✓ re-placed");
            } else {
                warn!(task = %task_id, "✗ no surviving node admits task");
                if !failed.contains(task_id) {
                    failed.push(task_id.clone());
                }
            }
        }

        let total_cost = self.phase1_cost + self.change_penalty as i64;
        info!(
            reassigned = queue.len(),
            failed = failed.len(),
            change_penalty = self.change_penalty,
            total_cost,
            "=== Reallocation complete ==="
        );

        ReallocOutcome {
            schedule: self.schedule.clone(),
            reassigned: queue,
            failed,
            total_cost,
            change_penalty: self.change_penalty,
        }
    }

    /// Apply every event to the working state and return the re-placement
    /// queue in encounter order.
    fn ingest_events(&mut self, events: Vec<FleetEvent>) -> Vec<String> {
        let mut queue: Vec<String> = Vec::new();

        for event in events {
            match event {
                FleetEvent::NodeFailure(node_id) => {
                    let evicted: Vec<String> = self
                        .schedule
                        .iter()
                        .filter(|(_, placement)| placement.node == node_id)
                        .map(|(task_id, _)| task_id.clone())
                        .collect();
                    for task_id in &evicted {
                        self.schedule.shift_remove(task_id);
                    }
                    if self.envelopes.shift_remove(&node_id).is_none() {
                        warn!(node = %node_id, "failure event for node without envelope");
                    }
                    info!(
                        node = %node_id,
                        evicted = evicted.len(),
                        "node failed, tasks queued for re-placement"
                    );
                    queue.extend(evicted);
                }
                FleetEvent::NewTask(task) => {
                    debug!(task = %task.id, "new task queued for placement");
                    if self.tasks.insert(task.id.clone(), task.clone()).is_some() {
                        warn!(task = %task.id, "arrival replaces existing task record");
                    }
                    queue.push(task.id);
                }
            }
        }

        queue
    }

    /// First-fit placement: nodes in input order, start slots from zero.
    /// Returns `false` when no surviving node admits the task by its
    /// deadline.
    fn place(&mut self, task_id: &str) -> bool {
        let Some(task) = self.tasks.get(task_id).cloned() else {
            warn!(task = %task_id, "queued task missing from registry");
            return false;
        };
        let duration = duration_of(&self.durations, task_id);
        let Some(latest_start) = task.deadline.checked_sub(duration) else {
            return false;
        };

        for node in &self.nodes {
            let Some(envelope) = self.envelopes.get_mut(&node.id) else {
                continue; // failed or never-enveloped node
            };
            for start in 0..=latest_start {
                if !envelope.can_fit(start, duration, task.cpu, task.ram) {
                    continue;
                }
                if envelope.commit(start, duration, task.cpu, task.ram).is_err() {
                    // can_fit just vouched for the window; treat as no fit.
                    continue;
                }
                self.schedule.insert(
                    task_id.to_string(),
                    Placement {
                        node: node.id.clone(),
                        start,
                    },
                );
                self.change_penalty += 1;
                return true;
            }
        }

        false
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
