//! Phase 2 – dependency-aware global list scheduling.
//!
//! [`GlobalScheduler`] consumes the Phase-1 assignment plus dependencies,
//! durations and per-node resource envelopes, and gives every task a start
//! time. Placement is dynamic list scheduling over a ready set:
//!
//! 1. A task is *ready* once all of its predecessors are scheduled.
//! 2. Each ready task gets an earliest-feasible start by linear search over
//!    its `[earliest_start, latest_start]` window, testing the allowed-slot
//!    set and the node's envelope for every slot of its duration.
//! 3. Among placeable ready tasks, the lexicographic key
//!    `(earliest feasible start ↑, deadline ↑, cpu ↓)` picks the winner —
//!    urgent and heavy work packs first. Remaining ties keep ready-set
//!    insertion order, so repeat runs are identical.
//! 4. Committing decrements the envelope, records the finish time and
//!    promotes successors whose in-degree reaches zero.
//!
//! A committed task is permanent within one solve; there is no rollback.
//! If the ready set is non-empty but nothing can be placed, the solve fails
//! with a diagnostic naming every blocked task and its window — no partial
//! schedule is emitted.
//!
//! The caller's envelope map is deep-copied at construction and again per
//! solve, so caller state is never perturbed and `solve()` is repeatable.

pub mod error;

pub use error::{BlockedTask, ScheduleError};

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use crate::envelope::EnvelopeMap;
use crate::task::{duration_of, Assignment, Node, Placement, Schedule, Task};

// ── Outcome ───────────────────────────────────────────────────────────────────

/// A valid global schedule.
///
/// `envelopes` holds the residual per-node capacity after every commit —
/// exactly the state a [`DynamicReallocator`](crate::realloc::DynamicReallocator)
/// needs to be seeded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSchedule {
    /// task id → placement, in commit order.
    pub schedule: Schedule,

    /// Phase-1 cost, passed through unchanged.
    pub total_cost: i64,

    /// Remaining per-node capacity after all commits.
    pub envelopes: EnvelopeMap,
}

// ── GlobalScheduler ───────────────────────────────────────────────────────────

/// Assigns start times to an allocated task set.
pub struct GlobalScheduler {
    tasks: Vec<Task>,
    nodes: Vec<Node>,
    assignment: Assignment,
    time_slots: BTreeSet<u64>,
    envelopes: EnvelopeMap,
    durations: HashMap<String, u64>,
    dependencies: Vec<(String, String)>,
    phase1_cost: i64,
}

impl GlobalScheduler {
    /// Capture all inputs for a solve. The envelope map is deep-copied here;
    /// the caller's copy is never touched.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: Vec<Task>,
        nodes: Vec<Node>,
        assignment: Assignment,
        time_slots: BTreeSet<u64>,
        envelopes: &EnvelopeMap,
        durations: HashMap<String, u64>,
        dependencies: Vec<(String, String)>,
        phase1_cost: i64,
    ) -> Self {
        Self {
            tasks,
            nodes,
            assignment,
            time_slots,
            envelopes: envelopes.clone(),
            durations,
            dependencies,
            phase1_cost,
        }
    }

    /// Compute a start time for every assigned task.
    ///
    /// # Errors
    /// Structural problems (unknown ids, cycles, missing predecessors) and
    /// placement infeasibility are returned as [`ScheduleError`]; no partial
    /// schedule accompanies a failure.
    pub fn solve(&self) -> Result<GlobalSchedule, ScheduleError> {
        let task_by_id: IndexMap<&str, &Task> =
            self.tasks.iter().map(|t| (t.id.as_str(), t)).collect();
        let node_ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();

        self.preflight(&task_by_id, &node_ids)?;

        info!(
            task_count = self.assignment.len(),
            node_count = self.nodes.len(),
            dependency_count = self.dependencies.len(),
            slot_count = self.time_slots.len(),
            "=== GlobalScheduler::solve() ==="
        );

        let graph = DependencyGraph::build(&self.assignment, &self.dependencies)?;
        graph.check_acyclic(&self.assignment)?;

        let mut envelopes = self.envelopes.clone();
        let mut schedule = Schedule::new();
        let mut finish: HashMap<String, u64> = HashMap::new();
        let mut in_degree = graph.in_degree.clone();

        let mut remaining: IndexSet<String> = self.assignment.keys().cloned().collect();
        let mut ready: IndexSet<String> = remaining
            .iter()
            .filter(|id| in_degree.get(*id).copied().unwrap_or(0) == 0)
            .cloned()
            .collect();

        while !remaining.is_empty() {
            let mut best: Option<(u64, u64, u64, String)> = None;
            let mut blocked: Vec<BlockedTask> = Vec::new();

            for task_id in &ready {
                let task = task_by_id[task_id.as_str()];
                let duration = duration_of(&self.durations, task_id);
                let earliest = graph
                    .predecessors
                    .get(task_id)
                    .map(|preds| preds.iter().map(|p| finish[p]).max().unwrap_or(0))
                    .unwrap_or(0);
                let latest = task.deadline.checked_sub(duration);

                let start = latest
                    .filter(|&latest| latest >= earliest)
                    .and_then(|latest| {
                        let node_id = &self.assignment[task_id];
                        let envelope = envelopes.get(node_id)?;
                        (earliest..=latest).find(|&s| {
                            (s..s + duration).all(|slot| self.time_slots.contains(&slot))
                                && envelope.can_fit(s, duration, task.cpu, task.ram)
                        })
                    });

                match start {
                    Some(s) => {
                        // Strict comparison keeps the earliest-inserted ready
                        // task on a full tie.
                        let wins = match &best {
                            Some((bs, bd, bc, _)) => {
                                (s, task.deadline) < (*bs, *bd)
                                    || ((s, task.deadline) == (*bs, *bd) && task.cpu > *bc)
                            }
                            None => true,
                        };
                        if wins {
                            best = Some((s, task.deadline, task.cpu, task_id.clone()));
                        }
                    }
                    None => blocked.push(BlockedTask {
                        task: task_id.clone(),
                        earliest_start: earliest,
                        latest_start: latest,
                    }),
                }
            }

            let Some((start, _, _, task_id)) = best else {
                return Err(ScheduleError::NoFeasiblePlacement { blocked });
            };

            let task = task_by_id[task_id.as_str()];
            let duration = duration_of(&self.durations, &task_id);
            let node_id = self.assignment[&task_id].clone();
            let envelope = envelopes.get_mut(&node_id).ok_or_else(|| {
                ScheduleError::Internal(format!("envelope for node '{node_id}' vanished"))
            })?;
            envelope
                .commit(start, duration, task.cpu, task.ram)
                .map_err(|e| {
                    ScheduleError::Internal(format!(
                        "commit of task '{task_id}' on '{node_id}' failed: {e}"
                    ))
                })?;

            debug!(
                task = %task_id,
                node = %node_id,
                start,
                finish = start + duration,
                "✓ scheduled"
            );

            finish.insert(task_id.clone(), start + duration);
            schedule.insert(
                task_id.clone(),
                Placement {
                    node: node_id,
                    start,
                },
            );
            remaining.shift_remove(&task_id);
            ready.shift_remove(&task_id);

            if let Some(successors) = graph.successors.get(&task_id) {
                for successor in successors {
                    let degree = in_degree
                        .get_mut(successor)
                        .ok_or_else(|| {
                            ScheduleError::Internal(format!(
                                "successor '{successor}' missing from in-degree table"
                            ))
                        })?;
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(successor.clone());
                    }
                }
            }
        }

        info!(
            scheduled = schedule.len(),
            total_cost = self.phase1_cost,
            "=== Scheduling complete ==="
        );

        Ok(GlobalSchedule {
            schedule,
            total_cost: self.phase1_cost,
            envelopes,
        })
    }

    /// Validate every id the inputs reference before any placement work.
    fn preflight(
        &self,
        task_by_id: &IndexMap<&str, &Task>,
        node_ids: &HashSet<&str>,
    ) -> Result<(), ScheduleError> {
        for (task_id, node_id) in &self.assignment {
            if !task_by_id.contains_key(task_id.as_str()) {
                return Err(ScheduleError::UnknownTask {
                    task: task_id.clone(),
                });
            }
            if !node_ids.contains(node_id.as_str()) {
                return Err(ScheduleError::UnknownNode {
                    task: task_id.clone(),
                    node: node_id.clone(),
                });
            }
        }
        for (before, after) in &self.dependencies {
            for endpoint in [before, after] {
                if !task_by_id.contains_key(endpoint.as_str()) {
                    return Err(ScheduleError::UnknownDependency {
                        before: before.clone(),
                        after: after.clone(),
                        unknown: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

// ── Dependency graph ──────────────────────────────────────────────────────────

/// Deduplicated predecessor/successor sets over the scheduled tasks.
struct DependencyGraph {
    predecessors: IndexMap<String, IndexSet<String>>,
    successors: IndexMap<String, IndexSet<String>>,
    in_degree: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Restrict the dependency list to scheduled tasks, rejecting edges whose
    /// predecessor can never have a finish time.
    fn build(
        assignment: &Assignment,
        dependencies: &[(String, String)],
    ) -> Result<Self, ScheduleError> {
        let mut graph = Self {
            predecessors: IndexMap::new(),
            successors: IndexMap::new(),
            in_degree: assignment.keys().map(|id| (id.clone(), 0)).collect(),
        };

        for (before, after) in dependencies {
            if !assignment.contains_key(after) {
                continue; // successor is not being scheduled in this pass
            }
            if !assignment.contains_key(before) {
                return Err(ScheduleError::MissingPredecessor {
                    task: after.clone(),
                    predecessor: before.clone(),
                });
            }
            let inserted = graph
                .predecessors
                .entry(after.clone())
                .or_default()
                .insert(before.clone());
            if inserted {
                graph
                    .successors
                    .entry(before.clone())
                    .or_default()
                    .insert(after.clone());
                *graph.in_degree.entry(after.clone()).or_insert(0) += 1;
            }
        }

        Ok(graph)
    }

    /// Kahn's pass over the restricted graph; names the tasks stuck on a
    /// cycle when one exists.
    fn check_acyclic(&self, assignment: &Assignment) -> Result<(), ScheduleError> {
        let mut in_degree = self.in_degree.clone();
        let mut queue: Vec<&String> = assignment
            .keys()
            .filter(|id| in_degree.get(*id).copied().unwrap_or(0) == 0)
            .collect();
        let mut processed = 0usize;

        while let Some(task_id) = queue.pop() {
            processed += 1;
            if let Some(successors) = self.successors.get(task_id) {
                for successor in successors {
                    if let Some(degree) = in_degree.get_mut(successor) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push(successor);
                        }
                    }
                }
            }
        }

        if processed < assignment.len() {
            let tasks: Vec<String> = assignment
                .keys()
                .filter(|id| in_degree.get(*id).copied().unwrap_or(0) > 0)
                .cloned()
                .collect();
            return Err(ScheduleError::DependencyCycle { tasks });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
