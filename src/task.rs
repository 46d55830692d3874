/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data model shared by all four planning phases.
//!
//! ```text
//! (Task, Node, CostMatrix) ──► Allocator ──► Assignment
//!                                               │
//!                 Schedule ◄── GlobalScheduler ◄┘
//!                    │
//!                    └──► DynamicReallocator ──► Schedule (repaired)
//! ```
//!
//! # Ownership model
//! `Task` and `Node` are immutable values; the planners borrow or clone them
//! but never mutate them. `Schedule` and `Assignment` are insertion-ordered
//! maps (`IndexMap`) so every downstream consumer — tie-breaks, event
//! processing, serialization — observes the same deterministic order.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ── Task ──────────────────────────────────────────────────────────────────────

/// A unit of computational work.
///
/// `deadline` is an exclusive upper bound on `start + duration`: a task with
/// `deadline = 4` must have finished by the end of slot 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,

    /// CPU demand, in capacity units, at every slot the task occupies.
    pub cpu: u64,

    /// RAM demand, in capacity units, at every slot the task occupies.
    pub ram: u64,

    /// Exclusive upper bound on `start + duration`, in time slots.
    pub deadline: u64,
}

impl Task {
    pub fn new(id: impl Into<String>, cpu: u64, ram: u64, deadline: u64) -> Self {
        Self {
            id: id.into(),
            cpu,
            ram,
            deadline,
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// A host in the fleet.
///
/// `slots` bounds how many tasks Phase 1 may admit concurrently; the per-slot
/// cpu/ram capacities bound what Phases 2–4 may pack into any one time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier.
    pub id: String,

    /// CPU capacity available at every time slot.
    pub cpu_capacity: u64,

    /// RAM capacity available at every time slot.
    pub ram_capacity: u64,

    /// Maximum number of tasks admitted concurrently in Phase 1.
    pub slots: u32,
}

impl Node {
    pub fn new(id: impl Into<String>, cpu_capacity: u64, ram_capacity: u64, slots: u32) -> Self {
        Self {
            id: id.into(),
            cpu_capacity,
            ram_capacity,
            slots,
        }
    }

    /// Whether this node can host `task` at all, ignoring time and load.
    pub fn admits(&self, task: &Task) -> bool {
        task.cpu <= self.cpu_capacity && task.ram <= self.ram_capacity
    }
}

// ── CostMatrix ────────────────────────────────────────────────────────────────

/// Dense (task, node) → cost mapping with an explicit infeasibility marker.
///
/// A `None` cell means the pair is forbidden — the allocator never creates an
/// edge for it. Infeasibility is carried in the type instead of overloading
/// a numeric limit; [`CostMatrix::from_dense`] converts the legacy
/// `i32::MAX`-marked integer form at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    rows: Vec<Vec<Option<i32>>>,
}

impl CostMatrix {
    /// Build from explicit per-cell costs; `None` marks a forbidden pair.
    ///
    /// Every row must have the same length (one column per node).
    pub fn new(rows: Vec<Vec<Option<i32>>>) -> Self {
        if let Some(first) = rows.first() {
            debug_assert!(
                rows.iter().all(|r| r.len() == first.len()),
                "cost matrix rows must all have the same length"
            );
        }
        Self { rows }
    }

    /// Build from a dense integer matrix where `i32::MAX` marks a forbidden
    /// pair.
    pub fn from_dense(rows: &[Vec<i32>]) -> Self {
        Self::new(
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|&c| if c == i32::MAX { None } else { Some(c) })
                        .collect()
                })
                .collect(),
        )
    }

    /// Cost of running task `task_idx` on node `node_idx`, or `None` when the
    /// pair is forbidden or out of range.
    pub fn get(&self, task_idx: usize, node_idx: usize) -> Option<i32> {
        self.rows.get(task_idx)?.get(node_idx).copied().flatten()
    }

    /// Number of task rows.
    pub fn task_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of node columns.
    pub fn node_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}

// ── Assignment / Schedule ─────────────────────────────────────────────────────

/// Phase-1 result: task id → node id, in task input order.
pub type Assignment = IndexMap<String, String>;

/// Where and when a scheduled task runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Node the task runs on.
    pub node: String,

    /// First time slot the task occupies.
    pub start: u64,
}

/// task id → placement, in commit order.
pub type Schedule = IndexMap<String, Placement>;

// ── Durations ─────────────────────────────────────────────────────────────────

/// Look up a task's duration, defaulting to one slot for absent entries.
pub fn duration_of(durations: &HashMap<String, u64>, task_id: &str) -> u64 {
    durations.get(task_id).copied().unwrap_or(1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
