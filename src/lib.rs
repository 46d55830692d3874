/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fleetplan – four-phase task placement planner
//!
//! Plans where and when a set of computational tasks execute on a fleet of
//! heterogeneous nodes, and repairs the plan when the fleet changes.
//!
//! ```text
//! lib.rs
//! ├── task.rs      – data model: Task, Node, CostMatrix, Schedule
//! ├── envelope.rs  – per-node per-slot cpu/ram capacity envelopes
//! ├── flow/        – residual flow graph + min-cost max-flow solver
//! ├── alloc/       – Phase 1: cost-minimal task→node allocation
//! ├── scheduler/   – Phase 2: dependency-aware global list scheduling
//! ├── realloc/     – Phase 3: event-driven schedule repair
//! ├── local/       – Phase 4: per-node execution timelines
//! ├── config/      – YAML fleet configuration
//! └── report/      – JSON adapters for the four phase outputs
//! ```
//!
//! The phases form a pipeline: the allocator's assignment feeds the global
//! scheduler, whose schedule (plus residual envelopes) seeds the
//! reallocator; the local planner consumes one node's share of the result.
//! Every solver is single-threaded, takes its inputs by value or deep copy,
//! and produces an immutable outcome — repeat runs on identical inputs
//! produce identical outputs.

pub mod alloc;
pub mod config;
pub mod envelope;
pub mod flow;
pub mod local;
pub mod realloc;
pub mod report;
pub mod scheduler;
pub mod task;

pub use alloc::{AllocError, AllocationOutcome, Allocator};
pub use config::FleetConfigManager;
pub use envelope::{EnvelopeError, EnvelopeMap, NodeEnvelope};
pub use local::{LocalOutcome, LocalScheduler, LocalTask, TaskExecution};
pub use realloc::{DynamicReallocator, FleetEvent, ReallocOutcome};
pub use scheduler::{GlobalSchedule, GlobalScheduler, ScheduleError};
pub use task::{Assignment, CostMatrix, Node, Placement, Schedule, Task};
