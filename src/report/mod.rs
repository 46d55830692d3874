/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! JSON adapters for the four phase outcomes.
//!
//! The planners expose structured values; this module converts them, at the
//! integration boundary only, into the JSON shapes downstream tooling
//! consumes. Errors are serialized unchanged as the `reason` string of an
//! invalid result — nothing is rewritten or interpreted here.
//!
//! Phase 1/2 payloads use snake_case keys; Phase 3/4 payloads use the
//! PascalCase keys of the reallocation protocol.

use indexmap::IndexMap;
use serde::Serialize;

use crate::alloc::AllocationOutcome;
use crate::local::LocalOutcome;
use crate::realloc::ReallocOutcome;
use crate::scheduler::{GlobalSchedule, ScheduleError};
use crate::task::Assignment;

// ── Phase 1 ───────────────────────────────────────────────────────────────────

/// `{ assignments, total_cost, assigned_count }`
#[derive(Debug, Clone, Serialize)]
pub struct AllocationReport {
    pub assignments: Assignment,
    pub total_cost: i64,
    pub assigned_count: usize,
}

pub fn allocation(outcome: &AllocationOutcome) -> AllocationReport {
    AllocationReport {
        assignments: outcome.assignments.clone(),
        total_cost: outcome.total_cost,
        assigned_count: outcome.assignments.len(),
    }
}

// ── Phase 2 ───────────────────────────────────────────────────────────────────

/// One task's placement: `{ node, start_time }`.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub node: String,
    pub start_time: u64,
}

/// `{ schedule, valid, total_cost, reason }`
///
/// A failed solve renders with an empty schedule, `valid = false` and the
/// error's display form as `reason`; the pass-through cost is reported
/// either way.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    pub schedule: IndexMap<String, ScheduleEntry>,
    pub valid: bool,
    pub total_cost: i64,
    pub reason: Option<String>,
}

pub fn schedule(result: &Result<GlobalSchedule, ScheduleError>, total_cost: i64) -> ScheduleReport {
    match result {
        Ok(solved) => ScheduleReport {
            schedule: solved
                .schedule
                .iter()
                .map(|(task, placement)| {
                    (
                        task.clone(),
                        ScheduleEntry {
                            node: placement.node.clone(),
                            start_time: placement.start,
                        },
                    )
                })
                .collect(),
            valid: true,
            total_cost: solved.total_cost,
            reason: None,
        },
        Err(error) => ScheduleReport {
            schedule: IndexMap::new(),
            valid: false,
            total_cost,
            reason: Some(error.to_string()),
        },
    }
}

// ── Phase 3 ───────────────────────────────────────────────────────────────────

/// `{ UpdatedSchedule, ReassignedTasks, FailedTasks, TotalCost, ChangePenalty }`
///
/// Placements serialize as `[node, start]` pairs, as the reallocation
/// protocol expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReallocationReport {
    pub updated_schedule: IndexMap<String, (String, u64)>,
    pub reassigned_tasks: Vec<String>,
    pub failed_tasks: Vec<String>,
    pub total_cost: i64,
    pub change_penalty: u64,
}

pub fn reallocation(outcome: &ReallocOutcome) -> ReallocationReport {
    ReallocationReport {
        updated_schedule: outcome
            .schedule
            .iter()
            .map(|(task, placement)| (task.clone(), (placement.node.clone(), placement.start)))
            .collect(),
        reassigned_tasks: outcome.reassigned.clone(),
        failed_tasks: outcome.failed.clone(),
        total_cost: outcome.total_cost,
        change_penalty: outcome.change_penalty,
    }
}

// ── Phase 4 ───────────────────────────────────────────────────────────────────

/// One task's timeline entry: `{ StartTime, MeetsDeadline }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionEntry {
    pub start_time: Option<u64>,
    pub meets_deadline: bool,
}

/// `{ ExecutionSchedule, TotalIdleTime, PenaltyCost }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalReport {
    pub execution_schedule: IndexMap<String, ExecutionEntry>,
    pub total_idle_time: u64,
    pub penalty_cost: u64,
}

pub fn local(outcome: &LocalOutcome) -> LocalReport {
    LocalReport {
        execution_schedule: outcome
            .executions
            .iter()
            .map(|(task, exec)| {
                (
                    task.clone(),
                    ExecutionEntry {
                        start_time: exec.start,
                        meets_deadline: exec.meets_deadline,
                    },
                )
            })
            .collect(),
        total_idle_time: outcome.total_idle,
        penalty_cost: outcome.penalty,
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Render any report as pretty-printed JSON.
pub fn to_json_pretty<T: Serialize>(report: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EnvelopeMap;
    use crate::local::TaskExecution;
    use crate::task::{Placement, Schedule};
    use serde_json::json;

    // ── Phase 1 ───────────────────────────────────────────────────────────────

    #[test]
    fn allocation_report_shape() {
        let mut assignments = Assignment::new();
        assignments.insert("T1".to_string(), "N1".to_string());
        assignments.insert("T2".to_string(), "N2".to_string());
        let outcome = AllocationOutcome {
            flow: 2,
            total_cost: 6,
            assignments,
            unassigned: vec![],
        };

        let value = serde_json::to_value(allocation(&outcome)).unwrap();
        assert_eq!(
            value,
            json!({
                "assignments": { "T1": "N1", "T2": "N2" },
                "total_cost": 6,
                "assigned_count": 2
            })
        );
    }

    // ── Phase 2 ───────────────────────────────────────────────────────────────

    #[test]
    fn valid_schedule_report_shape() {
        let mut sched = Schedule::new();
        sched.insert(
            "T1".to_string(),
            Placement {
                node: "N1".to_string(),
                start: 0,
            },
        );
        let result = Ok(GlobalSchedule {
            schedule: sched,
            total_cost: 6,
            envelopes: EnvelopeMap::new(),
        });

        let value = serde_json::to_value(schedule(&result, 6)).unwrap();
        assert_eq!(
            value,
            json!({
                "schedule": { "T1": { "node": "N1", "start_time": 0 } },
                "valid": true,
                "total_cost": 6,
                "reason": null
            })
        );
    }

    #[test]
    fn failed_schedule_report_carries_reason_and_no_schedule() {
        let result = Err(ScheduleError::UnknownTask {
            task: "ghost".to_string(),
        });

        let value = serde_json::to_value(schedule(&result, 4)).unwrap();
        assert_eq!(value["valid"], json!(false));
        assert_eq!(value["total_cost"], json!(4));
        assert_eq!(value["schedule"], json!({}));
        assert!(value["reason"].as_str().unwrap().contains("ghost"));
    }

    // ── Phase 3 ───────────────────────────────────────────────────────────────

    #[test]
    fn reallocation_report_uses_pascal_case_and_pairs() {
        let mut sched = Schedule::new();
        sched.insert(
            "T2".to_string(),
            Placement {
                node: "N1".to_string(),
                start: 1,
            },
        );
        let outcome = ReallocOutcome {
            schedule: sched,
            reassigned: vec!["T2".to_string()],
            failed: vec![],
            total_cost: 7,
            change_penalty: 1,
        };

        let value = serde_json::to_value(reallocation(&outcome)).unwrap();
        assert_eq!(
            value,
            json!({
                "UpdatedSchedule": { "T2": ["N1", 1] },
                "ReassignedTasks": ["T2"],
                "FailedTasks": [],
                "TotalCost": 7,
                "ChangePenalty": 1
            })
        );
    }

    // ── Phase 4 ───────────────────────────────────────────────────────────────

    #[test]
    fn local_report_renders_null_start_for_unplaced_tasks() {
        let mut executions = IndexMap::new();
        executions.insert(
            "a".to_string(),
            TaskExecution {
                start: Some(0),
                meets_deadline: true,
            },
        );
        executions.insert(
            "b".to_string(),
            TaskExecution {
                start: None,
                meets_deadline: false,
            },
        );
        let outcome = LocalOutcome {
            executions,
            total_idle: 12,
            penalty: 1,
        };

        let value = serde_json::to_value(local(&outcome)).unwrap();
        assert_eq!(
            value,
            json!({
                "ExecutionSchedule": {
                    "a": { "StartTime": 0, "MeetsDeadline": true },
                    "b": { "StartTime": null, "MeetsDeadline": false }
                },
                "TotalIdleTime": 12,
                "PenaltyCost": 1
            })
        );
    }

    // ── Full pipeline ─────────────────────────────────────────────────────────

    #[test]
    fn full_pipeline_renders_all_four_reports() {
        use crate::alloc::Allocator;
        use crate::envelope::NodeEnvelope;
        use crate::local::{LocalScheduler, LocalTask};
        use crate::realloc::{DynamicReallocator, FleetEvent};
        use crate::scheduler::GlobalScheduler;
        use crate::task::{CostMatrix, Node, Task};
        use std::collections::{BTreeSet, HashMap};

        let tasks = vec![
            Task::new("T1", 2, 4, 3),
            Task::new("T2", 1, 2, 3),
            Task::new("T3", 3, 3, 4),
        ];
        let nodes = vec![
            Node::new("N1", 5, 6, 2),
            Node::new("N2", 6, 5, 2),
            Node::new("N3", 4, 4, 2),
        ];
        let costs = CostMatrix::from_dense(&[vec![4, 2, 3], vec![3, 4, 2], vec![2, 3, 4]]);
        let time_slots: BTreeSet<u64> = (0..=3).collect();
        let envelopes: EnvelopeMap = nodes
            .iter()
            .map(|n| {
                (
                    n.id.clone(),
                    NodeEnvelope::uniform(&time_slots, n.cpu_capacity, Some(n.ram_capacity)),
                )
            })
            .collect();
        let durations: HashMap<String, u64> =
            [("T1", 1), ("T2", 1), ("T3", 2)]
                .into_iter()
                .map(|(id, d)| (id.to_string(), d))
                .collect();
        let dependencies = vec![
            ("T1".to_string(), "T3".to_string()),
            ("T2".to_string(), "T3".to_string()),
        ];

        // Phase 1
        let alloc_outcome = Allocator::new(tasks.clone(), nodes.clone(), &costs)
            .unwrap()
            .solve();
        let phase1 = allocation(&alloc_outcome);
        assert_eq!(phase1.assigned_count, 3);
        assert_eq!(phase1.total_cost, 6);

        // Phase 2
        let result = GlobalScheduler::new(
            tasks.clone(),
            nodes.clone(),
            alloc_outcome.assignments.clone(),
            time_slots.clone(),
            &envelopes,
            durations.clone(),
            dependencies,
            alloc_outcome.total_cost,
        )
        .solve();
        let solved = result.as_ref().unwrap();
        let phase2 = schedule(&result, 6);
        assert!(phase2.valid);
        assert_eq!(phase2.reason, None);

        // Phase 3: N2 fails, a small task arrives.
        let mut realloc = DynamicReallocator::new(
            &tasks,
            &nodes,
            &solved.schedule,
            &solved.envelopes,
            durations,
            solved.total_cost,
        );
        let realloc_outcome = realloc.apply(vec![
            FleetEvent::NodeFailure("N2".to_string()),
            FleetEvent::NewTask(Task::new("T4", 1, 1, 4)),
        ]);
        let phase3 = reallocation(&realloc_outcome);
        assert_eq!(phase3.reassigned_tasks, vec!["T1", "T4"]);
        assert!(phase3.failed_tasks.is_empty());
        assert_eq!(phase3.change_penalty, 2);
        assert_eq!(phase3.total_cost, 8);
        assert!(phase3
            .updated_schedule
            .values()
            .all(|(node, _)| node != "N2"));

        // Phase 4: plan N1's share of the repaired schedule.
        let local_tasks: Vec<LocalTask> = realloc_outcome
            .schedule
            .iter()
            .filter(|(_, p)| p.node == "N1")
            .map(|(id, _)| {
                let (cpu, ram, duration, deadline) = match id.as_str() {
                    "T3" => (3, 3, 2, 4),
                    "T1" => (2, 4, 1, 3),
                    _ => (1, 1, 1, 4),
                };
                LocalTask::new(id.clone(), cpu, ram, duration, deadline)
            })
            .collect();
        assert_eq!(local_tasks.len(), 3, "T3, T1 and T4 all sit on N1");

        let cpu_envelope = NodeEnvelope::uniform(&time_slots, 5, None);
        let local_outcome =
            LocalScheduler::new("N1", local_tasks, &cpu_envelope, time_slots).solve();
        let phase4 = local(&local_outcome);
        assert_eq!(phase4.penalty_cost, 0);
        assert_eq!(phase4.total_idle_time, 11);
        assert!(phase4
            .execution_schedule
            .values()
            .all(|e| e.meets_deadline));
    }

    #[test]
    fn to_json_pretty_renders_readable_output() {
        let outcome = AllocationOutcome {
            flow: 0,
            total_cost: 0,
            assignments: Assignment::new(),
            unassigned: vec![],
        };
        let text = to_json_pretty(&allocation(&outcome)).unwrap();
        assert!(text.contains("\"assigned_count\": 0"));
    }
}
