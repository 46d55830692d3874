//! Phase 1 – cost-minimal task→node allocation.
//!
//! [`Allocator`] formulates the assignment problem as min-cost max-flow over
//! a bipartite-through-capacity network and extracts a task→node mapping
//! from the solved flow:
//!
//! ```text
//!            cap 1, cost 0          cap 1, cost c[i][j]     cap slot bound, cost 0
//! source ────────────────► task_i ─────────────────► node_j ────────────────► sink
//! ```
//!
//! A task→node edge exists only when the cost cell is present (not marked
//! infeasible) and the node's capacities individually admit the task. Phase 1
//! ignores time, but the node→sink capacity is clamped so a node is never
//! handed more tasks than it could even theoretically host concurrently.
//!
//! The network is built once per allocator; [`Allocator::solve`] resets all
//! flows first, so repeated solves return identical results.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::flow::mcmf::min_cost_max_flow;
use crate::flow::FlowGraph;
use crate::task::{Assignment, CostMatrix, Node, Task};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Construction-time failures for [`Allocator`].
#[derive(Debug, Error)]
pub enum AllocError {
    /// The cost matrix dimensions do not match the task/node lists.
    #[error(
        "cost matrix is {matrix_tasks}×{matrix_nodes} but {tasks} task(s) and {nodes} node(s) were supplied"
    )]
    DimensionMismatch {
        tasks: usize,
        nodes: usize,
        matrix_tasks: usize,
        matrix_nodes: usize,
    },
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of one allocation solve.
///
/// `flow < tasks` means some tasks could not be assigned; they are listed in
/// `unassigned` (task input order) and the computation still completes —
/// partial failure is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationOutcome {
    /// Units of flow pushed — the number of tasks assigned.
    pub flow: i64,

    /// Total cost of the chosen assignment.
    pub total_cost: i64,

    /// task id → node id, in task input order.
    pub assignments: Assignment,

    /// Tasks the network could not place, in task input order.
    pub unassigned: Vec<String>,
}

// ── Allocator ─────────────────────────────────────────────────────────────────

/// Builds the flow network once and drives the MCMF solver.
///
/// Vertex layout: `0` = source, `1..=T` = tasks, `T+1..=T+N` = nodes,
/// `T+N+1` = sink.
#[derive(Debug)]
pub struct Allocator {
    graph: FlowGraph,
    tasks: Vec<Task>,
    nodes: Vec<Node>,
    /// Per task: `(edge index, node index)` for every admissible pair.
    task_edges: Vec<Vec<(usize, usize)>>,
    source: usize,
    sink: usize,
}

impl Allocator {
    /// Construct the network for `tasks` × `nodes` under `costs`.
    ///
    /// # Errors
    /// [`AllocError::DimensionMismatch`] when the matrix shape disagrees with
    /// the task/node lists.
    pub fn new(tasks: Vec<Task>, nodes: Vec<Node>, costs: &CostMatrix) -> Result<Self, AllocError> {
        if costs.task_count() != tasks.len() || costs.node_count() != nodes.len() {
            return Err(AllocError::DimensionMismatch {
                tasks: tasks.len(),
                nodes: nodes.len(),
                matrix_tasks: costs.task_count(),
                matrix_nodes: costs.node_count(),
            });
        }

        let task_count = tasks.len();
        let node_count = nodes.len();
        let source = 0;
        let sink = task_count + node_count + 1;
        let mut graph = FlowGraph::new(task_count + node_count + 2);

        // Source → tasks.
        for task_idx in 0..task_count {
            graph.add_edge(source, 1 + task_idx, 1, 0);
        }

        // Tasks → nodes, only for admissible pairs.
        let mut task_edges: Vec<Vec<(usize, usize)>> = vec![Vec::new(); task_count];
        for (task_idx, task) in tasks.iter().enumerate() {
            for (node_idx, node) in nodes.iter().enumerate() {
                let Some(cost) = costs.get(task_idx, node_idx) else {
                    continue;
                };
                if !node.admits(task) {
                    debug!(
                        task = %task.id,
                        node = %node.id,
                        "pair elided: node capacities do not admit task"
                    );
                    continue;
                }
                let edge = graph.add_edge(1 + task_idx, 1 + task_count + node_idx, 1, cost);
                task_edges[task_idx].push((edge, node_idx));
            }
        }

        // Nodes → sink, clamped by the effective slot bound.
        for (node_idx, node) in nodes.iter().enumerate() {
            let capacity = effective_slot_bound(node, &tasks, costs, node_idx);
            if capacity == 0 {
                debug!(node = %node.id, "node admits no task, sink edge omitted");
                continue;
            }
            graph.add_edge(1 + task_count + node_idx, sink, capacity, 0);
        }

        Ok(Self {
            graph,
            tasks,
            nodes,
            task_edges,
            source,
            sink,
        })
    }

    /// Run (or re-run) the solve and extract the assignment.
    pub fn solve(&mut self) -> AllocationOutcome {
        self.graph.reset_flows();

        info!(
            task_count = self.tasks.len(),
            node_count = self.nodes.len(),
            "=== Allocator::solve() ==="
        );

        let result = min_cost_max_flow(&mut self.graph, self.source, self.sink);

        let mut assignments = Assignment::new();
        let mut unassigned = Vec::new();
        for (task_idx, task) in self.tasks.iter().enumerate() {
            let chosen = self.task_edges[task_idx]
                .iter()
                .find(|(edge, _)| self.graph.edge(*edge).flow > 0);
            match chosen {
                Some(&(_, node_idx)) => {
                    let node_id = &self.nodes[node_idx].id;
                    debug!(task = %task.id, node = %node_id, "✓ assigned");
                    assignments.insert(task.id.clone(), node_id.clone());
                }
                None => {
                    warn!(task = %task.id, "✗ no admissible node carried flow");
                    unassigned.push(task.id.clone());
                }
            }
        }

        info!(
            flow = result.flow,
            total_cost = result.cost,
            assigned = assignments.len(),
            unassigned = unassigned.len(),
            "=== Allocation complete ==="
        );

        AllocationOutcome {
            flow: result.flow,
            total_cost: result.cost,
            assignments,
            unassigned,
        }
    }

    /// Read access to the solved network, used by conservation checks.
    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }
}

/// Sink-edge capacity for `node`: `min(slots, resource bound)`.
///
/// The resource bound divides the node's capacities by the smallest cpu/ram
/// demand among the tasks it admits — the largest concurrency the node could
/// sustain even in the best packing. Zero demands are clamped to one so the
/// division stays meaningful.
fn effective_slot_bound(node: &Node, tasks: &[Task], costs: &CostMatrix, node_idx: usize) -> i32 {
    let admitted: Vec<&Task> = tasks
        .iter()
        .enumerate()
        .filter(|(task_idx, task)| costs.get(*task_idx, node_idx).is_some() && node.admits(task))
        .map(|(_, task)| task)
        .collect();

    if admitted.is_empty() {
        return 0;
    }

    let min_cpu = admitted.iter().map(|t| t.cpu).min().unwrap_or(1).max(1);
    let min_ram = admitted.iter().map(|t| t.ram).min().unwrap_or(1).max(1);
    let resource_bound = (node.cpu_capacity / min_cpu).min(node.ram_capacity / min_ram);

    u64::from(node.slots).min(resource_bound).min(i32::MAX as u64) as i32
}

// ── Tests ─────────────────────────────────────────────────────────────────────
