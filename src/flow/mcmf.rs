/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Min-cost max-flow by successive shortest paths.
//!
//! Shortest-path discovery uses Bellman–Ford rather than Dijkstra: residual
//! reverse edges carry negated costs, so edge weights can be negative. The
//! networks this crate builds stay small (hundreds of vertices), where
//! Bellman–Ford's simplicity beats maintaining Johnson potentials.
//!
//! Per-unit edge costs are `i32`; path distances and the accumulated total
//! are widened to `i64` before any multiplication, so `amount × cost` cannot
//! overflow.

use super::FlowGraph;

// ── Result type ───────────────────────────────────────────────────────────────

/// Total flow pushed and its total cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowCost {
    pub flow: i64,
    pub cost: i64,
}

// ── Solver ────────────────────────────────────────────────────────────────────

/// Push as much flow as possible from `source` to `sink` at minimum cost.
///
/// Repeats until the sink becomes unreachable in the residual graph:
/// 1. Bellman–Ford from `source` over edges with remaining capacity,
///    recording each vertex's predecessor edge.
/// 2. Walk the predecessor chain to find the bottleneck capacity (always
///    positive).
/// 3. Push the bottleneck along the whole path, accumulating
///    `amount × cost` per traversed edge — reverse edges refund cost via
///    their negative sign.
pub fn min_cost_max_flow(graph: &mut FlowGraph, source: usize, sink: usize) -> FlowCost {
    let mut total = FlowCost { flow: 0, cost: 0 };
    if source == sink {
        return total;
    }

    while let Some(predecessor) = shortest_path(graph, source, sink) {
        // Walk the predecessor chain back to the source once.
        let mut path: Vec<usize> = Vec::new();
        let mut vertex = sink;
        while vertex != source {
            let index = predecessor[vertex].expect("reachable vertex has a predecessor edge");
            path.push(index);
            vertex = graph.edge(index).from;
        }

        // Bottleneck: minimum remaining capacity along the chain.
        let amount = path
            .iter()
            .map(|&index| graph.edge(index).remaining_capacity())
            .min()
            .unwrap_or(0);
        debug_assert!(amount > 0, "augmenting path with zero bottleneck");

        for &index in &path {
            let cost = graph.edge(index).cost;
            graph.add_flow(index, amount);
            total.cost += i64::from(amount) * i64::from(cost);
        }
        total.flow += i64::from(amount);
    }

    total
}

/// Bellman–Ford over residual edges. Returns the predecessor-edge table when
/// `sink` is reachable, `None` otherwise.
fn shortest_path(graph: &FlowGraph, source: usize, sink: usize) -> Option<Vec<Option<usize>>> {
    let vertices = graph.vertex_count();
    let mut distance: Vec<Option<i64>> = vec![None; vertices];
    let mut predecessor: Vec<Option<usize>> = vec![None; vertices];
    distance[source] = Some(0);

    // At most V−1 full relaxation passes; stop early once a pass changes
    // nothing.
    for _ in 1..vertices {
        let mut improved = false;
        for from in 0..vertices {
            let Some(base) = distance[from] else {
                continue;
            };
            for (index, edge) in graph.edges_from(from) {
                if edge.remaining_capacity() <= 0 {
                    continue;
                }
                let candidate = base + i64::from(edge.cost);
                if distance[edge.to].is_none_or(|d| candidate < d) {
                    distance[edge.to] = Some(candidate);
                    predecessor[edge.to] = Some(index);
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }

    distance[sink].map(|_| predecessor)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
