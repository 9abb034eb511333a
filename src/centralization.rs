//! Betweenness centralization of collaboration graphs.
//!
//! # Betweenness
//!
//! ```text
//! C_B(v) = Σ_{s≠v≠t} σ_st(v) / σ_st
//! ```
//!
//! σ_st counts shortest s-t paths and σ_st(v) those passing through v. Edges
//! are treated as unweighted and undirected. Paths only exist inside a
//! connected component, so disconnected graphs contribute per component.
//!
//! Computed with Brandes' algorithm: one BFS per source, then dependencies
//! are accumulated in reverse BFS order,
//!
//! ```text
//! δ_s(v) = Σ_{w: v∈P_s(w)} (σ_sv/σ_sw) × (1 + δ_s(w))
//! ```
//!
//! Summing over every source visits each unordered pair twice; dividing that
//! sum by `(n-1)(n-2)` gives the usual normalized undirected score in [0, 1].
//!
//! # Centralization
//!
//! ```text
//! C = Σ_i (max_c - c_i) / (n - 1)
//! ```
//!
//! `n - 1` is the sum of differences of a star on n nodes, the most
//! centralized graph. Graphs with at most two nodes score `0.0`.

use std::collections::VecDeque;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::network::{AuthorNode, Graph};

/// Normalized betweenness of every node, in node order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn betweenness_centrality(graph: &Graph) -> Vec<f64> {
    let n = graph.node_count();
    let mut betweenness = vec![0.0_f64; n];
    if n < 3 {
        return betweenness;
    }
    let pg = graph.as_petgraph();

    for s in pg.node_indices() {
        let (sigma, predecessors, order) = bfs_shortest_paths(pg, s);
        let mut delta = vec![0.0_f64; n];
        for &w in order.iter().rev() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s.index() {
                betweenness[w] += delta[w];
            }
        }
    }

    let norm = ((n - 1) * (n - 2)) as f64;
    for b in &mut betweenness {
        *b /= norm;
    }
    betweenness
}

/// Returns σ (shortest path counts), shortest-path predecessors and the
/// BFS visiting order from `source`, all by node position.
fn bfs_shortest_paths(
    graph: &UnGraph<AuthorNode, u32>,
    source: NodeIndex,
) -> (Vec<f64>, Vec<Vec<usize>>, Vec<usize>) {
    let n = graph.node_count();
    let mut sigma = vec![0.0_f64; n];
    let mut dist = vec![-1_i64; n];
    let mut predecessors = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);

    sigma[source.index()] = 1.0;
    dist[source.index()] = 0;
    let mut queue = VecDeque::from([source]);

    while let Some(v) = queue.pop_front() {
        let vi = v.index();
        order.push(vi);
        for w in graph.neighbors(v) {
            let wi = w.index();
            if dist[wi] < 0 {
                dist[wi] = dist[vi] + 1;
                queue.push_back(w);
            }
            if dist[wi] == dist[vi] + 1 {
                sigma[wi] += sigma[vi];
                predecessors[wi].push(vi);
            }
        }
    }
    (sigma, predecessors, order)
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn betweenness_centralization(graph: &Graph) -> f64 {
    let n = graph.node_count();
    if n <= 2 {
        return 0.0;
    }
    let scores = betweenness_centrality(graph);
    let max_c = scores.iter().copied().fold(0.0_f64, f64::max);
    let sum_of_differences: f64 = scores.iter().map(|c| max_c - c).sum();
    sum_of_differences / (n - 1) as f64
}
