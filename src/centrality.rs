//! Degree, closeness and betweenness centrality of a distribution network.
//!
//! All three follow the usual directed, unweighted definitions:
//! - degree: `(in + out) / (n - 1)`
//! - closeness: Wasserman–Faust scaled inverse mean distance *to* the node
//! - betweenness: Brandes' algorithm, normalised by `(n - 1)(n - 2)`
//!
//! The per-source breadth-first searches are independent and run on the rayon pool.

use std::collections::{HashMap, VecDeque};

use petgraph::Direction::{self, Incoming, Outgoing};
use petgraph::stable_graph::NodeIndex;
use rayon::prelude::*;
use tracing::debug;

use crate::network::DistributionNetwork;

/// Score per node for one centrality metric.
pub type CentralityScores = HashMap<String, f64>;

/// Dense, 0-based adjacency of the live nodes of a network.
struct Adjacency {
    names: Vec<String>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl Adjacency {
    fn new(network: &DistributionNetwork) -> Self {
        let nodes = network.node_indices();
        let position: HashMap<NodeIndex, usize> =
            nodes.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();

        let neighbours = |idx: NodeIndex, dir: Direction| -> Vec<usize> {
            network
                .graph
                .neighbors_directed(idx, dir)
                .map(|n| position[&n])
                .collect()
        };

        Adjacency {
            names: nodes.iter().map(|&idx| network.name(idx).to_string()).collect(),
            successors: nodes.iter().map(|&idx| neighbours(idx, Outgoing)).collect(),
            predecessors: nodes.iter().map(|&idx| neighbours(idx, Incoming)).collect(),
        }
    }

    fn len(&self) -> usize {
        self.names.len()
    }

    fn into_scores(self, values: Vec<f64>) -> CentralityScores {
        self.names.into_iter().zip(values).collect()
    }
}

/// Unweighted BFS distances from `source` following `adjacency`.
fn bfs_distances(adjacency: &[Vec<usize>], source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; adjacency.len()];
    dist[source] = Some(0);
    let mut queue = VecDeque::from([source]);

    while let Some(v) = queue.pop_front() {
        let next = dist[v].map_or(0, |d| d + 1);
        for &w in &adjacency[v] {
            if dist[w].is_none() {
                dist[w] = Some(next);
                queue.push_back(w);
            }
        }
    }
    dist
}

/// Degree centrality: fraction of the other nodes each node is adjacent to.
///
/// Every node scores 1.0 in a graph of at most one node.
pub fn degree_centrality(network: &DistributionNetwork) -> CentralityScores {
    let n = network.node_count();
    let scores: CentralityScores = network
        .degrees()
        .into_iter()
        .map(|(idx, degree)| {
            let score = if n <= 1 {
                1.0
            } else {
                degree as f64 / (n - 1) as f64
            };
            (network.name(idx).to_string(), score)
        })
        .collect();
    debug!(nodes = n, "computed degree centrality");
    scores
}

/// Closeness centrality using incoming distance.
///
/// For node `u`, with `r` nodes able to reach it (itself included) at total
/// distance `d`, the score is `((r - 1) / d) * ((r - 1) / (n - 1))`, and 0 if
/// nothing else reaches it.
pub fn closeness_centrality(network: &DistributionNetwork) -> CentralityScores {
    let adjacency = Adjacency::new(network);
    let n = adjacency.len();

    let values: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|u| {
            let dist = bfs_distances(&adjacency.predecessors, u);
            let (reached, total) = dist
                .iter()
                .flatten()
                .fold((0usize, 0usize), |(r, t), &d| (r + 1, t + d));
            if total == 0 || n <= 1 {
                return 0.0;
            }
            let others = (reached - 1) as f64;
            (others / total as f64) * (others / (n - 1) as f64)
        })
        .collect();

    debug!(nodes = n, "computed closeness centrality");
    adjacency.into_scores(values)
}

/// Betweenness centrality (Brandes), endpoints excluded.
///
/// Normalised by `1 / ((n - 1)(n - 2))` when `n > 2`; raw pair-dependency sums otherwise.
pub fn betweenness_centrality(network: &DistributionNetwork) -> CentralityScores {
    let adjacency = Adjacency::new(network);
    let n = adjacency.len();

    let mut values = (0..n)
        .into_par_iter()
        .map(|s| brandes_from_source(&adjacency.successors, s))
        .reduce(
            || vec![0.0; n],
            |mut acc, partial| {
                for (a, p) in acc.iter_mut().zip(partial) {
                    *a += p;
                }
                acc
            },
        );

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for v in &mut values {
            *v *= scale;
        }
    }

    debug!(nodes = n, "computed betweenness centrality");
    adjacency.into_scores(values)
}

/// Dependency of `source` on every other node.
fn brandes_from_source(successors: &[Vec<usize>], source: usize) -> Vec<f64> {
    let n = successors.len();
    let mut stack = Vec::with_capacity(n);
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut dist: Vec<Option<usize>> = vec![None; n];

    sigma[source] = 1.0;
    dist[source] = Some(0);
    let mut queue = VecDeque::from([source]);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        let dv = dist[v].unwrap_or(0);
        for &w in &successors[v] {
            if dist[w].is_none() {
                dist[w] = Some(dv + 1);
                queue.push_back(w);
            }
            if dist[w] == Some(dv + 1) {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    let mut dependency = vec![0.0_f64; n];
    while let Some(w) = stack.pop() {
        for &v in &preds[w] {
            delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
        }
        if w != source {
            dependency[w] = delta[w];
        }
    }
    dependency
}
