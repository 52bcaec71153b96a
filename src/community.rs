//! Louvain community detection.
//!
//! Two phases repeat until modularity stops improving:
//!
//! 1. **Local moves**: visit nodes in a seeded random order and move each one to
//!    the neighbouring community with the largest modularity gain.
//! 2. **Aggregation**: collapse every community into a single node; edge weights
//!    between the new nodes are the summed weights between their members and
//!    edges inside a community become a self-loop.
//!
//! The partition of the last level that improved modularity is mapped back to
//! the original nodes.

use std::collections::{BTreeMap, HashMap};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info};

use crate::network::UndirectedNetwork;
use crate::output::CsvRow;

/// Smallest modularity gain that counts as an improvement.
const MIN_GAIN: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct LouvainConfig {
    /// Resolution parameter; values above 1 favour smaller communities.
    /// Default: 1.0
    pub resolution: f64,
    /// Seed for the node visiting order.
    /// Default: 1
    pub seed: u64,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            seed: 1,
        }
    }
}

impl LouvainConfig {
    pub const fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityRow {
    pub node: String,
    pub community: usize,
}

impl CsvRow for CommunityRow {
    const HEADERS: &'static [&'static str] = &["node", "community"];
}

/// Node → community assignment produced by [`louvain`].
#[derive(Debug, Clone)]
pub struct Partition {
    /// Dense community ids `0..num_communities`.
    pub assignments: HashMap<String, usize>,
    pub num_communities: usize,
    pub modularity: f64,
    /// Aggregation levels that improved modularity.
    pub levels: usize,
}

impl Partition {
    pub fn communities(&self) -> BTreeMap<usize, Vec<String>> {
        let mut communities: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (node, &community) in &self.assignments {
            communities.entry(community).or_default().push(node.clone());
        }
        for members in communities.values_mut() {
            members.sort();
        }
        communities
    }

    /// Rows ordered by community, then node.
    pub fn rows(&self) -> Vec<CommunityRow> {
        self.communities()
            .into_iter()
            .flat_map(|(community, members)| {
                members
                    .into_iter()
                    .map(move |node| CommunityRow { node, community })
            })
            .collect()
    }
}

/// Weighted undirected graph over dense indices.
#[derive(Debug, Clone)]
struct LevelGraph {
    /// Neighbours other than the node itself, each edge stored at both ends.
    neighbors: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    /// Sum of all edge weights, each edge counted once.
    total_weight: f64,
}

impl LevelGraph {
    fn from_network(graph: &UndirectedNetwork) -> Self {
        let n = graph.node_count();
        let mut level = LevelGraph {
            neighbors: vec![Vec::new(); n],
            self_loops: vec![0.0; n],
            total_weight: 0.0,
        };
        for edge in graph.raw_edges() {
            level.add_edge(edge.source().index(), edge.target().index(), edge.weight);
        }
        level
    }

    fn add_edge(&mut self, a: usize, b: usize, weight: f64) {
        if a == b {
            self.self_loops[a] += weight;
        } else {
            self.neighbors[a].push((b, weight));
            self.neighbors[b].push((a, weight));
        }
        self.total_weight += weight;
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Weighted degree; a self-loop counts twice.
    fn degree(&self, i: usize) -> f64 {
        self.neighbors[i].iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * self.self_loops[i]
    }

    /// Collapse each community of `community` (dense ids `0..count`) into one node.
    fn induced(&self, community: &[usize], count: usize) -> Self {
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut self_loops = vec![0.0; count];

        for i in 0..self.len() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for &(j, w) in &self.neighbors[i] {
                if i >= j {
                    continue;
                }
                let cj = community[j];
                if ci == cj {
                    self_loops[ci] += w;
                } else {
                    *between.entry((ci.min(cj), ci.max(cj))).or_insert(0.0) += w;
                }
            }
        }

        let mut induced = LevelGraph {
            neighbors: vec![Vec::new(); count],
            self_loops: vec![0.0; count],
            total_weight: 0.0,
        };
        for (c, &w) in self_loops.iter().enumerate() {
            if w != 0.0 {
                induced.add_edge(c, c, w);
            }
        }
        for ((a, b), w) in between {
            induced.add_edge(a, b, w);
        }
        induced
    }
}

/// Running community totals for one level.
struct Status {
    community: Vec<usize>,
    /// Node weighted degrees.
    degree: Vec<f64>,
    /// Sum of member degrees per community.
    total: Vec<f64>,
    /// Weight of edges inside each community, each edge counted once.
    internal: Vec<f64>,
}

impl Status {
    fn new(graph: &LevelGraph) -> Self {
        let degree: Vec<f64> = (0..graph.len()).map(|i| graph.degree(i)).collect();
        Status {
            community: (0..graph.len()).collect(),
            total: degree.clone(),
            internal: graph.self_loops.clone(),
            degree,
        }
    }

    fn modularity(&self, total_weight: f64, resolution: f64) -> f64 {
        let m = total_weight;
        self.internal
            .iter()
            .zip(&self.total)
            .filter(|&(_, &tot)| tot > 0.0)
            .map(|(&inside, &tot)| inside / m - resolution * (tot / (2.0 * m)).powi(2))
            .sum()
    }
}

/// Weight from node `i` to each neighbouring community, in ascending community order.
fn neighbour_communities(graph: &LevelGraph, status: &Status, i: usize) -> Vec<(usize, f64)> {
    let mut weights: BTreeMap<usize, f64> = BTreeMap::new();
    for &(j, w) in &graph.neighbors[i] {
        *weights.entry(status.community[j]).or_insert(0.0) += w;
    }
    weights.into_iter().collect()
}

/// Repeated local-move sweeps until no sweep improves modularity by `MIN_GAIN`.
fn one_level(graph: &LevelGraph, status: &mut Status, resolution: f64, rng: &mut StdRng) {
    let m = graph.total_weight;
    let mut modularity = status.modularity(m, resolution);
    let mut order: Vec<usize> = (0..graph.len()).collect();

    loop {
        let mut moved = false;
        order.shuffle(rng);

        for &i in &order {
            let current = status.community[i];
            let ki = status.degree[i];
            let degree_share = ki / (2.0 * m);

            let mut neighbours = neighbour_communities(graph, status, i);
            neighbours.shuffle(rng);
            let weight_to = |c: usize| {
                neighbours
                    .iter()
                    .find(|&&(nc, _)| nc == c)
                    .map_or(0.0, |&(_, w)| w)
            };

            let own_weight = weight_to(current);
            status.total[current] -= ki;
            status.internal[current] -= own_weight + graph.self_loops[i];

            let remove_cost = -own_weight + resolution * status.total[current] * degree_share;
            let mut best = current;
            let mut best_gain = 0.0;
            for &(c, w) in &neighbours {
                let gain = remove_cost + w - resolution * status.total[c] * degree_share;
                if gain > best_gain {
                    best_gain = gain;
                    best = c;
                }
            }

            status.total[best] += ki;
            status.internal[best] += weight_to(best) + graph.self_loops[i];
            status.community[i] = best;
            if best != current {
                moved = true;
            }
        }

        let new_modularity = status.modularity(m, resolution);
        if !moved || new_modularity - modularity < MIN_GAIN {
            break;
        }
        modularity = new_modularity;
    }
}

/// Relabel communities densely by order of first appearance.
fn renumber(community: &[usize]) -> (Vec<usize>, usize) {
    let mut ids: HashMap<usize, usize> = HashMap::new();
    let relabelled = community
        .iter()
        .map(|&c| {
            let next = ids.len();
            *ids.entry(c).or_insert(next)
        })
        .collect();
    (relabelled, ids.len())
}

/// Best Louvain partition of `graph`, weighted by edge weight.
///
/// A graph without edges puts every node in its own community.
pub fn louvain(graph: &UndirectedNetwork, config: &LouvainConfig) -> Partition {
    let names: Vec<String> = graph.raw_nodes().iter().map(|n| n.weight.clone()).collect();
    let base = LevelGraph::from_network(graph);
    let n = base.len();

    if n == 0 || base.total_weight == 0.0 {
        let assignments: HashMap<String, usize> =
            names.into_iter().enumerate().map(|(i, name)| (name, i)).collect();
        debug!(nodes = n, "graph has no edges; every node is its own community");
        return Partition {
            assignments,
            num_communities: n,
            modularity: 0.0,
            levels: 0,
        };
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    // Community of each original node at the current level.
    let mut membership: Vec<usize> = (0..n).collect();
    let mut level = base;
    let mut modularity = f64::NEG_INFINITY;
    let mut levels = 0;
    let mut num_communities = n;

    loop {
        let mut status = Status::new(&level);
        one_level(&level, &mut status, config.resolution, &mut rng);
        let new_modularity = status.modularity(level.total_weight, config.resolution);

        if levels > 0 && new_modularity - modularity < MIN_GAIN {
            break;
        }

        let (relabelled, count) = renumber(&status.community);
        for c in membership.iter_mut() {
            *c = relabelled[*c];
        }
        levels += 1;
        modularity = new_modularity;
        num_communities = count;
        debug!(level = levels, communities = count, modularity, "louvain level");

        if count == level.len() {
            break;
        }
        level = level.induced(&relabelled, count);
    }

    let assignments: HashMap<String, usize> = names.into_iter().zip(membership).collect();
    info!(
        nodes = n,
        communities = num_communities,
        modularity,
        levels,
        "detected communities"
    );
    Partition {
        assignments,
        num_communities,
        modularity,
        levels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::Graph;

    fn undirected(edges: &[(&str, &str, f64)]) -> UndirectedNetwork {
        let mut graph: UndirectedNetwork = Graph::new_undirected();
        let mut indices = HashMap::new();
        for &(a, b, w) in edges {
            let ia = *indices.entry(a).or_insert_with(|| graph.add_node(a.to_string()));
            let ib = *indices.entry(b).or_insert_with(|| graph.add_node(b.to_string()));
            graph.add_edge(ia, ib, w);
        }
        graph
    }

    fn two_triangles(bridge: f64) -> UndirectedNetwork {
        undirected(&[
            ("a1", "a2", 1.0),
            ("a2", "a3", 1.0),
            ("a3", "a1", 1.0),
            ("b1", "b2", 1.0),
            ("b2", "b3", 1.0),
            ("b3", "b1", 1.0),
            ("a3", "b1", bridge),
        ])
    }

    #[test]
    fn separates_two_triangles() {
        let partition = louvain(&two_triangles(1.0), &LouvainConfig::default());
        assert_eq!(partition.num_communities, 2);
        let a = partition.assignments["a1"];
        let b = partition.assignments["b1"];
        assert_ne!(a, b);
        for node in ["a2", "a3"] {
            assert_eq!(partition.assignments[node], a);
        }
        for node in ["b2", "b3"] {
            assert_eq!(partition.assignments[node], b);
        }
        // Q = 2 * (3/7 - (7/14)^2)
        assert!((partition.modularity - (6.0 / 7.0 - 0.5)).abs() < 1e-9);
    }

    #[test]
    fn heavy_bridge_merges_the_triangles() {
        let partition = louvain(&two_triangles(100.0), &LouvainConfig::default());
        // The bridge dominates the weight: its endpoints pair up.
        assert_eq!(partition.assignments["a3"], partition.assignments["b1"]);
    }

    #[test]
    fn ids_are_dense() {
        let partition = louvain(&two_triangles(1.0), &LouvainConfig::default());
        let mut ids: Vec<usize> = partition.assignments.values().copied().collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids, (0..partition.num_communities).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_partition() {
        let graph = two_triangles(1.0);
        let config = LouvainConfig::default().with_seed(42);
        let first = louvain(&graph, &config);
        let second = louvain(&graph, &config);
        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn higher_resolution_gives_more_communities() {
        let graph = two_triangles(1.0);
        let coarse = louvain(&graph, &LouvainConfig::default());
        let fine = louvain(&graph, &LouvainConfig::default().with_resolution(10.0));
        assert!(fine.num_communities > coarse.num_communities);
    }

    #[test]
    fn edgeless_graph_gives_singletons() {
        let mut graph: UndirectedNetwork = Graph::new_undirected();
        graph.add_node("x".into());
        graph.add_node("y".into());
        let partition = louvain(&graph, &LouvainConfig::default());
        assert_eq!(partition.num_communities, 2);
        assert_ne!(partition.assignments["x"], partition.assignments["y"]);

        let empty = louvain(&Graph::new_undirected(), &LouvainConfig::default());
        assert_eq!(empty.num_communities, 0);
    }

    #[test]
    fn self_loops_are_accepted() {
        let graph = undirected(&[("p", "p", 2.0), ("p", "q", 1.0), ("r", "s", 1.0)]);
        let partition = louvain(&graph, &LouvainConfig::default());
        assert_eq!(partition.assignments["p"], partition.assignments["q"]);
        assert_ne!(partition.assignments["p"], partition.assignments["r"]);
        assert_eq!(partition.assignments.len(), 4);
    }

    #[test]
    fn rows_are_grouped_by_community() {
        let partition = louvain(&two_triangles(1.0), &LouvainConfig::default());
        let rows = partition.rows();
        assert_eq!(rows.len(), 6);
        assert!(rows.windows(2).all(|w| w[0].community <= w[1].community));
        assert_eq!(partition.communities().len(), 2);
    }
}
