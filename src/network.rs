//! Directed seller → buyer network built from aggregated transactions.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::process::Command;

use petgraph::Direction::{Incoming, Outgoing};
use petgraph::Graph;
use petgraph::Undirected;
use petgraph::algo::connected_components;
use petgraph::dot::{Config, Dot};
use petgraph::stable_graph::{EdgeReference, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::AggregatedEdge;
use crate::error::{AnalysisError, AnalysisResult};
use crate::output::CsvRow;

/// Undirected view of a network, used for community detection.
pub type UndirectedNetwork = Graph<String, f64, Undirected>;

/// Number of nodes having each degree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeBin {
    pub degree: usize,
    pub count: usize,
}

impl CsvRow for DegreeBin {
    const HEADERS: &'static [&'static str] = &["degree", "count"];
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSummary {
    pub count: usize,
    pub largest: usize,
}

/// Directed graph keyed by DEA number, weighted by summed quantity.
///
/// Backed by a stable graph so node indices survive [`remove_nodes_above_degree`].
///
/// [`remove_nodes_above_degree`]: DistributionNetwork::remove_nodes_above_degree
pub struct DistributionNetwork {
    pub graph: StableDiGraph<String, f64>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DistributionNetwork {
    pub fn new() -> Self {
        DistributionNetwork {
            graph: StableDiGraph::new(),
            node_indices: HashMap::new(),
        }
    }

    /// One edge per aggregated row. Rows sharing a (seller, buyer) pair across
    /// counties land on the same edge with their quantities summed.
    pub fn from_edges(edges: &[AggregatedEdge]) -> Self {
        let mut network = Self::new();
        for edge in edges {
            network.add_transaction(&edge.seller, &edge.buyer, edge.quantity);
        }
        info!(
            nodes = network.node_count(),
            edges = network.edge_count(),
            "built distribution network"
        );
        network
    }

    pub fn add_transaction(&mut self, seller: &str, buyer: &str, quantity: f64) {
        let from = self.ensure_node(seller);
        let to = self.ensure_node(buyer);

        if let Some(edge) = self.graph.find_edge(from, to) {
            self.graph[edge] += quantity;
        } else {
            self.graph.add_edge(from, to, quantity);
        }
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.node_indices.insert(id.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_indices.get(id).copied()
    }

    /// Live node indices, in insertion order.
    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    pub fn name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    /// In-degree plus out-degree; a self-loop counts twice.
    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Outgoing).count()
            + self.graph.edges_directed(idx, Incoming).count()
    }

    pub fn degrees(&self) -> Vec<(NodeIndex, usize)> {
        self.graph
            .node_indices()
            .map(|idx| (idx, self.degree(idx)))
            .collect()
    }

    pub fn max_degree(&self) -> Option<usize> {
        self.degrees().into_iter().map(|(_, d)| d).max()
    }

    /// Degree distribution, ascending by degree.
    pub fn degree_histogram(&self) -> Vec<DegreeBin> {
        let mut bins: BTreeMap<usize, usize> = BTreeMap::new();
        for (_, degree) in self.degrees() {
            *bins.entry(degree).or_insert(0) += 1;
        }
        bins.into_iter()
            .map(|(degree, count)| DegreeBin { degree, count })
            .collect()
    }

    /// Remove, in place, every node whose degree exceeds `threshold`.
    ///
    /// Degrees are measured once, before any removal, so the set removed does not
    /// depend on iteration order. Returns the removed identifiers.
    pub fn remove_nodes_above_degree(&mut self, threshold: usize) -> Vec<String> {
        let doomed: Vec<NodeIndex> = self
            .degrees()
            .into_iter()
            .filter(|&(_, degree)| degree > threshold)
            .map(|(idx, _)| idx)
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for idx in doomed {
            if let Some(name) = self.graph.remove_node(idx) {
                self.node_indices.remove(&name);
                removed.push(name);
            }
        }
        info!(
            threshold,
            removed = removed.len(),
            remaining = self.node_count(),
            "removed high-degree nodes"
        );
        removed
    }

    /// Undirected projection. Reciprocal edges collapse into one edge carrying
    /// the sum of both quantities; self-loops are kept.
    pub fn to_undirected(&self) -> UndirectedNetwork {
        let mut undirected: UndirectedNetwork = Graph::new_undirected();
        let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for idx in self.graph.node_indices() {
            mapping.insert(idx, undirected.add_node(self.graph[idx].clone()));
        }

        for edge in self.graph.edge_references() {
            let a = mapping[&edge.source()];
            let b = mapping[&edge.target()];
            if let Some(existing) = undirected.find_edge(a, b) {
                undirected[existing] += *edge.weight();
            } else {
                undirected.add_edge(a, b, *edge.weight());
            }
        }
        debug!(
            nodes = undirected.node_count(),
            edges = undirected.edge_count(),
            "projected network to undirected graph"
        );
        undirected
    }

    /// Weakly connected components.
    pub fn components(&self) -> ComponentSummary {
        let undirected = self.to_undirected();
        let count = connected_components(&undirected);
        let largest = largest_component(&undirected);
        ComponentSummary { count, largest }
    }

    /// Write the network in Graphviz DOT format.
    ///
    /// With `communities`, nodes are filled with one hue per community; without,
    /// node font size grows with degree.
    pub fn save_graph_to_dot(
        &self,
        path: &Path,
        communities: Option<&HashMap<String, usize>>,
    ) -> AnalysisResult<()> {
        let edge_attrs = |_: &StableDiGraph<String, f64>, edge: EdgeReference<'_, f64>| {
            format!("label=\"{:.0}\"", edge.weight())
        };
        let node_attrs = |_: &StableDiGraph<String, f64>, (idx, name): (NodeIndex, &String)| {
            match communities.and_then(|c| c.get(name)) {
                Some(&comm_id) => {
                    let hue = (comm_id as f64 * 0.618_034).fract();
                    format!(
                        "label=\"{}\", style=filled, fillcolor=\"{:.3} 0.5 0.9\"",
                        name, hue
                    )
                }
                None => format!(
                    "label=\"{}\", fontsize={}",
                    name,
                    8 + self.degree(idx) * 2
                ),
            }
        };
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[Config::EdgeNoLabel, Config::NodeNoLabel],
            &edge_attrs,
            &node_attrs,
        );

        std::fs::write(path, format!("{:?}", dot)).map_err(|source| AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "wrote dot file");
        Ok(())
    }
}

impl Default for DistributionNetwork {
    fn default() -> Self {
        Self::new()
    }
}

fn largest_component(graph: &UndirectedNetwork) -> usize {
    let mut sets = petgraph::unionfind::UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        sets.union(edge.source().index(), edge.target().index());
    }
    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for label in sets.into_labeling() {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes.into_values().max().unwrap_or(0)
}

/// Render a DOT file to PNG with the graphviz `dot` binary.
pub fn render_dot(dot_file: &Path, output_image: &Path) -> AnalysisResult<()> {
    let status = Command::new("dot")
        .arg("-Tpng")
        .arg(dot_file)
        .arg("-o")
        .arg(output_image)
        .status()
        .map_err(|source| AnalysisError::Io {
            path: dot_file.to_path_buf(),
            source,
        })?;

    if !status.success() {
        return Err(AnalysisError::RenderFailed {
            path: dot_file.to_path_buf(),
            status,
        });
    }
    info!(image = %output_image.display(), "rendered network image");
    Ok(())
}
