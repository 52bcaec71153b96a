//! Top-K tables over the three centrality metrics.
//!
//! [`RankingTable`] lists, per rank, the node holding that rank for each metric;
//! a row therefore mixes up to three nodes, but every (node, score) pair is
//! consistent. [`NodeCentrality`] rows instead join the three metrics on the
//! node identifier.

use std::cmp::Ordering;

use serde::Serialize;

use crate::centrality::CentralityScores;
use crate::output::CsvRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub rank: usize,
    pub degree_node: Option<String>,
    pub degree_centrality: Option<f64>,
    pub closeness_node: Option<String>,
    pub closeness_centrality: Option<f64>,
    pub betweenness_node: Option<String>,
    pub betweenness_centrality: Option<f64>,
}

impl CsvRow for RankingRow {
    const HEADERS: &'static [&'static str] = &[
        "rank",
        "degree_node",
        "degree_centrality",
        "closeness_node",
        "closeness_centrality",
        "betweenness_node",
        "betweenness_centrality",
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCentrality {
    pub node: String,
    pub degree_centrality: f64,
    pub closeness_centrality: f64,
    pub betweenness_centrality: f64,
}

impl CsvRow for NodeCentrality {
    const HEADERS: &'static [&'static str] = &[
        "node",
        "degree_centrality",
        "closeness_centrality",
        "betweenness_centrality",
    ];
}

/// The three metrics computed over one network.
#[derive(Debug, Clone, Default)]
pub struct CentralityReport {
    pub degree: CentralityScores,
    pub closeness: CentralityScores,
    pub betweenness: CentralityScores,
}

/// Scores sorted by decreasing value; ties broken by node id.
pub fn ranked(scores: &CentralityScores) -> Vec<(&str, f64)> {
    let mut ranked: Vec<(&str, f64)> = scores.iter().map(|(n, &s)| (n.as_str(), s)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    ranked
}

fn cell(column: &[(&str, f64)], i: usize) -> (Option<String>, Option<f64>) {
    match column.get(i) {
        Some(&(node, score)) => (Some(node.to_string()), Some(score)),
        None => (None, None),
    }
}

pub struct RankingTable {
    pub rows: Vec<RankingRow>,
}

impl RankingTable {
    /// Rank each metric independently and keep the first `top_k` ranks.
    pub fn top_k(report: &CentralityReport, top_k: usize) -> Self {
        let degree = ranked(&report.degree);
        let closeness = ranked(&report.closeness);
        let betweenness = ranked(&report.betweenness);
        let depth = degree.len().max(closeness.len()).max(betweenness.len()).min(top_k);

        let rows = (0..depth)
            .map(|i| {
                let (degree_node, degree_centrality) = cell(&degree, i);
                let (closeness_node, closeness_centrality) = cell(&closeness, i);
                let (betweenness_node, betweenness_centrality) = cell(&betweenness, i);
                RankingRow {
                    rank: i + 1,
                    degree_node,
                    degree_centrality,
                    closeness_node,
                    closeness_centrality,
                    betweenness_node,
                    betweenness_centrality,
                }
            })
            .collect();
        RankingTable { rows }
    }
}

impl CentralityReport {
    /// The `top_k` nodes by degree centrality with all three metrics of that node.
    pub fn joined_top_k(&self, top_k: usize) -> Vec<NodeCentrality> {
        ranked(&self.degree)
            .into_iter()
            .take(top_k)
            .map(|(node, degree)| NodeCentrality {
                node: node.to_string(),
                degree_centrality: degree,
                closeness_centrality: self.closeness.get(node).copied().unwrap_or(0.0),
                betweenness_centrality: self.betweenness.get(node).copied().unwrap_or(0.0),
            })
            .collect()
    }

    /// Node with the highest degree centrality.
    pub fn most_central(&self) -> Option<&str> {
        ranked(&self.degree).first().map(|&(node, _)| node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> CentralityScores {
        pairs.iter().map(|&(n, s)| (n.to_string(), s)).collect()
    }

    fn report() -> CentralityReport {
        CentralityReport {
            degree: scores(&[("A", 0.9), ("B", 0.5), ("C", 0.7), ("D", 0.1)]),
            closeness: scores(&[("A", 0.2), ("B", 0.8), ("C", 0.4), ("D", 0.6)]),
            betweenness: scores(&[("A", 0.0), ("B", 0.3), ("C", 0.3), ("D", 0.0)]),
        }
    }

    #[test]
    fn each_metric_column_is_non_increasing() {
        let table = RankingTable::top_k(&report(), 4);
        assert_eq!(table.rows.len(), 4);
        for pair in table.rows.windows(2) {
            assert!(pair[0].degree_centrality >= pair[1].degree_centrality);
            assert!(pair[0].closeness_centrality >= pair[1].closeness_centrality);
            assert!(pair[0].betweenness_centrality >= pair[1].betweenness_centrality);
        }
        assert_eq!(table.rows[0].degree_node.as_deref(), Some("A"));
        assert_eq!(table.rows[0].closeness_node.as_deref(), Some("B"));
        // Ties are broken by node id.
        assert_eq!(table.rows[0].betweenness_node.as_deref(), Some("B"));
        assert_eq!(table.rows[1].betweenness_node.as_deref(), Some("C"));
    }

    #[test]
    fn pairs_in_rank_table_belong_together() {
        let report = report();
        let table = RankingTable::top_k(&report, 2);
        for row in &table.rows {
            let node = row.closeness_node.as_ref().unwrap();
            assert_eq!(Some(report.closeness[node]), row.closeness_centrality);
        }
    }

    #[test]
    fn table_is_truncated_to_available_nodes() {
        let table = RankingTable::top_k(&report(), 10);
        assert_eq!(table.rows.len(), 4);
        assert!(RankingTable::top_k(&CentralityReport::default(), 5).rows.is_empty());
    }

    #[test]
    fn joined_rows_refer_to_one_node() {
        let joined = report().joined_top_k(2);
        assert_eq!(
            joined,
            vec![
                NodeCentrality {
                    node: "A".into(),
                    degree_centrality: 0.9,
                    closeness_centrality: 0.2,
                    betweenness_centrality: 0.0,
                },
                NodeCentrality {
                    node: "C".into(),
                    degree_centrality: 0.7,
                    closeness_centrality: 0.4,
                    betweenness_centrality: 0.3,
                },
            ]
        );
        assert_eq!(report().most_central(), Some("A"));
    }
}
