//! End-to-end analysis run: load, aggregate, sample, build and query networks.

use std::fs;

use tracing::{info, info_span, warn};

use crate::aggregate::aggregate;
use crate::centrality::{betweenness_centrality, closeness_centrality, degree_centrality};
use crate::community::{LouvainConfig, Partition, louvain};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::network::{ComponentSummary, DistributionNetwork, render_dot};
use crate::output::write_csv;
use crate::profile::NodeProfile;
use crate::ranking::{CentralityReport, RankingTable};
use crate::records::{Transaction, filter_by_county, load_transactions};
use crate::sample::sample_fraction;

pub const SAMPLE_HISTOGRAM: &str = "degree_histogram_sample.csv";
pub const FULL_HISTOGRAM: &str = "degree_histogram_full.csv";
pub const PRUNED_HISTOGRAM: &str = "degree_histogram_sample_pruned.csv";
pub const SAMPLE_RANKING: &str = "centrality_ranking_sample.csv";
pub const FULL_RANKING: &str = "centrality_ranking.csv";
pub const FULL_BY_NODE: &str = "centrality_by_node.csv";
pub const SAMPLE_COMMUNITIES: &str = "communities_sample.csv";
pub const FULL_COMMUNITIES: &str = "communities_full.csv";
pub const SAMPLE_DOT: &str = "network_sample.dot";
pub const PRUNED_DOT: &str = "network_sample_communities.dot";

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSummary {
    pub nodes: usize,
    pub edges: usize,
    pub max_degree: Option<usize>,
    pub components: ComponentSummary,
}

impl NetworkSummary {
    fn of(network: &DistributionNetwork) -> Self {
        NetworkSummary {
            nodes: network.node_count(),
            edges: network.edge_count(),
            max_degree: network.max_degree(),
            components: network.components(),
        }
    }
}

/// Results for the statewide network.
#[derive(Debug, Clone)]
pub struct FullAnalysis {
    pub summary: NetworkSummary,
    pub most_central: Option<NodeProfile>,
    pub partition: Partition,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub transactions: usize,
    pub county_transactions: usize,
    pub county_pairs: usize,
    pub full_pairs: usize,
    pub sample_pairs: usize,
    pub sample: NetworkSummary,
    pub removed_nodes: Vec<String>,
    pub pruned: NetworkSummary,
    pub sample_partition: Partition,
    pub full: Option<FullAnalysis>,
}

pub fn run(config: &AnalysisConfig) -> AnalysisResult<AnalysisReport> {
    config.validate()?;
    let transactions = load_transactions(&config.input, config.delimiter)?;
    analyze(config, &transactions)
}

/// Run every stage over already loaded transactions, writing outputs to
/// `config.output_dir`.
pub fn analyze(
    config: &AnalysisConfig,
    transactions: &[Transaction],
) -> AnalysisResult<AnalysisReport> {
    config.validate()?;
    fs::create_dir_all(&config.output_dir).map_err(|source| AnalysisError::Io {
        path: config.output_dir.clone(),
        source,
    })?;

    let county = filter_by_county(transactions, &config.county);
    if county.is_empty() {
        return Err(AnalysisError::EmptyCounty(config.county.clone()));
    }
    info!(
        county = %config.county,
        statewide = transactions.len(),
        county_rows = county.len(),
        "selected county subset"
    );

    let county_edges = aggregate(&county);
    let full_edges = aggregate(transactions);
    let sampled = sample_fraction(&county_edges, config.sample_fraction, config.seed)?;

    let louvain_config = LouvainConfig::default()
        .with_resolution(config.resolution)
        .with_seed(config.seed);

    let mut sample = DistributionNetwork::from_edges(&sampled);
    let sample_summary = {
        let _span = info_span!("sample").entered();
        let summary = NetworkSummary::of(&sample);
        write_csv(&config.output_path(SAMPLE_HISTOGRAM), &sample.degree_histogram())?;
        write_dot(config, &sample, SAMPLE_DOT, None)?;

        let report = centrality_report(&sample);
        write_csv(
            &config.output_path(SAMPLE_RANKING),
            &RankingTable::top_k(&report, config.top_k).rows,
        )?;
        summary
    };

    let full = if config.analyze_full {
        let _span = info_span!("full").entered();
        let network = DistributionNetwork::from_edges(&full_edges);
        let summary = NetworkSummary::of(&network);
        if let Some(max_degree) = summary.max_degree {
            info!(max_degree, "statewide degree distribution");
        }
        write_csv(&config.output_path(FULL_HISTOGRAM), &network.degree_histogram())?;

        let report = centrality_report(&network);
        write_csv(
            &config.output_path(FULL_RANKING),
            &RankingTable::top_k(&report, config.top_k).rows,
        )?;
        write_csv(
            &config.output_path(FULL_BY_NODE),
            &report.joined_top_k(config.top_k),
        )?;

        let most_central = report
            .most_central()
            .map(|node| NodeProfile::build(node, transactions, &full_edges));
        if let Some(profile) = &most_central {
            info!(
                node = %profile.node,
                reported = profile.reported_transactions,
                buyers = profile.buyers,
                quantity = profile.total_quantity,
                "most central registrant"
            );
        }

        let partition = louvain(&network.to_undirected(), &louvain_config);
        write_csv(&config.output_path(FULL_COMMUNITIES), &partition.rows())?;

        Some(FullAnalysis {
            summary,
            most_central,
            partition,
        })
    } else {
        None
    };

    let _span = info_span!("pruned").entered();
    let removed_nodes = sample.remove_nodes_above_degree(config.degree_threshold);
    let pruned = NetworkSummary::of(&sample);
    if pruned.nodes == 0 {
        warn!(
            threshold = config.degree_threshold,
            "node removal emptied the sample network"
        );
    }
    write_csv(&config.output_path(PRUNED_HISTOGRAM), &sample.degree_histogram())?;

    let sample_partition = louvain(&sample.to_undirected(), &louvain_config);
    write_csv(&config.output_path(SAMPLE_COMMUNITIES), &sample_partition.rows())?;
    write_dot(config, &sample, PRUNED_DOT, Some(&sample_partition))?;

    Ok(AnalysisReport {
        transactions: transactions.len(),
        county_transactions: county.len(),
        county_pairs: county_edges.len(),
        full_pairs: full_edges.len(),
        sample_pairs: sampled.len(),
        sample: sample_summary,
        removed_nodes,
        pruned,
        sample_partition,
        full,
    })
}

fn centrality_report(network: &DistributionNetwork) -> CentralityReport {
    CentralityReport {
        degree: degree_centrality(network),
        closeness: closeness_centrality(network),
        betweenness: betweenness_centrality(network),
    }
}

fn write_dot(
    config: &AnalysisConfig,
    network: &DistributionNetwork,
    file_name: &str,
    partition: Option<&Partition>,
) -> AnalysisResult<()> {
    let dot_path = config.output_path(file_name);
    network.save_graph_to_dot(&dot_path, partition.map(|p| &p.assignments))?;
    if config.render_png {
        render_dot(&dot_path, &dot_path.with_extension("png"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(seller: &str, buyer: &str, county: &str) -> Transaction {
        Transaction {
            seller: seller.into(),
            buyer: buyer.into(),
            county: county.into(),
            quantity: 1.0,
        }
    }

    #[test]
    fn empty_county_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig {
            output_dir: dir.path().to_path_buf(),
            ..AnalysisConfig::default()
        };
        let err = analyze(&config, &[tx("S", "B", "KENT")]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyCounty(c) if c == "WAYNE"));
    }

    #[test]
    fn skips_full_analysis_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnalysisConfig {
            output_dir: dir.path().to_path_buf(),
            sample_fraction: 1.0,
            analyze_full: false,
            ..AnalysisConfig::default()
        };
        let report = analyze(&config, &[tx("S", "B1", "WAYNE"), tx("S", "B2", "WAYNE")]).unwrap();
        assert!(report.full.is_none());
        assert_eq!(report.sample.nodes, 3);
        assert!(!dir.path().join(FULL_RANKING).exists());
        assert!(dir.path().join(SAMPLE_RANKING).exists());
    }
}
