//! Network analysis of opioid distribution in the DEA ARCOS transaction data.
//!
//! Transactions are aggregated into weighted distributor → buyer edges, from
//! which directed networks are built for one county sample and for the whole
//! dataset. The crate then ranks registrants by degree, closeness and
//! betweenness centrality, prunes high-degree hubs, and partitions the
//! network into Louvain communities.

pub mod aggregate;
pub mod centrality;
pub mod community;
pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod ranking;
pub mod records;
pub mod sample;

pub use aggregate::{AggregatedEdge, aggregate};
pub use centrality::{
    CentralityScores, betweenness_centrality, closeness_centrality, degree_centrality,
};
pub use community::{LouvainConfig, Partition, louvain};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult};
pub use network::{DegreeBin, DistributionNetwork, UndirectedNetwork};
pub use pipeline::{AnalysisReport, analyze, run};
pub use profile::NodeProfile;
pub use ranking::{CentralityReport, NodeCentrality, RankingTable};
pub use records::{Transaction, filter_by_county, load_transactions};
pub use sample::sample_fraction;
