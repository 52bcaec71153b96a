use std::path::PathBuf;

use anyhow::Context;
use arcos_network::config::{
    DEFAULT_COUNTY, DEFAULT_DEGREE_THRESHOLD, DEFAULT_RESOLUTION, DEFAULT_SAMPLE_FRACTION,
    DEFAULT_SEED, DEFAULT_TOP_K,
};
use arcos_network::{AnalysisConfig, AnalysisReport, run};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arcos-network", version, about = "Network analysis of ARCOS opioid transactions")]
struct Cli {
    /// Transaction CSV (defaults to ~/arcos-mi-statewide-itemized.csv)
    #[arg(long, env = "ARCOS_INPUT")]
    input: Option<PathBuf>,

    /// Field delimiter of the input file
    #[arg(long, default_value = ",", value_parser = parse_delimiter, env = "ARCOS_DELIMITER")]
    delimiter: u8,

    /// Buyer county used as the test subset
    #[arg(long, default_value = DEFAULT_COUNTY, env = "ARCOS_COUNTY")]
    county: String,

    /// Fraction of the county's aggregated rows to sample
    #[arg(long, default_value_t = DEFAULT_SAMPLE_FRACTION, env = "ARCOS_SAMPLE_FRACTION")]
    sample_fraction: f64,

    /// Seed for sampling and community detection
    #[arg(long, default_value_t = DEFAULT_SEED, env = "ARCOS_SEED")]
    seed: u64,

    /// Remove sample nodes with a degree above this value
    #[arg(long, default_value_t = DEFAULT_DEGREE_THRESHOLD, env = "ARCOS_DEGREE_THRESHOLD")]
    degree_threshold: usize,

    /// Louvain resolution
    #[arg(long, default_value_t = DEFAULT_RESOLUTION, env = "ARCOS_RESOLUTION")]
    resolution: f64,

    /// Rows kept in the centrality rankings
    #[arg(long, default_value_t = DEFAULT_TOP_K, env = "ARCOS_TOP_K")]
    top_k: usize,

    /// Directory for CSV and DOT output
    #[arg(long, default_value = ".", env = "ARCOS_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Render DOT files to PNG with graphviz
    #[arg(long)]
    render: bool,

    /// Only analyse the county sample
    #[arg(long)]
    skip_full: bool,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single ASCII character, got {:?}", s)),
    }
}

impl Cli {
    fn into_config(self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            input: self.input.unwrap_or(defaults.input),
            delimiter: self.delimiter,
            county: self.county,
            sample_fraction: self.sample_fraction,
            seed: self.seed,
            degree_threshold: self.degree_threshold,
            resolution: self.resolution,
            top_k: self.top_k,
            output_dir: self.output_dir,
            render_png: self.render,
            analyze_full: !self.skip_full,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Resolve configuration
    let config = Cli::parse().into_config();

    // 2. Run the analysis
    let report = run(&config)
        .with_context(|| format!("analysis of {} failed", config.input.display()))?;

    // 3. Print summary
    print_summary(&config, &report);
    Ok(())
}

fn print_summary(config: &AnalysisConfig, report: &AnalysisReport) {
    println!(
        "Transactions: {} statewide, {} in {}",
        report.transactions, report.county_transactions, config.county
    );
    println!(
        "Deduplicated pairs: {} statewide, {} in {}, {} sampled",
        report.full_pairs, report.county_pairs, config.county, report.sample_pairs
    );
    println!(
        "Sample network: {} nodes, {} edges, {} components",
        report.sample.nodes, report.sample.edges, report.sample.components.count
    );
    println!(
        "Removed {} nodes with degree > {}; {} nodes remain",
        report.removed_nodes.len(),
        config.degree_threshold,
        report.pruned.nodes
    );
    println!(
        "Detected {} communities in the sample (modularity {:.4})",
        report.sample_partition.num_communities, report.sample_partition.modularity
    );

    if let Some(full) = &report.full {
        println!(
            "Statewide network: {} nodes, {} edges, max degree {}",
            full.summary.nodes,
            full.summary.edges,
            full.summary.max_degree.unwrap_or(0)
        );
        if let Some(profile) = &full.most_central {
            println!(
                "Most central registrant {}: {} transactions to {} buyers, quantity {:.0}",
                profile.node, profile.reported_transactions, profile.buyers, profile.total_quantity
            );
        }
        println!(
            "Detected {} communities statewide (modularity {:.4})",
            full.partition.num_communities, full.partition.modularity
        );
    }
    println!("Output written to {}", config.output_dir.display());
}
