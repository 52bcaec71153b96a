//! Run parameters for the analysis.
//!
//! Every value has a default matching the Michigan statewide study: Wayne
//! county as the test subset, a 5% sample drawn with seed 1, removal of
//! nodes with degree above 2 and Louvain at resolution 1.

use std::path::PathBuf;

use crate::error::{AnalysisError, AnalysisResult};

pub const DEFAULT_INPUT: &str = "arcos-mi-statewide-itemized.csv";
pub const DEFAULT_COUNTY: &str = "WAYNE";
pub const DEFAULT_SAMPLE_FRACTION: f64 = 0.05;
pub const DEFAULT_SEED: u64 = 1;
pub const DEFAULT_DEGREE_THRESHOLD: usize = 2;
pub const DEFAULT_RESOLUTION: f64 = 1.0;
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// CSV file with one row per ARCOS transaction.
    pub input: PathBuf,
    /// Field delimiter of `input`.
    pub delimiter: u8,
    /// Buyer county used as the test subset.
    pub county: String,
    /// Fraction of the aggregated county rows kept in the sample graph.
    pub sample_fraction: f64,
    /// Seed for sampling and for Louvain node ordering.
    pub seed: u64,
    /// Nodes with a degree strictly above this are removed from the sample graph.
    pub degree_threshold: usize,
    /// Louvain resolution; higher values favour smaller communities.
    pub resolution: f64,
    /// Number of rows kept in the ranking tables.
    pub top_k: usize,
    pub output_dir: PathBuf,
    /// Render DOT output to PNG with graphviz.
    pub render_png: bool,
    /// Also run centrality and community detection on the full dataset.
    pub analyze_full: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let input = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(DEFAULT_INPUT))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
        Self {
            input,
            delimiter: b',',
            county: DEFAULT_COUNTY.to_string(),
            sample_fraction: DEFAULT_SAMPLE_FRACTION,
            seed: DEFAULT_SEED,
            degree_threshold: DEFAULT_DEGREE_THRESHOLD,
            resolution: DEFAULT_RESOLUTION,
            top_k: DEFAULT_TOP_K,
            output_dir: PathBuf::from("."),
            render_png: false,
            analyze_full: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(0.0..=1.0).contains(&self.sample_fraction) {
            return Err(AnalysisError::InvalidFraction(self.sample_fraction));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(AnalysisError::InvalidResolution(self.resolution));
        }
        Ok(())
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.county, "WAYNE");
        assert_eq!(config.degree_threshold, 2);
        assert!(config.input.ends_with(DEFAULT_INPUT));
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        let config = AnalysisConfig {
            sample_fraction: 1.5,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidFraction(f)) if f == 1.5
        ));

        let config = AnalysisConfig {
            sample_fraction: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_resolution() {
        let config = AnalysisConfig {
            resolution: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidResolution(_))
        ));
    }
}
