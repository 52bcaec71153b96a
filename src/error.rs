use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, analysing or writing the distribution network.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("failed to read transactions from {path}: {source}")]
    ReadCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteCsv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sample fraction must be within [0, 1], got {0}")]
    InvalidFraction(f64),

    #[error("resolution must be positive and finite, got {0}")]
    InvalidResolution(f64),

    #[error("no transactions found for county {0}")]
    EmptyCounty(String),

    #[error("graphviz `dot` exited with {status} while rendering {path}")]
    RenderFailed {
        path: PathBuf,
        status: std::process::ExitStatus,
    },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
