//! ARCOS transaction rows and CSV ingestion.

use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AnalysisError, AnalysisResult};

/// One reported sale. Columns of the source file other than these are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transaction {
    #[serde(rename = "REPORTER_DEA_NO")]
    pub seller: String,
    #[serde(rename = "BUYER_DEA_NO")]
    pub buyer: String,
    #[serde(rename = "BUYER_COUNTY")]
    pub county: String,
    #[serde(rename = "QUANTITY")]
    pub quantity: f64,
}

pub fn load_transactions(path: &Path, delimiter: u8) -> AnalysisResult<Vec<Transaction>> {
    let reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|source| AnalysisError::ReadCsv {
            path: path.to_path_buf(),
            source,
        })?;
    let transactions = read_transactions(reader).map_err(|source| AnalysisError::ReadCsv {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        rows = transactions.len(),
        "loaded transactions"
    );
    Ok(transactions)
}

/// Parse transactions from any reader, e.g. an in-memory buffer.
pub fn load_transactions_from_reader<R: Read>(
    rdr: R,
    delimiter: u8,
) -> Result<Vec<Transaction>, csv::Error> {
    read_transactions(ReaderBuilder::new().delimiter(delimiter).from_reader(rdr))
}

fn read_transactions<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Transaction>, csv::Error> {
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<Transaction>, csv::Error>>()?;
    Ok(rows)
}

/// Rows whose buyer county equals `county` (exact, case-sensitive match).
pub fn filter_by_county(transactions: &[Transaction], county: &str) -> Vec<Transaction> {
    let subset: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.county == county)
        .cloned()
        .collect();
    debug!(county, rows = subset.len(), "filtered by buyer county");
    subset
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
REPORTER_DEA_NO,REPORTER_NAME,BUYER_DEA_NO,BUYER_COUNTY,DRUG_NAME,QUANTITY
PM0030849,ACME,BW1,WAYNE,OXYCODONE,10
PM0030849,ACME,BW2,WAYNE,HYDROCODONE,2.5
RX1,OTHER,BK1,KENT,OXYCODONE,4
";

    #[test]
    fn reads_named_columns_and_ignores_the_rest() {
        let rows = load_transactions_from_reader(SAMPLE.as_bytes(), b',').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            Transaction {
                seller: "PM0030849".into(),
                buyer: "BW2".into(),
                county: "WAYNE".into(),
                quantity: 2.5,
            }
        );
    }

    #[test]
    fn reads_tab_separated_input() {
        let tsv = SAMPLE.replace(',', "\t");
        let rows = load_transactions_from_reader(tsv.as_bytes(), b'\t').unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].county, "KENT");
    }

    #[test]
    fn malformed_quantity_is_an_error() {
        let bad = "REPORTER_DEA_NO,BUYER_DEA_NO,BUYER_COUNTY,QUANTITY\nA,B,WAYNE,lots\n";
        assert!(load_transactions_from_reader(bad.as_bytes(), b',').is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_transactions(Path::new("/nonexistent/arcos.csv"), b',').unwrap_err();
        assert!(err.to_string().contains("/nonexistent/arcos.csv"));
    }

    #[test]
    fn filters_on_exact_county() {
        let rows = load_transactions_from_reader(SAMPLE.as_bytes(), b',').unwrap();
        let wayne = filter_by_county(&rows, "WAYNE");
        assert_eq!(wayne.len(), 2);
        assert!(wayne.iter().all(|t| t.county == "WAYNE"));
        assert!(filter_by_county(&rows, "wayne").is_empty());
    }
}
