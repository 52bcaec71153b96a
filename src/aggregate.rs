//! Deduplication of transactions into weighted seller → buyer edges.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::records::Transaction;

/// All transactions sharing one (seller, buyer, county) key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEdge {
    pub seller: String,
    pub buyer: String,
    pub county: String,
    pub transactions: u64,
    pub quantity: f64,
}

/// Group transactions by (seller, buyer, county), counting rows and summing quantity.
///
/// Output is ordered by key and holds exactly one row per key.
pub fn aggregate(transactions: &[Transaction]) -> Vec<AggregatedEdge> {
    let mut groups: BTreeMap<(&str, &str, &str), (u64, f64)> = BTreeMap::new();
    for t in transactions {
        let entry = groups
            .entry((t.seller.as_str(), t.buyer.as_str(), t.county.as_str()))
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += t.quantity;
    }

    let edges: Vec<AggregatedEdge> = groups
        .into_iter()
        .map(|((seller, buyer, county), (transactions, quantity))| AggregatedEdge {
            seller: seller.to_string(),
            buyer: buyer.to_string(),
            county: county.to_string(),
            transactions,
            quantity,
        })
        .collect();

    info!(
        input_rows = transactions.len(),
        unique_pairs = edges.len(),
        "aggregated transactions"
    );
    edges
}
