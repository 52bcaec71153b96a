//! Drill-down on a single registrant, typically the most central distributor.

use serde::Serialize;

use crate::aggregate::AggregatedEdge;
use crate::records::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeProfile {
    pub node: String,
    /// Raw transactions the node reported as seller.
    pub reported_transactions: usize,
    /// Aggregated (seller, buyer, county) rows with the node as seller.
    pub aggregated_rows: usize,
    /// Distinct buyers supplied by the node.
    pub buyers: usize,
    pub total_quantity: f64,
}

impl NodeProfile {
    pub fn build(node: &str, transactions: &[Transaction], aggregated: &[AggregatedEdge]) -> Self {
        let reported_transactions = transactions.iter().filter(|t| t.seller == node).count();

        let rows: Vec<&AggregatedEdge> = aggregated.iter().filter(|e| e.seller == node).collect();
        let mut buyers: Vec<&str> = rows.iter().map(|e| e.buyer.as_str()).collect();
        buyers.sort_unstable();
        buyers.dedup();

        NodeProfile {
            node: node.to_string(),
            reported_transactions,
            aggregated_rows: rows.len(),
            buyers: buyers.len(),
            total_quantity: rows.iter().map(|e| e.quantity).sum(),
        }
    }
}
