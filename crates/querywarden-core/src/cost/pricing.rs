//! Per-byte pricing for the metered warehouse

use serde::{Deserialize, Serialize};

/// Bytes in one billing terabyte (2^40)
pub const BYTES_PER_TIB: u64 = 1 << 40;

/// Result of a dry-run estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryCostEstimate {
    /// Bytes the query would scan
    pub bytes_processed: u64,
    /// Cost in USD at the configured rate
    pub estimated_cost_usd: f64,
}

impl QueryCostEstimate {
    /// Scanned volume in billing terabytes
    pub fn terabytes(&self, bytes_per_tb: u64) -> f64 {
        self.bytes_processed as f64 / bytes_per_tb.max(1) as f64
    }
}

/// Flat per-terabyte pricing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// USD charged per billing terabyte
    pub cost_per_tb: f64,
    /// Bytes counted as one billing terabyte
    pub bytes_per_tb: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            cost_per_tb: 5.0,
            bytes_per_tb: BYTES_PER_TIB,
        }
    }
}

impl CostModel {
    pub fn new(cost_per_tb: f64) -> Self {
        Self {
            cost_per_tb,
            ..Default::default()
        }
    }

    pub fn with_bytes_per_tb(mut self, bytes_per_tb: u64) -> Self {
        self.bytes_per_tb = bytes_per_tb;
        self
    }

    /// Cost of scanning `bytes`
    pub fn cost_for(&self, bytes: u64) -> f64 {
        bytes as f64 / self.bytes_per_tb.max(1) as f64 * self.cost_per_tb
    }

    /// Build an estimate from a dry-run byte count
    pub fn estimate(&self, bytes_processed: u64) -> QueryCostEstimate {
        QueryCostEstimate {
            bytes_processed,
            estimated_cost_usd: self.cost_for(bytes_processed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_terabytes_at_five_dollars() {
        let model = CostModel::new(5.0);
        let estimate = model.estimate(3 * BYTES_PER_TIB);

        assert_eq!(estimate.bytes_processed, 3 * BYTES_PER_TIB);
        assert_eq!(estimate.estimated_cost_usd, 15.0);
        assert_eq!(estimate.terabytes(BYTES_PER_TIB), 3.0);
    }

    #[test]
    fn test_zero_bytes_is_free() {
        assert_eq!(CostModel::default().cost_for(0), 0.0);
    }

    #[test]
    fn test_decimal_terabyte() {
        let model = CostModel::new(6.25).with_bytes_per_tb(1_000_000_000_000);
        let cost = model.cost_for(500_000_000_000);
        assert!((cost - 3.125).abs() < 1e-12);
    }
}
