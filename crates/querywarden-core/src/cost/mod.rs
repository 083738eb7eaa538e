//! Query cost estimation and customer tier limits
//!
//! # Features
//!
//! - **Pricing**: bytes scanned → USD at a configured per-TB rate
//! - **Tiers**: per-tier cost caps and query timeouts
//!
//! # Example
//!
//! ```
//! use querywarden_core::cost::{CostModel, CustomerTier, TierTable};
//!
//! let model = CostModel::new(5.0);
//! let estimate = model.estimate(3 * (1u64 << 40));
//! assert_eq!(estimate.estimated_cost_usd, 15.0);
//!
//! let tiers = TierTable::default();
//! assert!(estimate.estimated_cost_usd > tiers.limits(CustomerTier::Standard).cost_cap_usd);
//! ```

pub mod pricing;
pub mod tiers;

pub use pricing::{BYTES_PER_TIB, CostModel, QueryCostEstimate};
pub use tiers::{CustomerTier, TierLimits, TierTable};
