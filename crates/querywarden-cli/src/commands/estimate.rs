//! Cost estimation command

use crate::console::CliConsole;
use querywarden_core::config::{QueryWardenConfig, load_config};
use querywarden_core::cost::{CustomerTier, QueryCostEstimate};
use std::path::Path;

/// Verdict for one estimate against one tier
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub tier: CustomerTier,
    pub estimate: QueryCostEstimate,
    pub cap_usd: f64,
}

impl Verdict {
    pub fn allowed(&self) -> bool {
        self.estimate.estimated_cost_usd <= self.cap_usd
    }
}

pub fn evaluate(config: &QueryWardenConfig, bytes: u64, tier: Option<CustomerTier>) -> Verdict {
    let tier = tier.unwrap_or(config.service.default_tier);
    Verdict {
        tier,
        estimate: config.cost_model().estimate(bytes),
        cap_usd: config.tiers.get(tier).cost_cap_usd,
    }
}

pub fn run(config_path: Option<&Path>, bytes: u64, tier: Option<CustomerTier>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let verdict = evaluate(&config, bytes, tier);
    let console = CliConsole::new(true);

    console.print_header("Query Cost Estimate");
    console.field("bytes processed", verdict.estimate.bytes_processed);
    console.field(
        "terabytes",
        format!("{:.4}", verdict.estimate.terabytes(config.cost.bytes_per_tb)),
    );
    console.field("estimated cost", format!("${:.2}", verdict.estimate.estimated_cost_usd));
    console.field(
        "tier cap",
        format!("${:.2} ({})", verdict.cap_usd, verdict.tier),
    );

    if verdict.allowed() {
        console.success("Query is within the tier's cost limit");
    } else {
        console.warn(&format!(
            "Query cost ${:.2} exceeds the {} tier limit of ${:.2}",
            verdict.estimate.estimated_cost_usd, verdict.tier, verdict.cap_usd
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use querywarden_core::cost::BYTES_PER_TIB;

    #[test]
    fn test_three_terabytes_by_tier() {
        let config = QueryWardenConfig::default();

        let standard = evaluate(&config, 3 * BYTES_PER_TIB, None);
        assert_eq!(standard.tier, CustomerTier::Standard);
        assert_eq!(standard.estimate.estimated_cost_usd, 15.0);
        assert!(!standard.allowed());

        let premium = evaluate(&config, 3 * BYTES_PER_TIB, Some(CustomerTier::Premium));
        assert!(premium.allowed());
    }
}
