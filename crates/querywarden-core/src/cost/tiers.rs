//! Customer tiers and their query limits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Caller classification used to pick cost caps and timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier {
    Standard,
    Premium,
    Enterprise,
}

impl CustomerTier {
    pub const ALL: [CustomerTier; 3] = [Self::Standard, Self::Premium, Self::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(format!("unknown customer tier: {}", other)),
        }
    }
}

/// Limits applied to one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Deadline for a single query execution
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,
    /// Largest estimated cost a single query may have
    pub cost_cap_usd: f64,
}

impl TierLimits {
    pub fn new(query_timeout: Duration, cost_cap_usd: f64) -> Self {
        Self {
            query_timeout,
            cost_cap_usd,
        }
    }
}

/// Limits for every tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    pub standard: TierLimits,
    pub premium: TierLimits,
    pub enterprise: TierLimits,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            standard: TierLimits::new(Duration::from_secs(30), 10.0),
            premium: TierLimits::new(Duration::from_secs(120), 50.0),
            enterprise: TierLimits::new(Duration::from_secs(300), 200.0),
        }
    }
}

impl TierTable {
    pub fn limits(&self, tier: CustomerTier) -> &TierLimits {
        match tier {
            CustomerTier::Standard => &self.standard,
            CustomerTier::Premium => &self.premium,
            CustomerTier::Enterprise => &self.enterprise,
        }
    }

    pub fn set(&mut self, tier: CustomerTier, limits: TierLimits) {
        match tier {
            CustomerTier::Standard => self.standard = limits,
            CustomerTier::Premium => self.premium = limits,
            CustomerTier::Enterprise => self.enterprise = limits,
        }
    }
}
