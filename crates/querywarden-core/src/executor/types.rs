//! Request, option and outcome types for the executor

use crate::cost::{CostModel, CustomerTier, QueryCostEstimate, TierTable};
use crate::warehouse::{QueryParam, ResultSet};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::timeouts::TimeoutPolicy;

/// A query and its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: QueryParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = QueryParam>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Per-call execution options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Customer tier; when absent the executor's default tier sets the cost cap
    pub tier: Option<CustomerTier>,
    /// Raw timeout, used only when no tier is given
    pub timeout: Option<Duration>,
    /// Cancels the retry loop while it waits between attempts
    pub cancel: Option<CancellationToken>,
}

impl ExecutionOptions {
    pub fn for_tier(tier: CustomerTier) -> Self {
        Self {
            tier: Some(tier),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// What a successful execution produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub result_set: ResultSet,
    pub estimate: QueryCostEstimate,
    /// Deadline each attempt ran under
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Static settings of one executor
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    pub cost: CostModel,
    pub tiers: TierTable,
    /// Tier whose cost cap applies when a call names none
    pub default_tier: CustomerTier,
    pub timeouts: TimeoutPolicy,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            cost: CostModel::default(),
            tiers: TierTable::default(),
            default_tier: CustomerTier::Standard,
            timeouts: TimeoutPolicy::default(),
        }
    }
}

impl ExecutorSettings {
    pub fn with_cost_model(mut self, cost: CostModel) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_tiers(mut self, tiers: TierTable) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }
}
