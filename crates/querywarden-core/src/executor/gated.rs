//! Cost-gated executor
//!
//! Each call checks the breaker, then runs `estimate → authorize → execute`.
//! An open circuit fails fast before the dry run. Only the real execution is
//! wrapped: the breaker sits outside the retry loop, so one exhausted retry
//! sequence counts as one breaker failure.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::types::{ExecutionOptions, ExecutorSettings, QueryOutcome, QueryRequest};
use crate::cost::{CustomerTier, QueryCostEstimate};
use crate::error::{QueryError, QueryResult};
use crate::recovery::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::recovery::{Classify, RetryPolicy};
use crate::warehouse::{QueryParam, QueryService, ResultSet, WarehouseError};

/// Runs queries against one protected service
pub struct CostGatedExecutor {
    service: Arc<dyn QueryService>,
    breaker: Arc<CircuitBreaker>,
    retry: Arc<RetryPolicy>,
    settings: ExecutorSettings,
}

impl CostGatedExecutor {
    pub fn new(
        service: Arc<dyn QueryService>,
        breaker: Arc<CircuitBreaker>,
        retry: Arc<RetryPolicy>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            service,
            breaker,
            retry,
            settings,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn retry_policy(&self) -> &Arc<RetryPolicy> {
        &self.retry
    }

    pub fn service(&self) -> &Arc<dyn QueryService> {
        &self.service
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Dry-run the query and price it. Not retried and not seen by the breaker.
    pub async fn estimate_cost(&self, query: &str) -> QueryResult<QueryCostEstimate> {
        let bytes = self.service.estimate_cost(query).await.map_err(|error| {
            warn!(
                category = error.category().as_str(),
                error = %error,
                "dry-run cost estimation failed"
            );
            QueryError::estimation(&error)
        })?;

        let estimate = self.settings.cost.estimate(bytes);
        debug!(
            bytes = estimate.bytes_processed,
            cost_usd = estimate.estimated_cost_usd,
            "estimated query cost"
        );
        Ok(estimate)
    }

    /// Reject the query when its estimated cost is above the tier's cap
    pub fn authorize(&self, estimate: &QueryCostEstimate, tier: CustomerTier) -> QueryResult<()> {
        let cap_usd = self.settings.tiers.limits(tier).cost_cap_usd;
        let cost_usd = self.settings.cost.cost_for(estimate.bytes_processed);

        if cost_usd > cap_usd {
            warn!(
                tier = tier.as_str(),
                cost_usd, cap_usd, "query rejected by cost limit"
            );
            return Err(QueryError::CostLimitExceeded {
                cost_usd,
                cap_usd,
                tier,
            });
        }
        Ok(())
    }

    /// Deadline for one attempt under these options
    pub fn resolve_timeout(&self, options: &ExecutionOptions) -> Duration {
        let limits = options.tier.map(|tier| self.settings.tiers.limits(tier));
        self.settings.timeouts.resolve(limits, options.timeout)
    }

    /// Estimate, authorize, then run the query under the breaker and retry policy
    #[instrument(skip(self, request, options), fields(service = %self.breaker.service(), tier = tracing::field::Empty))]
    pub async fn execute(
        &self,
        request: &QueryRequest,
        options: &ExecutionOptions,
    ) -> QueryResult<QueryOutcome> {
        let tier = options.tier.unwrap_or(self.settings.default_tier);
        tracing::Span::current().record("tier", tier.as_str());

        // The dry run is a remote call too
        if !self.breaker.is_call_permitted() {
            debug!("circuit open, skipping estimation");
            return Err(QueryError::circuit_open(self.breaker.service()));
        }

        let estimate = self.estimate_cost(&request.sql).await?;
        self.authorize(&estimate, tier)?;

        let timeout = self.resolve_timeout(options);
        let service = self.service.as_ref();
        let retry = self.retry.as_ref();
        let cancel = options.cancel.as_ref();
        let sql = request.sql.as_str();
        let params = request.params.as_slice();

        let result = self
            .breaker
            .call(move || {
                retry.execute(move || run_attempt(service, sql, params, timeout), cancel)
            })
            .await;

        match result {
            Ok(result_set) => Ok(QueryOutcome {
                result_set,
                estimate,
                timeout,
            }),
            Err(CircuitBreakerError::Open { service }) => Err(QueryError::circuit_open(service)),
            Err(CircuitBreakerError::OperationFailed(error)) => {
                let error = QueryError::from(error);
                warn!(
                    code = error.error_code(),
                    detail = error.detail().unwrap_or_default(),
                    "remote execution failed"
                );
                Err(error)
            }
        }
    }
}

/// One remote attempt with the deadline enforced on our side
async fn run_attempt(
    service: &dyn QueryService,
    sql: &str,
    params: &[QueryParam],
    timeout: Duration,
) -> Result<ResultSet, WarehouseError> {
    match tokio::time::timeout(timeout, service.execute(sql, params, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(WarehouseError::timeout(timeout)),
    }
}
