//! Resilient exporter

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::types::{ExportResult, HealthReport, HealthStatus};
use crate::config::QueryWardenConfig;
use crate::error::{QueryError, QueryResult};
use crate::executor::{CostGatedExecutor, ExecutionOptions, QueryRequest};
use crate::recovery::circuit_breaker::CircuitBreakerRegistry;
use crate::recovery::{Classify, RetryPolicy};
use crate::sink::{FallbackSink, JsonlFallbackSink, TableRecords, record_count};
use crate::warehouse::{QueryParam, QueryService};

/// Name of the array parameter carrying a table's rows
pub const ROWS_PARAM: &str = "rows";

/// Batch writer that degrades to a local sink
pub struct ResilientExporter {
    executor: CostGatedExecutor,
    sink: Arc<dyn FallbackSink>,
    dataset: String,
}

impl ResilientExporter {
    pub fn new(
        executor: CostGatedExecutor,
        sink: Arc<dyn FallbackSink>,
        dataset: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            sink,
            dataset: dataset.into(),
        }
    }

    /// Wire an exporter from configuration.
    ///
    /// The breaker comes from `registry`, so exporters for the same service
    /// share one. The fallback sink is a [`JsonlFallbackSink`] rooted at the
    /// configured directory.
    pub fn from_config(
        config: &QueryWardenConfig,
        service: Arc<dyn QueryService>,
        registry: &CircuitBreakerRegistry,
    ) -> QueryResult<Self> {
        config.validate()?;

        let breaker = registry.get_with_config(&config.service.name, config.circuit_breaker_config());
        let retry = Arc::new(RetryPolicy::with_config(config.retry_config()));
        let executor =
            CostGatedExecutor::new(service, breaker, retry, config.executor_settings());
        let sink = Arc::new(JsonlFallbackSink::new(config.fallback.resolved_directory()));

        Ok(Self::new(executor, sink, config.service.dataset.clone()))
    }

    pub fn executor(&self) -> &CostGatedExecutor {
        &self.executor
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Export with the executor's default tier
    pub async fn export_batch(&self, customer_id: &str, tables: &TableRecords) -> ExportResult {
        self.export_batch_with(customer_id, tables, &ExecutionOptions::default())
            .await
    }

    /// Export a batch, redirecting it to the fallback sink on any failure
    #[instrument(skip(self, tables, options), fields(records = record_count(tables)))]
    pub async fn export_batch_with(
        &self,
        customer_id: &str,
        tables: &TableRecords,
        options: &ExecutionOptions,
    ) -> ExportResult {
        let breaker = self.executor.breaker();
        if !breaker.is_healthy() {
            warn!(
                circuit = breaker.service(),
                "circuit breaker open, exporting to fallback sink"
            );
            return self
                .export_to_fallback(customer_id, tables, &QueryError::circuit_open(breaker.service()))
                .await;
        }

        match self.write_primary(tables, options).await {
            Ok(records) => {
                info!(customer_id, records, "batch exported to primary warehouse");
                ExportResult::primary(customer_id, records)
            }
            Err(error) => {
                warn!(
                    customer_id,
                    code = error.error_code(),
                    category = error.category().as_str(),
                    "primary export failed, switching to fallback sink"
                );
                self.export_to_fallback(customer_id, tables, &error).await
            }
        }
    }

    /// Run one insert per non-empty table, in table order
    async fn write_primary(
        &self,
        tables: &TableRecords,
        options: &ExecutionOptions,
    ) -> QueryResult<usize> {
        let mut exported = 0;
        for (table, records) in tables {
            if records.is_empty() {
                continue;
            }
            let rows = records.iter().cloned().map(Value::Object).collect::<Vec<_>>();
            let request = QueryRequest::new(render_insert(&self.dataset, table)?)
                .with_param(QueryParam::new(ROWS_PARAM, Value::Array(rows)));

            let outcome = self.executor.execute(&request, options).await?;
            tracing::debug!(
                table = %table,
                rows_affected = outcome.result_set.rows_affected,
                cost_usd = outcome.estimate.estimated_cost_usd,
                "table written"
            );
            exported += records.len();
        }
        Ok(exported)
    }

    async fn export_to_fallback(
        &self,
        customer_id: &str,
        tables: &TableRecords,
        cause: &QueryError,
    ) -> ExportResult {
        let reason = cause.fallback_reason();
        match self.sink.write_batch(customer_id, tables).await {
            Ok(stored) => {
                info!(
                    customer_id,
                    records = stored.records_written(),
                    reason = %reason,
                    "batch exported to fallback sink"
                );
                ExportResult::fallback(customer_id, reason, &stored)
            }
            Err(error) => {
                tracing::error!(
                    customer_id,
                    reason = %reason,
                    error = %error,
                    detail = error.detail().unwrap_or_default(),
                    "fallback sink failed, batch not exported"
                );
                ExportResult::failed(customer_id, reason, error.to_string())
            }
        }
    }

    /// Report exporter health.
    ///
    /// An open circuit is `Degraded` since exports still land in the fallback
    /// sink. Otherwise the warehouse is pinged outside the breaker.
    pub async fn health_check(&self) -> HealthReport {
        let circuit = self.executor.breaker().health();
        let retry = self.executor.retry_policy().stats();

        let (status, message) = if !circuit.is_healthy {
            (
                HealthStatus::Degraded,
                "circuit breaker open, exports are going to the fallback sink".to_string(),
            )
        } else {
            match self.executor.service().ping().await {
                Ok(()) => (
                    HealthStatus::Healthy,
                    "primary warehouse reachable".to_string(),
                ),
                Err(error) => {
                    warn!(error = %error, "warehouse health probe failed");
                    (
                        HealthStatus::Unhealthy,
                        format!("primary warehouse probe failed: {}", error.category()),
                    )
                }
            }
        };

        HealthReport {
            status,
            message,
            circuit_breaker: circuit,
            retry,
            checked_at: chrono::Utc::now(),
        }
    }
}

/// Insert statement for one table's rows
pub fn render_insert(dataset: &str, table: &str) -> QueryResult<String> {
    let valid = |name: &str| !name.trim().is_empty() && !name.contains('`');
    if !valid(dataset) || !valid(table) {
        return Err(QueryError::config_with_context(
            "Invalid export destination",
            format!("dataset {:?}, table {:?}", dataset, table),
        ));
    }
    Ok(format!(
        "INSERT INTO `{}.{}` SELECT * FROM UNNEST(@{})",
        dataset, table, ROWS_PARAM
    ))
}
