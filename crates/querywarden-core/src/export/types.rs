//! Export result and health report types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::recovery::RetryStats;
use crate::recovery::circuit_breaker::CircuitHealth;
use crate::sink::BatchResult;

/// Metadata key naming why a batch went to the fallback sink
pub const META_FALLBACK_REASON: &str = "fallbackReason";
/// Metadata key naming where the batch was meant to go
pub const META_ORIGINAL_DESTINATION: &str = "originalDestination";
/// Metadata key naming where the fallback sink stored the batch
pub const META_FALLBACK_LOCATION: &str = "fallbackLocation";
/// Metadata key carrying the sanitized sink error
pub const META_ERROR: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportDestination {
    Primary,
    Fallback,
}

impl ExportDestination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// Outcome of one batch export. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResult {
    batch_id: Uuid,
    customer_id: String,
    status: ExportStatus,
    destination: ExportDestination,
    records_exported: usize,
    completed_at: DateTime<Utc>,
    metadata: BTreeMap<String, String>,
}

impl ExportResult {
    fn build(
        customer_id: &str,
        status: ExportStatus,
        destination: ExportDestination,
        records_exported: usize,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            status,
            destination,
            records_exported,
            completed_at: Utc::now(),
            metadata,
        }
    }

    /// Batch landed in the warehouse
    pub fn primary(customer_id: &str, records_exported: usize) -> Self {
        Self::build(
            customer_id,
            ExportStatus::Completed,
            ExportDestination::Primary,
            records_exported,
            BTreeMap::new(),
        )
    }

    /// Batch was redirected and the sink accepted it
    pub fn fallback(customer_id: &str, reason: impl Into<String>, stored: &BatchResult) -> Self {
        let mut metadata = fallback_metadata(reason.into());
        metadata.insert(META_FALLBACK_LOCATION.to_string(), stored.location.clone());
        Self::build(
            customer_id,
            ExportStatus::Completed,
            ExportDestination::Fallback,
            stored.records_written(),
            metadata,
        )
    }

    /// Both the warehouse and the fallback sink failed
    pub fn failed(customer_id: &str, reason: impl Into<String>, error: impl Into<String>) -> Self {
        let mut metadata = fallback_metadata(reason.into());
        metadata.insert(META_ERROR.to_string(), error.into());
        Self::build(
            customer_id,
            ExportStatus::Failed,
            ExportDestination::Fallback,
            0,
            metadata,
        )
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn status(&self) -> ExportStatus {
        self.status
    }

    pub fn destination(&self) -> ExportDestination {
        self.destination
    }

    pub fn records_exported(&self) -> usize {
        self.records_exported
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        self.metadata.get(META_FALLBACK_REASON).map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.status == ExportStatus::Completed
    }
}

fn fallback_metadata(reason: String) -> BTreeMap<String, String> {
    BTreeMap::from([
        (META_FALLBACK_REASON.to_string(), reason),
        (
            META_ORIGINAL_DESTINATION.to_string(),
            ExportDestination::Primary.as_str().to_string(),
        ),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Exporter health for monitoring endpoints
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    pub circuit_breaker: CircuitHealth,
    pub retry: RetryStats,
    pub checked_at: DateTime<Utc>,
}
