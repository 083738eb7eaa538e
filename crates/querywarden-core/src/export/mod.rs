//! Resilient batch export
//!
//! The exporter is the only component that recovers from failures: anything
//! that stops a batch reaching the warehouse sends the same batch to the
//! fallback sink instead.

mod exporter;
mod types;

pub use exporter::{ROWS_PARAM, ResilientExporter, render_insert};
pub use types::{
    ExportDestination, ExportResult, ExportStatus, HealthReport, HealthStatus, META_ERROR,
    META_FALLBACK_LOCATION, META_FALLBACK_REASON, META_ORIGINAL_DESTINATION,
};
