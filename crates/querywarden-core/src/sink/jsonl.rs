//! JSON-lines fallback sink

use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{BatchResult, FallbackSink, TableRecords};
use crate::error::{QueryError, QueryResult};
use crate::warehouse::Record;

/// Appends each table's records to `<root>/<customer>/<table>.jsonl`
#[derive(Debug, Clone)]
pub struct JsonlFallbackSink {
    root: PathBuf,
}

impl JsonlFallbackSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one customer's fallback files
    pub fn customer_dir(&self, customer_id: &str) -> QueryResult<PathBuf> {
        Ok(self.root.join(path_component(customer_id, "customer id")?))
    }

    /// File receiving one table's records
    pub fn table_path(&self, customer_id: &str, table: &str) -> QueryResult<PathBuf> {
        let file = format!("{}.jsonl", path_component(table, "table name")?);
        Ok(self.customer_dir(customer_id)?.join(file))
    }

    async fn append_records(&self, path: &Path, records: &[Record]) -> QueryResult<()> {
        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                QueryError::sink("failed to open fallback file", format!("{}: {}", path.display(), e))
            })?;

        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl FallbackSink for JsonlFallbackSink {
    async fn write_batch(
        &self,
        customer_id: &str,
        tables: &TableRecords,
    ) -> QueryResult<BatchResult> {
        let dir = self.customer_dir(customer_id)?;
        fs::create_dir_all(&dir).await.map_err(|e| {
            QueryError::sink(
                "failed to create fallback directory",
                format!("{}: {}", dir.display(), e),
            )
        })?;

        let mut result = BatchResult {
            location: dir.display().to_string(),
            ..Default::default()
        };

        for (table, records) in tables {
            let path = self.table_path(customer_id, table)?;
            self.append_records(&path, records).await?;
            debug!(table = %table, records = records.len(), path = %path.display(), "appended fallback records");
            result.tables.insert(table.clone(), records.len());
        }

        info!(
            customer_id,
            records = result.records_written(),
            location = %result.location,
            "batch written to fallback sink"
        );
        Ok(result)
    }
}

/// Encode a caller-supplied name as one path component.
///
/// Bytes outside `[A-Za-z0-9._-]` become `%XX`, so distinct names never share
/// a file and no name can leave the sink root.
fn path_component(raw: &str, what: &str) -> QueryResult<String> {
    if raw.trim().is_empty() || raw.chars().all(|c| c == '.') {
        return Err(QueryError::sink(
            format!("invalid {}", what),
            format!("{:?} cannot be used as a path component", raw),
        ));
    }

    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    Ok(encoded)
}
