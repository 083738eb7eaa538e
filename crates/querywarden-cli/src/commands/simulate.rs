//! Export simulation against a scripted warehouse

use crate::args::SimulateArgs;
use crate::simulated::{SimulatedWarehouse, Step, parse_script};
use anyhow::{Context, anyhow};
use querywarden_core::config::{QueryWardenConfig, load_config};
use querywarden_core::sink::TableRecords;
use querywarden_core::{
    CircuitBreakerRegistry, ExecutionOptions, ExportResult, HealthReport, Record,
    ResilientExporter,
};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct SimulationReport {
    results: Vec<ExportResult>,
    execute_calls: u64,
    health: HealthReport,
}

pub async fn run(config_path: Option<&Path>, args: &SimulateArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    apply_args(&mut config, args);
    config.validate()?;

    let warehouse = Arc::new(build_warehouse(args)?);
    let registry = CircuitBreakerRegistry::new();
    let exporter = ResilientExporter::from_config(&config, warehouse.clone(), &registry)?;

    let options = ExecutionOptions {
        tier: args.tier,
        ..Default::default()
    };

    let mut results = Vec::with_capacity(args.batches as usize);
    for batch in 0..args.batches {
        let tables = build_batch(&args.tables, args.records, batch);
        results.push(
            exporter
                .export_batch_with(&args.customer, &tables, &options)
                .await,
        );
    }

    let report = SimulationReport {
        results,
        execute_calls: warehouse.execute_calls(),
        health: exporter.health_check().await,
    };
    let rendered =
        serde_json::to_string_pretty(&report).context("Failed to render simulation report")?;
    println!("{rendered}");
    Ok(())
}

fn apply_args(config: &mut QueryWardenConfig, args: &SimulateArgs) {
    if let Some(dir) = &args.fallback_dir {
        config.fallback.directory = dir.display().to_string();
    }
    let delay = args.retry_delay_ms.max(1) as f64 / 1000.0;
    config.retry.base_delay_seconds = delay;
    config.retry.max_delay_seconds = config.retry.max_delay_seconds.max(delay);
}

fn build_warehouse(args: &SimulateArgs) -> anyhow::Result<SimulatedWarehouse> {
    if let Some(always) = &args.always {
        let step: Step = always.parse().map_err(|e: String| anyhow!(e))?;
        return Ok(SimulatedWarehouse::always(args.bytes_per_query, step));
    }
    let script = parse_script(&args.script).map_err(|e| anyhow!(e))?;
    Ok(SimulatedWarehouse::scripted(args.bytes_per_query, script))
}

fn build_batch(tables: &[String], records: usize, batch: u32) -> TableRecords {
    tables
        .iter()
        .map(|table| {
            let rows = (0..records)
                .map(|i| synthetic_record(table, batch, i))
                .collect();
            (table.clone(), rows)
        })
        .collect()
}

fn synthetic_record(table: &str, batch: u32, index: usize) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), json!(format!("{table}-{batch}-{index}")));
    record.insert("batch".to_string(), json!(batch));
    record.insert("value".to_string(), json!(index));
    record
}
