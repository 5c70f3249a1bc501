//! `courier run` – one pass of the pipeline against the configured services.

use anyhow::{Context, Result};
use courier_core::audit::AuditLog;
use courier_core::config::CourierConfig;
use courier_core::fallback::FallbackStore;
use courier_core::http::inference::InferenceClient;
use courier_core::http::telegram::TelegramClient;
use courier_core::pipeline::{
    Deliver, LogOnlyDelivery, Pipeline, PipelineSettings, RunReport, RunStatus,
};
use courier_core::retry::{LogObserver, ObserverChain};
use courier_core::source::DirectorySource;
use std::path::Path;

/// Builds the collaborators from config and runs the pipeline once.
/// Returns the run's exit code; `Err` only for setup problems.
pub async fn run_pipeline(
    cfg: &CourierConfig,
    source_dir: Option<&Path>,
    dry_run: bool,
) -> Result<i32> {
    let dir = source_dir
        .or(cfg.source_dir.as_deref())
        .context("no source directory: pass --source-dir or set source_dir in config")?;
    let source = DirectorySource::new(dir);
    let inference = InferenceClient::from_config(&cfg.inference)?;

    let bot;
    let deliver: &dyn Deliver = if dry_run {
        tracing::info!("dry run: delivery replaced by log output");
        &LogOnlyDelivery
    } else {
        bot = TelegramClient::from_config(&cfg.telegram)?;
        &bot
    };

    let fallback = FallbackStore::new(cfg.fallback_root()?);
    let audit = match AuditLog::open_default() {
        Ok(log) => Some(log),
        Err(e) => {
            tracing::warn!("retry audit log unavailable: {:#}", e);
            None
        }
    };
    let mut observers = ObserverChain::new().with(&LogObserver);
    if let Some(log) = &audit {
        observers = observers.with(log);
    }

    tracing::info!(
        source = %dir.display(),
        fallback = %fallback.root().display(),
        dry_run,
        "starting run"
    );
    let settings = PipelineSettings::from(cfg);
    let report = Pipeline::new(settings, &source, &inference, deliver, &fallback)
        .with_observer(&observers)
        .run()
        .await;

    print_summary(&report);
    Ok(report.exit_code())
}

fn print_summary(report: &RunReport) {
    let status = &report.status;
    println!("Run finished: {}", report.run_status());
    println!(
        "  acquisition: {}  transformation: {}  delivery: {}",
        ok(status.acquisition_ok()),
        ok(status.transformation_ok()),
        ok(status.delivery_ok())
    );
    if status.used_fallback_text() {
        println!("  report text: fallback (inference unavailable)");
    }
    if report.delivered_batches > 0 || !report.lost_batches.is_empty() {
        println!(
            "  batches delivered: {}  lost: {:?}",
            report.delivered_batches, report.lost_batches
        );
    }
    for failure in &report.failures {
        println!("  {} failed: {}", failure.stage, failure.message);
    }
    if let Some(path) = &report.fallback_path {
        println!("  output saved to {}", path.display());
    }
    if report.run_status() != RunStatus::Success {
        tracing::warn!(code = report.exit_code(), "run did not fully succeed");
    }
}

fn ok(flag: bool) -> &'static str {
    if flag {
        "ok"
    } else {
        "failed"
    }
}
