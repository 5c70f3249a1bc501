//! `courier fallback ...` – inspect, verify, re-send and remove saved bundles.

use anyhow::Result;
use courier_core::batch;
use courier_core::config::CourierConfig;
use courier_core::fallback::FallbackStore;
use courier_core::http::telegram::TelegramClient;
use courier_core::item::DeliverableItem;
use courier_core::pipeline::{loss_notice, Deliver};
use courier_core::retry::{self, LogObserver, RetryPolicy};
use std::time::Duration;

pub fn run_fallback_list(store: &FallbackStore) -> Result<()> {
    let bundles = store.list()?;
    if bundles.is_empty() {
        println!("No fallback bundles in {}.", store.root().display());
        return Ok(());
    }
    println!("{:<20} {:<26} {}", "NAME", "CREATED", "ITEMS");
    for b in bundles {
        println!("{:<20} {:<26} {}", b.name, b.created_at, b.artifact_count);
    }
    Ok(())
}

pub fn run_fallback_show(store: &FallbackStore, name: &str) -> Result<()> {
    let bundle = store.load(name)?;
    println!("Bundle:  {}", bundle.path.display());
    println!("Created: {}", bundle.index.created_at);
    println!("Items:   {}", bundle.artifact_count());
    for entry in &bundle.index.artifacts {
        println!("  {:>2}. {} ({} bytes)", entry.position, entry.filename, entry.bytes);
    }
    println!();
    print!("{}", bundle.error);
    println!();
    println!("{}", bundle.text);
    Ok(())
}

pub fn run_fallback_remove(store: &FallbackStore, name: &str) -> Result<()> {
    store.delete(name)?;
    println!("Removed bundle {name}");
    Ok(())
}

/// Re-hashes every artifact. Exit code 1 if any is missing or altered.
pub fn run_fallback_verify(store: &FallbackStore, name: &str) -> Result<i32> {
    let checks = store.verify(name)?;
    let mut bad = 0usize;
    for check in &checks {
        let state = match &check.actual {
            _ if check.is_ok() => "ok",
            Some(_) => "MISMATCH",
            None => "MISSING",
        };
        if !check.is_ok() {
            bad += 1;
        }
        println!("{:<9} {}", state, check.filename);
    }
    println!("{} of {} artifact(s) verified", checks.len() - bad, checks.len());
    Ok(if bad == 0 { 0 } else { 1 })
}

/// Sends a saved bundle again: its items in batches, then the text, under the
/// delivery retry policy. A lost batch gets the same channel notice as in
/// `courier run`, sent under the notification policy. With `remove`, the
/// bundle is deleted only if every batch and the text went through. Exit code
/// 1 if anything was not delivered.
pub async fn run_fallback_resend(
    cfg: &CourierConfig,
    store: &FallbackStore,
    name: &str,
    remove: bool,
) -> Result<i32> {
    let bundle = store.load(name)?;
    let items = store.load_items(name)?;
    let client = TelegramClient::from_config(&cfg.telegram)?;
    let policies = ResendPolicies {
        deliver: RetryPolicy::from(&cfg.retry.deliver),
        notify: RetryPolicy::from(&cfg.retry.notify),
        pause: Duration::from_millis(cfg.delivery.batch_pause_ms),
        batch_size: batch::effective_batch_size(cfg.delivery.batch_size),
    };

    let sent = resend(&client, &policies, &items, &bundle.text).await;
    if !sent {
        println!("Bundle {name} was not fully delivered; kept at {}", bundle.path.display());
        return Ok(1);
    }
    println!("Bundle {name} delivered");
    if remove {
        store.delete(name)?;
        println!("Removed bundle {name}");
    }
    Ok(0)
}

struct ResendPolicies {
    deliver: RetryPolicy,
    notify: RetryPolicy,
    pause: Duration,
    batch_size: usize,
}

async fn resend(
    deliver: &dyn Deliver,
    policies: &ResendPolicies,
    items: &[DeliverableItem],
    text: &str,
) -> bool {
    let mut complete = true;
    let batches = batch::split(items, policies.batch_size);
    for (i, group) in batches.iter().enumerate() {
        let result = retry::run_with_retry("resend.batch", &policies.deliver, &LogObserver, || {
            deliver.send_batch(group)
        })
        .await;
        match result {
            Ok(()) => {
                if i + 1 < batches.len() && !policies.pause.is_zero() {
                    tokio::time::sleep(policies.pause).await;
                }
            }
            Err(e) => {
                eprintln!("batch {} of {} not delivered: {}", i + 1, batches.len(), e);
                complete = false;
                let notice =
                    loss_notice(i * policies.batch_size + 1, group, items.len(), &e.to_string());
                let notified = retry::execute("notify", &policies.notify, &LogObserver, || {
                    deliver.send_text(&notice)
                })
                .await;
                if !notified.is_success() {
                    tracing::warn!(batch = i + 1, "could not send loss notice");
                }
            }
        }
    }

    if let Err(e) = retry::run_with_retry("resend.text", &policies.deliver, &LogObserver, || {
        deliver.send_text(text)
    })
    .await
    {
        eprintln!("report text not delivered: {}", e);
        complete = false;
    }
    complete
}
