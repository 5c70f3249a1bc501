//! Orchestrator: acquisition → transformation → delivery, each under its own
//! retry policy, with batch-level loss tolerance and a local fallback bundle.

use chrono::NaiveDate;
use std::time::Duration;

use super::ports::{Acquire, Deliver, Transform};
use super::status::{PipelineStatus, RunReport, RunStatus, Stage};
use crate::batch;
use crate::config::CourierConfig;
use crate::fallback::FallbackStore;
use crate::item::DeliverableItem;
use crate::retry::{self, LogObserver, RetryObserver, RetryOutcome, RetryPolicy};

/// One policy per call site; each has its own timing.
#[derive(Debug, Clone, Copy)]
pub struct StagePolicies {
    pub acquire: RetryPolicy,
    pub transform: RetryPolicy,
    pub deliver: RetryPolicy,
    pub notify: RetryPolicy,
}

impl Default for StagePolicies {
    fn default() -> Self {
        Self::from(&CourierConfig::default())
    }
}

impl From<&CourierConfig> for StagePolicies {
    fn from(cfg: &CourierConfig) -> Self {
        Self {
            acquire: RetryPolicy::from(&cfg.retry.acquire),
            transform: RetryPolicy::from(&cfg.retry.transform),
            deliver: RetryPolicy::from(&cfg.retry.deliver),
            notify: RetryPolicy::from(&cfg.retry.notify),
        }
    }
}

/// Run parameters derived from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub prompt: String,
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub policies: StagePolicies,
    /// Day the fallback text refers to; defaults to today (local time).
    pub report_day: Option<NaiveDate>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&CourierConfig::default())
    }
}

impl From<&CourierConfig> for PipelineSettings {
    fn from(cfg: &CourierConfig) -> Self {
        Self {
            prompt: cfg.prompt.clone(),
            batch_size: batch::effective_batch_size(cfg.delivery.batch_size),
            batch_pause: Duration::from_millis(cfg.delivery.batch_pause_ms),
            policies: StagePolicies::from(cfg),
            report_day: None,
        }
    }
}

/// Human-readable day used in the fallback text, e.g. "Monday, 19 October 2026".
pub fn day_label(day: NaiveDate) -> String {
    day.format("%A, %d %B %Y").to_string()
}

/// Deterministic text sent instead of the inference output when that call fails.
pub fn fallback_text(day: &str) -> String {
    format!(
        "Daily report for {}\n\nAutomated analysis was unavailable for this run. \
         The captured screenshots are attached above.",
        day
    )
}

/// The orchestrator. Collaborators are borrowed for the duration of a run.
pub struct Pipeline<'a> {
    settings: PipelineSettings,
    acquire: &'a dyn Acquire,
    transform: &'a dyn Transform,
    deliver: &'a dyn Deliver,
    fallback: &'a FallbackStore,
    observer: &'a dyn RetryObserver,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: PipelineSettings,
        acquire: &'a dyn Acquire,
        transform: &'a dyn Transform,
        deliver: &'a dyn Deliver,
        fallback: &'a FallbackStore,
    ) -> Self {
        Self {
            settings,
            acquire,
            transform,
            deliver,
            fallback,
            observer: &LogObserver,
        }
    }

    /// Report retries to `observer` instead of the default tracing logger.
    pub fn with_observer(mut self, observer: &'a dyn RetryObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Runs all stages once. Never returns an error: failures are recorded in
    /// the report and mapped to an exit code by [`RunReport::exit_code`].
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::default();
        let mut status = PipelineStatus::default();
        let policies = &self.settings.policies;

        let acquired = retry::execute("acquire", &policies.acquire, self.observer, || {
            self.acquire.acquire()
        })
        .await;
        let items = match acquired {
            RetryOutcome::Succeeded { value, attempts } => {
                tracing::info!(items = value.len(), attempts, "acquisition succeeded");
                status.mark_acquired();
                value
            }
            failed => {
                let message = describe(&failed);
                tracing::error!("acquisition failed, stopping run: {}", message);
                report.fail(Stage::Acquisition, message);
                report.status = status;
                self.notify_failure(&report).await;
                return report;
            }
        };

        let transformed = retry::execute("transform", &policies.transform, self.observer, || {
            self.transform.transform(&items, &self.settings.prompt)
        })
        .await;
        let text = match transformed {
            RetryOutcome::Succeeded { value, attempts } => {
                tracing::info!(chars = value.chars().count(), attempts, "transformation succeeded");
                status.mark_transformed();
                value
            }
            failed => {
                let message = describe(&failed);
                tracing::error!("transformation failed, using fallback text: {}", message);
                report.fail(Stage::Transformation, message);
                status.mark_fallback_text();
                let day = self
                    .settings
                    .report_day
                    .unwrap_or_else(|| chrono::Local::now().date_naive());
                fallback_text(&day_label(day))
            }
        };

        if self.deliver_all(&items, &text, &mut report).await {
            status.mark_delivered();
        }
        report.text = Some(text);
        report.status = status;

        match report.run_status() {
            RunStatus::Success => tracing::info!("run completed successfully"),
            other => {
                tracing::warn!(status = %other, "run finished with failures");
                self.notify_failure(&report).await;
            }
        }
        report
    }

    /// Sends all batches (tolerating per-batch loss), then the text. Returns
    /// true only if the text was delivered.
    async fn deliver_all(
        &self,
        items: &[DeliverableItem],
        text: &str,
        report: &mut RunReport,
    ) -> bool {
        let policies = &self.settings.policies;
        // Settings fields are public; the transport limit is enforced here too.
        let capacity = batch::effective_batch_size(self.settings.batch_size);
        let batches = batch::split(items, capacity);
        let total = batches.len();

        for (i, group) in batches.iter().enumerate() {
            let number = i + 1;
            let outcome = retry::execute("deliver.batch", &policies.deliver, self.observer, || {
                self.deliver.send_batch(group)
            })
            .await;
            if outcome.is_success() {
                report.delivered_batches += 1;
                tracing::debug!(batch = number, total, items = group.len(), "batch delivered");
                if number < total && !self.settings.batch_pause.is_zero() {
                    tokio::time::sleep(self.settings.batch_pause).await;
                }
                continue;
            }

            let message = describe(&outcome);
            tracing::warn!(batch = number, total, "batch lost: {}", message);
            report.lost_batches.push(number);
            let notice = loss_notice(i * capacity + 1, group, items.len(), &message);
            self.notify(&notice).await;
        }

        let sent = retry::run_with_retry("deliver.text", &policies.deliver, self.observer, || {
            self.deliver.send_text(text)
        })
        .await;
        match sent {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("text delivery failed, saving fallback bundle: {}", err);
                report.fail(Stage::Delivery, err.to_string());
                match self.fallback.save(text, items, &err) {
                    Ok(path) => report.fallback_path = Some(path),
                    Err(e) => {
                        tracing::error!("could not save fallback bundle: {:#}", e);
                        report.fail(Stage::Delivery, format!("fallback save failed: {:#}", e));
                    }
                }
                false
            }
        }
    }

    /// Best-effort error notice to the destination channel.
    async fn notify_failure(&self, report: &RunReport) {
        let mut message = format!("Report run failed ({})", report.run_status());
        for failure in &report.failures {
            message.push_str(&format!("\n- {}: {}", failure.stage, failure.message));
        }
        if let Some(path) = &report.fallback_path {
            message.push_str(&format!("\nOutput saved locally at {}", path.display()));
        }
        self.notify(&message).await;
    }

    /// Sends `message` under the notification policy; failures are only logged.
    async fn notify(&self, message: &str) -> bool {
        let outcome = retry::execute("notify", &self.settings.policies.notify, self.observer, || {
            self.deliver.send_text(message)
        })
        .await;
        if !outcome.is_success() {
            tracing::warn!("could not send notification: {}", describe(&outcome));
            return false;
        }
        true
    }
}

/// Channel notice for a batch given up on. `first` is the 1-based position of
/// the batch's first item among all `total` items.
pub fn loss_notice(first: usize, group: &[DeliverableItem], total: usize, reason: &str) -> String {
    let labels = group
        .iter()
        .map(|i| i.label())
        .collect::<Vec<_>>()
        .join(", ");
    let last = first + group.len().saturating_sub(1);
    format!(
        "Could not deliver images {}-{} of {} ({}): {}",
        first, last, total, labels, reason
    )
}

fn describe<T, E: std::fmt::Display>(outcome: &RetryOutcome<T, E>) -> String {
    match outcome {
        RetryOutcome::Succeeded { attempts, .. } => format!("succeeded after {} attempt(s)", attempts),
        RetryOutcome::Exhausted { last_error, attempts } => {
            format!("gave up after {} attempt(s): {}", attempts, last_error)
        }
        RetryOutcome::Aborted { last_error, .. } => format!("permanent failure: {}", last_error),
    }
}
