//! In-process collaborators with scripted failures.

use async_trait::async_trait;
use courier_core::item::DeliverableItem;
use courier_core::pipeline::{Acquire, Deliver, Transform};
use courier_core::retry::OpError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// `n` small PNG-looking items labelled `shot1..shotN`.
pub fn screenshots(n: usize) -> Vec<DeliverableItem> {
    (1..=n)
        .map(|i| {
            let mut payload = PNG_MAGIC.to_vec();
            payload.extend_from_slice(format!("image {}", i).as_bytes());
            DeliverableItem::new(format!("shot{}", i), payload)
        })
        .collect()
}

/// Fails the first `fail_first` calls with `message`, then succeeds.
pub struct Flaky {
    fail_first: u32,
    message: String,
    calls: AtomicU32,
}

impl Flaky {
    pub fn never() -> Self {
        Self::first(0, "")
    }

    pub fn always(message: &str) -> Self {
        Self::first(u32::MAX, message)
    }

    pub fn first(fail_first: u32, message: &str) -> Self {
        Self {
            fail_first,
            message: message.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<(), OpError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_first {
            Err(OpError::other(self.message.clone()))
        } else {
            Ok(())
        }
    }
}

pub struct FakeSource {
    pub items: Vec<DeliverableItem>,
    pub script: Flaky,
}

impl FakeSource {
    pub fn ok(items: Vec<DeliverableItem>) -> Self {
        Self {
            items,
            script: Flaky::never(),
        }
    }
}

#[async_trait]
impl Acquire for FakeSource {
    async fn acquire(&self) -> Result<Vec<DeliverableItem>, OpError> {
        self.script.next()?;
        Ok(self.items.clone())
    }
}

pub struct FakeTransform {
    pub text: String,
    pub script: Flaky,
    pub seen: Mutex<Vec<(usize, String)>>,
}

impl FakeTransform {
    pub fn ok(text: &str) -> Self {
        Self::with_script(text, Flaky::never())
    }

    pub fn with_script(text: &str, script: Flaky) -> Self {
        Self {
            text: text.to_string(),
            script,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transform for FakeTransform {
    async fn transform(&self, items: &[DeliverableItem], prompt: &str) -> Result<String, OpError> {
        self.seen.lock().unwrap().push((items.len(), prompt.to_string()));
        self.script.next()?;
        Ok(self.text.clone())
    }
}

/// Records what was delivered. Batches containing one of `fail_labels` (or
/// every batch, with `fail_batches`) fail with a transient 503.
pub struct FakeDelivery {
    pub fail_labels: Vec<String>,
    pub fail_batches: bool,
    pub text_script: Flaky,
    pub batch_attempts: AtomicU32,
    pub batches: Mutex<Vec<Vec<String>>>,
    pub texts: Mutex<Vec<String>>,
}

impl FakeDelivery {
    pub fn ok() -> Self {
        Self {
            fail_labels: Vec::new(),
            fail_batches: false,
            text_script: Flaky::never(),
            batch_attempts: AtomicU32::new(0),
            batches: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn down() -> Self {
        Self {
            fail_batches: true,
            text_script: Flaky::always("HTTP 503: Service Unavailable"),
            ..Self::ok()
        }
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Deliver for FakeDelivery {
    async fn send_batch(&self, items: &[DeliverableItem]) -> Result<(), OpError> {
        self.batch_attempts.fetch_add(1, Ordering::SeqCst);
        let labels: Vec<String> = items.iter().map(|i| i.label().to_string()).collect();
        if self.fail_batches || labels.iter().any(|l| self.fail_labels.contains(l)) {
            return Err(OpError::Http {
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }
        self.batches.lock().unwrap().push(labels);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), OpError> {
        self.text_script.next()?;
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
