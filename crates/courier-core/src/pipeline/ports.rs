//! Collaborator seams. The orchestrator receives these explicitly so tests can
//! substitute fakes without touching process environment.

use async_trait::async_trait;

use crate::item::DeliverableItem;
use crate::retry::OpError;

/// Produces the ordered source items for a run.
#[async_trait]
pub trait Acquire: Send + Sync {
    async fn acquire(&self) -> Result<Vec<DeliverableItem>, OpError>;
}

/// Turns the acquired items plus an instruction into report text.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn transform(&self, items: &[DeliverableItem], prompt: &str) -> Result<String, OpError>;
}

/// Sends results to the destination channel configured on the implementation.
#[async_trait]
pub trait Deliver: Send + Sync {
    /// Send a group of items as one message (e.g. a media group).
    async fn send_batch(&self, items: &[DeliverableItem]) -> Result<(), OpError>;
    /// Send a plain text message.
    async fn send_text(&self, text: &str) -> Result<(), OpError>;
}

/// Delivery sink that only logs; used by `courier run --dry-run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyDelivery;

#[async_trait]
impl Deliver for LogOnlyDelivery {
    async fn send_batch(&self, items: &[DeliverableItem]) -> Result<(), OpError> {
        let labels: Vec<&str> = items.iter().map(|i| i.label()).collect();
        tracing::info!(count = items.len(), "dry run: would send batch {:?}", labels);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), OpError> {
        tracing::info!(chars = text.chars().count(), "dry run: would send text:\n{}", text);
        Ok(())
    }
}
