use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::db::webhook_event_repository::{InsertOutcome, WebhookEventRepository};
use crate::models::{subscription::BillingProvider, webhook_event::NewWebhookEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    New,
    Duplicate,
}

/// Durable first-delivery detection for provider events.
#[derive(Clone)]
pub struct IdempotencyGuard {
    events: Arc<dyn WebhookEventRepository>,
}

pub fn payload_hash(raw: &[u8]) -> String {
    hex::encode(Sha256::digest(raw))
}

impl IdempotencyGuard {
    pub fn new(events: Arc<dyn WebhookEventRepository>) -> Self {
        Self { events }
    }

    /// Always inserts; the unique key on (provider, event_id) decides which
    /// delivery wins. The payload hash is stored for audit only.
    pub async fn record(
        &self,
        provider: BillingProvider,
        event_id: &str,
        event_type: &str,
        raw: &[u8],
    ) -> Result<RecordOutcome, sqlx::Error> {
        let event = NewWebhookEvent {
            provider,
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            payload_hash: payload_hash(raw),
        };

        match self.events.insert_event(&event).await? {
            InsertOutcome::Inserted => Ok(RecordOutcome::New),
            InsertOutcome::AlreadyExists => Ok(RecordOutcome::Duplicate),
        }
    }
}
