use async_trait::async_trait;

use crate::models::webhook_event::NewWebhookEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Unconditional insert keyed by (provider, event_id). A key that is already
    /// present reports `AlreadyExists` rather than an error.
    async fn insert_event(&self, event: &NewWebhookEvent) -> Result<InsertOutcome, sqlx::Error>;
}
