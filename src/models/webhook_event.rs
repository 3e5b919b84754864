use super::subscription::BillingProvider;

/// First sighting of a provider event, keyed by `(provider, event_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWebhookEvent {
    pub provider: BillingProvider,
    pub event_id: String,
    pub event_type: String,
    pub payload_hash: String,
}
