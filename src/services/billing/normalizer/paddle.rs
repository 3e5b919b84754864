use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::warn;

use super::{
    extract_id, extract_str, extract_uuid, jget, qualify_subscription_id, resolve_period,
    EventEnvelope, NormalizedEvent, NormalizedEventKind, ProviderAdapter, UNKNOWN_PRICE_ID,
};
use crate::models::subscription::{BillingProvider, SubscriptionStatus};
use crate::services::billing::{error::BillingError, signature::verify_paddle_signature};

/// Paddle has no separate checkout event; the first subscription event plays that role.
const SUBSCRIPTION_CREATED: &str = "subscription.created";

const SUBSCRIPTION_EVENTS: [&str; 8] = [
    SUBSCRIPTION_CREATED,
    "subscription.updated",
    "subscription.activated",
    "subscription.trialing",
    "subscription.past_due",
    "subscription.paused",
    "subscription.resumed",
    "subscription.canceled",
];

pub struct PaddleAdapter;

fn map_status(raw: Option<&str>) -> SubscriptionStatus {
    match raw.unwrap_or_default() {
        "active" => SubscriptionStatus::Active,
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" => SubscriptionStatus::PastDue,
        "paused" | "canceled" | "cancelled" => SubscriptionStatus::Cancelled,
        other => {
            warn!(status = %other, "unrecognized paddle subscription status; treating as past_due");
            SubscriptionStatus::PastDue
        }
    }
}

fn rfc3339(val: &Value, path: &[&str]) -> Option<OffsetDateTime> {
    extract_str(val, path).and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
}

fn first_item_price(data: &Value) -> Option<String> {
    extract_str(data, &["items", "0", "price", "id"])
        .or_else(|| extract_str(data, &["items", "0", "price_id"]))
        .map(str::to_string)
}

impl ProviderAdapter for PaddleAdapter {
    fn provider(&self) -> BillingProvider {
        BillingProvider::Paddle
    }

    fn signature_header(&self) -> &'static str {
        "Paddle-Signature"
    }

    fn verify_signature(&self, body: &[u8], header: &str, secret: &str) -> bool {
        verify_paddle_signature(body, header, secret)
    }

    fn envelope(&self, payload: &Value) -> Result<EventEnvelope, BillingError> {
        let event_id = extract_str(payload, &["event_id"])
            .ok_or_else(|| BillingError::MalformedPayload("missing event_id".into()))?;
        let event_type = extract_str(payload, &["event_type"])
            .ok_or_else(|| BillingError::MalformedPayload("missing event_type".into()))?;
        Ok(EventEnvelope {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
        })
    }

    fn normalize(
        &self,
        envelope: &EventEnvelope,
        payload: &Value,
        received_at: OffsetDateTime,
    ) -> Option<NormalizedEvent> {
        if !SUBSCRIPTION_EVENTS.contains(&envelope.event_type.as_str()) {
            return None;
        }
        let data = jget(payload, &["data"])?;
        let Some(subscription_id) = extract_str(data, &["id"]).map(str::to_string) else {
            warn!(event_id = %envelope.event_id, "paddle subscription event without id");
            return None;
        };

        let kind = if envelope.event_type == SUBSCRIPTION_CREATED {
            NormalizedEventKind::CheckoutCompleted
        } else {
            NormalizedEventKind::SubscriptionChanged
        };
        let (start, end) = resolve_period(
            [
                rfc3339(data, &["current_billing_period", "starts_at"]),
                rfc3339(data, &["started_at"]),
                rfc3339(data, &["first_billed_at"]),
            ],
            [
                rfc3339(data, &["current_billing_period", "ends_at"]),
                rfc3339(data, &["next_billed_at"]),
            ],
            received_at,
        );
        let cancel_at_period_end =
            extract_str(data, &["scheduled_change", "action"]) == Some("cancel");

        Some(NormalizedEvent {
            provider: BillingProvider::Paddle,
            kind,
            event_id: envelope.event_id.clone(),
            event_type: envelope.event_type.clone(),
            external_subscription_id: qualify_subscription_id(
                BillingProvider::Paddle,
                &subscription_id,
            ),
            provider_subscription_id: subscription_id,
            customer_id: extract_id(data, "customer_id"),
            price_id: first_item_price(data).unwrap_or_else(|| UNKNOWN_PRICE_ID.to_string()),
            status: map_status(extract_str(data, &["status"])),
            current_period_start: start,
            current_period_end: end,
            cancel_at_period_end,
            owner_hint: extract_uuid(data, &["custom_data", "user_id"]),
        })
    }
}
