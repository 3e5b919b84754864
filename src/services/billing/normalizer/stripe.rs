use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::{
    extract_bool, extract_id, extract_str, extract_uuid, jget, qualify_subscription_id,
    resolve_period, EventEnvelope, NormalizedEvent, NormalizedEventKind, ProviderAdapter,
    UNKNOWN_PRICE_ID,
};
use crate::models::subscription::{BillingProvider, SubscriptionStatus};
use crate::services::billing::{error::BillingError, signature::verify_stripe_signature};

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

const SUBSCRIPTION_EVENTS: [&str; 5] = [
    "customer.subscription.created",
    "customer.subscription.updated",
    SUBSCRIPTION_DELETED,
    "customer.subscription.paused",
    "customer.subscription.resumed",
];

pub struct StripeAdapter;

fn map_status(raw: Option<&str>) -> SubscriptionStatus {
    match raw.unwrap_or_default() {
        "active" => SubscriptionStatus::Active,
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" | "unpaid" | "incomplete" => SubscriptionStatus::PastDue,
        "canceled" | "cancelled" | "incomplete_expired" | "paused" => {
            SubscriptionStatus::Cancelled
        }
        other => {
            warn!(status = %other, "unrecognized stripe subscription status; treating as past_due");
            SubscriptionStatus::PastDue
        }
    }
}

fn unix(val: &Value, path: &[&str]) -> Option<OffsetDateTime> {
    jget(val, path)?
        .as_i64()
        .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
}

fn first_line_item_price(obj: &Value, list: &str) -> Option<String> {
    extract_str(obj, &[list, "data", "0", "price", "id"])
        .or_else(|| extract_str(obj, &[list, "data", "0", "plan", "id"]))
        .map(str::to_string)
}

impl StripeAdapter {
    fn normalize_checkout(
        &self,
        envelope: &EventEnvelope,
        obj: &Value,
        received_at: OffsetDateTime,
    ) -> Option<NormalizedEvent> {
        if extract_str(obj, &["mode"]) != Some("subscription") {
            debug!(event_id = %envelope.event_id, "ignoring non-subscription checkout session");
            return None;
        }
        let Some(subscription_id) = extract_id(obj, "subscription") else {
            warn!(event_id = %envelope.event_id, "checkout session without subscription id");
            return None;
        };

        let price_id = extract_str(obj, &["metadata", "price_id"])
            .map(str::to_string)
            .or_else(|| first_line_item_price(obj, "line_items"))
            .unwrap_or_else(|| UNKNOWN_PRICE_ID.to_string());
        let (start, end) = resolve_period([None], [None], received_at);

        Some(NormalizedEvent {
            provider: BillingProvider::Stripe,
            kind: NormalizedEventKind::CheckoutCompleted,
            event_id: envelope.event_id.clone(),
            event_type: envelope.event_type.clone(),
            external_subscription_id: qualify_subscription_id(
                BillingProvider::Stripe,
                &subscription_id,
            ),
            provider_subscription_id: subscription_id,
            customer_id: extract_id(obj, "customer"),
            price_id,
            status: SubscriptionStatus::Active,
            current_period_start: start,
            current_period_end: end,
            cancel_at_period_end: false,
            owner_hint: extract_uuid(obj, &["metadata", "user_id"])
                .or_else(|| extract_uuid(obj, &["client_reference_id"])),
        })
    }

    fn normalize_subscription(
        &self,
        envelope: &EventEnvelope,
        obj: &Value,
        received_at: OffsetDateTime,
    ) -> Option<NormalizedEvent> {
        let Some(subscription_id) = extract_str(obj, &["id"]).map(str::to_string) else {
            warn!(event_id = %envelope.event_id, "subscription event without id");
            return None;
        };

        let status = if envelope.event_type == SUBSCRIPTION_DELETED {
            SubscriptionStatus::Cancelled
        } else {
            map_status(extract_str(obj, &["status"]))
        };
        let (start, end) = resolve_period(
            [
                unix(obj, &["current_period_start"]),
                unix(obj, &["items", "data", "0", "current_period_start"]),
                unix(obj, &["billing_cycle_anchor"]),
                unix(obj, &["start_date"]),
            ],
            [
                unix(obj, &["current_period_end"]),
                unix(obj, &["items", "data", "0", "current_period_end"]),
            ],
            received_at,
        );

        Some(NormalizedEvent {
            provider: BillingProvider::Stripe,
            kind: NormalizedEventKind::SubscriptionChanged,
            event_id: envelope.event_id.clone(),
            event_type: envelope.event_type.clone(),
            external_subscription_id: qualify_subscription_id(
                BillingProvider::Stripe,
                &subscription_id,
            ),
            provider_subscription_id: subscription_id,
            customer_id: extract_id(obj, "customer"),
            price_id: first_line_item_price(obj, "items")
                .unwrap_or_else(|| UNKNOWN_PRICE_ID.to_string()),
            status,
            current_period_start: start,
            current_period_end: end,
            cancel_at_period_end: extract_bool(obj, &["cancel_at_period_end"]).unwrap_or(false),
            owner_hint: extract_uuid(obj, &["metadata", "user_id"]),
        })
    }
}

impl ProviderAdapter for StripeAdapter {
    fn provider(&self) -> BillingProvider {
        BillingProvider::Stripe
    }

    fn signature_header(&self) -> &'static str {
        "Stripe-Signature"
    }

    fn verify_signature(&self, body: &[u8], header: &str, secret: &str) -> bool {
        verify_stripe_signature(body, header, secret)
    }

    fn envelope(&self, payload: &Value) -> Result<EventEnvelope, BillingError> {
        let event_id = extract_str(payload, &["id"])
            .ok_or_else(|| BillingError::MalformedPayload("missing event id".into()))?;
        let event_type = extract_str(payload, &["type"])
            .ok_or_else(|| BillingError::MalformedPayload("missing event type".into()))?;
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
        let obj = jget(payload, &["data", "object"])?;
        match envelope.event_type.as_str() {
            CHECKOUT_COMPLETED => self.normalize_checkout(envelope, obj, received_at),
            ty if SUBSCRIPTION_EVENTS.contains(&ty) => {
                self.normalize_subscription(envelope, obj, received_at)
            }
            _ => None,
        }
    }
}
