//! Maps provider webhook payloads onto one canonical subscription event.

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::warn;
use uuid::Uuid;

use crate::db::{subscription_repository::SubscriptionRepository, user_repository::UserRepository};
use crate::models::subscription::{BillingProvider, SubscriptionStatus};
use crate::services::billing::error::BillingError;

pub mod paddle;
pub mod stripe;

pub use self::paddle::PaddleAdapter;
pub use self::stripe::StripeAdapter;

/// Price id recorded when a payload carries no line items.
pub const UNKNOWN_PRICE_ID: &str = "unknown_price";

/// Length of the period assumed when a payload carries no billing window.
pub const FALLBACK_PERIOD_DAYS: i64 = 30;

/// Provider-agnostic identity of a delivery, read before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    pub event_id: String,
    pub event_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedEventKind {
    /// First purchase of a subscription; correlation keys are saved on the user.
    CheckoutCompleted,
    SubscriptionChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub provider: BillingProvider,
    pub kind: NormalizedEventKind,
    pub event_id: String,
    pub event_type: String,
    /// Provider-qualified id, e.g. `stripe:sub_123`.
    pub external_subscription_id: String,
    /// Id as the provider knows it.
    pub provider_subscription_id: String,
    pub customer_id: Option<String>,
    pub price_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: OffsetDateTime,
    pub current_period_end: OffsetDateTime,
    pub cancel_at_period_end: bool,
    /// Owner carried through checkout metadata, if any.
    pub owner_hint: Option<Uuid>,
}

pub fn qualify_subscription_id(provider: BillingProvider, id: &str) -> String {
    format!("{}:{}", provider.as_str(), id)
}

/// One implementation per provider wire format. Provider branching lives only here.
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> BillingProvider;

    /// Name of the header carrying the webhook signature.
    fn signature_header(&self) -> &'static str;

    fn verify_signature(&self, body: &[u8], header: &str, secret: &str) -> bool;

    /// Reads the event id and type. Fails only for payloads without them.
    fn envelope(&self, payload: &Value) -> Result<EventEnvelope, BillingError>;

    /// `None` when the event is outside the allow-list or does not describe a
    /// subscription this service tracks.
    fn normalize(
        &self,
        envelope: &EventEnvelope,
        payload: &Value,
        received_at: OffsetDateTime,
    ) -> Option<NormalizedEvent>;
}

/// Follows `path` through objects and, for numeric segments, arrays.
pub(crate) fn jget<'a>(val: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = val;
    for key in path {
        cur = match cur {
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => cur.get(*key)?,
        };
    }
    Some(cur)
}

pub(crate) fn extract_str<'a>(val: &'a Value, path: &[&str]) -> Option<&'a str> {
    jget(val, path)?.as_str().filter(|s| !s.is_empty())
}

/// Reads an id that may be sent bare or as an expanded object.
pub(crate) fn extract_id(val: &Value, key: &str) -> Option<String> {
    match val.get(key)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(_) => extract_str(val, &[key, "id"]).map(str::to_string),
        _ => None,
    }
}

pub(crate) fn extract_uuid(val: &Value, path: &[&str]) -> Option<Uuid> {
    extract_str(val, path).and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

pub(crate) fn extract_bool(val: &Value, path: &[&str]) -> Option<bool> {
    jget(val, path)?.as_bool()
}

/// Picks the first present start and end. Missing values fall back to the
/// receive time and a default-length period after it.
pub(crate) fn resolve_period(
    starts: impl IntoIterator<Item = Option<OffsetDateTime>>,
    ends: impl IntoIterator<Item = Option<OffsetDateTime>>,
    received_at: OffsetDateTime,
) -> (OffsetDateTime, OffsetDateTime) {
    let start = starts.into_iter().flatten().next().unwrap_or(received_at);
    let end = ends
        .into_iter()
        .flatten()
        .next()
        .unwrap_or(received_at + Duration::days(FALLBACK_PERIOD_DAYS));
    (start, end)
}

/// Resolves the user an event belongs to.
pub struct EventNormalizer<'a> {
    pub users: &'a dyn UserRepository,
    pub subscriptions: &'a dyn SubscriptionRepository,
}

impl EventNormalizer<'_> {
    /// Checkout metadata first, then the owner of the subscription already on
    /// file. `None` means the event cannot be attributed.
    pub async fn resolve_owner(&self, event: &NormalizedEvent) -> Result<Option<Uuid>, sqlx::Error> {
        if let Some(hint) = event.owner_hint {
            if self.users.find_billing_user(hint).await?.is_some() {
                return Ok(Some(hint));
            }
            warn!(
                user_id = %hint,
                external_subscription_id = %event.external_subscription_id,
                "metadata user does not exist; falling back to subscription owner"
            );
        }

        Ok(self
            .subscriptions
            .find_by_external_id(&event.external_subscription_id)
            .await?
            .map(|sub| sub.owner_user_id))
    }
}
