use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::db::{subscription_repository::SubscriptionRepository, user_repository::UserRepository};
use crate::models::plan::SubscriptionTier;
use crate::services::billing::{
    error::BillingError,
    idempotency::{IdempotencyGuard, RecordOutcome},
    normalizer::{EventNormalizer, ProviderAdapter},
    plan_resolver::PlanResolver,
    state_machine::{SubscriptionStateMachine, Transition},
};

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    Applied(Transition),
    Duplicate,
    /// Outside the allow-list or not about a tracked subscription.
    Ignored,
    /// No user could be attributed; acknowledged and dropped.
    UnresolvedOwner,
}

/// Runs one delivery through verify, record, normalize, resolve and apply.
pub struct WebhookProcessor {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub secret: Option<String>,
    pub guard: IdempotencyGuard,
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub plans: Arc<PlanResolver>,
}

impl WebhookProcessor {
    pub async fn process(
        &self,
        signature: Option<&str>,
        raw: &[u8],
        received_at: OffsetDateTime,
    ) -> Result<WebhookOutcome, BillingError> {
        let provider = self.adapter.provider();
        let secret = self.secret.as_deref().ok_or_else(|| {
            BillingError::Configuration(format!("{provider} webhook secret is not set"))
        })?;
        let signature = signature
            .ok_or_else(|| BillingError::MissingSignature(self.adapter.signature_header()))?;

        if !self.adapter.verify_signature(raw, signature, secret) {
            warn!(%provider, "webhook signature verification failed");
            return Err(BillingError::Signature);
        }

        let payload: Value = serde_json::from_slice(raw)
            .map_err(|err| BillingError::MalformedPayload(err.to_string()))?;
        let envelope = self.adapter.envelope(&payload)?;

        if self
            .guard
            .record(provider, &envelope.event_id, &envelope.event_type, raw)
            .await?
            == RecordOutcome::Duplicate
        {
            info!(%provider, event_id = %envelope.event_id, "duplicate webhook delivery");
            return Ok(WebhookOutcome::Duplicate);
        }

        let Some(event) = self.adapter.normalize(&envelope, &payload, received_at) else {
            info!(
                %provider,
                event_id = %envelope.event_id,
                evt_type = %envelope.event_type,
                "webhook event ignored"
            );
            return Ok(WebhookOutcome::Ignored);
        };

        let normalizer = EventNormalizer {
            users: self.users.as_ref(),
            subscriptions: self.subscriptions.as_ref(),
        };
        let Some(owner) = normalizer.resolve_owner(&event).await? else {
            warn!(
                %provider,
                event_id = %event.event_id,
                external_subscription_id = %event.external_subscription_id,
                "could not attribute webhook event to a user; dropping"
            );
            return Ok(WebhookOutcome::UnresolvedOwner);
        };

        // A tracked subscription keeps its first owner; read the tier from that user.
        let owner = self
            .subscriptions
            .find_by_external_id(&event.external_subscription_id)
            .await?
            .map(|sub| sub.owner_user_id)
            .unwrap_or(owner);

        let existing_tier = self
            .users
            .find_billing_user(owner)
            .await?
            .map(|user| user.tier())
            .unwrap_or(SubscriptionTier::Free);
        let resolution = self.plans.resolve(provider, &event.price_id, existing_tier);

        let machine = SubscriptionStateMachine {
            users: self.users.as_ref(),
            subscriptions: self.subscriptions.as_ref(),
        };
        let transition = machine.apply(&event, owner, &resolution).await?;
        Ok(WebhookOutcome::Applied(transition))
    }
}
