use tracing::info;
use uuid::Uuid;

use crate::db::{subscription_repository::SubscriptionRepository, user_repository::UserRepository};
use crate::models::{
    plan::SubscriptionTier,
    subscription::{Subscription, SubscriptionStatus, SubscriptionUpsert},
    user::BillingCorrelation,
};
use crate::services::billing::{
    normalizer::{NormalizedEvent, NormalizedEventKind},
    plan_resolver::PlanResolution,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Created(Subscription),
    Updated(Subscription),
    /// First sighting of a subscription in a status that cannot open one.
    Skipped,
}

/// Applies normalized events to the subscription row and projects the result
/// onto the owning user.
pub struct SubscriptionStateMachine<'a> {
    pub users: &'a dyn UserRepository,
    pub subscriptions: &'a dyn SubscriptionRepository,
}

impl SubscriptionStateMachine<'_> {
    pub async fn apply(
        &self,
        event: &NormalizedEvent,
        owner: Uuid,
        resolution: &PlanResolution,
    ) -> Result<Transition, sqlx::Error> {
        let existing = self
            .subscriptions
            .find_by_external_id(&event.external_subscription_id)
            .await?;

        if existing.is_none() && !event.status.opens_subscription() {
            info!(
                external_subscription_id = %event.external_subscription_id,
                status = %event.status,
                event_id = %event.event_id,
                "first event for subscription does not open it; nothing created"
            );
            return Ok(Transition::Skipped);
        }

        let is_new = existing.is_none();
        let owner = existing.as_ref().map(|sub| sub.owner_user_id).unwrap_or(owner);
        let is_checkout = event.kind == NormalizedEventKind::CheckoutCompleted;

        let row = match existing {
            // Checkout payloads carry no subscription status or period; the row
            // written by the subscription events stays authoritative.
            Some(row) if is_checkout => row,
            _ => {
                self.subscriptions
                    .upsert_subscription(&SubscriptionUpsert {
                        owner_user_id: owner,
                        external_subscription_id: event.external_subscription_id.clone(),
                        provider: event.provider,
                        external_price_id: event.price_id.clone(),
                        status: event.status,
                        current_period_start: event.current_period_start,
                        current_period_end: event.current_period_end,
                        cancel_at_period_end: event.cancel_at_period_end,
                    })
                    .await?
            }
        };

        self.project_onto_user(owner, row.status, resolution.tier, is_new || is_checkout)
            .await?;

        if is_checkout {
            self.users
                .set_billing_correlation(
                    owner,
                    &BillingCorrelation {
                        provider: event.provider,
                        customer_id: event.customer_id.clone(),
                        subscription_id: event.provider_subscription_id.clone(),
                    },
                )
                .await?;
        }

        info!(
            user_id = %owner,
            external_subscription_id = %row.external_subscription_id,
            status = %row.status,
            tier = resolution.tier.as_str(),
            created = is_new,
            "subscription state applied"
        );

        Ok(if is_new {
            Transition::Created(row)
        } else {
            Transition::Updated(row)
        })
    }

    async fn project_onto_user(
        &self,
        owner: Uuid,
        status: SubscriptionStatus,
        tier: SubscriptionTier,
        opening: bool,
    ) -> Result<(), sqlx::Error> {
        match status {
            SubscriptionStatus::Cancelled => {
                self.users
                    .update_subscription_tier(owner, SubscriptionTier::Free, status)
                    .await
            }
            // A freshly opened or purchased subscription reads as active on the user.
            SubscriptionStatus::Trialing if opening => {
                self.users
                    .update_subscription_tier(owner, tier, SubscriptionStatus::Active)
                    .await
            }
            SubscriptionStatus::Active | SubscriptionStatus::Trialing => {
                self.users.update_subscription_tier(owner, tier, status).await
            }
            // Grace period: keep the tier, mirror the status.
            SubscriptionStatus::PastDue => self.users.update_subscription_status(owner, status).await,
        }
    }
}
