use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    plan::SubscriptionTier,
    subscription::SubscriptionStatus,
    user::{BillingCorrelation, BillingUser},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_billing_user(&self, user_id: Uuid) -> Result<Option<BillingUser>, sqlx::Error>;

    /// Projects a tier and status onto the user row.
    async fn update_subscription_tier(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<(), sqlx::Error>;

    /// Mirrors only the status, leaving the tier untouched.
    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<(), sqlx::Error>;

    async fn set_billing_correlation(
        &self,
        user_id: Uuid,
        correlation: &BillingCorrelation,
    ) -> Result<(), sqlx::Error>;
}
