use async_trait::async_trait;
use uuid::Uuid;

use crate::models::subscription::{Subscription, SubscriptionUpsert};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error>;

    /// Inserts the row or overwrites the mutable columns of the existing one.
    /// The owner of an existing row is never reassigned.
    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Subscription, sqlx::Error>;

    async fn find_latest_for_user(&self, user_id: Uuid)
        -> Result<Option<Subscription>, sqlx::Error>;

    /// Most recently updated subscription that is not cancelled.
    async fn find_latest_active_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error>;
}
