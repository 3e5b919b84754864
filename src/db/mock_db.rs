use crate::db::{subscription_repository::SubscriptionRepository, user_repository::UserRepository};
use crate::models::{
    plan::SubscriptionTier,
    subscription::{Subscription, SubscriptionStatus, SubscriptionUpsert},
    user::{BillingCorrelation, BillingUser},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use time::OffsetDateTime;
use uuid::Uuid;

/// In-memory stand-in for the user and subscription tables.
#[derive(Default)]
pub struct MockDb {
    pub users: Mutex<HashMap<Uuid, BillingUser>>,
    pub subscriptions: Mutex<HashMap<String, Subscription>>,
    pub should_fail: bool,
    pub upsert_calls: Mutex<usize>,
    pub tier_updates: Mutex<Vec<(Uuid, SubscriptionTier, SubscriptionStatus)>>,
    pub status_updates: Mutex<Vec<(Uuid, SubscriptionStatus)>>,
}

impl MockDb {
    pub fn with_user(self, user: BillingUser) -> Self {
        self.users.lock().unwrap().insert(user.id, user);
        self
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.external_subscription_id.clone(), subscription);
        self
    }

    pub fn user(&self, user_id: Uuid) -> Option<BillingUser> {
        self.users.lock().unwrap().get(&user_id).cloned()
    }

    pub fn subscription(&self, external_id: &str) -> Option<Subscription> {
        self.subscriptions.lock().unwrap().get(external_id).cloned()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    fn fail_if_requested(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }
}

pub fn billing_user(id: Uuid, tier: Option<&str>) -> BillingUser {
    BillingUser {
        id,
        email: format!("{id}@example.com"),
        subscription_tier: tier.map(str::to_string),
        subscription_status: None,
        billing_provider: None,
        billing_customer_id: None,
        billing_subscription_id: None,
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_billing_user(&self, user_id: Uuid) -> Result<Option<BillingUser>, sqlx::Error> {
        self.fail_if_requested()?;
        Ok(self.user(user_id))
    }

    async fn update_subscription_tier(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<(), sqlx::Error> {
        self.fail_if_requested()?;
        self.tier_updates
            .lock()
            .unwrap()
            .push((user_id, tier, status));
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.subscription_tier = Some(tier.as_str().to_string());
            user.subscription_status = Some(status.as_str().to_string());
        }
        Ok(())
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<(), sqlx::Error> {
        self.fail_if_requested()?;
        self.status_updates.lock().unwrap().push((user_id, status));
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.subscription_status = Some(status.as_str().to_string());
        }
        Ok(())
    }

    async fn set_billing_correlation(
        &self,
        user_id: Uuid,
        correlation: &BillingCorrelation,
    ) -> Result<(), sqlx::Error> {
        self.fail_if_requested()?;
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.billing_provider = Some(correlation.provider);
            if correlation.customer_id.is_some() {
                user.billing_customer_id = correlation.customer_id.clone();
            }
            user.billing_subscription_id = Some(correlation.subscription_id.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for MockDb {
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        self.fail_if_requested()?;
        Ok(self.subscription(external_subscription_id))
    }

    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Subscription, sqlx::Error> {
        self.fail_if_requested()?;
        *self.upsert_calls.lock().unwrap() += 1;
        let now = OffsetDateTime::now_utc();
        let mut subs = self.subscriptions.lock().unwrap();
        let row = subs
            .entry(upsert.external_subscription_id.clone())
            .and_modify(|existing| {
                existing.external_price_id = upsert.external_price_id.clone();
                existing.status = upsert.status;
                existing.current_period_start = upsert.current_period_start;
                existing.current_period_end = upsert.current_period_end;
                existing.cancel_at_period_end = upsert.cancel_at_period_end;
                existing.updated_at = now;
            })
            .or_insert_with(|| Subscription {
                id: Uuid::new_v4(),
                owner_user_id: upsert.owner_user_id,
                external_subscription_id: upsert.external_subscription_id.clone(),
                provider: upsert.provider,
                external_price_id: upsert.external_price_id.clone(),
                status: upsert.status,
                current_period_start: upsert.current_period_start,
                current_period_end: upsert.current_period_end,
                cancel_at_period_end: upsert.cancel_at_period_end,
                created_at: now,
                updated_at: now,
            });
        Ok(row.clone())
    }

    async fn find_latest_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        self.fail_if_requested()?;
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|sub| sub.owner_user_id == user_id)
            .max_by_key(|sub| sub.updated_at)
            .cloned())
    }

    async fn find_latest_active_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        self.fail_if_requested()?;
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .filter(|sub| sub.owner_user_id == user_id && !sub.status.is_terminal())
            .max_by_key(|sub| sub.updated_at)
            .cloned())
    }
}
