use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::db::{
    subscription_repository::SubscriptionRepository, usage_repository::UsageRepository,
    user_repository::UserRepository,
};
use crate::models::{
    plan::{Plan, ResourceKind, SubscriptionTier},
    usage::LimitCheck,
};
use crate::services::billing::plan_resolver::PlanResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub plan: Plan,
    pub devices: LimitCheck,
    pub vaults: LimitCheck,
    pub team_members: LimitCheck,
    pub storage: LimitCheck,
}

/// Read-only answers to "may this user create one more X". Checks are
/// best-effort: two concurrent creations can both pass the last free slot.
#[derive(Clone)]
pub struct UsageLimitGate {
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    usage: Arc<dyn UsageRepository>,
    plans: Arc<PlanResolver>,
}

impl UsageLimitGate {
    pub fn new(
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        usage: Arc<dyn UsageRepository>,
        plans: Arc<PlanResolver>,
    ) -> Self {
        Self {
            users,
            subscriptions,
            usage,
            plans,
        }
    }

    /// Price-derived plan of the latest live subscription, else a guess from
    /// the tier stored on the user.
    pub async fn effective_plan(&self, user_id: Uuid) -> Result<Plan, sqlx::Error> {
        if let Some(sub) = self.subscriptions.find_latest_active_for_user(user_id).await? {
            if let Some(plan) = self.plans.resolve_plan(sub.provider, &sub.external_price_id) {
                return Ok(plan);
            }
            debug!(
                %user_id,
                price_id = %sub.external_price_id,
                "subscription price not in catalog; using tier guess"
            );
        }

        let tier = self
            .users
            .find_billing_user(user_id)
            .await?
            .map(|user| user.tier())
            .unwrap_or(SubscriptionTier::Free);
        Ok(Plan::default_for_tier(tier))
    }

    async fn current_usage(&self, user_id: Uuid, resource: ResourceKind) -> Result<i64, sqlx::Error> {
        match resource {
            ResourceKind::Devices => self.usage.count_active_devices(user_id).await,
            ResourceKind::Vaults => self.usage.count_team_vaults(user_id).await,
            ResourceKind::TeamMembers => self.usage.count_team_members(user_id).await,
            // Storage accounting is not tracked yet; always reports zero.
            ResourceKind::Storage => Ok(0),
        }
    }

    pub async fn check_limit(
        &self,
        user_id: Uuid,
        resource: ResourceKind,
    ) -> Result<LimitCheck, sqlx::Error> {
        let plan = self.effective_plan(user_id).await?;
        self.check_with_plan(user_id, plan, resource).await
    }

    async fn check_with_plan(
        &self,
        user_id: Uuid,
        plan: Plan,
        resource: ResourceKind,
    ) -> Result<LimitCheck, sqlx::Error> {
        let limit = plan.limits().for_resource(resource);
        let current = self.current_usage(user_id, resource).await?;
        Ok(LimitCheck::evaluate(current, limit))
    }

    pub async fn check_all(&self, user_id: Uuid) -> Result<UsageSummary, sqlx::Error> {
        let plan = self.effective_plan(user_id).await?;
        Ok(UsageSummary {
            plan,
            devices: self
                .check_with_plan(user_id, plan, ResourceKind::Devices)
                .await?,
            vaults: self
                .check_with_plan(user_id, plan, ResourceKind::Vaults)
                .await?,
            team_members: self
                .check_with_plan(user_id, plan, ResourceKind::TeamMembers)
                .await?,
            storage: self
                .check_with_plan(user_id, plan, ResourceKind::Storage)
                .await?,
        })
    }
}
