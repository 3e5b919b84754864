use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::{
    plan::{Plan, SubscriptionTier},
    subscription::BillingProvider,
};

/// Configured provider price ids, grouped by internal plan.
#[derive(Clone, Debug, Default)]
pub struct PriceCatalog {
    prices: BTreeMap<BillingProvider, BTreeMap<Plan, BTreeSet<String>>>,
}

impl PriceCatalog {
    pub fn insert_all<'a>(
        &mut self,
        provider: BillingProvider,
        plan: Plan,
        price_ids: impl IntoIterator<Item = &'a str>,
    ) {
        let entry = self
            .prices
            .entry(provider)
            .or_default()
            .entry(plan)
            .or_default();
        entry.extend(
            price_ids
                .into_iter()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        );
    }

    pub fn with_prices(mut self, provider: BillingProvider, plan: Plan, ids: &[&str]) -> Self {
        self.insert_all(provider, plan, ids.iter().copied());
        self
    }

    /// Plan whose set contains `price_id`. An id listed under several plans
    /// resolves to the highest of them.
    pub fn plan_for(&self, provider: BillingProvider, price_id: &str) -> Option<Plan> {
        self.prices
            .get(&provider)?
            .iter()
            .rev()
            .find(|(_, ids)| ids.contains(price_id))
            .map(|(plan, _)| *plan)
    }

    pub fn contains(&self, provider: BillingProvider, price_id: &str) -> bool {
        self.plan_for(provider, price_id).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    PriceCatalog,
    /// Price not configured; the subject keeps its current tier.
    ExistingTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanResolution {
    pub plan: Plan,
    pub tier: SubscriptionTier,
    pub source: ResolutionSource,
}

/// Maps provider prices onto internal plans and plans onto tiers.
#[derive(Clone, Debug, Default)]
pub struct PlanResolver {
    catalog: PriceCatalog,
}

impl PlanResolver {
    pub fn new(catalog: PriceCatalog) -> Self {
        Self { catalog }
    }

    pub fn resolve_plan(&self, provider: BillingProvider, price_id: &str) -> Option<Plan> {
        self.catalog.plan_for(provider, price_id)
    }

    /// Never downgrades: an unmapped price keeps `existing_tier`.
    pub fn resolve(
        &self,
        provider: BillingProvider,
        price_id: &str,
        existing_tier: SubscriptionTier,
    ) -> PlanResolution {
        match self.resolve_plan(provider, price_id) {
            Some(plan) => PlanResolution {
                plan,
                tier: plan.tier(),
                source: ResolutionSource::PriceCatalog,
            },
            None => {
                debug!(
                    provider = %provider,
                    price_id,
                    tier = existing_tier.as_str(),
                    "price not in catalog; keeping existing tier"
                );
                PlanResolution {
                    plan: Plan::default_for_tier(existing_tier),
                    tier: existing_tier,
                    source: ResolutionSource::ExistingTier,
                }
            }
        }
    }

    /// Checkout is only offered through the primary provider.
    pub fn is_checkout_price(&self, price_id: &str) -> bool {
        self.catalog.contains(BillingProvider::Stripe, price_id)
    }
}
