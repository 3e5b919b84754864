use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::plan::SubscriptionTier;
use super::subscription::BillingProvider;

/// Billing columns of a user row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct BillingUser {
    pub id: Uuid,
    pub email: String,
    pub subscription_tier: Option<String>,
    pub subscription_status: Option<String>,
    pub billing_provider: Option<BillingProvider>,
    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,
}

impl BillingUser {
    pub fn tier(&self) -> SubscriptionTier {
        SubscriptionTier::from_stored(self.subscription_tier.as_deref())
    }
}

/// Provider-side keys saved on the user once checkout completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingCorrelation {
    pub provider: BillingProvider,
    pub customer_id: Option<String>,
    pub subscription_id: String,
}
