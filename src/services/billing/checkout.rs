use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::user_repository::UserRepository;
use crate::models::{subscription::BillingProvider, user::BillingUser};
use crate::services::billing::{error::BillingError, plan_resolver::PlanResolver};
use crate::services::stripe::{
    CheckoutLineItem, CheckoutMode, CheckoutSession, CreateCheckoutSessionRequest,
    CreatePortalSessionRequest, PortalSession, StripeService,
};

/// Customer id usable with the primary provider. Ids saved from the alternate
/// provider are never sent to it.
fn stripe_customer(user: BillingUser) -> Option<String> {
    match user.billing_provider {
        Some(BillingProvider::Stripe) => user.billing_customer_id,
        _ => None,
    }
}

/// Opens hosted checkout and customer-portal sessions with the primary provider.
#[derive(Clone)]
pub struct SessionInitiator {
    users: Arc<dyn UserRepository>,
    plans: Arc<PlanResolver>,
    stripe: Option<Arc<dyn StripeService>>,
}

impl SessionInitiator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        plans: Arc<PlanResolver>,
        stripe: Option<Arc<dyn StripeService>>,
    ) -> Self {
        Self {
            users,
            plans,
            stripe,
        }
    }

    fn stripe(&self) -> Result<&Arc<dyn StripeService>, BillingError> {
        self.stripe
            .as_ref()
            .ok_or_else(|| BillingError::Configuration("STRIPE_SECRET_KEY is not set".into()))
    }

    pub async fn create_checkout(
        &self,
        user_id: Uuid,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let price_id = price_id.trim();
        if !self.plans.is_checkout_price(price_id) {
            warn!(%user_id, price_id, "checkout requested for unknown price");
            return Err(BillingError::UnknownPriceId(price_id.to_string()));
        }
        let stripe = self.stripe()?;

        let customer = self
            .users
            .find_billing_user(user_id)
            .await?
            .and_then(stripe_customer);

        let metadata: BTreeMap<String, String> = [
            ("user_id".to_string(), user_id.to_string()),
            ("price_id".to_string(), price_id.to_string()),
        ]
        .into_iter()
        .collect();

        let session = stripe
            .create_checkout_session(CreateCheckoutSessionRequest {
                success_url: success_url.to_string(),
                cancel_url: cancel_url.to_string(),
                mode: CheckoutMode::Subscription,
                line_items: vec![CheckoutLineItem {
                    price: price_id.to_string(),
                    quantity: 1,
                }],
                client_reference_id: Some(user_id.to_string()),
                customer,
                metadata: Some(metadata),
            })
            .await?;

        info!(%user_id, price_id, session_id = %session.id, "checkout session created");
        Ok(session)
    }

    pub async fn create_portal(
        &self,
        user_id: Uuid,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        let customer = self
            .users
            .find_billing_user(user_id)
            .await?
            .and_then(stripe_customer)
            .ok_or(BillingError::NoSubscription)?;
        let stripe = self.stripe()?;

        let session = stripe
            .create_portal_session(CreatePortalSessionRequest {
                customer,
                return_url: return_url.to_string(),
            })
            .await?;

        info!(%user_id, session_id = %session.id, "portal session created");
        Ok(session)
    }
}
