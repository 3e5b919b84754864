use crate::config::Config;
use crate::db::{
    subscription_repository::SubscriptionRepository, usage_repository::UsageRepository,
    user_repository::UserRepository, webhook_event_repository::WebhookEventRepository,
};
use crate::models::subscription::BillingProvider;
use crate::services::billing::{
    checkout::SessionInitiator, idempotency::IdempotencyGuard, normalizer::ProviderAdapter,
    plan_resolver::PlanResolver, usage_limits::UsageLimitGate, webhook::WebhookProcessor,
};
use crate::services::stripe::StripeService;
use crate::utils::jwt::{SessionTokenSource, SessionTokenVerifier};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub usage: Arc<dyn UsageRepository>,
    /// `None` when no provider secret key is configured.
    pub stripe: Option<Arc<dyn StripeService>>,
    pub plans: Arc<PlanResolver>,
    pub config: Arc<Config>,
    pub session_tokens: Arc<SessionTokenVerifier>,
}

impl AppState {
    pub fn webhook_secret(&self, provider: BillingProvider) -> Option<&str> {
        match provider {
            BillingProvider::Stripe => self.config.stripe.webhook_secret.as_deref(),
            BillingProvider::Paddle => self.config.paddle.webhook_secret.as_deref(),
        }
    }

    pub fn webhook_processor(&self, adapter: Arc<dyn ProviderAdapter>) -> WebhookProcessor {
        let secret = self.webhook_secret(adapter.provider()).map(str::to_string);
        WebhookProcessor {
            adapter,
            secret,
            guard: IdempotencyGuard::new(self.webhook_events.clone()),
            users: self.users.clone(),
            subscriptions: self.subscriptions.clone(),
            plans: self.plans.clone(),
        }
    }

    pub fn usage_gate(&self) -> UsageLimitGate {
        UsageLimitGate::new(
            self.users.clone(),
            self.subscriptions.clone(),
            self.usage.clone(),
            self.plans.clone(),
        )
    }

    pub fn session_initiator(&self) -> SessionInitiator {
        SessionInitiator::new(self.users.clone(), self.plans.clone(), self.stripe.clone())
    }
}

impl SessionTokenSource for AppState {
    fn session_tokens(&self) -> &SessionTokenVerifier {
        &self.session_tokens
    }
}
