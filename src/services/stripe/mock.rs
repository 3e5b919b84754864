use super::{
    CheckoutSession, CreateCheckoutSessionRequest, CreatePortalSessionRequest, PortalSession,
    StripeService, StripeServiceError,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Default)]
pub struct MockStripeService {
    pub created_sessions: Arc<Mutex<Vec<CheckoutSession>>>,
    pub last_create_requests: Arc<Mutex<Vec<CreateCheckoutSessionRequest>>>,
    pub portal_requests: Arc<Mutex<Vec<CreatePortalSessionRequest>>>,
    pub fail_with: Arc<Mutex<Option<String>>>,
}

impl MockStripeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(self, message: &str) -> Self {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.last_create_requests.lock().unwrap().len() + self.portal_requests.lock().unwrap().len()
    }

    fn failure(&self) -> Option<StripeServiceError> {
        self.fail_with
            .lock()
            .unwrap()
            .clone()
            .map(StripeServiceError::Api)
    }
}

fn make_id(prefix: &str) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}_{}", prefix, ts)
}

#[async_trait]
impl StripeService for MockStripeService {
    async fn create_checkout_session(
        &self,
        req: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, StripeServiceError> {
        self.last_create_requests.lock().unwrap().push(req.clone());
        if let Some(err) = self.failure() {
            return Err(err);
        }

        let session = CheckoutSession {
            id: make_id("cs_test"),
            url: Some("https://example.test/checkout".into()),
        };
        self.created_sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn create_portal_session(
        &self,
        req: CreatePortalSessionRequest,
    ) -> Result<PortalSession, StripeServiceError> {
        self.portal_requests.lock().unwrap().push(req);
        if let Some(err) = self.failure() {
            return Err(err);
        }

        Ok(PortalSession {
            id: make_id("bps_test"),
            url: "https://example.test/portal".into(),
        })
    }
}
