use crate::db::webhook_event_repository::{InsertOutcome, WebhookEventRepository};
use crate::models::{subscription::BillingProvider, webhook_event::NewWebhookEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockWebhookEventRepository {
    events: Arc<Mutex<HashMap<(BillingProvider, String), NewWebhookEvent>>>,
    pub inserts: Arc<Mutex<usize>>,
    pub should_fail: bool,
}

impl MockWebhookEventRepository {
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn recorded(&self, provider: BillingProvider, event_id: &str) -> Option<NewWebhookEvent> {
        self.events
            .lock()
            .unwrap()
            .get(&(provider, event_id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl WebhookEventRepository for MockWebhookEventRepository {
    async fn insert_event(&self, event: &NewWebhookEvent) -> Result<InsertOutcome, sqlx::Error> {
        *self.inserts.lock().unwrap() += 1;
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        let mut events = self.events.lock().unwrap();
        let key = (event.provider, event.event_id.clone());
        if events.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        events.insert(key, event.clone());
        Ok(InsertOutcome::Inserted)
    }
}
