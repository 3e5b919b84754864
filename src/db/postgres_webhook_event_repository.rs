use crate::{
    db::webhook_event_repository::{InsertOutcome, WebhookEventRepository},
    models::webhook_event::NewWebhookEvent,
};
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresWebhookEventRepository {
    pub pool: PgPool,
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn insert_event(&self, event: &NewWebhookEvent) -> Result<InsertOutcome, sqlx::Error> {
        let res = sqlx::query(
            r#"
            INSERT INTO billing_webhook_events (provider, event_id, event_type, payload_hash, created_at)
            VALUES ($1, $2, $3, $4, now())
            "#,
        )
        .bind(event.provider)
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(&event.payload_hash)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(err) => Err(err),
        }
    }
}
