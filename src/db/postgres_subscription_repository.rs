use crate::{
    db::subscription_repository::SubscriptionRepository,
    models::subscription::{Subscription, SubscriptionUpsert},
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresSubscriptionRepository {
    pub pool: PgPool,
}

const SUBSCRIPTION_COLUMNS: &str = "id, owner_user_id, external_subscription_id, provider, \
     external_price_id, status, current_period_start, current_period_end, \
     cancel_at_period_end, created_at, updated_at";

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE external_subscription_id = $1"
        );
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(external_subscription_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_subscription(
        &self,
        upsert: &SubscriptionUpsert,
    ) -> Result<Subscription, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO subscriptions (
                id, owner_user_id, external_subscription_id, provider, external_price_id,
                status, current_period_start, current_period_end, cancel_at_period_end,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
            ON CONFLICT (external_subscription_id) DO UPDATE
            SET external_price_id = EXCLUDED.external_price_id,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = now()
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(Uuid::new_v4())
            .bind(upsert.owner_user_id)
            .bind(&upsert.external_subscription_id)
            .bind(upsert.provider)
            .bind(&upsert.external_price_id)
            .bind(upsert.status)
            .bind(upsert.current_period_start)
            .bind(upsert.current_period_end)
            .bind(upsert.cancel_at_period_end)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_latest_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE owner_user_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_latest_active_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE owner_user_id = $1
              AND status <> 'cancelled'
            ORDER BY updated_at DESC
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, Subscription>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }
}
