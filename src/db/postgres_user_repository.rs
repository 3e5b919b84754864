use crate::{
    db::user_repository::UserRepository,
    models::{
        plan::SubscriptionTier,
        subscription::SubscriptionStatus,
        user::{BillingCorrelation, BillingUser},
    },
};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_billing_user(&self, user_id: Uuid) -> Result<Option<BillingUser>, sqlx::Error> {
        sqlx::query_as::<_, BillingUser>(
            r#"
            SELECT id,
                   email,
                   subscription_tier,
                   subscription_status,
                   billing_provider,
                   billing_customer_id,
                   billing_subscription_id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_subscription_tier(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET subscription_tier = $2,
                subscription_status = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(tier.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET subscription_status = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_billing_correlation(
        &self,
        user_id: Uuid,
        correlation: &BillingCorrelation,
    ) -> Result<(), sqlx::Error> {
        // A missing customer id on the event must not wipe one saved earlier.
        sqlx::query(
            r#"
            UPDATE users
            SET billing_provider = $2,
                billing_customer_id = COALESCE($3, billing_customer_id),
                billing_subscription_id = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(correlation.provider)
        .bind(correlation.customer_id.as_deref())
        .bind(&correlation.subscription_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
