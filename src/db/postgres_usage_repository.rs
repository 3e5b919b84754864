use crate::db::usage_repository::UsageRepository;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

pub struct PostgresUsageRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UsageRepository for PostgresUsageRepository {
    async fn count_active_devices(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM devices WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_team_vaults(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<Postgres, i64>(
            r#"
            SELECT COUNT(*)
            FROM team_vaults v
            WHERE v.deleted_at IS NULL
              AND v.team_id IN (
                  SELECT id FROM teams WHERE owner_id = $1
                  UNION
                  SELECT team_id FROM team_members WHERE user_id = $1
              )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_team_members(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<Postgres, i64>(
            r#"
            SELECT COUNT(*)
            FROM team_members m
            WHERE m.team_id IN (
                SELECT id FROM teams WHERE owner_id = $1
                UNION
                SELECT team_id FROM team_members
                WHERE user_id = $1 AND role IN ('owner', 'admin')
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}
