use async_trait::async_trait;
use uuid::Uuid;

/// Live counts backing the usage limit gate. Read-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Devices owned by the user that have not been revoked.
    async fn count_active_devices(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    /// Live vaults across every team the user owns or belongs to.
    async fn count_team_vaults(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;

    /// Members across teams the user owns or administers.
    async fn count_team_members(&self, user_id: Uuid) -> Result<i64, sqlx::Error>;
}
