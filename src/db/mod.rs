#[cfg(test)]
pub mod mock_db;
#[cfg(test)]
pub mod mock_webhook_event_repository;
pub mod postgres_subscription_repository;
pub mod postgres_usage_repository;
pub mod postgres_user_repository;
pub mod postgres_webhook_event_repository;
pub mod subscription_repository;
pub mod usage_repository;
pub mod user_repository;
pub mod webhook_event_repository;
