pub mod plan;
pub mod subscription;
pub mod usage;
pub mod user;
pub mod webhook_event;
