use serde::Serialize;

use super::plan::UNLIMITED;

/// Outcome of a usage check for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub current: i64,
    pub limit: i64,
}

impl LimitCheck {
    pub fn evaluate(current: i64, limit: i64) -> Self {
        Self {
            allowed: limit == UNLIMITED || current < limit,
            current,
            limit,
        }
    }
}
