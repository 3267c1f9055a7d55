use serde::Serialize;
use uuid::Uuid;

/// Plan reference data, read-only to settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanProfile {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    /// Length of the grant in days. `None` or `<= 0` is a lifetime grant.
    pub duration_days: Option<i32>,
}

impl PlanProfile {
    /// Days to grant on purchase; `0` means lifetime.
    pub fn grant_days(&self) -> i64 {
        self.duration_days
            .filter(|days| *days > 0)
            .map(i64::from)
            .unwrap_or(0)
    }
}
