use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    BankAdmin,
    Analyst,
    Auditor,
    System,
}

impl Role {
    /// Only ADMIN may call `/admin/validate-datasets` across all tenants
    /// (spec.md §4.15); every other role is scoped to its own `bank_id`.
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Claims carried by the signed bearer token every entrypoint receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: Role,
    pub bank_id: Uuid,
    pub exp: i64,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
