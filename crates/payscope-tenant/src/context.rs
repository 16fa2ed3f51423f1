use payscope_core::error::PayScopeError;
use sqlx::{Executor, PgConnection};
use tracing::instrument;
use uuid::Uuid;

use crate::claims::{Role, TokenClaims};

/// Bank identity propagated through every call once a request has been
/// authenticated and tenant-matched. Cheap to clone; every store query and
/// outbound agent call carries one.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub bank_id: Uuid,
    pub sub: String,
    pub role: Role,
}

impl TenantContext {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            bank_id: claims.bank_id,
            sub: claims.sub,
            role: claims.role,
        }
    }

    /// Binds `current_bank_id()` on the given facts-store session for the
    /// lifetime of `body`, releasing it on every exit path including early
    /// returns and panics that unwind through `body` (spec.md §4.9).
    ///
    /// Any data access reached without going through this method is a
    /// programming error; callers that skip it should fail closed with
    /// `PayScopeError::TenantNotBound` rather than silently querying
    /// unscoped.
    #[instrument(skip(self, conn, body), fields(bank_id = %self.bank_id))]
    pub async fn with_bound_session<F, Fut, T>(&self, conn: &mut PgConnection, body: F) -> Result<T, PayScopeError>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> Fut,
        Fut: std::future::Future<Output = Result<T, PayScopeError>>,
    {
        bind_session(self.bank_id, conn, body).await
    }
}

/// Free-function form of [`TenantContext::with_bound_session`] for callers
/// that only have a `bank_id` (the store layer, which is handed a `Uuid`
/// rather than a full tenant context). Binds `current_bank_id()` on `conn`
/// for the lifetime of `body`, releasing it on every exit path including
/// early returns and panics that unwind through `body` (spec.md §4.9).
///
/// The callback is higher-ranked over the connection's lifetime so that
/// `body`'s reborrow of `conn` ends before this function's own defensive
/// clear below needs to borrow it again.
#[instrument(skip(conn, body), fields(bank_id = %bank_id))]
pub async fn bind_session<F, Fut, T>(bank_id: Uuid, conn: &mut PgConnection, body: F) -> Result<T, PayScopeError>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> Fut,
    Fut: std::future::Future<Output = Result<T, PayScopeError>>,
{
    conn.execute(sqlx::query("SELECT set_config('payscope.current_bank_id', $1, true)").bind(bank_id.to_string()))
        .await
        .map_err(|e| PayScopeError::DependencyUnavailable {
            dependency: "facts_store".to_string(),
            detail: format!("failed to bind tenant session: {e}"),
        })?;

    let result = body(conn).await;

    // `true` above (is_local) scopes the setting to the current
    // transaction, so it unwinds automatically on commit/rollback; no
    // explicit release call is required, but we clear it defensively
    // in case the caller reuses this connection outside a transaction.
    let _ = conn
        .execute(sqlx::query("SELECT set_config('payscope.current_bank_id', '', true)"))
        .await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Role;

    #[test]
    fn context_carries_claims_fields() {
        let claims = TokenClaims {
            sub: "analyst-1".to_string(),
            role: Role::Analyst,
            bank_id: Uuid::new_v4(),
            exp: 0,
        };
        let bank_id = claims.bank_id;
        let ctx = TenantContext::from_claims(claims);
        assert_eq!(ctx.bank_id, bank_id);
        assert_eq!(ctx.sub, "analyst-1");
    }
}
