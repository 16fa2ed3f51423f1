use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use payscope_core::error::PayScopeError;
use payscope_tenant::{check_tenant_header, TenantContext};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(headers: &HeaderMap) -> Result<&str, PayScopeError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| PayScopeError::AuthError {
            reason: "missing Authorization: Bearer <token> header".to_string(),
        })
}

fn bank_id_header(headers: &HeaderMap) -> Result<Uuid, PayScopeError> {
    headers
        .get("X-Bank-Id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PayScopeError::AuthError {
            reason: "missing X-Bank-Id header".to_string(),
        })
        .and_then(|raw| {
            Uuid::parse_str(raw).map_err(|_| PayScopeError::AuthError {
                reason: "X-Bank-Id is not a valid UUID".to_string(),
            })
        })
}

/// Verifies the bearer token, enforces that `X-Bank-Id` matches the
/// token's `bank_id` (spec.md §6), and injects a `TenantContext` for
/// downstream handlers. Every authenticated route runs behind this.
pub async fn auth_guard(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let result = (|| -> Result<TenantContext, PayScopeError> {
        let token = bearer_token(&headers)?;
        let claims = state.token_verifier.verify(token)?;
        let header_bank_id = bank_id_header(&headers)?;
        check_tenant_header(&claims, header_bank_id)?;
        Ok(TenantContext::from_claims(claims))
    })();

    match result {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Gate placed in front of `/admin/*` routes, on top of `auth_guard`:
/// requires the authenticated tenant context to carry the ADMIN role
/// (spec.md §4.15).
pub async fn admin_guard(request: Request, next: Next) -> Response {
    match request.extensions().get::<TenantContext>() {
        Some(ctx) if ctx.role.is_admin() => next.run(request).await,
        Some(_) => (StatusCode::FORBIDDEN, "admin role required").into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "tenant_not_bound").into_response(),
    }
}
