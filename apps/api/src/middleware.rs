use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use arcade_ledger_core::{AppError, AppResult, CallerIdentity, CallerRole, TenantId};

use crate::error::ApiResult;

/// Header carrying the authenticated subject, set by the gateway.
pub const SUBJECT_HEADER: &str = "x-arcade-subject";
/// Header carrying the caller role.
pub const ROLE_HEADER: &str = "x-arcade-role";
/// Header carrying the caller's arcade; absent for administrators.
pub const TENANT_HEADER: &str = "x-arcade-tenant";

/// Resolves the gateway-asserted caller and stores it as a request extension.
pub async fn require_caller(mut request: Request, next: Next) -> ApiResult<Response> {
    let caller = caller_from_headers(request.headers())?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn caller_from_headers(headers: &HeaderMap) -> AppResult<CallerIdentity> {
    let subject = header_value(headers, SUBJECT_HEADER)?
        .ok_or_else(|| AppError::Unauthorized("caller subject is missing".to_owned()))?;
    let role = header_value(headers, ROLE_HEADER)?
        .ok_or_else(|| AppError::Unauthorized("caller role is missing".to_owned()))?
        .parse::<CallerRole>()?;
    let tenant_id = header_value(headers, TENANT_HEADER)?
        .map(|value| {
            value.parse::<TenantId>().map_err(|error| {
                AppError::Unauthorized(format!("caller tenant is malformed: {error}"))
            })
        })
        .transpose()?;

    // Administrators are never tenant-bound, even if the gateway forwards one.
    let tenant_id = if role == CallerRole::Admin {
        None
    } else {
        tenant_id
    };

    CallerIdentity::new(subject, role, tenant_id)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<Option<&'a str>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| AppError::Unauthorized(format!("header '{name}' is not valid text")))
        })
        .transpose()
        .map(|value| value.filter(|value| !value.is_empty()))
}
