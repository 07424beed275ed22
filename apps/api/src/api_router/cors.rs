use axum::http::header::{CONTENT_TYPE, HeaderName};
use axum::http::{HeaderValue, Method};
use arcade_ledger_core::AppError;
use tower_http::cors::CorsLayer;

use crate::middleware::{ROLE_HEADER, SUBJECT_HEADER, TENANT_HEADER};

/// Builds the CORS policy. Without a configured frontend no cross-origin
/// request is allowed.
pub(super) fn build_cors_layer(frontend_url: Option<&str>) -> Result<CorsLayer, AppError> {
    let Some(frontend_url) = frontend_url else {
        return Ok(CorsLayer::new());
    };

    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(SUBJECT_HEADER),
            HeaderName::from_static(ROLE_HEADER),
            HeaderName::from_static(TENANT_HEADER),
        ]))
}
