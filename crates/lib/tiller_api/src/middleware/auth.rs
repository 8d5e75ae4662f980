// @zen-component: AUTH-AccessControl
//
//! Authentication middleware: Bearer token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tiller_core::models::Claims;
use tiller_core::token::BearerHeaders;

use crate::AppState;
use crate::error::AppError;

/// Key used to store verified [`Claims`] in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

// @zen-impl: AUTH-3_AC-2
/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the
/// access token, and injects [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let bearer = BearerHeaders::parse(authorization, None)?;
    let claims = state.tokens.decode_access(&bearer.access_token)?;
    request.extensions_mut().insert(AuthenticatedUser(claims));

    Ok(next.run(request).await)
}
