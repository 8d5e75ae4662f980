// @zen-component: AUTH-UserEndpoints
//
//! Public user endpoints: registration and credential login.

use axum::{Json, extract::State, http::StatusCode};
use tiller_core::models::{Credentials, NewUser};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{StatusResponse, TokenPairResponse};

// @zen-impl: AUTH-1_AC-2
/// `POST /auth/user/registration`: create a user with its city and base
/// `client` grant.
pub async fn registration_handler(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> AppResult<(StatusCode, Json<StatusResponse>)> {
    state.manager.register_user(&body).await?;
    Ok((StatusCode::CREATED, Json(StatusResponse::ok())))
}

// @zen-impl: AUTH-2_AC-2
/// `POST /auth/user/authorization`: credential login returning a token
/// pair.
pub async fn authorization_handler(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<Json<TokenPairResponse>> {
    let user = state
        .manager
        .authenticate_user(&body)
        .await
        .map_err(AppError::auth_failure)?;
    let pair = state.tokens.issue_pair(&user)?;
    Ok(Json(pair.into()))
}
