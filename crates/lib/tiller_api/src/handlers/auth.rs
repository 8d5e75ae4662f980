// @zen-component: AUTH-AdminEndpoints
//
//! Administrative endpoints: elevated login and role changes.

use axum::{Extension, Json, extract::State};
use tiller_core::manager::RoleChange;
use tiller_core::models::{Claims, Credentials};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{RoleChangeRequest, StatusResponse, TokenPairResponse};

// @zen-impl: AUTH-2_AC-3
/// `POST /auth/`: login restricted to moderators and administrators.
pub async fn admin_login_handler(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<Json<TokenPairResponse>> {
    let user = state
        .manager
        .authenticate_user(&body)
        .await
        .map_err(AppError::auth_failure)?;
    if !state.manager.is_user_elevated(&user).await? {
        return Err(AppError::Unauthorized(
            "moderator or administrator role required".to_string(),
        ));
    }
    let pair = state.tokens.issue_pair(&user)?;
    Ok(Json(pair.into()))
}

// @zen-impl: PERM-2_AC-2
/// `POST /auth/upgrade`: promote the target user to moderator.
pub async fn upgrade_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    Json(body): Json<RoleChangeRequest>,
) -> AppResult<Json<StatusResponse>> {
    change_role(&state, &claims, &body, RoleChange::Upgrade).await
}

// @zen-impl: PERM-2_AC-2
/// `POST /auth/downgrade`: demote the target user back to client.
pub async fn downgrade_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    Json(body): Json<RoleChangeRequest>,
) -> AppResult<Json<StatusResponse>> {
    change_role(&state, &claims, &body, RoleChange::Downgrade).await
}

/// Shared role-change flow: the caller must hold an elevated grant, the
/// target is found by phone or by name and surname.
async fn change_role(
    state: &AppState,
    claims: &Claims,
    target: &RoleChangeRequest,
    change: RoleChange,
) -> AppResult<Json<StatusResponse>> {
    let elevated = state
        .manager
        .is_elevated_permission(claims)
        .await
        .map_err(AppError::auth_failure)?;
    if !elevated {
        return Err(AppError::Unauthorized(
            "moderator or administrator role required".to_string(),
        ));
    }

    let user = state
        .manager
        .find_user(
            target.name.as_deref(),
            target.surname.as_deref(),
            target.phone.as_deref(),
        )
        .await?;
    state.manager.change_user_role(&user, change).await?;
    Ok(Json(StatusResponse::ok()))
}
