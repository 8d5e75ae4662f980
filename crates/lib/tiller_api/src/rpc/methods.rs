//! RPC method handlers.
//!
//! These mirror the HTTP handlers but speak the envelope protocol: every
//! failure is reported as a core error whose message ends up in the error
//! envelope verbatim.

use serde::Serialize;
use serde_json::Value;
use tiller_core::models::{Credentials, NewUser, UserProfile};
use tiller_core::{Error, Result};

use super::IncomingRpc;
use crate::AppState;
use crate::models::TokenPairResponse;

fn parse_payload<T: serde::de::DeserializeOwned>(message: &IncomingRpc) -> Result<T> {
    serde_json::from_slice(&message.payload).map_err(|e| Error::MessageMalformed(e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Internal(format!("serialize answer: {e}")))
}

/// Register a user and answer with a token pair.
pub(super) async fn user_registration(state: &AppState, message: &IncomingRpc) -> Result<Value> {
    let input: NewUser = parse_payload(message)?;
    let user = state.manager.register_user(&input).await?;
    let pair = state.tokens.issue_pair(&user)?;
    to_json(&TokenPairResponse::from(pair))
}

/// Credential login; answers with a token pair.
pub(super) async fn user_authorization(state: &AppState, message: &IncomingRpc) -> Result<Value> {
    let credentials: Credentials = parse_payload(message)?;
    let user = state.manager.authenticate_user(&credentials).await?;
    let pair = state.tokens.issue_pair(&user)?;
    to_json(&TokenPairResponse::from(pair))
}

/// Answer whether the bearer may perform the requested action.
pub(super) async fn user_handler_action(state: &AppState, message: &IncomingRpc) -> Result<Value> {
    let bearer = message.bearer_headers()?;
    let claims = state.tokens.decode_access(&bearer.access_token)?;

    let payload: Value = parse_payload(message)?;
    let action = payload
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MessageMalformed("missing action field".to_string()))?;

    let allowed = state.manager.is_action_allowed(&claims, action).await?;
    Ok(Value::Bool(allowed))
}

/// Exchange a valid refresh token (bound to its access token) for a fresh
/// pair. The access token may be expired; its signature must still hold.
pub(super) async fn refresh_access_token(state: &AppState, message: &IncomingRpc) -> Result<Value> {
    let bearer = message.bearer_headers()?;
    let refresh_token = bearer.require_refresh()?;
    state
        .tokens
        .decode_refresh(refresh_token, &bearer.access_token)?;

    let claims = state
        .tokens
        .decode_access_unchecked_expiry(&bearer.access_token)?;
    let user = state.manager.current_user(&claims).await?;
    let pair = state.tokens.issue_pair(&user)?;
    to_json(&TokenPairResponse::from(pair))
}

/// Answer the bearer's own profile, password hash excluded.
pub(super) async fn get_user(state: &AppState, message: &IncomingRpc) -> Result<Value> {
    let bearer = message.bearer_headers()?;
    let claims = state.tokens.decode_access(&bearer.access_token)?;
    let user = state.manager.current_user(&claims).await?;
    to_json(&UserProfile::from(&user))
}
