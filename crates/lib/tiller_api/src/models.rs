//! Request/response DTOs for the HTTP and RPC surfaces.
//!
//! Inbound bodies reuse the core input structs (`NewUser`, `Credentials`);
//! only the outbound shapes and API-specific requests live here.

use serde::{Deserialize, Serialize};
use tiller_core::token::TokenPair;

/// Issued token pair, bearer-style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Plain acknowledgement body: `{"status":"ok"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Role change target: a phone, or a name and surname together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleChangeRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Health probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub db_connected: bool,
}
