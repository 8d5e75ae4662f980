//! Domain error taxonomy shared by the store, token service and manager.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Everything the core can fail with. Transport adapters map these onto
/// HTTP statuses or RPC error envelopes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("The user is already registered!")]
    AlreadyRegistered,

    #[error("The phone number is already in use!")]
    PhoneInUse,

    #[error("Incorrect authorization data: {0}")]
    InvalidRequest(String),

    #[error("The user was not found!")]
    NotFound,

    #[error("Incorrect login or password!")]
    InvalidCredentials,

    #[error("The user has no available permission grant")]
    NoPermission,

    #[error("Administrator roles cannot be changed")]
    ProtectedRole,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage conflict on {0}")]
    StorageConflict(&'static str),

    #[error("Malformed message payload: {0}")]
    MessageMalformed(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
