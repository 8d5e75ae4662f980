//! Domain models.
//!
//! Row structs mirror the tables one-to-one; the input structs double as
//! wire DTOs for both the HTTP and the queue-RPC surfaces, so they derive
//! `Deserialize` here rather than in the transport crates.

use serde::{Deserialize, Serialize};

// =============================================================================
// DB row structs
// =============================================================================

/// Database row for `users`. `password_hash` never leaves the service
/// except inside signed token claims.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub password_hash: String,
    pub city_id: i64,
    pub available: bool,
}

/// Database row for `cities`. Names are stored normalized; see
/// [`crate::store::cities::normalize_name`].
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct City {
    pub id: i64,
    pub name: String,
}

/// Database row for `permission_types`, one row per catalog role.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PermissionType {
    pub id: i64,
    pub role: String,
    pub priority: i64,
}

/// Database row for `permission_grants`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PermissionGrant {
    pub id: i64,
    pub user_id: i64,
    pub permission_type_id: i64,
    pub available: bool,
}

/// Join projection: a user's available grant together with its role and
/// priority. Produced by [`crate::store::grants::current_for_user`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActiveGrant {
    pub grant_id: i64,
    pub permission_type_id: i64,
    pub role: String,
    pub priority: i64,
}

// =============================================================================
// Input structs
// =============================================================================

/// Registration input. `city` is the raw place name; it is normalized and
/// resolved to a `cities` row during registration.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub city: String,
    pub password: String,
}

/// Login input. Identification is by phone, or by name and surname
/// together; the password is always required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

// =============================================================================
// Token claims
// =============================================================================

/// Which half of a token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// JWT claims. Both tokens of a pair carry the full identity snapshot of
/// the user at issue time; the refresh token additionally carries
/// `at_hash`, binding it to its paired access token.
///
/// The snapshot is what makes issued tokens self-contained, and also what
/// makes them stale after a role or password change, until they expire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID (standard JWT `sub` claim).
    pub sub: i64,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub city_id: i64,
    pub password_hash: String,
    pub available: bool,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
    pub token_use: TokenUse,
    /// base64url of the left half of SHA-256 over the paired access token.
    /// Present on refresh tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,
}

// =============================================================================
// Outbound views
// =============================================================================

/// User snapshot safe to hand out: everything but the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub phone: String,
    pub city_id: i64,
    pub available: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            surname: user.surname.clone(),
            phone: user.phone.clone(),
            city_id: user.city_id,
            available: user.available,
        }
    }
}
