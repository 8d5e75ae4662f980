//! Permission grant queries.
//!
//! A user never holds more than one grant row per permission type
//! (UNIQUE(user_id, permission_type_id)); role changes toggle the
//! `available` flag on existing rows instead of inserting duplicates.

use sqlx::SqliteConnection;

use super::{MAX_CONFLICT_RETRIES, is_unique_violation};
use crate::error::{Error, Result};
use crate::models::{ActiveGrant, PermissionGrant};

const GRANT_COLUMNS: &str = "id, user_id, permission_type_id, available";

/// Fetch the grant row for a (user, permission type) pair, available or
/// not.
pub async fn get(
    conn: &mut SqliteConnection,
    user_id: i64,
    permission_type_id: i64,
) -> Result<Option<PermissionGrant>> {
    let grant = sqlx::query_as::<_, PermissionGrant>(&format!(
        "SELECT {GRANT_COLUMNS} FROM permission_grants \
         WHERE user_id = ? AND permission_type_id = ? LIMIT 1"
    ))
    .bind(user_id)
    .bind(permission_type_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(grant)
}

/// All grant rows of a user, any availability.
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<PermissionGrant>> {
    let grants = sqlx::query_as::<_, PermissionGrant>(&format!(
        "SELECT {GRANT_COLUMNS} FROM permission_grants WHERE user_id = ? ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(grants)
}

/// The user's governing grant: the available grant whose permission type
/// has the highest priority.
pub async fn current_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<ActiveGrant>> {
    let grant = sqlx::query_as::<_, ActiveGrant>(
        "SELECT g.id AS grant_id, g.permission_type_id, t.role, t.priority \
         FROM permission_grants g \
         JOIN permission_types t ON t.id = g.permission_type_id \
         WHERE g.user_id = ? AND g.available = TRUE \
         ORDER BY t.priority DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(grant)
}

async fn insert(
    conn: &mut SqliteConnection,
    user_id: i64,
    permission_type_id: i64,
) -> sqlx::Result<PermissionGrant> {
    sqlx::query_as::<_, PermissionGrant>(&format!(
        "INSERT INTO permission_grants (user_id, permission_type_id) \
         VALUES (?, ?) RETURNING {GRANT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(permission_type_id)
    .fetch_one(&mut *conn)
    .await
}

/// Get the grant row for a (user, permission type) pair, creating an
/// available one if absent. An existing row is returned as-is, soft-deleted
/// or not; reactivation is the caller's call.
pub async fn get_or_create(
    conn: &mut SqliteConnection,
    user_id: i64,
    permission_type_id: i64,
) -> Result<PermissionGrant> {
    for _ in 0..MAX_CONFLICT_RETRIES {
        if let Some(grant) = get(&mut *conn, user_id, permission_type_id).await? {
            return Ok(grant);
        }
        match insert(&mut *conn, user_id, permission_type_id).await {
            Ok(grant) => return Ok(grant),
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::StorageConflict("permission_grants"))
}

/// Flip a grant's availability.
pub async fn set_available(
    conn: &mut SqliteConnection,
    grant_id: i64,
    available: bool,
) -> Result<()> {
    sqlx::query("UPDATE permission_grants SET available = ? WHERE id = ?")
        .bind(available)
        .bind(grant_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
