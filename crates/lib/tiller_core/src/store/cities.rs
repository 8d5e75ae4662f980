//! City queries.
//!
//! City names are stored normalized (trimmed, lower-cased, first letter
//! capitalized), so "moscow", "MOSCOW" and " Moscow " all resolve to the
//! same row.

use sqlx::SqliteConnection;

use super::{MAX_CONFLICT_RETRIES, is_unique_violation};
use crate::error::{Error, Result};
use crate::models::City;

/// Normalize a raw place name: trim, lower-case, capitalize the first
/// letter.
pub fn normalize_name(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => lower,
    }
}

/// Fetch a city by its normalized name.
pub async fn get(conn: &mut SqliteConnection, name: &str) -> Result<Option<City>> {
    let city = sqlx::query_as::<_, City>("SELECT id, name FROM cities WHERE name = ? LIMIT 1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(city)
}

async fn insert(conn: &mut SqliteConnection, name: &str) -> sqlx::Result<City> {
    sqlx::query_as::<_, City>("INSERT INTO cities (name) VALUES (?) RETURNING id, name")
        .bind(name)
        .fetch_one(&mut *conn)
        .await
}

/// Get the city for `raw_name`, creating it if absent. Concurrent creates
/// are resolved by the unique name constraint plus a bounded retry.
pub async fn get_or_create(conn: &mut SqliteConnection, raw_name: &str) -> Result<City> {
    let name = normalize_name(raw_name);
    for _ in 0..MAX_CONFLICT_RETRIES {
        if let Some(city) = get(&mut *conn, &name).await? {
            return Ok(city);
        }
        match insert(&mut *conn, &name).await {
            Ok(city) => return Ok(city),
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::StorageConflict("cities"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_is_case_insensitive() {
        assert_eq!(normalize_name("moscow"), "Moscow");
        assert_eq!(normalize_name("MOSCOW"), "Moscow");
        assert_eq!(normalize_name("  moscow  "), "Moscow");
        assert_eq!(normalize_name("new york"), "New york");
    }

    #[test]
    fn normalization_handles_degenerate_input() {
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("   "), "");
        assert_eq!(normalize_name("x"), "X");
    }
}
