//! Helpers shared by the owner-scoped resource modules.

use crate::domain::{Money, OwnerId};
use crate::error::{is_foreign_key_violation, AppError};
use crate::infra::{get_connection, DbPool};
use chrono::NaiveDate;
use rusqlite::params;

/// A create against an owner that does not exist trips the foreign key.
pub(crate) fn map_create_err(e: rusqlite::Error, owner: OwnerId) -> AppError {
    if is_foreign_key_violation(&e) {
        AppError::Unauthorized(format!("unknown owner {owner}"))
    } else {
        e.into()
    }
}

/// An ownership-gated statement that matched nothing reports `NotFound`,
/// whether the row is missing or belongs to someone else.
pub(crate) fn map_owned_err(e: rusqlite::Error, what: &str, id: i64) -> AppError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => not_found(what, id),
        other => other.into(),
    }
}

pub(crate) fn not_found(what: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{what} {id}"))
}

/// `DELETE ... WHERE id = ? AND owner_id = ?`, one statement.
pub(crate) fn delete_owned(
    pool: &DbPool,
    table: &'static str,
    what: &str,
    owner: OwnerId,
    id: i64,
) -> Result<(), AppError> {
    let conn = get_connection(pool)?;
    let rows = conn.execute(
        &format!("DELETE FROM {table} WHERE id = ?1 AND owner_id = ?2"),
        params![id, owner],
    )?;
    if rows == 0 {
        return Err(not_found(what, id));
    }
    Ok(())
}

pub(crate) fn required(field: &str, value: &str) -> Result<String, AppError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

/// `None` keeps the stored value; an explicit blank is rejected.
pub(crate) fn required_opt(field: &str, value: Option<&str>) -> Result<Option<String>, AppError> {
    value.map(|v| required(field, v)).transpose()
}

pub(crate) fn date(field: &str, value: &str) -> Result<String, AppError> {
    let v = value.trim();
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::Validation(format!("{field} must be YYYY-MM-DD, got {v:?}")))
}

pub(crate) fn date_opt(field: &str, value: Option<&str>) -> Result<Option<String>, AppError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|v| date(field, v))
        .transpose()
}

pub(crate) fn non_negative(field: &str, value: Option<Money>) -> Result<Option<Money>, AppError> {
    match value {
        Some(m) if m.is_negative() => Err(AppError::Validation(format!(
            "{field} must not be negative"
        ))),
        other => Ok(other),
    }
}

pub(crate) fn day_of_month(field: &str, value: Option<i64>) -> Result<Option<i64>, AppError> {
    match value {
        Some(d) if !(1..=31).contains(&d) => Err(AppError::Validation(format!(
            "{field} must be between 1 and 31"
        ))),
        other => Ok(other),
    }
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
