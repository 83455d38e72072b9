//! Owners: registration, login, PIN reset, deletion.
//!
//! PIN uniqueness is enforced by the `users_pin_key` unique index; nothing
//! here checks for an existing PIN before writing.

use crate::app::scope::{now, required};
use crate::domain::{LoginMode, OwnerId};
use crate::error::{is_unique_violation, AppError};
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const PIN_LEN: std::ops::RangeInclusive<usize> = 4..=8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRegisterReq {
    pub name: String,
    pub pin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerLoginReq {
    pub name: Option<String>,
    pub pin: String,
}

/// Never carries the PIN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerDto {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<OwnerDto> {
    Ok(OwnerDto {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn validate_pin(pin: &str) -> Result<String, AppError> {
    let pin = pin.trim();
    if !PIN_LEN.contains(&pin.len()) || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(format!(
            "pin must be {} to {} digits",
            PIN_LEN.start(),
            PIN_LEN.end()
        )));
    }
    Ok(pin.to_string())
}

fn pin_conflict(e: rusqlite::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("pin is already in use".into())
    } else {
        e.into()
    }
}

pub fn owner_register(pool: &DbPool, req: OwnerRegisterReq) -> Result<OwnerDto, AppError> {
    let name = required("name", &req.name)?;
    let pin = validate_pin(&req.pin)?;

    let conn = get_connection(pool)?;
    let dto = conn
        .query_row(
            "INSERT INTO users (name, pin, created_at) VALUES (?1, ?2, ?3) RETURNING id, name, created_at",
            params![name, pin, now()],
            map_row,
        )
        .map_err(pin_conflict)?;
    log::info!("Owner {} registered", dto.id);
    Ok(dto)
}

/// Exact-match login. More than one match means duplicate PINs survived a
/// migration; that is reported instead of picking one.
pub fn owner_login(
    pool: &DbPool,
    mode: LoginMode,
    req: OwnerLoginReq,
) -> Result<OwnerDto, AppError> {
    let pin = req.pin.trim().to_string();
    let name = match mode {
        LoginMode::PinOnly => None,
        LoginMode::NameAndPin => Some(
            req.name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| AppError::Validation("name is required".into()))?
                .to_string(),
        ),
    };

    let conn = get_connection(pool)?;
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at FROM users WHERE pin = ?1 AND (?2 IS NULL OR name = ?2) LIMIT 2",
    )?;
    let mut matches = stmt
        .query_map(params![pin, name], map_row)?
        .collect::<Result<Vec<_>, _>>()?;

    if matches.len() > 1 {
        log::warn!("Login matched several owners; duplicate PINs need reconciliation");
        return Err(AppError::Conflict("credential matches more than one owner".into()));
    }
    matches
        .pop()
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".into()))
}

pub fn owner_get(pool: &DbPool, owner: OwnerId) -> Result<OwnerDto, AppError> {
    let conn = get_connection(pool)?;
    conn.query_row(
        "SELECT id, name, created_at FROM users WHERE id = ?1",
        [owner],
        map_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::Unauthorized(format!("unknown owner {owner}"))
        }
        other => other.into(),
    })
}

pub fn owner_reset_pin(pool: &DbPool, owner: OwnerId, new_pin: &str) -> Result<OwnerDto, AppError> {
    let pin = validate_pin(new_pin)?;
    let conn = get_connection(pool)?;
    conn.query_row(
        "UPDATE users SET pin = ?1 WHERE id = ?2 RETURNING id, name, created_at",
        params![pin, owner],
        map_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => {
            AppError::Unauthorized(format!("unknown owner {owner}"))
        }
        other => pin_conflict(other),
    })
}

/// Admin removal. Every owned row goes with it (`ON DELETE CASCADE`).
pub fn owner_delete(pool: &DbPool, owner: OwnerId) -> Result<(), AppError> {
    let conn = get_connection(pool)?;
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", [owner])?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("owner {owner}")));
    }
    log::info!("Owner {} deleted", owner);
    Ok(())
}
