//! Credit cards with a limit and billing days.

use crate::app::scope::{
    day_of_month, delete_owned, map_create_err, map_owned_err, non_negative, now, required,
    required_opt,
};
use crate::domain::{Money, OwnerId};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const COLUMNS: &str = "id, owner_id, name, credit_limit, closing_day, due_day, created_at";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCreateReq {
    pub name: String,
    pub credit_limit: Option<Money>,
    pub closing_day: Option<i64>,
    pub due_day: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdateReq {
    pub id: i64,
    pub name: Option<String>,
    pub credit_limit: Option<Money>,
    pub closing_day: Option<i64>,
    pub due_day: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardDto {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub credit_limit: Money,
    pub closing_day: Option<i64>,
    pub due_day: Option<i64>,
    pub created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<CardDto> {
    Ok(CardDto {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        credit_limit: row.get(3)?,
        closing_day: row.get(4)?,
        due_day: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn card_list(pool: &DbPool, owner: OwnerId) -> Result<Vec<CardDto>, AppError> {
    let conn = get_connection(pool)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM cards WHERE owner_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([owner], map_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn card_create(pool: &DbPool, owner: OwnerId, req: CardCreateReq) -> Result<CardDto, AppError> {
    let name = required("name", &req.name)?;
    let limit = non_negative("credit_limit", req.credit_limit)?.unwrap_or_default();
    let closing_day = day_of_month("closing_day", req.closing_day)?;
    let due_day = day_of_month("due_day", req.due_day)?;

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "INSERT INTO cards (owner_id, name, credit_limit, closing_day, due_day, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {COLUMNS}"
        ),
        params![owner, name, limit, closing_day, due_day, now()],
        map_row,
    )
    .map_err(|e| map_create_err(e, owner))
}

pub fn card_update(pool: &DbPool, owner: OwnerId, req: CardUpdateReq) -> Result<CardDto, AppError> {
    let name = required_opt("name", req.name.as_deref())?;
    let limit = non_negative("credit_limit", req.credit_limit)?;
    let closing_day = day_of_month("closing_day", req.closing_day)?;
    let due_day = day_of_month("due_day", req.due_day)?;

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "UPDATE cards SET \
               name = COALESCE(?1, name), \
               credit_limit = COALESCE(?2, credit_limit), \
               closing_day = COALESCE(?3, closing_day), \
               due_day = COALESCE(?4, due_day) \
             WHERE id = ?5 AND owner_id = ?6 RETURNING {COLUMNS}"
        ),
        params![name, limit, closing_day, due_day, req.id, owner],
        map_row,
    )
    .map_err(|e| map_owned_err(e, "card", req.id))
}

pub fn card_delete(pool: &DbPool, owner: OwnerId, id: i64) -> Result<(), AppError> {
    delete_owned(pool, "cards", "card", owner, id)
}
