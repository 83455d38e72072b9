//! Savings goals.

use crate::app::scope::{
    date_opt, delete_owned, map_create_err, map_owned_err, non_negative, now, required,
    required_opt,
};
use crate::domain::{Money, OwnerId};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const COLUMNS: &str = "id, owner_id, name, target_amount, saved_amount, deadline, created_at";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCreateReq {
    pub name: String,
    pub target_amount: Option<Money>,
    pub saved_amount: Option<Money>,
    pub deadline: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalUpdateReq {
    pub id: i64,
    pub name: Option<String>,
    pub target_amount: Option<Money>,
    pub saved_amount: Option<Money>,
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalDto {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub target_amount: Money,
    pub saved_amount: Money,
    pub deadline: Option<String>,
    pub created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<GoalDto> {
    Ok(GoalDto {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        target_amount: row.get(3)?,
        saved_amount: row.get(4)?,
        deadline: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn goal_list(pool: &DbPool, owner: OwnerId) -> Result<Vec<GoalDto>, AppError> {
    let conn = get_connection(pool)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM goals WHERE owner_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([owner], map_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn goal_create(pool: &DbPool, owner: OwnerId, req: GoalCreateReq) -> Result<GoalDto, AppError> {
    let name = required("name", &req.name)?;
    let target = non_negative("target_amount", req.target_amount)?.unwrap_or_default();
    let saved = non_negative("saved_amount", req.saved_amount)?.unwrap_or_default();
    let deadline = date_opt("deadline", req.deadline.as_deref())?;

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "INSERT INTO goals (owner_id, name, target_amount, saved_amount, deadline, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {COLUMNS}"
        ),
        params![owner, name, target, saved, deadline, now()],
        map_row,
    )
    .map_err(|e| map_create_err(e, owner))
}

pub fn goal_update(pool: &DbPool, owner: OwnerId, req: GoalUpdateReq) -> Result<GoalDto, AppError> {
    let name = required_opt("name", req.name.as_deref())?;
    let target = non_negative("target_amount", req.target_amount)?;
    let saved = non_negative("saved_amount", req.saved_amount)?;
    let deadline = date_opt("deadline", req.deadline.as_deref())?;

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "UPDATE goals SET \
               name = COALESCE(?1, name), \
               target_amount = COALESCE(?2, target_amount), \
               saved_amount = COALESCE(?3, saved_amount), \
               deadline = COALESCE(?4, deadline) \
             WHERE id = ?5 AND owner_id = ?6 RETURNING {COLUMNS}"
        ),
        params![name, target, saved, deadline, req.id, owner],
        map_row,
    )
    .map_err(|e| map_owned_err(e, "goal", req.id))
}

pub fn goal_delete(pool: &DbPool, owner: OwnerId, id: i64) -> Result<(), AppError> {
    delete_owned(pool, "goals", "goal", owner, id)
}
