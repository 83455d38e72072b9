//! Investment positions: what went in and what it is worth now.

use crate::app::scope::{
    delete_owned, map_create_err, map_owned_err, non_negative, now, required, required_opt,
};
use crate::domain::{Money, OwnerId};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const COLUMNS: &str = "id, owner_id, name, kind, invested_amount, current_value, created_at";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentCreateReq {
    pub name: String,
    pub kind: Option<String>,
    pub invested_amount: Option<Money>,
    pub current_value: Option<Money>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentUpdateReq {
    pub id: i64,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub invested_amount: Option<Money>,
    pub current_value: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentDto {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub kind: String,
    pub invested_amount: Money,
    pub current_value: Money,
    pub created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<InvestmentDto> {
    Ok(InvestmentDto {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        invested_amount: row.get(4)?,
        current_value: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn investment_list(pool: &DbPool, owner: OwnerId) -> Result<Vec<InvestmentDto>, AppError> {
    let conn = get_connection(pool)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM investments WHERE owner_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([owner], map_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn investment_create(
    pool: &DbPool,
    owner: OwnerId,
    req: InvestmentCreateReq,
) -> Result<InvestmentDto, AppError> {
    let name = required("name", &req.name)?;
    let kind = req.kind.map(|k| k.trim().to_string()).unwrap_or_default();
    let invested = non_negative("invested_amount", req.invested_amount)?.unwrap_or_default();
    let current = non_negative("current_value", req.current_value)?.unwrap_or_default();

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "INSERT INTO investments (owner_id, name, kind, invested_amount, current_value, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {COLUMNS}"
        ),
        params![owner, name, kind, invested, current, now()],
        map_row,
    )
    .map_err(|e| map_create_err(e, owner))
}

pub fn investment_update(
    pool: &DbPool,
    owner: OwnerId,
    req: InvestmentUpdateReq,
) -> Result<InvestmentDto, AppError> {
    let name = required_opt("name", req.name.as_deref())?;
    let kind = req.kind.map(|k| k.trim().to_string());
    let invested = non_negative("invested_amount", req.invested_amount)?;
    let current = non_negative("current_value", req.current_value)?;

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "UPDATE investments SET \
               name = COALESCE(?1, name), \
               kind = COALESCE(?2, kind), \
               invested_amount = COALESCE(?3, invested_amount), \
               current_value = COALESCE(?4, current_value) \
             WHERE id = ?5 AND owner_id = ?6 RETURNING {COLUMNS}"
        ),
        params![name, kind, invested, current, req.id, owner],
        map_row,
    )
    .map_err(|e| map_owned_err(e, "investment", req.id))
}

pub fn investment_delete(pool: &DbPool, owner: OwnerId, id: i64) -> Result<(), AppError> {
    delete_owned(pool, "investments", "investment", owner, id)
}
