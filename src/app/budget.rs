//! Budgets: one spending limit per category per owner.

use crate::app::scope::{
    delete_owned, map_create_err, map_owned_err, non_negative, now, required, required_opt,
};
use crate::domain::{Money, OwnerId};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

const COLUMNS: &str = "id, owner_id, category, limit_amount, created_at";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCreateReq {
    pub category: String,
    pub limit_amount: Option<Money>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUpdateReq {
    pub id: i64,
    pub category: Option<String>,
    pub limit_amount: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetDto {
    pub id: i64,
    pub owner_id: i64,
    pub category: String,
    pub limit_amount: Money,
    pub created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<BudgetDto> {
    Ok(BudgetDto {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        category: row.get(2)?,
        limit_amount: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn budget_list(pool: &DbPool, owner: OwnerId) -> Result<Vec<BudgetDto>, AppError> {
    let conn = get_connection(pool)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM budgets WHERE owner_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map([owner], map_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Plain insert. A second budget for the same category is a `Conflict`;
/// use `budget_upsert` to overwrite.
pub fn budget_create(
    pool: &DbPool,
    owner: OwnerId,
    req: BudgetCreateReq,
) -> Result<BudgetDto, AppError> {
    let category = required("category", &req.category)?;
    let limit = non_negative("limit_amount", req.limit_amount)?.unwrap_or_default();

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "INSERT INTO budgets (owner_id, category, limit_amount, created_at) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {COLUMNS}"
        ),
        params![owner, category, limit, now()],
        map_row,
    )
    .map_err(|e| match map_create_err(e, owner) {
        AppError::Conflict(_) => {
            AppError::Conflict(format!("budget for category {category:?} already exists"))
        }
        other => other,
    })
}

/// Set the limit for `(owner, category)`, inserting the budget if it is new.
///
/// One `INSERT ... ON CONFLICT DO UPDATE` statement, so concurrent callers for
/// the same pair always end with a single row; an existing row keeps its id.
pub fn budget_upsert(
    pool: &DbPool,
    owner: OwnerId,
    category: &str,
    limit: Money,
) -> Result<BudgetDto, AppError> {
    let category = required("category", category)?;
    let limit = non_negative("limit_amount", Some(limit))?.unwrap_or_default();

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "INSERT INTO budgets (owner_id, category, limit_amount, created_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (owner_id, category) DO UPDATE SET limit_amount = excluded.limit_amount \
             RETURNING {COLUMNS}"
        ),
        params![owner, category, limit, now()],
        map_row,
    )
    .map_err(|e| map_create_err(e, owner))
}

pub fn budget_update(
    pool: &DbPool,
    owner: OwnerId,
    req: BudgetUpdateReq,
) -> Result<BudgetDto, AppError> {
    let category = required_opt("category", req.category.as_deref())?;
    let limit = non_negative("limit_amount", req.limit_amount)?;

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "UPDATE budgets SET \
               category = COALESCE(?1, category), \
               limit_amount = COALESCE(?2, limit_amount) \
             WHERE id = ?3 AND owner_id = ?4 RETURNING {COLUMNS}"
        ),
        params![category, limit, req.id, owner],
        map_row,
    )
    .map_err(|e| map_owned_err(e, "budget", req.id))
}

pub fn budget_delete(pool: &DbPool, owner: OwnerId, id: i64) -> Result<(), AppError> {
    delete_owned(pool, "budgets", "budget", owner, id)
}
