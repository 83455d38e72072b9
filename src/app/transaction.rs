//! Transactions: income and expense entries.

use crate::app::scope::{
    date, delete_owned, map_create_err, map_owned_err, non_negative, now, required,
    required_opt,
};
use crate::domain::{Money, OwnerId, TransactionKind};
use crate::error::AppError;
use crate::infra::{get_connection, DbPool};
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIST_LIMIT: i64 = 1000;

const COLUMNS: &str =
    "id, owner_id, description, amount, kind, category, subcategory, date, created_at";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCreateReq {
    pub description: String,
    pub amount: Option<Money>,
    pub kind: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdateReq {
    pub id: i64,
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub kind: Option<String>,
    pub category: Option<String>,
    /// `None` keeps the stored value; a blank string clears it.
    pub subcategory: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListReq {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDto {
    pub id: i64,
    pub owner_id: i64,
    pub description: String,
    pub amount: Money,
    pub kind: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub date: String,
    pub created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<TransactionDto> {
    Ok(TransactionDto {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        kind: row.get(4)?,
        category: row.get(5)?,
        subcategory: row.get(6)?,
        date: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn parse_kind(s: &str) -> Result<TransactionKind, AppError> {
    TransactionKind::from_str(s.trim())
        .ok_or_else(|| AppError::Validation(format!("kind must be expense or income, got {s:?}")))
}

/// Newest first: by date, then by id.
pub fn transaction_list(
    pool: &DbPool,
    owner: OwnerId,
    req: TransactionListReq,
) -> Result<Vec<TransactionDto>, AppError> {
    let limit = req.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, DEFAULT_LIST_LIMIT);
    let offset = req.offset.unwrap_or(0).max(0);

    let conn = get_connection(pool)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM transactions WHERE owner_id = ?1 ORDER BY date DESC, id DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![owner, limit, offset], map_row)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn transaction_create(
    pool: &DbPool,
    owner: OwnerId,
    req: TransactionCreateReq,
) -> Result<TransactionDto, AppError> {
    let description = required("description", &req.description)?;
    let category = required("category", &req.category)?;
    let kind = parse_kind(&req.kind)?;
    let date = date("date", &req.date)?;
    let amount = non_negative("amount", req.amount)?.unwrap_or_default();
    let subcategory = req
        .subcategory
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "INSERT INTO transactions (owner_id, description, amount, kind, category, subcategory, date, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING {COLUMNS}"
        ),
        params![owner, description, amount, kind.as_str(), category, subcategory, date, now()],
        map_row,
    )
    .map_err(|e| map_create_err(e, owner))
}

/// Only fields present in the request change. Another owner's row is `NotFound`.
pub fn transaction_update(
    pool: &DbPool,
    owner: OwnerId,
    req: TransactionUpdateReq,
) -> Result<TransactionDto, AppError> {
    let description = required_opt("description", req.description.as_deref())?;
    let category = required_opt("category", req.category.as_deref())?;
    let kind = req.kind.as_deref().map(parse_kind).transpose()?;
    let date = req.date.as_deref().map(|d| date("date", d)).transpose()?;
    let amount = non_negative("amount", req.amount)?;
    let subcategory = req.subcategory.as_deref().map(str::trim);

    let conn = get_connection(pool)?;
    conn.query_row(
        &format!(
            "UPDATE transactions SET \
               description = COALESCE(?1, description), \
               amount = COALESCE(?2, amount), \
               kind = COALESCE(?3, kind), \
               category = COALESCE(?4, category), \
               subcategory = CASE WHEN ?5 IS NULL THEN subcategory WHEN ?5 = '' THEN NULL ELSE ?5 END, \
               date = COALESCE(?6, date) \
             WHERE id = ?7 AND owner_id = ?8 RETURNING {COLUMNS}"
        ),
        params![
            description,
            amount,
            kind.map(|k| k.as_str()),
            category,
            subcategory,
            date,
            req.id,
            owner
        ],
        map_row,
    )
    .map_err(|e| map_owned_err(e, "transaction", req.id))
}

pub fn transaction_delete(pool: &DbPool, owner: OwnerId, id: i64) -> Result<(), AppError> {
    delete_owned(pool, "transactions", "transaction", owner, id)
}
