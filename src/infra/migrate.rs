//! Additive, re-runnable schema migration.
//!
//! Every step checks the live schema before touching it, so a run that was
//! interrupted half way can simply be started again from the top. No step
//! drops a table. Rows are rewritten in two places only: filling a NULL
//! `owner_id`, and the one-time conversion of legacy amounts to cents.

use crate::domain::{MigrationStage, StageMachine};
use crate::error::AppError;
use crate::infra::schema::{
    quote_ident, ColumnDef, IndexDef, Schema, TableDef, UniqueReplacement, MONEY_LEDGER_TABLE,
    OWNER_COLUMN, OWNER_TABLE,
};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Applied,
    Unchanged,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepLog {
    pub stage: MigrationStage,
    pub step: String,
    pub status: StepStatus,
    pub detail: String,
}

/// Outcome of one migration run: how far it got and what each step did.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub stage: MigrationStage,
    pub steps: Vec<StepLog>,
}

impl MigrationReport {
    fn new() -> Self {
        MigrationReport {
            stage: MigrationStage::Start,
            steps: Vec::new(),
        }
    }

    fn advance(&mut self, to: MigrationStage) -> Result<(), AppError> {
        if !StageMachine::can_transition(self.stage, to) {
            return Err(AppError::MigrationFatal(format!(
                "illegal stage transition {} -> {}",
                self.stage, to
            )));
        }
        log::info!("Migration stage {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Steps are attributed to the stage currently being worked towards.
    fn record(&mut self, step: impl Into<String>, status: StepStatus, detail: impl Into<String>) {
        let stage = self.stage.next().unwrap_or(self.stage);
        let step = step.into();
        let detail = detail.into();
        match status {
            StepStatus::Applied => log::info!("[{}] {}: {}", stage, step, detail),
            StepStatus::Unchanged => log::debug!("[{}] {}: {}", stage, step, detail),
            StepStatus::Warning => log::warn!("[{}] {}: {}", stage, step, detail),
        }
        self.steps.push(StepLog {
            stage,
            step,
            status,
            detail,
        });
    }

    pub fn is_done(&self) -> bool {
        self.stage == MigrationStage::Done
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StepLog> {
        self.steps.iter().filter(|s| s.status == StepStatus::Warning)
    }

    pub fn applied(&self) -> impl Iterator<Item = &StepLog> {
        self.steps.iter().filter(|s| s.status == StepStatus::Applied)
    }

    pub fn steps_in(&self, stage: MigrationStage) -> impl Iterator<Item = &StepLog> {
        self.steps.iter().filter(move |s| s.stage == stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub created_new: bool,
    pub dropped_old: bool,
    /// Old constraint is inline in the table definition and cannot be dropped.
    pub old_is_inline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    Applied { owner_id: i64, rows: usize },
    Skipped { owners: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyOutcome {
    /// Legacy currency units were rewritten as cents.
    Converted { rows: usize },
    AlreadyCents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullabilityOutcome {
    /// The column was declared NOT NULL when the table was created.
    Declared,
    AlreadyGuarded,
    Tightened,
    LeftNullable { nulls: i64 },
}

// ── introspection ────────────────────────────────────────

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, AppError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |r| r.get(0),
    )?)
}

/// `Some(notnull)` when the column exists.
pub fn column_not_null(
    conn: &Connection,
    table: &str,
    column: &str,
) -> Result<Option<bool>, AppError> {
    Ok(conn
        .query_row(
            "SELECT \"notnull\" FROM pragma_table_info(?1) WHERE name = ?2",
            [table, column],
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .map(|n| n != 0))
}

/// Table the named index belongs to, if the index exists.
pub fn index_table(conn: &Connection, index: &str) -> Result<Option<String>, AppError> {
    Ok(conn
        .query_row(
            "SELECT tbl_name FROM sqlite_master WHERE type = 'index' AND name = ?1",
            [index],
            |r| r.get(0),
        )
        .optional()?)
}

fn index_columns(conn: &Connection, index: &str) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    let rows = stmt.query_map([index], |r| r.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn index_is_unique(conn: &Connection, table: &str, index: &str) -> Result<bool, AppError> {
    Ok(conn
        .query_row(
            "SELECT \"unique\" FROM pragma_index_list(?1) WHERE name = ?2",
            [table, index],
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .map(|u| u != 0)
        .unwrap_or(false))
}

fn trigger_exists(conn: &Connection, name: &str) -> Result<bool, AppError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'trigger' AND name = ?1)",
        [name],
        |r| r.get(0),
    )?)
}

// ── steps ────────────────────────────────────────────────

/// Create the table if absent. An existing table is never touched.
pub fn ensure_table(conn: &Connection, table: &TableDef) -> Result<EnsureOutcome, AppError> {
    if table_exists(conn, table.name)? {
        return Ok(EnsureOutcome::AlreadyPresent);
    }
    conn.execute_batch(&table.create_sql()?)?;
    Ok(EnsureOutcome::Created)
}

/// Add the column if absent, using its additive declaration.
pub fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &ColumnDef,
) -> Result<EnsureOutcome, AppError> {
    if !table_exists(conn, table)? {
        return Err(AppError::MigrationFatal(format!(
            "cannot add {}.{}: table is missing",
            table, column.name
        )));
    }
    if column_not_null(conn, table, column.name)?.is_some() {
        return Ok(EnsureOutcome::AlreadyPresent);
    }
    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_ident(table)?,
        quote_ident(column.name)?,
        column.add_decl
    ))?;
    Ok(EnsureOutcome::Created)
}

/// Create the index if no index of that name exists.
///
/// Fails with `Validation` rather than guessing when the definition is
/// malformed, refers to a missing table or column, or its name is already
/// taken by an index of a different shape.
pub fn ensure_index(conn: &Connection, index: &IndexDef) -> Result<EnsureOutcome, AppError> {
    index.validate()?;
    if !table_exists(conn, &index.table)? {
        return Err(AppError::Validation(format!(
            "index {} targets missing table {}",
            index.name, index.table
        )));
    }
    for c in &index.columns {
        if column_not_null(conn, &index.table, c)?.is_none() {
            return Err(AppError::Validation(format!(
                "index {} targets missing column {}.{}",
                index.name, index.table, c
            )));
        }
    }

    match index_table(conn, &index.name)? {
        None => {
            conn.execute_batch(&index.create_sql()?)?;
            Ok(EnsureOutcome::Created)
        }
        Some(t) if t != index.table => Err(AppError::Validation(format!(
            "index name {} is already used on table {}",
            index.name, t
        ))),
        Some(_) => {
            let existing = index_columns(conn, &index.name)?;
            let unique = index_is_unique(conn, &index.table, &index.name)?;
            if existing != index.columns || unique != index.unique {
                return Err(AppError::Validation(format!(
                    "index {} exists as ({}){} but is defined as ({}){}",
                    index.name,
                    existing.join(", "),
                    if unique { " UNIQUE" } else { "" },
                    index.columns.join(", "),
                    if index.unique { " UNIQUE" } else { "" },
                )));
            }
            Ok(EnsureOutcome::AlreadyPresent)
        }
    }
}

/// Build the new unique index, then drop the old one, in one transaction.
///
/// The table is never left without a uniqueness guard: if the new index
/// cannot be built (existing rows violate it) the whole step rolls back and
/// the old constraint stays in force.
pub fn replace_unique_constraint(
    conn: &mut Connection,
    replacement: &UniqueReplacement,
) -> Result<ReplaceOutcome, AppError> {
    let new = &replacement.new;
    if !new.unique {
        return Err(AppError::Validation(format!(
            "replacement constraint {} is not unique",
            new.name
        )));
    }
    if replacement.old_name.as_deref() == Some(new.name.as_str()) {
        return Err(AppError::Validation(format!(
            "constraint {} cannot replace itself",
            new.name
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let created_new = ensure_index(&tx, new)? == EnsureOutcome::Created;

    let mut dropped_old = false;
    let mut old_is_inline = false;
    if let Some(old) = replacement.old_name.as_deref() {
        match index_table(&tx, old)? {
            None => {}
            Some(t) if t != new.table => {
                return Err(AppError::Validation(format!(
                    "constraint {} belongs to {}, not {}",
                    old, t, new.table
                )));
            }
            Some(_) if old.starts_with("sqlite_autoindex_") => old_is_inline = true,
            Some(_) => {
                tx.execute_batch(&format!("DROP INDEX IF EXISTS {}", quote_ident(old)?))?;
                dropped_old = true;
            }
        }
    }
    tx.commit()?;

    Ok(ReplaceOutcome {
        created_new,
        dropped_old,
        old_is_inline,
    })
}

fn money_ref(table: &str, column: &str) -> String {
    format!("{table}.{column}")
}

fn money_in_cents(conn: &Connection, table: &str, column: &str) -> Result<bool, AppError> {
    Ok(conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE column_ref = ?1)",
            quote_ident(MONEY_LEDGER_TABLE)?
        ),
        [money_ref(table, column)],
        |r| r.get(0),
    )?)
}

fn record_money_in_cents(
    conn: &Connection,
    table: &str,
    column: &str,
    rows: usize,
) -> Result<(), AppError> {
    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (column_ref, converted_rows, created_at) VALUES (?1, ?2, ?3)",
            quote_ident(MONEY_LEDGER_TABLE)?
        ),
        rusqlite::params![money_ref(table, column), rows as i64, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Rewrite a legacy money column from currency units to cents, exactly once.
///
/// Single-tenant databases stored amounts as floats in currency units. The
/// ledger table records converted columns; a column declared REAL keeps
/// handing cents back as whole floats, so the value alone cannot tell the
/// units apart.
pub fn convert_money_to_cents(
    conn: &mut Connection,
    table: &str,
    column: &str,
) -> Result<MoneyOutcome, AppError> {
    let t = quote_ident(table)?;
    let c = quote_ident(column)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !table_exists(&tx, MONEY_LEDGER_TABLE)? {
        return Err(AppError::MigrationFatal(format!(
            "{MONEY_LEDGER_TABLE} is missing, cannot track {table}.{column}"
        )));
    }
    if money_in_cents(&tx, table, column)? {
        return Ok(MoneyOutcome::AlreadyCents);
    }
    if column_not_null(&tx, table, column)?.is_none() {
        return Err(AppError::MigrationFatal(format!(
            "{table}.{column} is missing at money conversion"
        )));
    }

    let rows = tx.execute(
        &format!(
            "UPDATE {t} SET {c} = CAST(ROUND({c} * 100) AS INTEGER) \
             WHERE typeof({c}) IN ('integer', 'real')"
        ),
        [],
    )?;
    record_money_in_cents(&tx, table, column, rows)?;
    tx.commit()?;
    Ok(MoneyOutcome::Converted { rows })
}

/// Assign the sole owner to every unowned row, or do nothing.
///
/// Runs only when exactly one owner exists. With zero or several owners the
/// rows stay unowned for manual reconciliation.
pub fn backfill_owner(conn: &mut Connection, tables: &[&str]) -> Result<BackfillOutcome, AppError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for t in tables {
        if column_not_null(&tx, t, OWNER_COLUMN)?.is_none() {
            return Err(AppError::MigrationFatal(format!(
                "{}.{} is missing at backfill",
                t, OWNER_COLUMN
            )));
        }
    }

    let owner_table = quote_ident(OWNER_TABLE)?;
    let owners: i64 =
        tx.query_row(&format!("SELECT COUNT(*) FROM {owner_table}"), [], |r| r.get(0))?;
    if owners != 1 {
        return Ok(BackfillOutcome::Skipped { owners });
    }
    let owner_id: i64 =
        tx.query_row(&format!("SELECT id FROM {owner_table}"), [], |r| r.get(0))?;

    let col = quote_ident(OWNER_COLUMN)?;
    let mut rows = 0;
    for t in tables {
        rows += tx.execute(
            &format!("UPDATE {} SET {col} = ?1 WHERE {col} IS NULL", quote_ident(t)?),
            [owner_id],
        )?;
    }
    tx.commit()?;
    Ok(BackfillOutcome::Applied { owner_id, rows })
}

fn guard_trigger_names(table: &str, column: &str) -> (String, String) {
    (
        format!("{table}_{column}_not_null_insert"),
        format!("{table}_{column}_not_null_update"),
    )
}

/// Disallow NULLs in the column, but only once none are left.
///
/// SQLite cannot alter an existing column's nullability without rebuilding
/// the table, so the constraint is installed as a pair of guard triggers.
pub fn tighten_not_null(
    conn: &mut Connection,
    table: &str,
    column: &str,
) -> Result<NullabilityOutcome, AppError> {
    let t = quote_ident(table)?;
    let c = quote_ident(column)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    match column_not_null(&tx, table, column)? {
        None => {
            return Err(AppError::MigrationFatal(format!(
                "{}.{} is missing",
                table, column
            )))
        }
        Some(true) => return Ok(NullabilityOutcome::Declared),
        Some(false) => {}
    }

    let (on_insert, on_update) = guard_trigger_names(table, column);
    if trigger_exists(&tx, &on_insert)? && trigger_exists(&tx, &on_update)? {
        return Ok(NullabilityOutcome::AlreadyGuarded);
    }

    let nulls: i64 = tx.query_row(
        &format!("SELECT COUNT(*) FROM {t} WHERE {c} IS NULL"),
        [],
        |r| r.get(0),
    )?;
    if nulls > 0 {
        return Ok(NullabilityOutcome::LeftNullable { nulls });
    }

    let message = format!("NOT NULL constraint failed: {table}.{column}");
    tx.execute_batch(&format!(
        "CREATE TRIGGER IF NOT EXISTS {ins} BEFORE INSERT ON {t} FOR EACH ROW WHEN NEW.{c} IS NULL \
         BEGIN SELECT RAISE(ABORT, '{message}'); END;
         CREATE TRIGGER IF NOT EXISTS {upd} BEFORE UPDATE OF {c} ON {t} FOR EACH ROW WHEN NEW.{c} IS NULL \
         BEGIN SELECT RAISE(ABORT, '{message}'); END;",
        ins = quote_ident(&on_insert)?,
        upd = quote_ident(&on_update)?,
    ))?;
    tx.commit()?;
    Ok(NullabilityOutcome::Tightened)
}

/// Rows per owned table that still have no owner.
pub fn unowned_counts(conn: &Connection, schema: &Schema) -> Result<Vec<(String, i64)>, AppError> {
    let mut out = Vec::new();
    for table in schema.owned_tables() {
        if column_not_null(conn, table.name, OWNER_COLUMN)?.is_none() {
            continue;
        }
        let n: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} IS NULL",
                quote_ident(table.name)?,
                quote_ident(OWNER_COLUMN)?
            ),
            [],
            |r| r.get(0),
        )?;
        out.push((table.name.to_string(), n));
    }
    Ok(out)
}

/// Inline `UNIQUE` constraints left on owned tables, as `(table, index, columns)`.
///
/// These cannot be dropped without rebuilding the table, so they outlive any
/// replacement constraint and keep rejecting rows it would allow.
pub fn inline_unique_constraints(
    conn: &Connection,
    schema: &Schema,
) -> Result<Vec<(String, String, Vec<String>)>, AppError> {
    let mut out = Vec::new();
    for table in schema.owned_tables() {
        if !table_exists(conn, table.name)? {
            continue;
        }
        let mut stmt =
            conn.prepare("SELECT name FROM pragma_index_list(?1) WHERE origin = 'u' ORDER BY name")?;
        let names = stmt
            .query_map([table.name], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for name in names {
            let columns = index_columns(conn, &name)?;
            out.push((table.name.to_string(), name, columns));
        }
    }
    Ok(out)
}

// ── run ──────────────────────────────────────────────────

/// Only structural failures stop a run; storage errors keep their kind.
fn escalate(e: AppError) -> AppError {
    match e {
        AppError::MigrationFatal(_) | AppError::StorageUnavailable(_) => e,
        other => AppError::MigrationFatal(other.to_string()),
    }
}

fn ensure_schema(conn: &Connection, schema: &Schema, report: &mut MigrationReport) -> Result<(), AppError> {
    for table in &schema.tables {
        // A table created here starts out in cents; mark it in the same transaction.
        let tx = conn.unchecked_transaction()?;
        let outcome = ensure_table(&tx, table).map_err(escalate)?;
        if outcome == EnsureOutcome::Created {
            for column in table.money_columns() {
                record_money_in_cents(&tx, table.name, column.name, 0).map_err(escalate)?;
            }
        }
        tx.commit()?;

        match outcome {
            EnsureOutcome::Created => report.record(
                format!("ensure_table {}", table.name),
                StepStatus::Applied,
                "created",
            ),
            EnsureOutcome::AlreadyPresent => {
                report.record(
                    format!("ensure_table {}", table.name),
                    StepStatus::Unchanged,
                    "already present",
                );
                for column in table.columns {
                    if ensure_column(conn, table.name, column).map_err(escalate)?
                        == EnsureOutcome::Created
                    {
                        report.record(
                            format!("ensure_column {}.{}", table.name, column.name),
                            StepStatus::Applied,
                            format!("added as {}", column.add_decl),
                        );
                    }
                }
            }
        }

        for column in table.columns {
            if column_not_null(conn, table.name, column.name)?.is_none() {
                return Err(AppError::MigrationFatal(format!(
                    "{}.{} still missing after ensure_column",
                    table.name, column.name
                )));
            }
        }
    }

    for index in &schema.indexes {
        let status = match ensure_index(conn, index).map_err(escalate)? {
            EnsureOutcome::Created => StepStatus::Applied,
            EnsureOutcome::AlreadyPresent => StepStatus::Unchanged,
        };
        report.record(format!("ensure_index {}", index.name), status, index.columns.join(", "));
    }
    Ok(())
}

fn reconcile_constraints(
    conn: &mut Connection,
    schema: &Schema,
    report: &mut MigrationReport,
) -> Result<(), AppError> {
    for replacement in &schema.unique_constraints {
        let step = format!("unique {}.{}", replacement.table(), replacement.new.name);
        match replace_unique_constraint(conn, replacement) {
            Ok(outcome) => {
                let status = if outcome.old_is_inline {
                    StepStatus::Warning
                } else if outcome.created_new || outcome.dropped_old {
                    StepStatus::Applied
                } else {
                    StepStatus::Unchanged
                };
                let detail = if outcome.old_is_inline {
                    format!(
                        "{old} is inline and stays in force until {table} is rebuilt; \
                         writes that only ({cols}) allows are still rejected as conflicts",
                        old = replacement.old_name.as_deref().unwrap_or_default(),
                        table = replacement.table(),
                        cols = replacement.new.columns.join(", "),
                    )
                } else {
                    format!(
                        "created_new={} dropped_old={}",
                        outcome.created_new, outcome.dropped_old
                    )
                };
                report.record(step, status, detail);
            }
            Err(e @ AppError::MigrationFatal(_)) => return Err(e),
            Err(e) => report.record(step, StepStatus::Warning, e.to_string()),
        }
    }
    Ok(())
}

/// Any failure here stops the run: serving on half-converted amounts would misread them.
fn convert_money(
    conn: &mut Connection,
    schema: &Schema,
    report: &mut MigrationReport,
) -> Result<(), AppError> {
    for (table, column) in schema.money_columns() {
        let step = format!("money_to_cents {table}.{column}");
        match convert_money_to_cents(conn, table, column).map_err(escalate)? {
            MoneyOutcome::Converted { rows } => report.record(
                step,
                StepStatus::Applied,
                format!("{rows} rows rewritten from currency units to cents"),
            ),
            MoneyOutcome::AlreadyCents => report.record(step, StepStatus::Unchanged, "already cents"),
        }
    }
    Ok(())
}

fn backfill(conn: &mut Connection, schema: &Schema, report: &mut MigrationReport) -> Result<(), AppError> {
    let tables: Vec<&str> = schema.owned_tables().map(|t| t.name).collect();
    match backfill_owner(conn, &tables) {
        Ok(BackfillOutcome::Applied { owner_id, rows }) => report.record(
            "backfill_owner",
            if rows > 0 {
                StepStatus::Applied
            } else {
                StepStatus::Unchanged
            },
            format!("{rows} rows assigned to owner {owner_id}"),
        ),
        Ok(BackfillOutcome::Skipped { owners }) => {
            let unowned: i64 = unowned_counts(conn, schema)?.iter().map(|(_, n)| n).sum();
            let status = if unowned > 0 {
                StepStatus::Warning
            } else {
                StepStatus::Unchanged
            };
            report.record(
                "backfill_owner",
                status,
                format!("skipped: {owners} owners, {unowned} unowned rows left for manual reconciliation"),
            );
        }
        Err(e @ AppError::MigrationFatal(_)) => return Err(e),
        Err(e) => report.record("backfill_owner", StepStatus::Warning, e.to_string()),
    }
    Ok(())
}

fn tighten(conn: &mut Connection, schema: &Schema, report: &mut MigrationReport) -> Result<(), AppError> {
    let tables: Vec<&str> = schema.owned_tables().map(|t| t.name).collect();
    for table in tables {
        let step = format!("tighten_not_null {table}.{OWNER_COLUMN}");
        match tighten_not_null(conn, table, OWNER_COLUMN) {
            Ok(NullabilityOutcome::Tightened) => {
                report.record(step, StepStatus::Applied, "guard triggers installed")
            }
            Ok(NullabilityOutcome::Declared) => {
                report.record(step, StepStatus::Unchanged, "declared NOT NULL")
            }
            Ok(NullabilityOutcome::AlreadyGuarded) => {
                report.record(step, StepStatus::Unchanged, "already guarded")
            }
            Ok(NullabilityOutcome::LeftNullable { nulls }) => report.record(
                step,
                StepStatus::Warning,
                format!("{nulls} NULL rows remain, column left nullable"),
            ),
            Err(e @ AppError::MigrationFatal(_)) => return Err(e),
            Err(e) => report.record(step, StepStatus::Warning, e.to_string()),
        }
    }
    Ok(())
}

fn run_stages(conn: &mut Connection, schema: &Schema, report: &mut MigrationReport) -> Result<(), AppError> {
    ensure_schema(conn, schema, report)?;
    report.advance(MigrationStage::SchemaEnsured)?;
    reconcile_constraints(conn, schema, report)?;
    report.advance(MigrationStage::ConstraintsReconciled)?;
    convert_money(conn, schema, report)?;
    backfill(conn, schema, report)?;
    report.advance(MigrationStage::Backfilled)?;
    tighten(conn, schema, report)?;
    report.advance(MigrationStage::NullabilityTightened)?;
    report.advance(MigrationStage::Done)
}

/// Bring the database to `schema`. Safe to call on every start.
///
/// Returns the per-stage report, or `MigrationFatal` when the schema is
/// structurally unusable and serving must not begin.
pub fn run_migrations(conn: &mut Connection, schema: &Schema) -> Result<MigrationReport, AppError> {
    let mut report = MigrationReport::new();
    log::info!("Migration run starting ({} tables)", schema.tables.len());

    let result = run_stages(conn, schema, &mut report);

    match result {
        Ok(()) => {
            let warnings = report.warnings().count();
            log::info!(
                "Migration run finished: {} steps applied, {} warnings",
                report.applied().count(),
                warnings
            );
            Ok(report)
        }
        Err(e) => {
            log::error!("Migration run aborted at stage {}: {}", report.stage, e);
            Err(e)
        }
    }
}
