//! Canonical multi-tenant schema definition.
//!
//! The migration engine only ever adds what is listed here; nothing in this
//! module describes a drop.

use crate::error::AppError;

/// Table holding owners; every resource table references it.
pub const OWNER_TABLE: &str = "users";
/// Column stamped on every resource row.
pub const OWNER_COLUMN: &str = "owner_id";
/// Engine bookkeeping: money columns whose values are known to be cents.
pub const MONEY_LEDGER_TABLE: &str = "money_columns";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    /// Declaration used when the table is created from scratch.
    pub decl: &'static str,
    /// Declaration used by `ALTER TABLE ... ADD COLUMN` on an existing table.
    pub add_decl: &'static str,
    /// Holds an amount of money in cents.
    pub money: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, decl: &'static str) -> Self {
        ColumnDef {
            name,
            decl,
            add_decl: decl,
            money: false,
        }
    }

    /// SQLite cannot add NOT NULL columns without a constant default, nor
    /// columns with expression defaults.
    pub const fn added_as(self, add_decl: &'static str) -> Self {
        ColumnDef {
            name: self.name,
            decl: self.decl,
            add_decl,
            money: self.money,
        }
    }

    pub const fn money(self) -> Self {
        ColumnDef {
            name: self.name,
            decl: self.decl,
            add_decl: self.add_decl,
            money: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    /// Rows belong to an owner through `owner_id`.
    pub owned: bool,
}

impl TableDef {
    pub fn create_sql(&self) -> Result<String, AppError> {
        let mut cols = Vec::with_capacity(self.columns.len());
        for c in self.columns {
            cols.push(format!("{} {}", quote_ident(c.name)?, c.decl));
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(self.name)?,
            cols.join(", ")
        ))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn money_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.money)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: &str, table: &str, columns: &[&str]) -> Self {
        IndexDef {
            name: name.to_string(),
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Rejects anything that would make the engine guess.
    pub fn validate(&self) -> Result<(), AppError> {
        check_ident(&self.name)
            .map_err(|_| AppError::Validation(format!("index name {:?} is invalid", self.name)))?;
        check_ident(&self.table).map_err(|_| {
            AppError::Validation(format!("index {} has invalid table {:?}", self.name, self.table))
        })?;
        if self.columns.is_empty() {
            return Err(AppError::Validation(format!(
                "index {} lists no columns",
                self.name
            )));
        }
        for (i, c) in self.columns.iter().enumerate() {
            check_ident(c).map_err(|_| {
                AppError::Validation(format!("index {} has invalid column {:?}", self.name, c))
            })?;
            if self.columns[..i].contains(c) {
                return Err(AppError::Validation(format!(
                    "index {} lists column {} twice",
                    self.name, c
                )));
            }
        }
        Ok(())
    }

    pub fn create_sql(&self) -> Result<String, AppError> {
        self.validate()?;
        let cols = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            quote_ident(&self.name)?,
            quote_ident(&self.table)?,
            cols.join(", ")
        ))
    }
}

/// Swap one named uniqueness constraint for another on the same table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueReplacement {
    pub old_name: Option<String>,
    pub new: IndexDef,
}

impl UniqueReplacement {
    pub fn new(old_name: Option<&str>, new: IndexDef) -> Self {
        UniqueReplacement {
            old_name: old_name.map(str::to_string),
            new,
        }
    }

    pub fn table(&self) -> &str {
        &self.new.table
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    /// Creation order matters: `users` comes first.
    pub tables: Vec<TableDef>,
    pub indexes: Vec<IndexDef>,
    pub unique_constraints: Vec<UniqueReplacement>,
}

const CREATED_AT: ColumnDef = ColumnDef::new("created_at", "TEXT NOT NULL DEFAULT ''");
const OWNER_ID: ColumnDef = ColumnDef::new(
    "owner_id",
    "INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE",
)
.added_as("INTEGER REFERENCES users(id) ON DELETE CASCADE");
const ID: ColumnDef = ColumnDef::new("id", "INTEGER PRIMARY KEY AUTOINCREMENT");

const fn money(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, "INTEGER NOT NULL DEFAULT 0").money()
}

const fn text(name: &'static str) -> ColumnDef {
    ColumnDef::new(name, "TEXT NOT NULL DEFAULT ''")
}

const USERS: &[ColumnDef] = &[ID, text("name"), text("pin"), CREATED_AT];

/// One row per `table.column` already holding cents.
const MONEY_LEDGER: &[ColumnDef] = &[
    ColumnDef::new("column_ref", "TEXT PRIMARY KEY"),
    ColumnDef::new("converted_rows", "INTEGER NOT NULL DEFAULT 0"),
    CREATED_AT,
];

const TRANSACTIONS: &[ColumnDef] = &[
    ID,
    OWNER_ID,
    text("description"),
    money("amount"),
    ColumnDef::new("kind", "TEXT NOT NULL DEFAULT 'expense'"),
    text("category"),
    ColumnDef::new("subcategory", "TEXT"),
    text("date"),
    CREATED_AT,
];

const GOALS: &[ColumnDef] = &[
    ID,
    OWNER_ID,
    text("name"),
    money("target_amount"),
    money("saved_amount"),
    ColumnDef::new("deadline", "TEXT"),
    CREATED_AT,
];

const CARDS: &[ColumnDef] = &[
    ID,
    OWNER_ID,
    text("name"),
    money("credit_limit"),
    ColumnDef::new("closing_day", "INTEGER"),
    ColumnDef::new("due_day", "INTEGER"),
    CREATED_AT,
];

const INVESTMENTS: &[ColumnDef] = &[
    ID,
    OWNER_ID,
    text("name"),
    text("kind"),
    money("invested_amount"),
    money("current_value"),
    CREATED_AT,
];

const BUDGETS: &[ColumnDef] = &[ID, OWNER_ID, text("category"), money("limit_amount"), CREATED_AT];

impl Schema {
    pub fn canonical() -> Self {
        let owned = |name, columns| TableDef {
            name,
            columns,
            owned: true,
        };
        Schema {
            tables: vec![
                TableDef {
                    name: OWNER_TABLE,
                    columns: USERS,
                    owned: false,
                },
                TableDef {
                    name: MONEY_LEDGER_TABLE,
                    columns: MONEY_LEDGER,
                    owned: false,
                },
                owned("transactions", TRANSACTIONS),
                owned("goals", GOALS),
                owned("cards", CARDS),
                owned("investments", INVESTMENTS),
                owned("budgets", BUDGETS),
            ],
            indexes: vec![
                IndexDef::new("idx_transactions_owner_date", "transactions", &["owner_id", "date"]),
                IndexDef::new("idx_goals_owner", "goals", &["owner_id"]),
                IndexDef::new("idx_cards_owner", "cards", &["owner_id"]),
                IndexDef::new("idx_investments_owner", "investments", &["owner_id"]),
            ],
            unique_constraints: vec![
                UniqueReplacement::new(
                    None,
                    IndexDef::new("users_pin_key", OWNER_TABLE, &["pin"]).unique(),
                ),
                UniqueReplacement::new(
                    Some("budgets_category_key"),
                    IndexDef::new("budgets_owner_category_key", "budgets", &["owner_id", "category"])
                        .unique(),
                ),
            ],
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn owned_tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter().filter(|t| t.owned)
    }

    /// `(table, column)` for every money column, in table order.
    pub fn money_columns(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.tables
            .iter()
            .flat_map(|t| t.money_columns().map(move |c| (t.name, c.name)))
    }
}

fn check_ident(name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid identifier {name:?}")))
    }
}

/// Validate and double-quote an identifier for interpolation into DDL.
pub(crate) fn quote_ident(name: &str) -> Result<String, AppError> {
    check_ident(name)?;
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_lists_users_first_and_five_owned_tables() {
        let schema = Schema::canonical();
        assert_eq!(schema.tables[0].name, OWNER_TABLE);
        let owned: Vec<_> = schema.owned_tables().map(|t| t.name).collect();
        assert_eq!(
            owned,
            vec!["transactions", "goals", "cards", "investments", "budgets"]
        );
        for t in schema.owned_tables() {
            assert!(t.column(OWNER_COLUMN).is_some(), "{} lacks owner_id", t.name);
        }
    }

    #[test]
    fn money_columns_are_flagged() {
        let schema = Schema::canonical();
        let cols: Vec<_> = schema.money_columns().collect();
        assert!(cols.contains(&("transactions", "amount")));
        assert!(cols.contains(&("budgets", "limit_amount")));
        assert_eq!(cols.len(), 7);
        assert!(schema.table("money_columns").unwrap().money_columns().next().is_none());
    }

    #[test]
    fn owner_column_is_added_nullable() {
        assert!(OWNER_ID.decl.contains("NOT NULL"));
        assert!(!OWNER_ID.add_decl.contains("NOT NULL"));
    }

    #[test]
    fn index_validation_is_strict() {
        assert!(IndexDef::new("ok_idx", "t", &["a"]).validate().is_ok());
        assert!(IndexDef::new("", "t", &["a"]).validate().is_err());
        assert!(IndexDef::new("idx", "", &["a"]).validate().is_err());
        assert!(IndexDef::new("idx", "t", &[]).validate().is_err());
        assert!(IndexDef::new("idx", "t", &["a", "a"]).validate().is_err());
        assert!(IndexDef::new("idx", "t", &["a; DROP TABLE t"]).validate().is_err());
    }

    #[test]
    fn index_sql_quotes_identifiers() {
        let sql = IndexDef::new("u_key", "users", &["pin"]).unique().create_sql().unwrap();
        assert_eq!(sql, "CREATE UNIQUE INDEX IF NOT EXISTS \"u_key\" ON \"users\" (\"pin\")");
    }
}
