//! Infrastructure: SQLite connections, canonical schema, migration engine.

pub mod db;
pub mod migrate;
pub mod schema;

pub(crate) use db::get_connection;
pub use db::{init_db, DbPool};
pub use migrate::{run_migrations, MigrationReport, StepLog, StepStatus};
pub use schema::Schema;
