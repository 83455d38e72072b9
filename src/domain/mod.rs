//! Domain types: money, owner identity, resource kinds, migration stages.

mod migration_stage;
mod money;
mod owner;
mod transaction_kind;

pub use migration_stage::{MigrationStage, StageMachine};
pub use money::Money;
pub use owner::{LoginMode, OwnerId};
pub use transaction_kind::TransactionKind;
