//! Owner-scoped use cases over the five resource kinds, plus owner management.

mod budget;
mod card;
mod goal;
mod investment;
mod owner;
mod scope;
mod transaction;

pub use budget::{
    budget_create, budget_delete, budget_list, budget_update, budget_upsert, BudgetCreateReq,
    BudgetDto, BudgetUpdateReq,
};
pub use card::{card_create, card_delete, card_list, card_update, CardCreateReq, CardDto, CardUpdateReq};
pub use goal::{goal_create, goal_delete, goal_list, goal_update, GoalCreateReq, GoalDto, GoalUpdateReq};
pub use investment::{
    investment_create, investment_delete, investment_list, investment_update,
    InvestmentCreateReq, InvestmentDto, InvestmentUpdateReq,
};
pub use owner::{
    owner_delete, owner_get, owner_login, owner_register, owner_reset_pin, OwnerDto,
    OwnerLoginReq, OwnerRegisterReq,
};
pub use transaction::{
    transaction_create, transaction_delete, transaction_list, transaction_update,
    TransactionCreateReq, TransactionDto, TransactionListReq, TransactionUpdateReq,
    DEFAULT_LIST_LIMIT,
};
