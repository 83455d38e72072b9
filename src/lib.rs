pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;

pub use config::AppConfig;
pub use error::AppError;
