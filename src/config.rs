//! Process configuration: database location, lock wait, login policy.

use crate::domain::LoginMode;
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn app_data_dir() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("pocketbook")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("pocketbook.db")
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

#[derive(Debug, Clone, Args, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// SQLite database file.
    #[arg(long, env = "POCKETBOOK_DB_PATH", default_value_os_t = default_db_path())]
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// How long a connection waits on a locked database before giving up.
    #[arg(long, env = "POCKETBOOK_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Whether login needs the display name alongside the PIN.
    #[arg(long, env = "POCKETBOOK_LOGIN_MODE", value_enum, default_value_t = LoginMode::NameAndPin)]
    #[serde(default)]
    pub login_mode: LoginMode,
}

impl AppConfig {
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        AppConfig {
            db_path: db_path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            login_mode: LoginMode::default(),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
