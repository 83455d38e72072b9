//! Owner identity as seen by the record store.

use crate::error::AppError;
use clap::ValueEnum;
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authenticated owner identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OwnerId(i64);

impl OwnerId {
    /// Boundary check for the identifier handed over by the session layer.
    pub fn require(raw: Option<i64>) -> Result<Self, AppError> {
        match raw {
            Some(id) if id > 0 => Ok(OwnerId(id)),
            Some(id) => Err(AppError::Unauthorized(format!("invalid owner id {id}"))),
            None => Err(AppError::Unauthorized("owner id is required".into())),
        }
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for OwnerId {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        OwnerId::require(Some(value))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for OwnerId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

/// How `owner_login` matches a credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LoginMode {
    /// PIN alone identifies the owner (it is unique).
    PinOnly,
    /// Display name and PIN must both match.
    #[default]
    NameAndPin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_accepts_positive_ids() {
        assert_eq!(OwnerId::require(Some(7)).unwrap().get(), 7);
    }

    #[test]
    fn require_rejects_missing_and_non_positive() {
        for raw in [None, Some(0), Some(-3)] {
            let err = OwnerId::require(raw).unwrap_err();
            assert_eq!(err.code(), "UNAUTHORIZED");
        }
    }

    #[test]
    fn login_mode_defaults_to_name_and_pin() {
        assert_eq!(LoginMode::default(), LoginMode::NameAndPin);
        let parsed: LoginMode = serde_json::from_str("\"pin-only\"").unwrap();
        assert_eq!(parsed, LoginMode::PinOnly);
    }
}
