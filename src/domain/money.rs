//! Fixed-point money with exactly two fractional digits.
//!
//! Amounts are carried as `rust_decimal::Decimal` in memory and stored as
//! INTEGER cents in SQLite, so no value ever passes through a float.

use crate::error::AppError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SCALE: u32 = 2;
/// Largest float that still holds every integer below it exactly (2^53).
const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build from a whole number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, SCALE))
    }

    pub fn cents(&self) -> i64 {
        // Scale is pinned to 2 and the mantissa came from an i64, so it fits.
        self.0.mantissa() as i64
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = AppError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let normalized = value.normalize();
        if normalized.scale() > SCALE {
            return Err(AppError::Validation(format!(
                "amount {value} has more than {SCALE} decimal places"
            )));
        }
        let mut fixed = normalized;
        fixed.rescale(SCALE);
        if i64::try_from(fixed.mantissa()).is_err() {
            return Err(AppError::Validation(format!("amount {value} is out of range")));
        }
        Ok(Money(fixed))
    }
}

impl From<Money> for Decimal {
    fn from(m: Money) -> Self {
        m.0
    }
}

impl FromStr for Money {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let d = Decimal::from_str_exact(s.trim())
            .map_err(|_| AppError::Validation(format!("invalid amount: {s:?}")))?;
        Money::try_from(d)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.cents()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(cents) => Ok(Money::from_cents(cents)),
            // Legacy columns declared REAL hand cents back as whole floats.
            ValueRef::Real(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_CENTS => {
                Ok(Money::from_cents(f as i64))
            }
            ValueRef::Real(f) => Err(FromSqlError::Other(
                format!("amount {f} is not a whole number of cents").into(),
            )),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
