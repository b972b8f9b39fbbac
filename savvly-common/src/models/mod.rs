use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod budget;
pub mod transaction;
pub mod user;

/// Converts a stored amount in cents into a two-decimal `Decimal`.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Converts an amount into cents. Returns `None` for amounts with more than two fractional
/// digits or that don't fit in an `i64`.
pub fn decimal_to_cents(amount: Decimal) -> Option<i64> {
    let cents = amount.checked_mul(Decimal::ONE_HUNDRED)?;

    if !cents.fract().is_zero() {
        return None;
    }

    cents.to_i64()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloverType {
    #[default]
    Full,
    Partial,
    None,
    Goal,
}

#[derive(Debug)]
pub struct InvalidRolloverType(pub i16);

impl std::error::Error for InvalidRolloverType {}

impl std::fmt::Display for InvalidRolloverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid rollover type: {}", self.0)
    }
}

impl TryFrom<i16> for RolloverType {
    type Error = InvalidRolloverType;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RolloverType::Full),
            1 => Ok(RolloverType::Partial),
            2 => Ok(RolloverType::None),
            3 => Ok(RolloverType::Goal),
            _ => Err(InvalidRolloverType(value)),
        }
    }
}

impl From<RolloverType> for i16 {
    fn from(rollover_type: RolloverType) -> Self {
        match rollover_type {
            RolloverType::Full => 0,
            RolloverType::Partial => 1,
            RolloverType::None => 2,
            RolloverType::Goal => 3,
        }
    }
}
