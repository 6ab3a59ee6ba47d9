use std::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Stock quantity represented as **integer tenths of a unit**.
///
/// Bulk ledgers (granel product, raw-material rolls) are measured with one
/// decimal place of precision — e.g. kilograms split from tons — so the engine
/// stores quantities as tenths, the same way money is stored as cents.
///
/// ```rust
/// use engine::Quantity;
///
/// let qty = Quantity::from_units(500);
/// assert_eq!(qty.tenths(), 5000);
/// assert_eq!(qty.to_string(), "500");
/// assert_eq!("12.5".parse::<Quantity>().unwrap().tenths(), 125);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a quantity from integer tenths.
    #[must_use]
    pub const fn from_tenths(tenths: i64) -> Self {
        Self(tenths)
    }

    /// Creates a quantity from whole units.
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units * 10)
    }

    /// Returns the raw value in tenths of a unit.
    #[must_use]
    pub const fn tenths(self) -> i64 {
        self.0
    }

    /// Returns `true` if the quantity is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the quantity is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_sub(rhs.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 10;
        let frac = abs % 10;
        if frac == 0 {
            write!(f, "{sign}{units}")
        } else {
            write!(f, "{sign}{units}.{frac}")
        }
    }
}

impl From<i64> for Quantity {
    fn from(tenths: i64) -> Self {
        Self(tenths)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, rhs: Quantity) {
        self.0 -= rhs.0;
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    /// Parses a decimal string into tenths of a unit.
    ///
    /// Accepts `.` or `,` as decimal separator; rejects more than one
    /// fractional digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidQuantity("empty quantity".to_string());
        let invalid = || EngineError::InvalidQuantity("invalid quantity".to_string());
        let overflow = || EngineError::InvalidQuantity("quantity too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let frac_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| invalid())?;

        let tenths: i64 = match frac_str {
            None | Some("") => 0,
            Some(frac) => {
                if frac.len() > 1 || !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(EngineError::InvalidQuantity(
                        "at most one decimal allowed".to_string(),
                    ));
                }
                frac.parse::<i64>().map_err(|_| invalid())?
            }
        };

        let total = units
            .checked_mul(10)
            .and_then(|v| v.checked_add(tenths))
            .ok_or_else(overflow)?;

        let signed = if sign < 0 {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Quantity(signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_drops_trailing_zero() {
        assert_eq!(Quantity::from_units(500).to_string(), "500");
        assert_eq!(Quantity::from_tenths(125).to_string(), "12.5");
        assert_eq!(Quantity::from_tenths(-5).to_string(), "-0.5");
        assert_eq!(Quantity::ZERO.to_string(), "0");
    }

    #[test]
    fn parse_accepts_one_decimal() {
        assert_eq!("600".parse::<Quantity>().unwrap().tenths(), 6000);
        assert_eq!("12.5".parse::<Quantity>().unwrap().tenths(), 125);
        assert_eq!("0,5".parse::<Quantity>().unwrap().tenths(), 5);
    }

    #[test]
    fn parse_rejects_two_decimals() {
        assert!("12.55".parse::<Quantity>().is_err());
        assert!("".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
    }
}
