//! Integer minor-unit currency handling.
//!
//! All balances, stakes, and payouts inside the ledger are `i64` cents.
//! Floats only appear at the JSON boundary, where the API speaks decimal
//! dollars; conversion in either direction goes through [`Amount`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a decimal dollar value into cents
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount is not a finite number")]
    NotFinite,

    #[error("amount is out of range")]
    OutOfRange,
}

/// A currency amount in minor units (cents).
///
/// Construction from the JSON boundary validates finiteness and range;
/// arithmetic stays in integers so the ledger can never accumulate float
/// drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

/// Largest dollar magnitude accepted at the API boundary. Above this,
/// f64 can no longer represent every cent exactly.
const MAX_DOLLARS: f64 = 1e12;

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Construct directly from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    /// Parse a decimal dollar value from the JSON boundary, rounding to
    /// the nearest cent.
    pub fn from_dollars(dollars: f64) -> Result<Self, MoneyError> {
        if !dollars.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        if dollars.abs() > MAX_DOLLARS {
            return Err(MoneyError::OutOfRange);
        }
        Ok(Amount((dollars * 100.0).round() as i64))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Decimal dollar representation for JSON responses.
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// A fixed-odds price (payout multiplier) in hundredths.
///
/// 180 means 1.80: a winning one-dollar stake returns $1.80.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Price(u32);

impl Price {
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Price(hundredths)
    }

    /// Decimal multiplier for JSON responses (1.8, 2.0, 3.5).
    pub fn decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Payout for a winning stake, truncated toward zero to the cent.
    /// Frozen at placement time and never recomputed.
    pub fn payout(self, stake: Amount) -> Amount {
        Amount(stake.0 * self.0 as i64 / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dollars_rounds_to_cents() {
        assert_eq!(Amount::from_dollars(100.0).unwrap().cents(), 10_000);
        assert_eq!(Amount::from_dollars(0.01).unwrap().cents(), 1);
        assert_eq!(Amount::from_dollars(12.345).unwrap().cents(), 1235);
        assert_eq!(Amount::from_dollars(12.344).unwrap().cents(), 1234);
    }

    #[test]
    fn test_from_dollars_rejects_non_finite() {
        assert_eq!(Amount::from_dollars(f64::NAN), Err(MoneyError::NotFinite));
        assert_eq!(
            Amount::from_dollars(f64::INFINITY),
            Err(MoneyError::NotFinite)
        );
        assert_eq!(Amount::from_dollars(1e15), Err(MoneyError::OutOfRange));
    }

    #[test]
    fn test_dollars_round_trip() {
        let amt = Amount::from_dollars(140.0).unwrap();
        assert!((amt.as_dollars() - 140.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_cents(9000).to_string(), "90.00");
        assert_eq!(Amount::from_cents(105).to_string(), "1.05");
        assert_eq!(Amount::from_cents(-250).to_string(), "-2.50");
    }

    #[test]
    fn test_payout_is_exact_for_whole_cents() {
        // 50.00 at 1.80 pays 90.00
        let stake = Amount::from_cents(5_000);
        assert_eq!(Price::from_hundredths(180).payout(stake).cents(), 9_000);
        // 50.00 at 3.50 pays 175.00
        assert_eq!(Price::from_hundredths(350).payout(stake).cents(), 17_500);
    }

    #[test]
    fn test_payout_truncates_fractional_cents() {
        // 1 cent at 1.80 is 1.8 cents, pays 1 cent
        let stake = Amount::from_cents(1);
        assert_eq!(Price::from_hundredths(180).payout(stake).cents(), 1);
    }
}
