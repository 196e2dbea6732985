//! Billing: turns predicted energy into an estimated cost
//!
//! Rounding is done in decimal arithmetic on the shortest text form of each
//! float, so `10.0 * 11.4295` is exactly `114.295` before rounding instead of
//! whatever its binary expansion happens to be.

use crate::error::ConfigError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decimal places kept for energy and money
pub const DECIMAL_PLACES: u32 = 2;

/// Rule applied when a value sits exactly between two cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Midpoints go away from zero: 114.285 -> 114.29
    #[default]
    HalfUp,
    /// Midpoints go to the even neighbour: 114.285 -> 114.28
    HalfEven,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }

    /// Round `value` to two decimal places
    pub fn round2(self, value: f64) -> f64 {
        match to_decimal(value) {
            Some(d) => self.round_decimal(d).unwrap_or(value),
            None => self.round_float(value),
        }
    }

    fn round_decimal(self, value: Decimal) -> Option<f64> {
        value
            .round_dp_with_strategy(DECIMAL_PLACES, self.strategy())
            .to_f64()
    }

    // Only reached for values outside Decimal's range or non-finite input
    fn round_float(self, value: f64) -> f64 {
        let scaled = value * 100.0;
        let rounded = match self {
            RoundingMode::HalfUp => scaled.round(),
            RoundingMode::HalfEven => scaled.round_ties_even(),
        };
        rounded / 100.0
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// `predicted_kwh * rate_per_kwh`, rounded to two decimals
pub fn bill(predicted_kwh: f64, rate_per_kwh: f64, rounding: RoundingMode) -> f64 {
    let product = to_decimal(predicted_kwh)
        .zip(to_decimal(rate_per_kwh))
        .and_then(|(kwh, rate)| kwh.checked_mul(rate))
        .and_then(|d| rounding.round_decimal(d));
    product.unwrap_or_else(|| rounding.round_float(predicted_kwh * rate_per_kwh))
}

/// Converts predictions to cost at a fixed, process-wide rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillingCalculator {
    rate_per_kwh: f64,
    rounding: RoundingMode,
}

impl BillingCalculator {
    pub fn new(rate_per_kwh: f64, rounding: RoundingMode) -> Result<Self, ConfigError> {
        if !rate_per_kwh.is_finite() || rate_per_kwh < 0.0 {
            return Err(ConfigError::InvalidRate(rate_per_kwh));
        }
        Ok(Self {
            rate_per_kwh,
            rounding,
        })
    }

    pub fn bill(&self, predicted_kwh: f64) -> f64 {
        bill(predicted_kwh, self.rate_per_kwh, self.rounding)
    }

    /// Current rate, available without running a prediction
    pub fn rate(&self) -> f64 {
        self.rate_per_kwh
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_rate_rounds_up() {
        assert_eq!(bill(10.0, 11.4295, RoundingMode::HalfUp), 114.30);
        // 114.295: the kept digit 9 is odd, so half-even also rounds up
        assert_eq!(bill(10.0, 11.4295, RoundingMode::HalfEven), 114.30);
    }

    #[test]
    fn test_midpoint_rules_differ() {
        assert_eq!(bill(10.0, 11.4285, RoundingMode::HalfUp), 114.29);
        assert_eq!(bill(10.0, 11.4285, RoundingMode::HalfEven), 114.28);
    }

    #[test]
    fn test_bill_matches_rounded_product() {
        let cases = [(0.0, 11.4295), (150.5, 0.0), (85.0, 0.12), (205.37, 11.4295), (1.0, 1.005)];
        for (kwh, rate) in cases {
            let expected = RoundingMode::HalfUp.round2(
                (Decimal::from_str(&kwh.to_string()).unwrap()
                    * Decimal::from_str(&rate.to_string()).unwrap())
                .to_f64()
                .unwrap(),
            );
            assert_eq!(bill(kwh, rate, RoundingMode::HalfUp), expected, "{} * {}", kwh, rate);
        }
        assert_eq!(bill(1.0, 1.005, RoundingMode::HalfUp), 1.01);
    }

    #[test]
    fn test_round2() {
        assert_eq!(RoundingMode::HalfUp.round2(2.675), 2.68);
        assert_eq!(RoundingMode::HalfEven.round2(2.665), 2.66);
        assert_eq!(RoundingMode::HalfUp.round2(-1.005), -1.01);
        assert_eq!(RoundingMode::HalfUp.round2(42.0), 42.0);
    }

    #[test]
    fn test_calculator_reports_rate() {
        let calc = BillingCalculator::new(11.4295, RoundingMode::HalfUp).unwrap();
        assert_eq!(calc.rate(), 11.4295);
        assert_eq!(calc.bill(10.0), 114.30);
    }

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(BillingCalculator::new(-0.5, RoundingMode::HalfUp).is_err());
        assert!(BillingCalculator::new(f64::NAN, RoundingMode::HalfUp).is_err());
        assert!(BillingCalculator::new(f64::INFINITY, RoundingMode::HalfEven).is_err());
        assert!(BillingCalculator::new(0.0, RoundingMode::HalfEven).is_ok());
    }
}
