// Innings-pitched values. Box scores write innings as whole innings plus a
// digit counting outs (10.1 = ten innings and one out); arithmetic needs the
// true fractional value (10.333...).

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StatError {
    #[error("invalid innings value `{value}`: {reason}")]
    Invalid { value: String, reason: &'static str },
}

/// Innings stored as true fractional innings.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Innings(f64);

impl Innings {
    pub const ZERO: Innings = Innings(0.0);

    /// Wrap a true fractional innings value. Negative and non-finite inputs
    /// collapse to zero.
    pub fn from_innings(value: f64) -> Self {
        if value.is_finite() && value > 0.0 {
            Innings(value)
        } else {
            Innings::ZERO
        }
    }

    pub fn from_outs(outs: u64) -> Self {
        Innings(outs as f64 / 3.0)
    }

    /// Interpret a number written in box-score notation. The digit after the
    /// decimal point must be 0, 1, or 2.
    pub fn from_notation(value: f64) -> Result<Self, StatError> {
        if !value.is_finite() || value < 0.0 {
            return Err(StatError::Invalid {
                value: value.to_string(),
                reason: "must be a non-negative number",
            });
        }
        let whole = value.trunc();
        let tenths = (value - whole) * 10.0;
        let outs = tenths.round();
        if (tenths - outs).abs() > 1e-6 || outs > 2.0 {
            return Err(StatError::Invalid {
                value: value.to_string(),
                reason: "out digit must be 0, 1, or 2",
            });
        }
        Ok(Innings(whole + outs / 3.0))
    }

    /// Parse box-score notation from text, e.g. `"10.1"`.
    pub fn parse(text: &str) -> Result<Self, StatError> {
        let trimmed = text.trim();
        let value: f64 = trimmed.parse().map_err(|_| StatError::Invalid {
            value: trimmed.to_string(),
            reason: "not a number",
        })?;
        Self::from_notation(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Total outs, rounded to the nearest out.
    pub fn outs(self) -> u64 {
        (self.0 * 3.0).round() as u64
    }

    /// Box-score notation as a number (10.333... becomes 10.1).
    pub fn notation(self) -> f64 {
        let outs = self.outs();
        ((outs / 3) * 10 + outs % 3) as f64 / 10.0
    }
}

impl fmt::Display for Innings {
    /// Box-score notation, always with one out digit.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outs = self.outs();
        write!(f, "{}.{}", outs / 3, outs % 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn notation_converts_out_digit_to_thirds() {
        let ip = Innings::from_notation(10.1).unwrap();
        assert!(approx_eq(ip.value(), 10.0 + 1.0 / 3.0, 1e-9));
        let ip = Innings::from_notation(6.2).unwrap();
        assert!(approx_eq(ip.value(), 6.0 + 2.0 / 3.0, 1e-9));
        assert_eq!(Innings::from_notation(7.0).unwrap().value(), 7.0);
    }

    #[test]
    fn rejects_out_digits_above_two() {
        assert!(Innings::from_notation(4.3).is_err());
        assert!(Innings::from_notation(4.25).is_err());
        assert!(Innings::parse("12.7").is_err());
        assert!(Innings::from_notation(-1.0).is_err());
        assert!(Innings::parse("abc").is_err());
    }

    #[test]
    fn formats_back_to_notation() {
        let ip = Innings::parse("10.1").unwrap();
        assert_eq!(ip.to_string(), "10.1");
        assert_eq!(ip.notation(), 10.1);
        assert_eq!(Innings::from_outs(20).to_string(), "6.2");
        assert_eq!(Innings::ZERO.to_string(), "0.0");
    }

    #[test]
    fn projected_fractions_round_to_nearest_out() {
        // 5.9 true innings is 17.7 outs, which rounds to 18 outs = 6.0
        assert_eq!(Innings::from_innings(5.9).to_string(), "6.0");
        // 5.4 true innings is 16.2 outs, which rounds to 16 outs = 5.1
        assert_eq!(Innings::from_innings(5.4).to_string(), "5.1");
    }

    #[test]
    fn negative_true_innings_collapse_to_zero() {
        assert_eq!(Innings::from_innings(-2.0), Innings::ZERO);
        assert_eq!(Innings::from_innings(f64::NAN), Innings::ZERO);
    }
}
