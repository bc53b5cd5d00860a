//! Lapse definitions for prolonged abstinence.

use serde::{Deserialize, Serialize};

use crate::error::{AbstcalError, Result};

/// When abstinence counts as broken after the grace period.
///
/// Definitions are written in the study shorthand carried over from the
/// original diary tooling: `false` (no lapse allowed), `"5 cigs"` (any
/// single day at or above 5), `"5 cigs/14 days"` (at least 5 in any
/// trailing 14-day window). The unit word is free text and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LapseDefinition {
    /// Any non-abstinent day breaks abstinence.
    NotAllowed,
    /// A single day with at least `threshold` use breaks abstinence.
    Amount { threshold: f64 },
    /// Cumulative use of at least `threshold` within any trailing window
    /// of `window_days` days breaks abstinence.
    AmountOverWindow { threshold: f64, window_days: u32 },
}

impl LapseDefinition {
    /// Parse the text form of a lapse definition.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("false") {
            return Ok(Self::NotAllowed);
        }
        let malformed = || AbstcalError::MalformedLapseDefinition(text.to_string());
        let (amount_part, window_part) = match trimmed.split_once('/') {
            Some((amount, window)) => (amount.trim(), Some(window.trim())),
            None => (trimmed, None),
        };
        let threshold = leading_number(amount_part).ok_or_else(malformed)?;
        match window_part {
            None => Ok(Self::Amount { threshold }),
            Some(window) => {
                let days = leading_number(window).ok_or_else(malformed)?;
                if days < 1.0 || days.fract() != 0.0 {
                    return Err(malformed());
                }
                Ok(Self::AmountOverWindow {
                    threshold,
                    window_days: days as u32,
                })
            }
        }
    }
}

impl std::fmt::Display for LapseDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAllowed => f.write_str("false"),
            Self::Amount { threshold } => write!(f, "{threshold}"),
            Self::AmountOverWindow {
                threshold,
                window_days,
            } => write!(f, "{threshold}/{window_days} days"),
        }
    }
}

/// Numeric prefix of a token such as `5 cigs` or `14 days`.
fn leading_number(text: &str) -> Option<f64> {
    let token = text.split_whitespace().next()?;
    token.parse::<f64>().ok().filter(|value| *value >= 0.0)
}
