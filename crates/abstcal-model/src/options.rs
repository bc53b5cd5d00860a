//! Configuration options for dataset cleaning and imputation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AbstcalError, Result};
use crate::record::{SubjectId, VisitLabel};

/// How records sharing a duplicate key are resolved.
///
/// The key is (subject, date) for TLFB data and (subject, visit) for
/// visit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateMode {
    /// Keep the record with the smallest amount (or earliest date).
    KeepMin,
    /// Keep the record with the largest amount (or latest date).
    #[default]
    KeepMax,
    /// Keep a single record carrying the mean amount. Numeric amount
    /// fields only; requesting it for visit dates is a configuration error.
    KeepMean,
    /// Remove every member of a duplicate group, not just the extras.
    DropAll,
}

/// What to do with values outside the allowed bounds.
///
/// Bounds are inclusive: a value exactly at a bound is not an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierMode {
    /// Leave outliers untouched.
    #[default]
    None,
    /// Delete the offending record.
    Remove,
    /// Replace the value with the nearest bound.
    Clip,
}

/// Allowed amount range for TLFB records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountBounds {
    pub min: f64,
    pub max: f64,
}

impl AmountBounds {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min > max {
            return Err(AbstcalError::InvalidRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }
}

/// Allowed date range for visit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    pub fn new(min: NaiveDate, max: NaiveDate) -> Result<Self> {
        if min > max {
            return Err(AbstcalError::InvalidRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }
}

/// Gap-filling mode for missing TLFB calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlfbImputationMode {
    /// Leave gaps unfilled.
    None,
    /// Linear interpolation between the bounding observed amounts,
    /// weighted by day offset. Fractional amounts are kept as-is.
    #[default]
    Linear,
    /// Repeat the amount of the immediately preceding observed day.
    Uniform,
    /// Fill with a configured constant.
    Fixed(f64),
}

/// Extension policy beyond a subject's last observed TLFB date, up to the
/// subject's latest visit date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LastRecordPolicy {
    /// Repeat the last observed amount.
    CarryForward,
    /// Fill with a configured constant.
    Fixed(f64),
}

/// Complete TLFB gap-imputation policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationPolicy {
    pub mode: TlfbImputationMode,
    /// Gaps wider than this many days are left unfilled regardless of mode.
    pub gap_limit: Option<u32>,
    pub last_record: Option<LastRecordPolicy>,
}

impl ImputationPolicy {
    pub fn none() -> Self {
        Self {
            mode: TlfbImputationMode::None,
            gap_limit: None,
            last_record: None,
        }
    }
}

/// Exponential-decay expansion of biochemical readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    /// Half-life of the biochemical measure in days. Must be positive.
    pub half_life: f64,
    /// Number of following days to estimate for each observed reading.
    pub days_interpolation: u32,
}

impl DecayConfig {
    pub fn new(half_life: f64, days_interpolation: u32) -> Result<Self> {
        if half_life <= 0.0 {
            return Err(AbstcalError::InvalidHalfLife(half_life));
        }
        Ok(Self {
            half_life,
            days_interpolation,
        })
    }
}

/// Biochemical verification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiochemicalConfig {
    /// Readings at or below this value count as verified-abstinent.
    pub cutoff: f64,
    /// Amount substituted into a self-report the biochemical data
    /// contradict. Must indicate non-abstinence under the TLFB cutoff.
    pub override_amount: f64,
    pub decay: Option<DecayConfig>,
}

/// Which subjects participate in a run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectSelection {
    #[default]
    All,
    Subset(Vec<SubjectId>),
}

impl SubjectSelection {
    pub fn includes(&self, subject: &SubjectId) -> bool {
        match self {
            Self::All => true,
            Self::Subset(subjects) => subjects.contains(subject),
        }
    }
}

/// Cleaning options shared by the TLFB and biochemical datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlfbOptions {
    /// Amounts at or below this value count as abstinent.
    pub cutoff: f64,
    pub subjects: SubjectSelection,
    pub duplicate_mode: DuplicateMode,
    pub outlier_mode: OutlierMode,
    pub bounds: Option<AmountBounds>,
    pub imputation: ImputationPolicy,
}

impl Default for TlfbOptions {
    fn default() -> Self {
        Self {
            cutoff: 0.0,
            subjects: SubjectSelection::All,
            duplicate_mode: DuplicateMode::default(),
            outlier_mode: OutlierMode::None,
            bounds: None,
            imputation: ImputationPolicy::default(),
        }
    }
}

/// Date-filling mode for missing visit dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisitImputationMode {
    /// Leave missing dates missing; windows referencing them become
    /// not-applicable for the affected subject.
    None,
    /// Use the most frequently observed inter-visit interval; ties are
    /// broken by the smallest interval value.
    #[default]
    Frequency,
    /// Use the mean observed inter-visit interval.
    Mean,
}

/// Cleaning and imputation options for the visit dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitOptions {
    pub subjects: SubjectSelection,
    pub duplicate_mode: DuplicateMode,
    pub outlier_mode: OutlierMode,
    pub bounds: Option<DateBounds>,
    pub imputation_mode: VisitImputationMode,
    /// Reference visit whose observed date seeds imputation of the others.
    pub anchor_visit: Option<VisitLabel>,
}

impl Default for VisitOptions {
    fn default() -> Self {
        Self {
            subjects: SubjectSelection::All,
            duplicate_mode: DuplicateMode::default(),
            outlier_mode: OutlierMode::None,
            bounds: None,
            imputation_mode: VisitImputationMode::None,
            anchor_visit: None,
        }
    }
}

/// How abstinence variables are named.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableNames {
    /// Encode algorithm and parameters, e.g. `abst_pp7_v2`.
    #[default]
    Infer,
    /// Caller-supplied names; the count must match the number of produced
    /// variables exactly.
    Custom(Vec<String>),
}

/// Missing-data assumption for abstinence scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Assumption {
    /// Intent-to-Treat: a windowed day without a TLFB record scores
    /// non-abstinent.
    #[default]
    Itt,
    /// Responders-Only: a subject missing any day in a required window is
    /// excluded from that variable (not-applicable).
    Ro,
}

impl std::fmt::Display for Assumption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Itt => f.write_str("itt"),
            Self::Ro => f.write_str("ro"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_bounds_reject_inverted_range() {
        let err = AmountBounds::new(10.0, 5.0).unwrap_err();
        assert!(matches!(err, AbstcalError::InvalidRange { .. }));
    }

    #[test]
    fn decay_config_rejects_non_positive_half_life() {
        assert!(matches!(
            DecayConfig::new(0.0, 3).unwrap_err(),
            AbstcalError::InvalidHalfLife(_)
        ));
        assert!(DecayConfig::new(1.5, 3).is_ok());
    }

    #[test]
    fn subject_selection_subset() {
        let selection = SubjectSelection::Subset(vec![SubjectId::from("1000")]);
        assert!(selection.includes(&SubjectId::from("1000")));
        assert!(!selection.includes(&SubjectId::from("1001")));
    }
}
