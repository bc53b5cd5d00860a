//! Per-stage change summaries.
//!
//! Every pipeline stage reports what it changed, even when it changed
//! nothing; the rendering layer decides how to display the counts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::{SubjectId, VisitLabel};

/// Which bound an outlier violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierBound {
    BelowMin,
    AboveMax,
}

/// One record flagged by outlier recoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierHit {
    pub subject: SubjectId,
    /// Date of the record, when present (TLFB amounts and visit dates both
    /// carry one after missing-value dropping).
    pub date: Option<NaiveDate>,
    /// The offending value, rendered as text so amounts and dates share
    /// one report shape.
    pub value: String,
    pub bound: OutlierBound,
}

/// Report from `recode_outliers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub hits: Vec<OutlierHit>,
    /// True when offending records were removed, false when clipped.
    pub removed: bool,
}

impl OutlierReport {
    pub fn count(&self) -> usize {
        self.hits.len()
    }
}

/// Summary of the normalization stage for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationSummary {
    /// Records removed because date or amount was missing.
    pub missing_dropped: usize,
    /// Duplicate groups affected by duplicate resolution.
    pub duplicate_groups: usize,
    /// Records removed by duplicate resolution.
    pub duplicates_removed: usize,
    /// Records excluded by the subject filter.
    pub subjects_filtered: usize,
    pub outliers: OutlierReport,
}

/// Summary of TLFB gap imputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapImputationSummary {
    /// Interior gap days filled, per subject.
    pub gap_days: BTreeMap<SubjectId, usize>,
    /// Days appended beyond the last observed record, per subject.
    pub extension_days: BTreeMap<SubjectId, usize>,
    /// Gaps left unfilled because they exceeded the gap limit.
    pub gaps_over_limit: usize,
}

impl GapImputationSummary {
    pub fn total_imputed(&self) -> usize {
        self.gap_days.values().sum::<usize>() + self.extension_days.values().sum::<usize>()
    }
}

/// Summary of biochemical decay expansion and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiochemicalSummary {
    /// Decay-estimated rows inserted before normalization.
    pub decay_rows: usize,
    /// Self-reported days overridden as false negatives.
    pub overridden_days: usize,
}

/// Summary of visit date imputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitImputationSummary {
    pub anchor: Option<VisitLabel>,
    /// Dates filled, per subject.
    pub imputed: BTreeMap<SubjectId, usize>,
    /// Subjects skipped because they lack an observed anchor date.
    pub skipped_subjects: Vec<SubjectId>,
}

impl VisitImputationSummary {
    pub fn total_imputed(&self) -> usize {
        self.imputed.values().sum()
    }
}
