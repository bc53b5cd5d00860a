//! TLFB and visit datasets: the temporal store plus dataset-specific
//! invariants and the normalization entry points.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use abstcal_model::{
    DailyRecord, NormalizationSummary, OutlierMode, Result, SubjectId, TlfbOptions, VisitLabel,
    VisitOptions, VisitRecord,
};

use crate::normalize::{
    recode_amount_outliers, recode_date_outliers, resolve_daily_duplicates,
    resolve_visit_duplicates,
};
use crate::store::TemporalStore;

/// Daily self-report (or biochemical reading) dataset.
///
/// After `normalize` every record carries a date and an amount, and dates
/// are unique and strictly increasing within a subject.
#[derive(Debug, Clone, Default)]
pub struct TlfbDataset {
    store: TemporalStore<DailyRecord>,
}

impl TlfbDataset {
    pub fn from_records(records: impl IntoIterator<Item = DailyRecord>) -> Self {
        Self {
            store: TemporalStore::from_records(records),
        }
    }

    pub fn store(&self) -> &TemporalStore<DailyRecord> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TemporalStore<DailyRecord> {
        &mut self.store
    }

    pub fn subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.store.subjects()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Date → amount view for one subject. Records still missing a field
    /// (only possible before normalization) are skipped.
    pub fn day_amounts(&self, subject: &SubjectId) -> BTreeMap<NaiveDate, f64> {
        self.store
            .records(subject)
            .iter()
            .filter_map(|record| Some((record.date?, record.amount?)))
            .collect()
    }

    /// Earliest and latest retained dates for a subject.
    pub fn date_span(&self, subject: &SubjectId) -> Option<(NaiveDate, NaiveDate)> {
        let records = self.store.records(subject);
        let first = records.iter().find_map(|record| record.date)?;
        let last = records.iter().rev().find_map(|record| record.date)?;
        Some((first, last))
    }

    /// Apply the full normalization sequence: subject filter, missing-value
    /// drop, duplicate resolution, outlier recoding.
    pub fn normalize(&mut self, options: &TlfbOptions) -> Result<NormalizationSummary> {
        let mut summary = NormalizationSummary::default();
        summary.subjects_filtered = self
            .store
            .retain_subjects(|subject| options.subjects.includes(subject));
        summary.missing_dropped = self.store.retain(DailyRecord::is_complete);
        let (groups, removed) = resolve_daily_duplicates(&mut self.store, options.duplicate_mode);
        summary.duplicate_groups = groups;
        summary.duplicates_removed = removed;
        if options.outlier_mode != OutlierMode::None {
            if let Some(bounds) = options.bounds {
                summary.outliers =
                    recode_amount_outliers(&mut self.store, bounds, options.outlier_mode);
            }
        }
        debug!(
            dropped = summary.missing_dropped,
            duplicate_groups = summary.duplicate_groups,
            outliers = summary.outliers.count(),
            "normalized TLFB dataset"
        );
        Ok(summary)
    }
}

/// Per-subject visit dates plus the study-wide expected visit order.
#[derive(Debug, Clone, Default)]
pub struct VisitDataset {
    store: TemporalStore<VisitRecord>,
    expected: Vec<VisitLabel>,
}

impl VisitDataset {
    /// Build from raw records. When `expected` is empty the order is
    /// inferred from first appearance in the data; records carrying labels
    /// outside a supplied order are discarded (logged, counted nowhere,
    /// since they can never participate in a window).
    pub fn from_records(
        records: impl IntoIterator<Item = VisitRecord>,
        expected: Vec<VisitLabel>,
    ) -> Self {
        let mut expected = expected;
        let infer = expected.is_empty();
        let mut store = TemporalStore::new();
        let mut discarded = 0usize;
        for record in records {
            if !expected.contains(&record.visit) {
                if infer {
                    expected.push(record.visit.clone());
                } else {
                    discarded += 1;
                    continue;
                }
            }
            store.insert(record);
        }
        if discarded > 0 {
            warn!(discarded, "discarded visit records outside the expected visit order");
        }
        Self { store, expected }
    }

    pub fn store(&self) -> &TemporalStore<VisitRecord> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TemporalStore<VisitRecord> {
        &mut self.store
    }

    pub fn expected(&self) -> &[VisitLabel] {
        &self.expected
    }

    pub fn subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.store.subjects()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Observed (or imputed) date of a visit for a subject.
    pub fn date_of(&self, subject: &SubjectId, visit: &VisitLabel) -> Option<NaiveDate> {
        self.store
            .records(subject)
            .iter()
            .find(|record| &record.visit == visit)
            .and_then(|record| record.date)
    }

    /// Latest dated visit for a subject.
    pub fn latest_date(&self, subject: &SubjectId) -> Option<NaiveDate> {
        self.store
            .records(subject)
            .iter()
            .filter_map(|record| record.date)
            .max()
    }

    pub fn insert(&mut self, record: VisitRecord) {
        self.store.insert(record);
    }

    /// Apply the full normalization sequence for visit data.
    pub fn normalize(&mut self, options: &VisitOptions) -> Result<NormalizationSummary> {
        let mut summary = NormalizationSummary::default();
        summary.subjects_filtered = self
            .store
            .retain_subjects(|subject| options.subjects.includes(subject));
        summary.missing_dropped = self.store.retain(|record| record.date.is_some());
        let (groups, removed) =
            resolve_visit_duplicates(&mut self.store, options.duplicate_mode)?;
        summary.duplicate_groups = groups;
        summary.duplicates_removed = removed;
        if options.outlier_mode != OutlierMode::None {
            if let Some(bounds) = options.bounds {
                summary.outliers =
                    recode_date_outliers(&mut self.store, bounds, options.outlier_mode);
            }
        }
        debug!(
            dropped = summary.missing_dropped,
            duplicate_groups = summary.duplicate_groups,
            outliers = summary.outliers.count(),
            "normalized visit dataset"
        );
        Ok(summary)
    }
}
