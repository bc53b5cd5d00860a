//! Visit date imputation relative to an anchor visit.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

use abstcal_model::{
    AbstcalError, Result, SubjectId, VisitImputationMode, VisitImputationSummary, VisitLabel,
    VisitRecord,
};

use crate::dataset::VisitDataset;

/// Fill missing visit dates from the anchor visit's observed date plus
/// cumulative typical inter-visit intervals.
///
/// Subjects without an observed anchor date are skipped with a recorded
/// warning. Mode `None` leaves everything untouched.
pub fn impute_visit_dates(
    visits: &mut VisitDataset,
    mode: VisitImputationMode,
    anchor: &VisitLabel,
) -> Result<VisitImputationSummary> {
    let mut summary = VisitImputationSummary {
        anchor: Some(anchor.clone()),
        ..VisitImputationSummary::default()
    };
    if mode == VisitImputationMode::None {
        return Ok(summary);
    }
    let expected = visits.expected().to_vec();
    let anchor_index = expected
        .iter()
        .position(|label| label == anchor)
        .ok_or_else(|| AbstcalError::UnknownVisit(anchor.to_string()))?;

    let intervals = typical_intervals(visits, &expected, mode);

    let subjects: Vec<SubjectId> = visits.subjects().cloned().collect();
    for subject in subjects {
        let Some(anchor_date) = visits.date_of(&subject, anchor) else {
            warn!(subject = %subject, anchor = %anchor, "subject lacks the anchor visit; skipped");
            summary.skipped_subjects.push(subject);
            continue;
        };
        for (index, label) in expected.iter().enumerate() {
            if visits.date_of(&subject, label).is_some() {
                continue;
            }
            let Some(offset) = cumulative_offset(&intervals, anchor_index, index) else {
                continue;
            };
            let date = add_days(anchor_date, offset);
            visits.insert(VisitRecord::new(subject.clone(), label.clone(), date));
            *summary.imputed.entry(subject.clone()).or_default() += 1;
        }
    }
    debug!(
        imputed = summary.total_imputed(),
        skipped = summary.skipped_subjects.len(),
        "imputed visit dates"
    );
    Ok(summary)
}

/// Typical interval in days for each consecutive expected-visit pair,
/// computed across every subject with both dates observed. `None` for a
/// pair nobody observed.
fn typical_intervals(
    visits: &VisitDataset,
    expected: &[VisitLabel],
    mode: VisitImputationMode,
) -> Vec<Option<f64>> {
    let subjects: Vec<SubjectId> = visits.subjects().cloned().collect();
    let mut intervals: Vec<Option<f64>> = Vec::new();
    for pair in expected.windows(2) {
        let mut observed: Vec<i64> = Vec::new();
        for subject in &subjects {
            if let (Some(first), Some(second)) = (
                visits.date_of(subject, &pair[0]),
                visits.date_of(subject, &pair[1]),
            ) {
                observed.push((second - first).num_days());
            }
        }
        intervals.push(typical_value(&observed, mode));
    }
    intervals
}

fn typical_value(observed: &[i64], mode: VisitImputationMode) -> Option<f64> {
    if observed.is_empty() {
        return None;
    }
    match mode {
        VisitImputationMode::Mean => {
            Some(observed.iter().sum::<i64>() as f64 / observed.len() as f64)
        }
        VisitImputationMode::Frequency => {
            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for interval in observed {
                *counts.entry(*interval).or_default() += 1;
            }
            // Most frequent interval; ties go to the smallest value. The
            // BTreeMap iterates in ascending order, so a strict > keeps
            // the first (smallest) of any tied run.
            let mut best: Option<(i64, usize)> = None;
            for (interval, count) in counts {
                if best.map_or(true, |(_, best_count)| count > best_count) {
                    best = Some((interval, count));
                }
            }
            best.map(|(interval, _)| interval as f64)
        }
        VisitImputationMode::None => None,
    }
}

/// Signed cumulative interval from the anchor position to a visit
/// position. `None` when any required pair interval is unavailable.
fn cumulative_offset(intervals: &[Option<f64>], anchor: usize, target: usize) -> Option<i64> {
    let (range, sign) = if target >= anchor {
        (anchor..target, 1.0)
    } else {
        (target..anchor, -1.0)
    };
    let mut total = 0.0;
    for index in range {
        total += intervals[index]?;
    }
    Some((sign * total).round() as i64)
}

fn add_days(date: NaiveDate, offset: i64) -> NaiveDate {
    if offset >= 0 {
        date + Days::new(offset as u64)
    } else {
        date - Days::new(offset.unsigned_abs())
    }
}
