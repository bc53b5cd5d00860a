//! Dataset normalization: missing-value dropping, duplicate resolution,
//! outlier recoding. All operations are idempotent and report what they
//! changed.

use std::collections::BTreeMap;

use abstcal_model::{
    AbstcalError, AmountBounds, DailyRecord, DateBounds, DuplicateMode, OutlierBound, OutlierHit,
    OutlierMode, OutlierReport, Result, VisitLabel, VisitRecord,
};

use crate::store::TemporalStore;

/// Resolve TLFB records sharing (subject, date).
///
/// Returns (groups affected, records removed). `KeepMean` collapses a
/// group into a single record carrying the mean amount; `DropAll` removes
/// every member of a group with more than one record.
pub fn resolve_daily_duplicates(
    store: &mut TemporalStore<DailyRecord>,
    mode: DuplicateMode,
) -> (usize, usize) {
    let mut groups = 0usize;
    let mut removed = 0usize;
    store.for_each_subject_mut(|_, records| {
        let mut resolved: Vec<DailyRecord> = Vec::with_capacity(records.len());
        let mut start = 0;
        while start < records.len() {
            let date = records[start].date;
            let mut end = start + 1;
            while end < records.len() && records[end].date == date {
                end += 1;
            }
            let group = &records[start..end];
            if group.len() == 1 {
                resolved.push(group[0].clone());
            } else {
                groups += 1;
                match mode {
                    DuplicateMode::KeepMin | DuplicateMode::KeepMax => {
                        let pick = select_by_amount(group, mode);
                        removed += group.len() - 1;
                        resolved.push(pick);
                    }
                    DuplicateMode::KeepMean => {
                        let amounts: Vec<f64> = group.iter().filter_map(|r| r.amount).collect();
                        let mut pick = group[0].clone();
                        if !amounts.is_empty() {
                            pick.amount = Some(amounts.iter().sum::<f64>() / amounts.len() as f64);
                        }
                        removed += group.len() - 1;
                        resolved.push(pick);
                    }
                    DuplicateMode::DropAll => {
                        removed += group.len();
                    }
                }
            }
            start = end;
        }
        *records = resolved;
    });
    (groups, removed)
}

fn select_by_amount(group: &[DailyRecord], mode: DuplicateMode) -> DailyRecord {
    let key = |record: &&DailyRecord| record.amount.unwrap_or(f64::NAN);
    let pick = match mode {
        DuplicateMode::KeepMin => group.iter().min_by(|a, b| key(a).total_cmp(&key(b))),
        _ => group.iter().max_by(|a, b| key(a).total_cmp(&key(b))),
    };
    pick.expect("duplicate group is non-empty").clone()
}

/// Resolve visit records sharing (subject, visit label).
///
/// `KeepMin`/`KeepMax` keep the earliest/latest date; `KeepMean` has no
/// meaning for dates and is rejected.
pub fn resolve_visit_duplicates(
    store: &mut TemporalStore<VisitRecord>,
    mode: DuplicateMode,
) -> Result<(usize, usize)> {
    if mode == DuplicateMode::KeepMean {
        return Err(AbstcalError::NonNumericMean);
    }
    let mut groups = 0usize;
    let mut removed = 0usize;
    store.for_each_subject_mut(|_, records| {
        let mut by_visit: BTreeMap<VisitLabel, Vec<VisitRecord>> = BTreeMap::new();
        for record in records.drain(..) {
            by_visit.entry(record.visit.clone()).or_default().push(record);
        }
        let mut resolved: Vec<VisitRecord> = Vec::new();
        for (_, group) in by_visit {
            if group.len() == 1 {
                resolved.extend(group);
                continue;
            }
            groups += 1;
            match mode {
                DuplicateMode::KeepMin => {
                    removed += group.len() - 1;
                    if let Some(pick) = group.into_iter().min_by_key(|record| record.date) {
                        resolved.push(pick);
                    }
                }
                DuplicateMode::KeepMax | DuplicateMode::KeepMean => {
                    removed += group.len() - 1;
                    if let Some(pick) = group.into_iter().max_by_key(|record| record.date) {
                        resolved.push(pick);
                    }
                }
                DuplicateMode::DropAll => {
                    removed += group.len();
                }
            }
        }
        resolved.sort_by_key(|record| record.date);
        *records = resolved;
    });
    Ok((groups, removed))
}

/// Recode TLFB amounts outside the allowed range. Bounds are inclusive.
pub fn recode_amount_outliers(
    store: &mut TemporalStore<DailyRecord>,
    bounds: AmountBounds,
    mode: OutlierMode,
) -> OutlierReport {
    let mut report = OutlierReport {
        removed: mode == OutlierMode::Remove,
        ..OutlierReport::default()
    };
    if mode == OutlierMode::None {
        return report;
    }
    store.for_each_subject_mut(|subject, records| {
        records.retain_mut(|record| {
            let Some(amount) = record.amount else {
                return true;
            };
            let bound = if amount < bounds.min {
                OutlierBound::BelowMin
            } else if amount > bounds.max {
                OutlierBound::AboveMax
            } else {
                return true;
            };
            report.hits.push(OutlierHit {
                subject: subject.clone(),
                date: record.date,
                value: amount.to_string(),
                bound,
            });
            match mode {
                OutlierMode::Remove => false,
                _ => {
                    record.amount = Some(match bound {
                        OutlierBound::BelowMin => bounds.min,
                        OutlierBound::AboveMax => bounds.max,
                    });
                    true
                }
            }
        });
    });
    report
}

/// Recode visit dates outside the allowed range. Bounds are inclusive.
pub fn recode_date_outliers(
    store: &mut TemporalStore<VisitRecord>,
    bounds: DateBounds,
    mode: OutlierMode,
) -> OutlierReport {
    let mut report = OutlierReport {
        removed: mode == OutlierMode::Remove,
        ..OutlierReport::default()
    };
    if mode == OutlierMode::None {
        return report;
    }
    store.for_each_subject_mut(|subject, records| {
        records.retain_mut(|record| {
            let Some(date) = record.date else {
                return true;
            };
            let bound = if date < bounds.min {
                OutlierBound::BelowMin
            } else if date > bounds.max {
                OutlierBound::AboveMax
            } else {
                return true;
            };
            report.hits.push(OutlierHit {
                subject: subject.clone(),
                date: Some(date),
                value: date.to_string(),
                bound,
            });
            match mode {
                OutlierMode::Remove => false,
                _ => {
                    record.date = Some(match bound {
                        OutlierBound::BelowMin => bounds.min,
                        OutlierBound::AboveMax => bounds.max,
                    });
                    true
                }
            }
        });
    });
    report
}
