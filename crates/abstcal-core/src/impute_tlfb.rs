//! TLFB gap imputation: fill missing calendar days between a subject's
//! first and last retained dates, and optionally extend past the last
//! record up to the subject's latest visit date.

use chrono::{Days, NaiveDate};
use tracing::debug;

use abstcal_model::{
    DailyRecord, GapImputationSummary, ImputationPolicy, LastRecordPolicy, SubjectId,
    TlfbImputationMode,
};

use crate::dataset::TlfbDataset;

/// Fill gaps per the policy. `latest_visit` supplies each subject's last
/// visit date for the last-record extension; return `None` to skip the
/// extension for that subject.
pub fn impute_gaps(
    tlfb: &mut TlfbDataset,
    policy: &ImputationPolicy,
    latest_visit: impl Fn(&SubjectId) -> Option<NaiveDate>,
) -> GapImputationSummary {
    let mut summary = GapImputationSummary::default();
    let subjects: Vec<SubjectId> = tlfb.subjects().cloned().collect();
    for subject in subjects {
        let observed: Vec<(NaiveDate, f64)> = tlfb.day_amounts(&subject).into_iter().collect();
        if observed.is_empty() {
            continue;
        }
        let mut filled: Vec<DailyRecord> = Vec::new();
        if policy.mode != TlfbImputationMode::None {
            for pair in observed.windows(2) {
                let (start, start_amount) = pair[0];
                let (end, end_amount) = pair[1];
                let gap = (end - start).num_days() - 1;
                if gap <= 0 {
                    continue;
                }
                if let Some(limit) = policy.gap_limit {
                    if gap > i64::from(limit) {
                        summary.gaps_over_limit += 1;
                        continue;
                    }
                }
                let span = (end - start).num_days() as f64;
                for offset in 1..=gap {
                    let Some(amount) = gap_fill_amount(
                        policy.mode,
                        start_amount,
                        end_amount,
                        offset as f64 / span,
                    ) else {
                        break;
                    };
                    let date = start + Days::new(offset as u64);
                    filled.push(DailyRecord::new(subject.clone(), date, amount));
                }
            }
        }
        if !filled.is_empty() {
            *summary.gap_days.entry(subject.clone()).or_default() += filled.len();
        }
        // Extension beyond the last observed record, bounded by the
        // subject's latest visit date.
        if let Some(last_record) = policy.last_record {
            let (last, last_amount) = observed[observed.len() - 1];
            if let Some(visit_end) = latest_visit(&subject) {
                if visit_end > last {
                    let days = (visit_end - last).num_days();
                    for offset in 1..=days {
                        let amount = match last_record {
                            LastRecordPolicy::CarryForward => last_amount,
                            LastRecordPolicy::Fixed(value) => value,
                        };
                        let date = last + Days::new(offset as u64);
                        filled.push(DailyRecord::new(subject.clone(), date, amount));
                    }
                    *summary.extension_days.entry(subject.clone()).or_default() +=
                        days as usize;
                }
            }
        }
        for record in filled {
            tlfb.store_mut().insert(record);
        }
    }
    debug!(
        imputed = summary.total_imputed(),
        over_limit = summary.gaps_over_limit,
        "imputed TLFB gaps"
    );
    summary
}

/// Amount for one interior gap day, `fraction` of the way from start to
/// end. `None` when imputation is disabled.
fn gap_fill_amount(
    mode: TlfbImputationMode,
    start_amount: f64,
    end_amount: f64,
    fraction: f64,
) -> Option<f64> {
    match mode {
        TlfbImputationMode::None => None,
        TlfbImputationMode::Linear => {
            Some(start_amount + (end_amount - start_amount) * fraction)
        }
        TlfbImputationMode::Uniform => Some(start_amount),
        TlfbImputationMode::Fixed(value) => Some(value),
    }
}
