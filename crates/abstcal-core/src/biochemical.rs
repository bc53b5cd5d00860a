//! Biochemical verification: half-life decay expansion of readings and
//! override of self-reports the readings contradict.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use tracing::debug;

use abstcal_model::{BiochemicalConfig, DailyRecord, DecayConfig, SubjectId};

use crate::dataset::TlfbDataset;

/// Estimate decayed readings for the days following each observed reading.
///
/// For a reading R on day D, day D+d gets `R * 0.5^(d / half_life)` for
/// d in 1..=days_interpolation, unless a directly observed reading exists
/// on that day; observed data is never overwritten by estimates.
/// Estimates from different source days may collide; the dataset's
/// duplicate resolution settles those during normalization.
///
/// Returns the number of estimate rows inserted. The config's half-life is
/// validated at construction, so no failure path exists here.
pub fn expand_decay(bio: &mut TlfbDataset, config: &DecayConfig) -> usize {
    let mut inserted = 0usize;
    let subjects: Vec<SubjectId> = bio.subjects().cloned().collect();
    for subject in subjects {
        let observed: Vec<(NaiveDate, f64)> = bio
            .store()
            .records(&subject)
            .iter()
            .filter_map(|record| Some((record.date?, record.amount?)))
            .collect();
        let observed_dates: BTreeSet<NaiveDate> = observed.iter().map(|(date, _)| *date).collect();
        for (date, reading) in observed {
            for d in 1..=config.days_interpolation {
                let target = date + Days::new(u64::from(d));
                if observed_dates.contains(&target) {
                    continue;
                }
                let estimate = reading * 0.5_f64.powf(f64::from(d) / config.half_life);
                bio.store_mut()
                    .insert(DailyRecord::new(subject.clone(), target, estimate));
                inserted += 1;
            }
        }
    }
    debug!(inserted, "expanded biochemical readings by decay");
    inserted
}

/// Override self-reported abstinent days that the biochemical data
/// contradict: self-report at or below `tlfb_cutoff` but reading above the
/// biochemical cutoff. Days without biochemical coverage are untouched.
///
/// Returns the count of overridden days.
pub fn merge_biochemical(
    tlfb: &mut TlfbDataset,
    bio: &TlfbDataset,
    tlfb_cutoff: f64,
    config: &BiochemicalConfig,
) -> usize {
    let mut overridden = 0usize;
    tlfb.store_mut().for_each_subject_mut(|subject, records| {
        let readings = bio.day_amounts(subject);
        if readings.is_empty() {
            return;
        }
        for record in records {
            let (Some(date), Some(amount)) = (record.date, record.amount) else {
                continue;
            };
            if amount > tlfb_cutoff {
                continue;
            }
            if let Some(reading) = readings.get(&date) {
                if *reading > config.cutoff {
                    record.amount = Some(config.override_amount);
                    overridden += 1;
                }
            }
        }
    });
    debug!(overridden, "overrode false-negative self-reports");
    overridden
}
