//! Tests for biochemical decay expansion and false-negative overrides.

use chrono::NaiveDate;

use abstcal_core::TlfbDataset;
use abstcal_core::biochemical::{expand_decay, merge_biochemical};
use abstcal_model::{BiochemicalConfig, DailyRecord, DecayConfig, SubjectId};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 2, d).expect("valid date")
}

fn subject() -> SubjectId {
    SubjectId::from("1000")
}

#[test]
fn decay_halves_the_reading_per_half_life() {
    let mut bio = TlfbDataset::from_records(vec![DailyRecord::new("1000", day(1), 20.0)]);
    let config = DecayConfig::new(1.0, 2).expect("config");
    let inserted = expand_decay(&mut bio, &config);
    assert_eq!(inserted, 2);
    let days = bio.day_amounts(&subject());
    assert!((days[&day(2)] - 10.0).abs() < 1e-9);
    assert!((days[&day(3)] - 5.0).abs() < 1e-9);
}

#[test]
fn decay_never_overwrites_observed_readings() {
    let mut bio = TlfbDataset::from_records(vec![
        DailyRecord::new("1000", day(1), 20.0),
        DailyRecord::new("1000", day(2), 18.0),
    ]);
    let config = DecayConfig::new(1.0, 1).expect("config");
    let inserted = expand_decay(&mut bio, &config);
    // Only day 3 (from the day-2 reading) is estimated.
    assert_eq!(inserted, 1);
    let days = bio.day_amounts(&subject());
    assert_eq!(days[&day(2)], 18.0);
    assert!((days[&day(3)] - 9.0).abs() < 1e-9);
}

#[test]
fn contradicted_self_reports_are_overridden() {
    let mut tlfb = TlfbDataset::from_records(vec![
        DailyRecord::new("1000", day(1), 0.0),
        DailyRecord::new("1000", day(2), 0.0),
        DailyRecord::new("1000", day(3), 5.0),
    ]);
    let bio = TlfbDataset::from_records(vec![
        DailyRecord::new("1000", day(1), 10.0),
        DailyRecord::new("1000", day(2), 2.0),
        DailyRecord::new("1000", day(3), 10.0),
    ]);
    let config = BiochemicalConfig {
        cutoff: 4.0,
        override_amount: 1.0,
        decay: None,
    };
    let overridden = merge_biochemical(&mut tlfb, &bio, 0.0, &config);
    let days = tlfb.day_amounts(&subject());
    // Day 1: abstinent self-report contradicted by a high reading.
    assert_eq!(overridden, 1);
    assert_eq!(days[&day(1)], 1.0);
    // Day 2: reading below the biochemical cutoff, report stands.
    assert_eq!(days[&day(2)], 0.0);
    // Day 3: self-report already non-abstinent, never touched.
    assert_eq!(days[&day(3)], 5.0);
}

#[test]
fn days_without_readings_are_untouched() {
    let mut tlfb = TlfbDataset::from_records(vec![DailyRecord::new("1000", day(1), 0.0)]);
    let bio = TlfbDataset::from_records(vec![DailyRecord::new("1001", day(1), 30.0)]);
    let config = BiochemicalConfig {
        cutoff: 4.0,
        override_amount: 1.0,
        decay: None,
    };
    let overridden = merge_biochemical(&mut tlfb, &bio, 0.0, &config);
    assert_eq!(overridden, 0);
    assert_eq!(tlfb.day_amounts(&subject())[&day(1)], 0.0);
}
