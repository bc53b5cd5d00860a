//! Tests for the three abstinence scoring algorithms.

use chrono::NaiveDate;

use abstcal_core::{AbstinenceCalculator, TlfbDataset, VisitDataset};
use abstcal_model::{
    AbstcalError, AbstinenceStatus, Assumption, DailyRecord, LapseDefinition, SubjectId,
    VariableNames, VisitLabel, VisitRecord,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 2, d).expect("valid date")
}

fn label(name: &str) -> VisitLabel {
    VisitLabel::from(name)
}

fn subject(id: &str) -> SubjectId {
    SubjectId::from(id)
}

/// Daily coverage for one subject over a closed day range, zeros except
/// where `uses` lists an amount.
fn cover(id: &str, from: u32, to: u32, uses: &[(u32, f64)]) -> Vec<DailyRecord> {
    (from..=to)
        .map(|d| {
            let amount = uses
                .iter()
                .find(|(use_day, _)| *use_day == d)
                .map_or(0.0, |(_, amount)| *amount);
            DailyRecord::new(id, day(d), amount)
        })
        .collect()
}

fn visits_at(id: &str, dates: &[(&str, u32)]) -> Vec<VisitRecord> {
    dates
        .iter()
        .map(|(visit, d)| VisitRecord::new(id, *visit, day(*d)))
        .collect()
}

#[test]
fn point_prevalence_flags_any_use_in_the_window() {
    let tlfb = TlfbDataset::from_records(
        [
            cover("clean", 1, 10, &[]),
            cover("smoker", 1, 10, &[(9, 5.0)]),
        ]
        .concat(),
    );
    let visits = VisitDataset::from_records(
        [
            visits_at("clean", &[("v1", 10)]),
            visits_at("smoker", &[("v1", 10)]),
        ]
        .concat(),
        vec![label("v1")],
    );
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let table = calc
        .point_prevalence(&[label("v1")], &[3], &VariableNames::Infer)
        .expect("score");
    assert_eq!(table.variables, vec!["abst_pp3_v1".to_string()]);
    assert_eq!(
        table.get(&subject("clean"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::Abstinent)
    );
    assert_eq!(
        table.get(&subject("smoker"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::NonAbstinent)
    );
}

#[test]
fn including_end_pulls_the_visit_day_into_the_window() {
    // Use on the visit day itself.
    let tlfb = TlfbDataset::from_records(cover("s", 1, 10, &[(10, 5.0)]));
    let visits =
        VisitDataset::from_records(visits_at("s", &[("v1", 10)]), vec![label("v1")]);
    let excl = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let incl = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, true);
    let table = excl
        .point_prevalence(&[label("v1")], &[3], &VariableNames::Infer)
        .expect("score");
    assert_eq!(
        table.get(&subject("s"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::Abstinent)
    );
    let table = incl
        .point_prevalence(&[label("v1")], &[3], &VariableNames::Infer)
        .expect("score");
    assert_eq!(
        table.get(&subject("s"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::NonAbstinent)
    );
}

#[test]
fn missing_days_split_by_assumption() {
    // Day 8 missing inside the window.
    let records: Vec<DailyRecord> = cover("s", 1, 10, &[])
        .into_iter()
        .filter(|record| record.date != Some(day(8)))
        .collect();
    let tlfb = TlfbDataset::from_records(records);
    let visits =
        VisitDataset::from_records(visits_at("s", &[("v1", 10)]), vec![label("v1")]);
    let itt = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let ro = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Ro, false);
    let table = itt
        .point_prevalence(&[label("v1")], &[3], &VariableNames::Infer)
        .expect("score");
    assert_eq!(
        table.get(&subject("s"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::NonAbstinent)
    );
    let table = ro
        .point_prevalence(&[label("v1")], &[3], &VariableNames::Infer)
        .expect("score");
    assert_eq!(
        table.get(&subject("s"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::NotApplicable)
    );
}

#[test]
fn subjects_without_the_visit_date_are_not_applicable() {
    let tlfb = TlfbDataset::from_records(cover("s", 1, 10, &[]));
    let visits = VisitDataset::from_records(
        visits_at("other", &[("v1", 10)]),
        vec![label("v1")],
    );
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let table = calc
        .point_prevalence(&[label("v1")], &[3], &VariableNames::Infer)
        .expect("score");
    assert_eq!(
        table.get(&subject("s"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::NotApplicable)
    );
}

#[test]
fn amounts_at_the_cutoff_stay_abstinent() {
    let tlfb = TlfbDataset::from_records(cover("s", 7, 9, &[(8, 2.0)]));
    let visits =
        VisitDataset::from_records(visits_at("s", &[("v1", 10)]), vec![label("v1")]);
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 2.0, Assumption::Itt, false);
    let table = calc
        .point_prevalence(&[label("v1")], &[3], &VariableNames::Infer)
        .expect("score");
    assert_eq!(
        table.get(&subject("s"), "abst_pp3_v1"),
        Some(&AbstinenceStatus::Abstinent)
    );
}

#[test]
fn continuous_scores_from_the_start_visit() {
    let tlfb = TlfbDataset::from_records(
        [cover("clean", 1, 20, &[]), cover("lapser", 1, 20, &[(12, 3.0)])].concat(),
    );
    let visits = VisitDataset::from_records(
        [
            visits_at("clean", &[("v0", 1), ("v1", 10), ("v2", 20)]),
            visits_at("lapser", &[("v0", 1), ("v1", 10), ("v2", 20)]),
        ]
        .concat(),
        vec![label("v0"), label("v1"), label("v2")],
    );
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let table = calc
        .continuous(&label("v0"), &[label("v1"), label("v2")], &VariableNames::Infer)
        .expect("score");
    assert_eq!(
        table.variables,
        vec!["abst_cont_v0_v1".to_string(), "abst_cont_v0_v2".to_string()]
    );
    // The day-12 use falls after v1's window but inside v2's.
    assert_eq!(
        table.get(&subject("lapser"), "abst_cont_v0_v1"),
        Some(&AbstinenceStatus::Abstinent)
    );
    assert_eq!(
        table.get(&subject("lapser"), "abst_cont_v0_v2"),
        Some(&AbstinenceStatus::NonAbstinent)
    );
    assert_eq!(
        table.get(&subject("clean"), "abst_cont_v0_v2"),
        Some(&AbstinenceStatus::Abstinent)
    );
}

#[test]
fn prolonged_ignores_grace_period_use() {
    // Quit day 1, grace 7: use on day 5 is forgiven, day 20 is not.
    let tlfb = TlfbDataset::from_records(cover("s", 1, 28, &[(5, 9.0), (20, 9.0)]));
    let visits = VisitDataset::from_records(
        visits_at("s", &[("v0", 1), ("v1", 15), ("v2", 25)]),
        vec![label("v0"), label("v1"), label("v2")],
    );
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let (table, lapses) = calc
        .prolonged(
            &label("v0"),
            &[label("v1"), label("v2")],
            &[LapseDefinition::NotAllowed],
            7,
            &VariableNames::Infer,
        )
        .expect("score");
    assert_eq!(
        table.variables,
        vec![
            "abst_prol7_false_v1".to_string(),
            "abst_prol7_false_v2".to_string()
        ]
    );
    assert_eq!(
        table.get(&subject("s"), "abst_prol7_false_v1"),
        Some(&AbstinenceStatus::Abstinent)
    );
    assert_eq!(
        table.get(&subject("s"), "abst_prol7_false_v2"),
        Some(&AbstinenceStatus::NonAbstinent)
    );
    assert_eq!(lapses.variables, vec!["lapse_false".to_string()]);
    assert_eq!(lapses.get(&subject("s"), "lapse_false"), Some(&Some(day(20))));
}

#[test]
fn prolonged_amount_threshold_requires_the_full_amount() {
    let tlfb = TlfbDataset::from_records(cover("s", 1, 28, &[(10, 4.0), (20, 5.0)]));
    let visits = VisitDataset::from_records(
        visits_at("s", &[("v0", 1), ("v1", 25)]),
        vec![label("v0"), label("v1")],
    );
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let (_, lapses) = calc
        .prolonged(
            &label("v0"),
            &[label("v1")],
            &[LapseDefinition::Amount { threshold: 5.0 }],
            7,
            &VariableNames::Infer,
        )
        .expect("score");
    // Day 10 (4 < 5) does not lapse; day 20 does.
    assert_eq!(lapses.get(&subject("s"), "lapse_5"), Some(&Some(day(20))));
}

#[test]
fn prolonged_windowed_threshold_sums_trailing_days() {
    let tlfb = TlfbDataset::from_records(cover("s", 1, 28, &[(10, 2.0), (11, 2.0), (12, 2.0)]));
    let visits = VisitDataset::from_records(
        visits_at("s", &[("v0", 1), ("v1", 25)]),
        vec![label("v0"), label("v1")],
    );
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let definition = LapseDefinition::AmountOverWindow {
        threshold: 5.0,
        window_days: 3,
    };
    let (table, lapses) = calc
        .prolonged(
            &label("v0"),
            &[label("v1")],
            &[definition],
            7,
            &VariableNames::Infer,
        )
        .expect("score");
    // 2+2 = 4 through day 11; 2+2+2 = 6 crosses the threshold on day 12.
    assert_eq!(lapses.get(&subject("s"), "lapse_5_3d"), Some(&Some(day(12))));
    assert_eq!(
        table.get(&subject("s"), "abst_prol7_5_3d_v1"),
        Some(&AbstinenceStatus::NonAbstinent)
    );
}

#[test]
fn prolonged_visit_before_the_quit_date_is_not_applicable() {
    let tlfb = TlfbDataset::from_records(cover("s", 1, 28, &[]));
    let visits = VisitDataset::from_records(
        visits_at("s", &[("v0", 10), ("v1", 5)]),
        vec![label("v0"), label("v1")],
    );
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let (table, _) = calc
        .prolonged(
            &label("v0"),
            &[label("v1")],
            &[LapseDefinition::NotAllowed],
            7,
            &VariableNames::Infer,
        )
        .expect("score");
    assert_eq!(
        table.get(&subject("s"), "abst_prol7_false_v1"),
        Some(&AbstinenceStatus::NotApplicable)
    );
}

#[test]
fn prolonged_missing_days_split_by_assumption() {
    // Coverage stops at day 20; the v1 window reaches day 24.
    let tlfb = TlfbDataset::from_records(cover("s", 1, 20, &[]));
    let visits = VisitDataset::from_records(
        visits_at("s", &[("v0", 1), ("v1", 25)]),
        vec![label("v0"), label("v1")],
    );
    for (assumption, expected) in [
        (Assumption::Itt, AbstinenceStatus::NonAbstinent),
        (Assumption::Ro, AbstinenceStatus::NotApplicable),
    ] {
        let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, assumption, false);
        let (table, _) = calc
            .prolonged(
                &label("v0"),
                &[label("v1")],
                &[LapseDefinition::Amount { threshold: 5.0 }],
                7,
                &VariableNames::Infer,
            )
            .expect("score");
        assert_eq!(
            table.get(&subject("s"), "abst_prol7_5_v1"),
            Some(&expected),
            "assumption {assumption}"
        );
    }
}

#[test]
fn custom_names_must_match_the_variable_count() {
    let tlfb = TlfbDataset::from_records(cover("s", 1, 10, &[]));
    let visits =
        VisitDataset::from_records(visits_at("s", &[("v1", 10)]), vec![label("v1")]);
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    let names = VariableNames::Custom(vec!["pp7".to_string()]);
    let table = calc
        .point_prevalence(&[label("v1")], &[7], &names)
        .expect("score");
    assert_eq!(table.variables, vec!["pp7".to_string()]);
    let wrong = VariableNames::Custom(vec!["a".to_string(), "b".to_string()]);
    assert!(matches!(
        calc.point_prevalence(&[label("v1")], &[7], &wrong),
        Err(AbstcalError::NameCountMismatch {
            expected: 1,
            supplied: 2
        })
    ));
}

#[test]
fn unknown_target_visits_are_rejected() {
    let tlfb = TlfbDataset::from_records(cover("s", 1, 10, &[]));
    let visits =
        VisitDataset::from_records(visits_at("s", &[("v1", 10)]), vec![label("v1")]);
    let calc = AbstinenceCalculator::new(&tlfb, &visits, 0.0, Assumption::Itt, false);
    assert!(matches!(
        calc.point_prevalence(&[label("v9")], &[7], &VariableNames::Infer),
        Err(AbstcalError::UnknownVisit(_))
    ));
}
