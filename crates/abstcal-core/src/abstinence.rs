//! The three abstinence scoring algorithms: point-prevalence, continuous,
//! and prolonged, under the Intent-to-Treat or Responders-Only
//! missing-data assumption.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use tracing::debug;

use abstcal_model::{
    AbstcalError, AbstinenceStatus, AbstinenceTable, Assumption, LapseDefinition, LapseTable,
    Result, SubjectId, VariableNames, VisitLabel,
};

use crate::dataset::{TlfbDataset, VisitDataset};

/// Scores abstinence variables from cleaned TLFB and visit datasets.
///
/// The datasets are read-only from here on; each method produces one
/// table covering the union of TLFB and visit subjects, so that no
/// subject silently disappears from the output.
pub struct AbstinenceCalculator<'a> {
    tlfb: &'a TlfbDataset,
    visits: &'a VisitDataset,
    cutoff: f64,
    assumption: Assumption,
    including_end: bool,
}

impl<'a> AbstinenceCalculator<'a> {
    pub fn new(
        tlfb: &'a TlfbDataset,
        visits: &'a VisitDataset,
        cutoff: f64,
        assumption: Assumption,
        including_end: bool,
    ) -> Self {
        Self {
            tlfb,
            visits,
            cutoff,
            assumption,
            including_end,
        }
    }

    /// Point-prevalence abstinence: for each look-back window length and
    /// each requested visit, abstinent iff every day in the window is at
    /// or below the cutoff.
    pub fn point_prevalence(
        &self,
        target_visits: &[VisitLabel],
        window_lengths: &[u32],
        names: &VariableNames,
    ) -> Result<AbstinenceTable> {
        self.check_visits(target_visits)?;
        let mut inferred = Vec::new();
        for window in window_lengths {
            for visit in target_visits {
                inferred.push(format!("abst_pp{window}_{visit}"));
            }
        }
        let variables = resolve_names(inferred, names)?;
        let mut table = AbstinenceTable::new(variables);
        let subjects = self.subjects();
        let mut column = 0usize;
        for window in window_lengths {
            for visit in target_visits {
                for subject in &subjects {
                    let days = self.tlfb.day_amounts(subject);
                    let status = match self.visits.date_of(subject, visit) {
                        None => AbstinenceStatus::NotApplicable,
                        Some(visit_date) => {
                            let start = visit_date - Days::new(u64::from(*window));
                            let end = self.window_end(visit_date);
                            self.score_window(&days, start, end)
                        }
                    };
                    table.set(subject, column, status);
                }
                column += 1;
            }
        }
        debug!(variables = table.variables.len(), "scored point-prevalence abstinence");
        Ok(table)
    }

    /// Continuous abstinence from a fixed start visit to each requested
    /// visit. Each window is scored independently so an upstream gap only
    /// affects the visits whose window it falls in.
    pub fn continuous(
        &self,
        start_visit: &VisitLabel,
        target_visits: &[VisitLabel],
        names: &VariableNames,
    ) -> Result<AbstinenceTable> {
        self.check_visits(std::slice::from_ref(start_visit))?;
        self.check_visits(target_visits)?;
        let inferred = target_visits
            .iter()
            .map(|visit| format!("abst_cont_{start_visit}_{visit}"))
            .collect();
        let variables = resolve_names(inferred, names)?;
        let mut table = AbstinenceTable::new(variables);
        let subjects = self.subjects();
        for (column, visit) in target_visits.iter().enumerate() {
            for subject in &subjects {
                let days = self.tlfb.day_amounts(subject);
                let status = match (
                    self.visits.date_of(subject, start_visit),
                    self.visits.date_of(subject, visit),
                ) {
                    (Some(start), Some(visit_date)) => {
                        self.score_window(&days, start, self.window_end(visit_date))
                    }
                    _ => AbstinenceStatus::NotApplicable,
                };
                table.set(subject, column, status);
            }
        }
        debug!(variables = table.variables.len(), "scored continuous abstinence");
        Ok(table)
    }

    /// Prolonged abstinence after a quit visit: violations inside the
    /// grace period never count; after it, the first day the lapse
    /// definition is violated marks the subject non-abstinent for every
    /// requested visit at or after that date. Also emits the first-lapse
    /// dates as a parallel table.
    pub fn prolonged(
        &self,
        quit_visit: &VisitLabel,
        target_visits: &[VisitLabel],
        definitions: &[LapseDefinition],
        grace_days: u32,
        names: &VariableNames,
    ) -> Result<(AbstinenceTable, LapseTable)> {
        self.check_visits(std::slice::from_ref(quit_visit))?;
        self.check_visits(target_visits)?;
        let mut inferred = Vec::new();
        for definition in definitions {
            for visit in target_visits {
                inferred.push(format!(
                    "abst_prol{grace_days}_{}_{visit}",
                    definition_token(definition)
                ));
            }
        }
        let variables = resolve_names(inferred, names)?;
        let mut table = AbstinenceTable::new(variables);
        let lapse_variables = definitions
            .iter()
            .map(|definition| format!("lapse_{}", definition_token(definition)))
            .collect();
        let mut lapses = LapseTable::new(lapse_variables);
        let subjects = self.subjects();
        for subject in &subjects {
            let days = self.tlfb.day_amounts(subject);
            let quit_date = self.visits.date_of(subject, quit_visit);
            lapses.row_mut(subject);
            for (def_index, definition) in definitions.iter().enumerate() {
                let Some(quit_date) = quit_date else {
                    // Without a quit date every variable stays
                    // not-applicable and no lapse can be dated.
                    continue;
                };
                let grace_end = quit_date + Days::new(u64::from(grace_days));
                let first_lapse = self.first_lapse(&days, grace_end, definition);
                lapses.set(subject, def_index, first_lapse);
                for (visit_index, visit) in target_visits.iter().enumerate() {
                    let column = def_index * target_visits.len() + visit_index;
                    let status = match self.visits.date_of(subject, visit) {
                        None => AbstinenceStatus::NotApplicable,
                        Some(visit_date) if visit_date < quit_date => {
                            AbstinenceStatus::NotApplicable
                        }
                        Some(visit_date) => {
                            let end = self.window_end(visit_date);
                            self.prolonged_status(&days, grace_end, end, first_lapse)
                        }
                    };
                    table.set(subject, column, status);
                }
            }
        }
        debug!(variables = table.variables.len(), "scored prolonged abstinence");
        Ok((table, lapses))
    }

    /// Union of TLFB and visit subjects.
    fn subjects(&self) -> Vec<SubjectId> {
        let mut subjects: BTreeSet<SubjectId> = self.tlfb.subjects().cloned().collect();
        subjects.extend(self.visits.subjects().cloned());
        subjects.into_iter().collect()
    }

    fn check_visits(&self, labels: &[VisitLabel]) -> Result<()> {
        for label in labels {
            if !self.visits.expected().contains(label) {
                return Err(AbstcalError::UnknownVisit(label.to_string()));
            }
        }
        Ok(())
    }

    /// Window end for a visit date: the date itself when including-end,
    /// otherwise the day before.
    fn window_end(&self, visit_date: NaiveDate) -> NaiveDate {
        if self.including_end {
            visit_date
        } else {
            visit_date - Days::new(1)
        }
    }

    /// Score a closed day window. An empty window (end before start) is
    /// vacuously abstinent.
    fn score_window(
        &self,
        days: &BTreeMap<NaiveDate, f64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AbstinenceStatus {
        let mut violated = false;
        let mut date = start;
        while date <= end {
            match days.get(&date) {
                None => {
                    return match self.assumption {
                        Assumption::Itt => AbstinenceStatus::NonAbstinent,
                        Assumption::Ro => AbstinenceStatus::NotApplicable,
                    };
                }
                Some(amount) if *amount > self.cutoff => violated = true,
                Some(_) => {}
            }
            date = date + Days::new(1);
        }
        if violated {
            AbstinenceStatus::NonAbstinent
        } else {
            AbstinenceStatus::Abstinent
        }
    }

    /// First post-grace day the lapse definition is violated, scanning up
    /// to the subject's last recorded day.
    ///
    /// Threshold sums use observed amounts only and never reach back into
    /// the grace period. Under ITT a missing day violates `NotAllowed`
    /// directly (missing counts as non-abstinent); for threshold
    /// definitions a missing day contributes nothing here and is handled
    /// by the per-visit missing-day rule instead.
    fn first_lapse(
        &self,
        days: &BTreeMap<NaiveDate, f64>,
        grace_end: NaiveDate,
        definition: &LapseDefinition,
    ) -> Option<NaiveDate> {
        let last = *days.keys().next_back()?;
        let mut date = grace_end;
        while date <= last {
            let observed = days.get(&date);
            let lapsed = match *definition {
                LapseDefinition::NotAllowed => match observed {
                    Some(amount) => *amount > self.cutoff,
                    None => self.assumption == Assumption::Itt,
                },
                LapseDefinition::Amount { threshold } => {
                    observed.is_some_and(|amount| *amount >= threshold)
                }
                LapseDefinition::AmountOverWindow {
                    threshold,
                    window_days,
                } => {
                    let window_start =
                        (date - Days::new(u64::from(window_days) - 1)).max(grace_end);
                    let total: f64 = days.range(window_start..=date).map(|(_, a)| a).sum();
                    total >= threshold
                }
            };
            if lapsed {
                return Some(date);
            }
            date = date + Days::new(1);
        }
        None
    }

    /// Status of one requested visit under a prolonged definition.
    fn prolonged_status(
        &self,
        days: &BTreeMap<NaiveDate, f64>,
        grace_end: NaiveDate,
        window_end: NaiveDate,
        first_lapse: Option<NaiveDate>,
    ) -> AbstinenceStatus {
        if window_end < grace_end {
            // The whole window sits inside the grace period.
            return AbstinenceStatus::Abstinent;
        }
        let missing = {
            let mut date = grace_end;
            let mut found = false;
            while date <= window_end {
                if !days.contains_key(&date) {
                    found = true;
                    break;
                }
                date = date + Days::new(1);
            }
            found
        };
        if self.assumption == Assumption::Ro && missing {
            return AbstinenceStatus::NotApplicable;
        }
        if first_lapse.is_some_and(|lapse| lapse <= window_end) {
            return AbstinenceStatus::NonAbstinent;
        }
        if self.assumption == Assumption::Itt && missing {
            return AbstinenceStatus::NonAbstinent;
        }
        AbstinenceStatus::Abstinent
    }
}

/// Short token describing a lapse definition inside a variable name.
fn definition_token(definition: &LapseDefinition) -> String {
    match *definition {
        LapseDefinition::NotAllowed => "false".to_string(),
        LapseDefinition::Amount { threshold } => format!("{threshold}"),
        LapseDefinition::AmountOverWindow {
            threshold,
            window_days,
        } => format!("{threshold}_{window_days}d"),
    }
}

/// Apply custom names, requiring an exact count match.
fn resolve_names(inferred: Vec<String>, names: &VariableNames) -> Result<Vec<String>> {
    match names {
        VariableNames::Infer => Ok(inferred),
        VariableNames::Custom(custom) => {
            if custom.len() != inferred.len() {
                return Err(AbstcalError::NameCountMismatch {
                    expected: inferred.len(),
                    supplied: custom.len(),
                });
            }
            Ok(custom.clone())
        }
    }
}
