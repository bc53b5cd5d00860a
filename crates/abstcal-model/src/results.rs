//! Result tables produced by the abstinence engine.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::SubjectId;

/// Ternary abstinence outcome for one subject and variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbstinenceStatus {
    Abstinent,
    NonAbstinent,
    /// The subject could not be scored for this variable (missing visit
    /// date, missing required records under Responders-Only, or absent
    /// from the contributing table entirely).
    #[default]
    NotApplicable,
}

impl std::fmt::Display for AbstinenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abstinent => f.write_str("1"),
            Self::NonAbstinent => f.write_str("0"),
            Self::NotApplicable => f.write_str("NA"),
        }
    }
}

/// Wide per-subject table: one column per named variable.
///
/// Rows are kept parallel to `variables`; subjects absent from a merged
/// input table get the column's missing value rather than being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideTable<T> {
    pub variables: Vec<String>,
    pub rows: BTreeMap<SubjectId, Vec<T>>,
}

impl<T: Clone + Default> WideTable<T> {
    pub fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            rows: BTreeMap::new(),
        }
    }

    /// Row for a subject, created filled with the missing value.
    pub fn row_mut(&mut self, subject: &SubjectId) -> &mut Vec<T> {
        let width = self.variables.len();
        self.rows
            .entry(subject.clone())
            .or_insert_with(|| vec![T::default(); width])
    }

    pub fn set(&mut self, subject: &SubjectId, column: usize, value: T) {
        self.row_mut(subject)[column] = value;
    }

    pub fn get(&self, subject: &SubjectId, variable: &str) -> Option<&T> {
        let column = self.variables.iter().position(|name| name == variable)?;
        self.rows.get(subject)?.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Per-variable abstinence outcomes.
pub type AbstinenceTable = WideTable<AbstinenceStatus>;

/// Per-variable first-lapse dates (None when no lapse occurred or the
/// subject was not scorable).
pub type LapseTable = WideTable<Option<NaiveDate>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_default_to_not_applicable() {
        let mut table = AbstinenceTable::new(vec!["abst_pp7_v2".to_string()]);
        let subject = SubjectId::from("1000");
        table.set(&subject, 0, AbstinenceStatus::Abstinent);
        assert_eq!(
            table.get(&subject, "abst_pp7_v2"),
            Some(&AbstinenceStatus::Abstinent)
        );
        let other = SubjectId::from("1001");
        table.row_mut(&other);
        assert_eq!(
            table.get(&other, "abst_pp7_v2"),
            Some(&AbstinenceStatus::NotApplicable)
        );
    }

    #[test]
    fn status_serializes() {
        let json = serde_json::to_string(&AbstinenceStatus::NonAbstinent).expect("serialize");
        assert_eq!(json, "\"non-abstinent\"");
        let round: AbstinenceStatus = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(round, AbstinenceStatus::NonAbstinent);
    }
}
