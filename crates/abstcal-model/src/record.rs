use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque study subject identifier.
///
/// Source files may carry numeric or string ids; both are kept verbatim as
/// trimmed text so that ids round-trip into the output tables unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Label of a clinic visit. Labels form a study-wide ordered sequence
/// (the expected visit order) supplied with the visit dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitLabel(pub String);

impl VisitLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VisitLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VisitLabel {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One day of self-reported (or biochemical) substance use.
///
/// Date and amount are optional only so that raw rows with missing cells
/// can enter the store and be counted by `drop_missing`; every record that
/// survives normalization has both present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub subject: SubjectId,
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
}

impl DailyRecord {
    pub fn new(subject: impl Into<SubjectId>, date: NaiveDate, amount: f64) -> Self {
        Self {
            subject: subject.into(),
            date: Some(date),
            amount: Some(amount),
        }
    }

    /// True when both date and amount are present.
    pub fn is_complete(&self) -> bool {
        self.date.is_some() && self.amount.is_some()
    }
}

/// A subject's (possibly missing) date for one expected visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub subject: SubjectId,
    pub visit: VisitLabel,
    pub date: Option<NaiveDate>,
}

impl VisitRecord {
    pub fn new(subject: impl Into<SubjectId>, visit: impl Into<VisitLabel>, date: NaiveDate) -> Self {
        Self {
            subject: subject.into(),
            visit: visit.into(),
            date: Some(date),
        }
    }
}
