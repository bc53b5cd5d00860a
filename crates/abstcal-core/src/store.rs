//! Ordered multimap of dated records, the substrate shared by the TLFB
//! and visit datasets.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use abstcal_model::{DailyRecord, SubjectId, VisitRecord};

/// A record the store can order: it belongs to a subject and may carry a
/// date. Dateless records sort before dated ones within a subject.
pub trait TemporalRecord {
    fn subject(&self) -> &SubjectId;
    fn date(&self) -> Option<NaiveDate>;
}

impl TemporalRecord for DailyRecord {
    fn subject(&self) -> &SubjectId {
        &self.subject
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

impl TemporalRecord for VisitRecord {
    fn subject(&self) -> &SubjectId {
        &self.subject
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }
}

/// Per-subject date-ordered record collection.
///
/// Records with the same date keep insertion order until duplicate
/// resolution runs; the store itself has no opinion on duplicates.
#[derive(Debug, Clone)]
pub struct TemporalStore<R> {
    by_subject: BTreeMap<SubjectId, Vec<R>>,
}

// Manual impl: the derive would demand `R: Default`, which the record
// types neither have nor need.
impl<R> Default for TemporalStore<R> {
    fn default() -> Self {
        Self {
            by_subject: BTreeMap::new(),
        }
    }
}

impl<R: TemporalRecord> TemporalStore<R> {
    pub fn new() -> Self {
        Self {
            by_subject: BTreeMap::new(),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert keeping the subject's records sorted by date, after any
    /// existing records with the same date.
    pub fn insert(&mut self, record: R) {
        let records = self.by_subject.entry(record.subject().clone()).or_default();
        let position = records.partition_point(|existing| existing.date() <= record.date());
        records.insert(position, record);
    }

    pub fn records(&self, subject: &SubjectId) -> &[R] {
        self.by_subject.get(subject).map_or(&[], Vec::as_slice)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.by_subject.keys()
    }

    pub fn subject_count(&self) -> usize {
        self.by_subject.len()
    }

    pub fn len(&self) -> usize {
        self.by_subject.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_subject.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.by_subject.values().flatten()
    }

    /// Remove records failing the predicate; returns the count removed.
    /// Subjects left without records disappear from the store.
    pub fn retain(&mut self, mut predicate: impl FnMut(&R) -> bool) -> usize {
        let before = self.len();
        for records in self.by_subject.values_mut() {
            records.retain(|record| predicate(record));
        }
        self.by_subject.retain(|_, records| !records.is_empty());
        before - self.len()
    }

    /// Remove whole subjects failing the predicate; returns records removed.
    pub fn retain_subjects(&mut self, mut predicate: impl FnMut(&SubjectId) -> bool) -> usize {
        let before = self.len();
        self.by_subject.retain(|subject, _| predicate(subject));
        before - self.len()
    }

    /// Mutate each subject's record vector in place. Callers replacing
    /// records are responsible for keeping date order.
    pub fn for_each_subject_mut(&mut self, mut f: impl FnMut(&SubjectId, &mut Vec<R>)) {
        for (subject, records) in &mut self.by_subject {
            f(subject, records);
        }
        self.by_subject.retain(|_, records| !records.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 2, d).expect("valid date")
    }

    #[test]
    fn insert_keeps_date_order_with_stable_ties() {
        let mut store = TemporalStore::new();
        store.insert(DailyRecord::new("1000", day(5), 12.0));
        store.insert(DailyRecord::new("1000", day(3), 10.0));
        store.insert(DailyRecord::new("1000", day(3), 7.0));
        let records = store.records(&SubjectId::from("1000"));
        let amounts: Vec<f64> = records.iter().filter_map(|r| r.amount).collect();
        assert_eq!(amounts, vec![10.0, 7.0, 12.0]);
    }

    #[test]
    fn default_store_is_empty_without_record_defaults() {
        let store: TemporalStore<DailyRecord> = TemporalStore::default();
        assert!(store.is_empty());
        assert_eq!(store.subject_count(), 0);
    }

    #[test]
    fn retain_reports_removed_and_drops_empty_subjects() {
        let mut store = TemporalStore::new();
        store.insert(DailyRecord::new("1000", day(3), 10.0));
        store.insert(DailyRecord::new("1001", day(4), 0.0));
        let removed = store.retain(|record| record.amount != Some(0.0));
        assert_eq!(removed, 1);
        assert_eq!(store.subject_count(), 1);
    }
}
