//! Outer-join of per-algorithm result tables into one wide table.

use abstcal_model::WideTable;

/// Merge tables on subject, in input order. Subjects absent from a given
/// table get that table's columns filled with the missing value rather
/// than being dropped.
pub fn merge_tables<T: Clone + Default>(tables: &[WideTable<T>]) -> WideTable<T> {
    let variables = tables
        .iter()
        .flat_map(|table| table.variables.iter().cloned())
        .collect();
    let mut merged = WideTable::new(variables);
    let subjects: Vec<_> = tables
        .iter()
        .flat_map(|table| table.rows.keys().cloned())
        .collect();
    for subject in subjects {
        merged.row_mut(&subject);
    }
    let mut offset = 0usize;
    for table in tables {
        for (subject, row) in &table.rows {
            let merged_row = merged.row_mut(subject);
            for (index, value) in row.iter().enumerate() {
                merged_row[offset + index] = value.clone();
            }
        }
        offset += table.variables.len();
    }
    merged
}
