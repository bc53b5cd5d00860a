//! Visit file extraction, long and wide formats.

use anyhow::{Result, bail};
use tracing::warn;

use abstcal_model::{SubjectId, VisitLabel, VisitRecord};

use crate::csv::RawTable;
use crate::dates::parse_date;

/// File layout of the visit data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFormat {
    /// One row per (id, visit, date).
    Long,
    /// One row per id, one date column per visit.
    Wide,
}

/// Extracted visit rows plus the visit order the file implies.
#[derive(Debug, Clone)]
pub struct VisitTable {
    pub records: Vec<VisitRecord>,
    /// For wide files, the column order; for long files, first appearance
    /// order. Callers may override with an explicit expected order.
    pub visit_order: Vec<VisitLabel>,
}

pub fn visit_records(table: &RawTable, format: VisitFormat) -> Result<VisitTable> {
    match format {
        VisitFormat::Long => long_records(table),
        VisitFormat::Wide => wide_records(table),
    }
}

fn long_records(table: &RawTable) -> Result<VisitTable> {
    let Some(id_col) = table.column("id") else {
        bail!("visit file is missing the id column");
    };
    let Some(visit_col) = table.column("visit") else {
        bail!("long-format visit file is missing the visit column");
    };
    let Some(date_col) = table.column("date") else {
        bail!("long-format visit file is missing the date column");
    };
    let mut records = Vec::with_capacity(table.rows.len());
    let mut visit_order: Vec<VisitLabel> = Vec::new();
    let mut blank = 0usize;
    for row in &table.rows {
        let id = table.cell(row, id_col);
        let visit = table.cell(row, visit_col);
        if id.is_empty() || visit.is_empty() {
            blank += 1;
            continue;
        }
        let label = VisitLabel::from(visit);
        if !visit_order.contains(&label) {
            visit_order.push(label.clone());
        }
        records.push(VisitRecord {
            subject: SubjectId::from(id),
            visit: label,
            date: parse_date(table.cell(row, date_col)),
        });
    }
    if blank > 0 {
        warn!(blank, "skipped visit rows without an id or visit label");
    }
    Ok(VisitTable {
        records,
        visit_order,
    })
}

fn wide_records(table: &RawTable) -> Result<VisitTable> {
    let Some(id_col) = table.column("id") else {
        bail!("visit file is missing the id column");
    };
    let visit_order: Vec<VisitLabel> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != id_col)
        .map(|(_, header)| VisitLabel::from(header.as_str()))
        .collect();
    if visit_order.is_empty() {
        bail!("wide-format visit file has no visit columns");
    }
    let mut records = Vec::new();
    let mut blank = 0usize;
    for row in &table.rows {
        let id = table.cell(row, id_col);
        if id.is_empty() {
            blank += 1;
            continue;
        }
        for (index, header) in table.headers.iter().enumerate() {
            if index == id_col {
                continue;
            }
            records.push(VisitRecord {
                subject: SubjectId::from(id),
                visit: VisitLabel::from(header.as_str()),
                date: parse_date(table.cell(row, index)),
            });
        }
    }
    if blank > 0 {
        warn!(blank, "skipped visit rows without a subject id");
    }
    Ok(VisitTable {
        records,
        visit_order,
    })
}
