//! TLFB and biochemical file extraction: rows of (id, date, amount).

use anyhow::{Result, bail};
use tracing::warn;

use abstcal_model::{DailyRecord, SubjectId};

use crate::csv::RawTable;
use crate::dates::{parse_amount, parse_date};

/// Extract daily records from a loaded table. The file must carry `id`,
/// `date`, and `amount` columns (case-insensitive). Rows with blank ids
/// are skipped with a warning; unparseable dates or amounts survive as
/// missing fields for the normalization stage to count and drop.
pub fn daily_records(table: &RawTable) -> Result<Vec<DailyRecord>> {
    let Some(id_col) = table.column("id") else {
        bail!("TLFB file is missing the id column");
    };
    let Some(date_col) = table.column("date") else {
        bail!("TLFB file is missing the date column");
    };
    let Some(amount_col) = table.column("amount") else {
        bail!("TLFB file is missing the amount column");
    };
    let mut records = Vec::with_capacity(table.rows.len());
    let mut blank_ids = 0usize;
    for row in &table.rows {
        let id = table.cell(row, id_col);
        if id.is_empty() {
            blank_ids += 1;
            continue;
        }
        records.push(DailyRecord {
            subject: SubjectId::from(id),
            date: parse_date(table.cell(row, date_col)),
            amount: parse_amount(table.cell(row, amount_col)),
        });
    }
    if blank_ids > 0 {
        warn!(blank_ids, "skipped rows without a subject id");
    }
    Ok(records)
}
