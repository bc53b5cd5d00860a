//! Result CSV writers.

use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use abstcal_model::{AbstinenceTable, LapseTable};

/// Write the merged abstinence table: one row per subject, `1`/`0`/`NA`
/// per variable.
pub fn write_abstinence(path: &Path, table: &AbstinenceTable) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(header(table.variables.as_slice()))?;
    for (subject, statuses) in &table.rows {
        let mut row = Vec::with_capacity(statuses.len() + 1);
        row.push(subject.to_string());
        row.extend(statuses.iter().map(ToString::to_string));
        writer.write_record(&row)?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// Write the first-lapse table: ISO dates, blank when no lapse occurred
/// or the subject was not scorable.
pub fn write_lapses(path: &Path, table: &LapseTable) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(header(table.variables.as_slice()))?;
    for (subject, dates) in &table.rows {
        let mut row = Vec::with_capacity(dates.len() + 1);
        row.push(subject.to_string());
        row.extend(
            dates
                .iter()
                .map(|date| date.map_or_else(String::new, |d| d.format("%Y-%m-%d").to_string())),
        );
        writer.write_record(&row)?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

fn header(variables: &[String]) -> Vec<String> {
    let mut header = Vec::with_capacity(variables.len() + 1);
    header.push("id".to_string());
    header.extend(variables.iter().cloned());
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use abstcal_model::{AbstinenceStatus, SubjectId};
    use chrono::NaiveDate;

    #[test]
    fn abstinence_rows_render_as_flags() {
        let mut table = AbstinenceTable::new(vec!["abst_pp7_v2".to_string()]);
        table.set(&SubjectId::from("1000"), 0, AbstinenceStatus::Abstinent);
        table.row_mut(&SubjectId::from("1001"));
        let dir = std::env::temp_dir().join("abstcal-output-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("abstinence.csv");
        write_abstinence(&path, &table).expect("write");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with("id,abst_pp7_v2"));
        assert!(text.contains("1000,1"));
        assert!(text.contains("1001,NA"));
    }

    #[test]
    fn lapse_dates_render_iso_or_blank() {
        let mut table = LapseTable::new(vec!["lapse_false".to_string()]);
        table.set(
            &SubjectId::from("1000"),
            0,
            NaiveDate::from_ymd_opt(2019, 2, 14),
        );
        table.row_mut(&SubjectId::from("1001"));
        let dir = std::env::temp_dir().join("abstcal-output-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("lapses.csv");
        write_lapses(&path, &table).expect("write");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("1000,2019-02-14"));
        assert!(text.contains("1001,\n") || text.contains("1001,\"\""));
    }
}
