//! Console summaries for runs and inspections.

use chrono::NaiveDate;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use abstcal_model::NormalizationSummary;

use crate::commands::{InspectReport, RunReport};

pub fn print_run_summary(report: &RunReport) {
    let output = &report.output;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Rows read"),
        header_cell("Missing dropped"),
        header_cell("Duplicate groups"),
        header_cell("Duplicates removed"),
        header_cell("Filtered"),
        header_cell("Outliers"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(cleaning_row("TLFB", report.tlfb_rows, &output.tlfb_summary));
    if let Some((normalization, _)) = &output.biochemical_summary {
        table.add_row(cleaning_row(
            "Biochemical",
            report.biochemical_rows,
            normalization,
        ));
    }
    table.add_row(cleaning_row(
        "Visit",
        report.visit_rows,
        &output.visit_summary,
    ));
    println!("Cleaning:");
    println!("{table}");

    println!("Imputation:");
    println!(
        "- TLFB gaps: {} days filled, {} extension days, {} gaps over limit",
        sum(&output.gap_imputation.gap_days),
        sum(&output.gap_imputation.extension_days),
        output.gap_imputation.gaps_over_limit,
    );
    if let Some(anchor) = &output.visit_imputation.anchor {
        println!(
            "- Visit dates: {} imputed from anchor {anchor}, {} subjects skipped",
            output.visit_imputation.total_imputed(),
            output.visit_imputation.skipped_subjects.len(),
        );
    }
    if let Some((_, bio)) = &output.biochemical_summary {
        println!(
            "- Biochemical: {} decay rows added, {} self-reported days overridden",
            bio.decay_rows, bio.overridden_days,
        );
    }

    println!(
        "Results: {} subjects, {} abstinence variables",
        output.abstinence.rows.len(),
        output.abstinence.variables.len(),
    );
    if let Some(path) = &report.abstinence_path {
        println!("Abstinence table: {}", path.display());
    }
    if let Some(path) = &report.lapse_path {
        println!("Lapse table: {}", path.display());
    }
}

pub fn print_inspect_summary(report: &InspectReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Rows read"),
        header_cell("Subjects"),
        header_cell("Records"),
        header_cell("Span"),
        header_cell("Missing dropped"),
        header_cell("Duplicates removed"),
        header_cell("Outliers"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=3 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for index in 5..=7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for dataset in &report.datasets {
        table.add_row(vec![
            name_cell(dataset.name),
            Cell::new(dataset.rows_read),
            Cell::new(dataset.subjects),
            Cell::new(dataset.records),
            span_cell(dataset.span),
            count_cell(dataset.summary.missing_dropped),
            count_cell(dataset.summary.duplicates_removed),
            count_cell(dataset.summary.outliers.count()),
        ]);
    }
    println!("{table}");
}

fn cleaning_row(name: &str, rows_read: usize, summary: &NormalizationSummary) -> Vec<Cell> {
    vec![
        name_cell(name),
        Cell::new(rows_read),
        count_cell(summary.missing_dropped),
        count_cell(summary.duplicate_groups),
        count_cell(summary.duplicates_removed),
        count_cell(summary.subjects_filtered),
        count_cell(summary.outliers.count()),
    ]
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn name_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count).fg(Color::Yellow)
    } else {
        Cell::new(count).fg(Color::DarkGrey)
    }
}

fn span_cell(span: Option<(NaiveDate, NaiveDate)>) -> Cell {
    match span {
        Some((first, last)) => Cell::new(format!("{first} .. {last}")),
        None => Cell::new("-").fg(Color::DarkGrey),
    }
}

fn sum(by_subject: &std::collections::BTreeMap<abstcal_model::SubjectId, usize>) -> usize {
    by_subject.values().sum()
}
