//! Subcommand entry points: full pipeline runs and dataset inspection.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, info_span};

use abstcal_core::{RawInput, RunOutput, TlfbDataset, VisitDataset, run};
use abstcal_ingest::{RawTable, daily_records, visit_records};
use abstcal_model::NormalizationSummary;

use crate::cli::{InspectArgs, RunArgs};
use crate::config::RunConfig;
use crate::output::{write_abstinence, write_lapses};

/// Parsed input rows, before any cleaning.
pub struct LoadedInput {
    pub input: RawInput,
    pub tlfb_rows: usize,
    pub visit_rows: usize,
    pub biochemical_rows: usize,
}

/// Everything the run summary needs to render.
pub struct RunReport {
    pub output: RunOutput,
    pub tlfb_rows: usize,
    pub visit_rows: usize,
    pub biochemical_rows: usize,
    pub abstinence_path: Option<PathBuf>,
    pub lapse_path: Option<PathBuf>,
}

pub fn run_pipeline(args: &RunArgs) -> Result<RunReport> {
    let span = info_span!("run", config = %args.config.display());
    let _guard = span.enter();
    let start = Instant::now();

    let config = RunConfig::load(&args.config)?;
    let request = config.to_request()?;
    let loaded = load_input(&config, &args.config)?;
    let tlfb_rows = loaded.tlfb_rows;
    let visit_rows = loaded.visit_rows;
    let biochemical_rows = loaded.biochemical_rows;

    let output = run(loaded.input, &request)?;

    let (abstinence_path, lapse_path) = if args.dry_run {
        info!("dry run, skipping output files");
        (None, None)
    } else {
        let output_dir = output_dir(args);
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("create output directory {}", output_dir.display()))?;
        let abstinence_path = if output.abstinence.is_empty() {
            None
        } else {
            let path = output_dir.join("abstinence_data.csv");
            write_abstinence(&path, &output.abstinence)?;
            Some(path)
        };
        let lapse_path = if output.lapses.is_empty() {
            None
        } else {
            let path = output_dir.join("lapse_data.csv");
            write_lapses(&path, &output.lapses)?;
            Some(path)
        };
        (abstinence_path, lapse_path)
    };
    info!(duration_ms = start.elapsed().as_millis(), "run complete");

    Ok(RunReport {
        output,
        tlfb_rows,
        visit_rows,
        biochemical_rows,
        abstinence_path,
        lapse_path,
    })
}

/// Overview of one dataset after normalization, for `inspect`.
pub struct DatasetOverview {
    pub name: &'static str,
    pub rows_read: usize,
    pub subjects: usize,
    pub records: usize,
    pub span: Option<(NaiveDate, NaiveDate)>,
    pub summary: NormalizationSummary,
}

pub struct InspectReport {
    pub datasets: Vec<DatasetOverview>,
}

/// Load and normalize each configured dataset without scoring anything.
pub fn inspect(args: &InspectArgs) -> Result<InspectReport> {
    let span = info_span!("inspect", config = %args.config.display());
    let _guard = span.enter();

    let config = RunConfig::load(&args.config)?;
    // Surfaces configuration errors (bad lapse texts and the like) even
    // though the request itself goes unused here.
    config.to_request()?;
    let loaded = load_input(&config, &args.config)?;

    let mut datasets = Vec::new();

    let mut tlfb = TlfbDataset::from_records(loaded.input.tlfb);
    let summary = tlfb.normalize(&config.tlfb)?;
    datasets.push(DatasetOverview {
        name: "TLFB",
        rows_read: loaded.tlfb_rows,
        subjects: tlfb.store().subject_count(),
        records: tlfb.len(),
        span: store_span(tlfb.store().iter().filter_map(|record| record.date)),
        summary,
    });

    if !loaded.input.biochemical.is_empty() {
        let mut bio = TlfbDataset::from_records(loaded.input.biochemical);
        let cleaning = config
            .biochemical
            .as_ref()
            .map(|section| section.cleaning.clone())
            .unwrap_or_default();
        let summary = bio.normalize(&cleaning)?;
        datasets.push(DatasetOverview {
            name: "Biochemical",
            rows_read: loaded.biochemical_rows,
            subjects: bio.store().subject_count(),
            records: bio.len(),
            span: store_span(bio.store().iter().filter_map(|record| record.date)),
            summary,
        });
    }

    let mut visits = VisitDataset::from_records(loaded.input.visits, loaded.input.expected_visits);
    let summary = visits.normalize(&config.visit)?;
    datasets.push(DatasetOverview {
        name: "Visit",
        rows_read: loaded.visit_rows,
        subjects: visits.store().subject_count(),
        records: visits.len(),
        span: store_span(visits.store().iter().filter_map(|record| record.date)),
        summary,
    });

    Ok(InspectReport { datasets })
}

fn load_input(config: &RunConfig, config_path: &Path) -> Result<LoadedInput> {
    let tlfb_path = config.resolve(config_path, &config.data.tlfb_file);
    let tlfb_table = RawTable::read(&tlfb_path)?;
    let tlfb = daily_records(&tlfb_table)
        .with_context(|| format!("extract TLFB records from {}", tlfb_path.display()))?;

    let visit_path = config.resolve(config_path, &config.data.visit_file);
    let visit_table = RawTable::read(&visit_path)?;
    let parsed_visits = visit_records(&visit_table, config.data.visit_format.into())
        .with_context(|| format!("extract visit records from {}", visit_path.display()))?;
    let expected = if config.data.expected_visits.is_empty() {
        parsed_visits.visit_order.clone()
    } else {
        config.expected_visits()
    };

    let biochemical = match &config.data.biochemical_file {
        Some(file) => {
            let path = config.resolve(config_path, file);
            let table = RawTable::read(&path)?;
            daily_records(&table)
                .with_context(|| format!("extract biochemical records from {}", path.display()))?
        }
        None => Vec::new(),
    };

    info!(
        tlfb_rows = tlfb.len(),
        visit_rows = parsed_visits.records.len(),
        biochemical_rows = biochemical.len(),
        "loaded input files"
    );
    Ok(LoadedInput {
        tlfb_rows: tlfb.len(),
        visit_rows: parsed_visits.records.len(),
        biochemical_rows: biochemical.len(),
        input: RawInput {
            tlfb,
            biochemical,
            visits: parsed_visits.records,
            expected_visits: expected,
        },
    })
}

fn output_dir(args: &RunArgs) -> PathBuf {
    match &args.output_dir {
        Some(dir) => dir.clone(),
        None => args
            .config
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    }
}

fn store_span(dates: impl Iterator<Item = NaiveDate>) -> Option<(NaiveDate, NaiveDate)> {
    dates.fold(None, |span, date| match span {
        None => Some((date, date)),
        Some((first, last)) => Some((first.min(date), last.max(date))),
    })
}
