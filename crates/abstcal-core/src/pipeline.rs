//! Full batch run: raw records + configuration in, cleaned-data summaries
//! and wide result tables out. Stateless between runs.

use tracing::{info, info_span};

use abstcal_model::{
    AbstcalError, AbstinenceTable, Assumption, BiochemicalConfig, BiochemicalSummary, DailyRecord,
    DuplicateMode, GapImputationSummary, LapseDefinition, LapseTable, NormalizationSummary,
    Result, TlfbOptions, VariableNames, VisitImputationMode, VisitImputationSummary, VisitLabel,
    VisitOptions, VisitRecord,
};

use crate::abstinence::AbstinenceCalculator;
use crate::biochemical::{expand_decay, merge_biochemical};
use crate::dataset::{TlfbDataset, VisitDataset};
use crate::impute_tlfb::impute_gaps;
use crate::impute_visit::impute_visit_dates;
use crate::merge::merge_tables;

/// Raw tabular input, already parsed into typed records.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pub tlfb: Vec<DailyRecord>,
    pub biochemical: Vec<DailyRecord>,
    pub visits: Vec<VisitRecord>,
    /// Expected visit order; inferred from the data when empty.
    pub expected_visits: Vec<VisitLabel>,
}

/// Cleaning settings plus verification config for the biochemical dataset.
#[derive(Debug, Clone)]
pub struct BiochemicalRequest {
    pub cleaning: TlfbOptions,
    pub config: BiochemicalConfig,
}

/// Point-prevalence selection.
#[derive(Debug, Clone, Default)]
pub struct PointPrevalenceSpec {
    pub visits: Vec<VisitLabel>,
    /// Look-back window lengths in days.
    pub window_lengths: Vec<u32>,
    pub names: VariableNames,
}

/// Prolonged-abstinence selection.
#[derive(Debug, Clone)]
pub struct ProlongedSpec {
    pub quit_visit: VisitLabel,
    pub visits: Vec<VisitLabel>,
    pub definitions: Vec<LapseDefinition>,
    pub grace_days: u32,
    pub names: VariableNames,
}

/// Continuous-abstinence selection.
#[derive(Debug, Clone)]
pub struct ContinuousSpec {
    pub start_visit: VisitLabel,
    pub visits: Vec<VisitLabel>,
    pub names: VariableNames,
}

/// Everything one abstinence run needs besides the raw data.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub tlfb: TlfbOptions,
    pub visit: VisitOptions,
    pub biochemical: Option<BiochemicalRequest>,
    pub assumption: Assumption,
    /// Whether each visit date is itself the end of the examined window;
    /// otherwise the window ends the day before.
    pub including_end: bool,
    pub point_prevalence: Option<PointPrevalenceSpec>,
    pub prolonged: Option<ProlongedSpec>,
    pub continuous: Option<ContinuousSpec>,
}

/// Per-stage summaries and the merged result tables.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub tlfb_summary: NormalizationSummary,
    pub gap_imputation: GapImputationSummary,
    pub biochemical_summary: Option<(NormalizationSummary, BiochemicalSummary)>,
    pub visit_summary: NormalizationSummary,
    pub visit_imputation: VisitImputationSummary,
    pub abstinence: AbstinenceTable,
    pub lapses: LapseTable,
}

/// Execute a full run. Configuration errors surface before any dataset is
/// mutated; per-subject data problems degrade individual results instead.
pub fn run(input: RawInput, request: &RunRequest) -> Result<RunOutput> {
    validate(&input, request)?;

    // Visit branch first: the TLFB last-record extension is bounded by
    // each subject's latest visit date, imputed dates included.
    let span = info_span!("visit_stage");
    let (visits, visit_summary, visit_imputation) = {
        let _guard = span.enter();
        let mut visits = VisitDataset::from_records(input.visits, input.expected_visits);
        let summary = visits.normalize(&request.visit)?;
        let imputation = match (&request.visit.anchor_visit, request.visit.imputation_mode) {
            (Some(anchor), mode) if mode != VisitImputationMode::None => {
                impute_visit_dates(&mut visits, mode, anchor)?
            }
            _ => VisitImputationSummary::default(),
        };
        (visits, summary, imputation)
    };

    let span = info_span!("tlfb_stage");
    let (mut tlfb, tlfb_summary, biochemical_summary) = {
        let _guard = span.enter();
        let mut tlfb = TlfbDataset::from_records(input.tlfb);
        let summary = tlfb.normalize(&request.tlfb)?;
        let biochemical_summary = match &request.biochemical {
            Some(bio_request) if !input.biochemical.is_empty() => {
                let mut bio = TlfbDataset::from_records(input.biochemical);
                let mut bio_summary = BiochemicalSummary::default();
                if let Some(decay) = bio_request.config.decay {
                    bio_summary.decay_rows = expand_decay(&mut bio, &decay);
                }
                let cleaning = bio_request.cleaning.clone();
                let normalization = bio.normalize(&cleaning)?;
                bio_summary.overridden_days = merge_biochemical(
                    &mut tlfb,
                    &bio,
                    request.tlfb.cutoff,
                    &bio_request.config,
                );
                Some((normalization, bio_summary))
            }
            _ => None,
        };
        (tlfb, summary, biochemical_summary)
    };

    let gap_imputation = {
        let span = info_span!("gap_imputation");
        let _guard = span.enter();
        impute_gaps(&mut tlfb, &request.tlfb.imputation, |subject| {
            visits.latest_date(subject)
        })
    };

    let span = info_span!("abstinence");
    let (abstinence, lapses) = {
        let _guard = span.enter();
        let calculator = AbstinenceCalculator::new(
            &tlfb,
            &visits,
            request.tlfb.cutoff,
            request.assumption,
            request.including_end,
        );
        let mut abstinence_tables = Vec::new();
        let mut lapse_tables = Vec::new();
        if let Some(spec) = &request.point_prevalence {
            abstinence_tables.push(calculator.point_prevalence(
                &spec.visits,
                &spec.window_lengths,
                &spec.names,
            )?);
        }
        if let Some(spec) = &request.prolonged {
            let (table, lapse) = calculator.prolonged(
                &spec.quit_visit,
                &spec.visits,
                &spec.definitions,
                spec.grace_days,
                &spec.names,
            )?;
            abstinence_tables.push(table);
            lapse_tables.push(lapse);
        }
        if let Some(spec) = &request.continuous {
            abstinence_tables.push(calculator.continuous(
                &spec.start_visit,
                &spec.visits,
                &spec.names,
            )?);
        }
        (merge_tables(&abstinence_tables), merge_tables(&lapse_tables))
    };

    info!(
        subjects = abstinence.rows.len(),
        variables = abstinence.variables.len(),
        "run complete"
    );
    Ok(RunOutput {
        tlfb_summary,
        gap_imputation,
        biochemical_summary,
        visit_summary,
        visit_imputation,
        abstinence,
        lapses,
    })
}

/// Fast-fail configuration checks, before any dataset mutation.
fn validate(input: &RawInput, request: &RunRequest) -> Result<()> {
    let scoring_requested = request.point_prevalence.is_some()
        || request.prolonged.is_some()
        || request.continuous.is_some();
    if scoring_requested {
        if input.tlfb.is_empty() {
            return Err(AbstcalError::MissingDataset("TLFB"));
        }
        if input.visits.is_empty() {
            return Err(AbstcalError::MissingDataset("visit"));
        }
    }
    if request.visit.duplicate_mode == DuplicateMode::KeepMean {
        return Err(AbstcalError::NonNumericMean);
    }
    // Bounds and half-life are validated by their constructors, but a
    // deserialized request can carry unchecked values; re-check here.
    for bounds in [
        request.tlfb.bounds,
        request.biochemical.as_ref().and_then(|bio| bio.cleaning.bounds),
    ]
    .into_iter()
    .flatten()
    {
        if bounds.min > bounds.max {
            return Err(AbstcalError::InvalidRange {
                min: bounds.min.to_string(),
                max: bounds.max.to_string(),
            });
        }
    }
    if let Some(bounds) = request.visit.bounds {
        if bounds.min > bounds.max {
            return Err(AbstcalError::InvalidRange {
                min: bounds.min.to_string(),
                max: bounds.max.to_string(),
            });
        }
    }
    if request.visit.imputation_mode != VisitImputationMode::None
        && request.visit.anchor_visit.is_none()
    {
        return Err(AbstcalError::Message(
            "visit date imputation requires an anchor visit".to_string(),
        ));
    }
    if let Some(bio) = &request.biochemical {
        if let Some(decay) = bio.config.decay {
            if decay.half_life <= 0.0 {
                return Err(AbstcalError::InvalidHalfLife(decay.half_life));
            }
        }
    }
    Ok(())
}
