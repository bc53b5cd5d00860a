//! JSON run configuration: file locations, cleaning options, and the
//! abstinence calculations to perform.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use abstcal_core::{
    BiochemicalRequest, ContinuousSpec, PointPrevalenceSpec, ProlongedSpec, RunRequest,
};
use abstcal_ingest::VisitFormat;
use abstcal_model::{
    Assumption, BiochemicalConfig, DecayConfig, LapseDefinition, TlfbOptions, VariableNames,
    VisitLabel, VisitOptions,
};

/// Top-level run configuration, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub data: DataSection,
    #[serde(default)]
    pub tlfb: TlfbOptions,
    #[serde(default)]
    pub visit: VisitOptions,
    #[serde(default)]
    pub biochemical: Option<BiochemicalSection>,
    #[serde(default)]
    pub calculation: CalculationSection,
}

/// Input file locations and layouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSection {
    pub tlfb_file: PathBuf,
    pub visit_file: PathBuf,
    #[serde(default)]
    pub biochemical_file: Option<PathBuf>,
    #[serde(default)]
    pub visit_format: VisitFormatField,
    /// Expected visit order; inferred from the visit file when empty.
    #[serde(default)]
    pub expected_visits: Vec<String>,
}

/// Visit file layout.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisitFormatField {
    Long,
    #[default]
    Wide,
}

impl From<VisitFormatField> for VisitFormat {
    fn from(field: VisitFormatField) -> Self {
        match field {
            VisitFormatField::Long => VisitFormat::Long,
            VisitFormatField::Wide => VisitFormat::Wide,
        }
    }
}

/// Biochemical verification settings. The `cleaning` options default to the
/// TLFB section's cutoff of zero and no filtering, which suits raw CO files.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BiochemicalSection {
    #[serde(default)]
    pub cleaning: TlfbOptions,
    /// Readings at or below this value count as verified-abstinent.
    pub cutoff: f64,
    /// Amount substituted into a contradicted self-report.
    pub override_amount: f64,
    #[serde(default)]
    pub decay: Option<DecayConfig>,
}

/// Which abstinence variables to compute.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalculationSection {
    #[serde(default)]
    pub assumption: Assumption,
    /// Whether the visit date itself closes each examined window.
    #[serde(default)]
    pub including_end: bool,
    #[serde(default)]
    pub point_prevalence: Option<PointPrevalenceSection>,
    #[serde(default)]
    pub prolonged: Option<ProlongedSection>,
    #[serde(default)]
    pub continuous: Option<ContinuousSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointPrevalenceSection {
    pub visits: Vec<String>,
    pub window_lengths: Vec<u32>,
    #[serde(default)]
    pub names: VariableNames,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProlongedSection {
    pub quit_visit: String,
    pub visits: Vec<String>,
    /// Lapse definition texts, e.g. `"false"`, `"5 cigs"`, `"5 cigs/14 days"`.
    pub lapse_definitions: Vec<String>,
    pub grace_days: u32,
    #[serde(default)]
    pub names: VariableNames,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContinuousSection {
    pub start_visit: String,
    pub visits: Vec<String>,
    #[serde(default)]
    pub names: VariableNames,
}

impl RunConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("open config file {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Resolve a path from the `data` section relative to the config file.
    pub fn resolve(&self, config_path: &Path, file: &Path) -> PathBuf {
        if file.is_absolute() {
            return file.to_path_buf();
        }
        match config_path.parent() {
            Some(parent) => parent.join(file),
            None => file.to_path_buf(),
        }
    }

    /// Translate the configuration into an engine request, parsing lapse
    /// definition texts up front so syntax errors surface before any I/O.
    pub fn to_request(&self) -> Result<RunRequest> {
        let biochemical = match &self.biochemical {
            Some(section) => {
                if self.data.biochemical_file.is_none() {
                    bail!("biochemical settings given but data.biochemical_file is missing");
                }
                Some(BiochemicalRequest {
                    cleaning: section.cleaning.clone(),
                    config: BiochemicalConfig {
                        cutoff: section.cutoff,
                        override_amount: section.override_amount,
                        decay: section.decay,
                    },
                })
            }
            None => None,
        };
        let point_prevalence = self.calculation.point_prevalence.as_ref().map(|section| {
            PointPrevalenceSpec {
                visits: labels(&section.visits),
                window_lengths: section.window_lengths.clone(),
                names: section.names.clone(),
            }
        });
        let prolonged = match &self.calculation.prolonged {
            Some(section) => {
                let definitions = section
                    .lapse_definitions
                    .iter()
                    .map(|text| {
                        LapseDefinition::parse(text)
                            .with_context(|| format!("lapse definition {text:?}"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Some(ProlongedSpec {
                    quit_visit: VisitLabel::from(section.quit_visit.as_str()),
                    visits: labels(&section.visits),
                    definitions,
                    grace_days: section.grace_days,
                    names: section.names.clone(),
                })
            }
            None => None,
        };
        let continuous = self.calculation.continuous.as_ref().map(|section| {
            ContinuousSpec {
                start_visit: VisitLabel::from(section.start_visit.as_str()),
                visits: labels(&section.visits),
                names: section.names.clone(),
            }
        });
        Ok(RunRequest {
            tlfb: self.tlfb.clone(),
            visit: self.visit.clone(),
            biochemical,
            assumption: self.calculation.assumption,
            including_end: self.calculation.including_end,
            point_prevalence,
            prolonged,
            continuous,
        })
    }

    pub fn expected_visits(&self) -> Vec<VisitLabel> {
        labels(&self.data.expected_visits)
    }
}

fn labels(names: &[String]) -> Vec<VisitLabel> {
    names
        .iter()
        .map(|name| VisitLabel::from(name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let json = r#"{
            "data": {
                "tlfb_file": "tlfb.csv",
                "visit_file": "visits.csv"
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).expect("parse");
        let request = config.to_request().expect("request");
        assert_eq!(request.assumption, Assumption::Itt);
        assert!(!request.including_end);
        assert!(request.point_prevalence.is_none());
        assert!(request.biochemical.is_none());
    }

    #[test]
    fn full_config_round_trips_into_a_request() {
        let json = r#"{
            "data": {
                "tlfb_file": "tlfb.csv",
                "visit_file": "visits.csv",
                "biochemical_file": "co.csv",
                "visit_format": "long",
                "expected_visits": ["v0", "v1", "v2"]
            },
            "tlfb": {
                "cutoff": 0.0,
                "subjects": "all",
                "duplicate_mode": "keep-mean",
                "outlier_mode": "remove",
                "bounds": { "min": 0.0, "max": 100.0 },
                "imputation": {
                    "mode": "linear",
                    "gap_limit": 30,
                    "last_record": "carry-forward"
                }
            },
            "biochemical": {
                "cutoff": 4.0,
                "override_amount": 1.0,
                "decay": { "half_life": 0.5, "days_interpolation": 1 }
            },
            "calculation": {
                "assumption": "ro",
                "including_end": true,
                "point_prevalence": {
                    "visits": ["v1", "v2"],
                    "window_lengths": [7, 30]
                },
                "prolonged": {
                    "quit_visit": "v0",
                    "visits": ["v2"],
                    "lapse_definitions": ["false", "5 cigs", "5 cigs/14 days"],
                    "grace_days": 14
                },
                "continuous": {
                    "visits": ["v2"],
                    "start_visit": "v0"
                }
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).expect("parse");
        assert_eq!(config.data.expected_visits.len(), 3);
        let request = config.to_request().expect("request");
        assert_eq!(request.assumption, Assumption::Ro);
        let prolonged = request.prolonged.expect("prolonged spec");
        assert_eq!(prolonged.definitions.len(), 3);
        assert_eq!(prolonged.definitions[0], LapseDefinition::NotAllowed);
        let bio = request.biochemical.expect("biochemical request");
        assert_eq!(bio.config.cutoff, 4.0);
    }

    #[test]
    fn bad_lapse_text_is_rejected() {
        let json = r#"{
            "data": { "tlfb_file": "t.csv", "visit_file": "v.csv" },
            "calculation": {
                "prolonged": {
                    "quit_visit": "v0",
                    "visits": ["v1"],
                    "lapse_definitions": ["cigs"],
                    "grace_days": 7
                }
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).expect("parse");
        assert!(config.to_request().is_err());
    }

    #[test]
    fn biochemical_section_requires_a_file() {
        let json = r#"{
            "data": { "tlfb_file": "t.csv", "visit_file": "v.csv" },
            "biochemical": { "cutoff": 4.0, "override_amount": 1.0, "decay": null }
        }"#;
        let config: RunConfig = serde_json::from_str(json).expect("parse");
        assert!(config.to_request().is_err());
    }

    #[test]
    fn relative_paths_resolve_against_the_config_directory() {
        let json = r#"{
            "data": { "tlfb_file": "t.csv", "visit_file": "v.csv" }
        }"#;
        let config: RunConfig = serde_json::from_str(json).expect("parse");
        let resolved = config.resolve(Path::new("/study/run.json"), Path::new("t.csv"));
        assert_eq!(resolved, PathBuf::from("/study/t.csv"));
    }
}
