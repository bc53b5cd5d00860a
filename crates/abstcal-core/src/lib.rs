//! Data-cleaning and abstinence-scoring engine for Timeline-Follow-Back
//! (TLFB) studies: deduplication, outlier recoding, gap and visit-date
//! imputation, biochemical verification merging, and the three abstinence
//! algorithms under the ITT/RO missing-data assumptions.

pub mod abstinence;
pub mod biochemical;
pub mod dataset;
pub mod impute_tlfb;
pub mod impute_visit;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod store;

pub use abstinence::AbstinenceCalculator;
pub use dataset::{TlfbDataset, VisitDataset};
pub use merge::merge_tables;
pub use pipeline::{
    BiochemicalRequest, ContinuousSpec, PointPrevalenceSpec, ProlongedSpec, RawInput, RunOutput,
    RunRequest, run,
};
pub use store::{TemporalRecord, TemporalStore};
