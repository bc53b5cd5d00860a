pub mod error;
pub mod lapse;
pub mod options;
pub mod record;
pub mod results;
pub mod summary;

pub use error::{AbstcalError, Result};
pub use lapse::LapseDefinition;
pub use options::{
    AmountBounds, Assumption, BiochemicalConfig, DateBounds, DecayConfig, DuplicateMode,
    ImputationPolicy, LastRecordPolicy, OutlierMode, SubjectSelection, TlfbImputationMode,
    TlfbOptions, VariableNames, VisitImputationMode, VisitOptions,
};
pub use record::{DailyRecord, SubjectId, VisitLabel, VisitRecord};
pub use results::{AbstinenceStatus, AbstinenceTable, LapseTable, WideTable};
pub use summary::{
    BiochemicalSummary, GapImputationSummary, NormalizationSummary, OutlierBound, OutlierHit,
    OutlierReport, VisitImputationSummary,
};
