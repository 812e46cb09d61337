//! ipdmeta-eval — Stage 4: accuracy of extracted patient data against human annotation.
//! - Annotation table loading (XLS/XLSX/CSV)
//! - Record ↔ annotation join by study
//! - Missing-value agreement and per-type metrics
//! - CSV metric reports

pub mod annotation;
pub mod join;
pub mod missing;
pub mod metrics;
pub mod report;

pub use annotation::AnnotationTable;
pub use join::{create_matches, default_field_mapping, FieldMapping, JoinOutcome, MatchedPair};
pub use metrics::{
    default_features, evaluate, EvaluationReport, FeatureKind, FeatureSpec, MetricOutcome, SkipReason,
};
pub use missing::{missing_value_agreement, MissingAgreement};
pub use report::write_reports;
