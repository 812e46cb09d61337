//! ipdmeta-common — Shared types, errors and interchange helpers used across all ipdmeta crates.

pub mod error;
pub mod cases;
pub mod records;
pub mod value;
pub mod interchange;
pub mod dataset;

// Re-export commonly used types
pub use error::{IpdError, Result};
pub use cases::{CaseCount, CaseCountTable, CaseMerge};
pub use records::PatientRecord;
pub use value::Value;
pub use dataset::SplitName;
