//! ipdmeta-matcher — Stage 1: group raw publication files and match them to included studies.
//!
//! - Study key extraction from filenames
//! - Grouping of a publication folder by study key
//! - Author/year rule matching of study names to group keys
//! - CSV interchange for the manual review steps in between

pub mod key;
pub mod grouping;
pub mod names;
pub mod matching;
pub mod review;

use thiserror::Error;

pub use grouping::{FileEntry, FileGroup, StudyGroups};
pub use key::{extract_study_key, StudyKey};
pub use matching::{match_all, match_study_to_file, MatchOutcome, MatchRecord};
pub use names::{analyze_study_parts, split_study_name, StudyParts};

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("Invalid name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] ipdmeta_common::IpdError),
}

pub type Result<T> = std::result::Result<T, MatcherError>;
