//! ipdmeta-ingestion — Stage 2: publication text extraction and dataset split.
//! - Per-format text extraction (PDF, DOCX, XLS/XLSX)
//! - Study → file resolution from the reviewed match files
//! - Per-study text concatenation and exclusion of duplicate/unreadable studies
//! - Seeded stratified split into pilot / development / validation sets

pub mod pdf_parser;
pub mod docx_parser;
pub mod xls_parser;
pub mod extract;
pub mod structurer;
pub mod split;

pub use extract::{extract_text, DocumentKind, ExtractError};
pub use split::{split_datasets, DatasetSplit, SplitConfig, SplitError};
pub use structurer::{
    build_study_texts, build_study_texts_with, remove_excluded, resolve_study_files, StructureReport,
    StudyFileSet,
};
