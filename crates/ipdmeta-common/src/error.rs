use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Missing column '{column}' in {path}")]
    MissingColumn { column: String, path: String },
}

pub type Result<T> = std::result::Result<T, IpdError>;
