use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("No data rows in input (need a header row plus at least one data row)")]
    NoDataRows,

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Match {0} is already {1}; confirmed and rejected matches are final")]
    MatchResolved(i64, String),

    #[error("Match not found: {0}")]
    UnknownMatch(i64),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
