use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Query generation failed: {0}")]
    Generation(String),

    #[error("The language model returned an empty query")]
    EmptyGeneration,

    #[error("Error generating query suggestion: {0}")]
    Suggestion(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Statement rejected: {0}")]
    StatementRejected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown investment period '{0}'")]
    UnknownPeriod(String),

    #[error("No data found: {0}")]
    NoData(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
