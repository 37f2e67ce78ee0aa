//! Common error type and result alias.
//!
//! Every failure the user can see is carried by `AppError` and rendered
//! through its `Display` impl; callers do not branch on anything but the
//! message text, except the HTTP layer which picks a status code.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read image: {0}")]
    FileRead(String),

    #[error("GEMINI_API_KEY is not set; image generation is disabled")]
    MissingApiKey,

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("No image returned from the model")]
    NoImageReturned,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Workflow(String),

    #[error("A generation is already in progress")]
    Busy,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
}

pub type AppResult<T> = Result<T, AppError>;
