use thiserror::Error;

/// Everything that can go wrong between finding a transcript email and
/// saving its analysis.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("No transcripts found")]
    NoTranscriptsFound,

    #[error("No Google Doc link found in message {message_id}")]
    NoDocumentFound { message_id: String },

    #[error("Document {document_id} has no Transcript or Notes tab (available tabs: {available})")]
    NoUsableContent {
        document_id: String,
        available: String,
    },

    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Mail API error {status}: {message}")]
    MailBackend { status: u16, message: String },

    #[error("Docs API error {status}: {message}")]
    DocumentBackend { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Fatal errors end the session; everything else is reported for the
    /// current item and processing moves on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AuthenticationFailure(_) | Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
