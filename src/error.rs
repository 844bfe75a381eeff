use thiserror::Error;

// Error types for the text parsers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Input is empty")]
    Empty,

    #[error("Upstream returned an error message: {0}")]
    UpstreamError(String),

    #[error("No records could be parsed from {0} non-empty lines")]
    NoRecords(usize),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// Error types for calls against the trip-planning backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Backend reported failure: {0}")]
    Backend(String),

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Other error: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("No itinerary available to modify")]
    NoItinerary,

    #[error("Modification feedback is empty")]
    EmptyFeedback,

    #[error("A trip request is already in flight")]
    RequestInFlight,
}

// Error types for PDF and download preparation
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No itinerary data available for download")]
    NoDocument,

    #[error("PDF generation error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<lopdf::Error> for ExportError {
    fn from(err: lopdf::Error) -> Self {
        ExportError::Pdf(err.to_string())
    }
}
