use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("API error (status {status}) persisted after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("GraphQL query {query_type} returned errors: {errors}")]
    GraphQl { query_type: String, errors: String },

    #[error("GraphQL response contained no data")]
    NoResponseData,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid GitHub Actions run URL '{url}': {reason}")]
    InvalidRunUrl { url: String, reason: String },

    #[error("{entity} {id} is missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        id: String,
        field: &'static str,
    },

    #[error("{entity} {id} has unparsable timestamp in '{field}': {value:?}")]
    InvalidTimestamp {
        entity: &'static str,
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("{entity} {id} has an inconsistent interval: {reason}")]
    InvalidInterval {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("Track {track_id}: {field} {value} does not fit the trace format's int32")]
    OutOfRange {
        track_id: u64,
        field: &'static str,
        value: u64,
    },

    #[error("Trace invariant violated on track {track_id}: {reason}")]
    Invariant { track_id: u64, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
