// Error handling framework

use thiserror::Error;
use uuid::Uuid;

/// Range reference parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("Invalid range reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Invalid column letters '{0}'")]
    InvalidColumn(String),

    #[error("Invalid row number '{0}': rows start at 1")]
    InvalidRow(String),

    #[error("Range '{reference}' is inverted: start must not exceed end")]
    InvertedRange { reference: String },
}

/// Errors raised while fetching values from a tabular source
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Source '{0}' not found")]
    SourceNotFound(String),

    #[error("Fetch timed out after {0} seconds")]
    Timeout(u64),

    #[error("Source request failed: {0}")]
    Request(String),

    #[error("Source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Source rejected credentials: {0}")]
    Auth(String),

    #[error("Source returned a malformed payload: {0}")]
    MalformedPayload(String),
}

impl FetchError {
    /// Whether the failure is expected to clear on a later attempt.
    ///
    /// Timeouts, transport errors, and HTTP failures are transient.
    /// Credential rejections, malformed payloads, and missing sources
    /// require operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Request(_) | FetchError::Status { .. }
        )
    }
}

/// Errors raised while delivering a notification to a webhook
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Webhook URL '{0}' is not valid")]
    InvalidWebhook(String),

    #[error("Webhook request failed: {0}")]
    Request(String),

    #[error("Delivery failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Errors raised by the job definition store
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store contains invalid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the job registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    #[error("An active job already watches this source, range, and webhook for this owner")]
    DuplicateJob,

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Caller does not own this job")]
    AccessDenied,

    #[error("Initial fetch failed: {0}")]
    InitialFetch(#[from] FetchError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors raised while resolving a caller token to an owner identity
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Token is not recognized or has expired")]
    UnknownToken,

    #[error("Identity resolution failed: {0}")]
    ResolverUnavailable(String),
}
