use thiserror::Error;

/// Errors raised while loading configuration or running a sync cycle
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration source could not be built or read
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A `.env` file exists but could not be loaded
    #[error("Failed to load .env file: {0}")]
    DotEnv(#[from] dotenv::Error),

    /// A required setting is absent or empty
    #[error("Environment variable {0} is required but not set")]
    MissingSetting(&'static str),

    /// A setting is present but cannot be parsed
    #[error("Invalid value for {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    /// Transport-level failure reaching an endpoint
    #[error("Network error while {context}: {source}")]
    Network {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Endpoint answered with a status this client does not expect
    #[error("Unexpected status code {status} while {context}, response body: {body}")]
    UnexpectedStatus {
        context: String,
        status: u16,
        body: String,
    },

    /// Response could not be decoded into the expected shape
    #[error("Malformed response: {0}")]
    Format(String),

    /// Token acquisition failed or the token was rejected
    #[error("Authentication failed with status code {status}, response body: {body}")]
    Auth { status: u16, body: String },

    /// Access list does not exist
    #[error("Access list {id} not found: {body}")]
    NotFound { id: u64, body: String },

    /// Remote rejected the replace because the resource changed underneath
    #[error("Conflict while replacing access list {id}: {body}")]
    Conflict { id: u64, body: String },

    /// Metrics exporter could not be installed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Shutdown signal handlers could not be installed
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

impl SyncError {
    /// Wraps a reqwest error with a short description of the failed operation
    pub fn network(context: impl Into<String>, source: reqwest::Error) -> Self {
        SyncError::Network {
            context: context.into(),
            source,
        }
    }

    /// Whether the error was raised while assembling configuration
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SyncError::Config(_)
                | SyncError::DotEnv(_)
                | SyncError::MissingSetting(_)
                | SyncError::InvalidSetting { .. }
        )
    }

    /// Short label used for metrics and structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Config(_)
            | SyncError::DotEnv(_)
            | SyncError::MissingSetting(_)
            | SyncError::InvalidSetting { .. } => "config",
            SyncError::Network { .. } => "network",
            SyncError::UnexpectedStatus { .. } | SyncError::Format(_) => "format",
            SyncError::Auth { .. } => "auth",
            SyncError::NotFound { .. } => "not_found",
            SyncError::Conflict { .. } => "conflict",
            SyncError::Metrics(_) => "metrics",
            SyncError::Signal(_) => "signal",
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
