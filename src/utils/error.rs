use crate::domain::model::EntityKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Fetching '{endpoint}' failed: {reason}")]
    PaginationFetch { endpoint: String, reason: String },

    #[error("Updating owner of {entity} {id} failed: {reason}")]
    Update {
        entity: EntityKind,
        id: i64,
        reason: String,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No API token found (looked in {location})")]
    MissingCredential { location: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Reconciliation,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn pagination(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PaginationFetch {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn update(entity: EntityKind, id: i64, reason: impl Into<String>) -> Self {
        Self::Update {
            entity,
            id,
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PaginationFetch { .. } | Self::ApiError(_) => ErrorCategory::Network,
            Self::Update { .. } => ErrorCategory::Reconciliation,
            Self::SerializationError(_) => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::Io,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingCredential { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Reconciliation => ErrorSeverity::Medium,
            ErrorCategory::Network | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 1,
            ErrorSeverity::High => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::PaginationFetch { endpoint, .. } => {
                format!("Could not download the complete '{}' collection", endpoint)
            }
            Self::Update { entity, id, .. } => {
                format!("The owner of {} {} could not be changed", entity, id)
            }
            Self::ApiError(_) => "The CRM API could not be reached".to_string(),
            Self::MissingCredential { .. } => "No API token is configured".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network connectivity, the API base URL and that the token is still valid"
            }
            ErrorCategory::Reconciliation => {
                "Re-run the sync; entities that already match are left untouched"
            }
            ErrorCategory::Data => "The API returned data in an unexpected shape; run with --verbose",
            ErrorCategory::Io => "Check that the referenced files exist and are readable",
            ErrorCategory::Configuration => match self {
                Self::MissingCredential { .. } => {
                    "Set api.token (or PIPEDRIVE_API_TOKEN) or create API_TOKEN.json with {\"token\": \"...\"}"
                }
                _ => "Fix the configuration file and try again",
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
