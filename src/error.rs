use crate::model::ResourceKind;
use thiserror::Error;

/// HTTP statuses that indicate a transient condition worth retrying.
pub const RETRYABLE_STATUSES: &[u16] = &[429, 502, 503, 504];

#[derive(Error, Debug)]
pub enum PlaneError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Auth(String),

    #[error("API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("{kind} not found: {query}{}", suggestion_suffix(.suggestions))]
    NotFound {
        kind: ResourceKind,
        query: String,
        suggestions: Vec<String>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        hint: Option<String>,
    },

    #[error("Unexpected API response: {0}")]
    Decode(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

/// Coarse classification used by the command boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    NotFound,
    Fatal,
    Validation,
    Config,
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }
    let names: Vec<String> = suggestions.iter().map(|s| format!("\"{}\"", s)).collect();
    format!(" (did you mean: {}?)", names.join(", "))
}

impl PlaneError {
    pub fn not_found(kind: ResourceKind, query: &str) -> Self {
        PlaneError::NotFound {
            kind,
            query: query.to_string(),
            suggestions: Vec::new(),
        }
    }

    pub fn validation(message: impl Into<String>, hint: impl Into<String>) -> Self {
        PlaneError::Validation {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PlaneError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.status()
            .is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            _ if self.is_retryable() => ErrorKind::Transient,
            PlaneError::NotFound { .. } => ErrorKind::NotFound,
            PlaneError::Validation { .. } => ErrorKind::Validation,
            PlaneError::Config(_) | PlaneError::Auth(_) => ErrorKind::Config,
            PlaneError::Http { status: 401, .. } => ErrorKind::Config,
            _ => ErrorKind::Fatal,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PlaneError::Config(_) | PlaneError::Auth(_) => 2,
            PlaneError::Http { status: 401, .. } => 2,
            PlaneError::NotFound { .. } => 3,
            PlaneError::Http { .. } | PlaneError::Transport(_) | PlaneError::Decode(_) => 4,
            PlaneError::Validation { .. } => 5,
            PlaneError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Actionable follow-up shown below the error message.
    pub fn hint(&self) -> Option<String> {
        match self {
            PlaneError::Auth(_) | PlaneError::Http { status: 401, .. } => Some(
                "Run 'planecli configure' or set PLANE_API_KEY and PLANE_BASE_URL.".to_string(),
            ),
            PlaneError::NotFound { kind, .. } => Some(format!(
                "Use 'planecli {} list' to see available resources.",
                kind.command()
            )),
            PlaneError::Validation { hint, .. } => hint.clone(),
            _ if self.is_retryable() => Some(
                "The Plane API appears rate-limited or unavailable. Try again later.".to_string(),
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaneError>;
