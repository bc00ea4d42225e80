//! Error taxonomy for the dialog core.
//! Every failure the controller can hit maps to one `WorkflowError` variant,
//! and every variant has a user-facing rendering (see `dialog::render`).

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum WorkflowError {
    /// Token could not be parsed at all.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Token parsed but its content key is not a valid key.
    #[error("unknown content key: {0}")]
    UnknownKey(String),

    /// The cached content was evicted before the dialog finished.
    #[error("the cached message has expired")]
    ContentExpired,

    #[error("no target language selected")]
    MissingTarget,

    /// Message reported by the translator, passed through verbatim.
    #[error("{0}")]
    TranslatorError(String),

    #[error("translator did not respond within {timeout_ms}ms")]
    TranslatorTimeout { timeout_ms: u64 },

    #[error("storage fault: {0}")]
    StorageFault(String),

    #[error("the selected message has no content to translate")]
    EmptyContent,

    /// A picked value that is not offered on the page the token names.
    #[error("invalid choice: {0}")]
    InvalidChoice(String),
}

impl WorkflowError {
    /// Stable snake_case name, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::MalformedToken(_) => "malformed_token",
            WorkflowError::UnknownKey(_) => "unknown_key",
            WorkflowError::ContentExpired => "content_expired",
            WorkflowError::MissingTarget => "missing_target",
            WorkflowError::TranslatorError(_) => "translator_error",
            WorkflowError::TranslatorTimeout { .. } => "translator_timeout",
            WorkflowError::StorageFault(_) => "storage_fault",
            WorkflowError::EmptyContent => "empty_content",
            WorkflowError::InvalidChoice(_) => "invalid_choice",
        }
    }

    /// Whether the user has to start the whole dialog over.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowError::ContentExpired
                | WorkflowError::EmptyContent
                | WorkflowError::TranslatorError(_)
                | WorkflowError::TranslatorTimeout { .. }
                | WorkflowError::StorageFault(_)
        )
    }
}

impl From<rusqlite::Error> for WorkflowError {
    fn from(e: rusqlite::Error) -> Self {
        WorkflowError::StorageFault(e.to_string())
    }
}
