//! External collaborators consumed by the dialog core: the translator and the
//! user settings store. Only the interfaces live here, plus local stand-ins
//! used by the console host and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::dialog::LanguageCode;

/// Translation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslateRequest {
    pub text: String,
    /// None lets the translator auto-detect.
    pub source_lang: Option<LanguageCode>,
    pub target_lang: LanguageCode,
}

/// Translation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    pub detected_source_lang: Option<String>,
    pub billed_characters: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("{0}")]
    ApiError(String),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("translation timeout")]
    Timeout,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Translator adapter (DeepL or any other backend). Retries, if any, are the
/// implementation's concern.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, request: TranslateRequest) -> Result<Translation, TranslateError>;
}

/// Stand-in translator for local runs: echoes the text back.
pub struct StubTranslator;

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(&self, req: TranslateRequest) -> Result<Translation, TranslateError> {
        Ok(Translation {
            text: format!("[stub {}] {}", req.target_lang, req.text),
            detected_source_lang: Some(
                req.source_lang
                    .map(String::from)
                    .unwrap_or_else(|| "en".to_string()),
            ),
            billed_characters: req.text.chars().count() as u64,
        })
    }
}

/// Read-only view of per-user settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn preferred_language(&self, user_id: &str) -> Option<LanguageCode>;
}

/// Settings held in memory, keyed by user id.
#[derive(Default)]
pub struct MemorySettings {
    preferred: RwLock<HashMap<String, LanguageCode>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_preferred_language(&self, user_id: &str, lang: LanguageCode) {
        self.preferred.write().insert(user_id.to_string(), lang);
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn preferred_language(&self, user_id: &str) -> Option<LanguageCode> {
        self.preferred.read().get(user_id).cloned()
    }
}
