//! Dialog value types: content keys, language codes and the selection state
//! carried through every rendered element.

pub mod languages;
pub mod paginate;
pub mod render;
pub mod token;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::WorkflowError;

static KEY_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,32}$").expect("static key pattern"));

static LANG_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(?:-[A-Za-z0-9]{2,4})?$").expect("static language pattern")
});

/// Identifier of one cached blob, `scope:item` (e.g. `channelId:messageId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct ContentKey {
    scope: String,
    item: String,
}

impl ContentKey {
    pub fn new(scope: &str, item: &str) -> Result<Self, WorkflowError> {
        if !KEY_PART.is_match(scope) || !KEY_PART.is_match(item) {
            return Err(WorkflowError::UnknownKey(format!("{scope}:{item}")));
        }
        Ok(Self {
            scope: scope.to_string(),
            item: item.to_string(),
        })
    }

    /// Parse the `scope:item` form.
    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        let (scope, item) = raw
            .split_once(':')
            .ok_or_else(|| WorkflowError::UnknownKey(raw.to_string()))?;
        Self::new(scope, item)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn item(&self) -> &str {
        &self.item
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.item)
    }
}

impl From<ContentKey> for String {
    fn from(key: ContentKey) -> Self {
        key.to_string()
    }
}

/// Language code as accepted by the translator (`de`, `en-GB`, `zh-HANT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Longest code the pattern admits.
    pub const MAX_LEN: usize = 8;

    pub fn parse(raw: &str) -> Option<Self> {
        LANG_CODE.is_match(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

/// Which dialog slot a choice or action refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Slot {
    Target,
    Source,
}

/// Partial selection for one dialog. Transitions return a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SelectionState {
    pub content_key: ContentKey,
    pub target: Option<LanguageCode>,
    pub source: Option<LanguageCode>,
}

impl SelectionState {
    pub fn new(content_key: ContentKey) -> Self {
        Self {
            content_key,
            target: None,
            source: None,
        }
    }

    pub fn choose_target(&self, value: LanguageCode) -> Self {
        Self {
            target: Some(value),
            ..self.clone()
        }
    }

    pub fn choose_source(&self, value: LanguageCode) -> Self {
        Self {
            source: Some(value),
            ..self.clone()
        }
    }

    pub fn clear_target(&self) -> Self {
        Self {
            target: None,
            ..self.clone()
        }
    }

    pub fn clear_source(&self) -> Self {
        Self {
            source: None,
            ..self.clone()
        }
    }

    pub fn clear(&self, slot: Slot) -> Self {
        match slot {
            Slot::Target => self.clear_target(),
            Slot::Source => self.clear_source(),
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<&LanguageCode> {
        match slot {
            Slot::Target => self.target.as_ref(),
            Slot::Source => self.source.as_ref(),
        }
    }
}
