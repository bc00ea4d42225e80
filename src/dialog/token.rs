//! Token codec: the dialog state serialized into a component custom id.
//!
//! Wire form: `lt1|<intent>|<scope>:<item>|<target>|<source>|<tpage>|<spage>`
//! where an absent slot is `~`. Both pickers can be open at once, so each keeps
//! its own page index. Fields are fixed-order so equal tokens always encode to
//! the same string, and every field is validated on decode so a token can only
//! ever name the content key it was rendered with.

use serde::Serialize;

use super::{ContentKey, LanguageCode, SelectionState, Slot};
use crate::error::WorkflowError;

const PREFIX: &str = "lt1";
const SEP: char = '|';
const ABSENT: &str = "~";

/// Custom id ceiling of the chat API.
pub const MAX_TOKEN_LEN: usize = 100;

/// What the element carrying the token does when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Intent {
    /// Show the encoded state as-is (clear buttons).
    View,
    /// Page through the target options.
    BrowseTarget,
    /// Page through the source options.
    BrowseSource,
    /// Fill the target slot with the value chosen in the menu.
    PickTarget,
    /// Fill the source slot with the value chosen in the menu.
    PickSource,
    Confirm,
}

impl Intent {
    fn tag(self) -> &'static str {
        match self {
            Intent::View => "v",
            Intent::BrowseTarget => "bt",
            Intent::BrowseSource => "bs",
            Intent::PickTarget => "t",
            Intent::PickSource => "s",
            Intent::Confirm => "c",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "v" => Some(Intent::View),
            "bt" => Some(Intent::BrowseTarget),
            "bs" => Some(Intent::BrowseSource),
            "t" => Some(Intent::PickTarget),
            "s" => Some(Intent::PickSource),
            "c" => Some(Intent::Confirm),
            _ => None,
        }
    }

    /// Page-navigation intent for `slot`'s picker.
    pub fn browse(slot: Slot) -> Self {
        match slot {
            Slot::Target => Intent::BrowseTarget,
            Slot::Source => Intent::BrowseSource,
        }
    }

    /// Menu-choice intent for `slot`'s picker.
    pub fn pick(slot: Slot) -> Self {
        match slot {
            Slot::Target => Intent::PickTarget,
            Slot::Source => Intent::PickSource,
        }
    }
}

/// Page shown by each picker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Pages {
    pub target: u8,
    pub source: u8,
}

impl Pages {
    pub fn new(target: u8, source: u8) -> Self {
        Self { target, source }
    }

    pub fn get(self, slot: Slot) -> u8 {
        match slot {
            Slot::Target => self.target,
            Slot::Source => self.source,
        }
    }

    pub fn with(self, slot: Slot, page: u8) -> Self {
        match slot {
            Slot::Target => Self { target: page, ..self },
            Slot::Source => Self { source: page, ..self },
        }
    }
}

/// Decoded token contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub intent: Intent,
    pub state: SelectionState,
    pub pages: Pages,
}

impl Token {
    pub fn new(intent: Intent, state: SelectionState, pages: Pages) -> Self {
        Self {
            intent,
            state,
            pages,
        }
    }

    pub fn encode(&self) -> String {
        encode(self.intent, &self.state, self.pages)
    }
}

fn slot_str(slot: &Option<LanguageCode>) -> &str {
    slot.as_ref().map(LanguageCode::as_str).unwrap_or(ABSENT)
}

/// Serialize `(intent, state, pages)`. Bounded by `MAX_TOKEN_LEN` given the
/// validation on `ContentKey` and `LanguageCode`.
pub fn encode(intent: Intent, state: &SelectionState, pages: Pages) -> String {
    let token = format!(
        "{PREFIX}{SEP}{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}",
        intent.tag(),
        state.content_key,
        slot_str(&state.target),
        slot_str(&state.source),
        pages.target,
        pages.source,
    );
    debug_assert!(token.len() <= MAX_TOKEN_LEN, "token over ceiling: {token}");
    token
}

fn malformed(raw: &str, why: &str) -> WorkflowError {
    WorkflowError::MalformedToken(format!("{why} in {raw:?}"))
}

fn decode_slot(raw: &str, field: &str) -> Result<Option<LanguageCode>, WorkflowError> {
    if field == ABSENT {
        return Ok(None);
    }
    LanguageCode::parse(field)
        .map(Some)
        .ok_or_else(|| malformed(raw, "bad language code"))
}

fn decode_page(raw: &str, field: &str) -> Result<u8, WorkflowError> {
    // Canonical digits only: no sign, no leading zeros.
    if field.is_empty() || (field.len() > 1 && field.starts_with('0')) || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(raw, "bad page index"));
    }
    field.parse().map_err(|_| malformed(raw, "bad page index"))
}

/// Parse a token. Pure: never consults the cache.
pub fn decode(raw: &str) -> Result<Token, WorkflowError> {
    if raw.len() > MAX_TOKEN_LEN {
        return Err(malformed(raw, "token too long"));
    }
    let fields: Vec<&str> = raw.split(SEP).collect();
    let [prefix, intent, key, target, source, target_page, source_page] = fields.as_slice() else {
        return Err(malformed(raw, "wrong field count"));
    };
    if *prefix != PREFIX {
        return Err(malformed(raw, "unknown prefix"));
    }
    let intent = Intent::from_tag(intent).ok_or_else(|| malformed(raw, "unknown intent"))?;
    let content_key = ContentKey::parse(key)?;
    let target = decode_slot(raw, target)?;
    let source = decode_slot(raw, source)?;
    let pages = Pages::new(decode_page(raw, target_page)?, decode_page(raw, source_page)?);

    Ok(Token {
        intent,
        state: SelectionState {
            content_key,
            target,
            source,
        },
        pages,
    })
}

/// Best-effort key extraction from a token that failed to decode, so the
/// dialog can be restarted instead of abandoned.
pub fn recover_key(raw: &str) -> Option<ContentKey> {
    let mut fields = raw.split(SEP);
    if fields.next()? != PREFIX {
        return None;
    }
    ContentKey::parse(fields.nth(1)?).ok()
}
