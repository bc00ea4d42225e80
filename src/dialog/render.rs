//! Workflow renderer: pure (state, pages) → UI document.
//! Never touches storage or the network; the same input always yields the
//! same document, so a UI update can be retried safely.

use std::sync::Arc;

use serde::Serialize;

use super::languages::{LanguageCatalog, LanguageOption};
use super::paginate;
use super::token::{encode, Intent, Pages};
use super::{LanguageCode, SelectionState, Slot};
use crate::error::WorkflowError;
use crate::translate::Translation;

const RESTART_HINT: &str = "Please run the **Translate Message** command on the message again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogStatus {
    Selecting,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Select {
        id: String,
        placeholder: String,
        options: Vec<SelectOption>,
    },
    Button {
        id: String,
        label: String,
        style: ButtonStyle,
        disabled: bool,
    },
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Select { id, .. } | Element::Button { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Block {
    Text(String),
    Separator,
    Row(Vec<Element>),
}

/// Rendered message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub status: DialogStatus,
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkflowError>,
}

impl Document {
    /// All interactive elements, in render order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.blocks.iter().flat_map(|b| match b {
            Block::Row(elements) => elements.as_slice(),
            _ => &[][..],
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.contains(needle))
    }

    /// Prepend a notice line (used when an action was rejected but the
    /// dialog continues).
    pub fn with_notice(mut self, error: WorkflowError, notice: String) -> Self {
        self.blocks.insert(0, Block::Text(notice));
        self.error = Some(error);
        self
    }
}

/// Builds dialog documents from selection state.
#[derive(Debug, Clone)]
pub struct WorkflowRenderer {
    catalog: Arc<LanguageCatalog>,
    capacity: usize,
}

impl WorkflowRenderer {
    pub fn new(catalog: Arc<LanguageCatalog>, capacity: usize) -> Self {
        Self {
            catalog,
            capacity: capacity.clamp(1, paginate::MAX_PAGE_CAPACITY),
        }
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn options(&self, slot: Slot) -> &[LanguageOption] {
        match slot {
            Slot::Target => self.catalog.targets(),
            Slot::Source => self.catalog.sources(),
        }
    }

    /// Page of `slot`'s options that holds `code`.
    pub fn locate(&self, slot: Slot, code: &LanguageCode) -> Option<usize> {
        paginate::locate_by(self.options(slot), self.capacity, |o| &o.code == code)
    }

    fn page_count(&self, slot: Slot) -> usize {
        paginate::page_count(self.options(slot).len(), self.capacity)
    }

    /// Clamp each picker's page from a token to that picker's range.
    pub fn clamp_pages(&self, pages: Pages) -> Pages {
        let clamp = |slot: Slot| {
            let last = self.page_count(slot).saturating_sub(1);
            usize::from(pages.get(slot)).min(last).try_into().unwrap_or(u8::MAX)
        };
        Pages::new(clamp(Slot::Target), clamp(Slot::Source))
    }

    /// Page index holding `code` in `slot`'s picker, or the first page.
    pub fn page_of(&self, slot: Slot, code: &LanguageCode) -> u8 {
        self.locate(slot, code)
            .and_then(|p| u8::try_from(p).ok())
            .unwrap_or(0)
    }

    /// Render the selection step for `state` with each open picker on its
    /// page. `suggested` marks a default target option (e.g. the user's
    /// preferred language).
    pub fn render(
        &self,
        state: &SelectionState,
        pages: Pages,
        suggested: Option<&LanguageCode>,
    ) -> Document {
        let pages = self.clamp_pages(pages);
        let mut blocks = vec![Block::Text(format!(
            "Translating message `{}`",
            state.content_key.item()
        ))];

        self.render_slot(&mut blocks, state, Slot::Target, pages, suggested);
        blocks.push(Block::Separator);
        self.render_slot(&mut blocks, state, Slot::Source, pages, None);
        blocks.push(Block::Separator);

        let ready = state.target.is_some();
        blocks.push(Block::Row(vec![Element::Button {
            id: encode(Intent::Confirm, state, pages),
            label: "✅ Translate Message".to_string(),
            style: ButtonStyle::Primary,
            disabled: !ready,
        }]));
        if !ready {
            blocks.push(Block::Text("-# Select a target language to continue.".to_string()));
        }

        Document {
            status: DialogStatus::Selecting,
            blocks,
            error: None,
        }
    }

    fn render_slot(
        &self,
        blocks: &mut Vec<Block>,
        state: &SelectionState,
        slot: Slot,
        pages: Pages,
        suggested: Option<&LanguageCode>,
    ) {
        let title = match slot {
            Slot::Target => "Target language",
            Slot::Source => "Source language",
        };

        if let Some(code) = state.slot(slot) {
            blocks.push(Block::Text(format!(
                "**{title}:** {} (`{code}`)",
                self.catalog.display_name(code.as_str())
            )));
            // The picker reopens on the page holding the cleared value.
            let reopened = pages.with(slot, self.page_of(slot, code));
            blocks.push(Block::Row(vec![Element::Button {
                id: encode(Intent::View, &state.clear(slot), reopened),
                label: format!("Clear {}", title.to_lowercase()),
                style: ButtonStyle::Secondary,
                disabled: false,
            }]));
            return;
        }

        let (heading, placeholder) = match slot {
            Slot::Target => ("### Select target language:", "Select target language"),
            Slot::Source => (
                "### (Optional) Select source language:",
                "Select source language (or leave empty for auto-detect)",
            ),
        };
        blocks.push(Block::Text(heading.to_string()));

        let page = pages.get(slot);
        let options = paginate::page(self.options(slot), self.capacity, usize::from(page))
            .iter()
            .map(|o| SelectOption {
                label: o.name.clone(),
                value: o.code.to_string(),
                default: suggested == Some(&o.code),
            })
            .collect();
        blocks.push(Block::Row(vec![Element::Select {
            id: encode(Intent::pick(slot), state, pages),
            placeholder: placeholder.to_string(),
            options,
        }]));

        let count = self.page_count(slot);
        if count > 1 {
            let last = u8::try_from(count - 1).unwrap_or(u8::MAX);
            blocks.push(Block::Text(format!("-# {title}s: page {} of {count}", usize::from(page) + 1)));
            blocks.push(Block::Row(vec![
                Element::Button {
                    id: encode(Intent::browse(slot), state, pages.with(slot, page.saturating_sub(1))),
                    label: "◀ Previous".to_string(),
                    style: ButtonStyle::Secondary,
                    disabled: page == 0,
                },
                Element::Button {
                    id: encode(Intent::browse(slot), state, pages.with(slot, page.saturating_add(1).min(last))),
                    label: "Next ▶".to_string(),
                    style: ButtonStyle::Secondary,
                    disabled: page >= last,
                },
            ]));
        }
    }

    /// Terminal success document.
    pub fn completed(&self, translation: &Translation, target: &LanguageCode) -> Document {
        let from = translation
            .detected_source_lang
            .as_deref()
            .map(|code| self.catalog.display_name(code))
            .unwrap_or_else(|| "auto-detected language".to_string());
        Document {
            status: DialogStatus::Completed,
            blocks: vec![
                Block::Text("### 🌐 Translation Result".to_string()),
                Block::Text(format!(
                    "From {from} to {}",
                    self.catalog.display_name(target.as_str())
                )),
                Block::Text(translation.text.clone()),
                Block::Text(format!("-# Billed: {} characters", translation.billed_characters)),
            ],
            error: None,
        }
    }

    /// Terminal failure document. Always tells the user how to restart.
    pub fn failed(&self, error: WorkflowError) -> Document {
        let headline = match &error {
            WorkflowError::ContentExpired => "### ⚠️ The cached message has expired.".to_string(),
            WorkflowError::TranslatorError(msg) => format!("### ❌ Translation failed: {msg}"),
            other => format!("### ❌ {}", capitalize(&other.to_string())),
        };
        Document {
            status: DialogStatus::Failed,
            blocks: vec![Block::Text(headline), Block::Text(RESTART_HINT.to_string())],
            error: Some(error),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
