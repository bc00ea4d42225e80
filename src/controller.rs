//! Workflow controller: decode token → next state → render, and on confirm
//! read the cached content and call the translator.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, info_span, warn, Instrument};

use crate::cache::{CellBackend, EphemeralCache, MemoryBackend, SqliteBackend};
use crate::config::Config;
use crate::dialog::languages::LanguageCatalog;
use crate::dialog::render::{Document, WorkflowRenderer};
use crate::dialog::token::{self, Intent, Pages, Token};
use crate::dialog::{ContentKey, LanguageCode, SelectionState, Slot};
use crate::error::WorkflowError;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::state_machine::{self, DialogPhase};
use crate::translate::{SettingsStore, TranslateError, TranslateRequest, Translation, Translator};

pub struct WorkflowController {
    cache: EphemeralCache,
    renderer: WorkflowRenderer,
    translator: Arc<dyn Translator>,
    settings: Option<Arc<dyn SettingsStore>>,
    metrics: Arc<MetricsRegistry>,
    translator_timeout: Duration,
}

impl WorkflowController {
    pub fn new(
        cache: EphemeralCache,
        renderer: WorkflowRenderer,
        translator: Arc<dyn Translator>,
        metrics: Arc<MetricsRegistry>,
        translator_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            renderer,
            translator,
            settings: None,
            metrics,
            translator_timeout,
        }
    }

    /// Build from config with the default catalog. Must be called inside a
    /// tokio runtime when `cache_db_path` is set (the purge loop is spawned).
    pub fn from_config(config: &Config, translator: Arc<dyn Translator>) -> Result<Self, WorkflowError> {
        let metrics = Arc::new(MetricsRegistry::new());
        let backend: Arc<dyn CellBackend> = match &config.cache_db_path {
            Some(path) => {
                let db = Arc::new(SqliteBackend::open(path)?);
                SqliteBackend::start_purge_loop(Arc::clone(&db), config.purge_interval());
                db
            }
            None => Arc::new(MemoryBackend::new()),
        };
        let cache = EphemeralCache::new(backend, config.cache_ttl(), Arc::clone(&metrics));
        let renderer = WorkflowRenderer::new(Arc::new(LanguageCatalog::default()), config.page_capacity);
        Ok(Self::new(
            cache,
            renderer,
            translator,
            metrics,
            config.translator_timeout(),
        ))
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn cache(&self) -> &EphemeralCache {
        &self.cache
    }

    pub fn renderer(&self) -> &WorkflowRenderer {
        &self.renderer
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Entry point for a new dialog: cache the message content, then render
    /// the first step. A storage fault is returned to the caller.
    pub async fn trigger(&self, key: &ContentKey, content: &str) -> Result<Document, WorkflowError> {
        let text = content.trim();
        if text.is_empty() {
            return Err(WorkflowError::EmptyContent);
        }
        self.cache.put_default(key, text).await?;
        info!(
            key = %key,
            fingerprint = %fingerprint(text),
            chars = text.chars().count(),
            "dialog_triggered"
        );
        Ok(self.start_workflow(key))
    }

    /// First step with an empty selection.
    pub fn start_workflow(&self, key: &ContentKey) -> Document {
        self.start_with_suggestion(key, None)
    }

    /// First step with the user's preferred language pre-marked on its page.
    pub async fn start_workflow_for_user(&self, key: &ContentKey, user_id: &str) -> Document {
        let suggested = match &self.settings {
            Some(settings) => settings.preferred_language(user_id).await,
            None => None,
        };
        self.start_with_suggestion(key, suggested.as_ref())
    }

    fn start_with_suggestion(&self, key: &ContentKey, suggested: Option<&LanguageCode>) -> Document {
        self.metrics.increment(metric_names::DIALOGS_STARTED);
        let pages = suggested
            .map(|code| Pages::default().with(Slot::Target, self.renderer.page_of(Slot::Target, code)))
            .unwrap_or_default();
        self.render(&SelectionState::new(key.clone()), pages, suggested)
    }

    /// Handle one user action: the token of the activated element plus the
    /// value picked in a select menu, if any.
    pub async fn handle_action(&self, raw_token: &str, chosen: Option<&str>) -> Document {
        let trace_id = uuid::Uuid::new_v4();
        let span = self.metrics.span(metric_names::HANDLE_ACTION);
        let doc = self
            .dispatch(raw_token, chosen)
            .instrument(info_span!("handle_action", %trace_id))
            .await;
        span.finish();
        doc
    }

    async fn dispatch(&self, raw_token: &str, chosen: Option<&str>) -> Document {
        let token = match token::decode(raw_token) {
            Ok(token) => token,
            Err(e) => return self.restart(raw_token, e),
        };
        let from = DialogPhase::of(&token.state);

        match token.intent {
            Intent::View | Intent::BrowseTarget | Intent::BrowseSource => {
                self.step(from, &token.state, token.pages)
            }
            Intent::PickTarget | Intent::PickSource => {
                let slot = if token.intent == Intent::PickTarget {
                    Slot::Target
                } else {
                    Slot::Source
                };
                match self.apply_choice(&token, slot, chosen) {
                    Ok(next) => self.step(from, &next, token.pages),
                    Err(e) => self.reject(&token.state, token.pages, e),
                }
            }
            Intent::Confirm => self.confirm(&token.state, token.pages).await,
        }
    }

    fn apply_choice(&self, token: &Token, slot: Slot, chosen: Option<&str>) -> Result<SelectionState, WorkflowError> {
        let raw = chosen.ok_or_else(|| WorkflowError::InvalidChoice("no value selected".to_string()))?;
        let code = LanguageCode::parse(raw).ok_or_else(|| WorkflowError::InvalidChoice(raw.to_string()))?;
        // Only what the menu on this page offered.
        if self.renderer.locate(slot, &code) != Some(usize::from(token.pages.get(slot))) {
            return Err(WorkflowError::InvalidChoice(raw.to_string()));
        }
        Ok(match slot {
            Slot::Target => token.state.choose_target(code),
            Slot::Source => token.state.choose_source(code),
        })
    }

    fn step(&self, from: DialogPhase, next: &SelectionState, pages: Pages) -> Document {
        match state_machine::transition(from, DialogPhase::of(next)) {
            Ok(_) => self.render(next, pages, None),
            Err(e) => self.reject(next, pages, e),
        }
    }

    fn render(&self, state: &SelectionState, pages: Pages, suggested: Option<&LanguageCode>) -> Document {
        let span = self.metrics.span(metric_names::RENDER);
        let doc = self.renderer.render(state, pages, suggested);
        span.finish();
        doc
    }

    /// Re-render the current step with a notice; the dialog continues.
    fn reject(&self, state: &SelectionState, pages: Pages, error: WorkflowError) -> Document {
        warn!(key = %state.content_key, kind = error.kind(), "action_rejected");
        let notice = match &error {
            WorkflowError::MissingTarget => {
                "### ❌ Please select a target language before confirming.".to_string()
            }
            WorkflowError::InvalidChoice(_) => {
                "### ⚠️ That option is not available here, please choose again.".to_string()
            }
            other => format!("### ⚠️ {other}"),
        };
        self.render(state, pages, None).with_notice(error, notice)
    }

    /// Undecodable token: start over if the key survived, otherwise fail.
    fn restart(&self, raw_token: &str, error: WorkflowError) -> Document {
        warn!(kind = error.kind(), error = %error, "token_rejected");
        match token::recover_key(raw_token) {
            Some(key) => self
                .render(&SelectionState::new(key), Pages::default(), None)
                .with_notice(
                    error,
                    "### ⚠️ This dialog could not be read, starting over.".to_string(),
                ),
            None => self.fail(error),
        }
    }

    fn fail(&self, error: WorkflowError) -> Document {
        self.metrics.increment(metric_names::DIALOGS_FAILED);
        warn!(kind = error.kind(), error = %error, "dialog_failed");
        self.renderer.failed(error)
    }

    async fn confirm(&self, state: &SelectionState, pages: Pages) -> Document {
        let from = DialogPhase::of(state);
        let target = match (state_machine::transition(from, DialogPhase::Confirming), &state.target) {
            (Ok(_), Some(target)) => target,
            (Err(e), _) => return self.reject(state, pages, e),
            (Ok(_), None) => return self.reject(state, pages, WorkflowError::MissingTarget),
        };
        match self.confirm_selection(state).await {
            Ok(translation) => {
                state_machine::record_terminal(DialogPhase::Confirming, DialogPhase::Completed);
                self.metrics.increment(metric_names::DIALOGS_COMPLETED);
                self.renderer.completed(&translation, target)
            }
            Err(e) if !e.is_terminal() => self.reject(state, pages, e),
            Err(e) => {
                state_machine::record_terminal(DialogPhase::Confirming, DialogPhase::Failed);
                self.fail(e)
            }
        }
    }

    /// Guarded confirm: fetch the cached content and translate it.
    /// Never touches the cache beyond the read.
    pub async fn confirm_selection(&self, state: &SelectionState) -> Result<Translation, WorkflowError> {
        let target = state.target.clone().ok_or(WorkflowError::MissingTarget)?;
        let content = self
            .cache
            .get(&state.content_key)
            .await?
            .ok_or(WorkflowError::ContentExpired)?;
        let text = content.trim();
        if text.is_empty() {
            return Err(WorkflowError::EmptyContent);
        }

        let request = TranslateRequest {
            text: text.to_string(),
            source_lang: state.source.clone(),
            target_lang: target,
        };
        info!(
            key = %state.content_key,
            fingerprint = %fingerprint(text),
            source = state.source.as_ref().map(LanguageCode::as_str).unwrap_or("auto"),
            target = %request.target_lang,
            "translate_requested"
        );

        let timeout_ms = self.translator_timeout.as_millis() as u64;
        let span = self.metrics.span(metric_names::TRANSLATE);
        match tokio::time::timeout(self.translator_timeout, self.translator.translate(request)).await {
            Err(_) | Ok(Err(TranslateError::Timeout)) => {
                warn!(key = %state.content_key, timeout_ms, "translator_timeout");
                Err(WorkflowError::TranslatorTimeout { timeout_ms })
            }
            Ok(Err(TranslateError::ApiError(message))) => Err(WorkflowError::TranslatorError(message)),
            Ok(Err(other)) => Err(WorkflowError::TranslatorError(other.to_string())),
            Ok(Ok(translation)) => {
                let elapsed_us = span.finish();
                info!(
                    key = %state.content_key,
                    billed = translation.billed_characters,
                    elapsed_ms = elapsed_us / 1000.0,
                    "translate_done"
                );
                Ok(translation)
            }
        }
    }
}

/// Short content digest for logs; the content itself is never logged.
pub fn fingerprint(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex()[..12].to_string()
}
