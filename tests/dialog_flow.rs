use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use linguadeep::cache::{CellBackend, EphemeralCache, MemoryBackend};
use linguadeep::dialog::languages::{LanguageCatalog, LanguageOption};
use linguadeep::dialog::render::{Element, WorkflowRenderer};
use linguadeep::dialog::token::{self, Intent, Pages};
use linguadeep::metrics::{metric_names, MetricsRegistry};
use linguadeep::translate::StubTranslator;
use linguadeep::{
    Config, ContentKey, DialogStatus, Document, LanguageCode, SelectionState, TranslateError,
    TranslateRequest, Translation, Translator, WorkflowController, WorkflowError,
};

struct RecordingTranslator {
    requests: Mutex<Vec<TranslateRequest>>,
}

#[async_trait]
impl Translator for RecordingTranslator {
    async fn translate(&self, req: TranslateRequest) -> Result<Translation, TranslateError> {
        self.requests.lock().push(req);
        Ok(Translation {
            text: "哈囉".to_string(),
            detected_source_lang: Some("de".to_string()),
            billed_characters: 5,
        })
    }
}

struct HangingTranslator;

#[async_trait]
impl Translator for HangingTranslator {
    async fn translate(&self, _req: TranslateRequest) -> Result<Translation, TranslateError> {
        std::future::pending().await
    }
}

struct ReadOnlyBackend;

impl CellBackend for ReadOnlyBackend {
    fn write(&self, _key: &ContentKey, _value: &str, _ttl: Duration) -> Result<(), WorkflowError> {
        Err(WorkflowError::StorageFault("disk is read-only".into()))
    }
    fn read(&self, _key: &ContentKey) -> Result<Option<String>, WorkflowError> {
        Ok(None)
    }
    fn remove(&self, _key: &ContentKey) -> Result<(), WorkflowError> {
        Ok(())
    }
}

/// 40 targets; zh-HANT sits at index 26, i.e. on the second page of 25.
fn wide_catalog() -> LanguageCatalog {
    let mut targets: Vec<LanguageOption> = (b'a'..=b'z')
        .filter_map(|c| {
            let code = format!("q{}", c as char);
            LanguageOption::new(&code, &format!("Lang {code}"))
        })
        .collect();
    targets.extend(LanguageOption::new("zh-HANT", "Chinese (Traditional)"));
    targets.extend((b'a'..=b'm').filter_map(|c| {
        let code = format!("x{}", c as char);
        LanguageOption::new(&code, &format!("Lang {code}"))
    }));
    let sources = [("de", "German"), ("en", "English"), ("fr", "French")]
        .iter()
        .filter_map(|(code, name)| LanguageOption::new(code, name))
        .collect();
    LanguageCatalog::new(targets, sources)
}

fn controller(translator: Arc<dyn Translator>) -> WorkflowController {
    let metrics = Arc::new(MetricsRegistry::new());
    let cache = EphemeralCache::new(
        Arc::new(MemoryBackend::new()),
        Duration::from_secs(3600),
        Arc::clone(&metrics),
    );
    let renderer = WorkflowRenderer::new(Arc::new(wide_catalog()), 25);
    WorkflowController::new(cache, renderer, translator, metrics, Duration::from_secs(5))
}

fn key() -> ContentKey {
    ContentKey::new("411", "9001").unwrap()
}

fn picker(doc: &Document) -> (&str, usize) {
    doc.elements()
        .find_map(|e| match e {
            Element::Select { id, options, .. } => Some((id.as_str(), options.len())),
            _ => None,
        })
        .expect("document has a picker")
}

fn button<'a>(doc: &'a Document, label: &str) -> (&'a str, bool) {
    doc.elements()
        .find_map(|e| match e {
            Element::Button {
                id,
                label: l,
                disabled,
                ..
            } if l == label => Some((id.as_str(), *disabled)),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no button {label:?}"))
}

#[tokio::test]
async fn full_dialog_across_pages() {
    let translator = Arc::new(RecordingTranslator {
        requests: Mutex::new(Vec::new()),
    });
    let ctl = controller(translator.clone());

    let doc = ctl.trigger(&key(), "Hallo").await.unwrap();
    assert_eq!(doc.status, DialogStatus::Selecting);
    assert_eq!(picker(&doc).1, 25);
    assert!(doc.contains_text("Target languages: page 1 of 2"));
    let (_, confirm_disabled) = button(&doc, "✅ Translate Message");
    assert!(confirm_disabled);

    let (next, _) = button(&doc, "Next ▶");
    let doc = ctl.handle_action(next, None).await;
    let (pick, len) = picker(&doc);
    assert_eq!(len, 15);
    assert!(doc.contains_text("Target languages: page 2 of 2"));
    assert_eq!(token::decode(pick).unwrap().pages, Pages::new(1, 0));

    let doc = ctl.handle_action(pick, Some("zh-HANT")).await;
    assert_eq!(doc.error, None);
    assert!(doc.contains_text("Chinese (Traditional)"));
    // Only the source picker remains, on its first page.
    let (source_pick, len) = picker(&doc);
    assert_eq!(len, 3);
    assert_eq!(token::decode(source_pick).unwrap().intent, Intent::PickSource);

    // Clearing the target lands back on the page that holds it.
    let (clear, _) = button(&doc, "Clear target language");
    let doc = ctl.handle_action(clear, None).await;
    let (pick, _) = picker(&doc);
    let decoded = token::decode(pick).unwrap();
    assert_eq!(decoded.intent, Intent::PickTarget);
    assert_eq!(decoded.pages.target, 1);

    let doc = ctl.handle_action(pick, Some("zh-HANT")).await;
    let (confirm, disabled) = button(&doc, "✅ Translate Message");
    assert!(!disabled);

    let doc = ctl.handle_action(confirm, None).await;
    assert_eq!(doc.status, DialogStatus::Completed);
    assert!(doc.contains_text("哈囉"));
    assert!(doc.contains_text("From German to Chinese (Traditional)"));

    let requests = translator.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, "Hallo");
    assert_eq!(requests[0].source_lang, None);
    assert_eq!(requests[0].target_lang.as_str(), "zh-HANT");

    assert_eq!(ctl.metrics().counter(metric_names::DIALOGS_COMPLETED), 1);
}

#[tokio::test]
async fn source_choice_is_forwarded() {
    let translator = Arc::new(RecordingTranslator {
        requests: Mutex::new(Vec::new()),
    });
    let ctl = controller(translator.clone());
    ctl.trigger(&key(), "  Bonjour  ").await.unwrap();

    let state = SelectionState::new(key()).choose_target(LanguageCode::parse("qa").unwrap());
    let doc = ctl
        .handle_action(&token::encode(Intent::PickSource, &state, Pages::default()), Some("fr"))
        .await;
    assert!(doc.contains_text("French"));
    let (confirm, _) = button(&doc, "✅ Translate Message");
    ctl.handle_action(confirm, None).await;

    let requests = translator.requests.lock();
    assert_eq!(requests[0].text, "Bonjour");
    assert_eq!(requests[0].source_lang.as_ref().map(LanguageCode::as_str), Some("fr"));
}

#[tokio::test(start_paused = true)]
async fn expired_content_fails_the_dialog() {
    let ctl = controller(Arc::new(StubTranslator));
    ctl.cache().put(&key(), "Hallo", Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let state = SelectionState::new(key()).choose_target(LanguageCode::parse("zh-HANT").unwrap());
    let doc = ctl
        .handle_action(&token::encode(Intent::Confirm, &state, Pages::default()), None)
        .await;
    assert_eq!(doc.status, DialogStatus::Failed);
    assert_eq!(doc.error, Some(WorkflowError::ContentExpired));
    assert!(doc.contains_text("Translate Message"));
    assert_eq!(ctl.cache().tracked_keys(), 0);
}

#[tokio::test(start_paused = true)]
async fn hanging_translator_times_out() {
    let ctl = controller(Arc::new(HangingTranslator));
    ctl.trigger(&key(), "Hallo").await.unwrap();

    let state = SelectionState::new(key()).choose_target(LanguageCode::parse("qb").unwrap());
    let doc = ctl
        .handle_action(&token::encode(Intent::Confirm, &state, Pages::default()), None)
        .await;
    assert_eq!(doc.status, DialogStatus::Failed);
    assert_eq!(doc.error, Some(WorkflowError::TranslatorTimeout { timeout_ms: 5000 }));
    assert_eq!(ctl.cache().get(&key()).await.unwrap().as_deref(), Some("Hallo"));
}

#[tokio::test]
async fn storage_fault_surfaces_from_trigger() {
    let metrics = Arc::new(MetricsRegistry::new());
    let cache = EphemeralCache::new(Arc::new(ReadOnlyBackend), Duration::from_secs(60), Arc::clone(&metrics));
    let renderer = WorkflowRenderer::new(Arc::new(wide_catalog()), 25);
    let ctl = WorkflowController::new(cache, renderer, Arc::new(StubTranslator), metrics, Duration::from_secs(5));

    let err = ctl.trigger(&key(), "Hallo").await.unwrap_err();
    assert!(matches!(err, WorkflowError::StorageFault(_)));
    assert_eq!(ctl.cache().tracked_keys(), 0);
}

#[tokio::test]
async fn sqlite_backed_controller_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        cache_db_path: Some(dir.path().join("cells.db")),
        ..Config::default()
    };
    let ctl = WorkflowController::from_config(&config, Arc::new(StubTranslator)).unwrap();
    ctl.trigger(&key(), "Guten Morgen").await.unwrap();

    let state = SelectionState::new(key()).choose_target(LanguageCode::parse("en-GB").unwrap());
    let doc = ctl
        .handle_action(&token::encode(Intent::Confirm, &state, Pages::default()), None)
        .await;
    assert_eq!(doc.status, DialogStatus::Completed);
    assert!(doc.contains_text("[stub en-GB] Guten Morgen"));
    assert!(doc.contains_text("English (British)"));
}
