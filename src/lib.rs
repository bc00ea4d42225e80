//! LinguaDeep: message-translation dialog for a stateless interaction handler.
//! Dialog state travels in component custom ids; message content waits in a
//! TTL-bounded, key-partitioned cache until the user confirms.

pub mod cache;
pub mod cancellation;
pub mod config;
pub mod controller;
pub mod dialog;
pub mod error;
pub mod metrics;
pub mod state_machine;
pub mod translate;

pub use cache::{CellBackend, EphemeralCache};
pub use config::Config;
pub use controller::WorkflowController;
pub use dialog::render::{DialogStatus, Document};
pub use dialog::{ContentKey, LanguageCode, SelectionState};
pub use error::WorkflowError;
pub use translate::{SettingsStore, TranslateError, TranslateRequest, Translation, Translator};

/// Install the global tracing subscriber. `RUST_LOG` wins over `filter`.
pub fn init_tracing(filter: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(filter))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("linguadeep=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);
    // Ignore the error if a subscriber is already installed (tests, embedding hosts).
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
