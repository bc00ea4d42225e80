//! Console host: drives one dialog from stdin.
//!
//! ```text
//! linguadeep <channel>:<message> <text...>
//! ```
//! Prints each document as JSON. Then reads one action per line,
//! `<token> [value]`, until the dialog completes, fails or stdin closes.
//! The translator is the local stub.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use linguadeep::translate::StubTranslator;
use linguadeep::{init_tracing, Config, ContentKey, DialogStatus, Document, WorkflowController};

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let base = match std::env::var_os("LINGUADEEP_CONFIG").map(PathBuf::from) {
        Some(path) => Config::load_from_file(&path)?,
        None => Config::default(),
    };
    Ok(base.overlay(|name| std::env::var(name).ok())?)
}

fn print(doc: &Document) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(doc)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(&config.log_filter, config.log_json);

    let mut args = std::env::args().skip(1);
    let (Some(raw_key), text) = (args.next(), args.collect::<Vec<_>>().join(" ")) else {
        eprintln!("usage: linguadeep <channel>:<message> <text...>");
        std::process::exit(2);
    };
    let key = ContentKey::parse(&raw_key)?;

    let controller = WorkflowController::from_config(&config, Arc::new(StubTranslator))?;
    info!(ttl_secs = config.cache_ttl_secs, "linguadeep console host starting");

    print(&controller.trigger(&key, &text).await?)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let Some(token) = parts.next() else {
            continue;
        };
        let doc = controller.handle_action(token, parts.next()).await;
        print(&doc)?;
        if doc.status != DialogStatus::Selecting {
            break;
        }
    }

    match serde_json::to_string(&controller.metrics().summary()) {
        Ok(summary) => info!(%summary, "metrics"),
        Err(e) => warn!(error = %e, "metrics summary unavailable"),
    }
    Ok(())
}
