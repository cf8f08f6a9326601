use std::path::Path;

use anyhow::{Context, Result, bail};
use tasklane_core::config::LedgerConfig;
use tracing::info;

pub async fn run(config: Option<&Path>, candidates: Option<&Path>) -> Result<()> {
    let app = super::load_app(config)?;
    require_durable_ledger(&app.config().ledger)?;

    let report = match candidates {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let ids = parse_candidates(&content);
            info!(candidates = ids.len(), path = %path.display(), "sweeping candidates from file");
            app.reconciler().sweep(&ids).await
        }
        None => app.reconcile_configured().await,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// A memory ledger forgets its markers on exit, so a later sweep would
/// create the same follow-up task again.
fn require_durable_ledger(ledger: &LedgerConfig) -> Result<()> {
    if !ledger.is_durable() {
        bail!("reconcile needs a durable ledger; set [ledger] kind = \"dir\" with a path");
    }
    Ok(())
}

/// One document id per line; blank lines and `#` comments are ignored.
fn parse_candidates(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
