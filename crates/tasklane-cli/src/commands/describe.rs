use std::path::Path;

use anyhow::{Context, Result};
use tasklane_core::app::task_for_event;
use tasklane_core::domain::TaskRequestEvent;
use tasklane_core::ports::{Clock, SystemClock};

pub async fn run(event: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(event)
        .await
        .with_context(|| format!("failed to read {}", event.display()))?;
    let event = TaskRequestEvent::from_json(&content).context("invalid create event")?;
    let task = task_for_event(&event, SystemClock.today())?;
    println!("{}", serde_json::to_string_pretty(&task)?);
    Ok(())
}
