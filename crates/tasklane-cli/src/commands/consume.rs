use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tasklane_core::app::App;
use tasklane_core::impls::InMemoryBroker;
use tasklane_core::ports::{ConsumerRecord, EventSource};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info};

pub async fn run(config: Option<&Path>, input: &str) -> Result<()> {
    let app = super::load_app(config)?;

    if input == "-" {
        replay(&app, tokio::io::stdin()).await
    } else {
        let file = tokio::fs::File::open(input)
            .await
            .with_context(|| format!("failed to open {input}"))?;
        replay(&app, file).await
    }
}

/// Load every record, run the lanes until they drain, and fail if any lane halted.
async fn replay<R>(app: &App, reader: R) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let broker = InMemoryBroker::new();
    let count = load_records(&broker, reader).await?;
    broker.close().await;
    info!(records = count, "records loaded");

    let sources: Vec<Arc<dyn EventSource>> = broker
        .sources()
        .await
        .into_iter()
        .map(|source| Arc::new(source) as Arc<dyn EventSource>)
        .collect();
    let reports = app.spawn_lanes(sources).join().await;

    let mut halted = 0;
    for report in &reports {
        if report.exit.is_halted() {
            halted += 1;
            error!("{}", report.summary());
        } else {
            info!("{}", report.summary());
        }
    }
    if halted > 0 {
        bail!("{halted} lane(s) halted; fix the record or add it to the skip list");
    }
    Ok(())
}

async fn load_records<R>(broker: &InMemoryBroker, reader: R) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut count = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: ConsumerRecord = serde_json::from_str(&line)
            .with_context(|| format!("line {line_no} is not a broker record"))?;
        broker
            .publish_record(record)
            .await
            .with_context(|| format!("line {line_no} rejected"))?;
        count += 1;
    }
    Ok(count)
}
