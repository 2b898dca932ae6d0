//! Wires the locator, the tailer and stdout together.

use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use zonewatch_game_log::{LogWatcher, Tailer, channel_sink};
use zonewatch_locator::{Locator, LocatorConfig};
use zonewatch_protocol::LogEvent;

use crate::config::Config;

/// Runs until Ctrl-C, printing each event as one JSON line.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let locator = Locator::new(config.locator_config(LocatorConfig::from_env()));
    let tailer = Tailer::new(locator, config.tail_options());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = LogWatcher::new();
    watcher
        .start(tailer, channel_sink(tx))
        .await
        .context("cannot start watching the client log")?;

    let mut stdout = tokio::io::stdout();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("SIGINT received, shutting down");
                break;
            }
            event = rx.recv() => match event {
                Some(event) => write_event(&mut stdout, &event).await?,
                None => {
                    tracing::warn!("tail task ended unexpectedly");
                    break;
                }
            },
        }
    }

    if let Some(stats) = watcher.stats().await {
        tracing::info!(?stats, "final counters");
    }
    watcher.stop().await?;
    Ok(())
}

async fn write_event<W>(out: &mut W, event: &LogEvent) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}
