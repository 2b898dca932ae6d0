//! Async driver for [`Tailer`]: a poll timer plus optional filesystem
//! notifications, cancelled through a `CancellationToken`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use zonewatch_locator::Locate;
use zonewatch_protocol::LogEvent;

use crate::TailError;
use crate::stats::{StatsSnapshot, TailStats};
use crate::tailer::{TailOptions, TailState, Tailer};

/// Callback invoked with each parsed event, in log order.
pub type OnEventFn = Box<dyn FnMut(LogEvent) + Send + 'static>;

/// Forwards events into an unbounded channel.
pub fn channel_sink(tx: mpsc::UnboundedSender<LogEvent>) -> OnEventFn {
    Box::new(move |event| {
        if tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    })
}

/// Polls `tailer` until `cancel` fires.
///
/// An unbound tailer is bound first; an invalid override at that point is
/// the only error returned. After startup every failure is handled inside
/// the tailer.
pub async fn run_tail_loop<L, F>(
    mut tailer: Tailer<L>,
    cancel: CancellationToken,
    mut on_event: F,
) -> Result<(), TailError>
where
    L: Locate,
    F: FnMut(LogEvent),
{
    if tailer.state() == TailState::Unbound {
        tailer.bind_initial()?;
    }

    let mut wake = Wake::new(tailer.options());
    let period = tailer.options().poll_interval.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        loop {
            let outcome = tailer.poll(&mut on_event);
            if !outcome.wants_repoll() || cancel.is_cancelled() {
                break;
            }
            tokio::task::yield_now().await;
        }
        wake.follow(tailer.bound_path());

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
            _ = wake.changed() => {}
        }
    }

    let stats = tailer.stats().snapshot();
    tracing::debug!(?stats, "tail loop stopped");
    Ok(())
}

/// Debounced change notifications for the directory holding the log.
struct Wake {
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    rx: Option<mpsc::Receiver<()>>,
    watched: Option<PathBuf>,
}

impl Wake {
    fn disabled() -> Self {
        Self {
            debouncer: None,
            rx: None,
            watched: None,
        }
    }

    fn new(options: &TailOptions) -> Self {
        if !options.use_notify {
            return Self::disabled();
        }

        let (tx, rx) = mpsc::channel(1);
        let handler = move |res: DebounceEventResult| match res {
            Ok(events) if !events.is_empty() => {
                // A wake-up already queued covers this one too.
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "file watch error"),
        };

        match new_debouncer(options.notify_debounce, handler) {
            Ok(debouncer) => Self {
                debouncer: Some(debouncer),
                rx: Some(rx),
                watched: None,
            },
            Err(e) => {
                tracing::debug!(error = %e, "file notifications unavailable, polling only");
                Self::disabled()
            }
        }
    }

    /// Keeps the watch on the parent directory of the bound file.
    fn follow(&mut self, bound: Option<&Path>) {
        let Some(debouncer) = self.debouncer.as_mut() else {
            return;
        };
        let dir = bound.and_then(Path::parent).map(Path::to_path_buf);
        if dir == self.watched {
            return;
        }

        if let Some(old) = self.watched.take() {
            let _ = debouncer.watcher().unwatch(&old);
        }
        if let Some(dir) = dir {
            match debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    tracing::debug!(dir = %dir.display(), "watching log directory");
                    self.watched = Some(dir);
                }
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "failed to watch log directory");
                }
            }
        }
    }

    /// Resolves on the next notification. Never resolves when disabled.
    async fn changed(&mut self) {
        match self.rx.as_mut() {
            Some(rx) => {
                if rx.recv().await.is_none() {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Owns a background tail task.
pub struct LogWatcher {
    inner: Arc<Mutex<WatcherState>>,
}

struct WatcherState {
    running: Option<Running>,
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), TailError>>,
    stats: Arc<TailStats>,
}

impl Default for LogWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LogWatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(WatcherState { running: None })),
        }
    }

    /// Binds `tailer` and spawns its poll loop.
    ///
    /// Startup resolution runs before spawning, so an invalid override is
    /// returned here. A previous tail, if any, is stopped first.
    pub async fn start<L>(&self, mut tailer: Tailer<L>, on_event: OnEventFn) -> Result<(), TailError>
    where
        L: Locate + 'static,
    {
        let mut state = self.inner.lock().await;

        if let Some(prev) = state.running.take() {
            prev.cancel.cancel();
            let _ = prev.task.await;
            tracing::debug!("stopped previous tail");
        }

        tailer.bind_initial()?;

        let cancel = CancellationToken::new();
        let stats = tailer.stats();
        let task = tokio::spawn(run_tail_loop(tailer, cancel.clone(), on_event));
        state.running = Some(Running {
            cancel,
            task,
            stats,
        });

        tracing::info!("started tailing client log");
        Ok(())
    }

    /// Cancels the tail task and waits for it to finish.
    pub async fn stop(&self) -> Result<(), TailError> {
        let Some(running) = self.inner.lock().await.running.take() else {
            return Ok(());
        };
        running.cancel.cancel();
        let result = match running.task.await {
            Ok(result) => result,
            Err(e) => Err(TailError::Task(e.to_string())),
        };
        tracing::info!(stats = ?running.stats.snapshot(), "stopped tailing client log");
        result
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .lock()
            .await
            .running
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// Counters of the running tail.
    pub async fn stats(&self) -> Option<StatsSnapshot> {
        self.inner
            .lock()
            .await
            .running
            .as_ref()
            .map(|r| r.stats.snapshot())
    }
}
