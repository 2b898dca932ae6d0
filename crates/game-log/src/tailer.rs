//! Incremental reader for the client log.
//!
//! `Tailer` owns the file handle, the cursor and the partial-line buffer and
//! moves between three states:
//!
//! - `Unbound`: nothing opened yet.
//! - `Bound`: file open, cursor valid. Each poll stats the path, detects
//!   replacement/truncation, reads the new delta and emits complete lines.
//! - `Lost`: the file vanished. Resolution is retried with backoff.
//!
//! Every poll does a bounded amount of work: one stat, at most one short
//! head read, and at most `max_read_bytes` of new data.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use zonewatch_locator::Locate;
use zonewatch_protocol::LogEvent;

use crate::TailError;
use crate::cursor::Cursor;
use crate::file_id::FileId;
use crate::parser::{LineParser, ParseOutcome};
use crate::stats::TailStats;

/// Where reading starts when binding to a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartAt {
    /// Only new activity: start at the current end of file.
    #[default]
    End,
    /// Replay the whole file. Meant for testing and debugging.
    Beginning,
}

/// Tailer tuning.
#[derive(Debug, Clone)]
pub struct TailOptions {
    pub start_at: StartAt,
    pub poll_interval: Duration,
    /// Upper bound on bytes read per poll.
    pub max_read_bytes: usize,
    /// A partial line longer than this is dropped.
    pub max_line_bytes: usize,
    /// Bytes of the file head kept to detect in-place rewrites.
    pub fingerprint_size: usize,
    pub lost_backoff_initial: Duration,
    pub lost_backoff_max: Duration,
    /// Wake on filesystem notifications in addition to the timer.
    pub use_notify: bool,
    pub notify_debounce: Duration,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            start_at: StartAt::End,
            poll_interval: Duration::from_millis(500),
            max_read_bytes: 1024 * 1024,
            max_line_bytes: 64 * 1024,
            fingerprint_size: 256,
            lost_backoff_initial: Duration::from_secs(1),
            lost_backoff_max: Duration::from_secs(30),
            use_notify: true,
            notify_debounce: Duration::from_millis(100),
        }
    }
}

/// Externally visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Unbound,
    Bound,
    Lost,
}

/// Why the cursor was reset to the start of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// A different file now sits at the path.
    Replaced,
    /// Same file, now shorter than the cursor.
    Truncated,
    /// Same file and longer, but its head changed.
    Rewritten,
}

impl ResetReason {
    fn as_str(self) -> &'static str {
        match self {
            ResetReason::Replaced => "replaced",
            ResetReason::Truncated => "truncated",
            ResetReason::Rewritten => "rewritten",
        }
    }
}

/// Result of one [`Tailer::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Bound, nothing new.
    Idle,
    /// Read everything that was available.
    Read { bytes: u64, events: usize },
    /// Read the per-poll maximum; more data is waiting.
    MoreAvailable { bytes: u64, events: usize },
    /// Bound to a file, initially or after a loss.
    Bound(PathBuf),
    /// Reopened the path and reset the cursor to zero.
    Reset(ResetReason),
    /// The file disappeared; the handle was dropped.
    Lost,
    /// Not bound and no file found (or still backing off).
    Searching,
}

impl PollOutcome {
    /// Returns `true` when the next poll should run without waiting.
    pub fn wants_repoll(&self) -> bool {
        matches!(
            self,
            PollOutcome::MoreAvailable { .. } | PollOutcome::Bound(_) | PollOutcome::Reset(_)
        )
    }
}

struct BoundFile {
    path: PathBuf,
    file: File,
    cursor: Cursor,
    /// Retry schedule while I/O keeps failing. Only the first failure of a
    /// streak is logged.
    io_backoff: Option<Backoff>,
}

struct Backoff {
    next_attempt: Instant,
    delay: Duration,
    /// Whether the failure was already reported for this streak.
    reported: bool,
}

enum State {
    Unbound,
    Bound(BoundFile),
    Lost(Backoff),
}

/// Single-reader tail over the located client log.
pub struct Tailer<L> {
    locator: L,
    options: TailOptions,
    parser: LineParser,
    state: State,
    pending: Vec<u8>,
    /// Drop bytes up to the next newline.
    discard_partial: bool,
    stats: Arc<TailStats>,
}

impl<L: Locate> Tailer<L> {
    pub fn new(locator: L, options: TailOptions) -> Self {
        Self {
            locator,
            options,
            parser: LineParser::default(),
            state: State::Unbound,
            pending: Vec::new(),
            discard_partial: false,
            stats: Arc::new(TailStats::default()),
        }
    }

    /// Replaces the default pattern table.
    pub fn with_parser(mut self, parser: LineParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn options(&self) -> &TailOptions {
        &self.options
    }

    pub fn state(&self) -> TailState {
        match self.state {
            State::Unbound => TailState::Unbound,
            State::Bound(_) => TailState::Bound,
            State::Lost(_) => TailState::Lost,
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        match &self.state {
            State::Bound(b) => Some(&b.cursor),
            _ => None,
        }
    }

    pub fn bound_path(&self) -> Option<&Path> {
        match &self.state {
            State::Bound(b) => Some(&b.path),
            _ => None,
        }
    }

    /// Bytes held after the last newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> Arc<TailStats> {
        Arc::clone(&self.stats)
    }

    /// First resolution at startup.
    ///
    /// An invalid override is returned as an error here instead of being
    /// retried. Returns whether a file was bound.
    pub fn bind_initial(&mut self) -> Result<bool, TailError> {
        match self.locator.resolve()? {
            Some(path) => Ok(self.bind(path)),
            None => {
                self.back_off(|| tracing::info!("client log not found yet, will keep looking"));
                Ok(false)
            }
        }
    }

    /// Advances the state machine once, passing each parsed event to `emit`
    /// in the order the lines were read.
    pub fn poll(&mut self, emit: &mut dyn FnMut(LogEvent)) -> PollOutcome {
        match &self.state {
            State::Bound(_) => self.poll_bound(emit),
            State::Unbound => self.try_resolve(),
            State::Lost(b) if Instant::now() >= b.next_attempt => self.try_resolve(),
            State::Lost(_) => PollOutcome::Searching,
        }
    }

    fn try_resolve(&mut self) -> PollOutcome {
        match self.locator.resolve() {
            Ok(Some(path)) => {
                if self.bind(path.clone()) {
                    PollOutcome::Bound(path)
                } else {
                    PollOutcome::Searching
                }
            }
            Ok(None) => {
                self.back_off(|| tracing::info!("client log not found, will keep looking"));
                PollOutcome::Searching
            }
            Err(e) => {
                self.back_off(|| tracing::warn!(error = %e, "client log override became invalid"));
                PollOutcome::Searching
            }
        }
    }

    /// Delay after `previous`: the initial delay, then doubling up to the max.
    fn next_delay(&self, previous: Option<&Backoff>) -> Duration {
        match previous {
            Some(b) if !b.delay.is_zero() => (b.delay * 2).min(self.options.lost_backoff_max),
            _ => self.options.lost_backoff_initial,
        }
    }

    /// Enters (or stays in) `Lost`, doubling the retry delay.
    fn back_off(&mut self, report: impl FnOnce()) {
        let (delay, reported) = match &self.state {
            State::Lost(b) => (self.next_delay(Some(b)), b.reported),
            _ => (self.next_delay(None), false),
        };
        if !reported {
            report();
        }
        self.state = State::Lost(Backoff {
            next_attempt: Instant::now() + delay,
            delay,
            reported: true,
        });
    }

    fn bind(&mut self, path: PathBuf) -> bool {
        // Release any previous handle before opening a new one. A pending
        // backoff is kept so repeated open failures keep doubling it.
        let previous = match std::mem::replace(&mut self.state, State::Unbound) {
            State::Lost(backoff) => Some(backoff),
            _ => None,
        };
        self.pending.clear();
        self.discard_partial = false;

        match open_at(&path, self.options.start_at, self.options.fingerprint_size) {
            Ok((file, cursor, mid_line)) => {
                tracing::info!(
                    path = %path.display(),
                    file_id = %cursor.id(),
                    offset = cursor.offset(),
                    "bound to client log"
                );
                self.discard_partial = mid_line;
                self.stats.inc_binds();
                self.state = State::Bound(BoundFile {
                    path,
                    file,
                    cursor,
                    io_backoff: None,
                });
                true
            }
            Err(e) => {
                if let Some(backoff) = previous {
                    self.state = State::Lost(backoff);
                }
                self.stats.inc_transient_errors();
                tracing::debug!(path = %path.display(), error = %e, "failed to open client log");
                self.back_off(|| tracing::warn!(error = %e, "client log found but could not be opened"));
                false
            }
        }
    }

    fn poll_bound(&mut self, emit: &mut dyn FnMut(LogEvent)) -> PollOutcome {
        let State::Bound(bound) = &mut self.state else {
            return PollOutcome::Searching;
        };
        if bound
            .io_backoff
            .as_ref()
            .is_some_and(|b| Instant::now() < b.next_attempt)
        {
            return PollOutcome::Idle;
        }

        let meta = match fs::metadata(&bound.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.lose(),
            Err(e) => return self.transient(e),
        };
        let size = meta.len();
        let offset = bound.cursor.offset();

        if FileId::from_metadata(&meta) != bound.cursor.id() {
            // The old handle still reaches the replaced file; pick up any
            // complete lines written to it before the swap.
            let old_size = bound.file.metadata().map(|m| m.len()).unwrap_or(offset);
            let leftover =
                read_delta(bound, old_size, self.options.max_read_bytes).unwrap_or_default();
            self.consume(&leftover, emit);
            return self.reset(ResetReason::Replaced);
        }
        if size < offset {
            return self.reset(ResetReason::Truncated);
        }
        // Checked even without growth: a rewrite may end exactly at the old
        // offset.
        match bound.cursor.head_matches(&mut bound.file) {
            Ok(true) => {}
            Ok(false) => return self.reset(ResetReason::Rewritten),
            Err(e) => return self.transient(e),
        }
        if size == offset {
            bound.io_backoff = None;
            return PollOutcome::Idle;
        }

        let buf = match read_delta(bound, size, self.options.max_read_bytes) {
            Ok(buf) => buf,
            Err(e) => return self.transient(e),
        };
        if let Err(e) = bound
            .cursor
            .extend_head(&mut bound.file, self.options.fingerprint_size)
        {
            tracing::trace!(error = %e, "failed to extend head fingerprint");
        }
        bound.io_backoff = None;
        let more = bound.cursor.offset() < size;
        tracing::trace!(offset = bound.cursor.offset(), size, "read client log delta");

        let bytes = buf.len() as u64;
        let events = self.consume(&buf, emit);
        if more {
            PollOutcome::MoreAvailable { bytes, events }
        } else {
            PollOutcome::Read { bytes, events }
        }
    }

    /// Reopens the bound path from offset zero.
    fn reset(&mut self, reason: ResetReason) -> PollOutcome {
        let Some(path) = self.bound_path().map(Path::to_path_buf) else {
            return PollOutcome::Searching;
        };
        let old_offset = self.cursor().map_or(0, Cursor::offset);

        // Drops the old handle first.
        self.state = State::Unbound;
        self.pending.clear();
        self.discard_partial = false;

        match open_at(&path, StartAt::Beginning, self.options.fingerprint_size) {
            Ok((file, cursor, _)) => {
                tracing::info!(
                    path = %path.display(),
                    reason = reason.as_str(),
                    old_offset,
                    file_id = %cursor.id(),
                    "client log rotated, reading from start"
                );
                self.stats.inc_rotations();
                self.state = State::Bound(BoundFile {
                    path,
                    file,
                    cursor,
                    io_backoff: None,
                });
                PollOutcome::Reset(reason)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to reopen rotated client log");
                self.stats.inc_transient_errors();
                self.lose()
            }
        }
    }

    fn lose(&mut self) -> PollOutcome {
        if let Some(path) = self.bound_path() {
            tracing::info!(path = %path.display(), "client log lost, searching again");
        }
        self.state = State::Lost(Backoff {
            next_attempt: Instant::now(),
            delay: Duration::ZERO,
            reported: false,
        });
        self.pending.clear();
        self.discard_partial = false;
        self.stats.inc_losses();
        PollOutcome::Lost
    }

    /// Records an I/O failure on the bound file and delays the next read.
    fn transient(&mut self, e: io::Error) -> PollOutcome {
        self.stats.inc_transient_errors();
        let delay = match &self.state {
            State::Bound(bound) => self.next_delay(bound.io_backoff.as_ref()),
            _ => return PollOutcome::Idle,
        };
        if let State::Bound(bound) = &mut self.state {
            if bound.io_backoff.is_none() {
                tracing::warn!(path = %bound.path.display(), error = %e, "client log read failed, retrying");
            }
            bound.io_backoff = Some(Backoff {
                next_attempt: Instant::now() + delay,
                delay,
                reported: true,
            });
        }
        PollOutcome::Idle
    }

    /// Appends `bytes` to the pending buffer and emits every complete line.
    fn consume(&mut self, bytes: &[u8], emit: &mut dyn FnMut(LogEvent)) -> usize {
        self.pending.extend_from_slice(bytes);
        let mut events = 0;
        let mut start = 0;

        while let Some(nl) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + nl;
            if self.discard_partial {
                self.discard_partial = false;
            } else {
                self.stats.inc_lines_read();
                match self.parser.parse(&self.pending[start..end]) {
                    ParseOutcome::Event(event) => {
                        self.stats.inc_events_emitted();
                        tracing::debug!(kind = event.kind(), "client log event");
                        emit(event);
                        events += 1;
                    }
                    ParseOutcome::Anomaly { pattern, reason } => {
                        self.stats.inc_parse_anomalies();
                        tracing::debug!(pattern, reason = %reason, "discarding malformed line");
                    }
                    ParseOutcome::Ignored => {}
                }
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.discard_partial {
            // Still inside a line being skipped.
            self.pending.clear();
        } else if self.pending.len() > self.options.max_line_bytes {
            self.stats.inc_parse_anomalies();
            tracing::debug!(len = self.pending.len(), "line too long, discarding");
            self.pending.clear();
            self.discard_partial = true;
        }

        events
    }
}

/// Opens `path` and places a cursor per `start`.
///
/// The flag is set when starting mid-line at the end of the file.
fn open_at(path: &Path, start: StartAt, fingerprint_size: usize) -> io::Result<(File, Cursor, bool)> {
    let mut file = File::open(path)?;
    let meta = file.metadata()?;
    let len = meta.len();
    let offset = match start {
        StartAt::End => len,
        StartAt::Beginning => 0,
    };

    let mut cursor = Cursor::new(FileId::from_metadata(&meta), offset);
    cursor.extend_head(&mut file, fingerprint_size)?;

    let mid_line = if offset > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(offset - 1))?;
        file.read_exact(&mut last)?;
        last[0] != b'\n'
    } else {
        false
    };

    Ok((file, cursor, mid_line))
}

/// Reads `[offset, size)` from the bound file, capped at `max` bytes, and
/// advances the cursor past what was read.
fn read_delta(bound: &mut BoundFile, size: u64, max: usize) -> io::Result<Vec<u8>> {
    let offset = bound.cursor.offset();
    let want = size.saturating_sub(offset).min(max.max(1) as u64);
    let mut buf = Vec::with_capacity(want as usize);
    bound.file.seek(SeekFrom::Start(offset))?;
    (&mut bound.file).take(want).read_to_end(&mut buf)?;
    bound.cursor.advance(buf.len() as u64);
    Ok(buf)
}
