use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Diagnostic counters, updated by the tailer and readable from any thread.
#[derive(Debug, Default)]
pub struct TailStats {
    binds: AtomicU64,
    rotations: AtomicU64,
    losses: AtomicU64,
    lines_read: AtomicU64,
    events_emitted: AtomicU64,
    parse_anomalies: AtomicU64,
    transient_errors: AtomicU64,
}

/// Point-in-time copy of [`TailStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub binds: u64,
    pub rotations: u64,
    pub losses: u64,
    pub lines_read: u64,
    pub events_emitted: u64,
    pub parse_anomalies: u64,
    pub transient_errors: u64,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        pub(crate) fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl TailStats {
    counter!(inc_binds, binds);
    counter!(inc_rotations, rotations);
    counter!(inc_losses, losses);
    counter!(inc_lines_read, lines_read);
    counter!(inc_events_emitted, events_emitted);
    counter!(inc_parse_anomalies, parse_anomalies);
    counter!(inc_transient_errors, transient_errors);

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            binds: self.binds.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            losses: self.losses.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            parse_anomalies: self.parse_anomalies.load(Ordering::Relaxed),
            transient_errors: self.transient_errors.load(Ordering::Relaxed),
        }
    }
}
