use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RelayStats {
    routed_signals: AtomicU64,
    dropped_signals: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayStatsSnapshot {
    pub routed_signals: u64,
    pub dropped_signals: u64,
}

impl RelayStats {
    pub fn record_routed(&self) {
        self.routed_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            routed_signals: self.routed_signals.load(Ordering::Relaxed),
            dropped_signals: self.dropped_signals.load(Ordering::Relaxed),
        }
    }
}
