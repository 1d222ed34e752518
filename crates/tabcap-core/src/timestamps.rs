use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ids::TabId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    Created,
    LastUsed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TabTimestamps {
    created: Option<u64>,
    last_used: Option<u64>,
}

impl TabTimestamps {
    fn get(&self, kind: TimestampKind) -> Option<u64> {
        match kind {
            TimestampKind::Created => self.created,
            TimestampKind::LastUsed => self.last_used,
        }
    }

    fn set(&mut self, kind: TimestampKind, value: u64) {
        match kind {
            TimestampKind::Created => self.created = Some(value),
            TimestampKind::LastUsed => self.last_used = Some(value),
        }
    }
}

/// Per-tab creation and last-used instants, in epoch milliseconds.
pub trait TimestampStore {
    fn get(&self, tab_id: TabId, kind: TimestampKind) -> Option<u64>;

    fn set(&mut self, tab_id: TabId, kind: TimestampKind, value: u64);

    fn remove(&mut self, tab_id: TabId);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryTimestamps {
    entries: BTreeMap<TabId, TabTimestamps>,
}

impl MemoryTimestamps {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TimestampStore for MemoryTimestamps {
    fn get(&self, tab_id: TabId, kind: TimestampKind) -> Option<u64> {
        self.entries.get(&tab_id).and_then(|entry| entry.get(kind))
    }

    fn set(&mut self, tab_id: TabId, kind: TimestampKind, value: u64) {
        self.entries.entry(tab_id).or_default().set(kind, value);
    }

    fn remove(&mut self, tab_id: TabId) {
        self.entries.remove(&tab_id);
    }
}

pub trait Clock {
    fn now_ms(&mut self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl<F: FnMut() -> u64> Clock for F {
    fn now_ms(&mut self) -> u64 {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_tracked_independently_and_removed_together() {
        let mut store = MemoryTimestamps::default();
        let tab = TabId(7);

        store.set(tab, TimestampKind::Created, 100);
        store.set(tab, TimestampKind::LastUsed, 100);
        store.set(tab, TimestampKind::LastUsed, 250);

        assert_eq!(store.get(tab, TimestampKind::Created), Some(100));
        assert_eq!(store.get(tab, TimestampKind::LastUsed), Some(250));
        assert_eq!(store.get(TabId(8), TimestampKind::Created), None);

        store.remove(tab);
        assert!(store.is_empty());
        assert_eq!(store.get(tab, TimestampKind::LastUsed), None);
    }

    #[test]
    fn closure_clock_counts_up() {
        let mut next = 0u64;
        let mut clock = move || {
            next += 1;
            next
        };
        assert_eq!(clock.now_ms(), 1);
        assert_eq!(clock.now_ms(), 2);
    }
}
