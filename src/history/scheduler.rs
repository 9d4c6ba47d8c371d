//! Per-key debounce for bursty edits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoalesceKey(String);

impl CoalesceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoalesceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CoalesceKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for CoalesceKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Identifies one scheduled timer. A reschedule under the same key always
/// yields a new handle, so a stale handle never matches the live timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct PendingCommit<P> {
    handle: TimerHandle,
    deadline_ms: u64,
    payload: P,
    /// Number of schedule calls folded into this commit.
    coalesced: u32,
}

/// A payload released by the scheduler, ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct DuePayload<P> {
    pub key: CoalesceKey,
    pub payload: P,
    pub coalesced: u32,
}

#[derive(Debug)]
pub struct CoalescingScheduler<P> {
    pending: HashMap<CoalesceKey, PendingCommit<P>>,
    next_handle: u64,
    default_delay_ms: u64,
}

impl<P> Default for CoalescingScheduler<P> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl<P> CoalescingScheduler<P> {
    pub fn new(default_delay_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            next_handle: 0,
            default_delay_ms,
        }
    }

    pub fn default_delay_ms(&self) -> u64 {
        self.default_delay_ms
    }

    pub fn schedule(&mut self, key: impl Into<CoalesceKey>, payload: P, now_ms: u64) -> TimerHandle {
        self.schedule_with_delay(key, payload, now_ms, self.default_delay_ms)
    }

    /// Starts (or restarts) the timer for `key`. Any payload already pending
    /// under that key is dropped in favour of the new one.
    pub fn schedule_with_delay(
        &mut self,
        key: impl Into<CoalesceKey>,
        payload: P,
        now_ms: u64,
        delay_ms: u64,
    ) -> TimerHandle {
        self.schedule_merged(key, payload, now_ms, delay_ms, |_, next| next)
    }

    /// Like [`schedule_with_delay`](Self::schedule_with_delay), but a payload
    /// already pending under `key` is folded into the new one with
    /// `merge(previous, next)` instead of being dropped.
    pub fn schedule_merged<F>(
        &mut self,
        key: impl Into<CoalesceKey>,
        payload: P,
        now_ms: u64,
        delay_ms: u64,
        merge: F,
    ) -> TimerHandle
    where
        F: FnOnce(P, P) -> P,
    {
        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = TimerHandle(self.next_handle);
        let deadline_ms = now_ms.saturating_add(delay_ms);

        let key = key.into();
        let (payload, coalesced) = match self.pending.remove(&key) {
            Some(previous) => (
                merge(previous.payload, payload),
                previous.coalesced.saturating_add(1),
            ),
            None => (payload, 1),
        };
        self.pending.insert(
            key,
            PendingCommit {
                handle,
                deadline_ms,
                payload,
                coalesced,
            },
        );
        handle
    }

    /// Releases every payload whose deadline has passed, earliest first.
    pub fn expire(&mut self, now_ms: u64) -> Vec<DuePayload<P>> {
        let due: Vec<CoalesceKey> = self
            .pending
            .iter()
            .filter(|(_, commit)| commit.deadline_ms <= now_ms)
            .map(|(key, _)| key.clone())
            .collect();
        self.take_ordered(due)
    }

    pub fn flush(&mut self, key: &CoalesceKey) -> Option<DuePayload<P>> {
        self.pending.remove_entry(key).map(|(key, commit)| DuePayload {
            key,
            payload: commit.payload,
            coalesced: commit.coalesced,
        })
    }

    pub fn flush_all(&mut self) -> Vec<DuePayload<P>> {
        let keys: Vec<CoalesceKey> = self.pending.keys().cloned().collect();
        self.take_ordered(keys)
    }

    pub fn cancel(&mut self, key: &CoalesceKey) -> Option<P> {
        self.pending.remove(key).map(|commit| commit.payload)
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, key: &CoalesceKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn handle_for(&self, key: &CoalesceKey) -> Option<TimerHandle> {
        self.pending.get(key).map(|commit| commit.handle)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.pending.values().map(|commit| commit.deadline_ms).min()
    }

    fn take_ordered(&mut self, keys: Vec<CoalesceKey>) -> Vec<DuePayload<P>> {
        let mut released: Vec<(u64, TimerHandle, DuePayload<P>)> = keys
            .into_iter()
            .filter_map(|key| {
                self.pending.remove_entry(&key).map(|(key, commit)| {
                    (
                        commit.deadline_ms,
                        commit.handle,
                        DuePayload {
                            key,
                            payload: commit.payload,
                            coalesced: commit.coalesced,
                        },
                    )
                })
            })
            .collect();
        released.sort_by_key(|(deadline, handle, _)| (*deadline, *handle));
        released.into_iter().map(|(_, _, due)| due).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_keeps_last_payload() {
        let mut scheduler = CoalescingScheduler::new(300);
        let first = scheduler.schedule("slider", "v1", 0);
        let second = scheduler.schedule("slider", "v2", 100);
        assert_ne!(first, second);
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(
            scheduler.handle_for(&CoalesceKey::from("slider")),
            Some(second)
        );

        // restarted timer: the first deadline (300) no longer applies
        assert!(scheduler.expire(300).is_empty());

        let due = scheduler.expire(400);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].payload, "v2");
        assert_eq!(due[0].coalesced, 2);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn keys_are_independent() {
        let mut scheduler = CoalescingScheduler::new(100);
        scheduler.schedule("a", 1, 0);
        scheduler.schedule("b", 2, 50);

        let due = scheduler.expire(120);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key.as_str(), "a");
        assert!(scheduler.is_pending(&CoalesceKey::from("b")));
        assert_eq!(scheduler.next_deadline(), Some(150));
    }

    #[test]
    fn flush_commits_instead_of_dropping() {
        let mut scheduler = CoalescingScheduler::new(1_000);
        scheduler.schedule("name", "Cube.001", 0);

        let flushed = scheduler
            .flush(&CoalesceKey::from("name"))
            .expect("pending payload flushed");
        assert_eq!(flushed.payload, "Cube.001");
        assert!(scheduler.flush(&CoalesceKey::from("name")).is_none());
    }

    #[test]
    fn flush_all_is_idempotent_and_ordered() {
        let mut scheduler = CoalescingScheduler::new(100);
        assert!(scheduler.flush_all().is_empty());

        scheduler.schedule("late", 2, 50);
        scheduler.schedule("early", 1, 0);
        let flushed: Vec<_> = scheduler
            .flush_all()
            .into_iter()
            .map(|due| due.payload)
            .collect();
        assert_eq!(flushed, vec![1, 2]);
        assert!(scheduler.flush_all().is_empty());
    }

    #[test]
    fn cancel_drops_payload() {
        let mut scheduler = CoalescingScheduler::new(100);
        scheduler.schedule("a", 1, 0);
        scheduler.schedule("b", 2, 0);
        assert_eq!(scheduler.cancel(&CoalesceKey::from("a")), Some(1));
        assert_eq!(scheduler.cancel_all(), 1);
        assert!(scheduler.expire(u64::MAX).is_empty());
    }

    #[test]
    fn merged_schedule_folds_previous_payload() {
        let mut scheduler = CoalescingScheduler::new(100);
        scheduler.schedule_merged("drag", (0, 1), 0, 100, |_, next| next);
        scheduler.schedule_merged("drag", (1, 2), 10, 100, |prev: (i32, i32), next: (i32, i32)| {
            (prev.0, next.1)
        });
        scheduler.schedule_merged("drag", (2, 3), 20, 100, |prev: (i32, i32), next: (i32, i32)| {
            (prev.0, next.1)
        });

        let due = scheduler.expire(120);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].payload, (0, 3));
        assert_eq!(due[0].coalesced, 3);
    }
}
