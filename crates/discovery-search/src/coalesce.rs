//! Single-flight loading for identical concurrent requests.
//!
//! When several threads ask for the same key at once, only the first
//! ("leader") runs the loader; the others ("joiners") wait for the leader
//! and receive a clone of its value.
//!
//! - Joiners wait in short slices and check their own [`SearchContext`]
//!   between slices, so a cancelled joiner leaves promptly even while the
//!   leader keeps working.
//! - If the leader fails (including its own cancellation) its joiners
//!   register again: one of them becomes the new leader with its own
//!   context and the rest join it.
//! - A panicking leader wakes its joiners and clears its slot before the
//!   panic resumes.
//! - Keys are spread over 16 independently locked shards.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::context::SearchContext;
use crate::error::DiscoveryResult;

const NUM_SHARDS: usize = 16;

fn panic_payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return format!("leader panicked: {msg}");
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return format!("leader panicked: {msg}");
    }
    "leader panicked".to_string()
}

// ---------------------------------------------------------------------------
// Slot: shared state between leader and joiners
// ---------------------------------------------------------------------------

enum SlotState<V> {
    Pending,
    Ready(V),
    Failed(String),
}

struct Slot<V> {
    state: Mutex<SlotState<V>>,
    done: Condvar,
}

/// What a joiner saw after one wait slice.
enum JoinPoll<V> {
    Ready(V),
    Failed(String),
    Pending,
}

impl<V: Clone> Slot<V> {
    const fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            done: Condvar::new(),
        }
    }

    fn complete_ok(&self, value: &V) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = SlotState::Ready(value.clone());
        drop(state);
        self.done.notify_all();
    }

    fn complete_err(&self, msg: String) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = SlotState::Failed(msg);
        drop(state);
        self.done.notify_all();
    }

    #[allow(clippy::significant_drop_tightening)] // guard is consumed by wait_timeout_while
    fn wait_slice(&self, slice: Duration) -> JoinPoll<V> {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .done
            .wait_timeout_while(guard, slice, |s| matches!(s, SlotState::Pending))
            .unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            SlotState::Ready(v) => JoinPoll::Ready(v.clone()),
            SlotState::Failed(msg) => JoinPoll::Failed(msg.clone()),
            SlotState::Pending => JoinPoll::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Outcome of a coalesced load.
#[derive(Debug)]
pub enum CoalesceOutcome<V> {
    /// This thread ran the loader.
    Executed(V),
    /// This thread received the value another thread loaded.
    Joined(V),
}

impl<V> CoalesceOutcome<V> {
    pub fn into_inner(self) -> V {
        match self {
            Self::Executed(v) | Self::Joined(v) => v,
        }
    }

    #[must_use]
    pub const fn was_joined(&self) -> bool {
        matches!(self, Self::Joined(_))
    }
}

/// Snapshot of coalescing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalesceMetrics {
    /// Loader executions, including joiners promoted after a failure.
    pub leader_count: u64,
    /// Joins that received the leader's value.
    pub joined_count: u64,
    /// Joins abandoned because the joiner was cancelled.
    pub cancelled_join_count: u64,
    /// Joins where the leader failed and the joiner registered again.
    pub leader_failed_count: u64,
}

// ---------------------------------------------------------------------------
// CoalesceMap
// ---------------------------------------------------------------------------

pub struct CoalesceMap<K, V> {
    shards: [Mutex<HashMap<K, Arc<Slot<V>>>>; NUM_SHARDS],
    join_poll_interval: Duration,
    leader_count: AtomicU64,
    joined_count: AtomicU64,
    cancelled_join_count: AtomicU64,
    leader_failed_count: AtomicU64,
}

impl<K: Hash + Eq + Clone, V: Clone> CoalesceMap<K, V> {
    /// `join_poll_interval` bounds how long a joiner waits before checking
    /// its context again.
    #[must_use]
    pub fn new(join_poll_interval: Duration) -> Self {
        Self {
            shards: std::array::from_fn(|_| Mutex::new(HashMap::new())),
            join_poll_interval: join_poll_interval.max(Duration::from_millis(1)),
            leader_count: AtomicU64::new(0),
            joined_count: AtomicU64::new(0),
            cancelled_join_count: AtomicU64::new(0),
            leader_failed_count: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)] // modulo 16 fits in any pointer width
    fn shard_index(key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    fn remove_slot(&self, shard_idx: usize, key: &K, slot: &Arc<Slot<V>>) {
        let mut map = self.shards[shard_idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = map.get(key)
            && Arc::ptr_eq(existing, slot)
        {
            map.remove(key);
        }
    }

    /// Run `load` for `key`, or wait for the thread already running it.
    ///
    /// `load` receives the context it must honor: the caller's own. A joiner
    /// whose context is cancelled returns `Cancelled` without waiting for the
    /// leader to finish.
    #[allow(clippy::needless_pass_by_value)] // key is cloned into the map
    pub fn execute_or_join<F>(
        &self,
        key: K,
        context: &SearchContext,
        load: F,
    ) -> DiscoveryResult<CoalesceOutcome<V>>
    where
        F: FnOnce(&SearchContext) -> DiscoveryResult<V>,
    {
        enum Role<V> {
            Leader(Arc<Slot<V>>),
            Joiner(Arc<Slot<V>>),
        }

        let shard_idx = Self::shard_index(&key);
        loop {
            let role = {
                let mut map = self.shards[shard_idx]
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                #[allow(clippy::option_if_let_else)] // else branch mutates map
                if let Some(slot) = map.get(&key).map(Arc::clone) {
                    drop(map);
                    Role::Joiner(slot)
                } else {
                    let slot = Arc::new(Slot::new());
                    map.insert(key.clone(), Arc::clone(&slot));
                    drop(map);
                    Role::Leader(slot)
                }
            };

            match role {
                Role::Joiner(slot) => loop {
                    if let Err(err) = context.check("waiting for in-flight load") {
                        self.cancelled_join_count.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                    match slot.wait_slice(self.join_poll_interval) {
                        JoinPoll::Ready(v) => {
                            self.joined_count.fetch_add(1, Ordering::Relaxed);
                            return Ok(CoalesceOutcome::Joined(v));
                        }
                        JoinPoll::Failed(reason) => {
                            self.leader_failed_count.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(%reason, "in-flight load failed, registering again");
                            break;
                        }
                        JoinPoll::Pending => {}
                    }
                },
                Role::Leader(slot) => {
                    self.leader_count.fetch_add(1, Ordering::Relaxed);
                    let result =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| load(context)));
                    // The slot leaves the map before joiners wake, so a joiner
                    // retrying after a failure registers against a fresh slot.
                    self.remove_slot(shard_idx, &key, &slot);
                    match result {
                        Ok(result) => {
                            match &result {
                                Ok(v) => slot.complete_ok(v),
                                Err(e) => slot.complete_err(e.to_string()),
                            }
                            return result.map(CoalesceOutcome::Executed);
                        }
                        Err(payload) => {
                            slot.complete_err(panic_payload_message(payload.as_ref()));
                            std::panic::resume_unwind(payload);
                        }
                    }
                }
            }
        }
    }

    /// Number of loads currently in flight.
    #[must_use]
    pub fn inflight_count(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    #[must_use]
    pub fn metrics(&self) -> CoalesceMetrics {
        CoalesceMetrics {
            leader_count: self.leader_count.load(Ordering::Relaxed),
            joined_count: self.joined_count.load(Ordering::Relaxed),
            cancelled_join_count: self.cancelled_join_count.load(Ordering::Relaxed),
            leader_failed_count: self.leader_failed_count.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
