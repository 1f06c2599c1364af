//! Mutation Coordinator
//!
//! Serializes set/remove/clear against one store file and batches queued
//! mutations into as few rewrite passes as possible.
//!
//! ## Concurrency Model
//!
//! - Two lanes, one per mutation kind, each a FIFO of pending entries plus a
//!   "driver active" bit. The first caller to find its lane without a driver
//!   becomes the driver; everyone else queues and returns.
//! - One `in_flight` slot shared by both lanes and `clear`. At most one pass
//!   holds it, so at most one rewrite has the file open at any instant.
//! - A driver drains its whole lane in one `mem::take` and keeps draining
//!   until the lane is empty. Entries queued during a pass land in the next.
//! - Readers wait until the coordinator is quiescent (nothing in flight, no
//!   active driver) and open their file handle under the lock.
//! - Waiting is a `Condvar` wait-list notified whenever a pass ends.
//!
//! ```text
//!   set(k1) ──► lane.sets  [k1]      driver ─► wait in_flight ─► drain ─► pass
//!   set(k2) ──► lane.sets  [k1,k2]   queued, returns
//!   del(k3) ──► lane.removes [k3]    driver ─► wait in_flight ─► drain ─► pass
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::Result;

/// Which kind of pass currently owns the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Set,
    Remove,
    Clear,
}

/// How a mutation call was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// This call drove the pass(es) that applied its entry
    Driven,
    /// Another caller was already driving this lane; the entry will be
    /// applied by that caller before it releases the lane
    Queued,
}

/// One mutation queue
struct Lane<T> {
    pending: Vec<T>,
    driving: bool,
}

impl<T> Default for Lane<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            driving: false,
        }
    }
}

struct CoordinatorState<K, V> {
    sets: Lane<(K, V)>,
    removes: Lane<K>,
    in_flight: Option<PassKind>,
}

impl<K, V> CoordinatorState<K, V> {
    fn set_lane(&mut self) -> &mut Lane<(K, V)> {
        &mut self.sets
    }

    fn remove_lane(&mut self) -> &mut Lane<K> {
        &mut self.removes
    }

    fn is_quiescent(&self) -> bool {
        self.in_flight.is_none() && !self.sets.driving && !self.removes.driving
    }
}

/// Per-store coordinator; owned by the store handle
pub struct MutationCoordinator<K, V> {
    state: Mutex<CoordinatorState<K, V>>,

    /// Notified whenever `in_flight` clears or a driver releases its lane
    idle: Condvar,

    /// Completed (or failed) rewrite passes, for diagnostics
    passes: AtomicU64,
}

impl<K, V> Default for MutationCoordinator<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MutationCoordinator<K, V> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoordinatorState {
                sets: Lane::default(),
                removes: Lane::default(),
                in_flight: None,
            }),
            idle: Condvar::new(),
            passes: AtomicU64::new(0),
        }
    }

    /// Queue a set and, if no set driver is active, drive set passes
    ///
    /// `apply` receives each drained batch in enqueue order and must run one
    /// rewrite pass for it.
    pub fn set<A>(&self, key: K, value: V, apply: A) -> Result<Submission>
    where
        A: FnMut(Vec<(K, V)>) -> Result<()>,
    {
        self.submit(PassKind::Set, (key, value), CoordinatorState::set_lane, apply)
    }

    /// Queue a removal and, if no remove driver is active, drive remove passes
    pub fn remove<A>(&self, key: K, apply: A) -> Result<Submission>
    where
        A: FnMut(Vec<K>) -> Result<()>,
    {
        self.submit(PassKind::Remove, key, CoordinatorState::remove_lane, apply)
    }

    /// Run `apply` with exclusive ownership of the file, bypassing the lanes
    pub fn clear<A>(&self, apply: A) -> Result<()>
    where
        A: FnOnce() -> Result<()>,
    {
        let mut state = self.state.lock();
        while state.in_flight.is_some() {
            self.idle.wait(&mut state);
        }

        state.in_flight = Some(PassKind::Clear);
        let result = MutexGuard::unlocked(&mut state, || {
            let release = UnwindRelease::new(self, PassKind::Clear);
            let result = apply();
            release.disarm();
            result
        });
        state.in_flight = None;
        self.idle.notify_all();

        result
    }

    /// Wait until no mutation is pending or running, then call `open`
    ///
    /// `open` runs under the coordinator lock, so no pass can start between
    /// the idle check and the moment the caller's file handle exists. Keep it
    /// short: open the file, do not scan it.
    pub fn read<T, F>(&self, open: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut state = self.state.lock();
        while !state.is_quiescent() {
            self.idle.wait(&mut state);
        }
        open()
    }

    /// True if nothing is queued, driving, or in flight
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.is_quiescent() && state.sets.pending.is_empty() && state.removes.pending.is_empty()
    }

    /// Kind of pass currently holding the file, if any
    pub fn in_flight(&self) -> Option<PassKind> {
        self.state.lock().in_flight
    }

    /// Number of queued (not yet drained) sets
    pub fn pending_sets(&self) -> usize {
        self.state.lock().sets.pending.len()
    }

    /// Number of queued (not yet drained) removals
    pub fn pending_removes(&self) -> usize {
        self.state.lock().removes.pending.len()
    }

    /// Rewrite passes run so far (set and remove; clear is not a pass)
    pub fn rewrite_passes(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Shared driver loop for both lanes
    fn submit<T, L, A>(&self, kind: PassKind, entry: T, lane_of: L, mut apply: A) -> Result<Submission>
    where
        L: Fn(&mut CoordinatorState<K, V>) -> &mut Lane<T>,
        A: FnMut(Vec<T>) -> Result<()>,
    {
        let mut state = self.state.lock();
        {
            let lane = lane_of(&mut *state);
            lane.pending.push(entry);
            if lane.driving {
                return Ok(Submission::Queued);
            }
            lane.driving = true;
        }

        // The first pass always carries this caller's own entry
        let mut outcome: Option<Result<()>> = None;

        loop {
            while state.in_flight.is_some() {
                self.idle.wait(&mut state);
            }

            let batch = std::mem::take(&mut lane_of(&mut *state).pending);
            if batch.is_empty() {
                break;
            }

            let batch_len = batch.len();
            state.in_flight = Some(kind);
            tracing::debug!(?kind, batch_len, "rewrite pass starting");

            let result = MutexGuard::unlocked(&mut state, || {
                let release = UnwindRelease::new(self, kind);
                let result = apply(batch);
                release.disarm();
                result
            });

            state.in_flight = None;
            self.passes.fetch_add(1, Ordering::SeqCst);
            self.idle.notify_all();

            match outcome {
                None => outcome = Some(result),
                Some(_) => {
                    // Submitters of this batch already returned; surface it here
                    if let Err(e) = result {
                        tracing::error!(?kind, batch_len, error = %e, "queued mutations were not applied");
                    }
                }
            }
        }

        lane_of(&mut *state).driving = false;
        self.idle.notify_all();

        outcome.unwrap_or(Ok(())).map(|()| Submission::Driven)
    }
}

/// Frees the file (and the driving lane) if a pass unwinds
///
/// Created inside the unlocked section, so its drop can take the lock.
struct UnwindRelease<'a, K, V> {
    coordinator: &'a MutationCoordinator<K, V>,
    kind: PassKind,
    armed: bool,
}

impl<'a, K, V> UnwindRelease<'a, K, V> {
    fn new(coordinator: &'a MutationCoordinator<K, V>, kind: PassKind) -> Self {
        Self {
            coordinator,
            kind,
            armed: true,
        }
    }

    /// The pass returned normally; the caller releases under its own lock
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<K, V> Drop for UnwindRelease<'_, K, V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut state = self.coordinator.state.lock();
        state.in_flight = None;
        match self.kind {
            PassKind::Set => state.sets.driving = false,
            PassKind::Remove => state.removes.driving = false,
            PassKind::Clear => {}
        }
        self.coordinator.idle.notify_all();

        tracing::error!(kind = ?self.kind, "rewrite pass panicked; file released");
    }
}
