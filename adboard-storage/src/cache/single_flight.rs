//! Per-key coalescing of concurrent fills.
//!
//! The first caller for a key becomes the leader and installs a shared fill
//! future; everyone arriving while it is registered awaits the same future
//! and receives a clone of its output. The future is driven by whichever
//! waiter is polling, so the leader going away does not strand followers.
//!
//! An entry is removed as soon as its fill completes, or when the last
//! waiter stops waiting. In the second case the fill future is dropped
//! with the entry, abandoning the fetch.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};

type SharedFill<T> = Shared<BoxFuture<'static, T>>;

/// How a caller took part in a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// Started the fill.
    Leader,
    /// Joined a fill already in progress.
    Follower,
}

struct Flight<T: Clone> {
    id: u64,
    fill: SharedFill<T>,
    waiters: usize,
}

/// Registry of in-flight fills keyed by `K`.
pub struct SingleFlight<K, T: Clone> {
    flights: Mutex<HashMap<K, Flight<T>>>,
    next_id: AtomicU64,
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `make()` for `key` unless a fill for it is already in flight,
    /// in which case wait for that one instead.
    ///
    /// `make` is only invoked by the leader. Dropping the returned future
    /// withdraws this caller; the fill is abandoned once nobody waits on it.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> (T, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (fill, id, role) = self.join(&key, make);
        let waiter = Waiter {
            group: self,
            key,
            id,
        };
        let output = fill.await;
        waiter.finish();
        (output, role)
    }

    /// Number of keys with a fill in progress.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Flight<T>>> {
        // The map is only touched in short non-panicking sections.
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join<F, Fut>(&self, key: &K, make: F) -> (SharedFill<T>, u64, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut flights = self.lock();
        if let Some(flight) = flights.get_mut(key) {
            flight.waiters += 1;
            return (flight.fill.clone(), flight.id, FlightRole::Follower);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let fill = make().boxed().shared();
        flights.insert(
            key.clone(),
            Flight {
                id,
                fill: fill.clone(),
                waiters: 1,
            },
        );
        (fill, id, FlightRole::Leader)
    }

    fn complete(&self, key: &K, id: u64) {
        let mut flights = self.lock();
        if flights.get(key).is_some_and(|flight| flight.id == id) {
            flights.remove(key);
        }
    }

    fn leave(&self, key: &K, id: u64) {
        let mut flights = self.lock();
        let abandoned = match flights.get_mut(key) {
            Some(flight) if flight.id == id => {
                flight.waiters -= 1;
                flight.waiters == 0
            }
            _ => false,
        };
        if abandoned {
            flights.remove(key);
        }
    }
}

/// Withdraws its caller from a flight when dropped before completion.
struct Waiter<'a, K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    group: &'a SingleFlight<K, T>,
    key: K,
    id: u64,
}

impl<K, T> Waiter<'_, K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn finish(self) {
        self.group.complete(&self.key, self.id);
        // `leave` after `complete` is a no-op since the entry is gone.
    }
}

impl<K, T> Drop for Waiter<'_, K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.group.leave(&self.key, self.id);
    }
}
