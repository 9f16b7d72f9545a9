//! Per-key single-flight guard.
//!
//! The first caller for a key becomes the leader and computes; later
//! callers subscribe to a `watch` channel and receive the leader's result.
//! The guard is released exactly once: by [`FlightGuard::complete`], or on
//! drop, in which case waiters see [`Landing::Abandoned`] and may take over.

use std::hash::Hash;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use explore_core::errors::ExploreResult;
use tokio::sync::watch;

/// How a flight ended, as seen by a follower.
#[derive(Debug, Clone, PartialEq)]
pub enum Landing<T> {
    /// The leader's result, success or failure.
    Published(ExploreResult<T>),
    /// The leader went away without a result. The key is free again.
    Abandoned,
}

type Slot<T> = Option<Landing<T>>;

pub struct SingleFlight<K, T>
where
    K: Hash + Eq + Clone,
{
    flights: DashMap<K, watch::Sender<Slot<T>>>,
}

/// Role of a caller joining a flight.
pub enum Flight<'a, K, T>
where
    K: Hash + Eq + Clone,
{
    Leader(FlightGuard<'a, K, T>),
    Follower(watch::Receiver<Slot<T>>),
}

/// Held by the leader until it publishes a result.
pub struct FlightGuard<'a, K, T>
where
    K: Hash + Eq + Clone,
{
    owner: &'a SingleFlight<K, T>,
    key: K,
    done: bool,
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self {
            flights: DashMap::new(),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Become the leader for `key`, or subscribe to the running flight.
    pub fn join(&self, key: &K) -> Flight<'_, K, T> {
        match self.flights.entry(key.clone()) {
            Entry::Occupied(running) => Flight::Follower(running.get().subscribe()),
            Entry::Vacant(slot) => {
                let (tx, _) = watch::channel(None);
                slot.insert(tx);
                Flight::Leader(FlightGuard {
                    owner: self,
                    key: key.clone(),
                    done: false,
                })
            }
        }
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    fn release(&self, key: &K, result: ExploreResult<T>) {
        if let Some((_, tx)) = self.flights.remove(key) {
            tx.send_replace(Some(Landing::Published(result)));
        }
    }
}

/// Wait for the flight to land.
pub async fn wait_for_leader<T: Clone>(mut rx: watch::Receiver<Slot<T>>) -> Landing<T> {
    match rx.wait_for(Option::is_some).await {
        Ok(slot) => slot.as_ref().cloned().unwrap_or(Landing::Abandoned),
        Err(_) => Landing::Abandoned,
    }
}

impl<K, T> FlightGuard<'_, K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    /// Publish the result to every waiter and release the key.
    pub fn complete(mut self, result: ExploreResult<T>) {
        self.done = true;
        self.owner.release(&self.key, result);
    }
}

impl<K, T> Drop for FlightGuard<'_, K, T>
where
    K: Hash + Eq + Clone,
{
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some((_, tx)) = self.owner.flights.remove(&self.key) {
            tx.send_replace(Some(Landing::Abandoned));
        }
    }
}

#[cfg(test)]
mod tests {
    use explore_core::errors::ExploreError;

    use super::*;

    #[tokio::test]
    async fn follower_receives_leader_result() {
        let flights: SingleFlight<String, u32> = SingleFlight::new();
        let key = "k".to_string();
        let Flight::Leader(guard) = flights.join(&key) else {
            panic!("first caller must lead");
        };
        let Flight::Follower(rx) = flights.join(&key) else {
            panic!("second caller must follow");
        };
        assert_eq!(flights.in_flight(), 1);
        guard.complete(Ok(7));
        assert_eq!(wait_for_leader(rx).await, Landing::Published(Ok(7)));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn dropped_leader_abandons_the_flight() {
        let flights: SingleFlight<String, u32> = SingleFlight::new();
        let key = "k".to_string();
        let leader = flights.join(&key);
        let Flight::Follower(rx) = flights.join(&key) else {
            panic!("second caller must follow");
        };
        drop(leader);
        assert_eq!(wait_for_leader(rx).await, Landing::Abandoned);
        assert!(matches!(flights.join(&key), Flight::Leader(_)));
    }

    #[tokio::test]
    async fn failures_are_shared() {
        let flights: SingleFlight<String, u32> = SingleFlight::new();
        let key = "k".to_string();
        let Flight::Leader(guard) = flights.join(&key) else {
            panic!("first caller must lead");
        };
        let Flight::Follower(rx) = flights.join(&key) else {
            panic!("second caller must follow");
        };
        guard.complete(Err(ExploreError::invalid("bad")));
        assert!(matches!(
            wait_for_leader(rx).await,
            Landing::Published(Err(ExploreError::InvalidArgument { .. }))
        ));
    }
}
