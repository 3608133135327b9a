//! Query Correlator
//!
//! Pairs outgoing requests with their eventual reply or error. Ids start
//! at 1 and only grow; id 0 is reserved for push notifications that are
//! not answers to any request.

use std::collections::HashMap;

use tracing::{debug, trace};

/// Request id carried by push notifications
pub const PUSH_ID: u64 = 0;

/// Completion invoked exactly once with the outcome of a request
pub type Completion<C, T, E> = Box<dyn FnOnce(&mut C, Result<T, E>)>;

pub struct QueryCorrelator<C, T, E> {
    next_id: u64,
    pending: HashMap<u64, Completion<C, T, E>>,
}

impl<C, T, E> Default for QueryCorrelator<C, T, E> {
    fn default() -> Self {
        Self {
            next_id: PUSH_ID + 1,
            pending: HashMap::new(),
        }
    }
}

impl<C, T, E> QueryCorrelator<C, T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a completion under a fresh id
    pub fn register(&mut self, completion: impl FnOnce(&mut C, Result<T, E>) + 'static) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, Box::new(completion));
        trace!(id, pending = self.pending.len(), "query registered");
        id
    }

    /// Remove the completion for `id`, if it is still pending
    pub fn take(&mut self, id: u64) -> Option<Completion<C, T, E>> {
        self.pending.remove(&id)
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending completion without invoking it
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Remove and return every pending completion, oldest first
    pub fn drain(&mut self) -> Vec<(u64, Completion<C, T, E>)> {
        let mut all: Vec<_> = self.pending.drain().collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }
}

/// Contexts that own a correlator
pub trait Correlated: Sized {
    type Reply;
    type Error;

    fn correlator(&mut self) -> &mut QueryCorrelator<Self, Self::Reply, Self::Error>;
}

/// Deliver an outcome to the completion registered under `id`.
///
/// Unknown ids, including ids already resolved, are ignored and reported
/// as `false`.
pub fn resolve<C: Correlated>(ctx: &mut C, id: u64, outcome: Result<C::Reply, C::Error>) -> bool {
    match ctx.correlator().take(id) {
        Some(completion) => {
            completion(ctx, outcome);
            true
        }
        None => {
            debug!(id, "reply for unknown query ignored");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        queries: QueryCorrelator<Log, u32, String>,
        seen: Vec<(u64, Result<u32, String>)>,
    }

    impl Correlated for Log {
        type Reply = u32;
        type Error = String;

        fn correlator(&mut self) -> &mut QueryCorrelator<Self, u32, String> {
            &mut self.queries
        }
    }

    fn record(id_hint: u64) -> impl FnOnce(&mut Log, Result<u32, String>) {
        move |log, outcome| log.seen.push((id_hint, outcome))
    }

    #[test]
    fn test_ids_increase_from_one() {
        let mut log = Log::default();
        let a = log.queries.register(record(1));
        let b = log.queries.register(record(2));
        let c = log.queries.register(record(3));
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(log.queries.pending(), 3);
    }

    #[test]
    fn test_error_reaches_only_its_completion() {
        let mut log = Log::default();
        let a = log.queries.register(record(1));
        let b = log.queries.register(record(2));

        assert!(resolve(&mut log, b, Err("boom".to_string())));
        assert_eq!(log.seen, vec![(2, Err("boom".to_string()))]);
        assert!(log.queries.is_pending(a));

        assert!(resolve(&mut log, a, Ok(7)));
        assert_eq!(log.seen[1], (1, Ok(7)));
    }

    #[test]
    fn test_unknown_and_repeated_ids_are_ignored() {
        let mut log = Log::default();
        let a = log.queries.register(record(1));
        assert!(!resolve(&mut log, 99, Ok(1)));
        assert!(!resolve(&mut log, PUSH_ID, Ok(1)));
        assert!(resolve(&mut log, a, Ok(1)));
        assert!(!resolve(&mut log, a, Ok(2)));
        assert_eq!(log.seen.len(), 1);
    }

    #[test]
    fn test_drain_is_ordered() {
        let mut log = Log::default();
        for i in 0..5 {
            log.queries.register(record(i));
        }
        let ids: Vec<u64> = log.queries.drain().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(log.queries.pending(), 0);
    }
}
