//! Owned, sequenced collection state.
//!
//! Each remote collection (appointments, queries, chats) lives in a
//! [`Store`], whose only mutation path is [`Store::dispatch`]. Every fetch is
//! tagged with a monotonically increasing sequence number; a response is
//! applied only if no newer response (or successful mutation) has already
//! been applied, so overlapping polls cannot roll the collection back.

pub mod appointments;
pub mod queries;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::ClientResult;

pub use appointments::AppointmentStore;
pub use queries::QueryStore;

/// A record kept in a [`Store`].
pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    /// In-place change applied after a successful status update.
    type Patch: Clone + fmt::Debug + Send + Sync;

    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Key for newest-first ordering. `None` sorts last.
    fn recency(&self) -> Option<DateTime<Utc>>;

    fn is_pending(&self) -> bool;

    fn apply(&mut self, patch: &Self::Patch);
}

#[derive(Debug, Clone)]
pub enum Action<T: Record> {
    FetchStarted { seq: u64 },
    FetchSucceeded { seq: u64, items: Vec<T> },
    FetchFailed { seq: u64, message: String },
    /// The fetch future was dropped before it settled.
    FetchAbandoned { seq: u64 },
    Patched { barrier: u64, id: String, patch: T::Patch },
    Removed { barrier: u64, id: String },
    MutationFailed { message: String },
    ClearError,
}

#[derive(Debug, Clone)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_fetch: Option<DateTime<Utc>>,
    /// Set once the first fetch has completed, successfully or not.
    pub loaded_once: bool,
    in_flight: usize,
    applied_seq: u64,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
            last_fetch: None,
            loaded_once: false,
            in_flight: 0,
            applied_seq: 0,
        }
    }
}

impl<T: Record> CollectionState<T> {
    /// Applies one action. Returns `false` when the action was a no-op
    /// (stale response, unknown id).
    pub fn reduce(&mut self, action: Action<T>) -> bool {
        match action {
            Action::FetchStarted { seq } => {
                debug!(kind = T::KIND, seq, "fetch started");
                self.in_flight += 1;
                self.loading = true;
                self.error = None;
                true
            }
            Action::FetchSucceeded { seq, items } => {
                self.finish_request();
                if seq <= self.applied_seq {
                    debug!(
                        kind = T::KIND,
                        seq,
                        applied = self.applied_seq,
                        "discarding stale fetch response"
                    );
                    return false;
                }
                self.items = items;
                self.applied_seq = seq;
                self.error = None;
                self.last_fetch = Some(Utc::now());
                true
            }
            Action::FetchFailed { seq, message } => {
                self.finish_request();
                if seq <= self.applied_seq {
                    debug!(kind = T::KIND, seq, "discarding stale fetch failure");
                    return false;
                }
                self.error = Some(message);
                true
            }
            Action::FetchAbandoned { seq } => {
                debug!(kind = T::KIND, seq, "fetch abandoned");
                self.in_flight = self.in_flight.saturating_sub(1);
                self.loading = self.in_flight > 0;
                true
            }
            Action::Patched { barrier, id, patch } => {
                self.raise_barrier(barrier);
                match self.items.iter_mut().find(|r| r.id() == id) {
                    Some(record) => {
                        record.apply(&patch);
                        true
                    }
                    None => {
                        debug!(kind = T::KIND, id = %id, "patched record not in local collection");
                        false
                    }
                }
            }
            Action::Removed { barrier, id } => {
                self.raise_barrier(barrier);
                let before = self.items.len();
                self.items.retain(|r| r.id() != id);
                self.items.len() != before
            }
            Action::MutationFailed { message } => {
                self.error = Some(message);
                true
            }
            Action::ClearError => self.error.take().is_some(),
        }
    }

    pub fn is_initial_load(&self) -> bool {
        self.loading && !self.loaded_once
    }

    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter(|r| r.is_pending())
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.pending().map(|r| r.id().to_string()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    /// Copy of the collection ordered newest first.
    pub fn newest_first(&self) -> Vec<T> {
        let mut items = self.items.clone();
        sort_newest_first(&mut items);
        items
    }

    fn finish_request(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0;
        self.loaded_once = true;
    }

    fn raise_barrier(&mut self, barrier: u64) {
        self.applied_seq = self.applied_seq.max(barrier);
    }
}

/// Stable newest-first ordering; equal keys keep their server order.
pub fn sort_newest_first<T: Record>(items: &mut [T]) {
    items.sort_by(|a, b| b.recency().cmp(&a.recency()));
}

pub struct Store<T: Record> {
    state: RwLock<CollectionState<T>>,
    issued: AtomicU64,
}

impl<T: Record> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Store<T> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CollectionState::default()),
            issued: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Highest sequence number issued so far.
    pub fn barrier(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub async fn dispatch(&self, action: Action<T>) -> bool {
        self.state.write().await.reduce(action)
    }

    pub async fn snapshot(&self) -> CollectionState<T> {
        self.state.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&CollectionState<T>) -> R) -> R {
        f(&*self.state.read().await)
    }

    /// Runs one sequenced fetch. The lock is not held while `fetch` awaits.
    pub async fn fetch_with<F, Fut>(&self, fetch: F) -> ClientResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<Vec<T>>>,
    {
        let seq = self.next_seq();
        self.dispatch(Action::FetchStarted { seq }).await;
        let mut guard = InFlight {
            store: self,
            seq,
            settled: false,
        };

        let result = match fetch().await {
            Ok(items) => {
                let count = items.len();
                if self.dispatch(Action::FetchSucceeded { seq, items }).await {
                    info!(kind = T::KIND, seq, count, "collection refreshed");
                }
                Ok(())
            }
            Err(e) => {
                warn!(kind = T::KIND, seq, "fetch failed: {e}");
                self.dispatch(Action::FetchFailed {
                    seq,
                    message: e.to_string(),
                })
                .await;
                Err(e)
            }
        };
        guard.settled = true;
        result
    }

    /// Patches the local record once the server has accepted a change.
    pub async fn patched(&self, id: &str, patch: T::Patch) -> bool {
        let barrier = self.barrier();
        self.dispatch(Action::Patched {
            barrier,
            id: id.to_string(),
            patch,
        })
        .await
    }

    pub async fn removed(&self, id: &str) -> bool {
        let barrier = self.barrier();
        self.dispatch(Action::Removed {
            barrier,
            id: id.to_string(),
        })
        .await
    }

    pub async fn mutation_failed(&self, message: String) {
        self.dispatch(Action::MutationFailed { message }).await;
    }

    pub async fn clear_error(&self) {
        self.dispatch(Action::ClearError).await;
    }
}

/// Releases the in-flight slot of a fetch whose future is dropped before it
/// settles, e.g. when polling shuts down mid-request.
struct InFlight<'a, T: Record> {
    store: &'a Store<T>,
    seq: u64,
    settled: bool,
}

impl<T: Record> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.store.state.try_write() {
            Ok(mut state) => {
                state.reduce(Action::FetchAbandoned { seq: self.seq });
            }
            Err(_) => warn!(
                kind = T::KIND,
                seq = self.seq,
                "state busy while abandoning fetch; loading flag may stay set"
            ),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{appointment, ts};
    use super::*;
    use crate::error::ClientError;
    use crate::models::{Appointment, AppointmentStatus};
    use crate::store::appointments::AppointmentPatch;

    fn completed(amount: f64) -> AppointmentPatch {
        AppointmentPatch {
            status: AppointmentStatus::Completed,
            amount: Some(amount),
        }
    }

    #[test]
    fn fetch_replaces_collection_exactly() {
        let mut state = CollectionState::<Appointment>::default();
        state.reduce(Action::FetchStarted { seq: 1 });
        assert!(state.loading);
        assert!(state.is_initial_load());

        let first = vec![appointment("a", None), appointment("a", None)];
        assert!(state.reduce(Action::FetchSucceeded {
            seq: 1,
            items: first.clone()
        }));
        assert_eq!(state.items, first);
        assert!(!state.loading);
        assert!(state.last_fetch.is_some());

        state.reduce(Action::FetchStarted { seq: 2 });
        let second = vec![appointment("b", None)];
        state.reduce(Action::FetchSucceeded {
            seq: 2,
            items: second.clone(),
        });
        assert_eq!(state.items, second);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut state = CollectionState::<Appointment>::default();
        state.reduce(Action::FetchStarted { seq: 1 });
        state.reduce(Action::FetchStarted { seq: 2 });

        state.reduce(Action::FetchSucceeded {
            seq: 2,
            items: vec![appointment("new", None)],
        });
        assert!(state.loading, "request 1 still in flight");

        let applied = state.reduce(Action::FetchSucceeded {
            seq: 1,
            items: vec![appointment("old", None)],
        });
        assert!(!applied);
        assert_eq!(state.items[0].id, "new");
        assert!(!state.loading);
    }

    #[test]
    fn failure_keeps_previous_collection() {
        let mut state = CollectionState::<Appointment>::default();
        state.reduce(Action::FetchStarted { seq: 1 });
        state.reduce(Action::FetchSucceeded {
            seq: 1,
            items: vec![appointment("a", None)],
        });

        state.reduce(Action::FetchStarted { seq: 2 });
        state.reduce(Action::FetchFailed {
            seq: 2,
            message: ClientError::Http(500).to_string(),
        });
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.error.as_deref(), Some("HTTP error! status: 500"));

        state.reduce(Action::FetchStarted { seq: 3 });
        assert!(state.error.is_none(), "a new fetch clears the error");
    }

    #[test]
    fn patch_touches_only_the_matching_record() {
        let mut state = CollectionState::<Appointment>::default();
        let mut other = appointment("Y", None);
        other.amount = Some(1500.0);
        let items = vec![appointment("X", None), other.clone(), appointment("Z", None)];
        state.reduce(Action::FetchSucceeded { seq: 1, items });

        assert!(state.reduce(Action::Patched {
            barrier: 1,
            id: "X".into(),
            patch: completed(5000.0),
        }));

        let x = state.find("X").unwrap();
        assert_eq!(x.status, AppointmentStatus::Completed);
        assert_eq!(x.amount, Some(5000.0));
        assert_eq!(state.items[1], other);
        assert_eq!(state.items[2], appointment("Z", None));
    }

    #[test]
    fn patch_of_unknown_id_is_a_no_op() {
        let mut state = CollectionState::<Appointment>::default();
        state.reduce(Action::FetchSucceeded {
            seq: 1,
            items: vec![appointment("X", None)],
        });
        let before = state.items.clone();
        assert!(!state.reduce(Action::Patched {
            barrier: 1,
            id: "missing".into(),
            patch: completed(1.0),
        }));
        assert_eq!(state.items, before);
    }

    #[test]
    fn fetch_issued_before_mutation_cannot_revert_it() {
        let mut state = CollectionState::<Appointment>::default();
        state.reduce(Action::FetchStarted { seq: 1 });
        state.reduce(Action::FetchSucceeded {
            seq: 1,
            items: vec![appointment("X", None)],
        });

        // poll 2 goes out, then the admin's update lands first
        state.reduce(Action::FetchStarted { seq: 2 });
        state.reduce(Action::Patched {
            barrier: 2,
            id: "X".into(),
            patch: completed(5000.0),
        });
        let applied = state.reduce(Action::FetchSucceeded {
            seq: 2,
            items: vec![appointment("X", None)],
        });

        assert!(!applied);
        assert_eq!(state.items[0].status, AppointmentStatus::Completed);
    }

    #[test]
    fn remove_drops_matching_records() {
        let mut state = CollectionState::<Appointment>::default();
        state.reduce(Action::FetchSucceeded {
            seq: 1,
            items: vec![appointment("a", None), appointment("b", None)],
        });
        assert!(state.reduce(Action::Removed {
            barrier: 1,
            id: "a".into()
        }));
        assert_eq!(state.items.len(), 1);
        assert!(!state.reduce(Action::Removed {
            barrier: 1,
            id: "a".into()
        }));
    }

    #[test]
    fn newest_first_is_stable_for_equal_keys() {
        let mut items = vec![
            appointment("old", Some("2025-08-01T10:00:00Z")),
            appointment("tie-1", Some("2025-08-05T10:00:00Z")),
            appointment("none", None),
            appointment("tie-2", Some("2025-08-05T10:00:00Z")),
            appointment("newest", Some("2025-08-09T10:00:00Z")),
        ];
        // no createdAt and an unparsable date: sorts last
        items[2].date = String::new();

        sort_newest_first(&mut items);
        let ids: Vec<&str> = items.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["newest", "tie-1", "tie-2", "old", "none"]);
    }

    #[test]
    fn newest_first_uses_visit_date_fallback() {
        let mut items = vec![
            appointment("created", Some("2025-08-01T10:00:00Z")),
            appointment("dated", None),
        ];
        items[1].date = "2025-08-03".into();
        sort_newest_first(&mut items);
        assert_eq!(items[0].id, "dated");
        assert_eq!(items[0].recency(), Some(ts("2025-08-03T00:00:00Z")));
    }

    #[tokio::test]
    async fn store_fetch_records_error_string() {
        let store: Store<Appointment> = Store::new();
        let res = store
            .fetch_with(|| async { Err(ClientError::Http(503)) })
            .await;
        assert!(res.is_err());

        let snap = store.snapshot().await;
        assert!(snap.items.is_empty());
        assert_eq!(snap.error.as_deref(), Some("HTTP error! status: 503"));
        assert!(snap.loaded_once);
        assert!(!snap.loading);

        store.clear_error().await;
        assert!(store.snapshot().await.error.is_none());
    }

    #[test]
    fn abandoned_fetch_releases_loading_only() {
        let mut state = CollectionState::<Appointment>::default();
        state.reduce(Action::FetchStarted { seq: 1 });
        state.reduce(Action::FetchSucceeded {
            seq: 1,
            items: vec![appointment("a", None)],
        });

        state.reduce(Action::FetchStarted { seq: 2 });
        state.reduce(Action::FetchStarted { seq: 3 });
        state.reduce(Action::FetchAbandoned { seq: 2 });
        assert!(state.loading, "request 3 still in flight");
        state.reduce(Action::FetchAbandoned { seq: 3 });
        assert!(!state.loading);
        assert_eq!(state.items.len(), 1);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn dropped_fetch_does_not_leave_store_loading() {
        let store: Store<Appointment> = Store::new();
        store
            .fetch_with(|| async { Ok(vec![appointment("a", None)]) })
            .await
            .unwrap();

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            store.fetch_with(std::future::pending::<ClientResult<Vec<Appointment>>>),
        )
        .await;
        assert!(timed_out.is_err());

        let snap = store.snapshot().await;
        assert!(!snap.loading);
        assert_eq!(snap.items.len(), 1);
        assert!(snap.error.is_none());

        store
            .fetch_with(|| async { Ok(vec![appointment("b", None)]) })
            .await
            .unwrap();
        assert_eq!(store.snapshot().await.items[0].id, "b");
    }
}
