//! Composition root for the console: one store per collection, the seen-set
//! and the poll loops that keep the stores fresh.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use crate::api::ClinicApi;
use crate::chat::ChatStore;
use crate::error::ClientResult;
use crate::notifications::{Badge, CollectionKind, Notification, SeenTracker, unseen_notifications};
use crate::poll::Poller;
use crate::stats::ProgressStats;
use crate::storage::LocalStorage;
use crate::store::{AppointmentStore, QueryStore};

pub struct Dashboard {
    pub appointments: Arc<AppointmentStore>,
    pub queries: Arc<QueryStore>,
    pub chats: Arc<ChatStore>,
    seen: Mutex<SeenTracker>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn ClinicApi>, storage: LocalStorage) -> ClientResult<Self> {
        Ok(Self {
            appointments: Arc::new(AppointmentStore::new(api.clone())),
            queries: Arc::new(QueryStore::new(api.clone())),
            chats: Arc::new(ChatStore::new(api)),
            seen: Mutex::new(SeenTracker::load(storage)?),
        })
    }

    /// Fetches all three collections concurrently. Each store records its own
    /// failure; the first error is returned.
    pub async fn refresh_all(&self) -> ClientResult<()> {
        let (a, q, c) = tokio::join!(
            self.appointments.fetch_all(),
            self.queries.fetch_all(),
            self.chats.fetch_all(),
        );
        a.and(q).and(c)
    }

    /// One independent loop per collection.
    pub fn start_polling(&self, period: Duration) -> Poller {
        let mut poller = Poller::new(period);

        let appointments = self.appointments.clone();
        poller.spawn("appointments", move || {
            let store = appointments.clone();
            async move { store.fetch_all().await }
        });

        let queries = self.queries.clone();
        poller.spawn("queries", move || {
            let store = queries.clone();
            async move { store.fetch_all().await }
        });

        let chats = self.chats.clone();
        poller.spawn("chats", move || {
            let store = chats.clone();
            async move { store.fetch_all().await }
        });

        poller
    }

    async fn pending_ids(&self, kind: CollectionKind) -> Vec<String> {
        match kind {
            CollectionKind::Appointments => self.appointments.pending_ids().await,
            CollectionKind::Queries => self.queries.pending_ids().await,
            CollectionKind::Chats => self.chats.pending_ids().await,
        }
    }

    pub async fn badge(&self) -> Badge {
        let (a, q, c) = tokio::join!(
            self.pending_ids(CollectionKind::Appointments),
            self.pending_ids(CollectionKind::Queries),
            self.pending_ids(CollectionKind::Chats),
        );
        self.seen.lock().await.seen().badge(&a, &q, &c)
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        let appointments = self.appointments.snapshot().await;
        let queries = self.queries.snapshot().await;
        let chats = self.chats.snapshot().await;
        let seen = self.seen.lock().await;
        unseen_notifications(seen.seen(), &appointments.items, &queries.items, &chats.items)
    }

    pub async fn mark_seen(&self, kind: CollectionKind, id: &str) -> ClientResult<bool> {
        self.seen.lock().await.mark_seen(kind, id)
    }

    /// Marks every currently pending record of `kind` as seen.
    pub async fn mark_all_seen(&self, kind: CollectionKind) -> ClientResult<usize> {
        let ids = self.pending_ids(kind).await;
        self.seen.lock().await.mark_all_seen(kind, ids)
    }

    pub async fn mark_everything_seen(&self) -> ClientResult<usize> {
        let mut total = 0;
        for kind in CollectionKind::ALL {
            match self.mark_all_seen(kind).await {
                Ok(n) => total += n,
                Err(e) => {
                    warn!(%kind, "could not persist seen ids: {e}");
                    return Err(e);
                }
            }
        }
        Ok(total)
    }

    pub async fn stats(&self) -> ProgressStats {
        ProgressStats::of(&self.appointments.snapshot().await.items)
    }
}
