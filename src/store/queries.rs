use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::ClinicApi;
use crate::error::ClientResult;
use crate::models::{Query, QueryStatus};
use crate::store::{CollectionState, Record, Store};

impl Record for Query {
    type Patch = QueryStatus;

    const KIND: &'static str = "queries";

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    fn apply(&mut self, status: &QueryStatus) {
        self.status = *status;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCounts {
    pub pending: usize,
    pub answered: usize,
    pub closed: usize,
}

impl QueryCounts {
    pub fn of(items: &[Query]) -> Self {
        items.iter().fold(Self::default(), |mut acc, q| {
            match q.status {
                QueryStatus::Pending => acc.pending += 1,
                QueryStatus::Answered => acc.answered += 1,
                QueryStatus::Closed => acc.closed += 1,
            }
            acc
        })
    }
}

pub struct QueryStore {
    api: Arc<dyn ClinicApi>,
    store: Store<Query>,
}

impl QueryStore {
    pub fn new(api: Arc<dyn ClinicApi>) -> Self {
        Self {
            api,
            store: Store::new(),
        }
    }

    pub async fn fetch_all(&self) -> ClientResult<()> {
        let api = self.api.clone();
        self.store
            .fetch_with(|| async move { api.list_queries().await })
            .await
    }

    pub async fn update_status(&self, id: &str, status: QueryStatus) -> ClientResult<()> {
        match self.api.update_query_status(id, status).await {
            Ok(_) => {
                info!(id, %status, "query status updated");
                self.store.patched(id, status).await;
                Ok(())
            }
            Err(e) => {
                warn!(id, "query status update failed: {e}");
                self.store
                    .mutation_failed(format!("Failed to update query status: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        match self.api.delete_query(id).await {
            Ok(()) => {
                info!(id, "query deleted");
                self.store.removed(id).await;
                Ok(())
            }
            Err(e) => {
                warn!(id, "query delete failed: {e}");
                self.store
                    .mutation_failed(format!("Failed to delete query: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn clear_error(&self) {
        self.store.clear_error().await;
    }

    pub async fn snapshot(&self) -> CollectionState<Query> {
        self.store.snapshot().await
    }

    pub async fn pending_ids(&self) -> Vec<String> {
        self.store.read(|s| s.pending_ids()).await
    }

    pub async fn find(&self, id: &str) -> Option<Query> {
        self.store.read(|s| s.find(id).cloned()).await
    }

    pub async fn counts(&self) -> QueryCounts {
        self.store.read(|s| QueryCounts::of(&s.items)).await
    }
}
