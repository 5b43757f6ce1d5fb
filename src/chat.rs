//! Live-chat contact records.
//!
//! The backend knows a chat as `pending` or `closed`; the admin sees `closed`
//! as `completed`. Mapping happens here and nowhere else.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::ClinicApi;
use crate::error::ClientResult;
use crate::models::{ChatDisplayStatus, ChatQuery, ChatStatus};
use crate::store::{CollectionState, Record, Store};

impl Record for ChatQuery {
    type Patch = ChatStatus;

    const KIND: &'static str = "chats";

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn is_pending(&self) -> bool {
        self.status == ChatStatus::Pending
    }

    fn apply(&mut self, status: &ChatStatus) {
        self.status = *status;
    }
}

pub struct ChatStore {
    api: Arc<dyn ClinicApi>,
    store: Store<ChatQuery>,
}

impl ChatStore {
    pub fn new(api: Arc<dyn ClinicApi>) -> Self {
        Self {
            api,
            store: Store::new(),
        }
    }

    pub async fn fetch_all(&self) -> ClientResult<()> {
        let api = self.api.clone();
        self.store
            .fetch_with(|| async move { api.list_chats().await })
            .await
    }

    /// Sends the wire form of `status` and returns the status the server
    /// settled on, in display form.
    pub async fn update_status(
        &self,
        id: &str,
        status: ChatDisplayStatus,
    ) -> ClientResult<ChatDisplayStatus> {
        let wire: ChatStatus = status.into();
        match self.api.update_chat_status(id, wire).await {
            Ok(updated) => {
                info!(id, %wire, "chat status updated");
                self.store.patched(id, updated.status).await;
                Ok(updated.display_status())
            }
            Err(e) => {
                warn!(id, "chat status update failed: {e}");
                self.store
                    .mutation_failed(format!("Failed to update chat status: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    /// True only while the very first fetch is outstanding; later refreshes
    /// are silent.
    pub async fn is_initial_load(&self) -> bool {
        self.store.read(|s| s.is_initial_load()).await
    }

    pub async fn pending_count(&self) -> usize {
        self.store.read(|s| s.pending().count()).await
    }

    pub async fn pending_ids(&self) -> Vec<String> {
        self.store.read(|s| s.pending_ids()).await
    }

    pub async fn snapshot(&self) -> CollectionState<ChatQuery> {
        self.store.snapshot().await
    }

    pub async fn clear_error(&self) {
        self.store.clear_error().await;
    }
}
