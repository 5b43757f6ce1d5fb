use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::ClinicApi;
use crate::error::ClientResult;
use crate::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::store::{CollectionState, Record, Store};

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentPatch {
    pub status: AppointmentStatus,
    /// Left untouched when `None`.
    pub amount: Option<f64>,
}

impl Record for Appointment {
    type Patch = AppointmentPatch;

    const KIND: &'static str = "appointments";

    fn id(&self) -> &str {
        &self.id
    }

    fn recency(&self) -> Option<DateTime<Utc>> {
        Appointment::recency(self)
    }

    fn is_pending(&self) -> bool {
        self.status == AppointmentStatus::Pending
    }

    fn apply(&mut self, patch: &AppointmentPatch) {
        self.status = patch.status;
        if let Some(amount) = patch.amount {
            self.amount = Some(amount);
        }
    }
}

pub struct AppointmentStore {
    api: Arc<dyn ClinicApi>,
    store: Store<Appointment>,
}

impl AppointmentStore {
    pub fn new(api: Arc<dyn ClinicApi>) -> Self {
        Self {
            api,
            store: Store::new(),
        }
    }

    pub async fn fetch_all(&self) -> ClientResult<()> {
        let api = self.api.clone();
        self.store
            .fetch_with(|| async move { api.list_appointments().await })
            .await
    }

    /// PUTs the new status and patches the local record in place. No refetch.
    pub async fn update_status(
        &self,
        id: &str,
        status: AppointmentStatus,
        amount: Option<f64>,
    ) -> ClientResult<()> {
        match self.api.update_appointment_status(id, status, amount).await {
            Ok(_) => {
                info!(id, %status, ?amount, "appointment status updated");
                self.store
                    .patched(id, AppointmentPatch { status, amount })
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(id, "appointment status update failed: {e}");
                self.store
                    .mutation_failed(format!("Failed to update appointment status: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    /// Creates a pending appointment. The local collection is not touched;
    /// the caller refetches to observe it.
    pub async fn create(&self, data: &NewAppointment) -> ClientResult<Appointment> {
        data.validate()?;
        match self.api.create_appointment(data).await {
            Ok(created) => {
                info!(id = %created.id, name = %created.name, "appointment created");
                Ok(created)
            }
            Err(e) => {
                warn!("appointment creation failed: {e}");
                self.store
                    .mutation_failed(format!("Failed to create appointment: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        match self.api.delete_appointment(id).await {
            Ok(()) => {
                info!(id, "appointment deleted");
                self.store.removed(id).await;
                Ok(())
            }
            Err(e) => {
                warn!(id, "appointment delete failed: {e}");
                self.store
                    .mutation_failed(format!("Failed to delete appointment: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn clear_error(&self) {
        self.store.clear_error().await;
    }

    pub async fn snapshot(&self) -> CollectionState<Appointment> {
        self.store.snapshot().await
    }

    pub async fn pending_ids(&self) -> Vec<String> {
        self.store.read(|s| s.pending_ids()).await
    }

    pub async fn find(&self, id: &str) -> Option<Appointment> {
        self.store.read(|s| s.find(id).cloned()).await
    }
}

/// Appointments matching `status`, newest first. `None` means all.
pub fn filter_by_status(items: &[Appointment], status: Option<AppointmentStatus>) -> Vec<Appointment> {
    let mut out: Vec<Appointment> = items
        .iter()
        .filter(|a| status.is_none_or(|s| a.status == s))
        .cloned()
        .collect();
    crate::store::sort_newest_first(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ClientError;
    use crate::models::{
        ChatQuery, ChatStatus, LoginRequest, LoginResponse, Query, QueryStatus,
    };
    use crate::store::fixtures::appointment;

    /// Appointments-only fake; everything else is unreachable in these tests.
    #[derive(Default)]
    struct FakeApi {
        list: Mutex<Vec<ClientResult<Vec<Appointment>>>>,
        update_fails: bool,
        created: Mutex<Vec<NewAppointment>>,
    }

    #[async_trait]
    impl ClinicApi for FakeApi {
        async fn list_appointments(&self) -> ClientResult<Vec<Appointment>> {
            self.list.lock().unwrap().remove(0)
        }

        async fn update_appointment_status(
            &self,
            id: &str,
            status: AppointmentStatus,
            amount: Option<f64>,
        ) -> ClientResult<Appointment> {
            if self.update_fails {
                return Err(ClientError::Http(500));
            }
            let mut a = appointment(id, None);
            a.status = status;
            a.amount = amount;
            Ok(a)
        }

        async fn create_appointment(&self, data: &NewAppointment) -> ClientResult<Appointment> {
            self.created.lock().unwrap().push(data.clone());
            Ok(appointment("new", None))
        }

        async fn delete_appointment(&self, _id: &str) -> ClientResult<()> {
            Ok(())
        }

        async fn list_queries(&self) -> ClientResult<Vec<Query>> {
            unreachable!()
        }

        async fn update_query_status(&self, _: &str, _: QueryStatus) -> ClientResult<Query> {
            unreachable!()
        }

        async fn delete_query(&self, _: &str) -> ClientResult<()> {
            unreachable!()
        }

        async fn list_chats(&self) -> ClientResult<Vec<ChatQuery>> {
            unreachable!()
        }

        async fn update_chat_status(&self, _: &str, _: ChatStatus) -> ClientResult<ChatQuery> {
            unreachable!()
        }

        async fn login(&self, _: &LoginRequest) -> ClientResult<LoginResponse> {
            unreachable!()
        }
    }

    fn store_with(api: FakeApi) -> AppointmentStore {
        AppointmentStore::new(Arc::new(api))
    }

    #[tokio::test]
    async fn completing_sets_status_and_amount_on_one_record() {
        let mut y = appointment("Y", None);
        y.amount = Some(2000.0);
        let api = FakeApi {
            list: Mutex::new(vec![Ok(vec![appointment("X", None), y.clone()])]),
            ..Default::default()
        };
        let store = store_with(api);
        store.fetch_all().await.unwrap();

        store
            .update_status("X", AppointmentStatus::Completed, Some(5000.0))
            .await
            .unwrap();

        let snap = store.snapshot().await;
        let x = snap.find("X").unwrap();
        assert_eq!(x.status, AppointmentStatus::Completed);
        assert_eq!(x.amount, Some(5000.0));
        assert_eq!(snap.find("Y").unwrap(), &y);
    }

    #[tokio::test]
    async fn rejecting_without_amount_keeps_existing_amount() {
        let mut x = appointment("X", None);
        x.amount = Some(800.0);
        let api = FakeApi {
            list: Mutex::new(vec![Ok(vec![x])]),
            ..Default::default()
        };
        let store = store_with(api);
        store.fetch_all().await.unwrap();

        store
            .update_status("X", AppointmentStatus::Rejected, None)
            .await
            .unwrap();
        let x = store.find("X").await.unwrap();
        assert_eq!(x.status, AppointmentStatus::Rejected);
        assert_eq!(x.amount, Some(800.0));
    }

    #[tokio::test]
    async fn failed_update_surfaces_error_and_leaves_record() {
        let api = FakeApi {
            list: Mutex::new(vec![Ok(vec![appointment("X", None)])]),
            update_fails: true,
            ..Default::default()
        };
        let store = store_with(api);
        store.fetch_all().await.unwrap();

        let res = store
            .update_status("X", AppointmentStatus::Completed, Some(100.0))
            .await;
        assert!(matches!(res, Err(ClientError::Http(500))));

        let snap = store.snapshot().await;
        assert_eq!(snap.items[0].status, AppointmentStatus::Pending);
        assert!(snap.error.unwrap().contains("HTTP error! status: 500"));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_last_good_collection() {
        let api = FakeApi {
            list: Mutex::new(vec![
                Ok(vec![appointment("X", None)]),
                Err(ClientError::Network("connection refused".into())),
            ]),
            ..Default::default()
        };
        let store = store_with(api);
        store.fetch_all().await.unwrap();
        assert!(store.fetch_all().await.is_err());

        let snap = store.snapshot().await;
        assert_eq!(snap.items.len(), 1);
        assert!(snap.error.is_some());
    }

    #[tokio::test]
    async fn create_validates_before_posting_and_does_not_insert() {
        let store = store_with(FakeApi::default());

        let invalid = NewAppointment {
            name: "Ali".into(),
            ..Default::default()
        };
        assert!(matches!(
            store.create(&invalid).await,
            Err(ClientError::Validation(_))
        ));

        let valid = NewAppointment {
            clinic: "Smile Dental Clinic".into(),
            service: "Root Canal".into(),
            date: "2025-09-01".into(),
            time: "10:00 AM".into(),
            name: "Ali".into(),
            phone: "03001234567".into(),
            message: String::new(),
        };
        let created = store.create(&valid).await.unwrap();
        assert_eq!(created.status, AppointmentStatus::Pending);
        assert!(store.snapshot().await.items.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_local_record() {
        let api = FakeApi {
            list: Mutex::new(vec![Ok(vec![appointment("X", None), appointment("Y", None)])]),
            ..Default::default()
        };
        let store = store_with(api);
        store.fetch_all().await.unwrap();
        store.delete("X").await.unwrap();

        let ids: Vec<String> = store.snapshot().await.items.into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["Y".to_string()]);
    }

    #[test]
    fn filter_by_status_orders_newest_first() {
        let mut a = appointment("a", Some("2025-08-01T00:00:00Z"));
        a.status = AppointmentStatus::Completed;
        let b = appointment("b", Some("2025-08-02T00:00:00Z"));
        let mut c = appointment("c", Some("2025-08-03T00:00:00Z"));
        c.status = AppointmentStatus::Completed;

        let items = vec![a, b, c];
        let done = filter_by_status(&items, Some(AppointmentStatus::Completed));
        let ids: Vec<&str> = done.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert_eq!(filter_by_status(&items, None).len(), 3);
    }
}
