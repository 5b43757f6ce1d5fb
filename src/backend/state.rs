use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::models::{
    AdminProfile, Appointment, AppointmentStatus, ChatQuery, ChatStatus, DEFAULT_CLINIC, Query,
    QueryStatus,
};

#[derive(Debug, Default)]
pub struct Collections {
    pub appointments: Vec<Appointment>,
    pub queries: Vec<Query>,
    pub chats: Vec<ChatQuery>,
}

#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub profile: AdminProfile,
}

#[derive(Clone)]
pub struct AppState {
    pub data: Arc<RwLock<Collections>>,
    pub admin: Arc<AdminAccount>,
}

impl AppState {
    pub fn new(email: &str, password: &str) -> Self {
        Self::with_data(email, password, Collections::default())
    }

    pub fn from_config(cfg: &BackendConfig) -> Self {
        let data = if cfg.seed_sample_data {
            sample_data()
        } else {
            Collections::default()
        };
        Self::with_data(&cfg.admin_email, &cfg.admin_password, data)
    }

    fn with_data(email: &str, password: &str, data: Collections) -> Self {
        let email = email.trim().to_string();
        let admin = AdminAccount {
            profile: AdminProfile {
                id: Some(new_id()),
                name: Some("Dr Usama Sheikh Admin".into()),
                email: Some(email.clone()),
                role: Some("admin".into()),
            },
            email,
            password: password.to_string(),
        };
        Self {
            data: Arc::new(RwLock::new(data)),
            admin: Arc::new(admin),
        }
    }

    /// Replaces the collections with a small fixed data set.
    pub async fn seed(&self) {
        *self.data.write().await = sample_data();
    }
}

/// Server-assigned record id.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn sample_data() -> Collections {
    let now = Utc::now();
    let appointment = |name: &str,
                       service: &str,
                       days_ahead: i64,
                       status: AppointmentStatus,
                       amount: Option<f64>,
                       age_minutes: i64| {
        Appointment {
            id: new_id(),
            clinic: DEFAULT_CLINIC.to_string(),
            service: service.to_string(),
            date: (now + Duration::days(days_ahead)).format("%Y-%m-%d").to_string(),
            time: "10:00 AM".to_string(),
            name: name.to_string(),
            phone: "03001234567".to_string(),
            message: String::new(),
            status,
            amount,
            created_at: Some(now - Duration::minutes(age_minutes)),
            updated_at: None,
        }
    };

    Collections {
        appointments: vec![
            appointment("Ali Khan", "Root Canal", 2, AppointmentStatus::Pending, None, 15),
            appointment(
                "Sara Ahmed",
                "Teeth Whitening",
                -3,
                AppointmentStatus::Completed,
                Some(15000.0),
                4 * 1440,
            ),
            appointment(
                "Bilal Hussain",
                "Dental Implants",
                -1,
                AppointmentStatus::Rejected,
                Some(8000.0),
                2 * 1440,
            ),
        ],
        queries: vec![Query {
            id: new_id(),
            name: "Hina Malik".into(),
            phone: "03211234567".into(),
            department: "cosmetic-dentistry".into(),
            message: "Do you offer veneers?".into(),
            status: QueryStatus::Pending,
            created_at: Some(now - Duration::minutes(90)),
            updated_at: None,
        }],
        chats: vec![ChatQuery {
            id: new_id(),
            name: "Usman Tariq".into(),
            phone: "+923331234567".into(),
            status: ChatStatus::Pending,
            created_at: Some(now - Duration::minutes(5)),
        }],
    }
}
