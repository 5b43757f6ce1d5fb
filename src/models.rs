use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;

pub const DEFAULT_CLINIC: &str = "Smile Dental Clinic";

/* -------------------------
   Status domains
--------------------------*/

/// A closed set of workflow states. Transitions are unrestricted: any state
/// may move to any other through an explicit admin action.
pub trait StatusDomain: Copy + Eq + fmt::Display + 'static {
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    /// Every valid status except `self`, in declaration order.
    fn options(self) -> Vec<Self> {
        Self::ALL.iter().copied().filter(|s| *s != self).collect()
    }

    fn parse(s: &str) -> Result<Self, String> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|st| st.as_str()).collect();
                format!("invalid status '{s}', expected one of: {}", valid.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Completed,
    Rejected,
}

impl StatusDomain for AppointmentStatus {
    const ALL: &'static [Self] = &[Self::Pending, Self::Completed, Self::Rejected];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Pending,
    Answered,
    Closed,
}

impl StatusDomain for QueryStatus {
    const ALL: &'static [Self] = &[Self::Pending, Self::Answered, Self::Closed];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
            Self::Closed => "closed",
        }
    }
}

/// Chat status as the backend stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    #[default]
    Pending,
    Closed,
}

impl StatusDomain for ChatStatus {
    const ALL: &'static [Self] = &[Self::Pending, Self::Closed];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Closed => "closed",
        }
    }
}

/// Chat status as the admin sees it: a closed chat reads as "completed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatDisplayStatus {
    #[default]
    Pending,
    Completed,
}

impl StatusDomain for ChatDisplayStatus {
    const ALL: &'static [Self] = &[Self::Pending, Self::Completed];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl From<ChatStatus> for ChatDisplayStatus {
    fn from(s: ChatStatus) -> Self {
        match s {
            ChatStatus::Pending => ChatDisplayStatus::Pending,
            ChatStatus::Closed => ChatDisplayStatus::Completed,
        }
    }
}

impl From<ChatDisplayStatus> for ChatStatus {
    fn from(s: ChatDisplayStatus) -> Self {
        match s {
            ChatDisplayStatus::Pending => ChatStatus::Pending,
            ChatDisplayStatus::Completed => ChatStatus::Closed,
        }
    }
}

macro_rules! impl_status_text {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = String;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    <$ty as StatusDomain>::parse(s)
                }
            }
        )+
    };
}

impl_status_text!(AppointmentStatus, QueryStatus, ChatStatus, ChatDisplayStatus);

/* -------------------------
   Records
--------------------------*/

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AppointmentWire", rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: String,
    pub clinic: String,
    pub service: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Display slot such as `10:00 AM`.
    pub time: String,
    pub name: String,
    pub phone: String,
    pub message: String,
    pub status: AppointmentStatus,
    pub amount: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Ordering key for newest-first lists: creation time, else the visit date.
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        self.created_at.or_else(|| {
            NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QueryWire", rename_all = "camelCase")]
pub struct Query {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub department: String,
    pub message: String,
    pub status: QueryStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ChatQueryWire", rename_all = "camelCase")]
pub struct ChatQuery {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub status: ChatStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Query {
    /// Department slug for display: the first `-` becomes a space.
    pub fn department_label(&self) -> String {
        self.department.replacen('-', " ", 1)
    }
}

impl ChatQuery {
    pub fn display_status(&self) -> ChatDisplayStatus {
        self.status.into()
    }
}

/* -------------------------
   Ingestion (wire shapes)
--------------------------*/

// The backend is inconsistent about `_id` vs `id`; both are accepted here and
// collapsed into a single `id` on the domain type.

fn nullable_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn pick_id(mongo_id: Option<String>, id: Option<String>, kind: &str) -> Result<String, String> {
    let non_empty = |s: &String| !s.trim().is_empty();
    mongo_id
        .filter(non_empty)
        .or_else(|| id.filter(non_empty))
        .ok_or_else(|| format!("{kind} record has neither `_id` nor `id`"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentWire {
    #[serde(rename = "_id", default)]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    clinic: String,
    #[serde(default, deserialize_with = "nullable_string")]
    service: String,
    #[serde(default, deserialize_with = "nullable_string")]
    date: String,
    #[serde(default, deserialize_with = "nullable_string")]
    time: String,
    #[serde(default, deserialize_with = "nullable_string")]
    name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    phone: String,
    #[serde(default, deserialize_with = "nullable_string")]
    message: String,
    #[serde(default)]
    status: Option<AppointmentStatus>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<AppointmentWire> for Appointment {
    type Error = String;

    fn try_from(w: AppointmentWire) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: pick_id(w.mongo_id, w.id, "appointment")?,
            clinic: w.clinic,
            service: w.service,
            date: w.date,
            time: w.time,
            name: w.name,
            phone: w.phone,
            message: w.message,
            status: w.status.unwrap_or_default(),
            amount: w.amount,
            created_at: w.created_at,
            updated_at: w.updated_at,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryWire {
    #[serde(rename = "_id", default)]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    phone: String,
    #[serde(default, deserialize_with = "nullable_string")]
    department: String,
    #[serde(default, deserialize_with = "nullable_string")]
    message: String,
    #[serde(default)]
    status: Option<QueryStatus>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueryWire> for Query {
    type Error = String;

    fn try_from(w: QueryWire) -> Result<Self, Self::Error> {
        Ok(Query {
            id: pick_id(w.mongo_id, w.id, "query")?,
            name: w.name,
            phone: w.phone,
            department: w.department,
            message: w.message,
            status: w.status.unwrap_or_default(),
            created_at: w.created_at,
            updated_at: w.updated_at,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatQueryWire {
    #[serde(rename = "_id", default)]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    phone: String,
    #[serde(default)]
    status: Option<ChatStatus>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ChatQueryWire> for ChatQuery {
    type Error = String;

    fn try_from(w: ChatQueryWire) -> Result<Self, Self::Error> {
        Ok(ChatQuery {
            id: pick_id(w.mongo_id, w.id, "chat")?,
            name: w.name,
            phone: w.phone,
            status: w.status.unwrap_or_default(),
            created_at: w.created_at,
        })
    }
}

/* -------------------------
   Request / response DTOs
--------------------------*/

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub clinic: String,
    pub service: String,
    pub date: String,
    pub time: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

impl NewAppointment {
    /// Every field except the free-text message is required.
    pub fn validate(&self) -> Result<(), ClientError> {
        let required = [
            &self.clinic,
            &self.service,
            &self.date,
            &self.time,
            &self.name,
            &self.phone,
        ];
        if required.iter().any(|f| f.trim().is_empty()) {
            return Err(ClientError::missing_fields());
        }
        if NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            return Err(ClientError::Validation("date must be YYYY-MM-DD".into()));
        }
        Ok(())
    }
}

/// Body of `POST /api/appointmentRoutes`; the status is always `pending`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAppointmentBody {
    #[serde(flatten)]
    pub appointment: NewAppointment,
    #[serde(default)]
    pub status: AppointmentStatus,
}

impl CreateAppointmentBody {
    pub fn pending(appointment: NewAppointment) -> Self {
        Self {
            appointment,
            status: AppointmentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentStatusUpdate {
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStatusUpdate {
    pub status: QueryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStatusUpdate {
    pub status: ChatStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub admin: Option<AdminProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminProfile {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl AdminProfile {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("admin")
    }
}
