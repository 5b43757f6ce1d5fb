//! "New item" badges.
//!
//! A record is new while it is pending and its id is absent from the
//! locally persisted seen-set. The seen-set is never sent to the server.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::ClientResult;
use crate::models::{Appointment, ChatQuery, Query};
use crate::storage::{LocalStorage, SEEN_APPOINTMENTS_KEY, SEEN_CHATS_KEY, SEEN_QUERIES_KEY};
use crate::store::{Record, sort_newest_first};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    Appointments,
    Queries,
    Chats,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Appointments, Self::Queries, Self::Chats];

    fn storage_key(self) -> &'static str {
        match self {
            Self::Appointments => SEEN_APPOINTMENTS_KEY,
            Self::Queries => SEEN_QUERIES_KEY,
            Self::Chats => SEEN_CHATS_KEY,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Appointments => "appointments",
            Self::Queries => "queries",
            Self::Chats => "chats",
        })
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "appointment" | "appointments" => Ok(Self::Appointments),
            "query" | "queries" => Ok(Self::Queries),
            "chat" | "chats" => Ok(Self::Chats),
            other => Err(format!(
                "unknown collection '{other}', expected appointments, queries or chats"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenSet {
    appointments: BTreeSet<String>,
    queries: BTreeSet<String>,
    chats: BTreeSet<String>,
}

impl SeenSet {
    pub fn ids(&self, kind: CollectionKind) -> &BTreeSet<String> {
        match kind {
            CollectionKind::Appointments => &self.appointments,
            CollectionKind::Queries => &self.queries,
            CollectionKind::Chats => &self.chats,
        }
    }

    fn ids_mut(&mut self, kind: CollectionKind) -> &mut BTreeSet<String> {
        match kind {
            CollectionKind::Appointments => &mut self.appointments,
            CollectionKind::Queries => &mut self.queries,
            CollectionKind::Chats => &mut self.chats,
        }
    }

    pub fn contains(&self, kind: CollectionKind, id: &str) -> bool {
        self.ids(kind).contains(id)
    }

    pub fn unseen<'a>(&self, kind: CollectionKind, pending_ids: &'a [String]) -> Vec<&'a str> {
        pending_ids
            .iter()
            .filter(|id| !self.contains(kind, id))
            .map(String::as_str)
            .collect()
    }

    pub fn unseen_count(&self, kind: CollectionKind, pending_ids: &[String]) -> usize {
        self.unseen(kind, pending_ids).len()
    }

    pub fn badge(&self, appointments: &[String], queries: &[String], chats: &[String]) -> Badge {
        Badge {
            appointments: self.unseen_count(CollectionKind::Appointments, appointments),
            queries: self.unseen_count(CollectionKind::Queries, queries),
            chats: self.unseen_count(CollectionKind::Chats, chats),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Badge {
    pub appointments: usize,
    pub queries: usize,
    pub chats: usize,
}

impl Badge {
    pub fn total(&self) -> usize {
        self.appointments + self.queries + self.chats
    }
}

/// The seen-set plus its backing storage. Loaded once; each mark is a
/// read-modify-write of the affected key.
pub struct SeenTracker {
    storage: LocalStorage,
    seen: SeenSet,
}

impl SeenTracker {
    pub fn load(storage: LocalStorage) -> ClientResult<Self> {
        let mut seen = SeenSet::default();
        for kind in CollectionKind::ALL {
            *seen.ids_mut(kind) = read_ids(&storage, kind)?;
        }
        Ok(Self { storage, seen })
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Returns whether `id` was new to the set.
    pub fn mark_seen(&mut self, kind: CollectionKind, id: &str) -> ClientResult<bool> {
        Ok(self.mark_all_seen(kind, [id])? > 0)
    }

    /// Unions `ids` into the persisted set. Returns how many were new.
    pub fn mark_all_seen<I, S>(&mut self, kind: CollectionKind, ids: I) -> ClientResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = read_ids(&self.storage, kind)?;
        let before = current.len();
        current.extend(ids.into_iter().map(|s| s.as_ref().to_string()));
        let added = current.len() - before;

        if added > 0 {
            let as_vec: Vec<&String> = current.iter().collect();
            self.storage.set(kind.storage_key(), &as_vec)?;
            info!(%kind, added, "marked as seen");
        }
        *self.seen.ids_mut(kind) = current;
        Ok(added)
    }
}

fn read_ids(storage: &LocalStorage, kind: CollectionKind) -> ClientResult<BTreeSet<String>> {
    Ok(storage
        .get::<Vec<String>>(kind.storage_key())?
        .unwrap_or_default()
        .into_iter()
        .collect())
}

/// One unseen pending record, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: CollectionKind,
    pub id: String,
    pub name: String,
    pub subject: String,
    pub phone: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn time_label(&self, now: DateTime<Utc>) -> String {
        match self.created_at {
            Some(t) => relative_time_label(t, now),
            None => "unknown time".to_string(),
        }
    }
}

/// Unseen pending records across all three collections, newest first.
pub fn unseen_notifications(
    seen: &SeenSet,
    appointments: &[Appointment],
    queries: &[Query],
    chats: &[ChatQuery],
) -> Vec<Notification> {
    let mut appts: Vec<Appointment> = appointments
        .iter()
        .filter(|a| a.is_pending() && !seen.contains(CollectionKind::Appointments, &a.id))
        .cloned()
        .collect();
    sort_newest_first(&mut appts);

    let mut out: Vec<Notification> = appts
        .into_iter()
        .map(|a| Notification {
            kind: CollectionKind::Appointments,
            created_at: a.recency(),
            id: a.id,
            name: a.name,
            subject: a.service,
            phone: a.phone,
        })
        .collect();

    out.extend(
        queries
            .iter()
            .filter(|q| q.is_pending() && !seen.contains(CollectionKind::Queries, &q.id))
            .map(|q| Notification {
                kind: CollectionKind::Queries,
                id: q.id.clone(),
                name: q.name.clone(),
                subject: q.department_label(),
                phone: q.phone.clone(),
                created_at: q.created_at,
            }),
    );

    out.extend(
        chats
            .iter()
            .filter(|c| c.is_pending() && !seen.contains(CollectionKind::Chats, &c.id))
            .map(|c| Notification {
                kind: CollectionKind::Chats,
                id: c.id.clone(),
                name: c.name.clone(),
                subject: "Chat".to_string(),
                phone: c.phone.clone(),
                created_at: c.created_at,
            }),
    );

    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

/// `N minutes ago` under an hour, `N hours ago` under a day, else `N days ago`.
pub fn relative_time_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - created_at).num_minutes().max(0);
    if minutes < 60 {
        format!("{minutes} minutes ago")
    } else if minutes < 1440 {
        format!("{} hours ago", minutes / 60)
    } else {
        format!("{} days ago", minutes / 1440)
    }
}
