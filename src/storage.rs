//! Client-local key/value storage: one JSON object in a file under the state
//! directory. Every write is a read-modify-write of the whole file followed
//! by an atomic rename; concurrent writers from separate processes can lose
//! updates.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ClientResult;

pub const TOKEN_KEY: &str = "dental_admin_token";
pub const USER_KEY: &str = "dental_admin_user";
pub const SEEN_APPOINTMENTS_KEY: &str = "seen_appointment_ids";
pub const SEEN_QUERIES_KEY: &str = "seen_query_ids";
pub const SEEN_CHATS_KEY: &str = "seen_chat_ids";

const FILE_NAME: &str = "local_storage.json";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn open(dir: &Path) -> ClientResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ClientResult<Option<T>> {
        match self.load()?.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> ClientResult<()> {
        let mut map = self.load()?;
        map.insert(key.to_string(), serde_json::to_value(value)?);
        self.save(&map)
    }

    pub fn remove(&self, key: &str) -> ClientResult<()> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }

    fn load(&self) -> ClientResult<Map<String, Value>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Map<String, Value>>(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable local storage: {e}");
                Ok(Map::new())
            }
        }
    }

    fn save(&self, map: &Map<String, Value>) -> ClientResult<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = map.len(), "local storage saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();

        assert_eq!(storage.get::<String>(TOKEN_KEY).unwrap(), None);
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage
            .set(SEEN_QUERIES_KEY, &vec!["a".to_string(), "b".to_string()])
            .unwrap();

        let reopened = LocalStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get::<String>(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
        assert_eq!(
            reopened.get::<Vec<String>>(SEEN_QUERIES_KEY).unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn remove_deletes_only_that_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage.set(USER_KEY, &serde_json::json!({ "name": "Admin" })).unwrap();

        storage.remove(TOKEN_KEY).unwrap();
        assert_eq!(storage.get::<String>(TOKEN_KEY).unwrap(), None);
        assert!(storage.get::<Value>(USER_KEY).unwrap().is_some());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::open(dir.path()).unwrap();
        fs::write(storage.path(), b"{not json").unwrap();

        assert_eq!(storage.get::<String>(TOKEN_KEY).unwrap(), None);
        storage.set(TOKEN_KEY, "fresh").unwrap();
        assert_eq!(storage.get::<String>(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }
}
