// JSON-backed mute store. Persist all mutes in a single JSON file as a map:
// { "muted": { user_id: unix_expiry } }
//
// Write-through: every mutation rewrites the document before returning, and
// a failed write rolls the cache back so memory never claims a mute that
// disk doesn't have. A missing file is an empty mute set.

use crate::core::mutes::{MuteError, MuteStore};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Serialize, Deserialize, Default)]
struct MuteDocument {
    muted: HashMap<String, i64>,
}

pub struct JsonMuteStore {
    path: PathBuf,
    cache: RwLock<MuteDocument>,
}

impl JsonMuteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut document: MuteDocument = if path.exists() {
            let file = File::open(&path).expect("Failed to open mute store file");
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).unwrap_or_default()
        } else {
            MuteDocument::default()
        };

        // Lazy pruning: expired mutes are dead weight, drop them on load.
        let now = Utc::now().timestamp();
        document.muted.retain(|_, until| *until > now);

        Self {
            path,
            cache: RwLock::new(document),
        }
    }

    fn write_document(&self, document: &MuteDocument) -> Result<(), MuteError> {
        let file =
            File::create(&self.path).map_err(|e| MuteError::Persistence(e.to_string()))?;
        serde_json::to_writer_pretty(file, document)
            .map_err(|e| MuteError::Persistence(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl MuteStore for JsonMuteStore {
    async fn muted_until(&self, user_id: u64) -> Result<Option<DateTime<Utc>>, MuteError> {
        let cache = self.cache.read().await;
        Ok(cache
            .muted
            .get(&user_id.to_string())
            .and_then(|ts| Utc.timestamp_opt(*ts, 0).single()))
    }

    async fn set_muted_until(&self, user_id: u64, until: DateTime<Utc>) -> Result<(), MuteError> {
        let key = user_id.to_string();
        let mut cache = self.cache.write().await;
        let previous = cache.muted.insert(key.clone(), until.timestamp());

        if let Err(e) = self.write_document(&cache) {
            // The write failed, so the mutation didn't happen.
            match previous {
                Some(prev) => cache.muted.insert(key, prev),
                None => cache.muted.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn clear(&self, user_id: u64) -> Result<(), MuteError> {
        let key = user_id.to_string();
        let mut cache = self.cache.write().await;
        let previous = match cache.muted.remove(&key) {
            Some(prev) => prev,
            None => return Ok(()),
        };

        if let Err(e) = self.write_document(&cache) {
            cache.muted.insert(key, previous);
            return Err(e);
        }
        Ok(())
    }
}
