//! Sled-backed KV namespace. One sled database per binding.

use crate::capability::{
    CollabResult, KvKey, KvListResult, KvNamespace, KvPutOptions, KV_METHODS,
};
use crate::env::{method_member, HostObject, Member};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;

/// Record envelope stored under each key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    /// Absolute expiry, unix seconds. Still live during that second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

impl StoredEntry {
    fn is_expired(&self, now: i64) -> bool {
        self.expiration.is_some_and(|at| at < now)
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct SledKvNamespace {
    db: Db,
}

impl SledKvNamespace {
    /// Opens or creates the namespace at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// Namespace that lives only as long as this handle.
    pub fn temporary() -> Result<Self, sled::Error> {
        Ok(Self {
            db: sled::Config::new().temporary(true).open()?,
        })
    }

    /// Reads a live entry. Expired entries are removed on sight and read as absent.
    fn read(&self, key: &str) -> CollabResult<Option<StoredEntry>> {
        let Some(bytes) = self.db.get(key.as_bytes())? else {
            return Ok(None);
        };
        let entry: StoredEntry = serde_json::from_slice(&bytes)?;
        if entry.is_expired(now_secs()) {
            self.db.remove(key.as_bytes())?;
            return Ok(None);
        }
        Ok(Some(entry))
    }
}

#[async_trait]
impl KvNamespace for SledKvNamespace {
    async fn list(&self) -> CollabResult<KvListResult> {
        let now = now_secs();
        let mut keys = Vec::new();
        for item in self.db.iter() {
            let (key, bytes) = item?;
            let entry: StoredEntry = match serde_json::from_slice(&bytes) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "Skipping unreadable kv record"
                    );
                    continue;
                }
            };
            if entry.is_expired(now) {
                self.db.remove(&key)?;
                continue;
            }
            keys.push(KvKey {
                name: String::from_utf8_lossy(&key).into_owned(),
                expiration: entry.expiration,
                metadata: entry.metadata,
            });
        }
        Ok(KvListResult { keys })
    }

    async fn get(&self, key: &str) -> CollabResult<Option<String>> {
        Ok(self.read(key)?.map(|entry| entry.value))
    }

    async fn get_with_metadata(
        &self,
        key: &str,
    ) -> CollabResult<(Option<String>, Option<serde_json::Value>)> {
        Ok(match self.read(key)? {
            Some(entry) => (Some(entry.value), entry.metadata),
            None => (None, None),
        })
    }

    async fn put(&self, key: &str, value: &str, options: KvPutOptions) -> CollabResult<()> {
        let entry = StoredEntry {
            value: value.to_string(),
            expiration: options
                .expiration_ttl
                .map(|ttl| now_secs().saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX))),
            metadata: options.metadata,
        };
        self.db.insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CollabResult<()> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }
}

impl HostObject for SledKvNamespace {
    fn member(&self, name: &str) -> Option<Member> {
        method_member(KV_METHODS, name)
    }

    fn type_name(&self) -> &str {
        "KVNamespace"
    }

    fn as_kv_namespace(&self) -> Option<&dyn KvNamespace> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_list_delete() {
        let kv = SledKvNamespace::temporary().unwrap();
        kv.put(
            "b",
            "2",
            KvPutOptions {
                expiration_ttl: Some(3600),
                metadata: Some(serde_json::json!({ "tag": "x" })),
            },
        )
        .await
        .unwrap();
        kv.put("a", "1", KvPutOptions::default()).await.unwrap();

        let listing = kv.list().await.unwrap();
        let names: Vec<_> = listing.keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(listing.keys[1].expiration.unwrap() > now_secs());
        assert_eq!(listing.keys[1].metadata, Some(serde_json::json!({ "tag": "x" })));

        assert_eq!(kv.get("a").await.unwrap().as_deref(), Some("1"));
        let (value, metadata) = kv.get_with_metadata("b").await.unwrap();
        assert_eq!(value.as_deref(), Some("2"));
        assert!(metadata.is_some());

        kv.delete("a").await.unwrap();
        assert_eq!(kv.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let kv = SledKvNamespace::temporary().unwrap();
        let stale = StoredEntry {
            value: "old".into(),
            expiration: Some(now_secs() - 10),
            metadata: None,
        };
        kv.db
            .insert("stale", serde_json::to_vec(&stale).unwrap())
            .unwrap();
        kv.put("fresh", "new", KvPutOptions::default()).await.unwrap();

        assert_eq!(kv.get("stale").await.unwrap(), None);
        let listing = kv.list().await.unwrap();
        assert_eq!(listing.keys.len(), 1);
        assert_eq!(listing.keys[0].name, "fresh");
    }

    #[tokio::test]
    async fn entry_is_live_through_its_expiry_second() {
        let kv = SledKvNamespace::temporary().unwrap();
        let edge = StoredEntry {
            value: "edge".into(),
            expiration: Some(now_secs()),
            metadata: None,
        };
        kv.db.insert("edge", serde_json::to_vec(&edge).unwrap()).unwrap();
        assert_eq!(kv.get("edge").await.unwrap().as_deref(), Some("edge"));
    }

    #[tokio::test]
    async fn short_ttl_save_survives_relisting() {
        let kv = SledKvNamespace::temporary().unwrap();
        let form = crate::validate::KvEntryForm {
            key: Some("k".into()),
            value: Some("v".into()),
            expiration_ttl: Some("1".into()),
            metadata: None,
        };
        let rows = crate::kv::KvBrowser::new("CACHE", &kv).save(&form).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn unreadable_records_are_skipped_in_listing() {
        let kv = SledKvNamespace::temporary().unwrap();
        kv.db.insert("broken", &b"not json"[..]).unwrap();
        kv.put("ok", "1", KvPutOptions::default()).await.unwrap();

        let listing = kv.list().await.unwrap();
        let names: Vec<_> = listing.keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn probes_as_kv_shape() {
        let kv = SledKvNamespace::temporary().unwrap();
        assert!(kv.member("getWithMetadata").is_some());
        assert!(kv.member("head").is_none());
    }
}
