//! KV browser: list, search, create/update, and delete entries of one namespace.

use crate::capability::{KvKey, KvNamespace, KvPutOptions};
use crate::classifier::CapabilityKind;
use crate::env::Env;
use crate::error::{BrowseError, CollaboratorError};
use crate::selector::lookup;
use crate::validate::{validate, KvEntryForm};
use futures_util::future::join_all;
use serde::Serialize;

/// Shown in place of a value whose fetch failed.
pub const VALUE_LOAD_ERROR: &str = "[Error loading value]";

/// One row of a namespace listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KvRow {
    pub key: String,
    /// `None` when the key vanished between listing and fetching.
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

pub struct KvBrowser<'a> {
    name: String,
    kv: &'a dyn KvNamespace,
}

impl<'a> KvBrowser<'a> {
    /// Opens the KV namespace bound as `name`.
    pub fn open(env: &'a Env, name: &str) -> Result<Self, BrowseError> {
        let binding = lookup(env, CapabilityKind::KvNamespace, name)?;
        let kv = binding.kv_namespace().ok_or_else(|| {
            CollaboratorError::Kv(format!("binding '{name}' exposes no key-value interface"))
        })?;
        Ok(Self::new(name, kv))
    }

    pub fn new(name: impl Into<String>, kv: &'a dyn KvNamespace) -> Self {
        Self {
            name: name.into(),
            kv,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lists every entry, optionally keeping only keys that contain `search`
    /// (case-insensitive). Values are fetched concurrently; a failed fetch marks that row
    /// with [`VALUE_LOAD_ERROR`] instead of failing the listing.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<KvRow>, BrowseError> {
        let listing = self.kv.list().await?;
        let keys: Vec<KvKey> = match search.filter(|s| !s.is_empty()) {
            Some(term) => {
                let needle = term.to_lowercase();
                listing
                    .keys
                    .into_iter()
                    .filter(|k| k.name.to_lowercase().contains(&needle))
                    .collect()
            }
            None => listing.keys,
        };

        let rows = join_all(keys.into_iter().map(|key| async move {
            let value = match self.kv.get(&key.name).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(
                        binding = %self.name,
                        key = %key.name,
                        error = %e,
                        "Failed to get value for key"
                    );
                    Some(VALUE_LOAD_ERROR.to_string())
                }
            };
            KvRow {
                key: key.name,
                value,
                expiration: key.expiration,
                metadata: key.metadata,
            }
        }))
        .await;

        Ok(rows)
    }

    /// Validates and writes an entry, then returns the fresh full listing.
    /// Validation failures carry the submitted form back unchanged.
    pub async fn save(&self, form: &KvEntryForm) -> Result<Vec<KvRow>, BrowseError> {
        let entry = validate(form)?;
        let options = KvPutOptions {
            expiration_ttl: entry.expiration_ttl,
            metadata: entry.metadata_json(),
        };
        self.kv.put(&entry.key, &entry.value, options).await?;
        tracing::info!(binding = %self.name, key = %entry.key, "kv entry saved");
        self.list(None).await
    }

    /// Deletes `key` and returns the re-listed rows. A failed delete is logged and the
    /// listing is returned anyway.
    pub async fn delete(&self, key: &str) -> Result<Vec<KvRow>, BrowseError> {
        match self.kv.delete(key).await {
            Ok(()) => tracing::info!(binding = %self.name, key, "kv entry deleted"),
            Err(e) => tracing::warn!(binding = %self.name, key, error = %e, "Delete failed"),
        }
        self.list(None).await
    }

    /// Loads an existing entry into an edit form. Reads do not report TTLs, so the
    /// TTL field is left empty.
    pub async fn edit_form(&self, key: &str) -> Result<KvEntryForm, BrowseError> {
        let (value, metadata) = self.kv.get_with_metadata(key).await?;
        let value = value.ok_or_else(|| BrowseError::NotFound(format!("key '{key}'")))?;
        let metadata = metadata
            .map(|m| serde_json::to_string_pretty(&m))
            .transpose()
            .map_err(CollaboratorError::from)?
            .unwrap_or_default();
        Ok(KvEntryForm {
            key: Some(key.to_string()),
            value: Some(value),
            expiration_ttl: None,
            metadata: Some(metadata),
        })
    }
}
