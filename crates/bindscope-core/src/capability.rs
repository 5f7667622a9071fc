//! Contracts of the external storage collaborators.
//!
//! The dashboard never implements storage semantics itself; it drives whatever sits
//! behind a binding through these traits. Method names on the runtime side are listed in
//! the `*_METHODS` tables so host objects can answer probes consistently.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Runtime method names exposed by a key-value namespace.
pub const KV_METHODS: &[&str] = &["get", "getWithMetadata", "put", "delete", "list"];

/// Runtime method names exposed by an object bucket.
pub const BUCKET_METHODS: &[&str] = &[
    "head",
    "get",
    "put",
    "delete",
    "list",
    "createMultipartUpload",
    "resumeMultipartUpload",
];

/// Runtime method names exposed by a relational database.
pub const DATABASE_METHODS: &[&str] = &["prepare", "dump", "batch", "exec"];

pub type CollabResult<T> = Result<T, CollaboratorError>;

// ---------------------------------------------------------------------------
// Key-value
// ---------------------------------------------------------------------------

/// One key as reported by a KV listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvKey {
    pub name: String,
    /// Absolute expiry, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvListResult {
    pub keys: Vec<KvKey>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KvPutOptions {
    /// Relative time-to-live in seconds.
    pub expiration_ttl: Option<u64>,
    pub metadata: Option<serde_json::Value>,
}

#[async_trait]
pub trait KvNamespace: Send + Sync {
    async fn list(&self) -> CollabResult<KvListResult>;

    async fn get(&self, key: &str) -> CollabResult<Option<String>>;

    async fn get_with_metadata(
        &self,
        key: &str,
    ) -> CollabResult<(Option<String>, Option<serde_json::Value>)>;

    async fn put(&self, key: &str, value: &str, options: KvPutOptions) -> CollabResult<()>;

    async fn delete(&self, key: &str) -> CollabResult<()>;
}

// ---------------------------------------------------------------------------
// Object bucket
// ---------------------------------------------------------------------------

/// Metadata of a stored object, as returned by `head` and listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub etag: String,
    /// Quoted etag, ready for an HTTP `ETag` header.
    pub http_etag: String,
    pub uploaded: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Full object: metadata plus body.
#[derive(Debug, Clone)]
pub struct ObjectBody {
    pub meta: ObjectMeta,
    pub body: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketListOptions {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
}

/// One level of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectListing {
    pub objects: Vec<ObjectMeta>,
    pub delimited_prefixes: Vec<String>,
}

#[async_trait]
pub trait ObjectBucket: Send + Sync {
    async fn list(&self, options: BucketListOptions) -> CollabResult<ObjectListing>;

    async fn head(&self, key: &str) -> CollabResult<Option<ObjectMeta>>;

    async fn get(&self, key: &str) -> CollabResult<Option<ObjectBody>>;

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> CollabResult<ObjectMeta>;

    async fn delete(&self, key: &str) -> CollabResult<()>;
}

// ---------------------------------------------------------------------------
// Relational
// ---------------------------------------------------------------------------

/// A result row: field name → value, in the column order the engine produced.
pub type Row = IndexMap<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementMeta {
    pub changes: u64,
    pub last_row_id: i64,
    pub rows_read: u64,
}

/// Output of `prepare(text).all()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutput {
    pub results: Vec<Row>,
    pub meta: StatementMeta,
}

#[async_trait]
pub trait Database: Send + Sync {
    /// Prepares `statement` verbatim and fetches every resulting row.
    async fn all(&self, statement: &str) -> CollabResult<StatementOutput>;
}
