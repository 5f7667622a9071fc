//! Sled-backed object bucket. Metadata and bodies live in separate trees so listings never
//! touch object bytes.

use crate::capability::{
    BucketListOptions, CollabResult, ObjectBody, ObjectBucket, ObjectListing, ObjectMeta,
    BUCKET_METHODS,
};
use crate::env::{method_member, HostObject, Member};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sled::{Db, Tree};
use std::path::Path;

const META_TREE: &str = "meta";
const BODY_TREE: &str = "body";

pub struct SledBucket {
    _db: Db,
    meta: Tree,
    body: Tree,
}

impl SledBucket {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        Self::from_db(sled::open(path)?)
    }

    pub fn temporary() -> Result<Self, sled::Error> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, sled::Error> {
        let meta = db.open_tree(META_TREE)?;
        let body = db.open_tree(BODY_TREE)?;
        Ok(Self { _db: db, meta, body })
    }

    fn read_meta(&self, key: &str) -> CollabResult<Option<ObjectMeta>> {
        match self.meta.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Content hash used as the object's etag: first 16 bytes of SHA-256, hex encoded.
fn etag_for(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    hex::encode(&digest[..16])
}

#[async_trait]
impl ObjectBucket for SledBucket {
    async fn list(&self, options: BucketListOptions) -> CollabResult<ObjectListing> {
        let prefix = options.prefix.unwrap_or_default();
        let delimiter = options.delimiter.filter(|d| !d.is_empty());
        let mut listing = ObjectListing::default();

        for item in self.meta.scan_prefix(prefix.as_bytes()) {
            let (key, bytes) = item?;
            let key = String::from_utf8_lossy(&key).into_owned();
            let rest = key.strip_prefix(prefix.as_str()).unwrap_or(&key);

            if let Some(delimiter) = delimiter.as_deref() {
                if let Some(idx) = rest.find(delimiter) {
                    let common = format!("{prefix}{}", &rest[..idx + delimiter.len()]);
                    // Keys sharing a common prefix are contiguous in sled order.
                    if listing.delimited_prefixes.last() != Some(&common) {
                        listing.delimited_prefixes.push(common);
                    }
                    continue;
                }
            }
            listing.objects.push(serde_json::from_slice(&bytes)?);
        }
        Ok(listing)
    }

    async fn head(&self, key: &str) -> CollabResult<Option<ObjectMeta>> {
        self.read_meta(key)
    }

    async fn get(&self, key: &str) -> CollabResult<Option<ObjectBody>> {
        let Some(meta) = self.read_meta(key)? else {
            return Ok(None);
        };
        let body = self
            .body
            .get(key.as_bytes())?
            .map(|ivec| Bytes::copy_from_slice(&ivec))
            .unwrap_or_default();
        Ok(Some(ObjectBody { meta, body }))
    }

    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> CollabResult<ObjectMeta> {
        let etag = etag_for(&body);
        let meta = ObjectMeta {
            key: key.to_string(),
            size: body.len() as u64,
            http_etag: format!("\"{etag}\""),
            etag,
            uploaded: Utc::now(),
            content_type,
        };
        // Body first: an object exists once its metadata does.
        self.body.insert(key.as_bytes(), body.as_ref())?;
        self.meta.insert(key.as_bytes(), serde_json::to_vec(&meta)?)?;
        self.meta.flush_async().await?;
        Ok(meta)
    }

    async fn delete(&self, key: &str) -> CollabResult<()> {
        self.meta.remove(key.as_bytes())?;
        self.body.remove(key.as_bytes())?;
        Ok(())
    }
}

impl HostObject for SledBucket {
    fn member(&self, name: &str) -> Option<Member> {
        method_member(BUCKET_METHODS, name)
    }

    fn type_name(&self) -> &str {
        "R2Bucket"
    }

    fn as_object_bucket(&self) -> Option<&dyn ObjectBucket> {
        Some(self)
    }
}
