//! Object browser: folder-style navigation over a flat bucket key space.
//!
//! The current prefix is the only navigation state. Parent and breadcrumb prefixes are
//! derived from it on every call so a prefix taken from a URL query round-trips.

use crate::capability::{BucketListOptions, ObjectBody, ObjectBucket, ObjectMeta};
use crate::classifier::CapabilityKind;
use crate::env::Env;
use crate::error::{BrowseError, CollaboratorError};
use crate::selector::lookup;
use serde::Serialize;

pub const DELIMITER: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderEntry {
    /// Full prefix, always ending in `/`.
    pub prefix: String,
    /// Last segment, for display.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    /// Key relative to the current prefix.
    pub name: String,
    #[serde(flatten)]
    pub meta: ObjectMeta,
}

/// One level of a bucket, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketListing {
    pub prefix: String,
    /// Prefix one level up; `None` at the root.
    pub parent: Option<String>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub folders: Vec<FolderEntry>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectPreview {
    pub key: String,
    /// Suggested download name: the last key segment.
    pub file_name: String,
    /// Absent when the object does not exist or could not be read; callers fall back to
    /// the listing.
    pub meta: Option<ObjectMeta>,
    pub is_image: bool,
}

/// Ancestor prefixes of `prefix`, outermost first, root not included.
/// `"a/b/"` → `a/`, `a/b/`.
pub fn breadcrumbs(prefix: &str) -> Vec<Breadcrumb> {
    let mut current = String::new();
    prefix
        .split(DELIMITER)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            current.push_str(segment);
            current.push_str(DELIMITER);
            Breadcrumb {
                name: segment.to_string(),
                prefix: current.clone(),
            }
        })
        .collect()
}

/// Prefix one level above `prefix`: `"a/b/"` → `"a/"`, `"a/"` → `""`. `None` at the root.
pub fn parent_prefix(prefix: &str) -> Option<String> {
    let segments: Vec<&str> = prefix
        .split(DELIMITER)
        .filter(|segment| !segment.is_empty())
        .collect();
    let (_, ancestors) = segments.split_last()?;
    Some(
        ancestors
            .iter()
            .map(|segment| format!("{segment}{DELIMITER}"))
            .collect(),
    )
}

fn last_segment(path: &str) -> &str {
    path.split(DELIMITER)
        .filter(|segment| !segment.is_empty())
        .last()
        .unwrap_or(path)
}

pub struct ObjectBrowser<'a> {
    name: String,
    bucket: &'a dyn ObjectBucket,
}

impl<'a> ObjectBrowser<'a> {
    pub fn open(env: &'a Env, name: &str) -> Result<Self, BrowseError> {
        let binding = lookup(env, CapabilityKind::ObjectBucket, name)?;
        let bucket = binding.object_bucket().ok_or_else(|| {
            CollaboratorError::Bucket(format!("binding '{name}' exposes no bucket interface"))
        })?;
        Ok(Self::new(name, bucket))
    }

    pub fn new(name: impl Into<String>, bucket: &'a dyn ObjectBucket) -> Self {
        Self {
            name: name.into(),
            bucket,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lists one level below `prefix` (root when absent or empty).
    pub async fn list(&self, prefix: Option<&str>) -> Result<BucketListing, BrowseError> {
        let prefix = prefix.unwrap_or_default();
        let listing = self
            .bucket
            .list(BucketListOptions {
                prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
                delimiter: Some(DELIMITER.to_string()),
            })
            .await?;

        let folders = listing
            .delimited_prefixes
            .into_iter()
            .map(|p| FolderEntry {
                name: last_segment(&p).to_string(),
                prefix: p,
            })
            .collect();
        let files = listing
            .objects
            .into_iter()
            .map(|meta| FileEntry {
                name: meta.key.strip_prefix(prefix).unwrap_or(&meta.key).to_string(),
                meta,
            })
            .collect();

        Ok(BucketListing {
            prefix: prefix.to_string(),
            parent: parent_prefix(prefix),
            breadcrumbs: breadcrumbs(prefix),
            folders,
            files,
        })
    }

    /// Metadata only, no body. Lookup failures degrade to an empty preview.
    pub async fn preview(&self, key: &str) -> ObjectPreview {
        let meta = match self.bucket.head(key).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(bucket = %self.name, key, error = %e, "Error reading object metadata");
                None
            }
        };
        let is_image = meta
            .as_ref()
            .and_then(|m| m.content_type.as_deref())
            .is_some_and(|ct| ct.starts_with("image/"));
        ObjectPreview {
            key: key.to_string(),
            file_name: last_segment(key).to_string(),
            meta,
            is_image,
        }
    }

    /// Full object for pass-through delivery. Absent keys are `NotFound`; collaborator
    /// failures stay distinct.
    pub async fn raw(&self, key: &str) -> Result<ObjectBody, BrowseError> {
        self.bucket
            .get(key)
            .await?
            .ok_or_else(|| BrowseError::NotFound(format!("object '{key}'")))
    }
}
