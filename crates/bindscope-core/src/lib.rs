//! bindscope-core: classify a serverless runtime's bindings and browse the storage behind
//! them (KV namespaces, object buckets, relational databases).
//!
//! The browsers only speak to storage through the traits in [`capability`]; the [`host`]
//! module supplies sled and SQLite implementations for local development.

pub mod capability;
pub mod host;

mod bucket;
mod classifier;
mod config;
mod env;
mod error;
mod kv;
mod overview;
mod query;
mod selector;
mod validate;

// Runtime environment model
pub use env::{method_member, Env, EnvObject, EnvValue, HostObject, Member, ShapeObject};

// Classification and selection
pub use classifier::{classify, CapabilityKind, ClassifiedBinding};
pub use selector::{lookup, select, SelectionContext};

// Browsers
pub use bucket::{
    breadcrumbs, parent_prefix, Breadcrumb, BucketListing, FileEntry, FolderEntry, ObjectBrowser,
    ObjectPreview, DELIMITER,
};
pub use kv::{KvBrowser, KvRow, VALUE_LOAD_ERROR};
pub use query::{QueryMeta, QueryPage, QueryResult, QueryRunner, TABLE_CATALOG_QUERY};
pub use validate::{validate, FieldIssue, KvEntry, KvEntryForm, ValidationFailure};

// Overview
pub use overview::{describe, summarize, BindingDescriptor, EnvSummary};

// Config and errors
pub use config::{ConnectionBinding, DashboardConfig, ResourceBinding, VarBinding};
pub use error::{BrowseError, CollaboratorError, HostError, Outcome};
