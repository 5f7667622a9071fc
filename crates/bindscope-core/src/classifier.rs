//! Binding classifier: runtime value → capability kind, by probing member shapes.
//!
//! Several kinds share method names (`get`, `put`, `delete`, `list`, `fetch`), so the
//! probe order in [`PROBES`] decides the answer whenever a value satisfies more than one
//! shape. Reordering the table changes classification results for existing environments.

use crate::capability::{Database, KvNamespace, ObjectBucket};
use crate::env::{EnvObject, EnvValue, Member};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of binding kinds the dashboard recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    #[serde(rename = "KVNamespace")]
    KvNamespace,
    #[serde(rename = "R2Bucket")]
    ObjectBucket,
    #[serde(rename = "D1Database")]
    Database,
    DurableObjectNamespace,
    Queue,
    #[serde(rename = "AnalyticsEngineDataset")]
    MetricsDataset,
    Workflow,
    #[serde(rename = "Hyperdrive")]
    ConnectionConfig,
    #[serde(rename = "VectorizeIndex")]
    VectorIndex,
    #[serde(rename = "Ai")]
    AiInference,
    Fetcher,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "undefined")]
    Undefined,
    #[serde(rename = "array")]
    Array,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "regexp")]
    RegExp,
    #[serde(rename = "function")]
    Function,
    #[serde(rename = "object")]
    Object,
}

impl CapabilityKind {
    /// Label used in listings and URLs, matching the runtime's own type names.
    pub fn label(self) -> &'static str {
        match self {
            Self::KvNamespace => "KVNamespace",
            Self::ObjectBucket => "R2Bucket",
            Self::Database => "D1Database",
            Self::DurableObjectNamespace => "DurableObjectNamespace",
            Self::Queue => "Queue",
            Self::MetricsDataset => "AnalyticsEngineDataset",
            Self::Workflow => "Workflow",
            Self::ConnectionConfig => "Hyperdrive",
            Self::VectorIndex => "VectorizeIndex",
            Self::AiInference => "Ai",
            Self::Fetcher => "Fetcher",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Array => "array",
            Self::Date => "date",
            Self::RegExp => "regexp",
            Self::Function => "function",
            Self::Object => "object",
        }
    }

    /// True for runtime resource handles, false for plain configuration values.
    pub fn is_resource(self) -> bool {
        matches!(
            self,
            Self::KvNamespace
                | Self::ObjectBucket
                | Self::Database
                | Self::DurableObjectNamespace
                | Self::Queue
                | Self::MetricsDataset
                | Self::Workflow
                | Self::ConnectionConfig
                | Self::VectorIndex
                | Self::AiInference
                | Self::Fetcher
        )
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification result. Borrows the raw value it was computed from.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedBinding<'a> {
    pub kind: CapabilityKind,
    pub raw: &'a EnvValue,
}

impl<'a> ClassifiedBinding<'a> {
    fn object_if(&self, kind: CapabilityKind) -> Option<&'a EnvObject> {
        if self.kind == kind {
            self.raw.as_object()
        } else {
            None
        }
    }

    /// Collaborator handle, present only when the binding classified as a KV namespace.
    pub fn kv_namespace(&self) -> Option<&'a dyn KvNamespace> {
        self.object_if(CapabilityKind::KvNamespace)?.as_kv_namespace()
    }

    pub fn object_bucket(&self) -> Option<&'a dyn ObjectBucket> {
        self.object_if(CapabilityKind::ObjectBucket)?.as_object_bucket()
    }

    pub fn database(&self) -> Option<&'a dyn Database> {
        self.object_if(CapabilityKind::Database)?.as_database()
    }
}

/// Classifies `value`. Total and side-effect free: members are looked up, never called.
pub fn classify(value: &EnvValue) -> ClassifiedBinding<'_> {
    ClassifiedBinding {
        kind: kind_of(value),
        raw: value,
    }
}

fn kind_of(value: &EnvValue) -> CapabilityKind {
    let obj = match value {
        EnvValue::String(_) => return CapabilityKind::String,
        EnvValue::Number(_) => return CapabilityKind::Number,
        EnvValue::Boolean(_) => return CapabilityKind::Boolean,
        EnvValue::Function => return CapabilityKind::Function,
        EnvValue::Null => return CapabilityKind::Null,
        EnvValue::Undefined => return CapabilityKind::Undefined,
        EnvValue::Array(_) => return CapabilityKind::Array,
        EnvValue::Date(_) => return CapabilityKind::Date,
        EnvValue::RegExp(_) => return CapabilityKind::RegExp,
        EnvValue::Object(obj) => obj,
    };
    let probe = Probe(obj);
    PROBES
        .iter()
        .find(|(_, matches)| matches(&probe))
        .map(|(kind, _)| *kind)
        .unwrap_or(CapabilityKind::Object)
}

/// Member-shape questions asked of an object.
struct Probe<'a>(&'a EnvObject);

impl Probe<'_> {
    fn callable(&self, name: &str) -> bool {
        self.0.member(name).is_some_and(|m| m.is_callable())
    }

    fn callables(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.callable(name))
    }

    fn truthy(&self, name: &str) -> bool {
        self.0.member(name).is_some_and(|m| m.is_truthy())
    }

    fn string(&self, name: &str) -> bool {
        matches!(self.0.member(name), Some(Member::Value(EnvValue::String(_))))
    }
}

type ProbeFn = fn(&Probe<'_>) -> bool;

/// Duck-typed probes, most specific shape first. First match wins.
const PROBES: &[(CapabilityKind, ProbeFn)] = &[
    (CapabilityKind::Workflow, is_workflow),
    (CapabilityKind::ConnectionConfig, is_connection_config),
    (CapabilityKind::VectorIndex, is_vector_index),
    (CapabilityKind::AiInference, is_ai_inference),
    (CapabilityKind::Fetcher, is_fetcher),
    (CapabilityKind::ObjectBucket, is_object_bucket),
    (CapabilityKind::DurableObjectNamespace, is_durable_object_namespace),
    (CapabilityKind::Database, is_database),
    (CapabilityKind::KvNamespace, is_kv_namespace),
    (CapabilityKind::Queue, is_queue),
    (CapabilityKind::MetricsDataset, is_metrics_dataset),
];

fn is_workflow(p: &Probe<'_>) -> bool {
    p.callable("create")
}

fn is_connection_config(p: &Probe<'_>) -> bool {
    p.string("connectionString")
}

fn is_vector_index(p: &Probe<'_>) -> bool {
    p.callables(&["query", "insert", "upsert", "delete", "getByIds"])
}

// A `fetch` member, callable or not, rules out inference bindings.
fn is_ai_inference(p: &Probe<'_>) -> bool {
    p.callable("run") && !p.truthy("fetch")
}

// Service and browser bindings share this shape; they are not told apart.
fn is_fetcher(p: &Probe<'_>) -> bool {
    p.callable("fetch")
}

fn is_object_bucket(p: &Probe<'_>) -> bool {
    p.callables(&["head", "get", "put", "delete", "list"])
}

fn is_durable_object_namespace(p: &Probe<'_>) -> bool {
    p.callables(&["get", "alarm", "jurisdiction"])
}

fn is_database(p: &Probe<'_>) -> bool {
    p.callables(&["prepare", "dump", "batch"])
}

fn is_kv_namespace(p: &Probe<'_>) -> bool {
    p.callables(&["get", "put", "delete", "list"]) && !p.truthy("head")
}

fn is_queue(p: &Probe<'_>) -> bool {
    p.callables(&["send", "sendBatch"])
}

fn is_metrics_dataset(p: &Probe<'_>) -> bool {
    p.callable("writeDataPoint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{HostObject, ShapeObject};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn shape(methods: &[&str]) -> EnvValue {
        EnvValue::Object(EnvObject::new(ShapeObject::new().with_methods(methods)))
    }

    fn kind(value: &EnvValue) -> CapabilityKind {
        classify(value).kind
    }

    #[test]
    fn primitives_classify_before_any_probe() {
        assert_eq!(kind(&EnvValue::from("x")), CapabilityKind::String);
        assert_eq!(kind(&EnvValue::Number(1.5)), CapabilityKind::Number);
        assert_eq!(kind(&EnvValue::Boolean(false)), CapabilityKind::Boolean);
        assert_eq!(kind(&EnvValue::Null), CapabilityKind::Null);
        assert_eq!(kind(&EnvValue::Undefined), CapabilityKind::Undefined);
        assert_eq!(kind(&EnvValue::Array(vec![])), CapabilityKind::Array);
        assert_eq!(kind(&EnvValue::Date(chrono::Utc::now())), CapabilityKind::Date);
        assert_eq!(kind(&EnvValue::RegExp("^a$".into())), CapabilityKind::RegExp);
        assert_eq!(kind(&EnvValue::Function), CapabilityKind::Function);
    }

    #[test]
    fn kv_shape_becomes_bucket_when_head_is_added() {
        let kv = shape(&["get", "put", "delete", "list"]);
        assert_eq!(kind(&kv), CapabilityKind::KvNamespace);

        let bucket = shape(&["get", "put", "delete", "list", "head"]);
        assert_eq!(kind(&bucket), CapabilityKind::ObjectBucket);
    }

    #[test]
    fn truthy_head_property_still_excludes_kv() {
        let value = EnvValue::Object(EnvObject::new(
            ShapeObject::new()
                .with_methods(&["get", "put", "delete", "list"])
                .with_value("head", EnvValue::from("yes")),
        ));
        assert_eq!(kind(&value), CapabilityKind::Object);

        let falsy_head = EnvValue::Object(EnvObject::new(
            ShapeObject::new()
                .with_methods(&["get", "put", "delete", "list"])
                .with_value("head", EnvValue::Null),
        ));
        assert_eq!(kind(&falsy_head), CapabilityKind::KvNamespace);
    }

    #[test]
    fn database_shape_wins_over_later_probes() {
        let value = shape(&[
            "prepare",
            "dump",
            "batch",
            "exec",
            "get",
            "put",
            "delete",
            "list",
            "send",
            "sendBatch",
            "writeDataPoint",
        ]);
        assert_eq!(kind(&value), CapabilityKind::Database);
    }

    #[test]
    fn probe_order_resolves_shared_shapes() {
        // create beats everything
        assert_eq!(kind(&shape(&["create", "fetch", "get"])), CapabilityKind::Workflow);
        // run without fetch is inference, run with fetch is a fetcher
        assert_eq!(kind(&shape(&["run"])), CapabilityKind::AiInference);
        assert_eq!(kind(&shape(&["run", "fetch"])), CapabilityKind::Fetcher);
        // fetch shadows a bucket shape
        assert_eq!(
            kind(&shape(&["fetch", "head", "get", "put", "delete", "list"])),
            CapabilityKind::Fetcher
        );
        // vector index before inference
        assert_eq!(
            kind(&shape(&["query", "insert", "upsert", "delete", "getByIds", "run"])),
            CapabilityKind::VectorIndex
        );
        assert_eq!(
            kind(&shape(&["get", "alarm", "jurisdiction"])),
            CapabilityKind::DurableObjectNamespace
        );
        assert_eq!(kind(&shape(&["send", "sendBatch"])), CapabilityKind::Queue);
        assert_eq!(kind(&shape(&["writeDataPoint"])), CapabilityKind::MetricsDataset);
        assert_eq!(kind(&shape(&["send"])), CapabilityKind::Object);
    }

    #[test]
    fn connection_string_must_be_a_string() {
        let config = EnvValue::from(serde_json::json!({
            "connectionString": "postgres://user@localhost/app"
        }));
        assert_eq!(kind(&config), CapabilityKind::ConnectionConfig);

        let numeric = EnvValue::from(serde_json::json!({ "connectionString": 1 }));
        assert_eq!(kind(&numeric), CapabilityKind::Object);
    }

    #[test]
    fn function_valued_properties_count_as_callable() {
        let value = EnvValue::Object(EnvObject::new(
            ShapeObject::new().with_value("writeDataPoint", EnvValue::Function),
        ));
        assert_eq!(kind(&value), CapabilityKind::MetricsDataset);
    }

    #[test]
    fn classification_is_deterministic() {
        let value = shape(&["get", "put", "delete", "list", "head"]);
        let first = kind(&value);
        for _ in 0..10 {
            assert_eq!(kind(&value), first);
        }
    }

    struct CountingObject {
        probes: Arc<AtomicUsize>,
    }

    impl HostObject for CountingObject {
        fn member(&self, name: &str) -> Option<Member> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            (name == "writeDataPoint").then_some(Member::Method)
        }

        fn as_kv_namespace(&self) -> Option<&dyn KvNamespace> {
            panic!("classification must not reach for collaborators");
        }
    }

    #[test]
    fn probing_only_looks_up_members() {
        let probes = Arc::new(AtomicUsize::new(0));
        let value = EnvValue::Object(EnvObject::new(CountingObject {
            probes: Arc::clone(&probes),
        }));
        let classified = classify(&value);
        assert_eq!(classified.kind, CapabilityKind::MetricsDataset);
        assert!(probes.load(Ordering::SeqCst) > 0);
        // Accessors for other kinds short-circuit on the kind check.
        assert!(classified.kv_namespace().is_none());
    }

    #[test]
    fn kind_serializes_with_runtime_names() {
        assert_eq!(
            serde_json::to_value(CapabilityKind::KvNamespace).unwrap(),
            "KVNamespace"
        );
        assert_eq!(serde_json::to_value(CapabilityKind::RegExp).unwrap(), "regexp");
        assert!(CapabilityKind::ConnectionConfig.is_resource());
        assert!(!CapabilityKind::Object.is_resource());
    }
}
