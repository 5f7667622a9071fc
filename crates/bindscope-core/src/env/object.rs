//! Host objects: values whose capabilities are discovered by probing their members.

use super::value::EnvValue;
use crate::capability::{Database, KvNamespace, ObjectBucket};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Shape of a single member as seen by a probe.
#[derive(Debug, Clone)]
pub enum Member {
    /// Callable member. Probing never invokes it.
    Method,
    /// Plain data property.
    Value(EnvValue),
}

impl Member {
    /// True for methods and for properties holding a bare function value.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Method | Self::Value(EnvValue::Function))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Method => true,
            Self::Value(v) => v.is_truthy(),
        }
    }
}

/// An object living in the host environment.
///
/// `member` is the only surface the classifier looks at. The `as_*` accessors hand out the
/// collaborator behind the object; they are consulted only after classification has
/// settled on the matching kind.
pub trait HostObject: Send + Sync {
    /// Looks up a member by its runtime name (e.g. `"getWithMetadata"`) without calling it.
    fn member(&self, name: &str) -> Option<Member>;

    /// Short type name for debugging output.
    fn type_name(&self) -> &str {
        "Object"
    }

    /// Plain-data rendering; callable members are omitted.
    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    fn as_kv_namespace(&self) -> Option<&dyn KvNamespace> {
        None
    }

    fn as_object_bucket(&self) -> Option<&dyn ObjectBucket> {
        None
    }

    fn as_database(&self) -> Option<&dyn Database> {
        None
    }
}

/// Probe answer for objects that expose a fixed method table.
pub fn method_member(methods: &[&str], name: &str) -> Option<Member> {
    methods.iter().any(|m| *m == name).then_some(Member::Method)
}

/// Cheaply clonable handle to a [`HostObject`].
#[derive(Clone)]
pub struct EnvObject {
    inner: Arc<dyn HostObject>,
}

impl EnvObject {
    pub fn new(object: impl HostObject + 'static) -> Self {
        Self {
            inner: Arc::new(object),
        }
    }

    pub fn from_arc(inner: Arc<dyn HostObject>) -> Self {
        Self { inner }
    }

    pub fn member(&self, name: &str) -> Option<Member> {
        self.inner.member(name)
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.inner.to_json()
    }

    pub fn as_kv_namespace(&self) -> Option<&dyn KvNamespace> {
        self.inner.as_kv_namespace()
    }

    pub fn as_object_bucket(&self) -> Option<&dyn ObjectBucket> {
        self.inner.as_object_bucket()
    }

    pub fn as_database(&self) -> Option<&dyn Database> {
        self.inner.as_database()
    }
}

impl fmt::Debug for EnvObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.inner.type_name())
    }
}

/// Object assembled from named members. Used for plain configuration objects and for
/// shapes that have no collaborator behind them.
#[derive(Debug, Clone, Default)]
pub struct ShapeObject {
    members: IndexMap<String, Member>,
}

impl ShapeObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), Member::Method);
        self
    }

    pub fn with_methods(self, names: &[&str]) -> Self {
        names.iter().fold(self, |shape, name| shape.with_method(*name))
    }

    pub fn with_value(mut self, name: impl Into<String>, value: EnvValue) -> Self {
        self.members.insert(name.into(), Member::Value(value));
        self
    }
}

impl HostObject for ShapeObject {
    fn member(&self, name: &str) -> Option<Member> {
        self.members.get(name).cloned()
    }

    fn to_json(&self) -> serde_json::Value {
        let map = self
            .members
            .iter()
            .filter_map(|(name, member)| match member {
                Member::Method => None,
                Member::Value(EnvValue::Undefined | EnvValue::Function) => None,
                Member::Value(v) => Some((name.clone(), v.to_json())),
            })
            .collect();
        serde_json::Value::Object(map)
    }
}
