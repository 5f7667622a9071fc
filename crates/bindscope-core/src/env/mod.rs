//! The host environment mapping: binding name → runtime value.

mod object;
mod value;

pub use object::{method_member, EnvObject, HostObject, Member, ShapeObject};
pub use value::EnvValue;

use indexmap::IndexMap;

/// Ordered environment mapping. Iteration follows insertion order, which is the order
/// selection falls back on.
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: IndexMap<String, EnvValue>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` under `name`. Rebinding an existing name replaces the value in place.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<EnvValue>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<EnvValue>) -> Self {
        self.bind(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvValue)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>, V: Into<EnvValue>> FromIterator<(K, V)> for Env {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Env::new();
        for (k, v) in iter {
            env.bind(k, v);
        }
        env
    }
}
