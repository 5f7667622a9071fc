//! Resource selector: which bindings of a kind exist, and which one is active.
//!
//! Nothing is cached. Every call re-classifies the mapping it is given, because the
//! environment may be rebuilt between requests.

use crate::classifier::{classify, CapabilityKind, ClassifiedBinding};
use crate::env::Env;
use crate::error::BrowseError;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionContext {
    pub kind: CapabilityKind,
    /// Names of bindings of `kind`, in mapping order.
    pub available: Vec<String>,
    /// Always one of `available`, or `None` when there is nothing to select.
    pub active: Option<String>,
}

impl SelectionContext {
    /// No binding of this kind exists at all (as opposed to an empty binding).
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

/// Resolves the active binding of `kind`: the requested name if it is a binding of that
/// kind, otherwise the first one in mapping order, otherwise none.
pub fn select(env: &Env, kind: CapabilityKind, requested: Option<&str>) -> SelectionContext {
    let available: Vec<String> = env
        .iter()
        .filter(|(_, value)| classify(value).kind == kind)
        .map(|(name, _)| name.to_string())
        .collect();

    let active = requested
        .and_then(|name| available.iter().find(|candidate| *candidate == name))
        .or_else(|| available.first())
        .cloned();

    tracing::debug!(
        kind = %kind,
        available = available.len(),
        active = active.as_deref().unwrap_or("-"),
        "resolved selection"
    );

    SelectionContext {
        kind,
        available,
        active,
    }
}

/// Strict lookup by name: the binding must exist and classify as `kind`.
pub fn lookup<'a>(
    env: &'a Env,
    kind: CapabilityKind,
    name: &str,
) -> Result<ClassifiedBinding<'a>, BrowseError> {
    env.get(name)
        .map(classify)
        .filter(|classified| classified.kind == kind)
        .ok_or_else(|| BrowseError::binding_not_found(kind, name))
}
