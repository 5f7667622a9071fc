//! Environment overview: every binding with its kind, and per-kind counts.

use crate::classifier::{classify, CapabilityKind};
use crate::env::Env;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingDescriptor {
    pub name: String,
    pub kind: CapabilityKind,
    pub is_resource: bool,
    /// Plain values only. Resource handles are never rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvSummary {
    pub kv_namespaces: usize,
    pub buckets: usize,
    pub databases: usize,
    pub other: usize,
    pub total: usize,
}

pub fn describe(env: &Env) -> Vec<BindingDescriptor> {
    env.iter()
        .map(|(name, value)| {
            let kind = classify(value).kind;
            BindingDescriptor {
                name: name.to_string(),
                kind,
                is_resource: kind.is_resource(),
                value: (!kind.is_resource()).then(|| value.to_json()),
            }
        })
        .collect()
}

pub fn summarize(env: &Env) -> EnvSummary {
    env.iter().fold(EnvSummary::default(), |mut summary, (_, value)| {
        match classify(value).kind {
            CapabilityKind::KvNamespace => summary.kv_namespaces += 1,
            CapabilityKind::ObjectBucket => summary.buckets += 1,
            CapabilityKind::Database => summary.databases += 1,
            _ => summary.other += 1,
        }
        summary.total += 1;
        summary
    })
}
