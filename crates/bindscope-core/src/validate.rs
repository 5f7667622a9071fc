//! Validation of KV entry mutations submitted from a form.

use serde::{Deserialize, Serialize};

/// Raw form fields exactly as submitted. Every field is text or missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvEntryForm {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "expirationTtl")]
    pub expiration_ttl: Option<String>,
    #[serde(default)]
    pub metadata: Option<String>,
}

/// A validated KV entry, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub expiration_ttl: Option<u64>,
    /// Metadata as JSON text; guaranteed to parse.
    pub metadata: Option<String>,
}

impl KvEntry {
    /// Parsed metadata. Validation already proved the text is well-formed.
    pub fn metadata_json(&self) -> Option<serde_json::Value> {
        self.metadata
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in one submission, plus the submission itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// All issue messages joined with ", ".
    pub message: String,
    pub issues: Vec<FieldIssue>,
    /// The unvalidated input, so the caller can re-render what was attempted.
    pub input: KvEntryForm,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// Validates a KV entry form. Checks every field before reporting.
pub fn validate(form: &KvEntryForm) -> Result<KvEntry, ValidationFailure> {
    let mut issues = Vec::new();

    let key = form.key.as_deref().filter(|s| !s.is_empty());
    if key.is_none() {
        issues.push(FieldIssue {
            field: "key",
            message: "Key is required".to_string(),
        });
    }

    let value = form.value.as_deref().filter(|s| !s.is_empty());
    if value.is_none() {
        issues.push(FieldIssue {
            field: "value",
            message: "Value is required".to_string(),
        });
    }

    let expiration_ttl = match present(&form.expiration_ttl) {
        None => None,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(ttl) if ttl > 0 => Some(ttl),
            _ => {
                issues.push(FieldIssue {
                    field: "expirationTtl",
                    message: "Expiration TTL must be a positive whole number of seconds"
                        .to_string(),
                });
                None
            }
        },
    };

    // Only the empty string means "no metadata"; blank text must still parse.
    let metadata = form.metadata.as_deref().filter(|s| !s.is_empty());
    if let Some(text) = metadata {
        if serde_json::from_str::<serde_json::Value>(text).is_err() {
            issues.push(FieldIssue {
                field: "metadata",
                message: "Metadata must be valid JSON".to_string(),
            });
        }
    }

    match (key, value) {
        (Some(key), Some(value)) if issues.is_empty() => Ok(KvEntry {
            key: key.to_string(),
            value: value.to_string(),
            expiration_ttl,
            metadata: metadata.map(str::to_string),
        }),
        _ => Err(ValidationFailure {
            message: issues
                .iter()
                .map(|issue| issue.message.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            issues,
            input: form.clone(),
        }),
    }
}
