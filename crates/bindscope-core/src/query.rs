//! Query runner: forwards a statement to a relational binding and shapes the rows into a
//! column/row table.
//!
//! Statements are sent verbatim. There is no parsing, no statement-type detection, and no
//! guard against destructive text.

use crate::capability::{Database, Row};
use crate::classifier::CapabilityKind;
use crate::env::Env;
use crate::error::{BrowseError, CollaboratorError};
use crate::selector::lookup;
use serde::Serialize;
use std::time::Instant;

/// Lists user tables, skipping the engine's own bookkeeping tables.
pub const TABLE_CATALOG_QUERY: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMeta {
    /// Wall-clock execution time in milliseconds.
    pub duration: f64,
    pub changes: u64,
    pub last_row_id: i64,
    pub rows_read: u64,
}

/// Tabular result of one statement. On failure `columns` and `rows` are empty and
/// `error` carries the collaborator's message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<QueryMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    fn failed(message: String) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            meta: None,
            error: Some(message),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything a database view needs: the table catalog, plus the result of the submitted
/// statement when there was one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPage {
    pub database: String,
    pub tables: Vec<String>,
    pub last_query: Option<String>,
    pub result: Option<QueryResult>,
}

/// Columns come from the first row's field names. A zero-row result therefore has no
/// columns, even for a `SELECT` whose schema is known.
fn tabulate(results: &[Row]) -> (Vec<String>, Vec<Vec<serde_json::Value>>) {
    let columns: Vec<String> = results
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();
    let rows = results
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| row.get(column).map(cell).unwrap_or(serde_json::Value::Null))
                .collect()
        })
        .collect();
    (columns, rows)
}

/// Composite values are flattened to their JSON text; scalars pass through.
fn cell(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            serde_json::Value::String(value.to_string())
        }
        scalar => scalar.clone(),
    }
}

pub struct QueryRunner<'a> {
    name: String,
    db: &'a dyn Database,
}

impl<'a> QueryRunner<'a> {
    pub fn open(env: &'a Env, name: &str) -> Result<Self, BrowseError> {
        let binding = lookup(env, CapabilityKind::Database, name)?;
        let db = binding.database().ok_or_else(|| {
            CollaboratorError::Database(format!("binding '{name}' exposes no database interface"))
        })?;
        Ok(Self::new(name, db))
    }

    pub fn new(name: impl Into<String>, db: &'a dyn Database) -> Self {
        Self {
            name: name.into(),
            db,
        }
    }

    /// Names of all user tables. Catalog failures degrade to an empty list.
    pub async fn tables(&self) -> Vec<String> {
        match self.db.all(TABLE_CATALOG_QUERY).await {
            Ok(output) => output
                .results
                .iter()
                .filter_map(|row| row.get("name").and_then(|v| v.as_str()).map(str::to_string))
                .collect(),
            Err(e) => {
                tracing::warn!(database = %self.name, error = %e, "Error listing tables");
                Vec::new()
            }
        }
    }

    /// Executes `statement` and shapes its rows. Failures are captured in the result.
    pub async fn run(&self, statement: &str) -> QueryResult {
        let start = Instant::now();
        match self.db.all(statement).await {
            Ok(output) => {
                let duration = start.elapsed().as_secs_f64() * 1000.0;
                let (columns, rows) = tabulate(&output.results);
                tracing::debug!(database = %self.name, rows = rows.len(), duration, "statement executed");
                QueryResult {
                    columns,
                    rows,
                    meta: Some(QueryMeta {
                        duration,
                        changes: output.meta.changes,
                        last_row_id: output.meta.last_row_id,
                        rows_read: output.meta.rows_read,
                    }),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(database = %self.name, error = %e, "statement failed");
                QueryResult::failed(e.to_string())
            }
        }
    }

    /// Catalog plus, when `statement` is non-empty, its result.
    pub async fn page(&self, statement: Option<&str>) -> QueryPage {
        let tables = self.tables().await;
        let statement = statement.filter(|s| !s.is_empty());
        let result = match statement {
            Some(text) => Some(self.run(text).await),
            None => None,
        };
        QueryPage {
            database: self.name.clone(),
            tables,
            last_query: statement.map(str::to_string),
            result,
        }
    }
}
