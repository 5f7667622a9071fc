//! SQLite-backed relational binding. The connection is synchronous, so every statement
//! runs on the blocking pool.

use crate::capability::{
    CollabResult, Database, Row, StatementMeta, StatementOutput, DATABASE_METHODS,
};
use crate::env::{method_member, HostObject, Member};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    pub fn open_path<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned().into(),
        ValueRef::Blob(blob) => blob.iter().map(|b| serde_json::Value::from(*b)).collect(),
    }
}

fn execute(conn: &Mutex<Connection>, statement: &str) -> CollabResult<StatementOutput> {
    let conn = conn
        .lock()
        .map_err(|_| CollaboratorError::Database("connection lock poisoned".to_string()))?;
    let mut stmt = conn.prepare(statement)?;
    // The connection's change counter is stale after a statement that writes nothing.
    let readonly = stmt.readonly();
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut results = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut record = Row::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            record.insert(column.clone(), to_json(row.get_ref(idx)?));
        }
        results.push(record);
    }
    drop(rows);

    let meta = StatementMeta {
        changes: if readonly { 0 } else { conn.changes() as u64 },
        last_row_id: conn.last_insert_rowid(),
        rows_read: results.len() as u64,
    };
    Ok(StatementOutput { results, meta })
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn all(&self, statement: &str) -> CollabResult<StatementOutput> {
        let conn = Arc::clone(&self.conn);
        let statement = statement.to_string();
        tokio::task::spawn_blocking(move || execute(&conn, &statement)).await?
    }
}

impl HostObject for SqliteDatabase {
    fn member(&self, name: &str) -> Option<Member> {
        method_member(DATABASE_METHODS, name)
    }

    fn type_name(&self) -> &str {
        "D1Database"
    }

    fn as_database(&self) -> Option<&dyn Database> {
        Some(self)
    }
}
