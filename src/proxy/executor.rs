//! Per-query MySQL execution.
//!
//! # Responsibilities
//! - Open one fresh connection per query (no pooling)
//! - Serialize result rows to column-keyed JSON mappings
//! - Release the connection on every exit path
//!
//! # Design Decisions
//! - The `QueryExecutor` trait is the seam between routing policy and the
//!   wire driver, so replication and fallback semantics are testable
//!   without a cluster
//! - Write statements run through `execute` (no row set); reads through
//!   `fetch_all`

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Executor as _, Row};
use std::time::Duration;

use crate::error::GatewayError;

/// Executes a single statement against one cluster member.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `query` on `host:port`. Returns the serialized row set for
    /// reads, `None` for writes.
    async fn execute(
        &self,
        host: &str,
        port: u16,
        query: &str,
        is_write: bool,
    ) -> Result<Option<Value>, GatewayError>;
}

/// Production executor speaking the MySQL wire protocol.
pub struct MySqlExecutor {
    user: String,
    password: String,
    database: String,
    connect_timeout: Duration,
}

impl MySqlExecutor {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            database: database.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    async fn execute(
        &self,
        host: &str,
        port: u16,
        query: &str,
        is_write: bool,
    ) -> Result<Option<Value>, GatewayError> {
        tracing::debug!(host, port, "Opening MySQL connection");
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database);

        let mut conn = match tokio::time::timeout(self.connect_timeout, options.connect()).await {
            Err(_) => {
                tracing::error!(host, port, "Connection attempt timed out");
                return Err(GatewayError::Connect(host.to_string()));
            }
            Ok(Err(err)) => {
                tracing::error!(host, port, error = %err, "Connection failed");
                return Err(classify(err, host));
            }
            Ok(Ok(conn)) => conn,
        };

        let outcome = if is_write {
            conn.execute(query).await.map(|done| {
                tracing::info!(host, rows = done.rows_affected(), "Write executed");
                None
            })
        } else {
            sqlx::query(query).fetch_all(&mut conn).await.map(|rows| {
                tracing::info!(host, rows = rows.len(), "Read executed");
                Some(Value::Array(rows.iter().map(row_to_json).collect()))
            })
        };

        // Close regardless of outcome so no connection leaks.
        let _ = conn.close().await;

        outcome.map_err(|err| classify(err, host))
    }
}

fn classify(err: sqlx::Error, host: &str) -> GatewayError {
    match err {
        sqlx::Error::Database(db) => GatewayError::Database(db.message().to_string()),
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
            GatewayError::Connect(host.to_string())
        }
        _ => GatewayError::Internal,
    }
}

/// Convert a row into a `{column: value}` JSON object. Unsupported column
/// types degrade to null rather than failing the whole row set.
fn row_to_json(row: &MySqlRow) -> Value {
    let mut object = serde_json::Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), column_value(row, idx));
    }
    Value::Object(object)
}

fn column_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(|t| Value::from(t.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v.map(|t| Value::from(t.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v.map(|t| Value::from(t.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|b| Value::from(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(Value::Null);
    }
    tracing::debug!(column = idx, "Unsupported column type, emitting null");
    Value::Null
}
