//! Thin MySQL access layer.
//!
//! Rows come back as column → JSON maps so controllers can hand them
//! straight to [`Response::json_value`](crate::Response::json_value)
//! without declaring a struct per query. Parameters are positional `?`
//! placeholders bound from `serde_json::Value`s.
//!
//! ```rust,no_run
//! use drape::config::DbConfig;
//! use drape::db::Db;
//! use serde_json::json;
//!
//! # async fn run() -> drape::Result<()> {
//! let db = Db::connect(&DbConfig::default()).await?;
//! let users = db.table("users");
//!
//! let added = db.execute(
//!     &format!("INSERT INTO {users} (name, age) VALUES (?, ?)"),
//!     &[json!("alice"), json!(30)],
//! ).await?;
//!
//! let rows = db.query(&format!("SELECT * FROM {users} WHERE id = ?"), &[json!(added.last_insert_id)]).await?;
//! assert_eq!(rows[0]["name"], "alice");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, Row as _, TypeInfo};
use tracing::debug;

use crate::config::DbConfig;
use crate::error::{Error, Result};

/// One result row: column name → value.
pub type Row = serde_json::Map<String, Value>;

/// Outcome of a data-modifying statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// `AUTO_INCREMENT` id generated by an `INSERT`, `0` otherwise.
    pub last_insert_id: u64,
}

/// A pooled MySQL handle. Cloning is cheap and shares the pool.
#[derive(Clone, Debug)]
pub struct Db {
    pool: MySqlPool,
    table_prefix: Arc<str>,
}

impl Db {
    /// Connects eagerly, failing fast when the server is unreachable.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = connect_options(config)?;
        let pool = pool_options(config).connect_with(options).await?;
        debug!(host = %config.host, db = %config.dbname, "connected to mysql");
        Ok(Self::from_pool(pool, &config.table_prefix))
    }

    /// Builds the pool without opening a connection; the first query connects.
    pub fn connect_lazy(config: &DbConfig) -> Result<Self> {
        let options = connect_options(config)?;
        let pool = pool_options(config).connect_lazy_with(options);
        Ok(Self::from_pool(pool, &config.table_prefix))
    }

    pub fn from_pool(pool: MySqlPool, table_prefix: &str) -> Self {
        Self { pool, table_prefix: table_prefix.into() }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Table name with the configured prefix applied.
    pub fn table(&self, name: &str) -> String {
        format!("{}{name}", self.table_prefix)
    }

    /// Runs a `SELECT`-like statement and returns every row.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        fetch_rows(&self.pool, sql, params).await
    }

    /// Runs an `INSERT`/`UPDATE`/`DELETE`/DDL statement.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        execute(&self.pool, sql, params).await
    }

    /// Starts a transaction. Dropping it without [`Transaction::commit`] rolls back.
    pub async fn begin(&self) -> Result<Transaction> {
        Ok(Transaction { tx: self.pool.begin().await? })
    }
}

/// An open transaction.
pub struct Transaction {
    tx: sqlx::Transaction<'static, MySql>,
}

impl Transaction {
    pub async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        fetch_rows(&mut *self.tx, sql, params).await
    }

    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        execute(&mut *self.tx, sql, params).await
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn connect_options(config: &DbConfig) -> Result<MySqlConnectOptions> {
    if config.driver != "mysql" {
        return Err(Error::UnsupportedDriver(config.driver.clone()));
    }
    Ok(MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.dbname)
        .charset(&config.charset))
}

fn pool_options(config: &DbConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new().max_connections(config.max_connections)
}

async fn fetch_rows<'c, E>(executor: E, sql: &str, params: &[Value]) -> Result<Vec<Row>>
where
    E: Executor<'c, Database = MySql>,
{
    debug!(target: "drape::sql", sql, ?params, "query");
    let rows = bind_all(sqlx::query(sql), params).fetch_all(executor).await?;
    rows.iter().map(row_to_map).collect()
}

async fn execute<'c, E>(executor: E, sql: &str, params: &[Value]) -> Result<ExecResult>
where
    E: Executor<'c, Database = MySql>,
{
    debug!(target: "drape::sql", sql, ?params, "execute");
    let done = bind_all(sqlx::query(sql), params).execute(executor).await?;
    Ok(ExecResult {
        rows_affected: done.rows_affected(),
        last_insert_id: done.last_insert_id(),
    })
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    query.bind(i)
                } else if let Some(u) = n.as_u64() {
                    query.bind(u)
                } else {
                    query.bind(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => query.bind(s.as_str()),
            // Nested structures are stored as JSON text.
            other => query.bind(other.to_string()),
        };
    }
    query
}

fn row_to_map(row: &MySqlRow) -> Result<Row> {
    let mut map = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        map.insert(column.name().to_owned(), value);
    }
    Ok(map)
}

/// How a MySQL column type is read into JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decode {
    Bool,
    Int,
    Uint,
    Float,
    DateTime,
    Timestamp,
    Date,
    Time,
    Json,
    Bytes,
    Text,
}

fn decode_as(type_name: &str) -> Decode {
    match type_name {
        "BOOLEAN" => Decode::Bool,
        // sqlx only reads YEAR and BIT as unsigned integers.
        "YEAR" | "BIT" => Decode::Uint,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Decode::Int,
        t if t.ends_with("UNSIGNED") => Decode::Uint,
        "FLOAT" | "DOUBLE" => Decode::Float,
        "DATETIME" => Decode::DateTime,
        "TIMESTAMP" => Decode::Timestamp,
        "DATE" => Decode::Date,
        "TIME" => Decode::Time,
        "JSON" => Decode::Json,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => Decode::Bytes,
        // VARCHAR, CHAR, TEXT, DECIMAL, ENUM, SET: all arrive as text.
        _ => Decode::Text,
    }
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    let value = match decode_as(type_name) {
        Decode::Bool => row.try_get::<Option<bool>, _>(idx)?.map(Value::from),
        Decode::Int => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
        Decode::Uint => row.try_get::<Option<u64>, _>(idx)?.map(Value::from),
        Decode::Float => row.try_get::<Option<f64>, _>(idx)?.map(Value::from),
        Decode::DateTime => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|v| Value::from(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        Decode::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|v| Value::from(v.to_rfc3339())),
        Decode::Date => row.try_get::<Option<NaiveDate>, _>(idx)?.map(|v| Value::from(v.to_string())),
        Decode::Time => row.try_get::<Option<NaiveTime>, _>(idx)?.map(|v| Value::from(v.to_string())),
        Decode::Json => row.try_get::<Option<sqlx::types::JsonValue>, _>(idx)?,
        Decode::Bytes => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map(|v| Value::from(String::from_utf8_lossy(&v).into_owned())),
        Decode::Text => row.try_get_unchecked::<Option<String>, _>(idx)?.map(Value::from),
    };
    Ok(value.unwrap_or(Value::Null))
}
