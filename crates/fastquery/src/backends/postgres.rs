//! PostgreSQL Backend Implementation
//!
//! Renders a `QuerySpec` to parameterised SQL and adapts `sqlx` rows into
//! `ResultRow`s so nothing above this module sees a `PgRow`.
//!
//! Values that JSON can only carry as strings (uuids, timestamps, numerics,
//! byte strings) come back out of `ResultRow`s as linking keys. They are bound
//! with the type of the column they are compared against, which is looked up
//! once per table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dashmap::DashMap;
use serde_json::{Map, Number, Value as JsonValue};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::types::Decimal;
use sqlx::{Column, Postgres, Row, TypeInfo};
use uuid::Uuid;

use super::Backend;
use crate::query::QuerySpec;
use crate::row::ResultRow;

const COLUMN_TYPES_SQL: &str = "SELECT column_name::text, udt_name::text \
     FROM information_schema.columns \
     WHERE table_name = $1 AND table_schema = ANY(current_schemas(false))";

/// Text form of naive timestamps in rows; parsed back by `NaiveDateTime::from_str`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Backend executing fetches against a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    /// Table name -> column name -> upper-case type name
    column_types: Arc<DashMap<String, HashMap<String, String>>>,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            column_types: Arc::new(DashMap::new()),
        }
    }

    /// Connect a new pool to `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("PostgreSQL backend connected with {} max connections", max_connections);
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Column types of `table`, loaded on first use
    async fn column_types(&self, table: &str) -> anyhow::Result<HashMap<String, String>> {
        if let Some(types) = self.column_types.get(table) {
            return Ok(types.clone());
        }

        let rows = sqlx::query(COLUMN_TYPES_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        let mut types = HashMap::with_capacity(rows.len());
        for row in &rows {
            let column: String = row.try_get(0)?;
            let type_name: String = row.try_get(1)?;
            types.insert(column, type_name.to_ascii_uppercase());
        }

        tracing::debug!("Loaded {} column types for '{}'", types.len(), table);
        self.column_types.insert(table.to_string(), types.clone());
        Ok(types)
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn fetch(&self, query: &QuerySpec) -> anyhow::Result<Vec<ResultRow>> {
        let (sql, bindings) = query.to_sql_with_bindings();
        tracing::trace!("Executing: {} ({} params)", sql, bindings.len());

        // only string values need the column type to be bound correctly
        let column_types = if bindings.iter().any(|(_, value)| value.is_string()) {
            self.column_types(query.entity()).await?
        } else {
            HashMap::new()
        };

        let params = bindings
            .iter()
            .map(|(column, value)| {
                PgParam::from_json(value, column_types.get(column).map(String::as_str))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut db_query = sqlx::query(&sql);
        for param in params {
            db_query = param.bind(db_query);
        }

        let rows = db_query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_result).collect())
    }
}

/// A query parameter carrying the PostgreSQL type it is bound with
#[derive(Debug, Clone, PartialEq)]
enum PgParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Numeric(Decimal),
    Bytes(Vec<u8>),
    Json(JsonValue),
}

impl PgParam {
    /// Convert a JSON value compared against a column of `column_type`
    fn from_json(value: &JsonValue, column_type: Option<&str>) -> anyhow::Result<Self> {
        Ok(match value {
            JsonValue::Null => PgParam::Null,
            JsonValue::Bool(b) => PgParam::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => PgParam::Int(i),
                None => PgParam::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Self::from_text(s, column_type)?,
            other => PgParam::Json(other.clone()),
        })
    }

    fn from_text(text: &str, column_type: Option<&str>) -> anyhow::Result<Self> {
        let param = match column_type {
            Some("UUID") => PgParam::Uuid(Uuid::parse_str(text)?),
            Some("TIMESTAMP") => PgParam::Timestamp(text.parse()?),
            Some("TIMESTAMPTZ") => {
                PgParam::TimestampTz(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
            }
            Some("DATE") => PgParam::Date(text.parse()?),
            Some("TIME") => PgParam::Time(text.parse()?),
            Some("NUMERIC") => PgParam::Numeric(text.parse()?),
            Some("BYTEA") => PgParam::Bytes(hex::decode(text.trim_start_matches("\\x"))?),
            _ => PgParam::Text(text.to_string()),
        };
        Ok(param)
    }

    fn bind<'q>(self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            PgParam::Null => query.bind(Option::<String>::None),
            PgParam::Bool(b) => query.bind(b),
            PgParam::Int(i) => query.bind(i),
            PgParam::Float(f) => query.bind(f),
            PgParam::Text(s) => query.bind(s),
            PgParam::Uuid(u) => query.bind(u),
            PgParam::Timestamp(ts) => query.bind(ts),
            PgParam::TimestampTz(ts) => query.bind(ts),
            PgParam::Date(d) => query.bind(d),
            PgParam::Time(t) => query.bind(t),
            PgParam::Numeric(n) => query.bind(n),
            PgParam::Bytes(b) => query.bind(b),
            PgParam::Json(j) => query.bind(sqlx::types::Json(j)),
        }
    }
}

/// Convert a PostgreSQL row into a `ResultRow`, keeping column order
pub(crate) fn row_to_result(row: &PgRow) -> ResultRow {
    let mut fields = Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let type_name = column.type_info().name();
        let value = match column_to_json(row, i, type_name) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "Could not read column '{}' of type {}, reading as null: {}",
                    column.name(),
                    type_name,
                    e
                );
                JsonValue::Null
            }
        };
        fields.insert(column.name().to_string(), value);
    }

    ResultRow::from(fields)
}

/// Decode column `i` according to its PostgreSQL type name
fn column_to_json(row: &PgRow, i: usize, type_name: &str) -> Result<JsonValue, sqlx::Error> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(i)?.map(JsonValue::Bool),
        "INT2" => row.try_get::<Option<i16>, _>(i)?.map(JsonValue::from),
        "INT4" => row.try_get::<Option<i32>, _>(i)?.map(JsonValue::from),
        "INT8" => row.try_get::<Option<i64>, _>(i)?.map(JsonValue::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)?
            .and_then(|f| Number::from_f64(f64::from(f)))
            .map(JsonValue::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(i)?
            .and_then(Number::from_f64)
            .map(JsonValue::Number),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(i)?
            .map(|n| JsonValue::String(n.to_string())),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(i)?
            .map(|u| JsonValue::String(u.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(i)?
            .map(|ts| JsonValue::String(ts.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(i)?
            .map(|ts| JsonValue::String(ts.format(TIMESTAMP_FORMAT).to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(i)?
            .map(|d| JsonValue::String(d.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(i)?
            .map(|t| JsonValue::String(t.to_string())),
        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(i)?
            .map(|b| JsonValue::String(format!("\\x{}", hex::encode(b)))),
        "JSON" | "JSONB" => row.try_get::<Option<JsonValue>, _>(i)?,
        // text-like types, enums and anything else PostgreSQL can hand over as text
        _ => row.try_get_unchecked::<Option<String>, _>(i)?.map(JsonValue::String),
    };

    Ok(value.unwrap_or(JsonValue::Null))
}
