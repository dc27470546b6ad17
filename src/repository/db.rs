//! SQLite Store
//!
//! Local stand-in for the hosted backend: every collection is a set of JSON
//! documents in one SQLite table, filtered through `json_extract`. Used for
//! the offline mode and for tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::query::{Filter, Query};
use super::traits::RemoteStore;
use crate::domain::{DomainError, DomainResult, TableName};

/// SQLite implementation of the backend
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn db_err(e: rusqlite::Error) -> DomainError {
    DomainError::Remote(e.to_string())
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> DomainResult<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// Fresh in-memory database
    pub fn in_memory() -> DomainResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> DomainResult<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of stored rows in a collection
    pub async fn count(&self, table: TableName) -> DomainResult<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE table_name = ?1",
                params![table.as_str()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as usize)
    }
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            table_name TEXT NOT NULL,
            id TEXT NOT NULL UNIQUE,
            body TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_records_table ON records(table_name);",
    )
    .map_err(db_err)
}

fn now_stamp() -> String {
    format_stamp(Utc::now())
}

/// Fixed-width timestamps so text ordering matches time ordering
fn format_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn normalize_stamps(table: TableName, body: &mut Map<String, Value>) {
    for column in table.timestamp_columns().iter().chain(["updated_at"].iter()) {
        if let Some(Value::String(raw)) = body.get(*column) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                let stamp = format_stamp(parsed.with_timezone(&Utc));
                body.insert(column.to_string(), Value::String(stamp));
            }
        }
    }
}

fn into_object(row: Value) -> DomainResult<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(DomainError::InvalidInput(format!("expected a JSON object row, got {}", other))),
    }
}

fn check_column(column: &str) -> DomainResult<&str> {
    if !column.is_empty() && column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(column)
    } else {
        Err(DomainError::InvalidInput(format!("invalid column name: {}", column)))
    }
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// WHERE clause (without the keyword) and its parameters
fn where_clause(table: TableName, query: &Query) -> DomainResult<(String, Vec<SqlValue>)> {
    let mut clause = String::from("table_name = ?");
    let mut values = vec![SqlValue::Text(table.as_str().to_string())];

    for filter in &query.filters {
        let column = check_column(filter.column())?;
        match filter {
            Filter::Eq(_, Value::Null) => {
                clause.push_str(&format!(" AND json_extract(body, '$.{}') IS NULL", column));
            }
            Filter::Eq(_, value) => {
                clause.push_str(&format!(" AND json_extract(body, '$.{}') = ?", column));
                values.push(sql_value(value));
            }
            Filter::In(_, options) if options.is_empty() => {
                clause.push_str(" AND 0");
            }
            Filter::In(_, options) => {
                let marks = vec!["?"; options.len()].join(", ");
                clause.push_str(&format!(" AND json_extract(body, '$.{}') IN ({})", column, marks));
                values.extend(options.iter().map(sql_value));
            }
        }
    }
    Ok((clause, values))
}

fn order_clause(query: &Query) -> DomainResult<String> {
    let mut parts = Vec::new();
    for order in &query.order {
        let column = check_column(&order.column)?;
        let direction = if order.ascending { "ASC" } else { "DESC" };
        parts.push(format!("json_extract(body, '$.{}') {}", column, direction));
    }
    // Ties resolve by insertion order, following the first key's direction
    let tiebreak = match query.order.first() {
        Some(order) if !order.ascending => "seq DESC",
        _ => "seq ASC",
    };
    parts.push(tiebreak.to_string());
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

/// Matching rows as (seq, body)
fn select_rows(conn: &Connection, table: TableName, query: &Query) -> DomainResult<Vec<(i64, String)>> {
    let (clause, values) = where_clause(table, query)?;
    let mut sql = format!("SELECT seq, body FROM records WHERE {}", clause);
    sql.push_str(&order_clause(query)?);
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(db_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

fn parse_body(body: &str) -> DomainResult<Value> {
    serde_json::from_str(body).map_err(DomainError::from)
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn insert(&self, table: TableName, rows: Vec<Value>) -> DomainResult<Vec<Value>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(db_err)?;
        let mut stored = Vec::with_capacity(rows.len());

        for row in rows {
            let mut body = into_object(row)?;
            let id = match body.get("id") {
                Some(Value::String(id)) => id.clone(),
                _ => Uuid::new_v4().to_string(),
            };
            body.insert("id".to_string(), Value::String(id.clone()));

            for column in table.timestamp_columns() {
                if body.get(*column).map_or(true, Value::is_null) {
                    body.insert(column.to_string(), Value::String(now_stamp()));
                }
            }
            normalize_stamps(table, &mut body);

            let body = Value::Object(body);
            tx.execute(
                "INSERT INTO records (table_name, id, body) VALUES (?1, ?2, ?3)",
                params![table.as_str(), id, body.to_string()],
            )
            .map_err(db_err)?;
            stored.push(body);
        }

        tx.commit().map_err(db_err)?;
        Ok(stored)
    }

    async fn select(&self, table: TableName, query: &Query) -> DomainResult<Vec<Value>> {
        let conn = self.conn.lock().await;
        select_rows(&conn, table, query)?
            .iter()
            .map(|(_, body)| parse_body(body))
            .collect()
    }

    async fn update(&self, table: TableName, query: &Query, patch: Value) -> DomainResult<Vec<Value>> {
        let patch = into_object(patch)?;
        let mut conn = self.conn.lock().await;
        let matched = select_rows(&conn, table, query)?;

        let tx = conn.transaction().map_err(db_err)?;
        let mut updated = Vec::with_capacity(matched.len());
        for (seq, body) in matched {
            let mut body = into_object(parse_body(&body)?)?;
            for (key, value) in &patch {
                if key != "id" {
                    body.insert(key.clone(), value.clone());
                }
            }
            if table.tracks_updates() {
                body.insert("updated_at".to_string(), Value::String(now_stamp()));
            }
            normalize_stamps(table, &mut body);

            let body = Value::Object(body);
            tx.execute(
                "UPDATE records SET body = ?1 WHERE seq = ?2",
                params![body.to_string(), seq],
            )
            .map_err(db_err)?;
            updated.push(body);
        }
        tx.commit().map_err(db_err)?;

        Ok(updated)
    }

    async fn delete(&self, table: TableName, query: &Query) -> DomainResult<()> {
        let mut conn = self.conn.lock().await;
        let matched = select_rows(&conn, table, query)?;
        if matched.is_empty() {
            return Ok(());
        }

        let tx = conn.transaction().map_err(db_err)?;
        let mut removed_ids = Vec::with_capacity(matched.len());
        for (seq, body) in &matched {
            if let Some(Value::String(id)) = parse_body(body)?.get("id") {
                removed_ids.push(Value::String(id.clone()));
            }
            tx.execute("DELETE FROM records WHERE seq = ?1", params![seq])
                .map_err(db_err)?;
        }

        // Receipt items belong to their receipt (ON DELETE CASCADE on the hosted schema)
        if table == TableName::Receipts && !removed_ids.is_empty() {
            let cascade = Query {
                filters: vec![Filter::In("receipt_id".to_string(), removed_ids)],
                ..Query::default()
            };
            let (clause, values) = where_clause(TableName::ReceiptItems, &cascade)?;
            tx.execute(
                &format!("DELETE FROM records WHERE {}", clause),
                params_from_iter(values.iter()),
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = SqliteStore::in_memory().unwrap();
        let rows = store
            .insert(TableName::PriceHistory, vec![json!({"item_name": "Arroz", "unit_price": 25.9})])
            .await
            .unwrap();

        assert!(rows[0]["id"].as_str().is_some());
        assert!(rows[0]["recorded_at"].as_str().is_some());
        assert_eq!(store.count(TableName::PriceHistory).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filters_and_order() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert(
                TableName::Categories,
                vec![
                    json!({"list_id": "a", "name": "Bebidas", "sort_order": 1, "is_custom": false}),
                    json!({"list_id": "a", "name": "Mercearia", "sort_order": 0, "is_custom": false}),
                    json!({"list_id": "b", "name": "Extra", "sort_order": 0, "is_custom": true}),
                ],
            )
            .await
            .unwrap();

        let rows = store
            .select(TableName::Categories, &Query::new().eq("list_id", "a").order_asc("sort_order"))
            .await
            .unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["Mercearia", "Bebidas"]);

        let custom = store
            .select(TableName::Categories, &Query::new().eq("is_custom", true))
            .await
            .unwrap();
        assert_eq!(custom.len(), 1);

        let either = store
            .select(TableName::Categories, &Query::new().is_in("list_id", ["a", "b"]).limit(2))
            .await
            .unwrap();
        assert_eq!(either.len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = SqliteStore::in_memory().unwrap();
        let rows = store
            .insert(TableName::ShoppingItems, vec![json!({"name": "Sal", "quantity": 1, "market": "X"})])
            .await
            .unwrap();
        let id = rows[0]["id"].as_str().unwrap().to_string();

        let updated = store
            .update(TableName::ShoppingItems, &Query::new().eq("id", &id), json!({"quantity": 4, "market": null}))
            .await
            .unwrap();

        assert_eq!(updated[0]["quantity"], json!(4));
        assert_eq!(updated[0]["market"], Value::Null);
        assert_eq!(updated[0]["name"], json!("Sal"));
    }

    #[tokio::test]
    async fn test_deleting_receipt_removes_its_items() {
        let store = SqliteStore::in_memory().unwrap();
        let receipt = store
            .insert(TableName::Receipts, vec![json!({"title": "Compra", "total_amount": 10.0})])
            .await
            .unwrap();
        let receipt_id = receipt[0]["id"].as_str().unwrap().to_string();
        store
            .insert(
                TableName::ReceiptItems,
                vec![json!({"receipt_id": receipt_id, "name": "Uva", "quantity": 1.0, "unit_price": 10.0, "total_price": 10.0})],
            )
            .await
            .unwrap();

        store
            .delete(TableName::Receipts, &Query::new().eq("id", &receipt_id))
            .await
            .unwrap();

        assert_eq!(store.count(TableName::Receipts).await.unwrap(), 0);
        assert_eq!(store.count(TableName::ReceiptItems).await.unwrap(), 0);
    }
}
