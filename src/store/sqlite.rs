// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use log::{debug, warn};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard};

use super::{ChangeEvent, ChangeKind, Filter, Row, Store, Subscription, Table};
use crate::db;
use crate::error::{Error, Result};

struct Subscriber {
    id: u64,
    table: Table,
    filter: Filter,
    tx: Sender<ChangeEvent>,
}

/// [`Store`] over a local SQLite database. Every statement is a single
/// `... RETURNING *`, so each call is atomic on its own and the change feed
/// sees exactly the rows the statement touched.
pub struct SqliteStore {
    conn: Connection,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        db::init_schema(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        match self.subscribers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn query_rows(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        debug!("sql: {}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            let mut row = Row::new();
            for (i, name) in names.iter().enumerate() {
                row.insert(name.clone(), from_sql(r.get_ref(i)?)?);
            }
            out.push(row);
        }
        Ok(out)
    }

    fn publish(&self, table: Table, kind: ChangeKind, rows: &[Row]) {
        if rows.is_empty() {
            return;
        }
        let mut subs = self.subscribers();
        subs.retain(|sub| {
            if sub.table != table {
                return true;
            }
            for row in rows.iter().filter(|r| sub.filter.matches(r)) {
                let ev = ChangeEvent {
                    table,
                    kind,
                    row: row.clone(),
                };
                if sub.tx.send(ev).is_err() {
                    warn!(
                        "realtime subscriber {} on {} disconnected; dropping it",
                        sub.id,
                        table.name()
                    );
                    return false;
                }
            }
            true
        });
    }
}

impl Store for SqliteStore {
    fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>> {
        let mut params = Vec::new();
        let mut sql = format!("SELECT * FROM \"{}\"", table.name());
        sql.push_str(&where_clause(filter, &mut params)?);
        if !filter.order.is_empty() {
            let keys = filter
                .order
                .iter()
                .map(|(col, asc)| {
                    ident(col).map(|c| format!("{} {}", c, if *asc { "ASC" } else { "DESC" }))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }
        if let Some(n) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }
        self.query_rows(&sql, &params)
    }

    fn insert(&self, table: Table, row: Row) -> Result<Row> {
        if row.is_empty() {
            return Err(Error::invalid(format!("empty insert into {}", table.name())));
        }
        let mut cols = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (col, val) in &row {
            cols.push(ident(col)?);
            params.push(to_sql(val));
        }
        let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            table.name(),
            cols.join(", "),
            placeholders.join(", ")
        );
        let stored = self
            .query_rows(&sql, &params)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::persistence(format!("insert into {} returned no row", table.name()))
            })?;
        self.publish(table, ChangeKind::Insert, std::slice::from_ref(&stored));
        Ok(stored)
    }

    fn update(&self, table: Table, patch: Row, filter: &Filter) -> Result<Vec<Row>> {
        if patch.is_empty() {
            return Err(Error::invalid(format!("empty update on {}", table.name())));
        }
        if filter.eq.is_empty() {
            return Err(Error::invalid(format!(
                "refusing to update {} without a filter",
                table.name()
            )));
        }
        let mut params = Vec::new();
        let mut sets = Vec::with_capacity(patch.len());
        for (col, val) in &patch {
            params.push(to_sql(val));
            sets.push(format!("{} = ?{}", ident(col)?, params.len()));
        }
        let sql = format!(
            "UPDATE \"{}\" SET {}{} RETURNING *",
            table.name(),
            sets.join(", "),
            where_clause(filter, &mut params)?
        );
        let rows = self.query_rows(&sql, &params)?;
        self.publish(table, ChangeKind::Update, &rows);
        Ok(rows)
    }

    fn delete(&self, table: Table, filter: &Filter) -> Result<usize> {
        if filter.eq.is_empty() {
            return Err(Error::invalid(format!(
                "refusing to delete from {} without a filter",
                table.name()
            )));
        }
        let mut params = Vec::new();
        let sql = format!(
            "DELETE FROM \"{}\"{} RETURNING *",
            table.name(),
            where_clause(filter, &mut params)?
        );
        let rows = self.query_rows(&sql, &params)?;
        self.publish(table, ChangeKind::Delete, &rows);
        Ok(rows.len())
    }

    fn subscribe(&self, table: Table, filter: Filter) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("subscriber {} listening on {}", id, table.name());
        self.subscribers().push(Subscriber {
            id,
            table,
            filter,
            tx,
        });
        Ok(Subscription::new(id, table, rx))
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers().retain(|s| s.id != id);
    }
}

fn ident(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(Error::invalid(format!("bad column name '{}'", name)))
    }
}

fn where_clause(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    if filter.eq.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(filter.eq.len());
    for (col, val) in &filter.eq {
        let col = ident(col)?;
        if val.is_null() {
            parts.push(format!("{} IS NULL", col));
        } else {
            params.push(to_sql(val));
            parts.push(format!("{} = ?{}", col, params.len()));
        }
    }
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

fn to_sql(v: &Value) -> SqlValue {
    match v {
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

fn from_sql(v: ValueRef<'_>) -> Result<Value> {
    Ok(match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(
            std::str::from_utf8(t)
                .map_err(|e| Error::persistence(format!("non-UTF-8 text column: {}", e)))?
                .to_string(),
        ),
        ValueRef::Blob(_) => return Err(Error::persistence("blob columns are not supported")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn identifiers_are_validated() {
        assert!(ident("user_id").is_ok());
        assert!(ident("amount; DROP TABLE x").is_err());
        assert!(ident("1col").is_err());
    }

    #[test]
    fn update_without_filter_is_refused() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .update(Table::Balance, row(json!({"amount": "1"})), &Filter::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn feed_only_sees_matching_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sub = store
            .subscribe(Table::Balance, Filter::new().eq("user_id", "u1"))
            .unwrap();
        for uid in ["u1", "u2"] {
            store
                .insert(
                    Table::Balance,
                    row(json!({"user_id": uid, "amount": "0", "version": 0})),
                )
                .unwrap();
        }
        let events = sub.drain().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Insert);
        assert_eq!(events[0].row["user_id"], json!("u1"));
    }

    #[test]
    fn dropped_subscription_is_pruned_on_publish() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sub = store.subscribe(Table::Balance, Filter::new()).unwrap();
        assert_eq!(store.subscriber_count(), 1);
        drop(sub);
        store
            .insert(
                Table::Balance,
                row(json!({"user_id": "u1", "amount": "0", "version": 0})),
            )
            .unwrap();
        assert_eq!(store.subscriber_count(), 0);
    }
}
