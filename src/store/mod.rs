// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Row-oriented storage contract.
//!
//! The ledger, balance and reminder code only ever talks to a [`Store`]:
//! filtered reads, single-row inserts, partial updates, deletes, and a
//! per-table change feed. Rows are plain JSON objects; conversion to and
//! from domain types lives in [`codec`].

pub mod codec;
pub mod sqlite;

use serde_json::Value;
use std::sync::mpsc::{Receiver, TryRecvError};

use crate::error::Result;

pub use sqlite::SqliteStore;

pub type Row = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Balance,
    Transactions,
    Reminders,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Balance => "BalanceTbl",
            Table::Transactions => "TransactionTbl",
            Table::Reminders => "reminders",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub eq: Vec<(String, Value)>,
    pub order: Vec<(String, bool)>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.eq.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Equality part only; ordering and limit do not apply to a single row.
    pub fn matches(&self, row: &Row) -> bool {
        self.eq
            .iter()
            .all(|(col, want)| row.get(col).map(|got| got == want).unwrap_or(false))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row: Row,
}

/// Receiving end of a change feed. Dropping it closes the feed; the store
/// prunes the sender the next time it publishes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    table: Table,
    rx: Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(id: u64, table: Table, rx: Receiver<ChangeEvent>) -> Self {
        Self { id, table, rx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Drain everything delivered so far without blocking. `None` means the
    /// publishing side has gone away.
    pub fn drain(&self) -> Option<Vec<ChangeEvent>> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(ev) => out.push(ev),
                Err(TryRecvError::Empty) => return Some(out),
                Err(TryRecvError::Disconnected) => {
                    return if out.is_empty() { None } else { Some(out) };
                }
            }
        }
    }
}

pub trait Store {
    fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>>;

    fn insert(&self, table: Table, row: Row) -> Result<Row>;

    /// Returns the rows as they read after the update; empty when nothing matched.
    fn update(&self, table: Table, patch: Row, filter: &Filter) -> Result<Vec<Row>>;

    fn delete(&self, table: Table, filter: &Filter) -> Result<usize>;

    fn subscribe(&self, table: Table, filter: Filter) -> Result<Subscription>;

    fn unsubscribe(&self, id: u64);
}

pub fn select_one<S: Store + ?Sized>(
    store: &S,
    table: Table,
    filter: &Filter,
) -> Result<Option<Row>> {
    let filter = filter.clone().limit(1);
    Ok(store.select(table, &filter)?.into_iter().next())
}
