// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::{parse_amount, Ledger, ListQuery};
use crate::models::{Transaction, TransactionDraft, TransactionEdit, TxType};
use crate::realtime::RealtimeBridge;
use crate::session::SessionGate;
use crate::store::SqliteStore;
use crate::utils::{
    fmt_money, get_currency, maybe_print_json, parse_date, parse_id, pretty_table,
};
use anyhow::{Context, Result};
use serde::Serialize;

pub fn handle(store: &SqliteStore, gate: &SessionGate, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(store, gate, sub)?,
        Some(("edit", sub)) => edit(store, gate, sub)?,
        Some(("rm", sub)) => remove(store, gate, sub)?,
        Some(("show", sub)) => show(store, gate, sub)?,
        Some(("list", sub)) => list(store, gate, sub)?,
        _ => {}
    }
    Ok(())
}

fn text(sub: &clap::ArgMatches, key: &str) -> Option<String> {
    sub.get_one::<String>(key).map(|s| s.trim().to_string())
}

pub fn draft_from_args(sub: &clap::ArgMatches) -> Result<TransactionDraft> {
    let amount = parse_amount(&text(sub, "amount").unwrap_or_default())?;
    let tx_type = text(sub, "type").unwrap_or_default().parse::<TxType>()?;
    let date = parse_date(&text(sub, "date").unwrap_or_default())?;
    Ok(TransactionDraft {
        title: text(sub, "title").unwrap_or_default(),
        amount,
        category: text(sub, "category").unwrap_or_default(),
        tx_type,
        account: text(sub, "account").unwrap_or_default(),
        date,
        description: text(sub, "description").unwrap_or_default(),
    })
}

/// Start from the stored record and overlay whatever was passed on the command line.
pub fn edit_from_args(current: &Transaction, sub: &clap::ArgMatches) -> Result<TransactionEdit> {
    let mut edit = TransactionEdit::from(current);
    if let Some(v) = text(sub, "title") {
        edit.title = v;
    }
    if let Some(v) = text(sub, "amount") {
        edit.amount = v;
    }
    if let Some(v) = text(sub, "type") {
        edit.tx_type = v;
    }
    if let Some(v) = text(sub, "category") {
        edit.category = v;
    }
    if let Some(v) = text(sub, "account") {
        edit.account = v;
    }
    if let Some(v) = text(sub, "date") {
        edit.date = parse_date(&v)?;
    }
    if let Some(v) = text(sub, "description") {
        edit.description = v;
    }
    Ok(edit)
}

fn id_of(sub: &clap::ArgMatches) -> Result<i64> {
    parse_id(sub.get_one::<String>("id").context("--id is required")?)
}

fn print_balance(
    bridge: &mut RealtimeBridge<'_, SqliteStore>,
    store: &SqliteStore,
    gate: &SessionGate,
) -> Result<()> {
    let ccy = get_currency(store.conn())?;
    let balance = bridge.balance(gate)?;
    println!("Balance: {}", fmt_money(&balance.amount, &ccy));
    Ok(())
}

fn add(store: &SqliteStore, gate: &SessionGate, sub: &clap::ArgMatches) -> Result<()> {
    let draft = draft_from_args(sub)?;
    let mut bridge = RealtimeBridge::attach(store, gate)?;
    let posted = Ledger::new(store).append(gate, &draft)?;
    let tx = &posted.transaction;
    println!(
        "Recorded {} {} '{}' on {} (#{}, {})",
        tx.tx_type, tx.amount, tx.title, tx.date, tx.id, tx.account
    );
    print_balance(&mut bridge, store, gate)
}

fn edit(store: &SqliteStore, gate: &SessionGate, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_of(sub)?;
    let ledger = Ledger::new(store);
    let current = ledger.get(gate, id)?;
    let edit = edit_from_args(&current, sub)?;
    let mut bridge = RealtimeBridge::attach(store, gate)?;
    let posted = ledger.edit(gate, id, &edit)?;
    println!(
        "Updated #{}: {} {} -> {} {}",
        id,
        current.tx_type,
        current.amount,
        posted.transaction.tx_type,
        posted.transaction.amount
    );
    print_balance(&mut bridge, store, gate)
}

fn remove(store: &SqliteStore, gate: &SessionGate, sub: &clap::ArgMatches) -> Result<()> {
    let id = id_of(sub)?;
    let mut bridge = RealtimeBridge::attach(store, gate)?;
    Ledger::new(store).delete(gate, id)?;
    println!("Removed transaction #{}", id);
    print_balance(&mut bridge, store, gate)
}

fn show(store: &SqliteStore, gate: &SessionGate, sub: &clap::ArgMatches) -> Result<()> {
    let tx = Ledger::new(store).get(gate, id_of(sub)?)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &tx)? {
        let rows = vec![TransactionRow::from(&tx).cells()];
        println!("{}", pretty_table(&HEADERS, rows));
    }
    Ok(())
}

const HEADERS: [&str; 8] = [
    "ID", "Date", "Title", "Type", "Amount", "Category", "Account", "Description",
];

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub title: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub amount: String,
    pub category: String,
    pub account: String,
    pub description: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        TransactionRow {
            id: tx.id,
            date: tx.date.to_string(),
            title: tx.title.clone(),
            tx_type: tx.tx_type.to_string(),
            amount: tx.amount.to_string(),
            category: tx.category.clone(),
            account: tx.account.clone(),
            description: tx.description.clone(),
        }
    }
}

impl TransactionRow {
    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.date.clone(),
            self.title.clone(),
            self.tx_type.clone(),
            self.amount.clone(),
            self.category.clone(),
            self.account.clone(),
            self.description.clone(),
        ]
    }
}

pub fn query_rows(
    store: &SqliteStore,
    gate: &SessionGate,
    sub: &clap::ArgMatches,
) -> Result<Vec<TransactionRow>> {
    let query = ListQuery {
        search: sub.get_one::<String>("search").cloned(),
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let txs = Ledger::new(store).list(gate, &query)?;
    Ok(txs.iter().map(TransactionRow::from).collect())
}

fn list(store: &SqliteStore, gate: &SessionGate, sub: &clap::ArgMatches) -> Result<()> {
    let data = query_rows(store, gate, sub)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data.iter().map(TransactionRow::cells).collect();
        println!("{}", pretty_table(&HEADERS, rows));
    }
    Ok(())
}
