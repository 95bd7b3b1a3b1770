// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::Ledger;
use crate::realtime::RealtimeBridge;
use crate::session::SessionGate;
use crate::store::SqliteStore;
use crate::utils::{fmt_money, get_currency, maybe_print_json, pretty_table};
use anyhow::Result;

pub fn handle(store: &SqliteStore, gate: &SessionGate, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(store, gate, sub)?,
        Some(("audit", sub)) => audit(store, gate, sub)?,
        Some(("reconcile", _)) => reconcile(store, gate)?,
        _ => {}
    }
    Ok(())
}

fn show(store: &SqliteStore, gate: &SessionGate, sub: &clap::ArgMatches) -> Result<()> {
    let mut bridge = RealtimeBridge::attach(store, gate)?;
    let balance = bridge.balance(gate)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &balance)? {
        let ccy = get_currency(store.conn())?;
        println!("Balance: {}", fmt_money(&balance.amount, &ccy));
    }
    Ok(())
}

fn audit(store: &SqliteStore, gate: &SessionGate, sub: &clap::ArgMatches) -> Result<()> {
    let audit = Ledger::new(store).audit(gate)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &audit)? {
        return Ok(());
    }
    let ccy = get_currency(store.conn())?;
    let rows = vec![
        vec!["stored_balance".into(), fmt_money(&audit.stored, &ccy)],
        vec!["ledger_sum".into(), fmt_money(&audit.computed, &ccy)],
        vec!["transactions".into(), audit.transactions.to_string()],
        vec!["drift".into(), fmt_money(&audit.drift(), &ccy)],
    ];
    println!("{}", pretty_table(&["Check", "Value"], rows));
    if audit.is_consistent() {
        println!("✅ balance matches the ledger");
    } else {
        println!("Run `billfold balance reconcile` to reset the balance to the ledger sum");
    }
    Ok(())
}

fn reconcile(store: &SqliteStore, gate: &SessionGate) -> Result<()> {
    let balance = Ledger::new(store).reconcile(gate)?;
    let ccy = get_currency(store.conn())?;
    println!("Balance reconciled: {}", fmt_money(&balance.amount, &ccy));
    Ok(())
}
