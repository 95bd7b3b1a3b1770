// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::ledger::Ledger;
use billfold::models::{Session, TransactionDraft, TxType, User};
use billfold::realtime::RealtimeBridge;
use billfold::session::SessionGate;
use billfold::store::{codec, Filter, SqliteStore, Store, Table};
use billfold::Error;
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn gate_for(uid: &str) -> SessionGate {
    SessionGate::authenticated(Session {
        access_token: "t".into(),
        user: User {
            id: uid.into(),
            email: format!("{}@example.com", uid),
            first_name: String::new(),
            last_name: String::new(),
        },
    })
}

fn setup() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    for uid in ["u1", "u2"] {
        store
            .insert(Table::Balance, codec::balance_row(uid, Decimal::ZERO))
            .unwrap();
    }
    store
}

fn bump(store: &SqliteStore, uid: &str, amount: i64, version: i64) {
    store
        .update(
            Table::Balance,
            codec::balance_patch(Decimal::from(amount), version),
            &Filter::new().eq("user_id", uid),
        )
        .unwrap();
}

#[test]
fn duplicate_notifications_cause_one_refetch() {
    let store = setup();
    let gate = gate_for("u1");
    let mut bridge = RealtimeBridge::attach(&store, &gate).unwrap();

    assert_eq!(bridge.balance(&gate).unwrap().amount, Decimal::ZERO);
    assert_eq!(bridge.fetches(), 1);
    assert_eq!(bridge.balance(&gate).unwrap().amount, Decimal::ZERO);
    assert_eq!(bridge.fetches(), 1);

    // the same out-of-band change delivered twice
    bump(&store, "u1", 75, 1);
    bump(&store, "u1", 75, 1);
    assert_eq!(bridge.pump(), 2);
    assert!(bridge.is_stale());

    let balance = bridge.balance(&gate).unwrap();
    assert_eq!(balance.amount, Decimal::from(75));
    assert_eq!(balance.version, 1);
    assert_eq!(bridge.fetches(), 2);
    assert_eq!(bridge.balance(&gate).unwrap().amount, Decimal::from(75));
    assert_eq!(bridge.fetches(), 2);
}

#[test]
fn other_users_changes_do_not_invalidate() {
    let store = setup();
    let gate = gate_for("u1");
    let mut bridge = RealtimeBridge::attach(&store, &gate).unwrap();
    bridge.balance(&gate).unwrap();

    bump(&store, "u2", 10, 1);
    assert_eq!(bridge.pump(), 0);
    bridge.balance(&gate).unwrap();
    assert_eq!(bridge.fetches(), 1);
}

#[test]
fn ledger_writes_reach_the_cache() {
    let store = setup();
    let gate = gate_for("u1");
    let mut bridge = RealtimeBridge::attach(&store, &gate).unwrap();
    bridge.balance(&gate).unwrap();

    Ledger::new(&store)
        .append(
            &gate,
            &TransactionDraft {
                title: "Allowance".into(),
                amount: Decimal::from(150),
                category: "Family".into(),
                tx_type: TxType::Income,
                account: "Cash".into(),
                date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                description: String::new(),
            },
        )
        .unwrap();
    assert_eq!(bridge.balance(&gate).unwrap().amount, Decimal::from(150));
    assert_eq!(bridge.fetches(), 2);
}

#[test]
fn session_end_tears_down_the_feed() {
    let store = setup();
    let mut gate = gate_for("u1");
    let mut bridge = RealtimeBridge::attach(&store, &gate).unwrap();
    assert_eq!(store.subscriber_count(), 1);

    gate.sign_out();
    assert!(matches!(bridge.balance(&gate), Err(Error::Unauthenticated)));
    assert!(!bridge.is_attached());
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn dropping_the_bridge_unsubscribes() {
    let store = setup();
    let gate = gate_for("u1");
    {
        let _bridge = RealtimeBridge::attach(&store, &gate).unwrap();
        assert_eq!(store.subscriber_count(), 1);
    }
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn attach_requires_a_session() {
    let store = setup();
    let gate = SessionGate::new();
    assert!(matches!(
        RealtimeBridge::attach(&store, &gate),
        Err(Error::Unauthenticated)
    ));
    assert_eq!(store.subscriber_count(), 0);
}
