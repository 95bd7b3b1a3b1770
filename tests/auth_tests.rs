// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::auth::{self, AuthProvider, LocalAuth};
use billfold::db;
use billfold::ledger::Ledger;
use billfold::models::Profile;
use billfold::session::{AuthEvent, SessionState};
use billfold::store::SqliteStore;
use billfold::Error;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::tempdir;

fn profile() -> Profile {
    Profile {
        first_name: "Maria".into(),
        last_name: "Santos".into(),
    }
}

#[test]
fn signup_provisions_a_zero_balance() {
    let store = SqliteStore::open_in_memory().unwrap();
    let provider = LocalAuth::new(store.conn());
    let session = provider
        .sign_up(" Maria@Example.com ", "secret123", "secret123", &profile())
        .unwrap();
    assert_eq!(session.user.email, "maria@example.com");

    let gate = auth::restore(&provider).unwrap();
    assert_eq!(gate.user_id().unwrap(), session.user.id);
    let balance = Ledger::new(&store).balance(&gate).unwrap();
    assert_eq!(balance.amount, Decimal::ZERO);
}

#[test]
fn signup_validates_input() {
    let store = SqliteStore::open_in_memory().unwrap();
    let provider = LocalAuth::new(store.conn());

    let mismatch = provider
        .sign_up("a@b.co", "secret123", "secret124", &profile())
        .unwrap_err();
    assert!(matches!(mismatch, Error::InvalidArgument(ref m) if m.contains("do not match")));
    assert!(matches!(
        provider.sign_up("not-an-email", "secret123", "secret123", &profile()),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        provider.sign_up("a@b.co", "123", "123", &profile()),
        Err(Error::InvalidArgument(_))
    ));

    provider
        .sign_up("a@b.co", "secret123", "secret123", &profile())
        .unwrap();
    assert!(matches!(
        provider.sign_up("A@B.co", "secret123", "secret123", &profile()),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn signin_checks_password_and_session_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("billfold.sqlite");

    let user_id = {
        let store = SqliteStore::new(db::open_or_init(Some(path.as_path())).unwrap());
        let provider = LocalAuth::new(store.conn());
        let created = provider
            .sign_up("juan@example.com", "hunter22", "hunter22", &Profile::default())
            .unwrap();
        provider.sign_out().unwrap();
        assert!(provider.get_session().unwrap().is_none());

        assert!(matches!(
            provider.sign_in("juan@example.com", "wrong-pass"),
            Err(Error::Unauthenticated)
        ));
        assert!(matches!(
            provider.sign_in("nobody@example.com", "hunter22"),
            Err(Error::Unauthenticated)
        ));
        provider.sign_in("juan@example.com", "hunter22").unwrap();
        created.user.id
    };

    let store = SqliteStore::new(db::open_or_init(Some(path.as_path())).unwrap());
    let provider = LocalAuth::new(store.conn());
    let gate = auth::restore(&provider).unwrap();
    assert_eq!(gate.user_id().unwrap(), user_id);
}

#[test]
fn restore_without_session_is_unauthenticated() {
    let store = SqliteStore::open_in_memory().unwrap();
    let provider = LocalAuth::new(store.conn());
    let gate = auth::restore(&provider).unwrap();
    assert_eq!(gate.state(), &SessionState::Unauthenticated);
}

#[test]
fn listeners_see_sign_in_and_out() {
    let store = SqliteStore::open_in_memory().unwrap();
    let provider = LocalAuth::new(store.conn());
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = provider.on_auth_state_change(Box::new(move |ev: &AuthEvent| {
        let label = match ev {
            AuthEvent::SignedIn(s) => format!("in:{}", s.user.email),
            AuthEvent::SignedOut => "out".to_string(),
            AuthEvent::UserUpdated(_) => "updated".to_string(),
        };
        sink.borrow_mut().push(label);
    }));

    provider
        .sign_up("ana@example.com", "secret123", "secret123", &profile())
        .unwrap();
    provider.sign_out().unwrap();
    provider.remove_listener(id);
    provider.sign_in("ana@example.com", "secret123").unwrap();

    assert_eq!(*seen.borrow(), vec!["in:ana@example.com", "out"]);
}
