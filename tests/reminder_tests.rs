// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use billfold::models::{ReminderDraft, Session, User};
use billfold::reminders::Reminders;
use billfold::session::SessionGate;
use billfold::store::SqliteStore;
use billfold::Error;
use chrono::NaiveDate;
use rusqlite::params;

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

fn draft(title: &str) -> ReminderDraft {
    ReminderDraft {
        title: title.into(),
        description: "remember".into(),
        due_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
    }
}

#[test]
fn fresh_reminder_is_pending_until_toggled() {
    let store = SqliteStore::open_in_memory().unwrap();
    let gate = gate_for("u1");
    let reminders = Reminders::new(&store);

    let older = reminders.add(&gate, &draft("Pay rent")).unwrap();
    reminders.toggle_status(&gate, older.id, true).unwrap();
    let fresh = reminders.add(&gate, &draft("Pay electricity")).unwrap();
    assert!(!fresh.is_completed);

    let board = reminders.board(&gate).unwrap();
    assert_eq!(board.pending.len(), 1);
    assert_eq!(board.pending[0].id, fresh.id);
    assert!(board.completed.iter().all(|r| r.id != fresh.id));

    reminders.toggle_status(&gate, fresh.id, true).unwrap();
    let board = reminders.board(&gate).unwrap();
    assert!(board.pending.is_empty());
    let ids: Vec<i64> = board.completed.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![fresh.id, older.id]);
}

#[test]
fn completion_is_stored_as_text() {
    let store = SqliteStore::open_in_memory().unwrap();
    let gate = gate_for("u1");
    let reminders = Reminders::new(&store);
    let r = reminders.add(&gate, &draft("Call bank")).unwrap();

    let raw = |id: i64| -> String {
        store
            .conn()
            .query_row(
                "SELECT is_completed FROM reminders WHERE id=?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap()
    };
    assert_eq!(raw(r.id), "false");
    reminders.toggle_status(&gate, r.id, true).unwrap();
    assert_eq!(raw(r.id), "true");
    reminders.toggle_status(&gate, r.id, false).unwrap();
    assert_eq!(raw(r.id), "false");
}

#[test]
fn update_leaves_completion_alone() {
    let store = SqliteStore::open_in_memory().unwrap();
    let gate = gate_for("u1");
    let reminders = Reminders::new(&store);
    let r = reminders.add(&gate, &draft("Renew card")).unwrap();
    reminders.toggle_status(&gate, r.id, true).unwrap();

    let mut changed = draft(" Renew ID ");
    changed.due_date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
    let updated = reminders.update(&gate, r.id, &changed).unwrap();
    assert_eq!(updated.title, "Renew ID");
    assert_eq!(updated.due_date, changed.due_date);
    assert!(updated.is_completed);
    assert_eq!(updated.created_at, r.created_at);
}

#[test]
fn reminders_are_scoped_to_owner() {
    let store = SqliteStore::open_in_memory().unwrap();
    let reminders = Reminders::new(&store);
    let mine = reminders.add(&gate_for("u1"), &draft("Mine")).unwrap();
    let other = gate_for("u2");

    assert!(reminders.list(&other).unwrap().is_empty());
    assert!(matches!(
        reminders.toggle_status(&other, mine.id, true),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        reminders.delete(&other, mine.id),
        Err(Error::NotFound(_))
    ));
    reminders.delete(&gate_for("u1"), mine.id).unwrap();
    assert!(reminders.list(&gate_for("u1")).unwrap().is_empty());
}

#[test]
fn reminders_require_a_session() {
    let store = SqliteStore::open_in_memory().unwrap();
    let reminders = Reminders::new(&store);
    let gate = SessionGate::new();
    assert!(matches!(
        reminders.add(&gate, &draft("x")),
        Err(Error::Unauthenticated)
    ));
    assert!(matches!(reminders.list(&gate), Err(Error::Unauthenticated)));
}

#[test]
fn blank_title_is_rejected() {
    let store = SqliteStore::open_in_memory().unwrap();
    let err = Reminders::new(&store)
        .add(&gate_for("u1"), &draft("  "))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}
