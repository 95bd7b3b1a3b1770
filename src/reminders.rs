// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Utc;
use log::info;

use crate::error::{Error, Result};
use crate::models::{Reminder, ReminderBoard, ReminderDraft};
use crate::session::SessionGate;
use crate::store::{codec, select_one, Filter, Row, Store, Table};

fn validate(draft: &ReminderDraft) -> Result<ReminderDraft> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(Error::invalid("reminder title must not be empty"));
    }
    Ok(ReminderDraft {
        title: title.to_string(),
        description: draft.description.trim().to_string(),
        due_date: draft.due_date,
    })
}

pub struct Reminders<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> Reminders<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Newest first by `created_at`, ties broken by id.
    pub fn list(&self, gate: &SessionGate) -> Result<Vec<Reminder>> {
        let uid = gate.user_id()?;
        let filter = Filter::new()
            .eq("user_id", uid)
            .order("created_at", false)
            .order("id", false);
        self.store
            .select(Table::Reminders, &filter)?
            .iter()
            .map(codec::reminder_from_row)
            .collect()
    }

    pub fn get(&self, gate: &SessionGate, id: i64) -> Result<Reminder> {
        let uid = gate.user_id()?;
        let row = select_one(self.store, Table::Reminders, &owned(uid, id))?
            .ok_or_else(|| Error::not_found(format!("reminder {}", id)))?;
        codec::reminder_from_row(&row)
    }

    pub fn board(&self, gate: &SessionGate) -> Result<ReminderBoard> {
        let (completed, pending): (Vec<Reminder>, Vec<Reminder>) = self
            .list(gate)?
            .into_iter()
            .partition(|r| r.is_completed);
        Ok(ReminderBoard { pending, completed })
    }

    pub fn add(&self, gate: &SessionGate, draft: &ReminderDraft) -> Result<Reminder> {
        let uid = gate.user_id()?;
        let draft = validate(draft)?;
        let row = self
            .store
            .insert(Table::Reminders, codec::reminder_row(uid, &draft, Utc::now()))?;
        let reminder = codec::reminder_from_row(&row)?;
        info!("added reminder #{} '{}'", reminder.id, reminder.title);
        Ok(reminder)
    }

    /// Overwrites title, description and due date; completion is untouched.
    pub fn update(&self, gate: &SessionGate, id: i64, draft: &ReminderDraft) -> Result<Reminder> {
        let uid = gate.user_id()?;
        let draft = validate(draft)?;
        self.patch(uid, id, codec::reminder_fields(&draft))
    }

    pub fn toggle_status(&self, gate: &SessionGate, id: i64, completed: bool) -> Result<Reminder> {
        let uid = gate.user_id()?;
        let reminder = self.patch(uid, id, codec::completion_patch(completed))?;
        info!(
            "reminder #{} marked {}",
            id,
            if completed { "completed" } else { "pending" }
        );
        Ok(reminder)
    }

    pub fn delete(&self, gate: &SessionGate, id: i64) -> Result<()> {
        let uid = gate.user_id()?;
        let removed = self.store.delete(Table::Reminders, &owned(uid, id))?;
        if removed == 0 {
            return Err(Error::not_found(format!("reminder {}", id)));
        }
        info!("deleted reminder #{}", id);
        Ok(())
    }

    fn patch(&self, uid: &str, id: i64, patch: Row) -> Result<Reminder> {
        let rows = self.store.update(Table::Reminders, patch, &owned(uid, id))?;
        let row = rows
            .first()
            .ok_or_else(|| Error::not_found(format!("reminder {}", id)))?;
        codec::reminder_from_row(row)
    }
}

fn owned(uid: &str, id: i64) -> Filter {
    Filter::new().eq("id", id).eq("user_id", uid)
}
