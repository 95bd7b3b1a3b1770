// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Reminder, ReminderDraft};
use crate::reminders::Reminders;
use crate::session::SessionGate;
use crate::store::SqliteStore;
use crate::utils::{maybe_print_json, parse_date, parse_id, pretty_table};
use anyhow::{Context, Result};

pub fn handle(store: &SqliteStore, gate: &SessionGate, m: &clap::ArgMatches) -> Result<()> {
    let reminders = Reminders::new(store);
    match m.subcommand() {
        Some(("add", sub)) => {
            let draft = ReminderDraft {
                title: text(sub, "title").unwrap_or_default(),
                description: text(sub, "description").unwrap_or_default(),
                due_date: parse_date(&text(sub, "date").unwrap_or_default())?,
            };
            let r = reminders.add(gate, &draft)?;
            println!("Added reminder #{} '{}' due {}", r.id, r.title, r.due_date);
        }
        Some(("edit", sub)) => {
            let id = id_of(sub)?;
            let current = reminders.get(gate, id)?;
            let draft = ReminderDraft {
                title: text(sub, "title").unwrap_or(current.title),
                description: text(sub, "description").unwrap_or(current.description),
                due_date: match text(sub, "date") {
                    Some(d) => parse_date(&d)?,
                    None => current.due_date,
                },
            };
            let r = reminders.update(gate, id, &draft)?;
            println!("Updated reminder #{} '{}' due {}", r.id, r.title, r.due_date);
        }
        Some(("rm", sub)) => {
            let id = id_of(sub)?;
            reminders.delete(gate, id)?;
            println!("Removed reminder #{}", id);
        }
        Some(("done", sub)) => {
            let r = reminders.toggle_status(gate, id_of(sub)?, true)?;
            println!("Completed reminder #{} '{}'", r.id, r.title);
        }
        Some(("undo", sub)) => {
            let r = reminders.toggle_status(gate, id_of(sub)?, false)?;
            println!("Reopened reminder #{} '{}'", r.id, r.title);
        }
        Some(("list", sub)) => {
            let board = reminders.board(gate)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &board)? {
                println!("Pending");
                println!("{}", pretty_table(&HEADERS, cells(&board.pending)));
                println!("Completed");
                println!("{}", pretty_table(&HEADERS, cells(&board.completed)));
            }
        }
        _ => {}
    }
    Ok(())
}

const HEADERS: [&str; 4] = ["ID", "Due", "Title", "Description"];

fn cells(list: &[Reminder]) -> Vec<Vec<String>> {
    list.iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.due_date.to_string(),
                r.title.clone(),
                r.description.clone(),
            ]
        })
        .collect()
}

fn text(sub: &clap::ArgMatches, key: &str) -> Option<String> {
    sub.get_one::<String>(key).map(|s| s.trim().to_string())
}

fn id_of(sub: &clap::ArgMatches) -> Result<i64> {
    parse_id(sub.get_one::<String>("id").context("--id is required")?)
}
