// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use billfold::auth::{self, LocalAuth};
use billfold::store::SqliteStore;
use billfold::{cli, commands, db, utils};

fn main() -> Result<()> {
    env_logger::init();

    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let db_override = matches.get_one::<PathBuf>("db").cloned();
    let conn = db::open_or_init(db_override.as_deref())?;
    let store = SqliteStore::new(conn);
    let provider = LocalAuth::new(store.conn());
    let mut gate = auth::restore(&provider)?;
    debug!("session state: {:?}", gate.state());

    match matches.subcommand() {
        Some(("init", sub)) => {
            if let Some(ccy) = sub.get_one::<String>("currency") {
                utils::set_currency(store.conn(), ccy)?;
            }
            match &db_override {
                Some(p) => println!("Database initialized at {}", p.display()),
                None => println!("Database initialized at {}", db::db_path()?.display()),
            }
        }
        Some(("auth", sub)) => commands::auth::handle(&provider, &mut gate, sub)?,
        Some(("balance", sub)) => commands::balance::handle(&store, &gate, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&store, &gate, sub)?,
        Some(("reminder", sub)) => commands::reminders::handle(&store, &gate, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
