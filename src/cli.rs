// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    )
}

fn id_arg() -> Arg {
    Arg::new("id").long("id").required(true)
}

fn tx_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(Arg::new("title").long("title").required(required))
        .arg(Arg::new("amount").long("amount").required(required))
        .arg(
            Arg::new("type")
                .long("type")
                .required(required)
                .help("income or expense"),
        )
        .arg(Arg::new("category").long("category").required(required))
        .arg(
            Arg::new("account")
                .long("account")
                .required(required)
                .help("e.g. Cash, Gcash, Credit"),
        )
        .arg(
            Arg::new("date")
                .long("date")
                .required(required)
                .help("YYYY-MM-DD"),
        )
        .arg(Arg::new("description").long("description"))
}

fn reminder_fields(cmd: Command, required: bool) -> Command {
    cmd.arg(Arg::new("title").long("title").required(required))
        .arg(Arg::new("description").long("description"))
        .arg(
            Arg::new("date")
                .long("date")
                .required(required)
                .help("Due date, YYYY-MM-DD"),
        )
}

pub fn build_cli() -> Command {
    Command::new("billfold")
        .version(clap::crate_version!())
        .about("Personal finance ledger with a running balance and reminders")
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Database file (defaults to the platform data dir)"),
        )
        .subcommand(
            Command::new("init")
                .about("Create the database")
                .arg(Arg::new("currency").long("currency").help("Display currency label")),
        )
        .subcommand(
            Command::new("auth")
                .about("Sign up, sign in and out")
                .subcommand(
                    Command::new("signup")
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("password").long("password").required(true))
                        .arg(Arg::new("confirm").long("confirm").required(true))
                        .arg(Arg::new("first_name").long("first-name"))
                        .arg(Arg::new("last_name").long("last-name")),
                )
                .subcommand(
                    Command::new("signin")
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("password").long("password").required(true)),
                )
                .subcommand(Command::new("signout"))
                .subcommand(Command::new("whoami")),
        )
        .subcommand(
            Command::new("balance")
                .about("Show and check the running balance")
                .subcommand(json_flags(Command::new("show")))
                .subcommand(json_flags(
                    Command::new("audit").about("Compare balance with the ledger sum"),
                ))
                .subcommand(
                    Command::new("reconcile").about("Reset balance to the ledger sum"),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Record and manage transactions")
                .subcommand(tx_fields(Command::new("add"), true))
                .subcommand(tx_fields(Command::new("edit").arg(id_arg()), false))
                .subcommand(Command::new("rm").arg(id_arg()))
                .subcommand(json_flags(Command::new("show").arg(id_arg())))
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(
                            Arg::new("search")
                                .long("search")
                                .help("Case-insensitive match on any field"),
                        )
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("reminder")
                .about("Manage reminder tasks")
                .subcommand(reminder_fields(Command::new("add"), true))
                .subcommand(reminder_fields(Command::new("edit").arg(id_arg()), false))
                .subcommand(Command::new("rm").arg(id_arg()))
                .subcommand(Command::new("done").arg(id_arg()))
                .subcommand(Command::new("undo").arg(id_arg()))
                .subcommand(json_flags(Command::new("list"))),
        )
}
