// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::auth::AuthProvider;
use crate::models::Profile;
use crate::session::SessionGate;
use anyhow::{Context, Result};

pub fn handle<A: AuthProvider>(
    auth: &A,
    gate: &mut SessionGate,
    m: &clap::ArgMatches,
) -> Result<()> {
    match m.subcommand() {
        Some(("signup", sub)) => {
            let profile = Profile {
                first_name: sub.get_one::<String>("first_name").cloned().unwrap_or_default(),
                last_name: sub.get_one::<String>("last_name").cloned().unwrap_or_default(),
            };
            let session = auth.sign_up(
                arg(sub, "email")?,
                arg(sub, "password")?,
                arg(sub, "confirm")?,
                &profile,
            )?;
            println!("Account created for {}", session.user.email);
            gate.resolve(Some(session));
        }
        Some(("signin", sub)) => {
            let session = auth
                .sign_in(arg(sub, "email")?, arg(sub, "password")?)
                .context("Invalid login credentials")?;
            println!("Signed in as {}", session.user.email);
            gate.resolve(Some(session));
        }
        Some(("signout", _)) => {
            auth.sign_out()?;
            gate.sign_out();
            println!("Signed out");
        }
        Some(("whoami", _)) => match gate.session() {
            Some(s) => {
                let name = format!("{} {}", s.user.first_name, s.user.last_name);
                println!("{} ({}) id={}", name.trim(), s.user.email, s.user.id);
            }
            None => println!("Not signed in"),
        },
        _ => {}
    }
    Ok(())
}

fn arg<'a>(sub: &'a clap::ArgMatches, key: &str) -> Result<&'a str> {
    sub.get_one::<String>(key)
        .map(String::as_str)
        .with_context(|| format!("--{} is required", key))
}
