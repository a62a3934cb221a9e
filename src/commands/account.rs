// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use clap::ArgMatches;
use serde::Serialize;

use super::{arg, inline};
use crate::auth::{AuthProvider, LocalAuth};
use crate::ledger::display_name;
use crate::store::SqliteStore;
use crate::utils::{maybe_print_json, pretty_table};

pub fn register(auth: &mut LocalAuth, m: &ArgMatches) -> Result<()> {
    let name = arg(m, "name")?;
    let email = arg(m, "email")?;
    let password = arg(m, "password")?;
    if let Some(session) = inline(auth.sign_up(name, email, password)) {
        println!("Welcome, {}! Signed in as {}", name.trim(), session.email);
    }
    Ok(())
}

pub fn login(auth: &mut LocalAuth, m: &ArgMatches) -> Result<()> {
    let email = arg(m, "email")?;
    let password = arg(m, "password")?;
    if let Some(session) = inline(auth.sign_in(email, password)) {
        println!("Signed in as {}", session.email);
    }
    Ok(())
}

pub fn logout(auth: &mut LocalAuth) -> Result<()> {
    if auth.current_session().is_none() {
        println!("Not signed in");
        return Ok(());
    }
    if inline(auth.sign_out()).is_some() {
        println!("Signed out");
    }
    Ok(())
}

#[derive(Serialize)]
struct WhoAmI {
    user_id: String,
    email: String,
    name: String,
}

pub fn whoami(store: &SqliteStore, auth: &LocalAuth, m: &ArgMatches) -> Result<()> {
    let Some(session) = inline(auth.require_session()) else {
        return Ok(());
    };
    let Some(name) = inline(display_name(store, &session)) else {
        return Ok(());
    };
    let me = WhoAmI {
        user_id: session.user_id,
        email: session.email,
        name,
    };
    if !maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &me)? {
        println!(
            "{}",
            pretty_table(
                &["Name", "Email", "User"],
                vec![vec![me.name, me.email, me.user_id]]
            )
        );
    }
    Ok(())
}
