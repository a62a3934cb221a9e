// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use clap::ArgMatches;

use super::{arg, inline};
use crate::auth::LocalAuth;
use crate::ledger::{change_password, update_display_name};
use crate::store::SqliteStore;

pub fn handle(store: &SqliteStore, auth: &mut LocalAuth, m: &ArgMatches) -> Result<()> {
    let Some(session) = inline(auth.require_session()) else {
        return Ok(());
    };
    match m.subcommand() {
        Some(("name", sub)) => {
            let name = arg(sub, "name")?;
            if inline(update_display_name(store, &session, name)).is_some() {
                println!("Name updated to '{}'", name.trim());
            }
        }
        Some(("password", sub)) => {
            let current = arg(sub, "current")?;
            let new = arg(sub, "new")?;
            if inline(change_password(auth, &session, current, new)).is_some() {
                println!("Password changed");
            }
        }
        _ => {}
    }
    Ok(())
}
