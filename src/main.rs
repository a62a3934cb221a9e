// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pocketledger::auth::LocalAuth;
use pocketledger::config::Config;
use pocketledger::store::SqliteStore;
use pocketledger::{cli, commands, db};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    // RUST_LOG wins over --verbose; the default keeps stderr quiet.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if matches.get_flag("verbose") {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let cfg = Config::from_env()
        .context("Invalid configuration")?
        .with_db_path(matches.get_one::<PathBuf>("db").cloned());
    let store = SqliteStore::new(db::open_or_init(&cfg)?);
    let mut auth = LocalAuth::new(&store).context("Failed to restore session")?;

    match matches.subcommand() {
        Some(("register", sub)) => commands::account::register(&mut auth, sub)?,
        Some(("login", sub)) => commands::account::login(&mut auth, sub)?,
        Some(("logout", _)) => commands::account::logout(&mut auth)?,
        Some(("whoami", sub)) => commands::account::whoami(&store, &auth, sub)?,
        Some(("dashboard", sub)) => commands::dashboard::handle(&store, &auth, &cfg, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&store, &auth, sub)?,
        Some(("category", sub)) => commands::categories::handle(&store, &auth, &cfg, sub)?,
        Some(("report", sub)) => commands::reports::handle(&store, &auth, sub)?,
        Some(("settings", sub)) => commands::settings::handle(&store, &mut auth, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
