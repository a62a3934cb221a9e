// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::NaiveDate;
use clap::ArgMatches;
use serde::Serialize;

use super::{inline, print_summary};
use crate::auth::LocalAuth;
use crate::config::Config;
use crate::feed::{DateRange, FeedEvent, LiveFeed};
use crate::ledger::display_name;
use crate::models::Summary;
use crate::store::SqliteStore;
use crate::utils::{maybe_print_json, now_local, parse_month};

#[derive(Serialize)]
struct Dashboard {
    name: String,
    month: String,
    summary: Summary,
    balance: i64,
}

pub fn handle(store: &SqliteStore, auth: &LocalAuth, cfg: &Config, m: &ArgMatches) -> Result<()> {
    let Some(session) = inline(auth.require_session()) else {
        return Ok(());
    };
    let day = match m.get_one::<String>("month") {
        Some(s) => {
            let (y, mo) = parse_month(s)?;
            NaiveDate::from_ymd_opt(y, mo, 1).unwrap_or_else(|| now_local().date())
        }
        None => now_local().date(),
    };
    let Some(name) = inline(display_name(store, &session)) else {
        return Ok(());
    };
    let Some(mut feed) = inline(LiveFeed::subscribe(store, &session, DateRange::month_of(day)))
    else {
        return Ok(());
    };

    let update = match feed.next(cfg.feed_timeout) {
        FeedEvent::Update(u) => u,
        FeedEvent::Stalled | FeedEvent::Closed => {
            eprintln!("Live data is not available right now.");
            return Ok(());
        }
    };
    feed.cancel();

    let view = Dashboard {
        name,
        month: day.format("%Y-%m").to_string(),
        balance: update.summary.balance(),
        summary: update.summary,
    };
    if !maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &view)? {
        if view.name.is_empty() {
            println!("Hello! Here is {}", view.month);
        } else {
            println!("Hello, {}! Here is {}", view.name, view.month);
        }
        print_summary(&view.summary);
    }
    Ok(())
}
