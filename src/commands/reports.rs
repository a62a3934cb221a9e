// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Datelike;
use clap::ArgMatches;

use super::{inline, print_summary};
use crate::auth::LocalAuth;
use crate::ledger::monthly_report;
use crate::store::SqliteStore;
use crate::utils::{date_key, fmt_money, maybe_print_json, now_local, parse_month, pretty_table};

pub fn handle(store: &SqliteStore, auth: &LocalAuth, m: &ArgMatches) -> Result<()> {
    let Some(session) = inline(auth.require_session()) else {
        return Ok(());
    };
    let (year, month) = match m.get_one::<String>("month") {
        Some(s) => parse_month(s)?,
        None => {
            let today = now_local().date();
            (today.year(), today.month())
        }
    };
    let Some(report) = inline(monthly_report(store, &session, year, month)) else {
        return Ok(());
    };
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &report)? {
        return Ok(());
    }

    println!("Report for {}-{:02}", report.year, report.month);
    print_summary(&report.summary);
    if report.transactions.is_empty() {
        println!("No transactions in this month");
        return Ok(());
    }
    let rows = report
        .transactions
        .iter()
        .map(|t| {
            vec![
                date_key(&t.date),
                t.category_name.clone(),
                t.note.clone().unwrap_or_default(),
                t.tx_type.to_string(),
                fmt_money(t.amount),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Category", "Note", "Type", "Amount"], rows)
    );
    Ok(())
}
