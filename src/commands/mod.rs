// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod account;
pub mod categories;
pub mod dashboard;
pub mod reports;
pub mod settings;
pub mod transactions;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::error;
use crate::models::{Summary, TxType};
use crate::utils::{fmt_money, pretty_table};

/// String argument that the parser guarantees.
pub(crate) fn arg<'m>(m: &'m ArgMatches, name: &str) -> Result<&'m str> {
    m.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument '{}'", name))
}

pub(crate) fn kind(m: &ArgMatches) -> Result<TxType> {
    Ok(arg(m, "type")?.parse::<TxType>()?)
}

/// Print the inline message for a failed library call. `None` means the
/// message was shown and the command should stop.
pub(crate) fn inline<T>(res: error::Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            eprintln!("{}", e.user_message());
            None
        }
    }
}

pub(crate) fn print_summary(summary: &Summary) {
    println!(
        "{}",
        pretty_table(
            &["Income", "Expense", "Balance"],
            vec![vec![
                fmt_money(summary.total_income),
                fmt_money(summary.total_expense),
                fmt_money(summary.balance()),
            ]],
        )
    );
    if !summary.daily_series.is_empty() {
        let rows = summary
            .daily_series
            .iter()
            .map(|b| vec![b.date_key.clone(), fmt_money(b.income), fmt_money(b.expense)])
            .collect();
        println!("{}", pretty_table(&["Day", "Income", "Expense"], rows));
    }
    for (title, totals) in [
        ("Income by category", &summary.income_by_category),
        ("Expense by category", &summary.expense_by_category),
    ] {
        if totals.is_empty() {
            continue;
        }
        let rows = totals
            .iter()
            .map(|c| vec![c.name.clone(), fmt_money(c.value)])
            .collect();
        println!("{}", pretty_table(&[title, "Total"], rows));
    }
}
