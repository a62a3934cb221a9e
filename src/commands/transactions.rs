// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use clap::ArgMatches;

use super::{arg, inline, kind};
use crate::auth::{LocalAuth, Session};
use crate::config::TRANSACTIONS_PER_PAGE;
use crate::ledger::{
    NumberedPage, TransactionFilter, TransactionForm, add_transaction, delete_transaction,
    list_transactions, paginate, update_transaction,
};
use crate::models::Transaction;
use crate::store::SqliteStore;
use crate::utils::{date_key, fmt_money, maybe_print_json, parse_date, pretty_table};

pub fn handle(store: &SqliteStore, auth: &LocalAuth, m: &ArgMatches) -> Result<()> {
    let Some(session) = inline(auth.require_session()) else {
        return Ok(());
    };
    match m.subcommand() {
        Some(("add", sub)) => {
            let form = form(sub)?;
            if let Some(id) = inline(add_transaction(store, &session, &form)) {
                println!("Recorded {} ({})", id, form.tx_type);
            }
        }
        Some(("edit", sub)) => {
            let id = arg(sub, "id")?;
            let form = form(sub)?;
            if inline(update_transaction(store, &session, id, &form)).is_some() {
                println!("Updated {}", id);
            }
        }
        Some(("rm", sub)) => {
            let id = arg(sub, "id")?;
            if inline(delete_transaction(store, &session, id)).is_some() {
                println!("Removed {}", id);
            }
        }
        Some(("list", sub)) => list(store, &session, sub)?,
        _ => {}
    }
    Ok(())
}

fn form(sub: &ArgMatches) -> Result<TransactionForm> {
    Ok(TransactionForm {
        amount: arg(sub, "amount")?.to_string(),
        tx_type: kind(sub)?,
        category_id: arg(sub, "category")?.to_string(),
        note: arg(sub, "note")?.to_string(),
        date: arg(sub, "date")?.to_string(),
    })
}

/// The requested page of the filtered list; `None` after an inline error.
pub fn query_page(
    store: &SqliteStore,
    session: &Session,
    sub: &ArgMatches,
) -> Result<Option<NumberedPage<Transaction>>> {
    let filter = TransactionFilter {
        search: arg(sub, "search")?.to_string(),
        from: sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?,
        to: sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?,
    };
    let page = sub.get_one::<usize>("page").copied().unwrap_or(1);
    Ok(inline(list_transactions(store, session))
        .map(|all| paginate(&filter.apply(&all), page, TRANSACTIONS_PER_PAGE)))
}

fn list(store: &SqliteStore, session: &Session, sub: &ArgMatches) -> Result<()> {
    let Some(page) = query_page(store, session, sub)? else {
        return Ok(());
    };
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &page.items)? {
        return Ok(());
    }
    if page.items.is_empty() {
        println!("No transactions found");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = page
        .items
        .iter()
        .map(|t| {
            vec![
                date_key(&t.date),
                t.category_name.clone(),
                t.note.clone().unwrap_or_default(),
                t.tx_type.to_string(),
                fmt_money(t.amount),
                t.id.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Category", "Note", "Type", "Amount", "Id"], rows)
    );
    println!("Page {} of {}", page.page, page.total_pages);
    Ok(())
}
