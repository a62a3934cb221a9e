// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::io::{BufRead, Write};

use anyhow::Result;
use clap::ArgMatches;

use super::{arg, inline, kind};
use crate::auth::{LocalAuth, Session};
use crate::config::Config;
use crate::ledger::{add_category, all_categories, delete_category, update_category};
use crate::models::TxType;
use crate::pager::CursorPager;
use crate::store::{DocumentStore, SqliteStore};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(store: &SqliteStore, auth: &LocalAuth, cfg: &Config, m: &ArgMatches) -> Result<()> {
    let Some(session) = inline(auth.require_session()) else {
        return Ok(());
    };
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = arg(sub, "name")?;
            if let Some(id) = inline(add_category(store, &session, name, kind(sub)?)) {
                println!("Added category '{}' ({})", name.trim(), id);
            }
        }
        Some(("edit", sub)) => {
            let id = arg(sub, "id")?;
            let name = arg(sub, "name")?;
            if inline(update_category(store, &session, id, name, kind(sub)?)).is_some() {
                println!("Updated category '{}'", name.trim());
            }
        }
        Some(("rm", sub)) => {
            let id = arg(sub, "id")?;
            if inline(delete_category(store, &session, id)).is_some() {
                println!("Removed category {}", id);
            }
        }
        Some(("list", sub)) => {
            let Some(cats) = inline(all_categories(store, &session)) else {
                return Ok(());
            };
            let needle = arg(sub, "search")?.trim().to_lowercase();
            let cats: Vec<_> = cats
                .into_iter()
                .filter(|c| c.name.to_lowercase().contains(&needle))
                .collect();
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let data = cats
                    .iter()
                    .map(|c| vec![c.name.clone(), c.cat_type.to_string(), c.id.clone()])
                    .collect();
                println!("{}", pretty_table(&["Category", "Type", "Id"], data));
            }
        }
        Some(("browse", sub)) => {
            let mut pager =
                CursorPager::new(store, &session.user_id, cfg.page_size, cfg.search_limit);
            let search = arg(sub, "search")?;
            let stdin = std::io::stdin();
            browse(store, &session, &mut pager, search, stdin.lock(), std::io::stdout())?;
        }
        _ => {}
    }
    Ok(())
}

/// Interactive pager loop. Commands, one per line: `n`, `p`, `s <text>`
/// (empty text clears the search), `a <income|expense> <name>`, `rm <id>`
/// and `q`. Every successful write reloads page 1.
pub fn browse<S, R, W>(
    store: &S,
    session: &Session,
    pager: &mut CursorPager<'_, S>,
    search: &str,
    input: R,
    mut out: W,
) -> Result<()>
where
    S: DocumentStore,
    R: BufRead,
    W: Write,
{
    let loaded = if search.trim().is_empty() {
        pager.load_initial()
    } else {
        pager.set_filter(search)
    };
    if let Err(e) = loaded {
        writeln!(out, "{}", e.user_message())?;
        return Ok(());
    }
    render(pager, &mut out)?;

    for line in input.lines() {
        let line = line?;
        let (cmd, rest) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
        let res = match cmd {
            "n" | "next" => pager.load_next(),
            "p" | "prev" => pager.load_prev(),
            "s" | "search" => pager.set_filter(rest),
            "a" | "add" => {
                let (cat_type, name) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
                cat_type
                    .parse::<TxType>()
                    .and_then(|k| add_category(store, session, name, k))
                    .and_then(|_| pager.load_initial())
            }
            "rm" => delete_category(store, session, rest).and_then(|_| pager.load_initial()),
            "q" | "quit" => break,
            "" => continue,
            other => {
                writeln!(out, "Unknown command '{}'", other)?;
                continue;
            }
        };
        match res {
            Ok(()) => render(pager, &mut out)?,
            Err(e) => writeln!(out, "{}", e.user_message())?,
        }
    }
    Ok(())
}

fn render<S: DocumentStore, W: Write>(pager: &CursorPager<'_, S>, out: &mut W) -> Result<()> {
    if pager.items().is_empty() {
        writeln!(out, "No categories")?;
    } else {
        let data = pager
            .items()
            .iter()
            .map(|c| vec![c.name.clone(), c.cat_type.to_string(), c.id.clone()])
            .collect();
        writeln!(out, "{}", pretty_table(&["Category", "Type", "Id"], data))?;
    }
    let mut nav = format!("Page {}", pager.page_number());
    if !pager.filter().is_empty() {
        nav.push_str(&format!(" (search '{}')", pager.filter()));
    }
    if pager.has_prev() {
        nav.push_str("  [p] prev");
    }
    if pager.has_next() {
        nav.push_str("  [n] next");
    }
    writeln!(out, "{}", nav)?;
    Ok(())
}
