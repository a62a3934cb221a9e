// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};
use std::path::PathBuf;

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as a JSON document"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn kind_arg() -> Arg {
    Arg::new("type")
        .long("type")
        .value_parser(["income", "expense"])
        .default_value("expense")
}

fn tx_fields(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("amount")
            .long("amount")
            .required(true)
            .help("Amount, grouping dots allowed (1.250.000)"),
    )
    .arg(kind_arg())
    .arg(
        Arg::new("category")
            .long("category")
            .required(true)
            .help("Category id"),
    )
    .arg(
        Arg::new("date")
            .long("date")
            .required(true)
            .help("YYYY-MM-DD"),
    )
    .arg(Arg::new("note").long("note").default_value(""))
}

pub fn build_cli() -> Command {
    Command::new("pocketledger")
        .about("Personal income and expense tracker")
        .version(clap::crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Database file (overrides POCKETLEDGER_DB)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging on stderr"),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account and sign in")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("email").long("email").required(true))
                .arg(Arg::new("password").long("password").required(true)),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in")
                .arg(Arg::new("email").long("email").required(true))
                .arg(Arg::new("password").long("password").required(true)),
        )
        .subcommand(Command::new("logout").about("Sign out"))
        .subcommand(json_flags(Command::new("whoami").about("Show the signed-in user")))
        .subcommand(json_flags(
            Command::new("dashboard")
                .about("Greeting and live summary of one month")
                .arg(
                    Arg::new("month")
                        .long("month")
                        .help("YYYY-MM, defaults to the current month"),
                ),
        ))
        .subcommand(
            Command::new("tx")
                .about("Transactions")
                .subcommand(tx_fields(Command::new("add")))
                .subcommand(tx_fields(
                    Command::new("edit").arg(Arg::new("id").required(true)),
                ))
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true)))
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(
                            Arg::new("search")
                                .long("search")
                                .default_value("")
                                .help("Match note or category name"),
                        )
                        .arg(Arg::new("from").long("from").help("YYYY-MM-DD"))
                        .arg(Arg::new("to").long("to").help("YYYY-MM-DD"))
                        .arg(
                            Arg::new("page")
                                .long("page")
                                .value_parser(value_parser!(usize))
                                .default_value("1"),
                        ),
                )),
        )
        .subcommand(
            Command::new("category")
                .about("Categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(kind_arg()),
                )
                .subcommand(
                    Command::new("edit")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("name").required(true))
                        .arg(kind_arg()),
                )
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true)))
                .subcommand(json_flags(
                    Command::new("list")
                        .about("All categories by name")
                        .arg(Arg::new("search").long("search").default_value("")),
                ))
                .subcommand(
                    Command::new("browse")
                        .about("Page through categories: n(ext), p(rev), s <text>, q")
                        .arg(Arg::new("search").long("search").default_value("")),
                ),
        )
        .subcommand(json_flags(
            Command::new("report")
                .about("Monthly totals and category breakdown")
                .arg(
                    Arg::new("month")
                        .long("month")
                        .help("YYYY-MM, defaults to the current month"),
                ),
        ))
        .subcommand(
            Command::new("settings")
                .about("Account settings")
                .subcommand(Command::new("name").arg(Arg::new("name").required(true)))
                .subcommand(
                    Command::new("password")
                        .arg(Arg::new("current").long("current").default_value(""))
                        .arg(Arg::new("new").long("new").default_value("")),
                ),
        )
}
