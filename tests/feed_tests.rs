// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Duration;

use chrono::NaiveDate;
use pocketledger::auth::Session;
use pocketledger::db;
use pocketledger::feed::{DateRange, FeedEvent, LiveFeed};
use pocketledger::ledger::{TransactionForm, add_category, add_transaction, delete_transaction};
use pocketledger::models::TxType;
use pocketledger::store::SqliteStore;

const WAIT: Duration = Duration::from_millis(50);

fn setup() -> (SqliteStore, Session, String, String) {
    let store = SqliteStore::new(db::open_in_memory().unwrap());
    let session = Session {
        user_id: "u1".into(),
        email: "u1@example.com".into(),
    };
    let salary = add_category(&store, &session, "Salary", TxType::Income).unwrap();
    let food = add_category(&store, &session, "Food", TxType::Expense).unwrap();
    (store, session, salary, food)
}

fn form(amount: &str, tx_type: TxType, category: &str, date: &str) -> TransactionForm {
    TransactionForm {
        amount: amount.into(),
        tx_type,
        category_id: category.into(),
        note: String::new(),
        date: date.into(),
    }
}

fn january() -> DateRange {
    DateRange::month_of(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
}

fn expect_update(feed: &LiveFeed<'_, SqliteStore>) -> pocketledger::feed::FeedUpdate {
    match feed.next(WAIT) {
        FeedEvent::Update(u) => u,
        other => panic!("expected a snapshot, got {:?}", other),
    }
}

#[test]
fn first_snapshot_arrives_on_subscribe() {
    let (store, session, salary, food) = setup();
    add_transaction(&store, &session, &form("1.000", TxType::Income, &salary, "2024-01-01")).unwrap();
    add_transaction(&store, &session, &form("300", TxType::Expense, &food, "2024-01-01")).unwrap();

    let feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
    let update = expect_update(&feed);
    assert_eq!(update.transactions.len(), 2);
    assert_eq!(update.summary.total_income, 1000);
    assert_eq!(update.summary.total_expense, 300);
    assert_eq!(update.summary.daily_series.len(), 1);
    assert_eq!(update.summary.daily_series[0].date_key, "2024-01-01");
    assert_eq!(update.summary.income_by_category[0].name, "Salary");
    assert_eq!(update.summary.expense_by_category[0].value, 300);
}

#[test]
fn every_write_delivers_a_fresh_snapshot_in_order() {
    let (store, session, salary, food) = setup();
    let feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
    assert!(expect_update(&feed).transactions.is_empty());

    add_transaction(&store, &session, &form("500", TxType::Income, &salary, "2024-01-10")).unwrap();
    let id = add_transaction(&store, &session, &form("200", TxType::Expense, &food, "2024-01-03")).unwrap();
    delete_transaction(&store, &session, &id).unwrap();

    let updates = feed.drain();
    let incomes: Vec<i64> = updates.iter().map(|u| u.summary.total_income).collect();
    let expenses: Vec<i64> = updates.iter().map(|u| u.summary.total_expense).collect();
    assert_eq!(incomes, [500, 500, 500]);
    assert_eq!(expenses, [0, 200, 0]);

    // Ascending by date, so the series follows the calendar.
    let keys: Vec<String> = updates[1]
        .summary
        .daily_series
        .iter()
        .map(|b| b.date_key.clone())
        .collect();
    assert_eq!(keys, ["2024-01-03", "2024-01-10"]);
    assert!(feed.drain().is_empty());
}

#[test]
fn window_bounds_are_inclusive_and_exclusive_outside() {
    let (store, session, salary, _) = setup();
    for date in ["2023-12-31", "2024-01-01", "2024-01-31", "2024-02-01"] {
        add_transaction(&store, &session, &form("1", TxType::Income, &salary, date)).unwrap();
    }
    let feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
    let update = expect_update(&feed);
    let days: Vec<String> = update
        .transactions
        .iter()
        .map(|t| t.date.format("%Y-%m-%d").to_string())
        .collect();
    assert_eq!(days, ["2024-01-01", "2024-01-31"]);
}

#[test]
fn other_users_writes_do_not_show_up() {
    let (store, session, _, _) = setup();
    let other = Session {
        user_id: "u2".into(),
        email: "u2@example.com".into(),
    };
    let theirs = add_category(&store, &other, "Gift", TxType::Income).unwrap();
    let feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
    expect_update(&feed);

    add_transaction(&store, &other, &form("90", TxType::Income, &theirs, "2024-01-05")).unwrap();
    let updates = feed.drain();
    assert!(updates.iter().all(|u| u.transactions.is_empty()));
}

#[test]
fn resubscribe_switches_window() {
    let (store, session, salary, _) = setup();
    add_transaction(&store, &session, &form("10", TxType::Income, &salary, "2024-01-05")).unwrap();
    add_transaction(&store, &session, &form("20", TxType::Income, &salary, "2024-02-05")).unwrap();

    let mut feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
    assert_eq!(expect_update(&feed).summary.total_income, 10);

    let february = DateRange::month_of(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    feed.resubscribe(february).unwrap();
    assert_eq!(feed.range(), february);
    assert_eq!(store.active_subscriptions(), 1);
    let update = expect_update(&feed);
    assert_eq!(update.summary.total_income, 20);
    assert!(feed.drain().is_empty());
}

#[test]
fn cancelled_feed_stops_receiving() {
    let (store, session, salary, _) = setup();
    let mut feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
    expect_update(&feed);
    feed.cancel();
    assert!(!feed.is_active());
    assert_eq!(store.active_subscriptions(), 0);

    add_transaction(&store, &session, &form("10", TxType::Income, &salary, "2024-01-05")).unwrap();
    assert_eq!(feed.next(WAIT), FeedEvent::Closed);
    assert!(feed.drain().is_empty());
}

#[test]
fn dropping_the_feed_releases_the_subscription() {
    let (store, session, _, _) = setup();
    {
        let _feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
        assert_eq!(store.active_subscriptions(), 1);
    }
    assert_eq!(store.active_subscriptions(), 0);
}

#[test]
fn silent_feed_reports_stalled() {
    let (store, session, _, _) = setup();
    let feed = LiveFeed::subscribe(&store, &session, january()).unwrap();
    expect_update(&feed);
    assert_eq!(feed.next(WAIT), FeedEvent::Stalled);
}

#[test]
fn inverted_range_is_rejected() {
    let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert!(DateRange::new(start, end).is_err());
}
