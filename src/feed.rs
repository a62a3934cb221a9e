// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Live transaction feed for one user and date window. Every snapshot the
//! store delivers is run through [`aggregate`](crate::aggregate::aggregate)
//! in delivery order.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::auth::Session;
use crate::error::{Error, Result};
use crate::models::{Summary, Transaction};
use crate::store::{Direction, DocumentStore, Op, Query, Received, Subscription};
use crate::utils::month_range;

/// Inclusive `[start, end]` window on the transaction date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(Error::Validation(format!(
                "Range start {} is after end {}.",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn month_of(date: NaiveDate) -> Self {
        let (start, end) = month_range(date);
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    /// Matching transactions, ascending by date.
    pub transactions: Vec<Transaction>,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Update(FeedUpdate),
    /// No snapshot within the wait; the query may never have been established.
    Stalled,
    /// The store went away.
    Closed,
}

pub fn transactions_query(user_id: &str, range: &DateRange) -> Query {
    Query::new()
        .filter("user_id", Op::Eq, user_id)
        .filter("date", Op::Gte, range.start)
        .filter("date", Op::Lte, range.end)
        .order_by("date", Direction::Asc)
}

pub struct LiveFeed<'a, S: DocumentStore> {
    store: &'a S,
    user_id: String,
    range: DateRange,
    subscription: Option<Subscription<Transaction>>,
}

impl<'a, S: DocumentStore> LiveFeed<'a, S> {
    pub fn subscribe(store: &'a S, session: &Session, range: DateRange) -> Result<Self> {
        let subscription = store.subscribe(transactions_query(&session.user_id, &range))?;
        info!(
            user = %session.user_id,
            start = %range.start,
            end = %range.end,
            "live feed subscribed"
        );
        Ok(Self {
            store,
            user_id: session.user_id.clone(),
            range,
            subscription: Some(subscription),
        })
    }

    /// Feed scoped to the calendar month containing `today`.
    pub fn current_month(store: &'a S, session: &Session, today: NaiveDate) -> Result<Self> {
        Self::subscribe(store, session, DateRange::month_of(today))
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait up to `timeout` for the next snapshot.
    pub fn next(&self, timeout: Duration) -> FeedEvent {
        let Some(sub) = &self.subscription else {
            return FeedEvent::Closed;
        };
        match sub.recv_timeout(timeout) {
            Received::Snapshot(rows) => FeedEvent::Update(self.apply(rows)),
            Received::Timeout => {
                debug!(user = %self.user_id, "live feed stalled");
                FeedEvent::Stalled
            }
            Received::Closed => FeedEvent::Closed,
        }
    }

    /// Every snapshot already delivered, oldest first, without waiting.
    pub fn drain(&self) -> Vec<FeedUpdate> {
        let mut out = Vec::new();
        if let Some(sub) = &self.subscription {
            while let Received::Snapshot(rows) = sub.try_recv() {
                out.push(self.apply(rows));
            }
        }
        out
    }

    /// Swap to a new window. The old subscription is released first so no
    /// stale snapshot for the previous window can be delivered afterwards.
    pub fn resubscribe(&mut self, range: DateRange) -> Result<()> {
        self.cancel();
        let subscription = self
            .store
            .subscribe(transactions_query(&self.user_id, &range))?;
        self.range = range;
        self.subscription = Some(subscription);
        info!(user = %self.user_id, start = %range.start, end = %range.end, "live feed resubscribed");
        Ok(())
    }

    pub fn cancel(&mut self) {
        if let Some(sub) = self.subscription.take() {
            debug!(subscription = sub.id(), "live feed cancelled");
        }
    }

    fn apply(&self, transactions: Vec<Transaction>) -> FeedUpdate {
        let summary = aggregate(&transactions);
        debug!(
            rows = transactions.len(),
            income = summary.total_income,
            expense = summary.total_expense,
            "live feed snapshot"
        );
        FeedUpdate {
            transactions,
            summary,
        }
    }
}
