// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Forward/backward paging over a user's categories ordered by name.
//!
//! The pager keeps a stack with the start of every page visited so far.
//! Moving forward queries strictly after the last row of the current page and
//! pushes the new page's first row; moving back pops the stack and re-reads
//! the page that starts at the new top.
//!
//! Each fetch is split into `begin_*`, [`fetch`] and [`CursorPager::apply`].
//! Requests carry a monotonic token and only the most recently issued one is
//! applied, so a slow response can never overwrite a newer page.
//!
//! While a search filter is set, rows are fetched unpaginated up to the
//! search limit and filtered by name on the client. Matches beyond that limit
//! are not found.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::Category;
use crate::store::{Direction, DocumentStore, Op, Position, Query};

/// Where a visited page begins.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCursor {
    Beginning,
    At(Position),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Initial,
    Next,
    Prev,
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    token: u64,
    step: Move,
    filter: String,
    query: Query,
}

impl PageRequest {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn step(&self) -> Move {
        self.step
    }
}

#[derive(Debug, Clone)]
pub struct PageResponse {
    token: u64,
    step: Move,
    /// Rows as returned by the store, before the search filter.
    raw: Vec<Category>,
    items: Vec<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// A newer request was issued after this one; the response was dropped.
    Stale,
}

/// Run a page request against the store.
pub fn fetch<S: DocumentStore>(store: &S, request: &PageRequest) -> Result<PageResponse> {
    let raw: Vec<Category> = store.query(&request.query).map_err(|e| {
        warn!(token = request.token, error = %e, "category page fetch failed");
        e
    })?;
    let items = if request.filter.is_empty() {
        raw.clone()
    } else {
        raw.iter()
            .filter(|c| c.name.to_lowercase().contains(&request.filter))
            .cloned()
            .collect()
    };
    Ok(PageResponse {
        token: request.token,
        step: request.step,
        raw,
        items,
    })
}

pub struct CursorPager<'a, S: DocumentStore> {
    store: &'a S,
    user_id: String,
    page_size: usize,
    search_limit: usize,
    /// Lower-cased search text; empty when not searching.
    filter: String,
    items: Vec<Category>,
    last_raw: Option<Category>,
    cursor_stack: Vec<PageCursor>,
    has_next: bool,
    has_prev: bool,
    issued: u64,
}

impl<'a, S: DocumentStore> CursorPager<'a, S> {
    pub fn new(store: &'a S, user_id: &str, page_size: usize, search_limit: usize) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
            page_size: page_size.max(1),
            search_limit: search_limit.max(1),
            filter: String::new(),
            items: Vec::new(),
            last_raw: None,
            cursor_stack: Vec::new(),
            has_next: false,
            has_prev: false,
            issued: 0,
        }
    }

    pub fn items(&self) -> &[Category] {
        &self.items
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_prev(&self) -> bool {
        self.has_prev
    }

    /// 1-based number of the current page; 0 before anything has loaded.
    pub fn page_number(&self) -> usize {
        self.cursor_stack.len()
    }

    pub fn is_loaded(&self) -> bool {
        !self.cursor_stack.is_empty()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn base_query(&self) -> Query {
        let limit = if self.filter.is_empty() {
            self.page_size
        } else {
            self.search_limit
        };
        Query::new()
            .filter("user_id", Op::Eq, self.user_id.as_str())
            .order_by("name", Direction::Asc)
            .limit(limit)
    }

    fn issue(&mut self, step: Move, query: Query) -> PageRequest {
        self.issued += 1;
        debug!(token = self.issued, ?step, "category page requested");
        PageRequest {
            token: self.issued,
            step,
            filter: self.filter.clone(),
            query,
        }
    }

    pub fn begin_initial(&mut self) -> PageRequest {
        let query = self.base_query();
        self.issue(Move::Initial, query)
    }

    pub fn begin_next(&mut self) -> Result<PageRequest> {
        if !self.has_next {
            return Err(Error::Validation("There is no next page.".into()));
        }
        let last = self
            .last_raw
            .as_ref()
            .ok_or_else(|| Error::Validation("There is no next page.".into()))?;
        let query = self.base_query().start_after(Position::of(last, "name")?);
        Ok(self.issue(Move::Next, query))
    }

    pub fn begin_prev(&mut self) -> Result<PageRequest> {
        if self.cursor_stack.len() < 2 {
            return Err(Error::Validation("There is no previous page.".into()));
        }
        let query = match &self.cursor_stack[self.cursor_stack.len() - 2] {
            PageCursor::Beginning => self.base_query(),
            PageCursor::At(pos) => self.base_query().start_at(pos.clone()),
        };
        Ok(self.issue(Move::Prev, query))
    }

    /// Install a fetched page, unless a newer request has been issued since.
    pub fn apply(&mut self, response: PageResponse) -> Result<Applied> {
        if response.token != self.issued {
            debug!(
                token = response.token,
                latest = self.issued,
                "discarding stale category page"
            );
            return Ok(Applied::Stale);
        }
        match response.step {
            Move::Initial => {
                self.cursor_stack = vec![PageCursor::Beginning];
            }
            Move::Next => {
                let first = match (response.items.is_empty(), response.raw.first()) {
                    (false, Some(first)) => first,
                    // No further rows, or none matching the search; stay on this page.
                    _ => {
                        self.has_next = false;
                        return Ok(Applied::Applied);
                    }
                };
                self.cursor_stack
                    .push(PageCursor::At(Position::of(first, "name")?));
            }
            Move::Prev => {
                self.cursor_stack.pop();
            }
        }
        self.has_next = response.items.len() == self.page_size;
        self.has_prev = self.cursor_stack.len() > 1;
        self.last_raw = response.raw.last().cloned();
        self.items = response.items;
        debug!(
            page = self.cursor_stack.len(),
            rows = self.items.len(),
            has_next = self.has_next,
            has_prev = self.has_prev,
            "category page loaded"
        );
        Ok(Applied::Applied)
    }

    pub fn load_initial(&mut self) -> Result<()> {
        let request = self.begin_initial();
        let response = fetch(self.store, &request)?;
        self.apply(response).map(|_| ())
    }

    pub fn load_next(&mut self) -> Result<()> {
        let request = self.begin_next()?;
        let response = fetch(self.store, &request)?;
        self.apply(response).map(|_| ())
    }

    pub fn load_prev(&mut self) -> Result<()> {
        let request = self.begin_prev()?;
        let response = fetch(self.store, &request)?;
        self.apply(response).map(|_| ())
    }

    /// Change the search text. Any change drops the visited pages and
    /// reloads from page 1; on a failed fetch the old filter and page stay.
    pub fn set_filter(&mut self, text: &str) -> Result<()> {
        let text = text.trim().to_lowercase();
        if text == self.filter && self.is_loaded() {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.filter, text);
        let request = self.begin_initial();
        match fetch(self.store, &request) {
            Ok(response) => self.apply(response).map(|_| ()),
            Err(e) => {
                self.filter = previous;
                Err(e)
            }
        }
    }
}
