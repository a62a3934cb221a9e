// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime configuration: defaults, overridden by environment variables,
//! overridden by command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DB_ENV: &str = "POCKETLEDGER_DB";
pub const PAGE_SIZE_ENV: &str = "POCKETLEDGER_PAGE_SIZE";
pub const SEARCH_LIMIT_ENV: &str = "POCKETLEDGER_SEARCH_LIMIT";
pub const FEED_TIMEOUT_ENV: &str = "POCKETLEDGER_FEED_TIMEOUT_MS";

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 100;
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(5);
/// Rows per page in the transaction list.
pub const TRANSACTIONS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` means the platform data directory.
    pub db_path: Option<PathBuf>,
    pub page_size: usize,
    /// Upper bound on rows fetched while a category search is active.
    pub search_limit: usize,
    /// How long a live feed may stay silent before the screen reports it as stalled.
    pub feed_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            search_limit: DEFAULT_SEARCH_LIMIT,
            feed_timeout: DEFAULT_FEED_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests do not touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();
        if let Some(path) = lookup(DB_ENV).filter(|p| !p.trim().is_empty()) {
            cfg.db_path = Some(PathBuf::from(path));
        }
        if let Some(v) = lookup(PAGE_SIZE_ENV) {
            cfg.page_size = parse_positive(PAGE_SIZE_ENV, &v)?;
        }
        if let Some(v) = lookup(SEARCH_LIMIT_ENV) {
            cfg.search_limit = parse_positive(SEARCH_LIMIT_ENV, &v)?;
        }
        if let Some(v) = lookup(FEED_TIMEOUT_ENV) {
            cfg.feed_timeout = Duration::from_millis(parse_positive(FEED_TIMEOUT_ENV, &v)? as u64);
        }
        Ok(cfg)
    }

    pub fn with_db_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.db_path = path;
        }
        self
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::InvalidData(format!(
            "{} must be a positive integer, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.search_limit, 100);
    }

    #[test]
    fn environment_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            (DB_ENV, "/tmp/ledger.sqlite"),
            (PAGE_SIZE_ENV, "25"),
            (FEED_TIMEOUT_ENV, "250"),
        ]))
        .unwrap();
        assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/ledger.sqlite")));
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.feed_timeout, Duration::from_millis(250));
    }

    #[test]
    fn zero_page_size_rejected() {
        let err = Config::from_lookup(lookup(&[(PAGE_SIZE_ENV, "0")])).unwrap_err();
        assert!(err.to_string().contains(PAGE_SIZE_ENV));
    }

    #[test]
    fn flag_wins_over_environment() {
        let cfg = Config::from_lookup(lookup(&[(DB_ENV, "/env.sqlite")]))
            .unwrap()
            .with_db_path(Some(PathBuf::from("/flag.sqlite")));
        assert_eq!(cfg.db_path, Some(PathBuf::from("/flag.sqlite")));
    }
}
