// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Validated writes for transactions and categories, the client-side search
//! and numbered paging of the transaction list, the monthly report and the
//! profile settings.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::aggregate::{aggregate, filter_month};
use crate::auth::{AuthProvider, Session};
use crate::error::{Error, Result};
use crate::models::{Category, Summary, Transaction, TxType, UserProfile};
use crate::store::{Direction, DocumentStore, Op, Query, Record};
use crate::utils::{now_local, parse_grouped_amount};

/// Raw input of the transaction editor.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionForm {
    /// As typed, grouping separators allowed ("1.250.000").
    pub amount: String,
    pub tx_type: TxType,
    pub category_id: String,
    pub note: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

impl TransactionForm {
    /// Check required fields and build the record for `session`'s user. The
    /// category's current name is copied into the transaction.
    fn build(&self, session: &Session, category: &Category) -> Result<Transaction> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|_| Error::Validation(format!("Invalid date '{}'.", self.date.trim())))?;
        let note = self.note.trim();
        Ok(Transaction {
            id: String::new(),
            user_id: session.user_id.clone(),
            amount: parse_grouped_amount(&self.amount),
            tx_type: self.tx_type,
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            note: (!note.is_empty()).then(|| note.to_string()),
            date: date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            created_at: now_local(),
        })
    }

    fn check_required(&self) -> Result<()> {
        if !self.amount.chars().any(|c| c.is_ascii_digit())
            || self.category_id.trim().is_empty()
            || self.date.trim().is_empty()
        {
            return Err(Error::Validation(
                "Amount, category and date are required.".into(),
            ));
        }
        Ok(())
    }
}

/// Records that belong to one user.
trait Owned: Record {
    const LABEL: &'static str;
    fn owner(&self) -> &str;
}

impl Owned for Transaction {
    const LABEL: &'static str = "Transaction";
    fn owner(&self) -> &str {
        &self.user_id
    }
}

impl Owned for Category {
    const LABEL: &'static str = "Category";
    fn owner(&self) -> &str {
        &self.user_id
    }
}

/// Load `id` if it exists and belongs to the session's user.
fn owned<R: Owned, S: DocumentStore>(store: &S, session: &Session, id: &str) -> Result<R> {
    match store.get_one::<R>(id.trim())? {
        Some(rec) if rec.owner() == session.user_id => Ok(rec),
        _ => Err(Error::NotFound(R::LABEL.to_string())),
    }
}

/// Record a new transaction; returns its id.
pub fn add_transaction<S: DocumentStore>(
    store: &S,
    session: &Session,
    form: &TransactionForm,
) -> Result<String> {
    form.check_required()?;
    let category: Category = owned(store, session, &form.category_id)?;
    let tx = form.build(session, &category)?;
    let id = store.create::<Transaction>(tx.fields())?;
    info!(id = %id, amount = tx.amount, kind = %tx.tx_type, "transaction recorded");
    Ok(id)
}

/// Rewrite every field of an existing transaction, `created_at` included.
pub fn update_transaction<S: DocumentStore>(
    store: &S,
    session: &Session,
    id: &str,
    form: &TransactionForm,
) -> Result<()> {
    form.check_required()?;
    owned::<Transaction, _>(store, session, id)?;
    let category: Category = owned(store, session, &form.category_id)?;
    let tx = form.build(session, &category)?;
    store.update::<Transaction>(id.trim(), tx.fields())?;
    info!(id = %id.trim(), "transaction updated");
    Ok(())
}

pub fn delete_transaction<S: DocumentStore>(store: &S, session: &Session, id: &str) -> Result<()> {
    owned::<Transaction, _>(store, session, id)?;
    store.delete::<Transaction>(id.trim())?;
    info!(id = %id.trim(), "transaction deleted");
    Ok(())
}

/// All of the user's transactions, newest first.
pub fn list_transactions<S: DocumentStore>(store: &S, session: &Session) -> Result<Vec<Transaction>> {
    store.query(
        &Query::new()
            .filter("user_id", Op::Eq, session.user_id.as_str())
            .order_by("date", Direction::Desc),
    )
}

/// Search text and optional inclusive date bounds for the transaction list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub search: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        let needle = self.search.trim().to_lowercase();
        let in_note = tx
            .note
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(&needle));
        let in_category = tx.category_name.to_lowercase().contains(&needle);
        let day = tx.date.date();
        let after_from = self.from.is_none_or(|f| day >= f);
        let before_to = self.to.is_none_or(|t| day <= t);
        (in_note || in_category) && after_from && before_to
    }

    pub fn apply(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|tx| self.matches(tx))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberedPage<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page: usize,
    pub total_pages: usize,
}

/// Slice out page `page` (1-based) of `per_page` rows. Out-of-range pages are empty.
pub fn paginate<T: Clone>(rows: &[T], page: usize, per_page: usize) -> NumberedPage<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_pages = rows.len().div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page);
    let items = rows
        .iter()
        .skip(start)
        .take(per_page)
        .cloned()
        .collect();
    NumberedPage {
        items,
        page,
        total_pages,
    }
}

fn category_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Name must not be empty.".into()));
    }
    Ok(name.to_string())
}

pub fn add_category<S: DocumentStore>(
    store: &S,
    session: &Session,
    name: &str,
    cat_type: TxType,
) -> Result<String> {
    let cat = Category {
        id: String::new(),
        user_id: session.user_id.clone(),
        name: category_name(name)?,
        cat_type,
    };
    let id = store.create::<Category>(cat.fields())?;
    info!(id = %id, name = %cat.name, "category added");
    Ok(id)
}

/// Rename or retype a category. Transactions keep the name they were written with.
pub fn update_category<S: DocumentStore>(
    store: &S,
    session: &Session,
    id: &str,
    name: &str,
    cat_type: TxType,
) -> Result<()> {
    let name = category_name(name)?;
    owned::<Category, _>(store, session, id)?;
    store.update::<Category>(
        id.trim(),
        vec![("name", name.into()), ("type", cat_type.into())],
    )?;
    info!(id = %id.trim(), "category updated");
    Ok(())
}

/// Remove a category. Its transactions are left untouched.
pub fn delete_category<S: DocumentStore>(store: &S, session: &Session, id: &str) -> Result<()> {
    owned::<Category, _>(store, session, id)?;
    store.delete::<Category>(id.trim())?;
    info!(id = %id.trim(), "category deleted");
    Ok(())
}

/// Every category of the user, by name; feeds the editor's category choice.
pub fn all_categories<S: DocumentStore>(store: &S, session: &Session) -> Result<Vec<Category>> {
    store.query(
        &Query::new()
            .filter("user_id", Op::Eq, session.user_id.as_str())
            .order_by("name", Direction::Asc),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub summary: Summary,
    pub balance: i64,
    /// Rows of the month, newest first.
    pub transactions: Vec<Transaction>,
}

/// Totals and category breakdown for one calendar month. Reads every
/// transaction of the user once and filters the month on the client.
pub fn monthly_report<S: DocumentStore>(
    store: &S,
    session: &Session,
    year: i32,
    month: u32,
) -> Result<MonthlyReport> {
    if !(1..=12).contains(&month) {
        return Err(Error::Validation(format!("Invalid month {}.", month)));
    }
    let all = list_transactions(store, session)?;
    let transactions = filter_month(&all, year, month);
    let summary = aggregate(&transactions);
    tracing::debug!(year, month, rows = transactions.len(), "monthly report built");
    Ok(MonthlyReport {
        year,
        month,
        balance: summary.balance(),
        summary,
        transactions,
    })
}

/// Display name from the user's profile; empty when no profile exists.
pub fn display_name<S: DocumentStore>(store: &S, session: &Session) -> Result<String> {
    Ok(store
        .get_one::<UserProfile>(&session.user_id)?
        .map(|p| p.name)
        .unwrap_or_default())
}

pub fn update_display_name<S: DocumentStore>(
    store: &S,
    session: &Session,
    name: &str,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Name must not be empty.".into()));
    }
    store.update::<UserProfile>(&session.user_id, vec![("name", name.into())])?;
    info!(user = %session.user_id, "display name updated");
    Ok(())
}

/// Confirm the current password, then set the new one.
pub fn change_password<A: AuthProvider>(
    auth: &mut A,
    session: &Session,
    current: &str,
    new: &str,
) -> Result<()> {
    if current.is_empty() || new.is_empty() {
        return Err(Error::Validation(
            "Enter both the current and the new password.".into(),
        ));
    }
    auth.reauthenticate(session, current)?;
    auth.change_password(session, new)
}
