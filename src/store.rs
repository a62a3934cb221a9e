// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Document store: typed collections, ordered range queries with position
//! cursors, and live subscriptions that deliver whole snapshots.
//!
//! `SqliteStore` keeps one table per collection. Every write re-runs the
//! queries of the live subscriptions on that collection and sends each result
//! set down the subscription's channel, in write order.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Null, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params_from_iter};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Category, Transaction, TxType, UserProfile};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single field value as stored and compared by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Time(NaiveDateTime),
    Null,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Time(v)
    }
}

impl From<TxType> for Value {
    fn from(v: TxType) -> Self {
        Value::Text(v.as_str().to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Time(t) => ToSqlOutput::from(t.format(TIME_FORMAT).to_string()),
            Value::Null => ToSqlOutput::from(Null),
        })
    }
}

impl ToSql for TxType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TxType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// Field/value pairs for a write. Names are storage field names.
pub type Fields = Vec<(&'static str, Value)>;

/// A record type stored in its own collection.
pub trait Record: Sized + Clone + 'static {
    const COLLECTION: &'static str;
    /// Every stored field except `id`, in column order.
    const FIELDS: &'static [&'static str];

    fn id(&self) -> &str;
    /// All fields except `id`, ready for `create`/`set`.
    fn fields(&self) -> Fields;
    /// Build from a row selected as `id, FIELDS...`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn value_of(&self, field: &str) -> Option<Value> {
        if field == "id" {
            return Some(Value::Text(self.id().to_string()));
        }
        self.fields()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, v)| v)
    }
}

impl Record for Transaction {
    const COLLECTION: &'static str = "transactions";
    const FIELDS: &'static [&'static str] = &[
        "user_id",
        "amount",
        "type",
        "category_id",
        "category_name",
        "note",
        "date",
        "created_at",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn fields(&self) -> Fields {
        vec![
            ("user_id", self.user_id.clone().into()),
            ("amount", self.amount.into()),
            ("type", self.tx_type.into()),
            ("category_id", self.category_id.clone().into()),
            ("category_name", self.category_name.clone().into()),
            ("note", self.note.clone().into()),
            ("date", self.date.into()),
            ("created_at", self.created_at.into()),
        ]
    }

    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Transaction {
            id: r.get(0)?,
            user_id: r.get(1)?,
            amount: r.get(2)?,
            tx_type: r.get(3)?,
            category_id: r.get(4)?,
            category_name: r.get(5)?,
            note: r.get(6)?,
            date: r.get(7)?,
            created_at: r.get(8)?,
        })
    }
}

impl Record for Category {
    const COLLECTION: &'static str = "categories";
    const FIELDS: &'static [&'static str] = &["user_id", "name", "type"];

    fn id(&self) -> &str {
        &self.id
    }

    fn fields(&self) -> Fields {
        vec![
            ("user_id", self.user_id.clone().into()),
            ("name", self.name.clone().into()),
            ("type", self.cat_type.into()),
        ]
    }

    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Category {
            id: r.get(0)?,
            user_id: r.get(1)?,
            name: r.get(2)?,
            cat_type: r.get(3)?,
        })
    }
}

impl Record for UserProfile {
    const COLLECTION: &'static str = "users";
    const FIELDS: &'static [&'static str] = &["name", "email", "created_at"];

    fn id(&self) -> &str {
        &self.id
    }

    fn fields(&self) -> Fields {
        vec![
            ("name", self.name.clone().into()),
            ("email", self.email.clone().into()),
            ("created_at", self.created_at.into()),
        ]
    }

    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(UserProfile {
            id: r.get(0)?,
            name: r.get(1)?,
            email: r.get(2)?,
            created_at: r.get(3)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Op {
    fn sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

/// Position of a record inside an ordered result: its sort key plus its id
/// as tie-breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    key: Value,
    id: String,
}

impl Position {
    /// Position of `record` under an ordering on `field`.
    pub fn of<R: Record>(record: &R, field: &str) -> Result<Self> {
        let key = record.value_of(field).ok_or_else(|| {
            Error::InvalidData(format!("{} has no field '{}'", R::COLLECTION, field))
        })?;
        Ok(Position {
            key,
            id: record.id().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    /// Results begin strictly after the position.
    StartAfter(Position),
    /// Results begin at the position, inclusive.
    StartAt(Position),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
    pub cursor: Option<Cursor>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: Op, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, dir: Direction) -> Self {
        self.order = Some((field.to_string(), dir));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn start_after(mut self, pos: Position) -> Self {
        self.cursor = Some(Cursor::StartAfter(pos));
        self
    }

    pub fn start_at(mut self, pos: Position) -> Self {
        self.cursor = Some(Cursor::StartAt(pos));
        self
    }

    /// Field the results are ordered by; `id` when no explicit order is set.
    pub fn order_field(&self) -> &str {
        self.order.as_ref().map(|(f, _)| f.as_str()).unwrap_or("id")
    }

    /// Render as SQL against `R`'s table, with positional parameters.
    fn to_sql<R: Record>(&self) -> Result<(String, Vec<Value>)> {
        let mut sql = select_clause::<R>();
        sql.push_str(" WHERE 1=1");
        let mut params = Vec::new();

        for f in &self.filters {
            let col = checked_field::<R>(&f.field)?;
            let _ = write!(sql, " AND \"{}\" {} ?", col, f.op.sql());
            params.push(f.value.clone());
        }

        let (order_col, dir) = match &self.order {
            Some((field, dir)) => (checked_field::<R>(field)?, *dir),
            None => ("id", Direction::Asc),
        };
        let (cmp, word) = match dir {
            Direction::Asc => (">", "ASC"),
            Direction::Desc => ("<", "DESC"),
        };

        if let Some(cursor) = &self.cursor {
            let (pos, inclusive) = match cursor {
                Cursor::StartAfter(p) => (p, false),
                Cursor::StartAt(p) => (p, true),
            };
            let id_cmp = if inclusive {
                format!("{}=", cmp)
            } else {
                cmp.to_string()
            };
            if order_col == "id" {
                let _ = write!(sql, " AND id {} ?", id_cmp);
                params.push(Value::Text(pos.id.clone()));
            } else {
                let _ = write!(
                    sql,
                    " AND (\"{c}\" {cmp} ? OR (\"{c}\" = ? AND id {id_cmp} ?))",
                    c = order_col,
                    cmp = cmp,
                    id_cmp = id_cmp
                );
                params.push(pos.key.clone());
                params.push(pos.key.clone());
                params.push(Value::Text(pos.id.clone()));
            }
        }

        if order_col == "id" {
            let _ = write!(sql, " ORDER BY id {}", word);
        } else {
            let _ = write!(sql, " ORDER BY \"{}\" {w}, id {w}", order_col, w = word);
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Int(limit as i64));
        }
        Ok((sql, params))
    }
}

fn select_clause<R: Record>() -> String {
    let mut sql = String::from("SELECT id");
    for f in R::FIELDS {
        let _ = write!(sql, ", \"{}\"", f);
    }
    let _ = write!(sql, " FROM {}", R::COLLECTION);
    sql
}

fn checked_field<R: Record>(field: &str) -> Result<&'static str> {
    if field == "id" {
        return Ok("id");
    }
    R::FIELDS
        .iter()
        .copied()
        .find(|f| *f == field)
        .ok_or_else(|| Error::InvalidData(format!("{} has no field '{}'", R::COLLECTION, field)))
}

/// What a subscriber sees when it waits for the next snapshot.
#[derive(Debug, PartialEq)]
pub enum Received<R> {
    Snapshot(Vec<R>),
    /// Nothing arrived within the wait.
    Timeout,
    /// The store is gone; nothing more will arrive.
    Closed,
}

/// Live query handle. Dropping it releases the subscription.
pub struct Subscription<R> {
    id: u64,
    rx: Receiver<Vec<R>>,
    registry: Weak<RefCell<Registry>>,
}

impl<R> Subscription<R> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Received<R> {
        match self.rx.recv_timeout(timeout) {
            Ok(rows) => Received::Snapshot(rows),
            Err(RecvTimeoutError::Timeout) => Received::Timeout,
            Err(RecvTimeoutError::Disconnected) => Received::Closed,
        }
    }

    /// Next already-delivered snapshot, without waiting.
    pub fn try_recv(&self) -> Received<R> {
        match self.rx.try_recv() {
            Ok(rows) => Received::Snapshot(rows),
            Err(TryRecvError::Empty) => Received::Timeout,
            Err(TryRecvError::Disconnected) => Received::Closed,
        }
    }

    pub fn cancel(self) {}
}

impl<R> Drop for Subscription<R> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            // A failed borrow only happens mid-notify; the closed channel is
            // pruned on the next delivery instead.
            if let Ok(mut reg) = registry.try_borrow_mut() {
                reg.listeners.retain(|l| l.id != self.id);
                debug!(subscription = self.id, "subscription released");
            }
        }
    }
}

enum Delivery {
    Sent,
    Failed,
    Closed,
}

struct Listener {
    id: u64,
    collection: &'static str,
    refresh: Box<dyn Fn(&Connection) -> Delivery>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// The operations the application needs from its backing store.
pub trait DocumentStore {
    /// Insert a new record with a store-assigned id.
    fn create<R: Record>(&self, fields: Fields) -> Result<String>;
    /// Insert or replace the record with the given id.
    fn set<R: Record>(&self, id: &str, fields: Fields) -> Result<()>;
    /// Overwrite the listed fields of an existing record.
    fn update<R: Record>(&self, id: &str, fields: Fields) -> Result<()>;
    fn delete<R: Record>(&self, id: &str) -> Result<()>;
    fn get_one<R: Record>(&self, id: &str) -> Result<Option<R>>;
    fn query<R: Record>(&self, query: &Query) -> Result<Vec<R>>;
    /// Deliver the current result set now and again after every write to the collection.
    fn subscribe<R: Record>(&self, query: Query) -> Result<Subscription<R>>;
}

pub struct SqliteStore {
    conn: Connection,
    registry: Rc<RefCell<Registry>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn active_subscriptions(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    fn notify(&self, collection: &'static str) {
        let mut reg = self.registry.borrow_mut();
        reg.listeners.retain(|l| {
            if l.collection != collection {
                return true;
            }
            match (l.refresh)(&self.conn) {
                Delivery::Sent | Delivery::Failed => true,
                Delivery::Closed => {
                    debug!(subscription = l.id, "pruning closed subscription");
                    false
                }
            }
        });
    }
}

fn run_query<R: Record>(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<Vec<R>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |r| R::from_row(r))?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}

fn check_fields<R: Record>(fields: &Fields) -> Result<()> {
    if fields.is_empty() {
        return Err(Error::InvalidData(format!(
            "no fields given for {}",
            R::COLLECTION
        )));
    }
    for (name, _) in fields {
        if *name == "id" {
            return Err(Error::InvalidData("id cannot be written as a field".into()));
        }
        checked_field::<R>(name)?;
    }
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn create<R: Record>(&self, fields: Fields) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set::<R>(&id, fields)?;
        Ok(id)
    }

    fn set<R: Record>(&self, id: &str, fields: Fields) -> Result<()> {
        check_fields::<R>(&fields)?;
        let cols: Vec<String> = fields.iter().map(|(n, _)| format!("\"{}\"", n)).collect();
        let marks = vec!["?"; fields.len() + 1].join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} (id, {}) VALUES ({})",
            R::COLLECTION,
            cols.join(", "),
            marks
        );
        let mut params = vec![Value::Text(id.to_string())];
        params.extend(fields.into_iter().map(|(_, v)| v));
        self.conn.execute(&sql, params_from_iter(params.iter()))?;
        debug!(collection = R::COLLECTION, id, "record written");
        self.notify(R::COLLECTION);
        Ok(())
    }

    fn update<R: Record>(&self, id: &str, fields: Fields) -> Result<()> {
        check_fields::<R>(&fields)?;
        let sets: Vec<String> = fields.iter().map(|(n, _)| format!("\"{}\" = ?", n)).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            R::COLLECTION,
            sets.join(", ")
        );
        let mut params: Vec<Value> = fields.into_iter().map(|(_, v)| v).collect();
        params.push(Value::Text(id.to_string()));
        let changed = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        if changed == 0 {
            return Err(Error::NotFound(format!("{} '{}'", R::COLLECTION, id)));
        }
        debug!(collection = R::COLLECTION, id, "record updated");
        self.notify(R::COLLECTION);
        Ok(())
    }

    fn delete<R: Record>(&self, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::COLLECTION);
        let changed = self.conn.execute(&sql, [id])?;
        if changed == 0 {
            debug!(collection = R::COLLECTION, id, "delete of missing record ignored");
            return Ok(());
        }
        debug!(collection = R::COLLECTION, id, "record deleted");
        self.notify(R::COLLECTION);
        Ok(())
    }

    fn get_one<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let sql = format!("{} WHERE id = ?1", select_clause::<R>());
        let rec = self
            .conn
            .query_row(&sql, [id], |r| R::from_row(r))
            .optional()?;
        Ok(rec)
    }

    fn query<R: Record>(&self, query: &Query) -> Result<Vec<R>> {
        let (sql, params) = query.to_sql::<R>()?;
        debug!(collection = R::COLLECTION, %sql, "query");
        Ok(run_query::<R>(&self.conn, &sql, &params)?)
    }

    fn subscribe<R: Record>(&self, query: Query) -> Result<Subscription<R>> {
        let (sql, params) = query.to_sql::<R>()?;
        let (tx, rx): (Sender<Vec<R>>, Receiver<Vec<R>>) = mpsc::channel();

        let id = {
            let mut reg = self.registry.borrow_mut();
            reg.next_id += 1;
            reg.next_id
        };
        let refresh = move |conn: &Connection| -> Delivery {
            match run_query::<R>(conn, &sql, &params) {
                Ok(rows) => {
                    debug!(subscription = id, rows = rows.len(), "snapshot delivered");
                    if tx.send(rows).is_ok() {
                        Delivery::Sent
                    } else {
                        Delivery::Closed
                    }
                }
                Err(e) => {
                    warn!(subscription = id, error = %e, "subscription query failed");
                    Delivery::Failed
                }
            }
        };

        // Initial snapshot; a failing query leaves the subscription silent.
        refresh(&self.conn);
        self.registry.borrow_mut().listeners.push(Listener {
            id,
            collection: R::COLLECTION,
            refresh: Box::new(refresh),
        });
        debug!(subscription = id, collection = R::COLLECTION, "subscribed");

        Ok(Subscription {
            id,
            rx,
            registry: Rc::downgrade(&self.registry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(name: &str) -> Category {
        Category {
            id: String::new(),
            user_id: "u1".into(),
            name: name.into(),
            cat_type: TxType::Expense,
        }
    }

    fn store() -> SqliteStore {
        SqliteStore::new(crate::db::open_in_memory().unwrap())
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        let err = Query::new()
            .filter("userId", Op::Eq, "u1")
            .to_sql::<Category>()
            .unwrap_err();
        assert!(err.to_string().contains("no field 'userId'"));
    }

    #[test]
    fn cursor_sql_breaks_ties_on_id() {
        let mut c = cat("Food");
        c.id = "abc".into();
        let pos = Position::of(&c, "name").unwrap();
        let (sql, params) = Query::new()
            .order_by("name", Direction::Asc)
            .start_after(pos)
            .limit(2)
            .to_sql::<Category>()
            .unwrap();
        assert!(sql.contains("(\"name\" > ? OR (\"name\" = ? AND id > ?))"));
        assert!(sql.ends_with("ORDER BY \"name\" ASC, id ASC LIMIT ?"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn duplicate_names_page_without_loss() {
        let s = store();
        for _ in 0..3 {
            s.create::<Category>(cat("Same").fields()).unwrap();
        }
        let q = Query::new().order_by("name", Direction::Asc).limit(2);
        let first: Vec<Category> = s.query(&q).unwrap();
        let pos = Position::of(&first[1], "name").unwrap();
        let rest: Vec<Category> = s.query(&q.clone().start_after(pos)).unwrap();
        assert_eq!(first.len() + rest.len(), 3);
        assert!(rest.iter().all(|r| first.iter().all(|f| f.id != r.id)));
    }

    #[test]
    fn update_of_missing_record_is_not_found() {
        let s = store();
        let err = s
            .update::<Category>("nope", vec![("name", "X".into())])
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn dropped_subscription_leaves_registry() {
        let s = store();
        let sub = s.subscribe::<Category>(Query::new()).unwrap();
        assert_eq!(s.active_subscriptions(), 1);
        drop(sub);
        assert_eq!(s.active_subscriptions(), 0);
    }
}
