// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Derived views over a transaction snapshot: totals, a per-day series and
//! per-category totals split by type.
//!
//! Everything is rebuilt from the input on each call. Daily buckets and
//! category totals come out in the order their key is first seen, so a
//! date-sorted input yields a date-sorted series.

use std::collections::HashMap;

use chrono::Datelike;

use crate::models::{CategoryTotal, DailyBucket, Summary, Transaction, TxType};
use crate::utils::date_key;

/// Accumulates sums under string keys while remembering first-seen order.
struct Ordered<T> {
    index: HashMap<String, usize>,
    items: Vec<T>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T> Ordered<T> {
    fn slot(&mut self, key: &str, make: impl FnOnce() -> T) -> &mut T {
        let idx = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.items.push(make());
                self.index.insert(key.to_string(), self.items.len() - 1);
                self.items.len() - 1
            }
        };
        &mut self.items[idx]
    }
}

pub fn aggregate(transactions: &[Transaction]) -> Summary {
    let mut daily: Ordered<DailyBucket> = Ordered::default();
    let mut income_cats: Ordered<CategoryTotal> = Ordered::default();
    let mut expense_cats: Ordered<CategoryTotal> = Ordered::default();
    let mut total_income = 0i64;
    let mut total_expense = 0i64;

    for tx in transactions {
        let key = date_key(&tx.date);
        let bucket = daily.slot(&key, || DailyBucket {
            date_key: key.clone(),
            income: 0,
            expense: 0,
        });
        // Sums saturate at i64::MAX. Blank category names are kept as their own group.
        let by_category = match tx.tx_type {
            TxType::Income => {
                total_income = total_income.saturating_add(tx.amount);
                bucket.income = bucket.income.saturating_add(tx.amount);
                &mut income_cats
            }
            TxType::Expense => {
                total_expense = total_expense.saturating_add(tx.amount);
                bucket.expense = bucket.expense.saturating_add(tx.amount);
                &mut expense_cats
            }
        };
        let total = by_category.slot(&tx.category_name, || CategoryTotal {
            name: tx.category_name.clone(),
            value: 0,
        });
        total.value = total.value.saturating_add(tx.amount);
    }

    Summary {
        total_income,
        total_expense,
        daily_series: daily.items,
        income_by_category: income_cats.items,
        expense_by_category: expense_cats.items,
    }
}

/// Transactions whose calendar date lies in `year`-`month`, in input order.
pub fn filter_month(transactions: &[Transaction], year: i32, month: u32) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.date.year() == year && tx.date.month() == month)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(date: &str, tx_type: TxType, amount: i64, category: &str) -> Transaction {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Transaction {
            id: format!("{}-{}-{}", date, category, amount),
            user_id: "u1".into(),
            amount,
            tx_type,
            category_id: format!("cat-{}", category),
            category_name: category.into(),
            note: None,
            date: day.and_hms_opt(9, 0, 0).unwrap(),
            created_at: day.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(aggregate(&[]), Summary::default());
    }

    #[test]
    fn same_day_income_and_expense_share_a_bucket() {
        let s = aggregate(&[
            tx("2024-01-01", TxType::Income, 1000, "Salary"),
            tx("2024-01-01", TxType::Expense, 300, "Food"),
        ]);
        assert_eq!(s.total_income, 1000);
        assert_eq!(s.total_expense, 300);
        assert_eq!(s.balance(), 700);
        assert_eq!(
            s.daily_series,
            vec![DailyBucket {
                date_key: "2024-01-01".into(),
                income: 1000,
                expense: 300
            }]
        );
        assert_eq!(
            s.income_by_category,
            vec![CategoryTotal {
                name: "Salary".into(),
                value: 1000
            }]
        );
        assert_eq!(
            s.expense_by_category,
            vec![CategoryTotal {
                name: "Food".into(),
                value: 300
            }]
        );
    }

    #[test]
    fn series_keeps_first_seen_order() {
        let s = aggregate(&[
            tx("2024-03-05", TxType::Expense, 10, "Food"),
            tx("2024-03-01", TxType::Expense, 20, "Rent"),
            tx("2024-03-05", TxType::Expense, 5, "Food"),
        ]);
        let keys: Vec<&str> = s.daily_series.iter().map(|b| b.date_key.as_str()).collect();
        assert_eq!(keys, ["2024-03-05", "2024-03-01"]);
        assert_eq!(s.expense_by_category[0].value, 15);
        assert_eq!(s.expense_by_category[1].name, "Rent");
    }

    #[test]
    fn blank_category_is_its_own_group() {
        let s = aggregate(&[
            tx("2024-03-05", TxType::Income, 10, ""),
            tx("2024-03-06", TxType::Income, 7, ""),
        ]);
        assert_eq!(
            s.income_by_category,
            vec![CategoryTotal {
                name: String::new(),
                value: 17
            }]
        );
    }

    #[test]
    fn every_amount_lands_in_one_bucket() {
        let mut input = Vec::new();
        for day in 1..=28u32 {
            let kind = if day % 3 == 0 {
                TxType::Income
            } else {
                TxType::Expense
            };
            input.push(tx(
                &format!("2024-02-{:02}", day),
                kind,
                (day as i64) * 1_250,
                if day % 2 == 0 { "Even" } else { "Odd" },
            ));
            input.push(tx(&format!("2024-02-{:02}", day), TxType::Expense, 3, "Fee"));
        }
        let s = aggregate(&input);
        let all: i64 = input.iter().map(|t| t.amount).sum();
        let income: i64 = input
            .iter()
            .filter(|t| t.tx_type == TxType::Income)
            .map(|t| t.amount)
            .sum();
        let bucketed: i64 = s.daily_series.iter().map(|b| b.income + b.expense).sum();
        let by_cat: i64 = s
            .income_by_category
            .iter()
            .chain(s.expense_by_category.iter())
            .map(|c| c.value)
            .sum();
        assert_eq!(bucketed, all);
        assert_eq!(by_cat, all);
        assert_eq!(s.total_income, income);
        assert_eq!(s.total_expense, all - income);
        assert_eq!(s.daily_series.len(), 28);
    }

    #[test]
    fn huge_amounts_saturate_instead_of_wrapping() {
        let s = aggregate(&[
            tx("2024-02-10", TxType::Income, i64::MAX, "Windfall"),
            tx("2024-02-10", TxType::Income, i64::MAX, "Windfall"),
            tx("2024-02-11", TxType::Expense, i64::MAX, "Rent"),
            tx("2024-02-11", TxType::Expense, 1, "Rent"),
        ]);
        assert_eq!(s.total_income, i64::MAX);
        assert_eq!(s.total_expense, i64::MAX);
        assert_eq!(s.daily_series[0].income, i64::MAX);
        assert_eq!(s.income_by_category[0].value, i64::MAX);
        assert_eq!(s.expense_by_category[0].value, i64::MAX);
        assert_eq!(s.balance(), 0);
    }

    #[test]
    fn month_filter_keeps_order() {
        let input = vec![
            tx("2024-02-10", TxType::Income, 1, "A"),
            tx("2024-01-31", TxType::Income, 2, "A"),
            tx("2024-02-01", TxType::Income, 3, "A"),
            tx("2023-02-15", TxType::Income, 4, "A"),
        ];
        let feb = filter_month(&input, 2024, 2);
        let amounts: Vec<i64> = feb.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, [1, 3]);
    }
}
