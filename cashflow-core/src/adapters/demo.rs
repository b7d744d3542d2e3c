//! Demo data generator
//!
//! Produces a deterministic set of transactions for demo mode:
//! - 24 records spread over the last 60 days
//! - a mix of salary-like incomes and everyday outcomes
//! - two soft-deleted records so the deleted tab is not empty

use chrono::{Duration, Utc};

use crate::domain::{Transaction, TransactionType};

/// (type, amount in cents, days ago, deleted)
const DEMO_ROWS: &[(TransactionType, i64, i64, bool)] = &[
    (TransactionType::Income, 100000, 0, false),
    (TransactionType::Outcome, 4523, 1, false),
    (TransactionType::Outcome, 2999, 2, false),
    (TransactionType::Outcome, 999, 3, false),
    (TransactionType::Income, 35000, 5, false),
    (TransactionType::Outcome, 5200, 6, false),
    (TransactionType::Outcome, 450, 8, true),
    (TransactionType::Outcome, 1250, 9, false),
    (TransactionType::Outcome, 19900, 11, false),
    (TransactionType::Income, 350000, 14, false),
    (TransactionType::Outcome, 8790, 16, false),
    (TransactionType::Outcome, 3200, 18, false),
    (TransactionType::Income, 250, 21, false),
    (TransactionType::Outcome, 15000, 24, true),
    (TransactionType::Outcome, 6400, 27, false),
    (TransactionType::Outcome, 120000, 30, false),
    (TransactionType::Income, 350000, 32, false),
    (TransactionType::Outcome, 2350, 35, false),
    (TransactionType::Outcome, 999, 38, false),
    (TransactionType::Income, 18000, 41, false),
    (TransactionType::Outcome, 7420, 45, false),
    (TransactionType::Outcome, 2999, 50, false),
    (TransactionType::Outcome, 11000, 55, false),
    (TransactionType::Income, 350000, 60, false),
];

/// Generate demo transactions, newest first
pub fn generate_demo_transactions() -> Vec<Transaction> {
    let now = Utc::now();

    DEMO_ROWS
        .iter()
        .enumerate()
        .map(|(i, &(kind, amount, days_ago, deleted))| {
            let created_at = now - Duration::days(days_ago) - Duration::minutes(i as i64);
            Transaction {
                id: format!("demo_{:03}", i + 1),
                kind,
                amount,
                deleted_at: deleted.then(|| created_at + Duration::days(1)),
                created_at,
                updated_at: if deleted {
                    created_at + Duration::days(1)
                } else {
                    created_at
                },
            }
        })
        .collect()
}
