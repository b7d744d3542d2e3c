//! User-facing messages: notifications and empty states

use serde::Serialize;

use crate::domain::{Filter, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Short-lived message shown after an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: Option<String>,
}

impl Notification {
    fn success(title: &str, description: &str) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.to_string(),
            description: Some(description.to_string()),
        }
    }

    pub fn created(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Income => Self::success("Income added", "You can see it in the list"),
            TransactionType::Outcome => Self::success("Outcome added", "You can see it in the list"),
        }
    }

    pub fn updated(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Income => Self::success("Income updated", "You can see it in the list"),
            TransactionType::Outcome => {
                Self::success("Outcome updated", "You can see it in the list")
            }
        }
    }

    pub fn deleted() -> Self {
        Self::success("Transaction deleted", "You can find it in the deleted tab")
    }

    pub fn restored() -> Self {
        Self::success("Transaction restored", "It is back in the list")
    }

    /// A save that reached the backend and failed
    pub fn save_failed(reason: &str) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: "Could not save".to_string(),
            description: Some(format!(
                "An error occurred while saving the transaction ({})",
                reason
            )),
        }
    }

    /// Any other failed action
    pub fn failed(title: &str, reason: &str) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.to_string(),
            description: Some(reason.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Title and hint shown when a tab has no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub title: &'static str,
    pub description: &'static str,
}

pub fn empty_state(filter: Filter) -> EmptyState {
    match filter {
        Filter::All => EmptyState {
            title: "No transactions yet",
            description: "Add a new value, or open the deleted tab to bring an old one back.",
        },
        Filter::Income => EmptyState {
            title: "No income yet",
            description: "Add a new value to record your first income.",
        },
        Filter::Outcome => EmptyState {
            title: "No outcome yet",
            description: "Add a new value to record your first outcome.",
        },
        Filter::Deleted => EmptyState {
            title: "No deleted transactions",
            description: "All your transactions are active.",
        },
    }
}
