//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::result::{Error, Result};

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Outcome,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Outcome => "outcome",
        }
    }
}

impl Default for TransactionType {
    fn default() -> Self {
        TransactionType::Income
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "outcome" => Ok(TransactionType::Outcome),
            other => Err(Error::validation(format!(
                "unknown transaction type '{}' (expected income or outcome)",
                other
            ))),
        }
    }
}

/// A single income or outcome record as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Server-assigned identifier (json-server may hand out numbers or strings)
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Amount in minor units (cents), always positive
    pub amount: i64,
    /// Soft delete timestamp
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new active transaction stamped with the current time
    pub fn new(id: impl Into<String>, kind: TransactionType, amount: i64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind,
            amount,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record has been soft deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply a partial update the way the backend does (PATCH merge)
    pub fn apply_patch(&mut self, patch: &TransactionPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(deleted_at) = patch.deleted_at {
            self.deleted_at = deleted_at;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at.max(self.created_at);
        }
    }
}

/// Payload for creating a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
}

impl TransactionInput {
    pub fn new(kind: TransactionType, amount: i64) -> Self {
        Self { kind, amount }
    }

    /// Payload-level rule: the minor-unit amount must be strictly positive
    pub fn validate(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(Error::validation("amount must be greater than zero"));
        }
        Ok(())
    }
}

/// Partial update sent with PATCH
///
/// `deleted_at` is tri-state: `None` leaves the field alone, `Some(None)`
/// clears it (restore) and `Some(Some(ts))` sets it (soft delete).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_tristate"
    )]
    pub deleted_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TransactionPatch {
    /// Edit of type and/or amount
    pub fn edit(kind: Option<TransactionType>, amount: Option<i64>) -> Self {
        Self {
            kind,
            amount,
            deleted_at: None,
            updated_at: Some(Utc::now()),
        }
    }

    /// Soft delete: stamp `deletedAt` with the current time
    pub fn soft_delete() -> Self {
        let now = Utc::now();
        Self {
            deleted_at: Some(Some(now)),
            updated_at: Some(now),
            ..Default::default()
        }
    }

    /// Restore: clear `deletedAt`
    pub fn restore() -> Self {
        Self {
            deleted_at: Some(None),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            if amount <= 0 {
                return Err(Error::validation("amount must be greater than zero"));
            }
        }
        Ok(())
    }
}

/// Body sent with POST: the input plus the bookkeeping fields json-server
/// will not fill in by itself
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionBody {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TransactionInput> for NewTransactionBody {
    fn from(input: &TransactionInput) -> Self {
        let now = Utc::now();
        Self {
            kind: input.kind,
            amount: input.amount,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Deserialize ID that can be number or string
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::String(s) => Ok(s),
        _ => Err(D::Error::custom("expected number or string for id")),
    }
}

/// Distinguish an absent field from an explicit `null`
fn deserialize_tristate<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<DateTime<Utc>>::deserialize(deserializer).map(Some)
}
