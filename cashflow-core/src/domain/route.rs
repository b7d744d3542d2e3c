//! URL query state of the home page
//!
//! Every piece of transient UI state lives in the query string so that a
//! reload, back/forward navigation or a shared link lands on the same screen:
//!
//! | Key      | Values                              | Default |
//! |----------|-------------------------------------|---------|
//! | `filter` | `all`, `income`, `outcome`, `deleted` | `all`   |
//! | `page`   | positive integer                    | `1`     |
//! | `limit`  | positive integer                    | `10`    |
//! | `modal`  | `new`, `edit`                       | closed  |
//! | `id`     | transaction id (with `modal=edit`)  |         |
//! | `amount` | draft amount of the new form        |         |
//! | `type`   | draft type of the new form          |         |
//!
//! Parsing never fails: malformed values fall back to their defaults.

use std::fmt;

use serde::Serialize;
use url::form_urlencoded;

use super::query::{Filter, ListQuery, DEFAULT_PAGE_SIZE};
use super::transaction::TransactionType;

/// Open modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "modal", content = "id", rename_all = "lowercase")]
pub enum Modal {
    New,
    Edit(String),
}

impl Modal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modal::New => "new",
            Modal::Edit(_) => "edit",
        }
    }
}

/// Typed view of the query string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchParams {
    pub filter: Filter,
    pub page: u32,
    pub limit: u32,
    pub modal: Option<Modal>,
    /// Draft amount typed in the new-transaction form (masked text)
    pub amount: Option<String>,
    /// Draft type selected in the new-transaction form
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            filter: Filter::All,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            modal: None,
            amount: None,
            kind: None,
        }
    }
}

impl SearchParams {
    /// Parse a URL, a path with a query, `?query` or a bare query string
    pub fn parse(raw: &str) -> Self {
        Self::from_pairs(form_urlencoded::parse(query_part(raw).as_bytes()))
    }

    /// Build from decoded key/value pairs; the last occurrence of a key wins
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::default();
        let mut modal: Option<String> = None;
        let mut id: Option<String> = None;

        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "filter" => params.filter = value.parse().unwrap_or_default(),
                "page" => params.page = positive_or(value, 1),
                "limit" => params.limit = positive_or(value, DEFAULT_PAGE_SIZE),
                "modal" => modal = Some(value.to_ascii_lowercase()),
                "id" => id = Some(value.to_string()).filter(|v| !v.is_empty()),
                "amount" => params.amount = Some(value.to_string()).filter(|v| !v.is_empty()),
                "type" => params.kind = value.parse().ok(),
                _ => {}
            }
        }

        params.modal = match (modal.as_deref(), id) {
            (Some("new"), _) => Some(Modal::New),
            (Some("edit"), Some(id)) => Some(Modal::Edit(id)),
            _ => None,
        };

        params
    }

    /// Canonical query string (without the leading `?`)
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair("filter", self.filter.as_str())
            .append_pair("page", &self.page.to_string())
            .append_pair("limit", &self.limit.to_string());

        if let Some(modal) = &self.modal {
            serializer.append_pair("modal", modal.as_str());
            if let Modal::Edit(id) = modal {
                serializer.append_pair("id", id);
            }
        }
        if let Some(amount) = &self.amount {
            serializer.append_pair("amount", amount);
        }
        if let Some(kind) = self.kind {
            serializer.append_pair("type", kind.as_str());
        }

        serializer.finish()
    }

    /// Listing this state asks for
    pub fn list_query(&self) -> ListQuery {
        ListQuery::new(self.filter, self.page, self.limit)
    }

    /// Id of the transaction being edited
    pub fn editing_id(&self) -> Option<&str> {
        match &self.modal {
            Some(Modal::Edit(id)) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Copy of this state with the modal and every draft field removed
    pub fn without_modal(&self) -> Self {
        Self {
            modal: None,
            amount: None,
            kind: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/?{}", self.to_query())
    }
}

fn query_part(raw: &str) -> &str {
    let raw = raw.trim();
    let without_fragment = raw.split('#').next().unwrap_or("");
    match without_fragment.split_once('?') {
        Some((_, query)) => query,
        // No `?`: a bare query when it looks like one, otherwise a plain path
        None if without_fragment.contains('=') => without_fragment,
        None => "",
    }
}

fn positive_or(value: &str, default: u32) -> u32 {
    match value.parse::<i64>() {
        Ok(n) if n > 0 => u32::try_from(n).unwrap_or(default),
        _ => default,
    }
}
