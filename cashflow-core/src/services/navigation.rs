//! URL-state controller
//!
//! Owns the current [`SearchParams`] and a browser-like history of them.
//! Every change builds a whole new state from the current one and either
//! pushes it (a new history entry, dropping anything forward of the cursor)
//! or replaces the current entry. Pushing a state equal to the current one
//! adds no entry.

use crate::domain::query::DEFAULT_PAGE_SIZE;
use crate::domain::route::{Modal, SearchParams};
use crate::domain::{Filter, TransactionType};

#[derive(Debug, Clone)]
pub struct UrlStateController {
    history: Vec<SearchParams>,
    cursor: usize,
}

impl Default for UrlStateController {
    fn default() -> Self {
        Self::new(SearchParams::default())
    }
}

impl UrlStateController {
    pub fn new(initial: SearchParams) -> Self {
        Self {
            history: vec![initial],
            cursor: 0,
        }
    }

    /// Start from a URL (full URL, path or query string)
    pub fn from_url(url: &str) -> Self {
        Self::new(SearchParams::parse(url))
    }

    pub fn current(&self) -> &SearchParams {
        &self.history[self.cursor]
    }

    /// Current state as a `/?query` path
    pub fn url(&self) -> String {
        self.current().to_string()
    }

    /// Push a new entry derived from the current state
    pub fn navigate(&mut self, update: impl FnOnce(&mut SearchParams)) -> &SearchParams {
        let mut next = self.current().clone();
        update(&mut next);
        if next != *self.current() {
            self.history.truncate(self.cursor + 1);
            self.history.push(next);
            self.cursor += 1;
        }
        self.current()
    }

    /// Replace the current entry with a state derived from it
    pub fn replace(&mut self, update: impl FnOnce(&mut SearchParams)) -> &SearchParams {
        let mut next = self.current().clone();
        update(&mut next);
        self.history[self.cursor] = next;
        self.current()
    }

    /// Switch tab; always lands on the first page
    pub fn select_filter(&mut self, filter: Filter) -> &SearchParams {
        self.navigate(|p| {
            p.filter = filter;
            p.page = 1;
        })
    }

    pub fn set_page(&mut self, page: u32) -> &SearchParams {
        self.navigate(|p| p.page = page.max(1))
    }

    /// Change page size; always lands on the first page
    pub fn set_limit(&mut self, limit: u32) -> &SearchParams {
        self.navigate(|p| {
            p.limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
            p.page = 1;
        })
    }

    /// Open the new-transaction form with empty drafts
    pub fn open_new(&mut self) -> &SearchParams {
        self.navigate(|p| {
            p.modal = Some(Modal::New);
            p.amount = None;
            p.kind = None;
        })
    }

    /// Open the edit form for `id`
    pub fn open_edit(&mut self, id: &str) -> &SearchParams {
        let id = id.to_string();
        self.navigate(|p| {
            *p = p.without_modal();
            p.modal = Some(Modal::Edit(id));
        })
    }

    /// Close any form, dropping its drafts
    pub fn close_modal(&mut self) -> &SearchParams {
        self.navigate(|p| *p = p.without_modal())
    }

    /// Mirror the new-transaction form into the URL without a history entry
    pub fn set_draft(&mut self, amount: &str, kind: TransactionType) -> &SearchParams {
        self.replace(|p| {
            p.amount = Some(amount.to_string()).filter(|a| !a.is_empty());
            p.kind = Some(kind);
        })
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    /// Step back; `None` at the first entry
    pub fn back(&mut self) -> Option<&SearchParams> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step forward; `None` at the last entry
    pub fn forward(&mut self) -> Option<&SearchParams> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
