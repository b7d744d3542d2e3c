//! Home page view model
//!
//! Glues the URL state, the transaction service and the modal form into
//! what a front-end renders: the active tab, one page of rows, pagination,
//! the open form and pending notifications. Every change of URL state goes
//! through the [`UrlStateController`] and is followed by a reload, so the
//! view is always a function of the current URL.

use std::sync::Arc;

use super::form::{FormMode, SubmitOutcome, TransactionForm};
use super::logging::LoggingService;
use super::navigation::UrlStateController;
use super::notifications::{empty_state, EmptyState, Notification};
use super::query_cache::FetchState;
use super::transactions::TransactionService;
use crate::domain::query::visible_pages;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Filter, ListQuery, Modal, Page, PageItem, SearchParams, Transaction, TransactionType,
};

/// Action offered on every row of the current tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Delete,
    Restore,
}

impl RowAction {
    pub fn for_filter(filter: Filter) -> Self {
        match filter {
            Filter::Deleted => RowAction::Restore,
            _ => RowAction::Delete,
        }
    }
}

/// Snapshot of everything the home page shows
#[derive(Debug, Clone)]
pub struct HomeView {
    pub url: String,
    pub filter: Filter,
    pub page: u32,
    pub limit: u32,
    pub list: FetchState<Page<Transaction>>,
    /// Set when the list loaded and has no rows
    pub empty_state: Option<EmptyState>,
    pub pagination: Vec<PageItem>,
    pub show_pagination: bool,
    pub row_action: RowAction,
    pub modal: Option<Modal>,
    pub form: Option<TransactionForm>,
    pub notifications: Vec<Notification>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

pub struct HomePage {
    service: Arc<TransactionService>,
    nav: UrlStateController,
    list_key: ListQuery,
    list: FetchState<Page<Transaction>>,
    form: Option<TransactionForm>,
    notifications: Vec<Notification>,
    logger: Option<Arc<LoggingService>>,
}

impl HomePage {
    /// Build the page for `url`; nothing is fetched until [`HomePage::load`]
    pub fn open(service: Arc<TransactionService>, url: &str) -> Self {
        let nav = UrlStateController::from_url(url);
        let list_key = nav.current().list_query();
        Self {
            service,
            nav,
            list_key,
            list: FetchState::Pending,
            form: None,
            notifications: Vec::new(),
            logger: None,
        }
    }

    /// Record every URL change in the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn search(&self) -> &SearchParams {
        self.nav.current()
    }

    pub fn url(&self) -> String {
        self.nav.url()
    }

    pub fn form(&self) -> Option<&TransactionForm> {
        self.form.as_ref()
    }

    /// Fetch what the current URL asks for: the list and, for an edit
    /// modal, the record being edited
    pub async fn load(&mut self) {
        let key = self.nav.current().list_query();
        if key != self.list_key {
            self.list_key = key;
            self.list = FetchState::Pending;
        }

        let result = self.service.list(&key).await;
        self.apply_list(key, result);
        self.sync_form().await;
    }

    /// Store a list result unless it belongs to a key the page has moved
    /// away from; returns whether it was applied
    pub fn apply_list(&mut self, key: ListQuery, result: Result<Page<Transaction>>) -> bool {
        if key != self.nav.current().list_query() {
            return false;
        }
        self.list_key = key;
        self.list = match result {
            Ok(page) => FetchState::Success(page),
            Err(e) => FetchState::Error(e),
        };
        true
    }

    /// Make the form match the modal in the URL
    async fn sync_form(&mut self) {
        let search = self.nav.current().clone();
        match &search.modal {
            None => self.form = None,
            Some(Modal::New) => {
                if !self.form.as_ref().is_some_and(|f| f.is_new()) {
                    self.form = Some(TransactionForm::new_entry(
                        search.amount.as_deref(),
                        search.kind,
                    ));
                }
            }
            Some(Modal::Edit(id)) => {
                let loaded = self
                    .form
                    .as_ref()
                    .is_some_and(|f| f.mode() == &FormMode::Edit(id.clone()));
                if loaded {
                    return;
                }
                match self.service.get(id).await {
                    Ok(tx) => self.form = Some(TransactionForm::edit(&tx)),
                    Err(e) => {
                        self.form = None;
                        self.notifications.push(Notification::failed(
                            "Could not open transaction",
                            &e.to_string(),
                        ));
                        self.nav.replace(|p| *p = p.without_modal());
                    }
                }
            }
        }
    }

    fn page_opened(&self) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_page(&self.nav.url());
        }
    }

    async fn after_navigation(&mut self) {
        self.page_opened();
        self.load().await;
    }

    pub async fn select_filter(&mut self, filter: Filter) {
        self.nav.select_filter(filter);
        self.after_navigation().await;
    }

    pub async fn set_page(&mut self, page: u32) {
        self.nav.set_page(page);
        self.after_navigation().await;
    }

    pub async fn set_limit(&mut self, limit: u32) {
        self.nav.set_limit(limit);
        self.after_navigation().await;
    }

    pub async fn open_new(&mut self) {
        self.form = None;
        self.nav.open_new();
        self.after_navigation().await;
    }

    pub async fn open_edit(&mut self, id: &str) {
        self.nav.open_edit(id);
        self.after_navigation().await;
    }

    /// Close the form (explicit close, dismiss or cancel)
    pub async fn close_modal(&mut self) {
        self.nav.close_modal();
        self.form = None;
        self.after_navigation().await;
    }

    /// Browser back; returns false at the first entry
    pub async fn back(&mut self) -> bool {
        if self.nav.back().is_none() {
            return false;
        }
        self.after_navigation().await;
        true
    }

    /// Browser forward; returns false at the last entry
    pub async fn forward(&mut self) -> bool {
        if self.nav.forward().is_none() {
            return false;
        }
        self.after_navigation().await;
        true
    }

    /// Type into the amount field; new-form drafts are mirrored to the URL
    pub fn input_amount(&mut self, text: &str) -> Result<String> {
        let form = self.form.as_mut().ok_or_else(no_form)?;
        let masked = form.input_amount(text).to_string();
        self.mirror_draft();
        Ok(masked)
    }

    pub fn select_type(&mut self, kind: TransactionType) -> Result<()> {
        let form = self.form.as_mut().ok_or_else(no_form)?;
        form.select_type(kind);
        self.mirror_draft();
        Ok(())
    }

    fn mirror_draft(&mut self) {
        if let Some((amount, kind)) = self.form.as_ref().and_then(|f| f.draft()) {
            let amount = amount.to_string();
            self.nav.set_draft(&amount, kind);
        }
    }

    /// Submit the open form; on success the modal closes and the list reloads
    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        let form = self.form.as_mut().ok_or_else(no_form)?;
        let outcome = form.submit(&self.service).await;

        match &outcome {
            SubmitOutcome::Saved { notification, .. } => {
                self.notifications.push(notification.clone());
                self.form = None;
                self.nav.close_modal();
                self.after_navigation().await;
            }
            SubmitOutcome::Failed { notification, .. } => {
                self.notifications.push(notification.clone());
            }
            SubmitOutcome::Invalid(_) => {}
        }
        Ok(outcome)
    }

    /// Soft delete a row of an active tab
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        if RowAction::for_filter(self.nav.current().filter) != RowAction::Delete {
            return Err(Error::validation("rows of the deleted tab can only be restored"));
        }
        match self.service.soft_delete(id).await {
            Ok(_) => {
                self.notifications.push(Notification::deleted());
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifications
                    .push(Notification::failed("Could not delete", &e.to_string()));
                Err(e)
            }
        }
    }

    /// Restore a row of the deleted tab
    pub async fn restore(&mut self, id: &str) -> Result<()> {
        if RowAction::for_filter(self.nav.current().filter) != RowAction::Restore {
            return Err(Error::validation("only rows of the deleted tab can be restored"));
        }
        match self.service.restore(id).await {
            Ok(_) => {
                self.notifications.push(Notification::restored());
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.notifications
                    .push(Notification::failed("Could not restore", &e.to_string()));
                Err(e)
            }
        }
    }

    /// Drop the cached list and fetch it again
    pub async fn refresh(&mut self) {
        let key = self.nav.current().list_query();
        let result = self.service.refresh(&key).await;
        self.apply_list(key, result);
    }

    /// Hand pending notifications to the caller
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn view(&self) -> HomeView {
        let search = self.nav.current();
        let (total_pages, empty) = match &self.list {
            FetchState::Success(page) => (page.total_pages, page.is_empty()),
            _ => (0, false),
        };

        HomeView {
            url: self.nav.url(),
            filter: search.filter,
            page: search.page,
            limit: search.limit,
            list: self.list.clone(),
            empty_state: empty.then(|| empty_state(search.filter)),
            pagination: visible_pages(search.page, total_pages),
            show_pagination: total_pages > 1,
            row_action: RowAction::for_filter(search.filter),
            modal: search.modal.clone(),
            form: self.form.clone(),
            notifications: self.notifications.clone(),
            can_go_back: self.nav.can_go_back(),
            can_go_forward: self.nav.can_go_forward(),
        }
    }
}

fn no_form() -> Error {
    Error::validation("no transaction form is open")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryApi;

    async fn page(url: &str) -> HomePage {
        let service = Arc::new(TransactionService::new(Arc::new(InMemoryApi::demo())));
        let mut home = HomePage::open(service, url);
        home.load().await;
        home
    }

    #[tokio::test]
    async fn test_view_reflects_url() {
        let home = page("/?filter=outcome&page=1&limit=5").await;
        let view = home.view();

        assert_eq!(view.filter, Filter::Outcome);
        assert_eq!(view.limit, 5);
        assert_eq!(view.row_action, RowAction::Delete);
        let data = view.list.data().unwrap();
        assert_eq!(data.data.len(), 5);
        assert!(view.show_pagination);
        assert_eq!(view.pagination.first(), Some(&PageItem::Page(1)));
        assert!(view.empty_state.is_none());
    }

    #[tokio::test]
    async fn test_empty_tab_shows_message() {
        let service = Arc::new(TransactionService::new(Arc::new(InMemoryApi::new(Vec::new()))));
        let mut home = HomePage::open(service, "/?filter=deleted");
        home.load().await;

        let view = home.view();
        assert_eq!(view.empty_state, Some(empty_state(Filter::Deleted)));
        assert!(!view.show_pagination);
        assert_eq!(view.row_action, RowAction::Restore);
    }

    #[tokio::test]
    async fn test_stale_result_is_ignored() {
        let mut home = page("/?filter=all").await;
        let old_key = home.search().list_query();
        home.select_filter(Filter::Income).await;

        let stale = Ok(Page::new(Vec::new(), 0, 1, 10));
        assert!(!home.apply_list(old_key, stale));
        assert!(!home.view().list.data().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_modal_loads_record() {
        let home = page("/?modal=edit&id=demo_001").await;
        let form = home.form().unwrap();
        assert_eq!(form.amount(), "1.000,00");
        assert_eq!(form.kind(), TransactionType::Income);
    }

    #[tokio::test]
    async fn test_edit_modal_for_missing_record_closes() {
        let mut home = page("/?modal=edit&id=nope").await;
        assert!(home.form().is_none());
        assert!(home.search().modal.is_none());
        assert!(home.take_notifications()[0].is_error());
    }

    #[tokio::test]
    async fn test_drafts_follow_typing() {
        let mut home = page("/").await;
        home.open_new().await;
        home.input_amount("2550").unwrap();
        home.select_type(TransactionType::Outcome).unwrap();

        assert_eq!(
            home.url(),
            "/?filter=all&page=1&limit=10&modal=new&amount=25%2C50&type=outcome"
        );
    }

    #[tokio::test]
    async fn test_restore_only_on_deleted_tab() {
        let mut home = page("/").await;
        assert!(matches!(home.restore("demo_007").await, Err(Error::Validation(_))));
    }
}
