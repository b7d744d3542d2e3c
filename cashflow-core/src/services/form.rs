//! Transaction form controller
//!
//! Holds what the user typed in the new/edit modal. The amount is masked on
//! every keystroke and validated only on submit; validation failures stay on
//! the form and never reach the backend.

use serde::Serialize;

use super::notifications::Notification;
use super::transactions::TransactionService;
use crate::domain::currency::{format_amount, mask_currency};
use crate::domain::result::Error;
use crate::domain::validation::{validate_form, Field, ValidationErrors};
use crate::domain::{Transaction, TransactionInput, TransactionType};

/// Which modal the form belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "id", rename_all = "lowercase")]
pub enum FormMode {
    New,
    Edit(String),
}

/// What happened on submit
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Saved; the modal should close
    Saved {
        transaction: Transaction,
        notification: Notification,
    },
    /// Kept open with inline errors, nothing was sent
    Invalid(ValidationErrors),
    /// Kept open with the input intact
    Failed { error: Error, notification: Notification },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionForm {
    mode: FormMode,
    amount: String,
    kind: TransactionType,
    errors: ValidationErrors,
}

impl TransactionForm {
    /// New-transaction form prefilled from URL drafts
    pub fn new_entry(draft_amount: Option<&str>, draft_type: Option<TransactionType>) -> Self {
        Self {
            mode: FormMode::New,
            amount: draft_amount.map(mask_currency).unwrap_or_default(),
            kind: draft_type.unwrap_or_default(),
            errors: ValidationErrors::default(),
        }
    }

    /// Edit form prefilled from a stored record
    pub fn edit(tx: &Transaction) -> Self {
        Self {
            mode: FormMode::Edit(tx.id.clone()),
            amount: format_amount(tx.amount),
            kind: tx.kind,
            errors: ValidationErrors::default(),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_new(&self) -> bool {
        self.mode == FormMode::New
    }

    /// Masked amount text
    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Inline message under the amount field
    pub fn amount_error(&self) -> Option<&str> {
        self.errors.message_for(Field::Amount)
    }

    /// Apply the input mask to what was typed; returns the masked text
    pub fn input_amount(&mut self, text: &str) -> &str {
        self.amount = mask_currency(text);
        self.errors.errors.retain(|e| e.field != Field::Amount);
        &self.amount
    }

    pub fn select_type(&mut self, kind: TransactionType) {
        self.kind = kind;
    }

    /// Values mirrored into the URL while a new form is open
    pub fn draft(&self) -> Option<(&str, TransactionType)> {
        match self.mode {
            FormMode::New => Some((self.amount.as_str(), self.kind)),
            FormMode::Edit(_) => None,
        }
    }

    /// Validate without submitting, keeping any errors on the form
    pub fn validate(&mut self) -> Result<TransactionInput, ValidationErrors> {
        let result = validate_form(&self.amount, self.kind);
        self.errors = match &result {
            Ok(_) => ValidationErrors::default(),
            Err(errors) => errors.clone(),
        };
        result
    }

    /// Validate and save through `service`
    pub async fn submit(&mut self, service: &TransactionService) -> SubmitOutcome {
        let input = match self.validate() {
            Ok(input) => input,
            Err(errors) => return SubmitOutcome::Invalid(errors),
        };

        let result = match &self.mode {
            FormMode::New => service.create(&input).await,
            FormMode::Edit(id) => service.update(id, &input).await,
        };

        match result {
            Ok(transaction) => {
                let notification = match self.mode {
                    FormMode::New => Notification::created(transaction.kind),
                    FormMode::Edit(_) => Notification::updated(transaction.kind),
                };
                SubmitOutcome::Saved {
                    transaction,
                    notification,
                }
            }
            Err(error) => SubmitOutcome::Failed {
                notification: Notification::save_failed(&error.to_string()),
                error,
            },
        }
    }
}
