//! Transaction form validation
//!
//! Turns what the user typed into a `TransactionInput`, or into a list of
//! field errors to show next to the inputs. Nothing here performs I/O; a form
//! that fails validation never reaches the API.

use rust_decimal::Decimal;
use serde::Serialize;

use super::currency::{parse_major_units, to_minor_units};
use super::transaction::{TransactionInput, TransactionType};

pub const MSG_AMOUNT_REQUIRED: &str = "Enter an amount";
pub const MSG_AMOUNT_NOT_NUMERIC: &str = "Amount must be numeric";
pub const MSG_AMOUNT_ZERO: &str = "Amount must be different from 0,00";
pub const MSG_AMOUNT_NEGATIVE: &str = "Amount must be positive";
pub const MSG_AMOUNT_TOO_SMALL: &str = "Amount must be at least 0,01";

/// Smallest distinguishable amount, in major units
fn min_amount() -> Decimal {
    Decimal::new(1, 2)
}

/// Form field a validation message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Amount,
    Type,
}

/// Inline validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    fn amount(message: &str) -> Self {
        Self {
            field: Field::Amount,
            message: message.to_string(),
        }
    }
}

/// All validation failures for one submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// First message for a field, the one shown inline
    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Validate the amount text of the transaction form
///
/// Returns the amount in major units.
pub fn validate_amount(text: &str) -> Result<Decimal, FieldError> {
    if text.trim().is_empty() {
        return Err(FieldError::amount(MSG_AMOUNT_REQUIRED));
    }

    let amount =
        parse_major_units(text).ok_or_else(|| FieldError::amount(MSG_AMOUNT_NOT_NUMERIC))?;

    if amount.is_zero() {
        return Err(FieldError::amount(MSG_AMOUNT_ZERO));
    }
    if amount.is_sign_negative() {
        return Err(FieldError::amount(MSG_AMOUNT_NEGATIVE));
    }
    if amount < min_amount() {
        return Err(FieldError::amount(MSG_AMOUNT_TOO_SMALL));
    }

    Ok(amount)
}

/// Validate a whole form submission and build the API payload
pub fn validate_form(
    amount_text: &str,
    kind: TransactionType,
) -> Result<TransactionInput, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    match validate_amount(amount_text) {
        Ok(major) => match to_minor_units(major) {
            Some(minor) if minor > 0 => return Ok(TransactionInput::new(kind, minor)),
            Some(_) => errors.errors.push(FieldError::amount(MSG_AMOUNT_TOO_SMALL)),
            None => errors.errors.push(FieldError::amount(MSG_AMOUNT_NOT_NUMERIC)),
        },
        Err(e) => errors.errors.push(e),
    }

    Err(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_amount_is_rejected() {
        let errors = validate_form("", TransactionType::Income).unwrap_err();
        assert_eq!(errors.message_for(Field::Amount), Some(MSG_AMOUNT_REQUIRED));
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        for text in ["0", "0,00", "R$ 0,00"] {
            let errors = validate_form(text, TransactionType::Income).unwrap_err();
            assert_eq!(errors.message_for(Field::Amount), Some(MSG_AMOUNT_ZERO), "{}", text);
        }
    }

    #[test]
    fn test_negative_and_tiny_amounts_are_rejected() {
        let errors = validate_form("-5,00", TransactionType::Outcome).unwrap_err();
        assert_eq!(errors.message_for(Field::Amount), Some(MSG_AMOUNT_NEGATIVE));

        let errors = validate_form("0,001", TransactionType::Outcome).unwrap_err();
        assert_eq!(errors.message_for(Field::Amount), Some(MSG_AMOUNT_TOO_SMALL));
    }

    #[test]
    fn test_non_numeric_amount_is_rejected() {
        let errors = validate_form("twelve", TransactionType::Income).unwrap_err();
        assert_eq!(errors.message_for(Field::Amount), Some(MSG_AMOUNT_NOT_NUMERIC));
        assert!(errors.message_for(Field::Type).is_none());
    }

    #[test]
    fn test_valid_masked_amount_becomes_minor_units() {
        let input = validate_form("1.200,00", TransactionType::Income).unwrap();
        assert_eq!(input.amount, 120000);
        assert_eq!(input.kind, TransactionType::Income);

        let input = validate_form("R$ 0,01", TransactionType::Outcome).unwrap();
        assert_eq!(input.amount, 1);
    }
}
