//! Payment selection and local card validation.
//!
//! Validation runs before any network call on the client and again on the
//! server. Only the holder name and the last four digits survive it.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::status::PaymentMethod;

const CARD_NUMBER_DIGITS: usize = 16;
const CVV_DIGITS: usize = 3;

/// Why a payment selection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// A card field is missing. Carries the wire name of the field.
    #[error("incomplete card data: {0} is required")]
    IncompleteCardData(&'static str),
    #[error("card number must have exactly 16 digits")]
    InvalidCardNumber,
    #[error("cvv must have exactly 3 digits")]
    InvalidCvv,
}

impl PaymentError {
    /// Wire name of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::IncompleteCardData(field) => *field,
            Self::InvalidCardNumber => "cardNumber",
            Self::InvalidCvv => "cardCvv",
        }
    }
}

/// What the customer picked on the payment step.
///
/// Card fields are only looked at when `method` is [`PaymentMethod::Card`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSelection {
    #[serde(rename = "paymentMethod")]
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_expiry_month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_expiry_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_cvv: Option<String>,
}

impl PaymentSelection {
    #[must_use]
    pub const fn boleto() -> Self {
        Self {
            method: PaymentMethod::Boleto,
            card_holder_name: None,
            card_number: None,
            card_expiry_month: None,
            card_expiry_year: None,
            card_cvv: None,
        }
    }

    #[must_use]
    pub fn card(
        holder_name: impl Into<String>,
        number: impl Into<String>,
        expiry_month: impl Into<String>,
        expiry_year: impl Into<String>,
        cvv: impl Into<String>,
    ) -> Self {
        Self {
            method: PaymentMethod::Card,
            card_holder_name: Some(holder_name.into()),
            card_number: Some(number.into()),
            card_expiry_month: Some(expiry_month.into()),
            card_expiry_year: Some(expiry_year.into()),
            card_cvv: Some(cvv.into()),
        }
    }

    /// Validate the selection.
    ///
    /// Presence is checked first, in form order (holder name, number, expiry
    /// month, expiry year, cvv), then the number and cvv formats. The first
    /// failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`PaymentError`] encountered.
    pub fn validate(&self) -> Result<ValidatedPayment, PaymentError> {
        if self.method == PaymentMethod::Boleto {
            return Ok(ValidatedPayment::Boleto);
        }

        let holder_name = present(self.card_holder_name.as_deref(), "cardHolderName")?;
        let number = present(self.card_number.as_deref(), "cardNumber")?;
        let expiry_month = present(self.card_expiry_month.as_deref(), "cardExpiryMonth")?;
        let expiry_year = present(self.card_expiry_year.as_deref(), "cardExpiryYear")?;
        let cvv = present(self.card_cvv.as_deref(), "cardCvv")?;

        let digits: String = number.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != CARD_NUMBER_DIGITS {
            return Err(PaymentError::InvalidCardNumber);
        }
        if cvv.len() != CVV_DIGITS || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(PaymentError::InvalidCvv);
        }

        Ok(ValidatedPayment::Card(CardDetails {
            holder_name: holder_name.to_owned(),
            number: digits,
            expiry_month: expiry_month.to_owned(),
            expiry_year: expiry_year.to_owned(),
        }))
    }
}

fn present<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, PaymentError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(PaymentError::IncompleteCardData(field))
}

impl fmt::Debug for PaymentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSelection")
            .field("method", &self.method)
            .field("card_holder_name", &self.card_holder_name)
            .field("card_number", &self.card_number.as_ref().map(|_| "[REDACTED]"))
            .field("card_expiry_month", &self.card_expiry_month)
            .field("card_expiry_year", &self.card_expiry_year)
            .field("card_cvv", &self.card_cvv.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// A payment that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedPayment {
    Boleto,
    Card(CardDetails),
}

impl ValidatedPayment {
    #[must_use]
    pub const fn method(&self) -> PaymentMethod {
        match self {
            Self::Boleto => PaymentMethod::Boleto,
            Self::Card(_) => PaymentMethod::Card,
        }
    }

    #[must_use]
    pub fn card_holder_name(&self) -> Option<&str> {
        match self {
            Self::Boleto => None,
            Self::Card(card) => Some(&card.holder_name),
        }
    }

    #[must_use]
    pub fn card_last_four(&self) -> Option<String> {
        match self {
            Self::Boleto => None,
            Self::Card(card) => Some(card.last_four().to_owned()),
        }
    }
}

/// Validated card data. The CVV is not kept.
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    holder_name: String,
    number: String,
    expiry_month: String,
    expiry_year: String,
}

impl CardDetails {
    #[must_use]
    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    #[must_use]
    pub fn last_four(&self) -> &str {
        self.number
            .get(self.number.len().saturating_sub(4)..)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn brand(&self) -> CardBrand {
        CardBrand::detect(&self.number)
    }

    #[must_use]
    pub fn expiry(&self) -> String {
        format!("{}/{}", self.expiry_month, self.expiry_year)
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("holder_name", &self.holder_name)
            .field("last_four", &self.last_four())
            .field("expiry", &self.expiry())
            .finish()
    }
}

/// Card network, guessed from the first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Outros,
}

impl CardBrand {
    #[must_use]
    pub fn detect(number: &str) -> Self {
        match number.trim_start().chars().next() {
            Some('4') => Self::Visa,
            Some('5') => Self::Mastercard,
            Some('3') => Self::Amex,
            _ => Self::Outros,
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Visa => "VISA",
            Self::Mastercard => "MASTERCARD",
            Self::Amex => "AMEX",
            Self::Outros => "OUTROS",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn card(number: &str, cvv: &str) -> PaymentSelection {
        PaymentSelection::card("ANA SOUZA", number, "08", "2030", cvv)
    }

    #[test]
    fn test_boleto_ignores_card_fields() {
        let mut selection = PaymentSelection::boleto();
        selection.card_number = Some("123".into());
        assert_eq!(selection.validate().unwrap(), ValidatedPayment::Boleto);
    }

    #[test]
    fn test_fifteen_digit_number_rejected() {
        assert_eq!(
            card("1234 5678 9012 345", "123").validate(),
            Err(PaymentError::InvalidCardNumber)
        );
    }

    #[test]
    fn test_separators_are_stripped() {
        let ok = card("4111-1111 1111.1111", "123").validate().unwrap();
        let ValidatedPayment::Card(details) = ok else {
            panic!("expected card");
        };
        assert_eq!(details.last_four(), "1111");
        assert_eq!(details.brand(), CardBrand::Visa);
    }

    #[test]
    fn test_cvv_length() {
        assert_eq!(
            card("5555555555554444", "1234").validate(),
            Err(PaymentError::InvalidCvv)
        );
        assert_eq!(
            card("5555555555554444", "12a").validate(),
            Err(PaymentError::InvalidCvv)
        );
        assert!(card("5555555555554444", "123").validate().is_ok());
    }

    #[test]
    fn test_presence_checked_before_format() {
        let mut selection = card("123", "1");
        selection.card_expiry_year = None;
        assert_eq!(
            selection.validate(),
            Err(PaymentError::IncompleteCardData("cardExpiryYear"))
        );

        let mut selection = card("", "");
        selection.card_holder_name = Some("   ".into());
        assert_eq!(
            selection.validate(),
            Err(PaymentError::IncompleteCardData("cardHolderName"))
        );
    }

    #[test]
    fn test_debug_redacts_card_number() {
        let rendered = format!("{:?}", card("4111111111111111", "123"));
        assert!(!rendered.contains("4111111111111111"));
        assert!(!rendered.contains("\"123\""));
        let validated = card("4111111111111111", "123").validate().unwrap();
        assert!(!format!("{validated:?}").contains("4111111111111111"));
    }

    #[test]
    fn test_brand_detection() {
        assert_eq!(CardBrand::detect("4000"), CardBrand::Visa);
        assert_eq!(CardBrand::detect("5100"), CardBrand::Mastercard);
        assert_eq!(CardBrand::detect("3400"), CardBrand::Amex);
        assert_eq!(CardBrand::detect("6011"), CardBrand::Outros);
        assert_eq!(CardBrand::detect(""), CardBrand::Outros);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(PaymentSelection::boleto()).unwrap();
        assert_eq!(json, serde_json::json!({"paymentMethod": "BOLETO"}));
    }
}
