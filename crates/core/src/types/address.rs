//! Customer addresses and the snapshot copied into orders.

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// Which default flag an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Delivery,
    Billing,
}

impl AddressKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::Billing => "billing",
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AddressKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delivery" => Ok(Self::Delivery),
            "billing" => Ok(Self::Billing),
            other => Err(format!("invalid address kind: {other}")),
        }
    }
}

/// Address validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// A required field is blank. Carries the wire name of the field.
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("address {0} not found")]
    NotFound(AddressId),
}

impl AddressError {
    /// Wire name of the offending field, for per-field error maps.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField(field) => Some(*field),
            Self::NotFound(_) => None,
        }
    }
}

/// A stored customer address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub label: String,
    pub street: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub is_delivery_default: bool,
    #[serde(default)]
    pub is_billing_default: bool,
}

impl Address {
    #[must_use]
    pub const fn is_default(&self, kind: AddressKind) -> bool {
        match kind {
            AddressKind::Delivery => self.is_delivery_default,
            AddressKind::Billing => self.is_billing_default,
        }
    }

    const fn set_flag(&mut self, kind: AddressKind, value: bool) {
        match kind {
            AddressKind::Delivery => self.is_delivery_default = value,
            AddressKind::Billing => self.is_billing_default = value,
        }
    }

    /// Copy the fields that an order keeps for its whole life.
    #[must_use]
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            label: self.label.clone(),
            street: self.street.clone(),
            number: self.number.clone(),
            complement: self.complement.clone(),
            district: self.district.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            zip_code: self.zip_code.clone(),
        }
    }

    /// One-line rendering, e.g. `Rua A, 10 - Centro, Recife/PE 50000000`.
    #[must_use]
    pub fn one_line(&self) -> String {
        self.snapshot().one_line()
    }
}

/// Mark `id` as the default of `kind` and clear the flag everywhere else.
///
/// The list is left untouched if `id` is not in it.
///
/// # Errors
///
/// Returns [`AddressError::NotFound`] if no address has `id`.
pub fn apply_default(
    addresses: &mut [Address],
    id: AddressId,
    kind: AddressKind,
) -> Result<(), AddressError> {
    if !addresses.iter().any(|a| a.id == id) {
        return Err(AddressError::NotFound(id));
    }
    for address in addresses.iter_mut() {
        address.set_flag(kind, address.id == id);
    }
    Ok(())
}

/// The customer's current default address of `kind`, if any.
#[must_use]
pub fn default_of(addresses: &[Address], kind: AddressKind) -> Option<&Address> {
    addresses.iter().find(|a| a.is_default(kind))
}

/// Address data frozen into an order at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    pub label: String,
    pub street: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

impl AddressSnapshot {
    #[must_use]
    pub fn one_line(&self) -> String {
        let complement = self
            .complement
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        format!(
            "{}, {}{} - {}, {}/{} {}",
            self.street, self.number, complement, self.district, self.city, self.state, self.zip_code
        )
    }
}

/// Input for creating or replacing an address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDraft {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub is_delivery_default: bool,
    #[serde(default)]
    pub is_billing_default: bool,
}

impl AddressDraft {
    /// Validate required fields and return the normalized draft.
    ///
    /// Text fields are trimmed, a blank complement becomes `None`, the state
    /// is uppercased and the zip code keeps digits only. Fields are checked
    /// in form order so the first error points at the first bad input.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingField`] for the first blank field.
    pub fn validate(self) -> Result<Self, AddressError> {
        let zip_code = normalize_zip(&self.zip_code);
        let draft = Self {
            label: self.label.trim().to_owned(),
            street: self.street.trim().to_owned(),
            number: self.number.trim().to_owned(),
            complement: self
                .complement
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty()),
            district: self.district.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_uppercase(),
            zip_code,
            ..self
        };

        let required = [
            ("label", &draft.label),
            ("zipCode", &draft.zip_code),
            ("street", &draft.street),
            ("number", &draft.number),
            ("district", &draft.district),
            ("city", &draft.city),
            ("state", &draft.state),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(AddressError::MissingField(*field));
        }

        Ok(draft)
    }

    /// Fill blank street/district/city/state from a postal lookup result,
    /// keeping anything the customer already typed.
    pub fn prefill(&mut self, found: &PostalAddress) {
        fill_blank(&mut self.street, &found.street);
        fill_blank(&mut self.district, &found.district);
        fill_blank(&mut self.city, &found.city);
        fill_blank(&mut self.state, &found.state);
    }
}

fn fill_blank(target: &mut String, value: &str) {
    if target.trim().is_empty() && !value.is_empty() {
        value.clone_into(target);
    }
}

/// Strip everything except ASCII digits from a zip code.
#[must_use]
pub fn normalize_zip(zip: &str) -> String {
    zip.chars().filter(char::is_ascii_digit).collect()
}

/// Street-level data returned by a postal code lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub zip_code: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
}
