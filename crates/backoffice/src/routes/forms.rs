//! Helpers for the urlencoded forms of the list/form pages.
//!
//! Forms with repeated fields (add-on rows) or checkboxes arrive as raw
//! pairs; [`FormFields`] gives them a small lookup API.

use cardapio_core::Price;

/// Submitted form fields in arrival order.
#[derive(Debug, Clone, Default)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    #[must_use]
    pub const fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value of a field, trimmed. Missing fields read as empty.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map_or("", |(_, value)| value.trim())
    }

    /// Every value of a repeated field, trimmed, in order.
    #[must_use]
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .collect()
    }

    /// Whether a checkbox was ticked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Trimmed value, `None` when blank.
    #[must_use]
    pub fn optional(&self, name: &str) -> Option<String> {
        optional(self.get(name))
    }

    /// A required text field.
    ///
    /// # Errors
    ///
    /// Returns the message to show when the field is blank.
    pub fn required(&self, name: &str, label: &str) -> Result<String, String> {
        self.optional(name)
            .ok_or_else(|| format!("Preencha o campo {label}."))
    }

    /// A required price field.
    ///
    /// # Errors
    ///
    /// Returns the message to show when the field is blank or not a price.
    pub fn price(&self, name: &str, label: &str) -> Result<Price, String> {
        parse_price(self.get(name), label)
    }
}

/// Trimmed value, `None` when blank.
#[must_use]
pub fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse a price typed by staff, naming the field in the error.
///
/// # Errors
///
/// Returns the message to show when the value is blank, malformed or negative.
pub fn parse_price(raw: &str, label: &str) -> Result<Price, String> {
    Price::parse_input(raw).map_err(|e| format!("{label}: {e}"))
}
