use serde::{Deserialize, Serialize};

/// Participant identity captured once by the intro form.
///
/// Only the name is required; phone and address are optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl Identity {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            phone: phone.into().trim().to_owned(),
            address: address.into().trim().to_owned(),
        }
    }

    /// Returns true when the required name field is filled.
    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}
