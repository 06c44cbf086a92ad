//! Customer entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub u64);

impl CustomerId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CustomerId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A WhatsApp contact known to the desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Customer id.
    pub id: CustomerId,
    /// WhatsApp number in international format.
    pub phone_number: String,
    /// Contact name, possibly empty.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// WhatsApp profile picture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
    /// Time of the customer's latest message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Creates a customer with only a number and a name.
    #[must_use]
    pub fn new(
        id: CustomerId,
        phone_number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            phone_number: phone_number.into(),
            name: name.into(),
            email: None,
            profile_pic_url: None,
            last_message_at: None,
        }
    }

    /// Name to show for this customer, falling back to the phone number.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.phone_number
        } else {
            &self.name
        }
    }
}
