//! Structured delivery address.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Required address fields, in the order they are reported when missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    Name,
    Phone,
    Line1,
    City,
    State,
    PostalCode,
}

impl AddressField {
    /// Every required field.
    pub const REQUIRED: [Self; 6] = [
        Self::Name,
        Self::Phone,
        Self::Line1,
        Self::City,
        Self::State,
        Self::PostalCode,
    ];

    /// Field name as used in API payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Line1 => "line1",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postal_code",
        }
    }
}

impl fmt::Display for AddressField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery (and billing) address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(default)]
    pub country: Option<String>,
}

impl Address {
    fn field(&self, field: AddressField) -> &str {
        match field {
            AddressField::Name => &self.name,
            AddressField::Phone => &self.phone,
            AddressField::Line1 => &self.line1,
            AddressField::City => &self.city,
            AddressField::State => &self.state,
            AddressField::PostalCode => &self.postal_code,
        }
    }

    /// Required fields that are empty or whitespace only.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<AddressField> {
        AddressField::REQUIRED
            .into_iter()
            .filter(|field| self.field(*field).trim().is_empty())
            .collect()
    }

    /// Returns true if every required field is filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Split `name` into first and last name at the first whitespace.
    ///
    /// A single-word name yields an empty last name.
    #[must_use]
    pub fn split_name(&self) -> (&str, &str) {
        let name = self.name.trim();
        name.split_once(char::is_whitespace)
            .map_or((name, ""), |(first, last)| (first, last.trim_start()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Address {
        Address {
            name: "Asha Rao".to_string(),
            phone: "+91 98450 00000".to_string(),
            line1: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            postal_code: "560001".to_string(),
            ..Address::default()
        }
    }

    #[test]
    fn test_complete_address_has_no_missing_fields() {
        assert!(complete().is_complete());
    }

    #[test]
    fn test_whitespace_counts_as_blank() {
        let address = Address {
            phone: "   ".to_string(),
            postal_code: String::new(),
            ..complete()
        };
        assert_eq!(
            address.missing_fields(),
            vec![AddressField::Phone, AddressField::PostalCode]
        );
    }

    #[test]
    fn test_split_name() {
        assert_eq!(complete().split_name(), ("Asha", "Rao"));

        let address = Address {
            name: "  Prince  ".to_string(),
            ..complete()
        };
        assert_eq!(address.split_name(), ("Prince", ""));

        let address = Address {
            name: "Mary  Jane Watson".to_string(),
            ..complete()
        };
        assert_eq!(address.split_name(), ("Mary", "Jane Watson"));
    }
}
