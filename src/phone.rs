//! Phone number normalization
//!
//! Purely syntactic canonicalization: every non-digit is dropped and a
//! leading `+` survives. No locale-aware validation is attempted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::RegistryError;

/// Normalized phone number used as the record lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneKey(String);

impl PhoneKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a raw phone number into a storage key.
///
/// `"+1 (212) 555-0100"` becomes `"+12125550100"` and `"212.555.0100"`
/// becomes `"2125550100"`. Input with no digits is rejected.
pub fn normalize(raw: &str) -> Result<PhoneKey, RegistryError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(RegistryError::InvalidIdentifier(format!(
            "phone number {:?} contains no digits",
            raw
        )));
    }

    if raw.starts_with('+') {
        Ok(PhoneKey(format!("+{}", digits)))
    } else {
        Ok(PhoneKey(digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize("+1 (212) 555-0100").unwrap().as_str(), "+12125550100");
        assert_eq!(normalize("212.555.0100").unwrap().as_str(), "2125550100");
        assert_eq!(normalize("212-555-0100").unwrap().as_str(), "2125550100");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["+1 (212) 555-0100", "212.555.0100", "+44 20 7946 0958", "0", "+0"] {
            let once = normalize(raw).unwrap();
            let twice = normalize(once.as_str()).unwrap();
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_plus_only_counts_when_leading() {
        assert_eq!(normalize(" +1 212").unwrap().as_str(), "1212");
        assert_eq!(normalize("1+212").unwrap().as_str(), "1212");
        assert_eq!(normalize("++1").unwrap().as_str(), "+1");
    }

    #[test]
    fn test_non_ascii_digits_are_stripped() {
        // Arabic-Indic digits are not decimal ASCII digits
        assert_eq!(normalize("٢١٢ 555").unwrap().as_str(), "555");
    }

    #[test]
    fn test_rejects_input_without_digits() {
        assert!(matches!(normalize(""), Err(RegistryError::InvalidIdentifier(_))));
        assert!(matches!(normalize("+"), Err(RegistryError::InvalidIdentifier(_))));
        assert!(matches!(normalize("(---)"), Err(RegistryError::InvalidIdentifier(_))));
    }
}
