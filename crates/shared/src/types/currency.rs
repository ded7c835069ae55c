//! ISO 4217 style currency codes.
//!
//! Seat prices are quoted in whatever currency the organization is billed in,
//! so the code is kept as a validated three-letter string rather than a closed enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string is not exactly three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Currency code must be three uppercase letters, got '{0}'")]
pub struct InvalidCurrencyCode(pub String);

/// A three-letter uppercase currency code (`^[A-Z]{3}$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses a currency code. No case folding is applied: `usd` is rejected.
    pub fn parse(code: &str) -> Result<Self, InvalidCurrencyCode> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(InvalidCurrencyCode(code.to_string()))
        }
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = InvalidCurrencyCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USD")]
    #[case("BRL")]
    #[case("EUR")]
    fn test_accepts_uppercase_codes(#[case] code: &str) {
        assert_eq!(CurrencyCode::parse(code).unwrap().as_str(), code);
    }

    #[rstest]
    #[case("usd")]
    #[case("US")]
    #[case("USDT")]
    #[case("U5D")]
    #[case("")]
    #[case("ÄBC")]
    fn test_rejects_malformed_codes(#[case] code: &str) {
        assert_eq!(
            CurrencyCode::parse(code),
            Err(InvalidCurrencyCode(code.to_string()))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: CurrencyCode = serde_json::from_str("\"BRL\"").unwrap();
        assert_eq!(ok.to_string(), "BRL");
        assert!(serde_json::from_str::<CurrencyCode>("\"brl\"").is_err());
    }
}
