//! Value objects: equality by value, not identity. To "modify" one, build a
//! new one.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// ISO-4217 style currency code (three uppercase ASCII letters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub const DEFAULT_CODE: &'static str = "USD";

    pub fn parse(code: &str) -> DomainResult<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "currency must be a 3-letter code, got {code:?}"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self(Self::DEFAULT_CODE.to_string())
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A non-negative amount in the smallest currency unit (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: u64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: u64, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_is_normalised_to_uppercase() {
        assert_eq!(Currency::parse(" eur ").unwrap().as_str(), "EUR");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::parse("US").is_err());
        assert!(Currency::parse("US1").is_err());
        assert!(Currency::parse("DOLLAR").is_err());
    }

    #[test]
    fn currency_deserializes_through_validation() {
        let ok: Currency = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(ok.as_str(), "GBP");
        assert!(serde_json::from_str::<Currency>("\"pounds\"").is_err());
    }
}
