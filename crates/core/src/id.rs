//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are positive integers assigned by the store on insert. They are
//! the stable sort key for every paginated listing.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

/// Identifier of an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

/// Identifier of a single line within an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderItemId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw identifier, rejecting zero and negative values.
            pub fn new(raw: i64) -> Result<Self, DomainError> {
                if raw <= 0 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, raw
                    )));
                }
                Ok(Self(raw))
            }

            /// Wrap a raw identifier read back from the store.
            ///
            /// Store-assigned ids are always positive, so no check is made.
            pub fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Self::new(raw)
            }
        }
    };
}

impl_int_newtype!(ProductId, "ProductId");
impl_int_newtype!(OrderId, "OrderId");
impl_int_newtype!(OrderItemId, "OrderItemId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        let id: ProductId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_zero_negative_and_garbage() {
        assert!(matches!("0".parse::<OrderId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<OrderId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("abc".parse::<OrderId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn ids_order_numerically() {
        assert!(ProductId::from_raw(2) < ProductId::from_raw(10));
    }
}
