//! The product entity and its price type.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use storefront_core::error::DomainError;
use storefront_core::store::EntityRecord;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::PRODUCT_ENTITY;

/// Longest accepted product name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Reasons a price submission is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The text is not a plain decimal number.
    #[error("price must be a decimal number")]
    NotANumber,

    /// Zero or negative amount.
    #[error("price must be greater than 0")]
    NotPositive,

    /// Too many integer or fractional digits.
    #[error(
        "price must have at most {} integer digits and {} decimal places",
        Price::MAX_INTEGER_DIGITS,
        Price::MAX_FRACTION_DIGITS
    )]
    OutOfBounds,
}

/// A strictly positive monetary amount, held in minor units (cents).
///
/// Serializes as a JSON number with up to two decimal places, e.g. `18.99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    /// Integer digits allowed. Keeps every amount exactly representable as a
    /// JSON number.
    pub const MAX_INTEGER_DIGITS: usize = 13;

    /// Fractional digits allowed.
    pub const MAX_FRACTION_DIGITS: usize = 2;

    const MAX_CENTS: i64 = 9_999_999_999_999_999;

    /// Creates a price from an amount in cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotPositive` for zero or negative amounts and
    /// `PriceError::OutOfBounds` above the supported range.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents <= 0 {
            return Err(PriceError::NotPositive);
        }
        if cents > Self::MAX_CENTS {
            return Err(PriceError::OutOfBounds);
        }
        Ok(Self(cents))
    }

    /// Amount in cents.
    #[must_use]
    pub fn cents(self) -> i64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    /// Parses decimal text such as `"18.99"`, `"5"` or `"0.5"`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let (negative, magnitude) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (whole, fraction) = magnitude.split_once('.').unwrap_or((magnitude, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
            return Err(PriceError::NotANumber);
        }

        let whole = whole.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');
        if whole.len() > Self::MAX_INTEGER_DIGITS || fraction.len() > Self::MAX_FRACTION_DIGITS {
            return Err(PriceError::OutOfBounds);
        }

        let parse = |s: &str| -> Result<i64, PriceError> {
            if s.is_empty() {
                Ok(0)
            } else {
                s.parse().map_err(|_| PriceError::NotANumber)
            }
        };
        let mut fraction_cents = parse(fraction)?;
        if fraction.len() == 1 {
            fraction_cents *= 10;
        }
        let cents = parse(whole)? * 100 + fraction_cents;

        if negative {
            return Err(PriceError::NotPositive);
        }
        Self::from_cents(cents)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Bounded by MAX_CENTS, well inside f64's exact integer range.
        #[allow(clippy::cast_precision_loss)]
        let units = self.0 as f64 / 100.0;
        serializer.serialize_f64(units)
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Validates a submission and builds a new product with a fresh id.
    ///
    /// Every violation is reported, joined with `"; "`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the name is missing, blank or too
    /// long, or the price is missing, not positive or out of bounds.
    pub fn create(
        name: Option<&str>,
        price: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mut violations: Vec<String> = Vec::new();

        let name = match name {
            None => {
                violations.push("name is required".to_owned());
                None
            }
            Some(n) if n.trim().is_empty() => {
                violations.push("name must not be blank".to_owned());
                None
            }
            Some(n) if n.chars().count() > MAX_NAME_LENGTH => {
                violations.push(format!(
                    "name must be at most {MAX_NAME_LENGTH} characters"
                ));
                None
            }
            Some(n) => Some(n.to_owned()),
        };

        let price = match price.map(str::parse::<Price>) {
            None => {
                violations.push("price is required".to_owned());
                None
            }
            Some(Err(err)) => {
                violations.push(err.to_string());
                None
            }
            Some(Ok(price)) => Some(price),
        };

        match (name, price) {
            (Some(name), Some(price)) => Ok(Self {
                id: Uuid::new_v4(),
                name,
                price,
                created_at,
            }),
            _ => Err(DomainError::Validation(violations.join("; "))),
        }
    }

    /// Returns the stored representation of this product.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the product cannot be encoded.
    pub fn to_entity_record(&self) -> Result<EntityRecord, DomainError> {
        Ok(EntityRecord {
            entity_type: PRODUCT_ENTITY.to_owned(),
            id: self.id,
            body: serde_json::to_value(self)?,
            created_at: self.created_at,
        })
    }
}
