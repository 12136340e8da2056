//! Status and payment-type normalization
//!
//! The backend is loose about the strings it returns for `status` and
//! `payment_type`: casing varies and several synonyms are in circulation
//! ("CONFIRMED" and "POSTED", "CANCELED" and "CANCELLED", Spanish labels from
//! older ledgers). The normalizer maps all of them onto closed enums.
//!
//! Normalization never fails. Unknown or missing values fall back to
//! [`PaymentStatus::Draft`] and [`PaymentType::CustomerPayment`]. Every
//! fallback is logged on the `bulkpay::data_quality` target and counted so
//! that data-quality regressions show up in telemetry instead of being
//! silently coerced. Call sites that need strict validation use
//! [`str::parse`] instead, which rejects unknown values.

use crate::core::error::PayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

static FALLBACK_COUNT: AtomicU64 = AtomicU64::new(0);

/// Total number of normalizer fallbacks since process start
pub fn fallback_count() -> u64 {
    FALLBACK_COUNT.load(Ordering::Relaxed)
}

/// Lifecycle status of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum PaymentStatus {
    /// Editable, not yet posted to the ledger
    Draft,
    /// Posted (confirmed) to its journal
    Posted,
    /// Posted and then cancelled
    Cancelled,
}

impl PaymentStatus {
    /// All variants, in lifecycle order
    pub const ALL: [PaymentStatus; 3] = [Self::Draft, Self::Posted, Self::Cancelled];

    /// Wire representation, as sent in filters and request bodies
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Human-readable label for display
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Posted => "Posted",
            Self::Cancelled => "Cancelled",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "draft" | "borrador" => Some(Self::Draft),
            "posted" | "confirmed" | "confirmado" | "contabilizado" => Some(Self::Posted),
            "cancelled" | "canceled" | "cancelado" | "anulado" | "void" | "voided" => {
                Some(Self::Cancelled)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Cancelled => "cancelled",
        })
    }
}

impl FromStr for PaymentStatus {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(&normalize_key(s)).ok_or_else(|| PayError::UnknownValue {
            field: "status",
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = PayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Direction of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum PaymentType {
    /// Money received from a customer
    CustomerPayment,
    /// Money paid to a supplier
    SupplierPayment,
}

impl PaymentType {
    pub const ALL: [PaymentType; 2] = [Self::CustomerPayment, Self::SupplierPayment];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerPayment => "CUSTOMER_PAYMENT",
            Self::SupplierPayment => "SUPPLIER_PAYMENT",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::CustomerPayment => "Customer payment",
            Self::SupplierPayment => "Supplier payment",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "customer_payment" | "customer" | "inbound" | "receipt" | "received" | "cobro" => {
                Some(Self::CustomerPayment)
            }
            "supplier_payment" | "supplier" | "outbound" | "sent" | "pago" => {
                Some(Self::SupplierPayment)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentType {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(&normalize_key(s)).ok_or_else(|| PayError::UnknownValue {
            field: "payment_type",
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for PaymentType {
    type Error = PayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A raw value the normalizer could not map and replaced with the default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// Which field was coerced ("status" or "payment_type")
    pub field: String,
    /// The raw value, `None` when the field was missing
    pub raw: Option<String>,
    /// The value substituted for it
    pub substituted: String,
}

/// Result of a normalization: the value plus the fallback, if one was used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized<T> {
    pub value: T,
    pub fallback: Option<Fallback>,
}

impl<T> Normalized<T> {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Normalize a status string, reporting whether the default was substituted
pub fn classify_status(raw: Option<&str>) -> Normalized<PaymentStatus> {
    classify(
        raw,
        "status",
        PaymentStatus::from_key,
        PaymentStatus::Draft,
        PaymentStatus::as_str,
    )
}

/// Normalize a payment-type string, reporting whether the default was substituted
pub fn classify_payment_type(raw: Option<&str>) -> Normalized<PaymentType> {
    classify(
        raw,
        "payment_type",
        PaymentType::from_key,
        PaymentType::ALL[0],
        PaymentType::as_str,
    )
}

/// Normalize a status string; never fails
pub fn normalize_status(raw: Option<&str>) -> PaymentStatus {
    classify_status(raw).value
}

/// Normalize a payment-type string; never fails
pub fn normalize_payment_type(raw: Option<&str>) -> PaymentType {
    classify_payment_type(raw).value
}

fn classify<T: Copy>(
    raw: Option<&str>,
    field: &'static str,
    lookup: fn(&str) -> Option<T>,
    default: T,
    wire: fn(&T) -> &'static str,
) -> Normalized<T> {
    let key = raw.map(normalize_key).filter(|k| !k.is_empty());
    if let Some(value) = key.as_deref().and_then(lookup) {
        return Normalized {
            value,
            fallback: None,
        };
    }

    FALLBACK_COUNT.fetch_add(1, Ordering::Relaxed);
    tracing::warn!(
        target: "bulkpay::data_quality",
        field,
        raw = raw.unwrap_or("<missing>"),
        substituted = wire(&default),
        "unrecognized value from backend, substituting default"
    );

    Normalized {
        value: default,
        fallback: Some(Fallback {
            field: field.to_string(),
            raw: raw.map(str::to_string),
            substituted: wire(&default).to_string(),
        }),
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
