//! Payment entity, its wire representation and the creation payload

use crate::core::status::{
    Fallback, PaymentStatus, PaymentType, classify_payment_type, classify_status,
};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use validator::Validate;

/// Base trait for records held by the store.
///
/// Every entity has:
/// - id: opaque identifier assigned by the backend
/// - status: current lifecycle status
/// - created_at / updated_at: audit timestamps
pub trait Entity: Clone + Send + Sync + 'static {
    /// The plural resource name used in URLs (e.g., "payments")
    fn resource_name() -> &'static str;

    fn id(&self) -> &PaymentId;

    fn status(&self) -> PaymentStatus;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    /// Whether the entity can still be edited or deleted
    fn is_draft(&self) -> bool {
        self.status() == PaymentStatus::Draft
    }
}

/// Opaque payment identifier
///
/// The backend owns the format; the client never parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PaymentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A payment as held by the store, with normalized enums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub currency_code: String,
    /// Customer or supplier this payment settles with
    pub third_party_id: Option<String>,
    /// Journal the payment is posted to; required before confirmation
    pub journal_id: Option<String>,
    pub reference: String,
    pub description: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Build a payment from its wire record.
    ///
    /// Never fails; the second element lists every enum value the normalizer
    /// had to replace with its default.
    pub fn from_record(record: PaymentRecord) -> (Self, Vec<Fallback>) {
        let status = classify_status(record.status.as_deref());
        let payment_type = classify_payment_type(record.payment_type.as_deref());
        let fallbacks = [status.fallback, payment_type.fallback]
            .into_iter()
            .flatten()
            .collect();

        let payment = Self {
            id: record.id,
            status: status.value,
            payment_type: payment_type.value,
            amount: record.amount,
            currency_code: record.currency_code,
            third_party_id: record.third_party_id,
            journal_id: record.journal_id,
            reference: record.reference.unwrap_or_default(),
            description: record.description,
            payment_date: record.payment_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        };
        (payment, fallbacks)
    }

    /// Wire record for this payment
    pub fn to_record(&self) -> PaymentRecord {
        PaymentRecord {
            id: self.id.clone(),
            status: Some(self.status.as_str().to_string()),
            payment_type: Some(self.payment_type.as_str().to_string()),
            amount: self.amount,
            currency_code: self.currency_code.clone(),
            third_party_id: self.third_party_id.clone(),
            journal_id: self.journal_id.clone(),
            reference: Some(self.reference.clone()),
            description: self.description.clone(),
            payment_date: self.payment_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Short label used in validation results and summaries
    pub fn label(&self) -> String {
        if self.reference.is_empty() {
            format!("{} ({} {})", self.id, self.amount, self.currency_code)
        } else {
            format!("{} ({} {})", self.reference, self.amount, self.currency_code)
        }
    }
}

impl Entity for Payment {
    fn resource_name() -> &'static str {
        "payments"
    }

    fn id(&self) -> &PaymentId {
        &self.id
    }

    fn status(&self) -> PaymentStatus {
        self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A payment exactly as the backend sends it.
///
/// `status` and `payment_type` stay raw strings here; they are only mapped to
/// enums by [`Payment::from_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    pub amount: Decimal,
    pub currency_code: String,
    #[serde(default)]
    pub third_party_id: Option<String>,
    #[serde(default)]
    pub journal_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

static CURRENCY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("currency regex is valid"));

/// Payload for `POST /payments`
///
/// Validated locally before any request is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewPayment {
    pub payment_type: PaymentType,
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    #[validate(regex(path = *CURRENCY_CODE, message = "must be a three-letter ISO 4217 code"))]
    pub currency_code: String,
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub third_party_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
}

impl NewPayment {
    pub fn new(
        payment_type: PaymentType,
        amount: Decimal,
        currency_code: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            payment_type,
            amount,
            currency_code: currency_code.into(),
            reference: reference.into(),
            third_party_id: None,
            journal_id: None,
            description: None,
            payment_date: None,
        }
    }

    pub fn with_journal(mut self, journal_id: impl Into<String>) -> Self {
        self.journal_id = Some(journal_id.into());
        self
    }

    pub fn with_third_party(mut self, third_party_id: impl Into<String>) -> Self {
        self.third_party_id = Some(third_party_id.into());
        self
    }
}

fn validate_positive_amount(amount: &Decimal) -> Result<(), validator::ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        Err(validator::ValidationError::new("positive").with_message("must be positive".into()))
    }
}
