//! Core types: payments, lifecycle rules, API contract and errors

pub mod entity;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod outcome;
pub mod query;
pub mod service;
pub mod status;

pub use entity::{Entity, NewPayment, Payment, PaymentId, PaymentRecord};
pub use error::{ConfigError, PayError, PayResult, ValidationError};
pub use events::{EventBus, EventEnvelope, StoreEvent};
pub use lifecycle::{BulkOperation, Eligibility, Transition};
pub use outcome::{
    BulkOperationResult, BulkOptions, BulkRequest, ItemOutcome, ValidationReport,
    ValidationResult,
};
pub use query::{PaginationMeta, PaymentFilters, PaymentPage};
pub use service::PaymentsApi;
pub use status::{Fallback, Normalized, PaymentStatus, PaymentType};
