//! # bulkpay
//!
//! Client-side lifecycle orchestration for accounting payments.
//!
//! ## Features
//!
//! - **Payment store**: one loaded page, active filters and a selection that
//!   survives page changes
//! - **Lifecycle rules**: draft → posted → cancelled, reset to draft, delete
//!   drafts; invalid transitions never leave the client
//! - **Bulk operations**: one request per batch, per-payment outcomes,
//!   configurable selection policy after partial failure
//! - **Validated confirmation**: a dry-run report gates confirm and post
//! - **Tolerant decoding**: unknown statuses and payment types are normalized
//!   and reported on the event bus
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bulkpay::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ClientConfig::from_layers(vec![ConfigLayer::from_env()?])?;
//! let api = Arc::new(HttpPaymentsApi::new(&config)?);
//! let store = Arc::new(PaymentStore::from_config(api, &config));
//!
//! store.fetch(PaymentFilters::default().with_status(PaymentStatus::Draft)).await?;
//! store.select_all();
//!
//! let flow = ConfirmationFlow::new(BulkOrchestrator::from_config(store.clone(), &config));
//! match flow.run_selected(&BulkOptions::default()).await? {
//!     FlowOutcome::Blocked { report } => { /* show report.blocked() */ }
//!     FlowOutcome::NeedsConfirmation { report } => { /* ask, then force */ }
//!     FlowOutcome::Executed { outcome, .. } => println!("{}", outcome.summary()),
//! }
//! ```

pub mod bulk;
pub mod client;
pub mod config;
pub mod core;
pub mod storage;
pub mod store;
pub mod telemetry;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        entity::{Entity, NewPayment, Payment, PaymentId, PaymentRecord},
        error::{ConfigError, PayError, PayResult, ValidationError},
        events::{EventBus, EventEnvelope, StoreEvent},
        lifecycle::{BulkOperation, Eligibility, Transition},
        outcome::{
            BulkOperationResult, BulkOptions, ItemOutcome, ValidationReport, ValidationResult,
        },
        query::{PaginationMeta, PaymentFilters, PaymentPage},
        service::PaymentsApi,
        status::{PaymentStatus, PaymentType, normalize_payment_type, normalize_status},
    };

    // === Configuration ===
    pub use crate::config::{ClientConfig, ConfigLayer};

    // === Backends ===
    pub use crate::client::HttpPaymentsApi;
    pub use crate::storage::InMemoryPaymentsApi;

    // === Store & bulk ===
    pub use crate::bulk::{
        BulkOrchestrator, BulkOutcome, ConfirmationFlow, FlowOutcome, SelectionPolicy,
        SkippedPayment,
    };
    pub use crate::store::{FetchOutcome, PaymentStore, StoreSnapshot};

    pub use crate::telemetry::init_tracing;
}
