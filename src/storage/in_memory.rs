//! In-memory implementation of PaymentsApi for testing and development
//!
//! Behaves like the accounting backend: enforces the lifecycle state machine,
//! reports per-item bulk failures, and runs the same pre-confirmation checks
//! (`missing journal`, non-positive amount) the real validation endpoint does.

use crate::core::entity::{NewPayment, Payment, PaymentId, PaymentRecord};
use crate::core::error::{PayError, PayResult};
use crate::core::lifecycle::{BulkOperation, Transition};
use crate::core::outcome::{
    BulkOperationResult, BulkRequest, ItemOutcome, ValidationReport, ValidationResult,
};
use crate::core::query::{PaymentFilters, PaymentPage};
use crate::core::service::PaymentsApi;
use crate::core::status::PaymentStatus;
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// A call received by the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    List(PaymentFilters),
    Create { reference: String },
    Transition { id: PaymentId, transition: Transition },
    Bulk { operation: BulkOperation, request: BulkRequest },
    Validate { ids: Vec<PaymentId> },
}

impl ApiCall {
    /// Whether the call changes backend state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ApiCall::Create { .. } | ApiCall::Transition { .. } | ApiCall::Bulk { .. }
        )
    }
}

#[derive(Default)]
struct Backend {
    payments: IndexMap<PaymentId, Payment>,
    /// Raw status strings to echo back instead of the canonical ones
    raw_status: HashMap<PaymentId, String>,
    /// Payments the backend refuses in bulk calls
    rejected: HashSet<PaymentId>,
    calls: Vec<ApiCall>,
}

/// In-memory payments backend
///
/// Uses RwLock for thread-safe access; clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryPaymentsApi {
    backend: Arc<RwLock<Backend>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryPaymentsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `payments`, in listing order
    pub fn with_payments(payments: impl IntoIterator<Item = Payment>) -> Self {
        let api = Self::new();
        for payment in payments {
            api.insert(payment);
        }
        api
    }

    pub fn insert(&self, payment: Payment) {
        let mut backend = self.backend.write().unwrap_or_else(|e| e.into_inner());
        backend.payments.insert(payment.id.clone(), payment);
    }

    /// Insert a raw record; its status string is echoed back verbatim
    pub fn insert_record(&self, record: PaymentRecord) {
        let raw = record.status.clone();
        let (payment, _) = Payment::from_record(record);
        let mut backend = self.backend.write().unwrap_or_else(|e| e.into_inner());
        if let Some(raw) = raw {
            backend.raw_status.insert(payment.id.clone(), raw);
        }
        backend.payments.insert(payment.id.clone(), payment);
    }

    /// Make bulk calls fail for this payment with a per-item error
    pub fn reject_in_bulk(&self, id: impl Into<PaymentId>) {
        let mut backend = self.backend.write().unwrap_or_else(|e| e.into_inner());
        backend.rejected.insert(id.into());
    }

    /// Simulate a network outage: every call fails with a transport error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn get(&self, id: &PaymentId) -> Option<Payment> {
        self.read().ok()?.payments.get(id).cloned()
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<ApiCall> {
        self.read().map(|b| b.calls.clone()).unwrap_or_default()
    }

    /// Number of state-changing calls received so far
    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    fn read(&self) -> PayResult<RwLockReadGuard<'_, Backend>> {
        self.backend.read().map_err(|e| PayError::Transport {
            message: format!("Failed to acquire read lock: {}", e),
        })
    }

    fn write(&self) -> PayResult<RwLockWriteGuard<'_, Backend>> {
        self.backend.write().map_err(|e| PayError::Transport {
            message: format!("Failed to acquire write lock: {}", e),
        })
    }

    /// Record the call, then fail if the backend is marked unavailable
    fn receive(&self, call: ApiCall) -> PayResult<RwLockWriteGuard<'_, Backend>> {
        let mut backend = self.write()?;
        backend.calls.push(call);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PayError::Transport {
                message: "connection refused".to_string(),
            });
        }
        Ok(backend)
    }
}

impl Backend {
    fn record_for(&self, payment: &Payment) -> PaymentRecord {
        let mut record = payment.to_record();
        if let Some(raw) = self.raw_status.get(&payment.id) {
            record.status = Some(raw.clone());
        }
        record
    }

    fn apply(&mut self, id: &PaymentId, transition: Transition) -> Result<(), (StatusCode, String)> {
        let Some(payment) = self.payments.get_mut(id) else {
            return Err((StatusCode::NOT_FOUND, format!("Payment '{}' not found", id)));
        };
        let next = transition
            .apply(payment.status)
            .map_err(|e| (StatusCode::CONFLICT, e.to_string()))?;
        if transition == Transition::Confirm && payment.journal_id.is_none() {
            return Err((StatusCode::UNPROCESSABLE_ENTITY, "missing journal".to_string()));
        }

        match next {
            Some(status) => {
                payment.status = status;
                payment.updated_at = Utc::now();
            }
            None => {
                self.payments.shift_remove(id);
            }
        }
        self.raw_status.remove(id);
        Ok(())
    }

    fn validate_one(&self, id: &PaymentId) -> ValidationResult {
        let Some(payment) = self.payments.get(id) else {
            return ValidationResult {
                payment_id: id.clone(),
                label: id.to_string(),
                can_confirm: false,
                blocking_reasons: vec!["payment not found".to_string()],
                warnings: vec![],
            };
        };

        let mut blocking_reasons = Vec::new();
        let mut warnings = Vec::new();
        if payment.status != PaymentStatus::Draft {
            blocking_reasons.push(format!("payment is already {}", payment.status));
        }
        if payment.journal_id.is_none() {
            blocking_reasons.push("missing journal".to_string());
        }
        if !payment.amount.is_sign_positive() || payment.amount.is_zero() {
            blocking_reasons.push("amount must be positive".to_string());
        }
        if payment.third_party_id.is_none() {
            warnings.push("no third party assigned".to_string());
        }
        if payment.reference.trim().is_empty() {
            warnings.push("no reference".to_string());
        }

        ValidationResult {
            payment_id: id.clone(),
            label: payment.label(),
            can_confirm: blocking_reasons.is_empty(),
            blocking_reasons,
            warnings,
        }
    }
}

#[async_trait]
impl PaymentsApi for InMemoryPaymentsApi {
    async fn list(&self, filters: &PaymentFilters) -> PayResult<PaymentPage> {
        let backend = self.receive(ApiCall::List(filters.clone()))?;

        let matching: Vec<&Payment> = backend
            .payments
            .values()
            .filter(|p| filters.status.is_none_or(|s| p.status == s))
            .filter(|p| filters.payment_type.is_none_or(|t| p.payment_type == t))
            .collect();

        let page = filters.page();
        let size = filters.size();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(((page - 1) * size) as usize)
            .take(size as usize)
            .map(|p| backend.record_for(p))
            .collect();

        Ok(PaymentPage {
            items,
            total,
            page,
            size,
            pages: Some(total.div_ceil(u64::from(size)) as u32),
        })
    }

    async fn create(&self, new_payment: &NewPayment) -> PayResult<PaymentRecord> {
        let mut backend = self.receive(ApiCall::Create {
            reference: new_payment.reference.clone(),
        })?;

        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(format!("pay-{}", Uuid::new_v4().simple())),
            status: PaymentStatus::Draft,
            payment_type: new_payment.payment_type,
            amount: new_payment.amount,
            currency_code: new_payment.currency_code.clone(),
            third_party_id: new_payment.third_party_id.clone(),
            journal_id: new_payment.journal_id.clone(),
            reference: new_payment.reference.clone(),
            description: new_payment.description.clone(),
            payment_date: new_payment.payment_date,
            created_at: now,
            updated_at: now,
        };
        let record = payment.to_record();
        backend.payments.insert(payment.id.clone(), payment);
        Ok(record)
    }

    async fn transition(&self, id: &PaymentId, transition: Transition) -> PayResult<()> {
        let mut backend = self.receive(ApiCall::Transition {
            id: id.clone(),
            transition,
        })?;
        backend
            .apply(id, transition)
            .map_err(|(status, message)| PayError::Api { status, message })
    }

    async fn bulk(
        &self,
        operation: BulkOperation,
        request: &BulkRequest,
    ) -> PayResult<BulkOperationResult> {
        let mut backend = self.receive(ApiCall::Bulk {
            operation,
            request: request.clone(),
        })?;

        if request.payment_ids.is_empty() {
            return Err(PayError::Api {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: "payment_ids must not be empty".to_string(),
            });
        }

        let mut results = IndexMap::new();
        for id in &request.payment_ids {
            let outcome = if backend.rejected.contains(id) {
                ItemOutcome::failed("rejected by backend")
            } else {
                match backend.apply(id, operation.transition()) {
                    Ok(()) => ItemOutcome::ok(),
                    Err((_, message)) => ItemOutcome::failed(message),
                }
            };
            results.insert(id.clone(), outcome);
        }

        Ok(BulkOperationResult::from_outcomes(
            request.payment_ids.len(),
            results,
        ))
    }

    async fn validate_bulk(&self, ids: &[PaymentId]) -> PayResult<ValidationReport> {
        let backend = self.receive(ApiCall::Validate { ids: ids.to_vec() })?;
        let results = ids.iter().map(|id| backend.validate_one(id)).collect();
        Ok(ValidationReport::from_results(results))
    }
}
