//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bulkpay::prelude::*;
use bulkpay::core::outcome::BulkRequest;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

pub fn payment(id: &str, status: PaymentStatus) -> Payment {
    let now = Utc::now();
    Payment {
        id: PaymentId::from(id),
        status,
        payment_type: PaymentType::CustomerPayment,
        amount: Decimal::new(12_500, 2),
        currency_code: "EUR".to_string(),
        third_party_id: Some("cust-7".to_string()),
        journal_id: Some("BANK".to_string()),
        reference: format!("REF-{}", id),
        description: None,
        payment_date: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn draft(id: &str) -> Payment {
    payment(id, PaymentStatus::Draft)
}

pub fn posted(id: &str) -> Payment {
    payment(id, PaymentStatus::Posted)
}

pub fn cancelled(id: &str) -> Payment {
    payment(id, PaymentStatus::Cancelled)
}

pub fn ids(raw: &[&str]) -> Vec<PaymentId> {
    raw.iter().copied().map(PaymentId::from).collect()
}

/// In-memory backend plus a store on top of it
pub fn store_with(payments: Vec<Payment>) -> (InMemoryPaymentsApi, Arc<PaymentStore>) {
    let api = InMemoryPaymentsApi::with_payments(payments);
    let store = Arc::new(PaymentStore::new(Arc::new(api.clone())));
    (api, store)
}

/// Backend whose listing calls wait until released, one permit per call
///
/// Lets a test decide in which order concurrent fetches complete.
pub struct GatedApi {
    inner: InMemoryPaymentsApi,
    gate: Arc<Semaphore>,
    waiting: AtomicUsize,
}

impl GatedApi {
    pub fn new(inner: InMemoryPaymentsApi) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Let one pending listing call complete
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentsApi for GatedApi {
    async fn list(&self, filters: &PaymentFilters) -> PayResult<PaymentPage> {
        // Snapshot the backend before waiting, like a request already answered in flight
        let page = self.inner.list(filters).await;
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await;
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        if let Ok(permit) = permit {
            permit.forget();
        }
        page
    }

    async fn create(&self, payment: &NewPayment) -> PayResult<PaymentRecord> {
        self.inner.create(payment).await
    }

    async fn transition(&self, id: &PaymentId, transition: Transition) -> PayResult<()> {
        self.inner.transition(id, transition).await
    }

    async fn bulk(
        &self,
        operation: BulkOperation,
        request: &BulkRequest,
    ) -> PayResult<BulkOperationResult> {
        self.inner.bulk(operation, request).await
    }

    async fn validate_bulk(&self, ids: &[PaymentId]) -> PayResult<ValidationReport> {
        self.inner.validate_bulk(ids).await
    }
}

/// Wait until `gated` has `count` listing calls parked at the gate
pub async fn wait_for_waiting(gated: &GatedApi, count: usize) {
    for _ in 0..200 {
        if gated.waiting() >= count {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("listing calls never reached the gate");
}

/// Backend whose bulk responses carry the counts and per-id map only
pub struct CountsOnlyApi {
    pub inner: InMemoryPaymentsApi,
}

#[async_trait]
impl PaymentsApi for CountsOnlyApi {
    async fn list(&self, filters: &PaymentFilters) -> PayResult<PaymentPage> {
        self.inner.list(filters).await
    }

    async fn create(&self, payment: &NewPayment) -> PayResult<PaymentRecord> {
        self.inner.create(payment).await
    }

    async fn transition(&self, id: &PaymentId, transition: Transition) -> PayResult<()> {
        self.inner.transition(id, transition).await
    }

    async fn bulk(
        &self,
        operation: BulkOperation,
        request: &BulkRequest,
    ) -> PayResult<BulkOperationResult> {
        let mut result = self.inner.bulk(operation, request).await?;
        result.total_requested = 0;
        Ok(result)
    }

    async fn validate_bulk(&self, ids: &[PaymentId]) -> PayResult<ValidationReport> {
        self.inner.validate_bulk(ids).await
    }
}
