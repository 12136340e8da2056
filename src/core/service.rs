//! Service trait for the remote payments backend

use crate::core::entity::{NewPayment, PaymentId, PaymentRecord};
use crate::core::error::PayResult;
use crate::core::lifecycle::{BulkOperation, Transition};
use crate::core::outcome::{BulkOperationResult, BulkRequest, ValidationReport};
use crate::core::query::{PaymentFilters, PaymentPage};
use async_trait::async_trait;

/// Remote operations on payments
///
/// Implementations talk to the accounting backend (see
/// [`HttpPaymentsApi`](crate::client::HttpPaymentsApi)) or simulate it
/// (see [`InMemoryPaymentsApi`](crate::storage::InMemoryPaymentsApi)).
/// Records are returned raw; normalization is the store's job.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// `GET /payments?status=&payment_type=&page=&size=`
    async fn list(&self, filters: &PaymentFilters) -> PayResult<PaymentPage>;

    /// `POST /payments`
    async fn create(&self, payment: &NewPayment) -> PayResult<PaymentRecord>;

    /// Per-item transition
    ///
    /// `POST /payments/{id}/confirm|cancel|reset-to-draft` or
    /// `DELETE /payments/{id}`.
    async fn transition(&self, id: &PaymentId, transition: Transition) -> PayResult<()>;

    /// `POST /payments/bulk/{operation}`
    ///
    /// Per-item failures are reported in the result; only a failure of the
    /// whole call is an error.
    async fn bulk(
        &self,
        operation: BulkOperation,
        request: &BulkRequest,
    ) -> PayResult<BulkOperationResult>;

    /// `POST /payments/bulk/validate`
    async fn validate_bulk(&self, ids: &[PaymentId]) -> PayResult<ValidationReport>;
}
