//! Bulk lifecycle operations over many payments
//!
//! [`BulkOrchestrator`] turns a set of payment ids into one call to the bulk
//! endpoint of an operation. Ids whose cached status rules the transition out
//! are skipped client-side; ids that are not in the loaded page are sent
//! as-is and left for the backend to judge.
//!
//! A partially failed batch is a successful call: the per-payment outcome
//! lives in [`BulkOperationResult`]. Only a whole-batch failure (transport,
//! non-2xx, undecodable body) is an error, and it leaves the selection alone.

pub mod validation;

pub use validation::{ConfirmationFlow, Decision, FlowOutcome};

use crate::config::ClientConfig;
use crate::core::entity::PaymentId;
use crate::core::error::{PayError, PayResult};
use crate::core::events::StoreEvent;
use crate::core::lifecycle::{BulkOperation, Eligibility};
use crate::core::outcome::{BulkOperationResult, BulkOptions, BulkRequest};
use crate::store::PaymentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What happens to the selection once a bulk call has returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Clear the selection, whatever the per-payment outcome
    #[default]
    ClearAll,
    /// Keep only the payments that failed, so they can be retried
    KeepFailed,
}

/// A payment dropped before dispatch because its cached status forbids the operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPayment {
    pub payment_id: PaymentId,
    pub reason: String,
}

/// Result of [`BulkOrchestrator::execute`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub operation: BulkOperation,
    /// Aggregated backend response; empty when nothing was dispatched
    pub result: BulkOperationResult,
    pub skipped: Vec<SkippedPayment>,
}

impl BulkOutcome {
    /// Whether any request reached the backend
    pub fn dispatched(&self) -> bool {
        self.result.total_requested > 0
    }

    /// No failure and nothing skipped
    pub fn is_complete_success(&self) -> bool {
        !self.result.has_failures() && self.skipped.is_empty()
    }

    pub fn summary(&self) -> String {
        let summary = self.result.summary(self.operation);
        if self.skipped.is_empty() {
            summary
        } else {
            format!("{}, {} skipped", summary, self.skipped.len())
        }
    }
}

/// Dispatches bulk operations on behalf of a [`PaymentStore`]
#[derive(Clone)]
pub struct BulkOrchestrator {
    store: Arc<PaymentStore>,
    policy: SelectionPolicy,
    refresh_after_bulk: bool,
}

impl BulkOrchestrator {
    pub fn new(store: Arc<PaymentStore>) -> Self {
        Self {
            store,
            policy: SelectionPolicy::default(),
            refresh_after_bulk: true,
        }
    }

    pub fn from_config(store: Arc<PaymentStore>, config: &ClientConfig) -> Self {
        Self {
            store,
            policy: config.selection_policy,
            refresh_after_bulk: config.refresh_after_bulk,
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether to reload the page after a bulk call (otherwise the
    /// succeeded transitions are applied to the cache directly)
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh_after_bulk = refresh;
        self
    }

    pub fn store(&self) -> &Arc<PaymentStore> {
        &self.store
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Eligibility of the current selection
    pub fn eligibility(&self) -> Eligibility {
        self.store.eligibility()
    }

    pub fn can(&self, operation: BulkOperation) -> bool {
        self.eligibility().allows(operation)
    }

    /// Run `operation` on the current selection
    ///
    /// # Errors
    ///
    /// `PayError::Ineligible` without any remote call when the selection's
    /// eligibility predicate for `operation` is false.
    pub async fn execute_selected(
        &self,
        operation: BulkOperation,
        options: &BulkOptions,
    ) -> PayResult<BulkOutcome> {
        let eligibility = self.eligibility();
        if let Some(reason) = eligibility.blocking_reason(operation) {
            tracing::debug!(%operation, reason, "bulk operation refused for selection");
            return Err(PayError::Ineligible {
                operation,
                reason: reason.to_string(),
            });
        }
        self.execute(operation, self.store.selected_ids(), options)
            .await
    }

    /// Run `operation` on `ids` with a single bulk call
    ///
    /// The selection policy applies once the call returns, and also when
    /// every id was skipped and nothing was sent.
    pub async fn execute(
        &self,
        operation: BulkOperation,
        ids: Vec<PaymentId>,
        options: &BulkOptions,
    ) -> PayResult<BulkOutcome> {
        let transition = operation.transition();
        let mut dispatch = Vec::with_capacity(ids.len());
        let mut skipped = Vec::new();

        for id in ids {
            match self.store.payment(&id) {
                Some(payment) => match transition.apply(payment.status) {
                    Ok(_) => dispatch.push(id),
                    Err(err) => skipped.push(SkippedPayment {
                        payment_id: id,
                        reason: err.to_string(),
                    }),
                },
                None => dispatch.push(id),
            }
        }

        if dispatch.is_empty() {
            tracing::info!(%operation, skipped = skipped.len(), "nothing to dispatch");
            let result = BulkOperationResult::default();
            self.apply_selection_policy(&result);
            return Ok(BulkOutcome {
                operation,
                result,
                skipped,
            });
        }

        let request = BulkRequest::new(operation, dispatch, options);
        tracing::debug!(
            %operation,
            count = request.payment_ids.len(),
            skipped = skipped.len(),
            "dispatching bulk operation"
        );
        let api = Arc::clone(self.store.api());
        let mut result = match self.store.tracked(api.bulk(operation, &request)).await {
            Ok(result) => result,
            Err(err) => {
                self.store.set_error(operation.path_segment(), &err);
                return Err(err);
            }
        };

        // Some backends only report the counts and the per-id map
        if result.total_requested == 0 {
            result.total_requested = request.payment_ids.len();
        }
        if !result.is_consistent() {
            tracing::warn!(
                %operation,
                total_requested = result.total_requested,
                successful = result.successful,
                failed = result.failed,
                "bulk result counts exceed the number requested"
            );
        }

        self.apply_selection_policy(&result);
        self.sync_cache(operation, &result).await;

        self.store.events().publish(StoreEvent::BulkCompleted {
            operation,
            successful: result.successful,
            failed: result.failed,
            skipped: skipped.len(),
        });

        let outcome = BulkOutcome {
            operation,
            result,
            skipped,
        };
        if outcome.result.has_failures() {
            for (id, error) in outcome.result.failures() {
                tracing::warn!(%operation, payment_id = %id, error, "bulk item failed");
            }
        }
        tracing::info!(%operation, "{}", outcome.summary());
        Ok(outcome)
    }

    fn apply_selection_policy(&self, result: &BulkOperationResult) {
        match self.policy {
            SelectionPolicy::ClearAll => self.store.clear_selection(),
            SelectionPolicy::KeepFailed => self
                .store
                .set_selection(result.failures().map(|(id, _)| id.clone())),
        }
    }

    async fn sync_cache(&self, operation: BulkOperation, result: &BulkOperationResult) {
        if self.refresh_after_bulk {
            // The bulk call itself succeeded; a failed reload is recorded by the store.
            if let Err(err) = self.store.refresh().await {
                tracing::warn!(%operation, error = %err, "reload after bulk operation failed");
            }
            return;
        }
        let transition = operation.transition();
        for id in result.succeeded_ids() {
            self.store.apply_local_transition(id, transition);
        }
    }
}
