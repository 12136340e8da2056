//! Validate-then-confirm flow for irreversible bulk operations
//!
//! Confirming or posting cannot be undone without a reset, so these
//! operations first ask the backend for a dry-run report:
//!
//! 1. any blocked payment: nothing is mutated; the caller may retry with the
//!    eligible subset through [`ConfirmationFlow::proceed_with_eligible`]
//! 2. warnings only: mutate only when the caller forces it
//! 3. clean report: mutate
//!
//! The mutation itself goes through [`BulkOrchestrator::execute`].

use crate::bulk::{BulkOrchestrator, BulkOutcome};
use crate::core::entity::PaymentId;
use crate::core::error::{PayError, PayResult, ValidationError};
use crate::core::lifecycle::BulkOperation;
use crate::core::outcome::{BulkOptions, ValidationReport};
use std::sync::Arc;

/// What to do with a validation report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Block,
    AskConfirmation,
    Proceed,
}

impl Decision {
    /// Blocks win over warnings; warnings need `force`
    pub fn from_report(report: &ValidationReport, force: bool) -> Self {
        if report.has_blocks() {
            Decision::Block
        } else if report.has_warnings() && !force {
            Decision::AskConfirmation
        } else {
            Decision::Proceed
        }
    }
}

/// Where a run of the flow ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// At least one payment is blocked; nothing was mutated
    Blocked { report: ValidationReport },
    /// Warnings only and `force` was not set; nothing was mutated
    NeedsConfirmation { report: ValidationReport },
    /// The bulk operation ran
    Executed {
        report: ValidationReport,
        outcome: BulkOutcome,
    },
}

impl FlowOutcome {
    pub fn report(&self) -> &ValidationReport {
        match self {
            FlowOutcome::Blocked { report }
            | FlowOutcome::NeedsConfirmation { report }
            | FlowOutcome::Executed { report, .. } => report,
        }
    }

    pub fn executed(&self) -> Option<&BulkOutcome> {
        match self {
            FlowOutcome::Executed { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}

/// Runs confirm (or post) behind a validation dry run
#[derive(Clone)]
pub struct ConfirmationFlow {
    orchestrator: BulkOrchestrator,
    operation: BulkOperation,
}

impl ConfirmationFlow {
    /// Flow for bulk confirm
    pub fn new(orchestrator: BulkOrchestrator) -> Self {
        Self {
            orchestrator,
            operation: BulkOperation::Confirm,
        }
    }

    /// Flow for bulk post
    pub fn posting(orchestrator: BulkOrchestrator) -> Self {
        Self {
            orchestrator,
            operation: BulkOperation::Post,
        }
    }

    /// Flow for an arbitrary operation
    ///
    /// # Errors
    ///
    /// `PayError::Ineligible` when the operation is not one that goes through
    /// validation.
    pub fn for_operation(
        orchestrator: BulkOrchestrator,
        operation: BulkOperation,
    ) -> PayResult<Self> {
        if !operation.requires_validation() {
            return Err(PayError::Ineligible {
                operation,
                reason: "only confirm and post are validated before running".to_string(),
            });
        }
        Ok(Self {
            orchestrator,
            operation,
        })
    }

    pub fn operation(&self) -> BulkOperation {
        self.operation
    }

    /// Ask the backend for a dry-run report on `ids`
    pub async fn validate(&self, ids: &[PaymentId]) -> PayResult<ValidationReport> {
        if ids.is_empty() {
            return Err(ValidationError::MissingArgument {
                argument: "payment_ids".to_string(),
            }
            .into());
        }

        let store = self.orchestrator.store();
        let api = Arc::clone(store.api());
        let report = match store.tracked(api.validate_bulk(ids)).await {
            Ok(report) => report,
            Err(err) => {
                store.set_error("validate", &err);
                return Err(err);
            }
        };

        if !report.is_consistent() {
            tracing::warn!(
                total = report.total,
                blocked_count = report.blocked_count,
                "validation summary disagrees with its results"
            );
        }
        tracing::debug!(
            total = report.total,
            can_confirm = report.can_confirm_count,
            blocked = report.blocked_count,
            warnings = report.warnings_count,
            "validation report received"
        );
        Ok(report)
    }

    /// Validate `ids`, then run the operation if the report allows it
    pub async fn run(&self, ids: &[PaymentId], options: &BulkOptions) -> PayResult<FlowOutcome> {
        let report = self.validate(ids).await?;
        self.resolve(report, options).await
    }

    /// Validate and run on the current selection
    pub async fn run_selected(&self, options: &BulkOptions) -> PayResult<FlowOutcome> {
        let ids = self.orchestrator.store().selected_ids();
        self.run(&ids, options).await
    }

    /// Run the operation on the payments `report` did not block
    ///
    /// Warnings on those payments still need `force`.
    pub async fn proceed_with_eligible(
        &self,
        report: ValidationReport,
        options: &BulkOptions,
    ) -> PayResult<FlowOutcome> {
        let eligible = report.eligible_ids();
        if eligible.is_empty() {
            return Err(PayError::Ineligible {
                operation: self.operation,
                reason: "no payment passed validation".to_string(),
            });
        }

        let warned = report.with_warnings().any(|r| !r.is_blocked());
        if warned && !options.force {
            return Ok(FlowOutcome::NeedsConfirmation { report });
        }

        tracing::info!(
            operation = %self.operation,
            eligible = eligible.len(),
            blocked = report.blocked().count(),
            "proceeding with eligible payments"
        );
        let outcome = self
            .orchestrator
            .execute(self.operation, eligible, options)
            .await?;
        Ok(FlowOutcome::Executed { report, outcome })
    }

    async fn resolve(
        &self,
        report: ValidationReport,
        options: &BulkOptions,
    ) -> PayResult<FlowOutcome> {
        match Decision::from_report(&report, options.force) {
            Decision::Block => {
                tracing::info!(
                    operation = %self.operation,
                    blocked = report.blocked_count,
                    "bulk operation blocked by validation"
                );
                Ok(FlowOutcome::Blocked { report })
            }
            Decision::AskConfirmation => Ok(FlowOutcome::NeedsConfirmation { report }),
            Decision::Proceed => {
                let ids = report.eligible_ids();
                let outcome = self
                    .orchestrator
                    .execute(self.operation, ids, options)
                    .await?;
                Ok(FlowOutcome::Executed { report, outcome })
            }
        }
    }
}
