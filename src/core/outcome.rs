//! Bulk request bodies, per-item results and validation reports
//!
//! These are the contract types of the bulk endpoints. A partially failed
//! batch and a blocked validation are both ordinary values here; nothing in
//! this module is an error.

use crate::core::entity::PaymentId;
use crate::core::lifecycle::BulkOperation;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Caller options for a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOptions {
    /// Proceed despite non-blocking validation warnings
    #[serde(default)]
    pub force: bool,
    /// Accounting date for confirm/post; the backend uses today when absent
    #[serde(default)]
    pub posting_date: Option<NaiveDate>,
    /// Free-text reason for cancel/reset
    #[serde(default)]
    pub reason: Option<String>,
}

impl BulkOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_posting_date(mut self, date: NaiveDate) -> Self {
        self.posting_date = Some(date);
        self
    }
}

/// Body of `POST /payments/bulk/{operation}`
///
/// Only the option fields meaningful for the operation are serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub payment_ids: Vec<PaymentId>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub force: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BulkRequest {
    pub fn new(operation: BulkOperation, payment_ids: Vec<PaymentId>, options: &BulkOptions) -> Self {
        let mut request = Self {
            payment_ids,
            force: false,
            posting_date: None,
            reason: None,
        };
        match operation {
            BulkOperation::Confirm | BulkOperation::Post => {
                request.force = options.force;
                request.posting_date = options.posting_date;
            }
            BulkOperation::Cancel | BulkOperation::ResetToDraft => {
                request.reason = options.reason.clone();
            }
            BulkOperation::Delete => {}
        }
        request
    }
}

/// Body of `POST /payments/bulk/validate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub payment_ids: Vec<PaymentId>,
}

/// Outcome of one payment inside a bulk call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregated response of a bulk call
///
/// `results` keeps the order in which the backend listed the payments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationResult {
    #[serde(default)]
    pub total_requested: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(default)]
    pub results: IndexMap<PaymentId, ItemOutcome>,
}

impl BulkOperationResult {
    /// Build a result from per-item outcomes, deriving the counts
    pub fn from_outcomes(
        total_requested: usize,
        results: IndexMap<PaymentId, ItemOutcome>,
    ) -> Self {
        let successful = results.values().filter(|r| r.success).count();
        Self {
            total_requested,
            successful,
            failed: results.len() - successful,
            results,
        }
    }

    pub fn succeeded_ids(&self) -> impl Iterator<Item = &PaymentId> {
        self.results
            .iter()
            .filter(|(_, outcome)| outcome.success)
            .map(|(id, _)| id)
    }

    /// Failed payments with their error message
    pub fn failures(&self) -> impl Iterator<Item = (&PaymentId, &str)> {
        self.results.iter().filter(|(_, o)| !o.success).map(|(id, o)| {
            (
                id,
                o.error.as_deref().unwrap_or("operation failed without detail"),
            )
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// `successful + failed <= total_requested`
    pub fn is_consistent(&self) -> bool {
        self.successful + self.failed <= self.total_requested
    }

    /// One-line summary, e.g. "2 payments confirmed, 1 failed"
    pub fn summary(&self, operation: BulkOperation) -> String {
        let noun = if self.successful == 1 { "payment" } else { "payments" };
        if self.failed == 0 {
            format!("{} {} {}", self.successful, noun, operation.past_tense())
        } else {
            format!(
                "{} {} {}, {} failed",
                self.successful,
                noun,
                operation.past_tense(),
                self.failed
            )
        }
    }
}

/// Dry-run verdict for one payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(alias = "id")]
    pub payment_id: PaymentId,
    /// Human-readable label (reference, amount)
    #[serde(default)]
    pub label: String,
    pub can_confirm: bool,
    /// Non-empty iff `can_confirm` is false
    #[serde(default)]
    pub blocking_reasons: Vec<String>,
    /// May be non-empty even when `can_confirm` is true
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_blocked(&self) -> bool {
        !self.can_confirm || !self.blocking_reasons.is_empty()
    }
}

/// Response of `POST /payments/bulk/validate`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total: usize,
    pub can_confirm_count: usize,
    pub blocked_count: usize,
    #[serde(default)]
    pub warnings_count: usize,
    #[serde(default)]
    pub validation_results: Vec<ValidationResult>,
}

impl ValidationReport {
    /// Build a report from per-payment results, deriving the counts
    pub fn from_results(validation_results: Vec<ValidationResult>) -> Self {
        let blocked_count = validation_results.iter().filter(|r| r.is_blocked()).count();
        let warnings_count = validation_results
            .iter()
            .filter(|r| !r.warnings.is_empty())
            .count();
        Self {
            total: validation_results.len(),
            can_confirm_count: validation_results.len() - blocked_count,
            blocked_count,
            warnings_count,
            validation_results,
        }
    }

    /// Blocked according to the summary counts or to any individual result
    pub fn has_blocks(&self) -> bool {
        self.blocked_count > 0 || self.validation_results.iter().any(|r| r.is_blocked())
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings_count > 0
            || self.validation_results.iter().any(|r| !r.warnings.is_empty())
    }

    /// Payments that may proceed, in report order
    pub fn eligible_ids(&self) -> Vec<PaymentId> {
        self.validation_results
            .iter()
            .filter(|r| !r.is_blocked())
            .map(|r| r.payment_id.clone())
            .collect()
    }

    pub fn blocked(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validation_results.iter().filter(|r| r.is_blocked())
    }

    pub fn with_warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validation_results
            .iter()
            .filter(|r| !r.warnings.is_empty())
    }

    /// Whether the summary counts agree with the per-payment results
    pub fn is_consistent(&self) -> bool {
        let derived = Self::from_results(self.validation_results.clone());
        derived.blocked_count == self.blocked_count
            && derived.warnings_count == self.warnings_count
            && derived.total == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_request_only_carries_relevant_options() {
        let options = BulkOptions::forced().with_reason("duplicate");
        let ids = vec![PaymentId::from("a")];

        let confirm = serde_json::to_value(BulkRequest::new(
            BulkOperation::Confirm,
            ids.clone(),
            &options,
        ))
        .unwrap();
        assert_eq!(confirm, json!({"payment_ids": ["a"], "force": true}));

        let cancel =
            serde_json::to_value(BulkRequest::new(BulkOperation::Cancel, ids.clone(), &options))
                .unwrap();
        assert_eq!(cancel, json!({"payment_ids": ["a"], "reason": "duplicate"}));

        let delete =
            serde_json::to_value(BulkRequest::new(BulkOperation::Delete, ids, &options)).unwrap();
        assert_eq!(delete, json!({"payment_ids": ["a"]}));
    }

    #[test]
    fn test_result_preserves_backend_order() {
        let result: BulkOperationResult = serde_json::from_value(json!({
            "total_requested": 3,
            "successful": 2,
            "failed": 1,
            "results": {
                "c": {"success": true},
                "a": {"success": false, "error": "journal closed"},
                "b": {"success": true}
            }
        }))
        .unwrap();

        let order: Vec<&str> = result.results.keys().map(PaymentId::as_str).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert!(result.is_consistent());
        assert!(result.has_failures());

        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures, vec![(&PaymentId::from("a"), "journal closed")]);
        assert_eq!(result.summary(BulkOperation::Confirm), "2 payments confirmed, 1 failed");
    }

    #[test]
    fn test_validation_report_scenario() {
        let report: ValidationReport = serde_json::from_value(json!({
            "total": 3,
            "can_confirm_count": 2,
            "blocked_count": 1,
            "validation_results": [
                {"payment_id": "A", "can_confirm": true},
                {"payment_id": "B", "can_confirm": true},
                {"payment_id": "C", "can_confirm": false, "blocking_reasons": ["missing journal"]}
            ]
        }))
        .unwrap();

        assert!(report.has_blocks());
        assert!(!report.has_warnings());
        assert_eq!(
            report.eligible_ids(),
            vec![PaymentId::from("A"), PaymentId::from("B")]
        );
        let blocked: Vec<_> = report.blocked().collect();
        assert_eq!(blocked[0].blocking_reasons, vec!["missing journal".to_string()]);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_validation_items_keyed_by_id() {
        let report: ValidationReport = serde_json::from_value(json!({
            "total": 3,
            "can_confirm_count": 2,
            "blocked_count": 1,
            "validation_results": [
                {"id": "A", "can_confirm": true},
                {"id": "B", "can_confirm": true},
                {"id": "C", "can_confirm": false, "blocking_reasons": ["missing journal"]}
            ]
        }))
        .unwrap();

        assert!(report.has_blocks());
        assert_eq!(
            report.eligible_ids(),
            vec![PaymentId::from("A"), PaymentId::from("B")]
        );
        assert_eq!(report.blocked().next().unwrap().payment_id.as_str(), "C");
    }

    #[test]
    fn test_inconsistent_counts_still_block() {
        let report = ValidationReport {
            total: 1,
            can_confirm_count: 1,
            blocked_count: 0,
            warnings_count: 0,
            validation_results: vec![ValidationResult {
                payment_id: PaymentId::from("X"),
                label: String::new(),
                can_confirm: false,
                blocking_reasons: vec!["already posted".to_string()],
                warnings: vec![],
            }],
        };
        assert!(report.has_blocks());
        assert!(!report.is_consistent());
    }
}
