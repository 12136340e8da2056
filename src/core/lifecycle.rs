//! Payment lifecycle state machine and selection eligibility
//!
//! ```text
//! DRAFT ──confirm/post──▶ POSTED ──cancel──▶ CANCELLED
//!   ▲                        │                   │
//!   └──────reset─────────────┴───────reset───────┘
//! DRAFT ──delete──▶ (removed)
//! ```
//!
//! No other transition is permitted. Invalid transitions are filtered on the
//! client before a request is built, rather than sent and rejected.

use crate::core::error::{PayError, PayResult};
use crate::core::status::PaymentStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single-payment lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Confirm,
    Cancel,
    ResetToDraft,
    Delete,
}

impl Transition {
    /// Status reached by applying this transition, `None` when the payment is removed
    ///
    /// # Errors
    ///
    /// Returns `PayError::InvalidTransition` when `from` does not allow it.
    pub fn apply(self, from: PaymentStatus) -> PayResult<Option<PaymentStatus>> {
        use PaymentStatus::*;

        let next = match (self, from) {
            (Transition::Confirm, Draft) => Some(Posted),
            (Transition::Cancel, Posted) => Some(Cancelled),
            (Transition::ResetToDraft, Posted | Cancelled) => Some(Draft),
            (Transition::Delete, Draft) => None,
            _ => {
                return Err(PayError::InvalidTransition {
                    transition: self,
                    from,
                });
            }
        };
        Ok(next)
    }

    /// Whether the transition may be applied to a payment in `from`
    pub fn allowed_from(self, from: PaymentStatus) -> bool {
        self.apply(from).is_ok()
    }

    /// Path segment of the per-item endpoint (`POST /payments/{id}/{segment}`)
    ///
    /// Delete has none: it is `DELETE /payments/{id}`.
    pub const fn path_segment(&self) -> Option<&'static str> {
        match self {
            Transition::Confirm => Some("confirm"),
            Transition::Cancel => Some("cancel"),
            Transition::ResetToDraft => Some("reset-to-draft"),
            Transition::Delete => None,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transition::Confirm => "confirm",
            Transition::Cancel => "cancel",
            Transition::ResetToDraft => "reset",
            Transition::Delete => "delete",
        })
    }
}

/// A bulk lifecycle operation, dispatched to `POST /payments/bulk/{segment}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    Confirm,
    Cancel,
    Delete,
    Post,
    ResetToDraft,
}

impl BulkOperation {
    pub const ALL: [BulkOperation; 5] = [
        Self::Confirm,
        Self::Cancel,
        Self::Delete,
        Self::Post,
        Self::ResetToDraft,
    ];

    /// The per-payment transition this operation applies
    pub const fn transition(&self) -> Transition {
        match self {
            BulkOperation::Confirm | BulkOperation::Post => Transition::Confirm,
            BulkOperation::Cancel => Transition::Cancel,
            BulkOperation::Delete => Transition::Delete,
            BulkOperation::ResetToDraft => Transition::ResetToDraft,
        }
    }

    pub const fn path_segment(&self) -> &'static str {
        match self {
            BulkOperation::Confirm => "confirm",
            BulkOperation::Cancel => "cancel",
            BulkOperation::Delete => "delete",
            BulkOperation::Post => "post",
            BulkOperation::ResetToDraft => "reset-to-draft",
        }
    }

    /// Whether the operation is irreversible enough to require the
    /// validate-then-mutate flow
    pub const fn requires_validation(&self) -> bool {
        matches!(self, BulkOperation::Confirm | BulkOperation::Post)
    }

    /// Past-tense verb for result summaries
    pub const fn past_tense(&self) -> &'static str {
        match self {
            BulkOperation::Confirm => "confirmed",
            BulkOperation::Cancel => "cancelled",
            BulkOperation::Delete => "deleted",
            BulkOperation::Post => "posted",
            BulkOperation::ResetToDraft => "reset to draft",
        }
    }
}

impl fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BulkOperation::Confirm => "confirm",
            BulkOperation::Cancel => "cancel",
            BulkOperation::Delete => "delete",
            BulkOperation::Post => "post",
            BulkOperation::ResetToDraft => "reset",
        })
    }
}

/// Eligibility predicates computed over the statuses of a selection
///
/// An empty selection is eligible for nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    /// Number of selected payments the predicates were computed over
    pub selected: usize,
    pub can_confirm: bool,
    pub can_cancel: bool,
    pub can_delete: bool,
    pub can_reset: bool,
}

impl Eligibility {
    pub fn evaluate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = PaymentStatus>,
    {
        let mut selected = 0;
        let mut all_draft = true;
        let mut any_posted = false;
        let mut any_cancelled = false;

        for status in statuses {
            selected += 1;
            match status {
                PaymentStatus::Draft => {}
                PaymentStatus::Posted => {
                    all_draft = false;
                    any_posted = true;
                }
                PaymentStatus::Cancelled => {
                    all_draft = false;
                    any_cancelled = true;
                }
            }
        }

        if selected == 0 {
            return Self::default();
        }

        Self {
            selected,
            can_confirm: all_draft,
            can_cancel: any_posted,
            can_delete: all_draft,
            can_reset: any_posted || any_cancelled,
        }
    }

    /// can-post shares the can-confirm predicate
    pub fn can_post(&self) -> bool {
        self.can_confirm
    }

    pub fn allows(&self, operation: BulkOperation) -> bool {
        match operation {
            BulkOperation::Confirm => self.can_confirm,
            BulkOperation::Post => self.can_post(),
            BulkOperation::Cancel => self.can_cancel,
            BulkOperation::Delete => self.can_delete,
            BulkOperation::ResetToDraft => self.can_reset,
        }
    }

    /// Why `operation` is not allowed, `None` when it is
    pub fn blocking_reason(&self, operation: BulkOperation) -> Option<&'static str> {
        if self.allows(operation) {
            return None;
        }
        if self.selected == 0 {
            return Some("no payments selected");
        }
        Some(match operation {
            BulkOperation::Confirm | BulkOperation::Post | BulkOperation::Delete => {
                "every selected payment must be in draft"
            }
            BulkOperation::Cancel => "at least one selected payment must be posted",
            BulkOperation::ResetToDraft => {
                "at least one selected payment must be posted or cancelled"
            }
        })
    }
}
