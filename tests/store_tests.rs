//! Integration tests for PaymentStore
//!
//! These tests verify that:
//! - Fetching replaces the page and a failed fetch keeps the previous one
//! - Late responses from superseded fetches never overwrite newer state
//! - Single transitions touch only the status of the matching payment
//! - The selection is local and survives page changes
//! - Unknown enum values are normalized and reported

mod common;

use bulkpay::core::status::fallback_count;
use bulkpay::prelude::*;
use bulkpay::storage::ApiCall;
use chrono::Utc;
use common::*;
use rust_decimal::Decimal;
use std::sync::Arc;

// =============================================================================
// Fetch
// =============================================================================

mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_replaces_page_and_pagination() {
        let (_api, store) = store_with((0..25).map(|i| draft(&format!("p{:02}", i))).collect());

        let outcome = store.fetch(PaymentFilters::default()).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Applied { count: 20 });

        let pagination = store.pagination();
        assert_eq!(pagination.total, 25);
        assert_eq!(pagination.total_pages, 2);
        assert!(pagination.has_next);

        store.next_page().await.unwrap();
        assert_eq!(store.payments().len(), 5);
        assert_eq!(store.pagination().page, 2);
        assert_eq!(store.next_page().await.unwrap(), None);

        store.previous_page().await.unwrap();
        assert_eq!(store.pagination().page, 1);
        assert_eq!(store.previous_page().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_filters_are_merged() {
        let (api, store) = store_with(vec![draft("d1"), posted("p1"), posted("p2")]);

        store
            .fetch(PaymentFilters::default().with_status(PaymentStatus::Posted))
            .await
            .unwrap();
        assert_eq!(store.payments().len(), 2);

        // A page-only change keeps the status filter
        store.go_to_page(1).await.unwrap();
        assert_eq!(store.filters().status, Some(PaymentStatus::Posted));

        store.reset_filters().await.unwrap();
        assert_eq!(store.filters().status, None);
        assert_eq!(store.payments().len(), 3);

        let ApiCall::List(last) = api.calls().last().cloned().unwrap() else {
            panic!("expected a listing call");
        };
        assert_eq!(last.status, None);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_page() {
        let (api, store) = store_with(vec![draft("a"), draft("b")]);
        store.fetch(PaymentFilters::default()).await.unwrap();

        api.set_unavailable(true);
        let err = store.fetch(PaymentFilters::default()).await.unwrap_err();

        assert_eq!(err.error_code(), "TRANSPORT_ERROR");
        assert_eq!(store.payments().len(), 2);
        assert!(store.last_error().unwrap().contains("connection refused"));
        assert!(!store.is_loading());

        // A later success clears the error
        api.set_unavailable(false);
        store.refresh().await.unwrap();
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let backend = InMemoryPaymentsApi::with_payments(vec![draft("a"), posted("b")]);
        let gated = Arc::new(GatedApi::new(backend));
        let store = Arc::new(PaymentStore::new(gated.clone()));
        let mut events = store.events().subscribe();

        let first = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .fetch(PaymentFilters::default().with_status(PaymentStatus::Draft))
                    .await
            })
        };
        wait_for_waiting(&gated, 1).await;

        let second = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .fetch(PaymentFilters::default().with_status(PaymentStatus::Posted))
                    .await
            })
        };
        wait_for_waiting(&gated, 2).await;
        assert!(store.is_loading());

        // The older request answers first and must be dropped
        gated.release_one();
        assert_eq!(first.await.unwrap().unwrap(), FetchOutcome::Stale);
        assert!(store.payments().is_empty());

        gated.release_one();
        assert_eq!(
            second.await.unwrap().unwrap(),
            FetchOutcome::Applied { count: 1 }
        );
        assert_eq!(store.payments()[0].id.as_str(), "b");
        assert!(!store.is_loading());

        let envelope = events.recv().await.unwrap();
        assert!(matches!(
            envelope.event,
            StoreEvent::StaleResponseDiscarded {
                generation: 1,
                latest: 2
            }
        ));
    }
}

// =============================================================================
// Single-payment transitions
// =============================================================================

mod mutate_tests {
    use super::*;

    #[tokio::test]
    async fn test_confirm_changes_only_the_status() {
        let (api, store) = store_with(vec![draft("a"), draft("b")]);
        store.fetch(PaymentFilters::default()).await.unwrap();
        let before = store.payment(&PaymentId::from("a")).unwrap();
        let calls_before = api.calls().len();

        let updated = store
            .mutate_one(&PaymentId::from("a"), Transition::Confirm)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, PaymentStatus::Posted);
        assert_eq!(
            Payment {
                status: before.status,
                ..updated.clone()
            },
            before
        );
        assert_eq!(
            store.payment(&PaymentId::from("b")).unwrap().status,
            PaymentStatus::Draft
        );
        // One transition call, no refetch
        assert_eq!(api.calls().len(), calls_before + 1);
    }

    #[tokio::test]
    async fn test_delete_removes_payment() {
        let (api, store) = store_with(vec![draft("a"), draft("b")]);
        store.fetch(PaymentFilters::default()).await.unwrap();
        let mut events = store.events().subscribe();

        let removed = store
            .mutate_one(&PaymentId::from("a"), Transition::Delete)
            .await
            .unwrap();

        assert!(removed.is_none());
        assert!(store.payment(&PaymentId::from("a")).is_none());
        assert!(api.get(&PaymentId::from("a")).is_none());
        assert_eq!(store.pagination().total, 1);
        assert!(matches!(
            events.recv().await.unwrap().event,
            StoreEvent::PaymentRemoved { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_transition_is_not_sent() {
        let (api, store) = store_with(vec![draft("a")]);
        store.fetch(PaymentFilters::default()).await.unwrap();

        let err = store
            .mutate_one(&PaymentId::from("a"), Transition::Cancel)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Cannot cancel a payment in draft status");
        assert_eq!(api.mutation_count(), 0);
        assert_eq!(
            store.last_error().as_deref(),
            Some("Cannot cancel a payment in draft status")
        );
    }

    #[tokio::test]
    async fn test_unknown_payment_is_recorded() {
        let (api, store) = store_with(vec![draft("a")]);
        store.fetch(PaymentFilters::default()).await.unwrap();

        let err = store
            .mutate_one(&PaymentId::from("ghost"), Transition::Confirm)
            .await
            .unwrap_err();

        assert!(matches!(err, PayError::NotFound { .. }));
        assert_eq!(store.last_error(), Some(err.to_string()));
        assert!(!store.is_loading());
        assert_eq!(api.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_rejection_leaves_cache_unchanged() {
        let mut no_journal = draft("a");
        no_journal.journal_id = None;
        let (_api, store) = store_with(vec![no_journal]);
        store.fetch(PaymentFilters::default()).await.unwrap();

        let err = store
            .mutate_one(&PaymentId::from("a"), Transition::Confirm)
            .await
            .unwrap_err();

        assert!(err.is_remote());
        assert_eq!(
            store.payment(&PaymentId::from("a")).unwrap().status,
            PaymentStatus::Draft
        );
        assert!(store.last_error().unwrap().contains("missing journal"));
    }

    #[tokio::test]
    async fn test_reset_from_cancelled() {
        let (_api, store) = store_with(vec![cancelled("c")]);
        store.fetch(PaymentFilters::default()).await.unwrap();

        let updated = store
            .mutate_one(&PaymentId::from("c"), Transition::ResetToDraft)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.is_draft());
    }
}

// =============================================================================
// Create
// =============================================================================

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_prepends_payment() {
        let (_api, store) = store_with(vec![draft("a")]);
        store.fetch(PaymentFilters::default()).await.unwrap();

        let created = store
            .create(
                NewPayment::new(
                    PaymentType::SupplierPayment,
                    Decimal::new(4_200, 2),
                    "USD",
                    "INV-2026-001",
                )
                .with_journal("BANK"),
            )
            .await
            .unwrap();

        let payments = store.payments();
        assert_eq!(payments[0].id, created.id);
        assert_eq!(created.status, PaymentStatus::Draft);
        assert_eq!(store.pagination().total, 2);
    }

    #[tokio::test]
    async fn test_invalid_payment_is_not_sent() {
        let (api, store) = store_with(vec![]);

        let err = store
            .create(NewPayment::new(
                PaymentType::CustomerPayment,
                Decimal::ZERO,
                "euro",
                "",
            ))
            .await
            .unwrap_err();

        let PayError::Validation(ValidationError::FieldErrors(errors)) = err else {
            panic!("expected field errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["amount", "currency_code", "reference"]);
        assert!(api.calls().is_empty());
    }
}

// =============================================================================
// Selection
// =============================================================================

mod selection_tests {
    use super::*;

    #[tokio::test]
    async fn test_selection_survives_page_change() {
        let (_api, store) = store_with((0..30).map(|i| draft(&format!("p{:02}", i))).collect());
        store.fetch(PaymentFilters::default()).await.unwrap();

        assert!(store.toggle_selection(PaymentId::from("p00")));
        store.next_page().await.unwrap();

        assert!(store.is_selected(&PaymentId::from("p00")));
        assert_eq!(store.selected_ids(), ids(&["p00"]));
        // Not in the loaded page: not resolved, so nothing is eligible
        assert!(store.selected_payments().is_empty());
        assert_eq!(store.eligibility(), Eligibility::default());
    }

    #[tokio::test]
    async fn test_select_all_and_clear() {
        let (api, store) = store_with(vec![draft("a"), posted("b")]);
        store.fetch(PaymentFilters::default()).await.unwrap();
        let calls = api.calls().len();

        store.select_all();
        let eligibility = store.eligibility();
        assert_eq!(eligibility.selected, 2);
        assert!(eligibility.can_cancel);
        assert!(!eligibility.can_confirm);

        store.clear_selection();
        assert!(store.selected_ids().is_empty());
        assert_eq!(api.calls().len(), calls);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (_api, store) = store_with(vec![draft("a")]);
        store.fetch(PaymentFilters::default()).await.unwrap();
        store.toggle_selection(PaymentId::from("a"));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.payments.len(), 1);
        assert_eq!(snapshot.selection, ids(&["a"]));
        assert!(!snapshot.loading);
        assert_eq!(snapshot.error, None);
    }
}

// =============================================================================
// Data quality
// =============================================================================

mod data_quality_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_status_is_normalized_and_reported() {
        let api = InMemoryPaymentsApi::new();
        let now = Utc::now();
        api.insert_record(PaymentRecord {
            id: PaymentId::from("odd"),
            status: Some("on_hold".to_string()),
            payment_type: Some("cobro".to_string()),
            amount: Decimal::new(10, 0),
            currency_code: "EUR".to_string(),
            third_party_id: None,
            journal_id: None,
            reference: None,
            description: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        });
        let store = PaymentStore::new(Arc::new(api));
        let mut events = store.events().subscribe();
        let fallbacks_before = fallback_count();

        store.fetch(PaymentFilters::default()).await.unwrap();

        let payment = store.payment(&PaymentId::from("odd")).unwrap();
        assert_eq!(payment.status, PaymentStatus::Draft);
        assert_eq!(payment.payment_type, PaymentType::CustomerPayment);
        assert!(fallback_count() > fallbacks_before);

        let envelope = events.recv().await.unwrap();
        match envelope.event {
            StoreEvent::DataQuality {
                payment_id,
                fallback,
            } => {
                assert_eq!(payment_id.as_str(), "odd");
                assert_eq!(fallback.field, "status");
                assert_eq!(fallback.raw.as_deref(), Some("on_hold"));
            }
            other => panic!("expected a data quality event, got {other:?}"),
        }
        // "cobro" is a known synonym, so the page event comes next
        assert!(matches!(
            events.recv().await.unwrap().event,
            StoreEvent::PageLoaded { count: 1, .. }
        ));
    }
}
