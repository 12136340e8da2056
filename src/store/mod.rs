//! Payment store: the loaded page, active filters and the selection
//!
//! The store is the single in-memory source of truth a UI layer reads from.
//! Remote-backed operations update the cache only after the backend
//! confirms; on failure the previous data stays and the error message is
//! recorded.
//!
//! Listing responses are tagged with a monotonic generation. A response that
//! arrives after a newer `fetch` was issued is discarded rather than allowed
//! to overwrite newer state.
//!
//! ```rust,ignore
//! let store = PaymentStore::new(Arc::new(HttpPaymentsApi::new(&config)?));
//! store.fetch(PaymentFilters::default().with_status(PaymentStatus::Draft)).await?;
//! store.toggle_selection(PaymentId::from("pay-42"));
//! assert!(store.eligibility().can_confirm);
//! ```

pub mod selection;

pub use selection::Selection;

use crate::config::ClientConfig;
use crate::core::entity::{Entity, NewPayment, Payment, PaymentId};
use crate::core::error::{PayError, PayResult};
use crate::core::events::{EventBus, StoreEvent};
use crate::core::lifecycle::{Eligibility, Transition};
use crate::core::query::{DEFAULT_PAGE_SIZE, PaginationMeta, PaymentFilters};
use crate::core::service::PaymentsApi;
use crate::core::status::Fallback;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use validator::Validate;

/// What a `fetch` did with the response it received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page replaced the loaded page
    Applied { count: usize },
    /// A newer fetch was issued meanwhile; the response was dropped
    Stale,
}

/// Point-in-time copy of the store state
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSnapshot {
    pub payments: Vec<Payment>,
    pub pagination: PaginationMeta,
    pub filters: PaymentFilters,
    pub selection: Vec<PaymentId>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct StoreState {
    payments: Vec<Payment>,
    pagination: PaginationMeta,
    filters: PaymentFilters,
    selection: Selection,
    error: Option<String>,
}

/// Marks a remote call as in flight for as long as it lives
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory store of the currently loaded page of payments
pub struct PaymentStore {
    api: Arc<dyn PaymentsApi>,
    state: RwLock<StoreState>,
    events: EventBus,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    default_page_size: u32,
}

impl PaymentStore {
    pub fn new(api: Arc<dyn PaymentsApi>) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
            events: EventBus::default(),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Store using the page size and event capacity from `config`
    pub fn from_config(api: Arc<dyn PaymentsApi>, config: &ClientConfig) -> Self {
        let mut store = Self::new(api);
        store.default_page_size = config.default_page_size;
        store.events = EventBus::new(config.event_capacity);
        store
    }

    /// Event bus the store publishes on
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub(crate) fn api(&self) -> &Arc<dyn PaymentsApi> {
        &self.api
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the error and mark a remote call as started
    fn begin(&self) -> InFlight<'_> {
        self.write().error = None;
        InFlight::start(&self.in_flight)
    }

    fn record_error(&self, operation: &str, err: &PayError) {
        tracing::warn!(operation, error = %err, code = err.error_code(), "payment store call failed");
        self.write().error = Some(err.to_string());
    }

    fn report_fallbacks(&self, id: &PaymentId, fallbacks: Vec<Fallback>) {
        for fallback in fallbacks {
            self.events.publish(StoreEvent::DataQuality {
                payment_id: id.clone(),
                fallback,
            });
        }
    }

    // =========================================================================
    // Remote-backed operations
    // =========================================================================

    /// Merge `filters` into the active filters and load that page
    ///
    /// On failure the previously loaded page is kept and the error recorded.
    pub async fn fetch(&self, filters: PaymentFilters) -> PayResult<FetchOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let effective = {
            let mut state = self.write();
            state.filters.merge(filters);
            if state.filters.size.is_none() {
                state.filters.size = Some(self.default_page_size);
            }
            state.filters.clone()
        };

        let _in_flight = self.begin();
        tracing::debug!(generation, page = effective.page(), "fetching payments");
        let result = self.api.list(&effective).await;

        let latest = self.generation.load(Ordering::SeqCst);
        if generation != latest {
            tracing::debug!(generation, latest, "discarding stale payment page");
            self.events
                .publish(StoreEvent::StaleResponseDiscarded { generation, latest });
            return Ok(FetchOutcome::Stale);
        }

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                self.record_error("fetch", &err);
                return Err(err);
            }
        };

        let pagination = PaginationMeta::from_page(&page);
        let mut payments = Vec::with_capacity(page.items.len());
        let mut fallbacks = Vec::new();
        for record in page.items {
            let (payment, coerced) = Payment::from_record(record);
            if !coerced.is_empty() {
                fallbacks.push((payment.id.clone(), coerced));
            }
            payments.push(payment);
        }
        let count = payments.len();

        {
            let mut state = self.write();
            state.payments = payments;
            state.pagination = pagination;
        }

        for (id, coerced) in fallbacks {
            self.report_fallbacks(&id, coerced);
        }
        self.events.publish(StoreEvent::PageLoaded {
            page: pagination.page,
            count,
            total: pagination.total,
        });
        tracing::debug!(count, total = pagination.total, "payment page loaded");

        Ok(FetchOutcome::Applied { count })
    }

    /// Reload the current page with the active filters
    pub async fn refresh(&self) -> PayResult<FetchOutcome> {
        self.fetch(PaymentFilters::default()).await
    }

    pub async fn go_to_page(&self, page: u32) -> PayResult<FetchOutcome> {
        self.fetch(PaymentFilters::default().with_page(page.max(1)))
            .await
    }

    /// Load the next page; `None` when already on the last one
    pub async fn next_page(&self) -> PayResult<Option<FetchOutcome>> {
        let pagination = self.pagination();
        if !pagination.has_next {
            return Ok(None);
        }
        self.go_to_page(pagination.page + 1).await.map(Some)
    }

    /// Load the previous page; `None` when already on the first one
    pub async fn previous_page(&self) -> PayResult<Option<FetchOutcome>> {
        let pagination = self.pagination();
        if !pagination.has_prev {
            return Ok(None);
        }
        self.go_to_page(pagination.page - 1).await.map(Some)
    }

    /// Drop every filter and load the first page
    pub async fn reset_filters(&self) -> PayResult<FetchOutcome> {
        self.write().filters = PaymentFilters::default();
        self.fetch(PaymentFilters::default()).await
    }

    /// Apply a single-payment transition
    ///
    /// The cached payment must be loaded and the transition allowed from its
    /// status, otherwise nothing is sent. On success only the status of that
    /// payment changes (or it is removed, for delete); no refetch happens.
    /// Returns the updated payment, `None` after a delete. Local refusals are
    /// recorded in `last_error` like remote failures.
    pub async fn mutate_one(
        &self,
        id: &PaymentId,
        transition: Transition,
    ) -> PayResult<Option<Payment>> {
        let segment = transition.path_segment().unwrap_or("delete");
        let refusal = match self.payment(id) {
            None => Some(PayError::NotFound { id: id.clone() }),
            Some(current) => transition.apply(current.status()).err(),
        };
        if let Some(err) = refusal {
            self.record_error(segment, &err);
            return Err(err);
        }

        let result = {
            let _in_flight = self.begin();
            self.api.transition(id, transition).await
        };
        if let Err(err) = result {
            self.record_error(segment, &err);
            return Err(err);
        }

        tracing::info!(payment_id = %id, %transition, "payment transition applied");
        Ok(self.apply_local_transition(id, transition))
    }

    /// Validate and create a payment; it is prepended to the loaded page
    pub async fn create(&self, new_payment: NewPayment) -> PayResult<Payment> {
        new_payment.validate()?;

        let result = {
            let _in_flight = self.begin();
            self.api.create(&new_payment).await
        };
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                self.record_error("create", &err);
                return Err(err);
            }
        };

        let (payment, fallbacks) = Payment::from_record(record);
        {
            let mut state = self.write();
            state.payments.insert(0, payment.clone());
            let meta = state.pagination;
            state.pagination = PaginationMeta::new(meta.page, meta.size, meta.total + 1);
        }
        self.report_fallbacks(&payment.id, fallbacks);
        self.events.publish(StoreEvent::PaymentCreated {
            payment_id: payment.id.clone(),
        });
        tracing::info!(payment_id = %payment.id, "payment created");
        Ok(payment)
    }

    /// Apply a confirmed transition to the cache
    ///
    /// Only the status field changes; a delete removes the payment. Payments
    /// not in the loaded page (or whose cached status no longer allows the
    /// transition) are left alone. Returns the updated payment, if any.
    pub(crate) fn apply_local_transition(
        &self,
        id: &PaymentId,
        transition: Transition,
    ) -> Option<Payment> {
        let mut state = self.write();
        let index = state.payments.iter().position(|p| &p.id == id)?;
        let next = transition.apply(state.payments[index].status).ok()?;

        match next {
            Some(status) => {
                state.payments[index].status = status;
                let updated = state.payments[index].clone();
                drop(state);
                self.events.publish(StoreEvent::PaymentUpdated {
                    payment_id: id.clone(),
                    transition,
                    status,
                });
                Some(updated)
            }
            None => {
                state.payments.remove(index);
                let meta = state.pagination;
                state.pagination =
                    PaginationMeta::new(meta.page, meta.size, meta.total.saturating_sub(1));
                drop(state);
                self.events.publish(StoreEvent::PaymentRemoved {
                    payment_id: id.clone(),
                });
                None
            }
        }
    }

    // =========================================================================
    // Selection (local only)
    // =========================================================================

    /// Flip selection of `id`; returns whether it is now selected
    pub fn toggle_selection(&self, id: PaymentId) -> bool {
        self.write().selection.toggle(id)
    }

    /// Select every payment of the loaded page (replacing the selection)
    pub fn select_all(&self) {
        let mut state = self.write();
        let ids: Vec<PaymentId> = state.payments.iter().map(|p| p.id.clone()).collect();
        state.selection.replace(ids);
    }

    pub fn clear_selection(&self) {
        self.write().selection.clear();
    }

    /// Replace the selection with `ids`
    pub fn set_selection<I>(&self, ids: I)
    where
        I: IntoIterator<Item = PaymentId>,
    {
        self.write().selection.replace(ids);
    }

    pub fn is_selected(&self, id: &PaymentId) -> bool {
        self.read().selection.contains(id)
    }

    /// Selected ids in selection order, including ids not in the loaded page
    pub fn selected_ids(&self) -> Vec<PaymentId> {
        self.read().selection.to_vec()
    }

    /// Selected payments that are present in the loaded page
    pub fn selected_payments(&self) -> Vec<Payment> {
        let state = self.read();
        state
            .selection
            .iter()
            .filter_map(|id| state.payments.iter().find(|p| &p.id == id))
            .cloned()
            .collect()
    }

    /// Eligibility predicates over the selection, resolved against the page
    pub fn eligibility(&self) -> Eligibility {
        Eligibility::evaluate(self.selected_payments().iter().map(|p| p.status))
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            payments: state.payments.clone(),
            pagination: state.pagination,
            filters: state.filters.clone(),
            selection: state.selection.to_vec(),
            loading: self.is_loading(),
            error: state.error.clone(),
        }
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.read().payments.clone()
    }

    pub fn payment(&self, id: &PaymentId) -> Option<Payment> {
        self.read().payments.iter().find(|p| &p.id == id).cloned()
    }

    pub fn pagination(&self) -> PaginationMeta {
        self.read().pagination
    }

    pub fn filters(&self) -> PaymentFilters {
        self.read().filters.clone()
    }

    /// Whether any remote call is in flight
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.read().error.clone()
    }

    /// Record an error raised by a caller acting on the store's behalf
    pub(crate) fn set_error(&self, operation: &str, err: &PayError) {
        self.record_error(operation, err);
    }

    /// Run `call` against the API as a tracked remote call
    pub(crate) async fn tracked<T, F>(&self, call: F) -> PayResult<T>
    where
        F: std::future::Future<Output = PayResult<T>>,
    {
        let _in_flight = self.begin();
        call.await
    }
}
