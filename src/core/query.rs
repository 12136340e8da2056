//! Listing filters and pagination

use crate::core::entity::PaymentRecord;
use crate::core::status::{PaymentStatus, PaymentType};
use serde::{Deserialize, Serialize};

/// Largest page size the backend accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filters for `GET /payments`
///
/// Every field is optional; `merge` only overwrites the fields that are set.
///
/// # Example
/// ```rust,ignore
/// // GET /payments?status=POSTED&page=2&size=50
/// let filters = PaymentFilters::default()
///     .with_status(PaymentStatus::Posted)
///     .with_page(2)
///     .with_size(50);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<PaymentType>,

    /// Page number (starts at 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Number of items per page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl PaymentFilters {
    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = Some(payment_type);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Merge `other` into `self`.
    ///
    /// Changing the status or type filter without an explicit page goes back
    /// to the first page.
    pub fn merge(&mut self, other: PaymentFilters) {
        let narrowed = (other.status.is_some() && other.status != self.status)
            || (other.payment_type.is_some() && other.payment_type != self.payment_type);

        if other.status.is_some() {
            self.status = other.status;
        }
        if other.payment_type.is_some() {
            self.payment_type = other.payment_type;
        }
        if other.size.is_some() {
            self.size = other.size;
        }
        match other.page {
            Some(page) => self.page = Some(page),
            None if narrowed => self.page = Some(1),
            None => {}
        }
    }

    /// Page number, ensuring minimum of 1
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to the backend's bounds
    pub fn size(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Query string pairs, always including page and size
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(payment_type) = self.payment_type {
            pairs.push(("payment_type", payment_type.as_str().to_string()));
        }
        pairs.push(("page", self.page().to_string()));
        pairs.push(("size", self.size().to_string()));
        pairs
    }
}

/// A page of payments as returned by the listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPage {
    pub items: Vec<PaymentRecord>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    #[serde(default)]
    pub pages: Option<u32>,
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: u32,

    /// Number of items per page
    pub size: u32,

    /// Total number of items (after filters)
    pub total: u64,

    /// Total number of pages
    pub total_pages: u32,

    pub has_next: bool,

    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: u32, size: u32, total: u64) -> Self {
        let page = page.max(1);
        // Ensure size is at least 1 to avoid division by zero
        let size = size.max(1);
        let total_pages = if total == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(size))).unwrap_or(u32::MAX)
        };

        Self {
            page,
            size,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Metadata for a page response; a `pages` value from the backend wins
    pub fn from_page(page: &PaymentPage) -> Self {
        let mut meta = Self::new(page.page, page.size, page.total);
        if let Some(pages) = page.pages {
            meta.total_pages = pages;
            meta.has_next = meta.page < pages;
        }
        meta
    }
}
