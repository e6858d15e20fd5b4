//! Pluggable data sources
//!
//! Provides the [`DataSource`] trait the paging coordinator fetches pages
//! through, plus an in-memory implementation for local datasets and tests.

mod memory;

pub use memory::*;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::ColumnDef;
use crate::model::Fields;
use crate::model::SortSpec;

/// Everything a data source needs to serve one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// 0-based page index.
    pub page_index: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Column definitions of the grid.
    pub columns: Vec<ColumnDef>,
    /// Field holding the row identity.
    pub id_field: String,
    /// Sort to apply before slicing the page.
    pub sort: SortSpec,
}

impl PageRequest {
    /// Index of the first row of the page within the sorted dataset.
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }
}

/// The rows of one page together with the dataset size.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    rows: Vec<Fields>,
    total_count: usize,
}

impl PageResponse {
    /// Creates a new response.
    pub fn new(rows: Vec<Fields>, total_count: usize) -> Self {
        Self { rows, total_count }
    }

    /// Returns the row data in page order.
    pub fn rows(&self) -> &[Fields] {
        &self.rows
    }

    /// Consumes the response and returns the row data.
    pub fn into_rows(self) -> Vec<Fields> {
        self.rows
    }

    /// Total number of rows in the full dataset.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Returns the number of rows in this page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if this page has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trait for page data sources.
///
/// Implementations serve one page per call and report the total row count
/// of the dataset. The coordinator may request the same page repeatedly
/// (window re-entry, refresh, retries), so reads must be idempotent.
///
/// # Example
///
/// ```ignore
/// use livescroll_lib::source::{DataSource, InMemorySource, PageRequest};
///
/// let source = InMemorySource::new(rows);
/// let response = source.fetch_page(&request).await?;
/// println!("{} of {}", response.len(), response.total_count());
/// ```
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches the rows of `request.page_index`, sorted per `request.sort`.
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, SourceError>;
}
