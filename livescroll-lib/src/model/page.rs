//! Resident page of rows.

use super::Row;

/// One page-sized chunk of the dataset held by the page store.
///
/// A page is created as soon as the coordinator requests its index and stays
/// `loaded == false` until a fetch result is applied to it.
///
/// # Example
///
/// ```
/// use livescroll_lib::model::Page;
///
/// let page = Page::pending(3);
/// assert_eq!(page.index(), 3);
/// assert!(!page.is_loaded());
/// assert!(page.rows_state().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub(crate) index: usize,
    pub(crate) rows: Vec<Row>,
    pub(crate) loaded: bool,
}

impl Page {
    /// Creates an unloaded placeholder for a requested page.
    pub fn pending(index: usize) -> Self {
        Self {
            index,
            rows: Vec::new(),
            loaded: false,
        }
    }

    /// Returns the 0-based page index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the rows of this page in the order they were received.
    pub fn rows_state(&self) -> &[Row] {
        &self.rows
    }

    /// Returns `true` once a fetch result has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns `true` if this page has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows in this page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Finds a row by id.
    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }
}
