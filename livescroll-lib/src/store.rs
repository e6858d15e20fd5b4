//! Per-page row storage.
//!
//! The store holds exactly one [`Page`] per resident index. It never emits
//! anything itself: every mutation returns the lifecycle events it caused so
//! the caller can deliver them once its locks are released.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;

use crate::events::RowEvent;
use crate::model::Page;
use crate::model::Row;

/// Row lifecycle events produced by one store mutation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RowChanges {
    /// Rows that left a page, in page order.
    pub destroyed: Vec<RowEvent>,
    /// Rows that entered a page, in page order.
    pub created: Vec<RowEvent>,
}

impl RowChanges {
    /// Returns `true` if nothing was created or destroyed.
    pub fn is_empty(&self) -> bool {
        self.destroyed.is_empty() && self.created.is_empty()
    }
}

/// Resident pages keyed by page index.
#[derive(Debug, Default, Clone)]
pub struct PageDataStore {
    pages: BTreeMap<usize, Page>,
}

impl PageDataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of every resident page, loaded or pending.
    pub fn indices(&self) -> BTreeSet<usize> {
        self.pages.keys().copied().collect()
    }

    /// Returns `true` if `index` is resident.
    pub fn contains(&self, index: usize) -> bool {
        self.pages.contains_key(&index)
    }

    /// Returns `true` if `index` is resident and its rows have arrived.
    pub fn is_loaded(&self, index: usize) -> bool {
        self.pages.get(&index).is_some_and(Page::is_loaded)
    }

    /// Number of resident pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if no page is resident.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of resident pages whose rows have arrived.
    pub fn loaded_count(&self) -> usize {
        self.pages.values().filter(|p| p.is_loaded()).count()
    }

    /// Returns the page at `index`.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(&index)
    }

    /// Returns the rows of the page at `index`.
    pub fn rows_state(&self, index: usize) -> Option<&[Row]> {
        self.pages.get(&index).map(Page::rows_state)
    }

    /// Clones every resident page in ascending index order.
    pub fn snapshot(&self) -> Vec<Page> {
        self.pages.values().cloned().collect()
    }

    /// Makes `index` resident with a pending placeholder.
    ///
    /// Returns `false` if the page was already resident.
    pub fn reserve(&mut self, index: usize) -> bool {
        if self.pages.contains_key(&index) {
            return false;
        }
        self.pages.insert(index, Page::pending(index));
        true
    }

    /// Installs fetched rows into a resident page.
    ///
    /// Rows already on the page are destroyed first. Within the incoming
    /// rows the first occurrence of an id wins. `selected` decides each
    /// row's cached selection flag. Does nothing if `index` is not resident.
    pub fn apply(
        &mut self,
        index: usize,
        rows: Vec<Row>,
        selected: &HashSet<String>,
    ) -> RowChanges {
        let Some(page) = self.pages.get_mut(&index) else {
            return RowChanges::default();
        };

        let destroyed = destroy_rows(page);

        let mut seen = HashSet::with_capacity(rows.len());
        let mut created = Vec::with_capacity(rows.len());
        for mut row in rows {
            if !seen.insert(row.id.clone()) {
                log::warn!("page {index}: dropping duplicate row id {}", row.id);
                continue;
            }
            row.selected = selected.contains(&row.id);
            row.created = true;
            created.push(RowEvent {
                row: row.clone(),
                page: index,
            });
            page.rows.push(row);
        }
        page.loaded = true;

        RowChanges { destroyed, created }
    }

    /// Resets a resident page whose fetch failed back to a pending
    /// placeholder.
    ///
    /// Rows already on the page are destroyed, so a failed re-fetch never
    /// leaves rows from an earlier query behind. Does nothing if `index` is
    /// not resident.
    pub fn mark_failed(&mut self, index: usize) -> Vec<RowEvent> {
        let Some(page) = self.pages.get_mut(&index) else {
            return Vec::new();
        };
        page.loaded = false;
        destroy_rows(page)
    }

    /// Removes a page, destroying its rows first.
    ///
    /// Returns the destroy events, or `None` if the page was not resident.
    pub fn evict(&mut self, index: usize) -> Option<Vec<RowEvent>> {
        let page = self.pages.get_mut(&index)?;
        let destroyed = destroy_rows(page);
        self.pages.remove(&index);
        Some(destroyed)
    }

    /// Evicts every page.
    pub fn clear(&mut self) -> Vec<RowEvent> {
        let indices: Vec<usize> = self.pages.keys().copied().collect();
        indices
            .into_iter()
            .filter_map(|i| self.evict(i))
            .flatten()
            .collect()
    }

    /// Recomputes every row's cached `selected` flag.
    pub fn sync_selection(&mut self, selected: &HashSet<String>) {
        for page in self.pages.values_mut() {
            for row in &mut page.rows {
                row.selected = selected.contains(&row.id);
            }
        }
    }

    /// Concatenates the rows of all resident pages.
    ///
    /// Pages are visited in ascending index order and rows in received
    /// order. An id already seen on an earlier page is skipped, so the
    /// result never holds duplicate ids.
    pub fn flatten(&self) -> Vec<Row> {
        let mut seen = HashSet::new();
        self.pages
            .values()
            .flat_map(|p| p.rows.iter())
            .filter(|r| seen.insert(r.id.as_str()))
            .cloned()
            .collect()
    }

    /// Finds a resident row by id, with the index of its page.
    pub fn find(&self, id: &str) -> Option<(usize, &Row)> {
        self.pages
            .values()
            .find_map(|p| p.row(id).map(|r| (p.index, r)))
    }
}

fn destroy_rows(page: &mut Page) -> Vec<RowEvent> {
    let index = page.index;
    page.rows
        .drain(..)
        .map(|mut row| {
            row.created = false;
            RowEvent { row, page: index }
        })
        .collect()
}
