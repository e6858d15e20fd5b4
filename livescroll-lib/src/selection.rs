//! Selection state for the grid.
//!
//! The selection set of row ids is the single source of truth for "is row X
//! selected". `Row::selected` is only ever a cached view recomputed from it.
//! Ids are used rather than positions so selection survives pages loading
//! and unloading underneath it.

use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::events::Modifiers;
use crate::model::Row;

/// Selection mode for the grid.
///
/// The mode is a precondition on callers of [`LiveGrid::select`](crate::grid::LiveGrid::select):
/// passing more ids than the mode allows is a contract violation and is not
/// checked there. Click-driven selection honours it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// No selection allowed
    None,
    /// Single row selection
    Single,
    /// Multiple rows can be selected (Ctrl+click, Shift+range)
    #[default]
    Multiple,
}

/// ID-based selection state.
#[derive(Debug, Clone, Default)]
pub struct SelectionIndex {
    mode: SelectionMode,
    /// Currently selected IDs
    selected: HashSet<String>,
    /// Anchor for range selection (Shift+click starting point)
    anchor: Option<String>,
}

impl SelectionIndex {
    /// Create a new empty selection.
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Get the selection mode.
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Mirror the host's selection mode.
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    /// Get all selected IDs (sorted for deterministic ordering).
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Borrow the raw selection set.
    pub fn as_set(&self) -> &HashSet<String> {
        &self.selected
    }

    /// Check if an ID is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Get the number of selected ids.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Get the anchor ID for range selection.
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Replace the whole selection with a copy of `ids`.
    pub fn replace(&mut self, ids: &[String]) {
        self.selected = ids.iter().cloned().collect();
        if self.anchor.as_ref().is_some_and(|a| !self.selected.contains(a)) {
            self.anchor = None;
        }
    }

    /// Clear all selection.
    /// Returns the IDs that were deselected.
    pub fn clear(&mut self) -> Vec<String> {
        let removed: Vec<_> = self.selected.drain().collect();
        self.anchor = None;
        removed
    }

    /// Select a single ID (clears others).
    /// Returns (added, removed) IDs.
    pub fn select_only(&mut self, id: &str) -> (Vec<String>, Vec<String>) {
        let removed: Vec<_> = self.selected.iter().filter(|&i| i != id).cloned().collect();
        let was_selected = self.selected.contains(id);
        self.selected.clear();
        self.selected.insert(id.to_string());
        self.anchor = Some(id.to_string());
        let added = if was_selected {
            vec![]
        } else {
            vec![id.to_string()]
        };
        (added, removed)
    }

    /// Toggle selection of an ID (Ctrl+click behavior).
    /// Returns (added, removed) IDs.
    pub fn toggle(&mut self, id: &str) -> (Vec<String>, Vec<String>) {
        self.anchor = Some(id.to_string());
        if self.selected.remove(id) {
            (vec![], vec![id.to_string()])
        } else {
            self.selected.insert(id.to_string());
            (vec![id.to_string()], vec![])
        }
    }

    /// Range select from anchor to target ID (Shift+click behavior).
    ///
    /// Requires the ordered list of all resident IDs to determine the range.
    /// If `extend` is false, clears selection outside the range first.
    ///
    /// Returns (added, removed) IDs.
    pub fn range_select(
        &mut self,
        target_id: &str,
        all_ids_ordered: &[String],
        extend: bool,
    ) -> (Vec<String>, Vec<String>) {
        let anchor_id = self.anchor.clone().unwrap_or_else(|| target_id.to_string());

        let anchor_pos = all_ids_ordered.iter().position(|id| id == &anchor_id);
        let target_pos = all_ids_ordered.iter().position(|id| id == target_id);

        let (start, end) = match (anchor_pos, target_pos) {
            (Some(a), Some(t)) => (a.min(t), a.max(t)),
            // Anchor scrolled out of the window: fall back to a plain select
            _ => return self.select_only(target_id),
        };

        let range_ids = &all_ids_ordered[start..=end];
        let mut removed = Vec::new();

        if !extend {
            let in_range: HashSet<&String> = range_ids.iter().collect();
            removed = self
                .selected
                .iter()
                .filter(|id| !in_range.contains(id))
                .cloned()
                .collect();
            for id in &removed {
                self.selected.remove(id);
            }
        }

        let mut added = Vec::new();
        for id in range_ids {
            if self.selected.insert(id.clone()) {
                added.push(id.clone());
            }
        }

        (added, removed)
    }

    /// Apply a click on row `id` according to the selection mode.
    ///
    /// `all_ids_ordered` is the flattened resident row order used for range
    /// selection. Returns `true` if the selection changed.
    pub fn apply_click(&mut self, id: &str, modifiers: Modifiers, all_ids_ordered: &[String]) -> bool {
        let (added, removed) = match self.mode {
            SelectionMode::None => return false,
            SelectionMode::Single if modifiers.ctrl => {
                if self.is_selected(id) {
                    self.toggle(id)
                } else {
                    self.select_only(id)
                }
            }
            SelectionMode::Single => self.select_only(id),
            SelectionMode::Multiple if modifiers.shift => {
                self.range_select(id, all_ids_ordered, modifiers.ctrl)
            }
            SelectionMode::Multiple if modifiers.ctrl => self.toggle(id),
            SelectionMode::Multiple => self.select_only(id),
        };
        !added.is_empty() || !removed.is_empty()
    }

    /// Filter `rows` down to the selected ones, in the given order.
    ///
    /// The returned rows carry `selected = true`.
    pub fn resolve(&self, rows: &[Row]) -> Vec<Row> {
        rows.iter()
            .filter(|r| self.selected.contains(&r.id))
            .map(|r| {
                let mut row = r.clone();
                row.selected = true;
                row
            })
            .collect()
    }
}
