//! Page window planning.
//!
//! Turns the raw page markers reported by the viewport into the set of page
//! indices that must be resident. Pure: no store access, no side effects.

use std::collections::BTreeSet;

/// Largest overscan a planner accepts, in pages on each side.
pub const MAX_OVERSCAN: usize = 64;

/// Computes the target window from visible page markers.
///
/// Markers are the raw `page-index` attributes of the rendered pages. A
/// marker is read like an HTML integer attribute: surrounding whitespace is
/// ignored and the leading run of digits is taken, so `"2px"` and `"1.5"`
/// read as 2 and 1. A marker with no leading digits or a minus sign is
/// dropped.
///
/// # Example
///
/// ```
/// use livescroll_lib::planner::PageWindowPlanner;
///
/// let planner = PageWindowPlanner::new();
/// let window = planner.plan(&["1", "2", "x", "NaN"]);
/// assert_eq!(window.into_iter().collect::<Vec<_>>(), vec![1, 2]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageWindowPlanner {
    overscan: usize,
    page_count: Option<usize>,
}

impl PageWindowPlanner {
    /// A planner that keeps exactly the visible pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep `pages` neighbours on each side of every visible page.
    ///
    /// Capped at [`MAX_OVERSCAN`].
    pub fn with_overscan(mut self, pages: usize) -> Self {
        self.overscan = pages.min(MAX_OVERSCAN);
        self
    }

    /// Bound overscan by the number of pages in the dataset.
    pub fn with_page_count(mut self, page_count: Option<usize>) -> Self {
        self.page_count = page_count;
        self
    }

    /// Plans the window for a list of raw markers.
    ///
    /// Empty or all-invalid input yields an empty set, which callers treat as
    /// "leave the window alone".
    pub fn plan<S: AsRef<str>>(&self, markers: &[S]) -> BTreeSet<usize> {
        let visible = markers.iter().filter_map(|m| parse_marker(m.as_ref()));
        self.widen(visible)
    }

    /// Plans the window for markers that are already numeric.
    pub fn plan_indices(&self, markers: &[usize]) -> BTreeSet<usize> {
        self.widen(markers.iter().copied())
    }

    fn widen(&self, visible: impl Iterator<Item = usize>) -> BTreeSet<usize> {
        let mut window = BTreeSet::new();
        for index in visible {
            let lo = index.saturating_sub(self.overscan);
            let mut hi = index.saturating_add(self.overscan);
            if let Some(count) = self.page_count {
                // Visible markers are kept even past the end; only the
                // overscan is clamped.
                hi = hi.min(count.saturating_sub(1)).max(index);
            }
            window.extend(lo..=hi);
        }
        window
    }
}

fn parse_marker(raw: &str) -> Option<usize> {
    let raw = raw.trim_start();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let end = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    raw[..end].parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(v: &[usize]) -> BTreeSet<usize> {
        v.iter().copied().collect()
    }

    #[test]
    fn test_filters_invalid_markers() {
        let planner = PageWindowPlanner::new();
        assert_eq!(planner.plan(&["1", "2", "x", "NaN", "-1", ""]), set(&[1, 2]));
    }

    #[test]
    fn test_reads_leading_digits() {
        let planner = PageWindowPlanner::new();
        assert_eq!(planner.plan(&["1.5", "2px", "+3", "px2"]), set(&[1, 2, 3]));
    }

    #[test]
    fn test_overscan_capped() {
        let planner = PageWindowPlanner::new().with_overscan(usize::MAX);
        let window = planner.plan_indices(&[1_000]);
        assert_eq!(window.len(), 2 * MAX_OVERSCAN + 1);
        assert_eq!(window.first(), Some(&(1_000 - MAX_OVERSCAN)));
    }

    #[test]
    fn test_dedups_markers() {
        let planner = PageWindowPlanner::new();
        assert_eq!(planner.plan(&["3", " 3 ", "3"]), set(&[3]));
    }

    #[test]
    fn test_empty_input_yields_empty_plan() {
        let planner = PageWindowPlanner::new();
        let none: [&str; 0] = [];
        assert!(planner.plan(&none).is_empty());
        assert!(planner.plan(&["abc", "NaN"]).is_empty());
    }

    #[test]
    fn test_overscan_widens_window() {
        let planner = PageWindowPlanner::new().with_overscan(1);
        assert_eq!(planner.plan(&["0", "4"]), set(&[0, 1, 3, 4, 5]));
    }

    #[test]
    fn test_overscan_clamped_by_page_count() {
        let planner = PageWindowPlanner::new()
            .with_overscan(2)
            .with_page_count(Some(5));
        assert_eq!(planner.plan_indices(&[4]), set(&[2, 3, 4]));
    }
}
