//! Sort specification for page requests.

use serde::Deserialize;
use serde::Serialize;

/// Sort direction for ordering results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending order (A-Z, 0-9).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0).
    Desc,
}

/// The sort applied when fetching pages.
///
/// A spec without a field leaves rows in source order.
///
/// # Example
///
/// ```
/// use livescroll_lib::model::SortSpec;
///
/// let sort = SortSpec::from_parts(Some("revenue"), true);
/// assert_eq!(sort.field(), Some("revenue"));
/// assert!(sort.is_descending());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    field: Option<String>,
    direction: Direction,
}

impl SortSpec {
    /// No sorting.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates an ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Direction::Asc,
        }
    }

    /// Creates a descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Direction::Desc,
        }
    }

    /// Builds a spec from an optional field and a descending flag.
    pub fn from_parts(field: Option<&str>, descending: bool) -> Self {
        let direction = if descending {
            Direction::Desc
        } else {
            Direction::Asc
        };
        Self {
            field: field.map(str::to_string),
            direction,
        }
    }

    /// Returns the sort field, if any.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the sort direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` for descending order.
    pub fn is_descending(&self) -> bool {
        self.direction == Direction::Desc
    }
}
