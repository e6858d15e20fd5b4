//! Column definitions

use serde::Deserialize;
use serde::Serialize;

/// Definition of one grid column.
///
/// `width` is the configured width (`None` lets the column take the
/// remaining space). `cell_width` is derived and reset to `width` every time
/// the definitions are assigned to a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// The row field this column displays.
    pub field: String,
    /// Configured width.
    #[serde(default)]
    pub width: Option<f64>,
    /// Effective cell width.
    #[serde(default)]
    pub cell_width: Option<f64>,
}

impl ColumnDef {
    /// Creates a column with no fixed width.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            width: None,
            cell_width: None,
        }
    }

    /// Sets the configured width.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Recomputes the derived cell width from the configured width.
    pub fn reset_cell_width(&mut self) {
        self.cell_width = self.width;
    }
}
