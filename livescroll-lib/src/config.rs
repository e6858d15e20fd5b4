//! Grid configuration

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::planner::MAX_OVERSCAN;
use crate::selection::SelectionMode;

/// Configuration for a [`LiveGrid`](crate::grid::LiveGrid).
///
/// Every field has a default, so a JSON document only needs the keys it
/// changes.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use livescroll_lib::config::GridConfig;
///
/// let config = GridConfig::default()
///     .with_page_size(50)
///     .with_id_field("key")
///     .with_scroll_debounce(Duration::from_millis(250));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Rows per page.
    ///
    /// Default: 100
    pub page_size: usize,

    /// Field holding the row identity.
    ///
    /// Default: `"id"`
    pub id_field: String,

    /// How many rows a user may select.
    ///
    /// Default: multiple
    pub selection_mode: SelectionMode,

    /// Quiet period before a scroll position is acted on.
    ///
    /// Default: 500 ms
    #[serde(with = "millis")]
    pub scroll_debounce: Duration,

    /// Neighbouring pages kept resident on each side of every visible page.
    /// At most [`MAX_OVERSCAN`].
    ///
    /// Default: 0
    pub overscan_pages: usize,

    /// Maximum page fetches in flight at once.
    ///
    /// Default: 4
    pub max_concurrent_fetches: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            id_field: "id".to_string(),
            selection_mode: SelectionMode::Multiple,
            scroll_debounce: Duration::from_millis(500),
            overscan_pages: 0,
            max_concurrent_fetches: 4,
        }
    }
}

impl GridConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GridConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks that the values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::invalid("page_size", "must be at least 1"));
        }
        if self.id_field.trim().is_empty() {
            return Err(ConfigError::invalid("id_field", "must not be empty"));
        }
        if self.overscan_pages > MAX_OVERSCAN {
            return Err(ConfigError::invalid(
                "overscan_pages",
                format!("must be at most {MAX_OVERSCAN}"),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::invalid(
                "max_concurrent_fetches",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the id field.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Sets the selection mode.
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    /// Sets the scroll debounce period.
    pub fn with_scroll_debounce(mut self, debounce: Duration) -> Self {
        self.scroll_debounce = debounce;
        self
    }

    /// Sets the overscan page count.
    pub fn with_overscan_pages(mut self, pages: usize) -> Self {
        self.overscan_pages = pages;
        self
    }

    /// Sets the fetch concurrency limit.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GridConfig::from_json_str(r#"{"page_size": 25, "scroll_debounce": 120}"#)
            .unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.scroll_debounce, Duration::from_millis(120));
        assert_eq!(config.id_field, "id");
        assert_eq!(config.selection_mode, SelectionMode::Multiple);
    }

    #[test]
    fn test_selection_mode_from_json() {
        let config = GridConfig::from_json_str(r#"{"selection_mode": "single"}"#).unwrap();
        assert_eq!(config.selection_mode, SelectionMode::Single);
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let err = GridConfig::from_json_str(r#"{"page_size": 0}"#).unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_validate_rejects_blank_id_field() {
        let config = GridConfig::default().with_id_field("  ");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "id_field"
        ));
    }

    #[test]
    fn test_validate_rejects_huge_overscan() {
        let err = GridConfig::from_json_str(r#"{"overscan_pages": 100000}"#).unwrap_err();
        assert!(err.to_string().contains("overscan_pages"));
        assert!(GridConfig::new().with_overscan_pages(MAX_OVERSCAN).validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            GridConfig::from_json_str("{page_size"),
            Err(ConfigError::Parse(_))
        ));
    }
}
