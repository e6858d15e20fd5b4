//! Grid row

use std::collections::HashMap;

use serde::Serialize;

use super::Value;

/// Field name to value mapping for one row, as returned by a data source.
pub type Fields = HashMap<String, Value>;

/// A single row of the dataset.
///
/// Identity is the `id` string, unique across the full dataset. `selected`
/// and `created` are derived state owned by the page store: `selected` is
/// recomputed from the selection set, `created` flips when the row enters a
/// resident page.
///
/// # Example
///
/// ```
/// use livescroll_lib::model::Row;
///
/// let row = Row::new("r5").set("name", "Contoso");
/// assert_eq!(row.id(), "r5");
/// assert!(!row.is_selected());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub(crate) id: String,
    pub(crate) data: Fields,
    pub(crate) selected: bool,
    pub(crate) created: bool,
}

impl Row {
    /// Creates a new row with no data.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: HashMap::new(),
            selected: false,
            created: false,
        }
    }

    /// Builds a row from source fields, taking its identity from `id_field`.
    ///
    /// Returns `None` when the field is missing or not usable as an id.
    pub fn from_fields(id_field: &str, data: Fields) -> Option<Self> {
        let id = data.get(id_field)?.as_id()?;
        Some(Self {
            id,
            data,
            selected: false,
            created: false,
        })
    }

    /// Sets a field value (builder pattern).
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// Returns the row id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns all field values.
    pub fn data(&self) -> &Fields {
        &self.data
    }

    /// Returns a reference to the field value, if it exists.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Returns `true` if the row is in the selection set.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Returns `true` while the row lives in a resident page.
    pub fn is_created(&self) -> bool {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fields_uses_id_field() {
        let mut data = Fields::new();
        data.insert("key".into(), Value::from(17i64));
        data.insert("name".into(), Value::from("Fabrikam"));

        let row = Row::from_fields("key", data).unwrap();
        assert_eq!(row.id(), "17");
        assert_eq!(row.get("name"), Some(&Value::from("Fabrikam")));
        assert!(!row.is_created());
    }

    #[test]
    fn test_from_fields_missing_id() {
        let mut data = Fields::new();
        data.insert("name".into(), Value::from("Fabrikam"));
        assert!(Row::from_fields("id", data.clone()).is_none());

        data.insert("id".into(), Value::Null);
        assert!(Row::from_fields("id", data).is_none());
    }
}
