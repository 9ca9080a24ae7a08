//! Joined result rows.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::transport::Document;

/// One joined row: an ordered field map.
///
/// First-table fields come first. A second-table field whose name is
/// already present with an equal value is folded into it; with a different
/// value it is kept as `<second alias>.<field>`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    fields: Vec<(String, Value)>,
}

impl ResultRow {
    /// Merges a first-table document with a second-table document.
    ///
    /// Non-empty `first_fields` / `second_fields` restrict each side to the
    /// projected fields.
    #[must_use]
    pub fn merge(
        first: &Document,
        first_fields: &[String],
        second_alias: &str,
        second: &Document,
        second_fields: &[String],
    ) -> Self {
        let mut row = Self::default();
        for (name, value) in projected(first, first_fields) {
            row.fields.push((name.clone(), value.clone()));
        }
        for (name, value) in projected(second, second_fields) {
            let key = match row.get(name) {
                Some(existing) if existing == value => continue,
                Some(_) => format!("{second_alias}.{name}"),
                None => name.clone(),
            };
            row.fields.push((key, value.clone()));
        }
        row
    }

    /// Value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    /// Field names in row order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the row has no field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON object of the row.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.iter().cloned().collect::<Map<String, Value>>())
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn projected<'a>(
    doc: &'a Document,
    fields: &'a [String],
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    doc.source
        .iter()
        .filter(move |(name, _)| fields.is_empty() || fields.contains(*name))
}
