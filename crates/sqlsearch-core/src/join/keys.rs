//! Hashable join keys.
//!
//! JSON numbers are normalized so that `1` and `1.0` hash alike; floats are
//! stored as bits. Nulls, arrays and objects never form a key.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{json, Value};

use crate::sql::FieldType;
use crate::transport::Document;

/// One component of a join key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    /// Boolean.
    Bool(bool),
    /// Integral number that fits `i64`.
    Int(i64),
    /// Integral number above `i64::MAX`.
    UInt(u64),
    /// Non-integral number, stored as bits for hashing.
    Float(u64),
    /// String.
    Str(String),
}

impl KeyValue {
    /// Converts a JSON scalar; `None` for values that cannot be keys.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::UInt(u))
                } else {
                    let f = n.as_f64()?;
                    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                        Some(Self::Int(f as i64))
                    } else {
                        Some(Self::Float(f.to_bits()))
                    }
                }
            }
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Back to JSON, for `terms` filters.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::UInt(u) => json!(u),
            Self::Float(bits) => json!(f64::from_bits(*bits)),
            Self::Str(s) => json!(s),
        }
    }

    /// Kind name used in mismatch errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::UInt(_) | Self::Float(_) => "numeric",
            Self::Str(_) => "string",
        }
    }

    /// Whether a field declared as `field_type` can hold this value.
    #[must_use]
    pub fn fits(&self, field_type: FieldType) -> bool {
        match self {
            Self::Bool(_) => field_type == FieldType::Boolean,
            Self::Int(_) | Self::UInt(_) | Self::Float(_) => {
                matches!(field_type, FieldType::Long | FieldType::Double | FieldType::Date)
            }
            Self::Str(_) => {
                matches!(field_type, FieldType::Keyword | FieldType::Text | FieldType::Date)
            }
        }
    }
}

/// Composite key: one value per key field, in ON-clause order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinKey(pub Vec<KeyValue>);

impl JoinKey {
    /// Reads the key of `doc`; `None` if any field is missing or not a
    /// scalar.
    #[must_use]
    pub fn extract<S: AsRef<str>>(doc: &Document, fields: &[S]) -> Option<Self> {
        fields
            .iter()
            .map(|f| doc.get(f.as_ref()).and_then(KeyValue::from_json))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

/// Build-side rows grouped by key, in arrival order within each group.
#[derive(Debug, Default)]
pub struct KeyTable {
    rows: FxHashMap<JoinKey, Vec<usize>>,
    keys: Vec<JoinKey>,
}

impl KeyTable {
    /// Indexes `docs` by `fields`. Rows without a full key are skipped and
    /// counted in the returned tuple.
    #[must_use]
    pub fn build<S: AsRef<str>>(docs: &[Document], fields: &[S]) -> (Self, usize) {
        let mut table = Self::default();
        let mut skipped = 0;
        for (idx, doc) in docs.iter().enumerate() {
            let Some(key) = JoinKey::extract(doc, fields) else {
                skipped += 1;
                continue;
            };
            table
                .rows
                .entry(key.clone())
                .or_insert_with(|| {
                    table.keys.push(key);
                    Vec::new()
                })
                .push(idx);
        }
        (table, skipped)
    }

    /// True when no row produced a key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Distinct keys, in first-seen order.
    #[must_use]
    pub fn keys(&self) -> &[JoinKey] {
        &self.keys
    }

    /// Row indexes sharing `key`.
    #[must_use]
    pub fn rows(&self, key: &JoinKey) -> &[usize] {
        self.rows.get(key).map_or(&[][..], Vec::as_slice)
    }

    /// Distinct values of key component `position`, in first-seen order.
    #[must_use]
    pub fn distinct_values(&self, position: usize) -> Vec<&KeyValue> {
        let mut seen: FxHashSet<&KeyValue> = FxHashSet::default();
        self.keys
            .iter()
            .filter_map(|k| k.0.get(position))
            .filter(|v| seen.insert(*v))
            .collect()
    }
}
