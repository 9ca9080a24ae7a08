//! Statement descriptors: single-table SELECT and two-table JOIN.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::condition::{Condition, Where};
use super::hint::{Hint, TableSide};

/// Mapping type of a field, as declared in the index mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Exact-value string.
    Keyword,
    /// Analyzed string.
    Text,
    /// Integer types (long, integer, short, byte).
    Long,
    /// Floating point types.
    Double,
    /// Boolean.
    Boolean,
    /// Date.
    Date,
    /// Geo shape or point.
    Geo,
}

impl FieldType {
    /// Broad comparison family; only fields of the same family can join.
    #[must_use]
    pub const fn family(self) -> &'static str {
        match self {
            Self::Keyword | Self::Text => "string",
            Self::Long | Self::Double => "numeric",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Geo => "geo",
        }
    }

    /// Whether values of the two types can be equal.
    ///
    /// Dates are stored as strings or epoch numbers, so they accept both.
    #[must_use]
    pub fn compatible_with(self, other: Self) -> bool {
        match (self, other) {
            (Self::Date, o) | (o, Self::Date) => {
                matches!(o, Self::Date | Self::Keyword | Self::Text | Self::Long | Self::Double)
            }
            (a, b) => a.family() == b.family() && a != Self::Geo,
        }
    }

    /// Name as written in a mapping.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Text => "text",
            Self::Long => "long",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Geo => "geo",
        }
    }
}

/// A table (index) taking part in a statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRef {
    /// Alias used to qualify fields (`a` in `FROM users a`).
    pub alias: String,
    /// Index name.
    pub index: String,
    /// Projected fields; empty means all.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Predicates referencing only this table, alias already removed.
    #[serde(default)]
    pub where_clause: Option<Where>,
    /// Declared field types, used for join-key checks.
    #[serde(default)]
    pub mapping: BTreeMap<String, FieldType>,
}

impl TableRef {
    /// Creates a table reference with no filter and all fields.
    #[must_use]
    pub fn new(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            index: index.into(),
            ..Self::default()
        }
    }

    /// Sets the table's own filter.
    #[must_use]
    pub fn with_where(mut self, where_clause: impl Into<Where>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }

    /// Sets the projected fields.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Declares a field's mapping type.
    #[must_use]
    pub fn with_field_type(mut self, field: impl Into<String>, field_type: FieldType) -> Self {
        self.mapping.insert(field.into(), field_type);
        self
    }

    /// Strips this table's alias from `field`; `None` if it is not ours.
    #[must_use]
    pub fn strip_alias<'a>(&self, field: &'a str) -> Option<&'a str> {
        field
            .strip_prefix(self.alias.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field name, or `_score`.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

/// Single-table SELECT.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Select {
    /// Queried table.
    pub table: TableRef,
    /// Rows to skip.
    pub offset: Option<usize>,
    /// Max rows.
    pub limit: Option<usize>,
    /// ORDER BY items.
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
}

impl Select {
    /// Whether the statement ranks by relevance.
    #[must_use]
    pub fn orders_by_score(&self) -> bool {
        self.order_by.iter().any(|o| o.field == "_score")
    }
}

/// Parsed two-table join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSelect {
    /// Table of the FROM clause.
    pub first: TableRef,
    /// Joined table.
    pub second: TableRef,
    /// ON-clause predicates, each comparing a field of one table with a
    /// field of the other.
    pub connected_conditions: Vec<Condition>,
    /// Filter over both tables applied after joining.
    #[serde(default)]
    pub connected_where: Option<Where>,
    /// Hints from the statement comment.
    #[serde(default)]
    pub hints: Vec<Hint>,
    /// Statement LIMIT.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl JoinSelect {
    /// Creates a join with the given ON predicates and nothing else.
    #[must_use]
    pub fn new(first: TableRef, second: TableRef, connected_conditions: Vec<Condition>) -> Self {
        Self {
            first,
            second,
            connected_conditions,
            connected_where: None,
            hints: Vec::new(),
            limit: None,
        }
    }

    /// Adds a hint.
    #[must_use]
    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hints.push(hint);
        self
    }

    /// Sets the post-join filter.
    #[must_use]
    pub fn with_connected_where(mut self, where_clause: Where) -> Self {
        self.connected_where = Some(where_clause);
        self
    }

    /// Sets the statement LIMIT.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the table on `side`.
    #[must_use]
    pub fn table(&self, side: TableSide) -> &TableRef {
        match side {
            TableSide::First => &self.first,
            TableSide::Second => &self.second,
        }
    }

    /// Resolves an alias-qualified field to its table side and bare name.
    ///
    /// Unqualified names belong to neither table and yield `None`.
    #[must_use]
    pub fn resolve<'a>(&self, field: &'a str) -> Option<(TableSide, &'a str)> {
        if let Some(name) = self.first.strip_alias(field) {
            return Some((TableSide::First, name));
        }
        self.second
            .strip_alias(field)
            .map(|name| (TableSide::Second, name))
    }
}
