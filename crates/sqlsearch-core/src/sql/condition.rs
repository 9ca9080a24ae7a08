//! WHERE clause condition types.
//!
//! A condition tree is either a leaf [`Condition`] or a group of child
//! trees. Every node carries the connector that links it to its siblings,
//! which is what decides whether it becomes a `must` or a `should` clause.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How a node is combined with its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    /// Conjunction (`must`).
    #[default]
    And,
    /// Disjunction (`should`).
    Or,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (!= or <>)
    Neq,
    /// Greater than (>)
    Gt,
    /// Less than (<)
    Lt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than or equal (<=)
    Lte,
    /// LIKE pattern with `%` and `_` wildcards
    Like,
    /// NOT LIKE
    NotLike,
    /// IN (v1, v2, ...)
    In,
    /// NOT IN (v1, v2, ...)
    NotIn,
    /// BETWEEN low AND high
    Between,
    /// NOT BETWEEN low AND high
    NotBetween,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,
    /// GEO_INTERSECTS(field, 'WKT')
    GeoIntersects,
}

impl Operator {
    /// Operator that yields the same predicate with its operands swapped.
    ///
    /// `a > b` holds exactly when `b < a`. Operators whose operands are not
    /// interchangeable return `None`.
    #[must_use]
    pub const fn swapped(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Eq),
            Self::Neq => Some(Self::Neq),
            Self::Gt => Some(Self::Lt),
            Self::Lt => Some(Self::Gt),
            Self::Gte => Some(Self::Lte),
            Self::Lte => Some(Self::Gte),
            _ => None,
        }
    }

    /// SQL spelling, used in explanations and error messages.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "<>",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::GeoIntersects => "GEO_INTERSECTS",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Restricts a leaf predicate to a nested object or a child document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Plain field of the document itself.
    #[default]
    Document,
    /// Field inside a nested object at `path`.
    Nested {
        /// Nested object path.
        path: String,
    },
    /// Field of a child document of type `child_type`.
    Child {
        /// Child relation type.
        child_type: String,
    },
}

/// A condition operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    /// Literal value.
    Literal(Value),
    /// Reference to another field, e.g. `b.user_id` in a join predicate.
    Field(String),
}

impl Operand {
    /// Returns the literal value, if any.
    #[must_use]
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Field(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::Field(name) => f.write_str(name),
        }
    }
}

/// A leaf predicate: `field operator operands`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Connector to the previous sibling.
    pub connector: Connector,
    /// Field name, optionally prefixed with a table alias (`a.age`).
    pub field: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Operands; their count depends on the operator.
    pub operands: Vec<Operand>,
    /// Nested / child scoping.
    #[serde(default)]
    pub scope: Scope,
}

impl Condition {
    /// Creates an AND-connected, document-scoped condition.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator, operands: Vec<Operand>) -> Self {
        Self {
            connector: Connector::And,
            field: field.into(),
            operator,
            operands,
            scope: Scope::Document,
        }
    }

    /// Creates an equality condition.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, vec![Operand::Literal(value.into())])
    }

    /// Creates a single-operand comparison.
    #[must_use]
    pub fn compare(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(field, operator, vec![Operand::Literal(value.into())])
    }

    /// Creates a BETWEEN condition.
    #[must_use]
    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::new(
            field,
            Operator::Between,
            vec![Operand::Literal(low.into()), Operand::Literal(high.into())],
        )
    }

    /// Creates an IN condition.
    #[must_use]
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(
            field,
            Operator::In,
            values.into_iter().map(Operand::Literal).collect(),
        )
    }

    /// Creates a LIKE condition.
    #[must_use]
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            field,
            Operator::Like,
            vec![Operand::Literal(Value::String(pattern.into()))],
        )
    }

    /// Creates an IS NULL condition.
    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, Vec::new())
    }

    /// Creates a predicate comparing two fields (join predicate).
    #[must_use]
    pub fn fields(left: impl Into<String>, operator: Operator, right: impl Into<String>) -> Self {
        Self::new(left, operator, vec![Operand::Field(right.into())])
    }

    /// Sets the connector to OR.
    #[must_use]
    pub fn or(mut self) -> Self {
        self.connector = Connector::Or;
        self
    }

    /// Scopes the condition to a nested object path.
    #[must_use]
    pub fn nested(mut self, path: impl Into<String>) -> Self {
        self.scope = Scope::Nested { path: path.into() };
        self
    }

    /// Scopes the condition to a child document type.
    #[must_use]
    pub fn child(mut self, child_type: impl Into<String>) -> Self {
        self.scope = Scope::Child {
            child_type: child_type.into(),
        };
        self
    }

    /// Returns the referenced field when the single operand is a field.
    #[must_use]
    pub fn field_operand(&self) -> Option<&str> {
        match self.operands.as_slice() {
            [Operand::Field(name)] => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.operator)?;
        match self.operator {
            Operator::Between | Operator::NotBetween if self.operands.len() == 2 => {
                write!(f, " {} AND {}", self.operands[0], self.operands[1])
            }
            Operator::In | Operator::NotIn => {
                f.write_str(" (")?;
                for (i, op) in self.operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{op}")?;
                }
                f.write_str(")")
            }
            _ => {
                for op in &self.operands {
                    write!(f, " {op}")?;
                }
                Ok(())
            }
        }
    }
}

/// A node of the condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Where {
    /// Leaf predicate.
    Leaf(Condition),
    /// Parenthesized group of child nodes.
    Group {
        /// Connector to the previous sibling.
        connector: Connector,
        /// Ordered children.
        children: Vec<Where>,
    },
}

impl Where {
    /// `(c1 AND c2 AND ...)`: every child is re-connected with AND.
    ///
    /// The group itself is AND-connected; use [`Where::with_connector`] to
    /// attach it to its siblings with OR.
    #[must_use]
    pub fn and(children: Vec<Where>) -> Self {
        Self::group(Connector::And, children)
    }

    /// `(c1 OR c2 OR ...)`: every child is re-connected with OR.
    #[must_use]
    pub fn or(children: Vec<Where>) -> Self {
        Self::group(Connector::Or, children)
    }

    fn group(children_connector: Connector, children: Vec<Where>) -> Self {
        Self::Group {
            connector: Connector::And,
            children: children
                .into_iter()
                .map(|c| c.with_connector(children_connector))
                .collect(),
        }
    }

    /// Returns this node's connector.
    #[must_use]
    pub fn connector(&self) -> Connector {
        match self {
            Self::Leaf(c) => c.connector,
            Self::Group { connector, .. } => *connector,
        }
    }

    /// Returns a copy with the connector replaced.
    #[must_use]
    pub fn with_connector(mut self, connector: Connector) -> Self {
        match &mut self {
            Self::Leaf(c) => c.connector = connector,
            Self::Group { connector: c, .. } => *c = connector,
        }
        self
    }

    /// Collapses single-child chains: a group with exactly one child is
    /// the same predicate as that child.
    #[must_use]
    pub fn unwrap_single(&self) -> &Where {
        let mut node = self;
        while let Self::Group { children, .. } = node {
            if children.len() != 1 {
                break;
            }
            node = &children[0];
        }
        node
    }

    /// Visits every leaf condition in document order.
    pub fn for_each_condition<'a>(&'a self, f: &mut impl FnMut(&'a Condition)) {
        match self {
            Self::Leaf(c) => f(c),
            Self::Group { children, .. } => {
                for child in children {
                    child.for_each_condition(f);
                }
            }
        }
    }
}

impl From<Condition> for Where {
    fn from(condition: Condition) -> Self {
        Self::Leaf(condition)
    }
}
