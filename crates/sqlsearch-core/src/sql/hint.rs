//! Join hints.
//!
//! Hints arrive as comment directives such as `/*! NL_MULTISEARCH_SIZE(20) */`.
//! Each parses into a typed [`Hint`]; the join engine never looks at the text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of a hint, without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HintType {
    /// Use a nested-loop join even for pure equi-joins.
    ForceNestedLoop,
    /// Sub-queries per multi-search call.
    NlMultiSearchSize,
    /// Row caps for the first and second table.
    JoinLimit,
    /// Table the hash join builds its key set from.
    HashBuildSide,
}

/// One of the two tables of a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSide {
    /// The table in the FROM clause.
    #[default]
    First,
    /// The joined table.
    Second,
}

impl TableSide {
    /// The other side.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl fmt::Display for TableSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::First => "first",
            Self::Second => "second",
        })
    }
}

/// A typed hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Hint {
    /// `FORCE_NESTED_LOOP` (alias `USE_NESTED_LOOPS`).
    ForceNestedLoop,
    /// `NL_MULTISEARCH_SIZE(n)`.
    NlMultiSearchSize {
        /// Sub-queries per batch.
        size: usize,
    },
    /// `JOIN_LIMIT(first, second)`.
    JoinLimit {
        /// Max rows from the first table.
        first: usize,
        /// Max rows from the second table.
        second: usize,
    },
    /// `HASH_BUILD_SIDE(first|second)`.
    HashBuildSide {
        /// Side hashed into the key set.
        side: TableSide,
    },
}

impl Hint {
    /// Returns the hint's type.
    #[must_use]
    pub const fn hint_type(&self) -> HintType {
        match self {
            Self::ForceNestedLoop => HintType::ForceNestedLoop,
            Self::NlMultiSearchSize { .. } => HintType::NlMultiSearchSize,
            Self::JoinLimit { .. } => HintType::JoinLimit,
            Self::HashBuildSide { .. } => HintType::HashBuildSide,
        }
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForceNestedLoop => f.write_str("FORCE_NESTED_LOOP"),
            Self::NlMultiSearchSize { size } => write!(f, "NL_MULTISEARCH_SIZE({size})"),
            Self::JoinLimit { first, second } => write!(f, "JOIN_LIMIT({first}, {second})"),
            Self::HashBuildSide { side } => write!(f, "HASH_BUILD_SIDE({side})"),
        }
    }
}

impl FromStr for Hint {
    type Err = Error;

    /// Parses `NAME` or `NAME(p1, p2, ...)`, case-insensitively. Surrounding
    /// `/*! ... */` comment markers are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s
            .trim()
            .trim_start_matches("/*!")
            .trim_start_matches("/*")
            .trim_end_matches("*/")
            .trim();

        let (name, params) = match text.find('(') {
            Some(open) => {
                let close = text
                    .rfind(')')
                    .filter(|&c| c > open && text[c + 1..].trim().is_empty())
                    .ok_or_else(|| Error::InvalidHint(format!("unbalanced parentheses in '{s}'")))?;
                let params: Vec<&str> = text[open + 1..close]
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                (text[..open].trim(), params)
            }
            None => (text, Vec::new()),
        };

        match name.to_ascii_uppercase().as_str() {
            "FORCE_NESTED_LOOP" | "USE_NESTED_LOOPS" => {
                expect_params(name, &params, 0)?;
                Ok(Self::ForceNestedLoop)
            }
            "NL_MULTISEARCH_SIZE" => {
                expect_params(name, &params, 1)?;
                let size = parse_count(name, params[0])?;
                Ok(Self::NlMultiSearchSize { size })
            }
            "JOIN_LIMIT" => {
                expect_params(name, &params, 2)?;
                Ok(Self::JoinLimit {
                    first: parse_count(name, params[0])?,
                    second: parse_count(name, params[1])?,
                })
            }
            "HASH_BUILD_SIDE" => {
                expect_params(name, &params, 1)?;
                let side = match params[0].to_ascii_lowercase().as_str() {
                    "first" => TableSide::First,
                    "second" => TableSide::Second,
                    other => {
                        return Err(Error::InvalidHint(format!(
                            "HASH_BUILD_SIDE expects first or second, got '{other}'"
                        )))
                    }
                };
                Ok(Self::HashBuildSide { side })
            }
            _ => Err(Error::InvalidHint(format!("unknown hint '{name}'"))),
        }
    }
}

fn expect_params(name: &str, params: &[&str], expected: usize) -> Result<(), Error> {
    if params.len() == expected {
        Ok(())
    } else {
        Err(Error::InvalidHint(format!(
            "{name} takes {expected} parameter(s), got {}",
            params.len()
        )))
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize, Error> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::InvalidHint(format!(
            "{name} expects a positive integer, got '{raw}'"
        ))),
    }
}
