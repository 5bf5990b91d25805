//! Typed representation of a validated query.
//!
//! The JSON wire format dispatches on string keys; once a query has passed
//! validation every operator is one of these closed enums.

use std::fmt;

/// Numeric comparison operator (`GT`, `LT`, `EQ`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Gt,
    Lt,
    Eq,
}

impl NumericOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GT" => Some(NumericOp::Gt),
            "LT" => Some(NumericOp::Lt),
            "EQ" => Some(NumericOp::Eq),
            _ => None,
        }
    }

    #[inline]
    pub fn holds(self, actual: f64, bound: f64) -> bool {
        match self {
            NumericOp::Gt => actual > bound,
            NumericOp::Lt => actual < bound,
            NumericOp::Eq => actual == bound,
        }
    }
}

/// Match mode of an `IS` pattern, decided by its wildcard markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// No wildcard
    Exact,
    /// Trailing `*`
    Prefix,
    /// Leading `*`
    Suffix,
    /// Leading and trailing `*`
    Contains,
}

/// `IS` operand with its wildcard markers already stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringPattern {
    pub mode: MatchMode,
    pub needle: String,
}

impl StringPattern {
    /// Parse a raw `IS` value. Returns `None` when a `*` appears anywhere
    /// other than the first or last character.
    pub fn parse(raw: &str) -> Option<Self> {
        let (leading, rest) = match raw.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (trailing, needle) = match rest.strip_suffix('*') {
            Some(needle) => (true, needle),
            None => (false, rest),
        };
        if needle.contains('*') {
            return None;
        }

        let mode = match (leading, trailing) {
            (false, false) => MatchMode::Exact,
            (false, true) => MatchMode::Prefix,
            (true, false) => MatchMode::Suffix,
            (true, true) => MatchMode::Contains,
        };
        Some(Self {
            mode,
            needle: needle.to_string(),
        })
    }

    #[inline]
    pub fn matches(&self, value: &str) -> bool {
        match self.mode {
            MatchMode::Exact => value == self.needle,
            MatchMode::Prefix => value.starts_with(&self.needle),
            MatchMode::Suffix => value.ends_with(&self.needle),
            MatchMode::Contains => value.contains(&self.needle),
        }
    }
}

/// WHERE clause filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// The empty filter `{}`; matches every record
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Compare {
        op: NumericOp,
        field: String,
        value: f64,
    },
    Is {
        field: String,
        pattern: StringPattern,
    },
}

/// Aggregate operator of an APPLY rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Max,
    Min,
    Avg,
    Count,
    Sum,
}

impl AggregateOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "MAX" => Some(AggregateOp::Max),
            "MIN" => Some(AggregateOp::Min),
            "AVG" => Some(AggregateOp::Avg),
            "COUNT" => Some(AggregateOp::Count),
            "SUM" => Some(AggregateOp::Sum),
            _ => None,
        }
    }

    /// Whether the operator only accepts numeric source fields.
    pub fn requires_numeric(self) -> bool {
        !matches!(self, AggregateOp::Count)
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            AggregateOp::Max => "MAX",
            AggregateOp::Min => "MIN",
            AggregateOp::Avg => "AVG",
            AggregateOp::Count => "COUNT",
            AggregateOp::Sum => "SUM",
        };
        f.write_str(token)
    }
}

/// One APPLY rule: `{ name: { OP: field } }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRule {
    pub name: String,
    pub op: AggregateOp,
    pub field: String,
}

/// GROUP + APPLY, which only ever appear together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformations {
    pub group: Vec<String>,
    pub apply: Vec<ApplyRule>,
}

impl Transformations {
    pub fn apply_names(&self) -> impl Iterator<Item = &str> {
        self.apply.iter().map(|rule| rule.name.as_str())
    }
}

/// Sort direction of a multi-key ORDER
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// ORDER clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// `"ORDER": "<field>"`, ascending
    Single(String),
    /// `"ORDER": { "dir": ..., "keys": [...] }`
    Multi { dir: Direction, keys: Vec<String> },
}

/// OPTIONS clause after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub columns: Vec<String>,
    pub order: Option<Order>,
}
