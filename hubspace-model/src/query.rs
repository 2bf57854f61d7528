//! Instance queries.
//!
//! A [`Query`] is a small predicate tree that serializes to JSON for the wire
//! and can also be evaluated locally against a [`Document`]:
//!
//! ```
//! use hubspace_model::{field, Query};
//!
//! let adults = field("age").ge(18).and(field("name").ne("root"));
//! assert!(!adults.is_all());
//! assert!(Query::all().is_all());
//! ```

use crate::document::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison applied to a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A predicate over collection instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    /// Matches every instance.
    #[default]
    All,
    Field {
        path: String,
        op: Comparison,
        value: Value,
    },
    And {
        clauses: Vec<Query>,
    },
    Or {
        clauses: Vec<Query>,
    },
    Not {
        clause: Box<Query>,
    },
}

impl Query {
    /// The query matching every instance.
    pub fn all() -> Self {
        Self::All
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Conjunction. `All` is dropped and nested `And`s are flattened.
    pub fn and(self, other: Query) -> Self {
        match (self, other) {
            (Self::All, q) | (q, Self::All) => q,
            (Self::And { mut clauses }, Self::And { clauses: rest }) => {
                clauses.extend(rest);
                Self::And { clauses }
            }
            (Self::And { mut clauses }, q) => {
                clauses.push(q);
                Self::And { clauses }
            }
            (q, Self::And { mut clauses }) => {
                clauses.insert(0, q);
                Self::And { clauses }
            }
            (a, b) => Self::And {
                clauses: vec![a, b],
            },
        }
    }

    /// Disjunction. `All` absorbs the other side; nested `Or`s are flattened.
    pub fn or(self, other: Query) -> Self {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::Or { mut clauses }, Self::Or { clauses: rest }) => {
                clauses.extend(rest);
                Self::Or { clauses }
            }
            (Self::Or { mut clauses }, q) => {
                clauses.push(q);
                Self::Or { clauses }
            }
            (q, Self::Or { mut clauses }) => {
                clauses.insert(0, q);
                Self::Or { clauses }
            }
            (a, b) => Self::Or {
                clauses: vec![a, b],
            },
        }
    }

    /// Negation. Double negation collapses.
    pub fn negate(self) -> Self {
        match self {
            Self::Not { clause } => *clause,
            q => Self::Not {
                clause: Box::new(q),
            },
        }
    }

    /// Evaluates the query against a document.
    ///
    /// A missing field only satisfies `ne`.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Field { path, op, value } => match doc.get(path) {
                None => *op == Comparison::Ne,
                Some(actual) => compare(actual, *op, value),
            },
            Self::And { clauses } => clauses.iter().all(|q| q.matches(doc)),
            Self::Or { clauses } => clauses.iter().any(|q| q.matches(doc)),
            Self::Not { clause } => !clause.matches(doc),
        }
    }
}

impl std::ops::Not for Query {
    type Output = Query;

    fn not(self) -> Query {
        self.negate()
    }
}

/// Starts a predicate on a field path, e.g. `field("author.name").eq("ada")`.
pub fn field(path: impl Into<String>) -> FieldPredicate {
    FieldPredicate { path: path.into() }
}

/// A field path waiting for its comparison.
#[derive(Debug, Clone)]
pub struct FieldPredicate {
    path: String,
}

impl FieldPredicate {
    fn build(self, op: Comparison, value: impl Into<Value>) -> Query {
        Query::Field {
            path: self.path,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Query {
        self.build(Comparison::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Query {
        self.build(Comparison::Ne, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Query {
        self.build(Comparison::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Query {
        self.build(Comparison::Ge, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Query {
        self.build(Comparison::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Query {
        self.build(Comparison::Le, value)
    }
}

fn compare(actual: &Value, op: Comparison, expected: &Value) -> bool {
    match op {
        Comparison::Eq => values_equal(actual, expected),
        Comparison::Ne => !values_equal(actual, expected),
        Comparison::Gt => order(actual, expected) == Some(Ordering::Greater),
        Comparison::Ge => matches!(
            order(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Comparison::Lt => order(actual, expected) == Some(Ordering::Less),
        Comparison::Le => matches!(
            order(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

/// Type-aware equality: numbers compare by value, so `1` equals `1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
