//! Backend-agnostic structured search queries.
//!
//! A [`SearchQuery`] is what the pipeline hands to a
//! [`SearchBackend`](crate::backend::SearchBackend): a boolean clause tree
//! plus projection, pagination, and sort. Backends translate it into their
//! own DSL; [`InMemoryBackend`](crate::backend::memory::InMemoryBackend)
//! evaluates it directly.

pub mod builder;
pub mod parse;

use serde::Serialize;

pub use builder::QueryBuilder;
pub use parse::parse_query;

/// Comparison operators of the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeOp {
    Gt,
    Ge,
    Lt,
    Le,
}

/// One node of the clause tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Field equals one of `values`.
    Terms { field: String, values: Vec<String> },
    /// Field compares against `value`.
    Range {
        field: String,
        op: RangeOp,
        value: String,
    },
    /// Field matches a `*`/`?` wildcard pattern.
    Wildcard { field: String, pattern: String },
    /// Field is present.
    Exists { field: String },
    /// Any field contains the text (case-insensitive).
    Text { text: String },
    Bool(BoolClause),
}

/// Boolean combination of clauses.
///
/// A document matches when every `must` clause matches, no `must_not`
/// clause matches, and at least `minimum_should_match` of the `should`
/// clauses match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolClause {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Clause>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Clause>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Clause>,
    pub minimum_should_match: usize,
}

impl BoolClause {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }
}

/// A complete request to the search backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub clause: BoolClause,
    /// Projection; empty means the backend's default fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    pub from: usize,
    pub size: usize,
    /// Sort keys, passed through verbatim. Empty means backend ordering.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,
}

impl SearchQuery {
    /// Same clause and projection with a different page window.
    pub fn with_window(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }
}
