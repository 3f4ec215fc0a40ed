//! In-memory [`SearchBackend`] for tests and small local indexes.
//!
//! Documents are JSON objects. Queries are evaluated by brute force over all
//! documents; string, number, and array-of-scalar fields are supported.
//! Sort keys name a field, with a leading `-` for descending order.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::constraint::GroupConstraint;
use crate::error::Result;
use crate::fields::{self, values_of};
use crate::identifiers::{Lid, Vid};
use crate::query::builder::constraint_clause;
use crate::query::{BoolClause, Clause, RangeOp, SearchQuery};

use super::{Hit, SearchBackend, SearchHits};

/// Brute-force backend over a vector of JSON documents.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    docs: Vec<Map<String, Value>>,
    round_trips: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, doc: Map<String, Value>) {
        self.docs.push(doc);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Number of `execute` and `resolve_latest_version` calls served so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(AtomicOrdering::SeqCst)
    }
}

impl FromIterator<Map<String, Value>> for InMemoryBackend {
    fn from_iter<I: IntoIterator<Item = Map<String, Value>>>(iter: I) -> Self {
        Self {
            docs: iter.into_iter().collect(),
            round_trips: AtomicUsize::new(0),
        }
    }
}

fn document_id(doc: &Map<String, Value>, position: usize) -> String {
    values_of(doc, fields::LIDVID)
        .into_iter()
        .next()
        .or_else(|| values_of(doc, fields::LID).into_iter().next())
        .unwrap_or_else(|| position.to_string())
}

fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Case-insensitive `*`/`?` wildcard match.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

fn clause_matches(doc: &Map<String, Value>, clause: &Clause) -> bool {
    match clause {
        Clause::Terms { field, values } => values_of(doc, field)
            .iter()
            .any(|v| values.contains(v)),
        Clause::Range { field, op, value } => values_of(doc, field).iter().any(|v| {
            let ord = compare_values(v, value);
            match op {
                RangeOp::Gt => ord == Ordering::Greater,
                RangeOp::Ge => ord != Ordering::Less,
                RangeOp::Lt => ord == Ordering::Less,
                RangeOp::Le => ord != Ordering::Greater,
            }
        }),
        Clause::Wildcard { field, pattern } => values_of(doc, field)
            .iter()
            .any(|v| wildcard_match(pattern, v)),
        Clause::Exists { field } => !values_of(doc, field).is_empty(),
        Clause::Text { text } => {
            let needle = text.to_lowercase();
            doc.keys().any(|field| {
                values_of(doc, field)
                    .iter()
                    .any(|v| v.to_lowercase().contains(&needle))
            })
        }
        Clause::Bool(b) => bool_matches(doc, b),
    }
}

fn bool_matches(doc: &Map<String, Value>, clause: &BoolClause) -> bool {
    clause.must.iter().all(|c| clause_matches(doc, c))
        && !clause.must_not.iter().any(|c| clause_matches(doc, c))
        && clause
            .should
            .iter()
            .filter(|c| clause_matches(doc, c))
            .count()
            >= clause.minimum_should_match
}

fn sort_key_order(a: &Map<String, Value>, b: &Map<String, Value>, key: &str) -> Ordering {
    let (field, descending) = match key.strip_prefix('-') {
        Some(field) => (field, true),
        None => (key, false),
    };
    let left = values_of(a, field).into_iter().next();
    let right = values_of(b, field).into_iter().next();
    let ord = match (left, right) {
        (Some(x), Some(y)) => compare_values(&x, &y),
        (Some(_), None) => return Ordering::Less,
        (None, Some(_)) => return Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    if descending {
        ord.reverse()
    } else {
        ord
    }
}

fn project(doc: &Map<String, Value>, projection: &[String]) -> Map<String, Value> {
    if projection.is_empty() {
        return doc.clone();
    }
    doc.iter()
        .filter(|(key, _)| projection.iter().any(|f| f == *key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn execute(&self, query: &SearchQuery) -> Result<SearchHits> {
        self.round_trips.fetch_add(1, AtomicOrdering::SeqCst);

        let mut matched: Vec<(usize, &Map<String, Value>)> = self
            .docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| bool_matches(doc, &query.clause))
            .collect();
        let total = matched.len() as u64;

        if !query.sort.is_empty() {
            matched.sort_by(|(_, a), (_, b)| {
                query
                    .sort
                    .iter()
                    .map(|key| sort_key_order(a, b, key))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let hits = matched
            .into_iter()
            .skip(query.from)
            .take(query.size)
            .map(|(position, doc)| Hit {
                id: document_id(doc, position),
                source: project(doc, &query.fields),
            })
            .collect();

        Ok(SearchHits { hits, total })
    }

    async fn resolve_latest_version(
        &self,
        lid: &Lid,
        scope: &GroupConstraint,
    ) -> Result<Option<Vid>> {
        self.round_trips.fetch_add(1, AtomicOrdering::SeqCst);

        let mut clause = constraint_clause(scope);
        clause.must.push(Clause::Terms {
            field: fields::LID.to_string(),
            values: vec![lid.to_string()],
        });

        Ok(self
            .docs
            .iter()
            .filter(|doc| bool_matches(doc, &clause))
            .filter_map(|doc| values_of(doc, fields::VID).into_iter().next())
            .map(Vid::new)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    fn backend() -> InMemoryBackend {
        [
            doc(json!({"lid": "urn:a", "vid": "1.0", "lidvid": "urn:a::1.0", "title": "Mars Rover Images", "size": 10, "ops:Provenance/ops:superseded_by": "urn:a::1.10"})),
            doc(json!({"lid": "urn:a", "vid": "1.10", "lidvid": "urn:a::1.10", "title": "Mars Rover Images", "size": 12})),
            doc(json!({"lid": "urn:b", "vid": "2.0", "lidvid": "urn:b::2.0", "title": "Lunar Dust", "size": 3, "ref_lid_target": ["urn:moon", "urn:earth"]})),
        ]
        .into_iter()
        .collect()
    }

    fn query(clause: BoolClause) -> SearchQuery {
        SearchQuery {
            clause,
            fields: Vec::new(),
            from: 0,
            size: 10,
            sort: Vec::new(),
        }
    }

    #[test]
    fn test_wildcard() {
        assert!(wildcard_match("mars*", "Mars Rover"));
        assert!(wildcard_match("*rov?r*", "mars rover images"));
        assert!(!wildcard_match("lunar*", "Mars"));
        assert!(wildcard_match("*", ""));
    }

    #[tokio::test]
    async fn test_terms_on_array_field() {
        let b = backend();
        let hits = b
            .execute(&query(BoolClause {
                must: vec![Clause::Terms {
                    field: "ref_lid_target".into(),
                    values: vec!["urn:moon".into()],
                }],
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].id, "urn:b::2.0");
    }

    #[tokio::test]
    async fn test_range_numeric_and_sort_desc() {
        let b = backend();
        let mut q = query(BoolClause {
            must: vec![Clause::Range {
                field: "size".into(),
                op: RangeOp::Ge,
                value: "10".into(),
            }],
            ..Default::default()
        });
        q.sort = vec!["-size".into()];
        let hits = b.execute(&q).await.unwrap();
        assert_eq!(hits.total, 2);
        assert_eq!(hits.hits[0].id, "urn:a::1.10");
    }

    #[tokio::test]
    async fn test_window_and_projection() {
        let b = backend();
        let mut q = query(BoolClause::default());
        q.from = 1;
        q.size = 1;
        q.fields = vec!["title".into()];
        let hits = b.execute(&q).await.unwrap();
        assert_eq!(hits.total, 3);
        assert_eq!(hits.hits.len(), 1);
        assert_eq!(hits.hits[0].id, "urn:a::1.10");
        assert_eq!(hits.hits[0].source.len(), 1);
        assert!(hits.hits[0].source.contains_key("title"));
    }

    #[tokio::test]
    async fn test_latest_version_uses_numeric_order_and_scope() {
        let b = backend();
        let latest = b
            .resolve_latest_version(&Lid::new("urn:a"), &GroupConstraint::empty())
            .await
            .unwrap();
        assert_eq!(latest, Some(Vid::new("1.10")));

        let scoped = GroupConstraint::empty().with_all("size", ["10"]);
        let latest = b
            .resolve_latest_version(&Lid::new("urn:a"), &scoped)
            .await
            .unwrap();
        assert_eq!(latest, Some(Vid::new("1.0")));

        let missing = b
            .resolve_latest_version(&Lid::new("urn:zzz"), &GroupConstraint::empty())
            .await
            .unwrap();
        assert_eq!(missing, None);
        assert_eq!(b.round_trips(), 3);
    }

    #[tokio::test]
    async fn test_text_and_should() {
        let b = backend();
        let hits = b
            .execute(&query(BoolClause {
                must: vec![Clause::Text {
                    text: "rover".into(),
                }],
                must_not: vec![Clause::Exists {
                    field: fields::SUPERSEDED_BY.into(),
                }],
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].id, "urn:a::1.10");

        let hits = b
            .execute(&query(BoolClause {
                should: vec![
                    Clause::Terms {
                        field: "lid".into(),
                        values: vec!["urn:b".into()],
                    },
                    Clause::Terms {
                        field: "vid".into(),
                        values: vec!["1.0".into()],
                    },
                ],
                minimum_should_match: 1,
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(hits.total, 2);
    }
}
