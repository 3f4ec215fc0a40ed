//! Translate constraints and request parameters into a [`SearchQuery`].
//!
//! | Input | Clause |
//! |-------|--------|
//! | `all` keyword | `must` terms filter |
//! | `any` keywords | `should` terms, minimum one match |
//! | `not` keyword | `must_not` terms filter |
//! | parsed `q` clause | `must` |
//! | keyword filter | `must` text match |
//! | latest-only flag | `must_not` exists on the superseded-by field |

use tracing::debug;

use crate::constraint::GroupConstraint;
use crate::fields;

use super::{BoolClause, Clause, SearchQuery};

/// Fluent builder for one search request.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    constraint: GroupConstraint,
    query: Option<Clause>,
    keywords: Vec<String>,
    just_latest: bool,
    fields: Vec<String>,
    from: usize,
    size: usize,
    sort: Vec<String>,
}

impl QueryBuilder {
    pub fn new(constraint: GroupConstraint) -> Self {
        Self {
            constraint,
            ..Default::default()
        }
    }

    /// Clause parsed from the `q` parameter, if any.
    pub fn clause(mut self, query: Option<Clause>) -> Self {
        self.query = query;
        self
    }

    pub fn keywords(mut self, keywords: &[String]) -> Self {
        self.keywords = keywords.to_vec();
        self
    }

    /// Restrict matches to versions nobody has superseded.
    pub fn just_latest(mut self, just_latest: bool) -> Self {
        self.just_latest = just_latest;
        self
    }

    pub fn fields(mut self, fields: &[String]) -> Self {
        self.fields = fields.to_vec();
        self
    }

    pub fn window(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    pub fn sort(mut self, sort: &[String]) -> Self {
        self.sort = sort.to_vec();
        self
    }

    pub fn build(self) -> SearchQuery {
        let mut clause = constraint_clause(&self.constraint);

        if let Some(parsed) = self.query {
            clause.must.push(parsed);
        }

        for keyword in self.keywords.iter().map(|k| k.trim()) {
            if !keyword.is_empty() {
                clause.must.push(Clause::Text {
                    text: keyword.to_string(),
                });
            }
        }

        if self.just_latest {
            clause.must_not.push(Clause::Exists {
                field: fields::SUPERSEDED_BY.to_string(),
            });
        }

        let query = SearchQuery {
            clause,
            fields: self.fields,
            from: self.from,
            size: self.size,
            sort: self.sort,
        };
        debug!(
            "built search query: {}",
            serde_json::to_string(&query).unwrap_or_default()
        );
        query
    }

    /// Exact term-set lookup of a known page of lidvids.
    ///
    /// The result window is exactly the batch: offset 0, size `lidvids.len()`,
    /// no text scoring and no sort.
    pub fn for_identifiers(
        constraint: &GroupConstraint,
        lidvids: &[String],
        fields: &[String],
    ) -> SearchQuery {
        let mut clause = constraint_clause(constraint);
        clause.must.push(Clause::Terms {
            field: fields::LIDVID.to_string(),
            values: lidvids.to_vec(),
        });
        SearchQuery {
            clause,
            fields: fields.to_vec(),
            from: 0,
            size: lidvids.len(),
            sort: Vec::new(),
        }
    }
}

/// Boolean clause equivalent to a group constraint.
pub fn constraint_clause(constraint: &GroupConstraint) -> BoolClause {
    let mut clause = BoolClause::default();

    for (keyword, values) in constraint.all() {
        if !values.is_empty() {
            clause.must.push(terms(keyword, values));
        }
    }

    for (keyword, values) in constraint.any() {
        if !values.is_empty() {
            clause.should.push(terms(keyword, values));
        }
    }
    if !clause.should.is_empty() {
        clause.minimum_should_match = 1;
    }

    for (keyword, values) in constraint.not() {
        if !values.is_empty() {
            clause.must_not.push(terms(keyword, values));
        }
    }

    clause
}

fn terms(field: &str, values: &[String]) -> Clause {
    Clause::Terms {
        field: field.to_string(),
        values: values.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;

    #[test]
    fn test_constraint_parts_map_to_bool_sections() {
        let constraint = GroupConstraint::empty()
            .with_all("product_class", ["Product_Bundle"])
            .with_any("ref_lid_target", ["urn:mars", "urn:moon"])
            .with_any("ref_lid_instrument", ["urn:hirise"])
            .with_not("ops:Tracking_Meta/ops:archive_status", ["staged"]);
        let clause = constraint_clause(&constraint);
        assert_eq!(clause.must.len(), 1);
        assert_eq!(clause.should.len(), 2);
        assert_eq!(clause.minimum_should_match, 1);
        assert_eq!(clause.must_not.len(), 1);
    }

    #[test]
    fn test_empty_constraint_has_no_should_minimum() {
        let clause = constraint_clause(&GroupConstraint::empty());
        assert!(clause.is_empty());
        assert_eq!(clause.minimum_should_match, 0);
    }

    #[test]
    fn test_query_and_keywords_are_anded() {
        let query = QueryBuilder::new(GroupConstraint::archived())
            .clause(parse_query("title like \"*mars*\"").unwrap())
            .keywords(&["rover".to_string(), " ".to_string()])
            .window(10, 5)
            .sort(&["-vid".to_string()])
            .build();
        assert_eq!(query.clause.must.len(), 3);
        assert!(matches!(query.clause.must[2], Clause::Text { ref text } if text == "rover"));
        assert_eq!((query.from, query.size), (10, 5));
        assert_eq!(query.sort, vec!["-vid".to_string()]);
    }

    #[test]
    fn test_just_latest_adds_superseded_filter() {
        let query = QueryBuilder::new(GroupConstraint::empty())
            .just_latest(true)
            .build();
        assert_eq!(
            query.clause.must_not,
            vec![Clause::Exists {
                field: fields::SUPERSEDED_BY.to_string()
            }]
        );
    }

    #[test]
    fn test_identifier_batch_is_exact() {
        let lidvids: Vec<String> = vec!["a::1.0".into(), "b::1.0".into(), "c::2.0".into()];
        let query = QueryBuilder::for_identifiers(
            &GroupConstraint::archived(),
            &lidvids,
            &["title".to_string()],
        );
        assert_eq!(query.from, 0);
        assert_eq!(query.size, 3);
        assert!(query.sort.is_empty());
        assert!(query.clause.must.contains(&Clause::Terms {
            field: fields::LIDVID.to_string(),
            values: lidvids.clone(),
        }));
    }
}
