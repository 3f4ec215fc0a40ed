//! Group constraints: keyword/value predicates scoping which products a query sees.
//!
//! A [`GroupConstraint`] has three parts:
//!
//! | Part  | Semantics |
//! |-------|-----------|
//! | `all` | every keyword must match one of its values (AND across keywords, OR within) |
//! | `any` | at least one keyword/value pair across the whole map must match |
//! | `not` | no keyword/value pair may match |
//!
//! Constraints from several sources (archive-status preset, named group,
//! identifier) combine by conjunction via [`GroupConstraint::merge`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{RegistryError, Result};
use crate::fields;
use crate::identifiers::ProductIdentifier;

/// Keyword → accepted values.
pub type Predicates = BTreeMap<String, Vec<String>>;

/// Immutable three-part predicate over keyword/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GroupConstraint {
    #[serde(default)]
    all: Predicates,
    #[serde(default)]
    any: Predicates,
    #[serde(default)]
    not: Predicates,
}

impl GroupConstraint {
    /// The empty constraint; matches everything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &Predicates {
        &self.all
    }

    pub fn any(&self) -> &Predicates {
        &self.any
    }

    pub fn not(&self) -> &Predicates {
        &self.not
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty() && self.not.is_empty()
    }

    pub fn with_all<I, S>(mut self, keyword: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend(&mut self.all, keyword, values);
        self
    }

    pub fn with_any<I, S>(mut self, keyword: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend(&mut self.any, keyword, values);
        self
    }

    pub fn with_not<I, S>(mut self, keyword: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        extend(&mut self.not, keyword, values);
        self
    }

    /// Conjunction of two constraints. Shared keywords concatenate their
    /// value lists, so `{all:{a:[1]}}` and `{all:{a:[2]}}` give `{all:{a:[1,2]}}`.
    pub fn merge(&self, other: &GroupConstraint) -> GroupConstraint {
        let mut merged = self.clone();
        for (keyword, values) in &other.all {
            extend(&mut merged.all, keyword, values.iter().cloned());
        }
        for (keyword, values) in &other.any {
            extend(&mut merged.any, keyword, values.iter().cloned());
        }
        for (keyword, values) in &other.not {
            extend(&mut merged.not, keyword, values.iter().cloned());
        }
        merged
    }

    /// Only products whose archive status is public.
    pub fn archived() -> Self {
        Self::empty().with_all(fields::ARCHIVE_STATUS, ["archived", "certified"])
    }

    /// The constraint implied by a resolved identifier.
    pub fn for_identifier(identifier: &ProductIdentifier) -> Self {
        match identifier {
            ProductIdentifier::Lid(lid) => Self::empty().with_all(fields::LID, [lid.as_str()]),
            ProductIdentifier::LidVid(lidvid) => {
                Self::empty().with_all(fields::LIDVID, [lidvid.to_string()])
            }
        }
    }
}

fn extend<I, S>(map: &mut Predicates, keyword: &str, values: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let entry = map.entry(keyword.to_string()).or_default();
    for value in values {
        let value = value.into();
        if !entry.contains(&value) {
            entry.push(value);
        }
    }
}

/// Merge any number of constraint sources into one.
pub fn compose<'a, I>(sources: I) -> GroupConstraint
where
    I: IntoIterator<Item = &'a GroupConstraint>,
{
    sources
        .into_iter()
        .fold(GroupConstraint::empty(), |acc, c| acc.merge(c))
}

/// Named constraint groups (`bundles`, `collections`, ...).
#[derive(Debug, Clone)]
pub struct GroupRegistry {
    groups: BTreeMap<String, GroupConstraint>,
}

impl GroupRegistry {
    /// Registry with only the built-in groups.
    pub fn with_builtins() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert("any".to_string(), GroupConstraint::empty());
        groups.insert(
            "bundles".to_string(),
            GroupConstraint::empty().with_all(fields::PRODUCT_CLASS, ["Product_Bundle"]),
        );
        groups.insert(
            "collections".to_string(),
            GroupConstraint::empty().with_all(fields::PRODUCT_CLASS, ["Product_Collection"]),
        );
        groups.insert(
            "products".to_string(),
            GroupConstraint::empty().with_not(
                fields::PRODUCT_CLASS,
                ["Product_Bundle", "Product_Collection"],
            ),
        );
        Self { groups }
    }

    /// Add or replace a named group.
    pub fn register(&mut self, name: impl Into<String>, constraint: GroupConstraint) {
        self.groups.insert(name.into(), constraint);
    }

    pub fn names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn lookup(&self, name: &str) -> Result<&GroupConstraint> {
        self.groups
            .get(name)
            .ok_or_else(|| RegistryError::UnknownGroupName {
                name: name.to_string(),
                known: self.names(),
            })
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
