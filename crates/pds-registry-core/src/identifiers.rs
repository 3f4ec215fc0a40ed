//! Product identifiers and version selection.
//!
//! A registry product is named by a logical identifier ([`Lid`]) and,
//! optionally, a version token ([`Vid`]). The textual form of a versioned
//! identifier is `lid::vid`, e.g. `urn:nasa:pds:insight_rad::2.1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Separator between the logical identifier and the version token.
pub const LIDVID_SEPARATOR: &str = "::";

/// Logical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lid(String);

impl Lid {
    pub fn new(lid: impl Into<String>) -> Self {
        Self(lid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Lid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version token.
///
/// Ordering compares dot-separated components numerically where both sides
/// are numbers (`1.10 > 1.9`), falling back to a lexical comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vid(String);

impl Vid {
    pub fn new(vid: impl Into<String>) -> Self {
        Self(vid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Vid {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.0.split('.');
        let mut right = other.0.split('.');
        loop {
            match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                        (Ok(x), Ok(y)) => x.cmp(&y),
                        (Ok(_), Err(_)) => Ordering::Less,
                        (Err(_), Ok(_)) => Ordering::Greater,
                        (Err(_), Err(_)) => a.cmp(b),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

impl PartialOrd for Vid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Vid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A logical identifier pinned to one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LidVid {
    pub lid: Lid,
    pub vid: Vid,
}

impl LidVid {
    pub fn new(lid: Lid, vid: Vid) -> Self {
        Self { lid, vid }
    }
}

impl fmt::Display for LidVid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lid, LIDVID_SEPARATOR, self.vid)
    }
}

/// Identity of a registry product, with or without a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductIdentifier {
    Lid(Lid),
    LidVid(LidVid),
}

impl ProductIdentifier {
    /// Parse a raw identifier. Blank input means "no identifier".
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.split_once(LIDVID_SEPARATOR) {
            None => Ok(Some(ProductIdentifier::Lid(Lid::new(raw)))),
            Some((lid, vid)) => {
                let (lid, vid) = (lid.trim(), vid.trim());
                if lid.is_empty() || vid.is_empty() || vid.contains(LIDVID_SEPARATOR) {
                    return Err(RegistryError::InvalidIdentifier {
                        raw: raw.to_string(),
                    });
                }
                Ok(Some(ProductIdentifier::LidVid(LidVid::new(
                    Lid::new(lid),
                    Vid::new(vid),
                ))))
            }
        }
    }

    pub fn lid(&self) -> &Lid {
        match self {
            ProductIdentifier::Lid(lid) => lid,
            ProductIdentifier::LidVid(lidvid) => &lidvid.lid,
        }
    }

    pub fn is_versioned(&self) -> bool {
        matches!(self, ProductIdentifier::LidVid(_))
    }
}

impl fmt::Display for ProductIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductIdentifier::Lid(lid) => lid.fmt(f),
            ProductIdentifier::LidVid(lidvid) => lidvid.fmt(f),
        }
    }
}

/// Policy for resolving an identifier that lacks an explicit version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSelector {
    /// Resolve to the most recent version of the logical identifier.
    #[default]
    Latest,
    /// No version narrowing.
    All,
    /// Use the version exactly as given, or none if absent.
    Typed,
}

impl VersionSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionSelector::Latest => "latest",
            VersionSelector::All => "all",
            VersionSelector::Typed => "typed",
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionSelector {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(VersionSelector::Latest),
            "all" => Ok(VersionSelector::All),
            "typed" => Ok(VersionSelector::Typed),
            other => Err(RegistryError::InvalidParameter {
                name: "selector".to_string(),
                message: format!("'{}' is not one of latest, all, typed", other),
            }),
        }
    }
}
