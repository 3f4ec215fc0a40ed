//! Output formats and the fields each one needs from the index.
//!
//! Each supported media type maps to a [`FormatDescriptor`]: a formatting
//! [`Strategy`] plus the minimally-required and maximally-allowed fields.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::fields;

/// How matched documents are shaped into the response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Product summary objects with selected properties.
    Pds,
    /// "What you request is what you get": flat key/value records.
    Wyriwyg,
    /// The raw PDS4 label, as JSON or XML.
    Pds4 { json: bool },
}

const PDS_MIN_NEEDS: &[&str] = &[
    fields::LIDVID,
    fields::VID,
    fields::TITLE,
    fields::PRODUCT_CLASS,
    fields::START_DATE_TIME,
    fields::STOP_DATE_TIME,
    fields::REF_LID_INVESTIGATION,
    fields::REF_LID_TARGET,
    fields::LABEL_FILE_REF,
    fields::ARCHIVE_STATUS,
];

const PDS4_JSON_NEEDS: &[&str] = &[
    fields::LIDVID,
    fields::JSON_BLOB,
    fields::LABEL_FILE_REF,
    fields::ARCHIVE_STATUS,
];

const PDS4_XML_NEEDS: &[&str] = &[
    fields::LIDVID,
    fields::XML_BLOB,
    fields::LABEL_FILE_REF,
    fields::ARCHIVE_STATUS,
];

impl Strategy {
    /// Fields always requested when any field restriction applies.
    pub fn min_needs(&self) -> &'static [&'static str] {
        match self {
            Strategy::Pds => PDS_MIN_NEEDS,
            Strategy::Wyriwyg => &[],
            Strategy::Pds4 { json: true } => &PDS4_JSON_NEEDS[..2],
            Strategy::Pds4 { json: false } => &PDS4_XML_NEEDS[..2],
        }
    }

    /// Allow-list of fields; empty means unrestricted.
    pub fn max_needs(&self) -> &'static [&'static str] {
        match self {
            Strategy::Pds | Strategy::Wyriwyg => &[],
            Strategy::Pds4 { json: true } => PDS4_JSON_NEEDS,
            Strategy::Pds4 { json: false } => PDS4_XML_NEEDS,
        }
    }
}

/// Field requirements and formatting behavior for one media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub mime: String,
    pub strategy: Strategy,
    pub min_needs: Vec<String>,
    pub max_needs: Vec<String>,
}

impl FormatDescriptor {
    pub fn new(mime: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            mime: mime.into(),
            strategy,
            min_needs: strategy.min_needs().iter().map(|s| s.to_string()).collect(),
            max_needs: strategy.max_needs().iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Media type → strategy table.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: BTreeMap<String, Strategy>,
}

impl FormatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            formats: BTreeMap::new(),
        }
    }

    /// All media types the registry API serves.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("*", Strategy::Pds);
        registry.register("*/*", Strategy::Pds);
        registry.register("application/csv", Strategy::Wyriwyg);
        registry.register("application/json", Strategy::Pds);
        registry.register("application/kvp+json", Strategy::Wyriwyg);
        registry.register(
            "application/vnd.nasa.pds.pds4+json",
            Strategy::Pds4 { json: true },
        );
        registry.register(
            "application/vnd.nasa.pds.pds4+xml",
            Strategy::Pds4 { json: false },
        );
        registry.register("application/xml", Strategy::Pds);
        registry.register("text/csv", Strategy::Wyriwyg);
        registry.register("text/html", Strategy::Pds);
        registry.register("text/xml", Strategy::Pds);
        registry
    }

    pub fn register(&mut self, mime: impl Into<String>, strategy: Strategy) {
        self.formats.insert(mime.into(), strategy);
    }

    pub fn contains(&self, mime: &str) -> bool {
        self.formats.contains_key(mime)
    }

    pub fn lookup(&self, mime: &str) -> Option<FormatDescriptor> {
        self.formats
            .get(mime)
            .map(|strategy| FormatDescriptor::new(mime, *strategy))
    }

    /// Registered media types, sorted.
    pub fn supported(&self) -> Vec<String> {
        self.formats.keys().cloned().collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_strategies() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.lookup("*/*").unwrap().strategy, Strategy::Pds);
        assert_eq!(registry.lookup("*").unwrap().strategy, Strategy::Pds);
        assert_eq!(registry.lookup("text/csv").unwrap().strategy, Strategy::Wyriwyg);
        assert_eq!(
            registry
                .lookup("application/vnd.nasa.pds.pds4+xml")
                .unwrap()
                .strategy,
            Strategy::Pds4 { json: false }
        );
        assert!(registry.lookup("image/png").is_none());
        assert_eq!(registry.supported().len(), 11);
    }

    #[test]
    fn test_pds4_min_is_subset_of_max() {
        for json in [true, false] {
            let strategy = Strategy::Pds4 { json };
            for field in strategy.min_needs() {
                assert!(strategy.max_needs().contains(field));
            }
        }
        assert!(Strategy::Pds4 { json: true }
            .min_needs()
            .contains(&fields::JSON_BLOB));
        assert!(Strategy::Pds4 { json: false }
            .min_needs()
            .contains(&fields::XML_BLOB));
    }
}
