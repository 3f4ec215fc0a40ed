//! Well-known registry index fields and property-name notation.
//!
//! The index stores nested PDS4 attributes with `/` separators
//! (`pds:Identification_Area/pds:title`); the public API exposes them with `.`
//! separators (`pds:Identification_Area.pds:title`).

use serde_json::{Map, Value};

pub const LID: &str = "lid";
pub const VID: &str = "vid";
pub const LIDVID: &str = "lidvid";
pub const TITLE: &str = "title";
pub const PRODUCT_CLASS: &str = "product_class";
pub const START_DATE_TIME: &str = "pds:Time_Coordinates/pds:start_date_time";
pub const STOP_DATE_TIME: &str = "pds:Time_Coordinates/pds:stop_date_time";
pub const REF_LID_INVESTIGATION: &str = "ref_lid_investigation";
pub const REF_LID_TARGET: &str = "ref_lid_target";
pub const LABEL_FILE_REF: &str = "ops:Label_File_Info/ops:file_ref";
pub const JSON_BLOB: &str = "ops:Label_File_Info/ops:json_blob";
pub const XML_BLOB: &str = "ops:Label_File_Info/ops:xml_blob";
pub const ARCHIVE_STATUS: &str = "ops:Tracking_Meta/ops:archive_status";
pub const SUPERSEDED_BY: &str = "ops:Provenance/ops:superseded_by";

/// Convert an API property name to its index form.
pub fn json_to_index(name: &str) -> String {
    name.trim().replace('.', "/")
}

/// Convert an index field name to its API property form.
pub fn index_to_json(name: &str) -> String {
    name.replace('/', ".")
}

/// String forms of a stored field. Arrays are flattened; nulls, objects and
/// missing fields contribute nothing.
pub fn values_of(doc: &Map<String, Value>, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(value) => scalar_to_string(value).into_iter().collect(),
        None => Vec::new(),
    }
}

/// First value of a stored field.
pub fn first_of(doc: &Map<String, Value>, field: &str) -> Option<String> {
    values_of(doc, field).into_iter().next()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
