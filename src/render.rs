//! Serialization of pipeline payloads into response bodies.
//!
//! | Media type | Body |
//! |------------|------|
//! | `*`, `*/*`, `application/json`, `text/html`, `application/kvp+json`, `application/vnd.nasa.pds.pds4+json` | JSON |
//! | `application/xml`, `text/xml`, `application/vnd.nasa.pds.pds4+xml` | XML |
//! | `text/csv`, `application/csv` | CSV with a header row |
//!
//! Wildcard and `text/html` requests are answered with JSON.

use std::io::Cursor;

use anyhow::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use serde_json::Value;

use pds_registry_core::response::ResultPayload;

/// Body encoding chosen for a negotiated media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Xml,
    Csv,
}

impl Encoding {
    pub fn for_mime(mime: &str) -> Self {
        match mime {
            "application/xml" | "text/xml" | "application/vnd.nasa.pds.pds4+xml" => Encoding::Xml,
            "text/csv" | "application/csv" => Encoding::Csv,
            _ => Encoding::Json,
        }
    }

    /// Content-Type header value for a negotiated media type.
    pub fn content_type(self, mime: &str) -> String {
        match (self, mime) {
            (Encoding::Json, "*" | "*/*" | "text/html") => "application/json".to_string(),
            _ => mime.to_string(),
        }
    }
}

/// Error body shared by every encoding.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub request: String,
    pub message: String,
}

/// Render a successful payload.
pub fn render(payload: &ResultPayload, mime: &str) -> Result<Vec<u8>> {
    let value = serde_json::to_value(payload)?;
    match Encoding::for_mime(mime) {
        Encoding::Json => Ok(serde_json::to_vec(&value)?),
        Encoding::Xml => {
            let root = match payload {
                ResultPayload::Plural { .. } => "products",
                ResultPayload::Singular(_) => "product",
            };
            to_xml(root, &value)
        }
        Encoding::Csv => Ok(to_csv(payload).into_bytes()),
    }
}

/// Render an error for the negotiated media type.
pub fn render_error(error: &ErrorMessage, mime: &str) -> Result<Vec<u8>> {
    match Encoding::for_mime(mime) {
        Encoding::Json => Ok(serde_json::to_vec(error)?),
        Encoding::Xml => to_xml("error", &serde_json::to_value(error)?),
        Encoding::Csv => Ok(format!(
            "request,message\n\"{}\",\"{}\"\n",
            error.request.replace('"', "\"\""),
            error.message.replace('"', "\"\"")
        )
        .into_bytes()),
    }
}

// ============ XML ============

fn to_xml(root: &str, value: &Value) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_element(&mut writer, BytesStart::new(root), value)?;
    Ok(writer.into_inner().into_inner())
}

/// Element name for the members of an array-valued field.
fn item_name(parent: &str) -> &'static str {
    match parent {
        "data" => "product",
        "key_values" => "field",
        _ => "value",
    }
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, start: BytesStart, value: &Value) -> Result<()> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    match value {
        Value::Null => {
            writer.write_event(Event::Empty(start))?;
        }
        Value::Object(map) => {
            writer.write_event(Event::Start(start))?;
            for (key, child) in map {
                if key == "properties" && child.is_object() {
                    write_properties(writer, child)?;
                } else if key == "pds4" && name == "product" {
                    write_label(writer, child)?;
                } else {
                    write_element(writer, BytesStart::new(key.as_str()), child)?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
        Value::Array(items) => {
            writer.write_event(Event::Start(start))?;
            for item in items {
                write_element(writer, BytesStart::new(item_name(&name)), item)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
        scalar => {
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Text(BytesText::new(&scalar_text(scalar))))?;
            writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        }
    }
    Ok(())
}

/// Property names contain `:` and `.`, so they go in an attribute.
fn write_properties(writer: &mut Writer<Cursor<Vec<u8>>>, properties: &Value) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("properties")))?;
    if let Value::Object(map) = properties {
        for (key, values) in map {
            let mut start = BytesStart::new("property");
            start.push_attribute(("name", key.as_str()));
            write_element(writer, start, values)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("properties")))?;
    Ok(())
}

/// Embed a PDS4 XML label as markup; anything else is written as a value.
fn write_label(writer: &mut Writer<Cursor<Vec<u8>>>, label: &Value) -> Result<()> {
    match label {
        Value::String(xml) => {
            let body = strip_declaration(xml);
            writer.write_event(Event::Start(BytesStart::new("pds4")))?;
            writer.write_event(Event::Text(BytesText::from_escaped(body)))?;
            writer.write_event(Event::End(BytesEnd::new("pds4")))?;
            Ok(())
        }
        other => write_element(writer, BytesStart::new("pds4"), other),
    }
}

fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    trimmed
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============ CSV ============

fn csv_field(text: &str) -> String {
    if text.contains(',') || text.contains('"') || text.contains('\n') || text.contains('\r') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Flatten one formatted record into key/value pairs.
fn record_pairs(record: &Value) -> Vec<(String, String)> {
    if let Some(pairs) = record.get("key_values").and_then(Value::as_array) {
        return pairs
            .iter()
            .map(|pair| {
                (
                    pair.get("key").map(scalar_text).unwrap_or_default(),
                    pair.get("value").map(scalar_text).unwrap_or_default(),
                )
            })
            .collect();
    }
    match record {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(","),
                    Value::Null => String::new(),
                    other => scalar_text(other),
                };
                (key.clone(), text)
            })
            .collect(),
        other => vec![("value".to_string(), scalar_text(other))],
    }
}

fn to_csv(payload: &ResultPayload) -> String {
    let records: Vec<Vec<(String, String)>> = match payload {
        ResultPayload::Plural { data, .. } => data.iter().map(record_pairs).collect(),
        ResultPayload::Singular(value) => vec![record_pairs(value)],
    };

    let mut header: Vec<String> = Vec::new();
    for (key, _) in records.iter().flatten() {
        if !header.contains(key) {
            header.push(key.clone());
        }
    }

    let mut out = header
        .iter()
        .map(|h| csv_field(h))
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    for record in &records {
        let row: Vec<String> = header
            .iter()
            .map(|h| {
                record
                    .iter()
                    .find(|(key, _)| key == h)
                    .map(|(_, value)| csv_field(value))
                    .unwrap_or_default()
            })
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
