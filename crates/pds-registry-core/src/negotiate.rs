//! Content negotiation and field-set computation.
//!
//! Negotiation picks the first media type in the client's Accept list that
//! the [`FormatRegistry`] supports. The field set then combines the fields the
//! user asked for with what the chosen format needs.

use tracing::{info, warn};

use crate::error::{RegistryError, Result};
use crate::fields::json_to_index;
use crate::format::{FormatDescriptor, FormatRegistry};

/// Outcome of negotiation: the chosen format and the fields to request.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub descriptor: FormatDescriptor,
    pub fields: Vec<String>,
}

/// Select the first supported media type in client preference order.
///
/// Parameters after `;` are ignored. When nothing matches, the first listed
/// value is returned unchanged so that [`describe`] can report it. A blank
/// header is treated as `*/*`.
pub fn find_match(registry: &FormatRegistry, accept: &str) -> String {
    if accept.trim().is_empty() {
        return "*/*".to_string();
    }

    let mut first: Option<&str> = None;
    for entry in accept.split(',') {
        let mime = entry.split(';').next().unwrap_or("").trim();
        if mime.is_empty() {
            continue;
        }
        first.get_or_insert(mime);
        if registry.contains(mime) {
            info!("Matched output type as '{}' from '{}'.", mime, accept);
            return mime.to_string();
        }
    }

    let unmatched = first.unwrap_or(accept.trim()).to_string();
    info!("No supported output type in '{}'.", accept);
    unmatched
}

/// Look up the descriptor for a negotiated media type.
pub fn describe(registry: &FormatRegistry, mime: &str) -> Result<FormatDescriptor> {
    registry.lookup(mime).ok_or_else(|| {
        let supported = registry.supported();
        warn!(
            "The Accept header value {} is not supported, supported values are {}",
            mime,
            supported.join(", ")
        );
        RegistryError::UnsupportedFormat {
            attempted: mime.to_string(),
            supported,
        }
    })
}

/// Compute the ordered, duplicate-free list of fields to request.
///
/// 1. Start from `requested` (converted to index notation).
/// 2. If anything was requested or the format has an allow-list, append
///    the format's required fields that are missing.
/// 3. If the format has an allow-list, drop everything outside it.
///
/// An empty result means "let the backend return its default fields".
pub fn field_set(descriptor: &FormatDescriptor, requested: &[String]) -> Vec<String> {
    let mut complete: Vec<String> = Vec::new();
    for field in requested.iter().map(|f| json_to_index(f)) {
        if !field.is_empty() && !complete.contains(&field) {
            complete.push(field);
        }
    }

    if !complete.is_empty() || !descriptor.max_needs.is_empty() {
        for need in &descriptor.min_needs {
            if !complete.contains(need) {
                complete.push(need.clone());
            }
        }
    }

    if !descriptor.max_needs.is_empty() {
        complete.retain(|field| descriptor.max_needs.contains(field));
    }

    complete
}

/// Negotiate the format and compute the field set in one step.
pub fn negotiate(
    registry: &FormatRegistry,
    accept: &str,
    requested: &[String],
) -> Result<Negotiated> {
    let mime = find_match(registry, accept);
    let descriptor = describe(registry, &mime)?;
    let fields = field_set(&descriptor, requested);
    Ok(Negotiated { descriptor, fields })
}
