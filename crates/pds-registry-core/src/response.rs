//! Response assembly.
//!
//! Executes the request query and shapes the hits with the negotiated
//! [`Strategy`]. Plural requests always succeed with a (possibly empty) page;
//! singular requests must match exactly one document.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::backend::{Hit, SearchBackend, SearchHits};
use crate::context::{Pagination, RequestContext};
use crate::error::{RegistryError, Result};
use crate::fields::{self, first_of, index_to_json, values_of};
use crate::format::Strategy;
use crate::query::{QueryBuilder, SearchQuery};

/// Summary block of a plural response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    pub q: String,
    pub start: usize,
    pub limit: usize,
    pub sort: Vec<String>,
    pub hits: u64,
    /// Processing time in milliseconds.
    pub took: u64,
    /// Unique property names among the matched documents, in API notation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<String>,
}

/// Payload handed to the serializer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultPayload {
    Plural {
        summary: ResultSummary,
        data: Vec<Value>,
    },
    Singular(Value),
}

/// Fields never echoed as plain properties.
const BLOB_FIELDS: &[&str] = &[fields::JSON_BLOB, fields::XML_BLOB];

/// Shape one hit according to the strategy.
pub fn format_hit(strategy: Strategy, hit: &Hit, fields: &[String]) -> Value {
    match strategy {
        Strategy::Pds => pds_product(hit, fields),
        Strategy::Wyriwyg => key_values(hit, fields),
        Strategy::Pds4 { json } => pds4_label(hit, json),
    }
}

/// Names of the properties to echo: the projection when one was requested,
/// otherwise every stored field.
fn property_names<'a>(source: &'a Map<String, Value>, fields: &'a [String]) -> Vec<&'a str> {
    let names: Vec<&str> = if fields.is_empty() {
        source.keys().map(String::as_str).collect()
    } else {
        fields
            .iter()
            .map(String::as_str)
            .filter(|f| source.contains_key(*f))
            .collect()
    };
    names
        .into_iter()
        .filter(|name| !BLOB_FIELDS.contains(name))
        .collect()
}

fn pds_product(hit: &Hit, fields: &[String]) -> Value {
    let source = &hit.source;
    let properties: Map<String, Value> = property_names(source, fields)
        .into_iter()
        .map(|name| (index_to_json(name), json!(values_of(source, name))))
        .collect();

    json!({
        "id": hit.id,
        "type": first_of(source, fields::PRODUCT_CLASS),
        "title": first_of(source, fields::TITLE),
        "start_date_time": first_of(source, fields::START_DATE_TIME),
        "stop_date_time": first_of(source, fields::STOP_DATE_TIME),
        "investigations": values_of(source, fields::REF_LID_INVESTIGATION),
        "targets": values_of(source, fields::REF_LID_TARGET),
        "metadata": {
            "version": first_of(source, fields::VID),
            "label_url": first_of(source, fields::LABEL_FILE_REF),
            "archive_status": first_of(source, fields::ARCHIVE_STATUS),
        },
        "properties": properties,
    })
}

fn key_values(hit: &Hit, fields: &[String]) -> Value {
    let pairs: Vec<Value> = property_names(&hit.source, fields)
        .into_iter()
        .map(|name| {
            json!({
                "key": index_to_json(name),
                "value": values_of(&hit.source, name).join(","),
            })
        })
        .collect();
    json!({ "key_values": pairs })
}

fn pds4_label(hit: &Hit, json: bool) -> Value {
    let source = &hit.source;
    let blob = if json {
        match source.get(fields::JSON_BLOB) {
            Some(Value::String(text)) => {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
            }
            Some(other) => other.clone(),
            None => Value::Null,
        }
    } else {
        first_of(source, fields::XML_BLOB)
            .map(Value::String)
            .unwrap_or(Value::Null)
    };

    json!({
        "id": hit.id,
        "meta": {
            "label_url": first_of(source, fields::LABEL_FILE_REF),
            "archive_status": first_of(source, fields::ARCHIVE_STATUS),
        },
        "pds4": blob,
    })
}

/// Sorted union of property names across hits, in API notation.
fn unique_properties(hits: &[Hit]) -> Vec<String> {
    hits.iter()
        .flat_map(|hit| hit.source.keys())
        .map(|name| index_to_json(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn plural_payload(
    ctx: &RequestContext,
    result: SearchHits,
    total: Option<u64>,
    properties: Vec<String>,
) -> ResultPayload {
    let strategy = ctx.format().strategy;
    let data = if ctx.is_summary_only() {
        Vec::new()
    } else {
        result
            .hits
            .iter()
            .map(|hit| format_hit(strategy, hit, ctx.fields()))
            .collect()
    };
    let summary = ResultSummary {
        q: ctx.query_string().to_string(),
        start: ctx.start(),
        limit: ctx.limit(),
        sort: ctx.sort().to_vec(),
        hits: total.unwrap_or(result.total),
        took: ctx.elapsed_ms(),
        properties,
    };
    ResultPayload::Plural { summary, data }
}

/// Property names over every match of `query`, not just the returned page.
async fn matched_properties<B>(
    backend: &B,
    query: &SearchQuery,
    page: &SearchHits,
) -> Result<Vec<String>>
where
    B: SearchBackend + ?Sized,
{
    if query.from == 0 && page.total <= page.hits.len() as u64 {
        return Ok(unique_properties(&page.hits));
    }
    let size = usize::try_from(page.total).unwrap_or(usize::MAX);
    let everything = query.clone().with_window(0, size);
    let all = backend.execute(&everything).await?;
    Ok(unique_properties(&all.hits))
}

async fn run_plural<B>(
    backend: &B,
    ctx: &RequestContext,
    query: SearchQuery,
    total: Option<u64>,
) -> Result<()>
where
    B: SearchBackend + ?Sized,
{
    let result = backend.execute(&query).await?;
    debug!(
        "plural query returned {} of {} hits",
        result.hits.len(),
        result.total
    );
    let properties = if ctx.is_summary_only() {
        matched_properties(backend, &query, &result).await?
    } else {
        Vec::new()
    };
    ctx.set_response(plural_payload(ctx, result, total, properties));
    Ok(())
}

/// Execute the request window and store a plural payload.
pub async fn assemble_plural<B>(backend: &B, ctx: &RequestContext) -> Result<()>
where
    B: SearchBackend + ?Sized,
{
    let query = ctx.build_query();
    run_plural(backend, ctx, query, None).await
}

/// Look up a known page of lidvids. The page total overrides the hit count.
pub async fn assemble_batch<B>(
    backend: &B,
    ctx: &RequestContext,
    page: &Pagination<String>,
) -> Result<()>
where
    B: SearchBackend + ?Sized,
{
    let query = QueryBuilder::for_identifiers(&ctx.constraint(), &page.items, ctx.fields());
    run_plural(backend, ctx, query, Some(page.total)).await
}

/// Execute a singular lookup: at most two documents from offset zero.
pub async fn assemble_singular<B>(backend: &B, ctx: &RequestContext) -> Result<()>
where
    B: SearchBackend + ?Sized,
{
    let query = ctx.build_query().with_window(0, 2);
    let result = backend.execute(&query).await?;
    let count = result.total.max(result.hits.len() as u64);

    match count {
        0 => {
            ctx.log_conditions();
            Err(RegistryError::NothingFound)
        }
        1 => {
            let hit = result.hits.first().ok_or_else(|| RegistryError::BackendUnavailable {
                message: "backend reported one hit but returned none".to_string(),
            })?;
            ctx.set_response(ResultPayload::Singular(format_hit(
                ctx.format().strategy,
                hit,
                ctx.fields(),
            )));
            Ok(())
        }
        hits => {
            error!(
                "Got {} hits for a query which should have returned a singular result: {}",
                hits,
                serde_json::to_string(&query).unwrap_or_default()
            );
            Err(RegistryError::AmbiguousSingularResult { hits })
        }
    }
}

/// Run the request in the mode its context declares.
pub async fn assemble<B>(backend: &B, ctx: &RequestContext) -> Result<()>
where
    B: SearchBackend + ?Sized,
{
    if ctx.is_singular() {
        assemble_singular(backend, ctx).await
    } else {
        assemble_plural(backend, ctx).await
    }
}
