//! End-to-end pipeline tests over the in-memory backend.

use std::sync::Arc;

use pds_registry_core::backend::memory::InMemoryBackend;
use pds_registry_core::constraint::GroupConstraint;
use pds_registry_core::format::Strategy;
use pds_registry_core::identifiers::VersionSelector;
use pds_registry_core::response::ResultPayload;
use pds_registry_core::{Pagination, Registry, RegistryError, RequestParams};
use serde_json::{json, Value};

const ARCHIVE: &str = "ops:Tracking_Meta/ops:archive_status";
const SUPERSEDED: &str = "ops:Provenance/ops:superseded_by";

fn docs() -> Vec<Value> {
    vec![
        json!({
            "lid": "urn:nasa:pds:mars", "vid": "1.0", "lidvid": "urn:nasa:pds:mars::1.0",
            "title": "Mars Bundle", "product_class": "Product_Bundle",
            ARCHIVE: "archived", SUPERSEDED: "urn:nasa:pds:mars::2.0",
        }),
        json!({
            "lid": "urn:nasa:pds:mars", "vid": "2.0", "lidvid": "urn:nasa:pds:mars::2.0",
            "title": "Mars Bundle", "product_class": "Product_Bundle",
            ARCHIVE: "archived",
        }),
        json!({
            "lid": "urn:nasa:pds:mars:data", "vid": "1.0", "lidvid": "urn:nasa:pds:mars:data::1.0",
            "title": "Mars Data", "product_class": "Product_Collection",
            ARCHIVE: "certified",
        }),
        json!({
            "lid": "urn:nasa:pds:mars:data:img1", "vid": "1.0",
            "lidvid": "urn:nasa:pds:mars:data:img1::1.0",
            "title": "Rover Image One", "product_class": "Product_Observational",
            "ref_lid_target": ["urn:nasa:pds:context:target:planet.mars"],
            ARCHIVE: "archived",
        }),
        json!({
            "lid": "urn:nasa:pds:mars:data:img2", "vid": "1.0",
            "lidvid": "urn:nasa:pds:mars:data:img2::1.0",
            "title": "Rover Image Two", "product_class": "Product_Observational",
            ARCHIVE: "staged",
        }),
    ]
}

fn backend() -> Arc<InMemoryBackend> {
    Arc::new(
        docs()
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect(),
    )
}

fn registry(backend: &Arc<InMemoryBackend>) -> Registry {
    Registry::new(backend.clone()).with_archive_filter(GroupConstraint::archived())
}

fn plural(payload: ResultPayload) -> (u64, Vec<Value>) {
    match payload {
        ResultPayload::Plural { summary, data } => (summary.hits, data),
        other => panic!("expected plural payload, got {:?}", other),
    }
}

fn singular(payload: ResultPayload) -> Value {
    match payload {
        ResultPayload::Singular(value) => value,
        other => panic!("expected singular payload, got {:?}", other),
    }
}

#[tokio::test]
async fn test_search_products_applies_archive_filter() {
    let b = backend();
    let response = registry(&b)
        .search_products(RequestParams {
            selector: VersionSelector::All,
            ..Default::default()
        })
        .await
        .unwrap();
    let (hits, data) = plural(response.payload);
    assert_eq!(hits, 4);
    assert!(data.iter().all(|d| d["id"] != "urn:nasa:pds:mars:data:img2::1.0"));
}

#[tokio::test]
async fn test_latest_search_excludes_superseded() {
    let b = backend();
    let response = registry(&b)
        .search_products(RequestParams {
            query: "title eq \"Mars Bundle\"".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let (hits, data) = plural(response.payload);
    assert_eq!(hits, 1);
    assert_eq!(data[0]["id"], "urn:nasa:pds:mars::2.0");
}

#[tokio::test]
async fn test_product_latest_resolves_and_returns_single_object() {
    let b = backend();
    let response = registry(&b)
        .product("urn:nasa:pds:mars", RequestParams::default())
        .await
        .unwrap();
    assert_eq!(response.strategy, Strategy::Pds);
    let value = singular(response.payload);
    assert_eq!(value["id"], "urn:nasa:pds:mars::2.0");
    assert_eq!(value["metadata"]["version"], "2.0");
    // one resolution round trip plus the query
    assert_eq!(b.round_trips(), 2);
}

#[tokio::test]
async fn test_product_explicit_old_version_is_returned() {
    let b = backend();
    let response = registry(&b)
        .product("urn:nasa:pds:mars::1.0", RequestParams::default())
        .await
        .unwrap();
    assert_eq!(singular(response.payload)["id"], "urn:nasa:pds:mars::1.0");
    assert_eq!(b.round_trips(), 1);
}

#[tokio::test]
async fn test_product_unknown_lid_is_not_found() {
    let b = backend();
    let err = registry(&b)
        .product("urn:nasa:pds:venus", RequestParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::IdentifierNotFound { .. }));
}

#[tokio::test]
async fn test_singular_zero_hits_is_nothing_found() {
    let b = backend();
    let err = registry(&b)
        .product(
            "urn:nasa:pds:mars::2.0",
            RequestParams {
                query: "title eq \"Venus\"".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NothingFound));
}

#[tokio::test]
async fn test_singular_two_hits_is_ambiguous() {
    let b = backend();
    let err = registry(&b)
        .product(
            "urn:nasa:pds:mars",
            RequestParams {
                selector: VersionSelector::All,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::AmbiguousSingularResult { hits: 2 }));
}

#[tokio::test]
async fn test_product_versions_lists_every_version() {
    let b = backend();
    let response = registry(&b)
        .product_versions(
            "urn:nasa:pds:mars",
            RequestParams {
                sort: vec!["-vid".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let (hits, data) = plural(response.payload);
    assert_eq!(hits, 2);
    assert_eq!(data[0]["id"], "urn:nasa:pds:mars::2.0");
    assert_eq!(data[1]["id"], "urn:nasa:pds:mars::1.0");
}

#[tokio::test]
async fn test_products_by_group() {
    let b = backend();
    let response = registry(&b)
        .products_by_group("collections", RequestParams::default())
        .await
        .unwrap();
    let (hits, data) = plural(response.payload);
    assert_eq!(hits, 1);
    assert_eq!(data[0]["type"], "Product_Collection");
}

#[tokio::test]
async fn test_unknown_group_fails_before_backend() {
    let b = backend();
    let err = registry(&b)
        .products_by_group("moons", RequestParams::default())
        .await
        .unwrap_err();
    match err {
        RegistryError::UnknownGroupName { name, known } => {
            assert_eq!(name, "moons");
            assert!(known.contains(&"bundles".to_string()));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(b.round_trips(), 0);
}

#[tokio::test]
async fn test_batch_total_overrides_hit_count() {
    let b = backend();
    let page = Pagination::new(
        vec![
            "urn:nasa:pds:mars::2.0".to_string(),
            "urn:nasa:pds:mars:data::1.0".to_string(),
            "urn:nasa:pds:mars:data:img1::1.0".to_string(),
        ],
        0,
        3,
        9,
    );
    let response = registry(&b)
        .products_by_lidvids(RequestParams::default(), &page)
        .await
        .unwrap();
    let (hits, data) = plural(response.payload);
    assert_eq!(hits, 9);
    assert_eq!(data.len(), 3);
}

#[tokio::test]
async fn test_malformed_query_never_reaches_backend() {
    let b = backend();
    let err = registry(&b)
        .search_products(RequestParams {
            query: "(title eq \"Mars\"".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::MalformedQuery { position: 0, .. }));
    assert_eq!(b.round_trips(), 0);
}

#[tokio::test]
async fn test_malformed_query_on_latest_product_skips_resolution() {
    let b = backend();
    let err = registry(&b)
        .product(
            "urn:nasa:pds:mars",
            RequestParams {
                selector: VersionSelector::Latest,
                query: "(title eq \"Mars\"".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::MalformedQuery { position: 0, .. }));
    assert_eq!(b.round_trips(), 0);
}

#[tokio::test]
async fn test_unsupported_accept_is_rejected() {
    let b = backend();
    let err = registry(&b)
        .search_products(RequestParams {
            accept: "image/png".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    match err {
        RegistryError::UnsupportedFormat {
            attempted,
            supported,
        } => {
            assert_eq!(attempted, "image/png");
            assert!(supported.contains(&"application/json".to_string()));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_kvp_format_with_fields() {
    let b = backend();
    let response = registry(&b)
        .product(
            "urn:nasa:pds:mars:data:img1",
            RequestParams {
                accept: "text/csv".into(),
                fields: vec!["title".into(), "ops:Tracking_Meta.ops:archive_status".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.mime, "text/csv");
    let value = singular(response.payload);
    assert_eq!(
        value,
        json!({"key_values": [
            {"key": "title", "value": "Rover Image One"},
            {"key": "ops:Tracking_Meta.ops:archive_status", "value": "archived"},
        ]})
    );
}

#[tokio::test]
async fn test_summary_only_lists_properties() {
    let b = backend();
    let response = registry(&b)
        .products_by_group(
            "bundles",
            RequestParams {
                summary_only: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    match response.payload {
        ResultPayload::Plural { summary, data } => {
            assert!(data.is_empty());
            assert_eq!(summary.hits, 1);
            assert!(summary.properties.contains(&"ops:Tracking_Meta.ops:archive_status".to_string()));
            assert!(summary.properties.windows(2).all(|w| w[0] < w[1]));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_summary_only_properties_cover_matches_past_limit() {
    let b = backend();
    let response = registry(&b)
        .search_products(RequestParams {
            summary_only: true,
            limit: 1,
            sort: vec!["title".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();
    match response.payload {
        ResultPayload::Plural { summary, data } => {
            assert!(data.is_empty());
            assert_eq!(summary.hits, 3);
            assert_eq!(summary.limit, 1);
            // only the last match by title carries a target
            assert!(summary.properties.contains(&"ref_lid_target".to_string()));
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_singular_ignores_page_limit() {
    let b = backend();
    let response = registry(&b)
        .with_max_limit(10)
        .product(
            "urn:nasa:pds:mars:data",
            RequestParams {
                limit: 11,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(singular(response.payload)["id"], "urn:nasa:pds:mars:data::1.0");
}

#[tokio::test]
async fn test_limit_above_maximum_is_rejected() {
    let b = backend();
    let err = registry(&b)
        .with_max_limit(10)
        .search_products(RequestParams {
            limit: 11,
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidParameter { ref name, .. } if name == "limit"));
}

#[tokio::test]
async fn test_cross_group_uses_identifier_as_typed() {
    let b = backend();
    let collections = GroupConstraint::empty().with_all("product_class", ["Product_Collection"]);
    let response = registry(&b)
        .resolve_across(
            RequestParams::for_identifier("urn:nasa:pds:mars:data"),
            &collections,
            &GroupConstraint::empty(),
            false,
        )
        .await
        .unwrap();
    let (hits, _) = plural(response.payload);
    assert_eq!(hits, 1);
    // no latest-version lookup was needed
    assert_eq!(b.round_trips(), 1);
}
