//! Identifier resolution.
//!
//! Turns a raw identifier plus a [`VersionSelector`] into the canonical
//! identifier the query should target:
//!
//! | Input | Selector | Result |
//! |-------|----------|--------|
//! | blank | any | no identifier, no backend call |
//! | `lid::vid` | any | unchanged |
//! | `lid` | `Latest` | `lid::<latest vid>` from the backend, or `IdentifierNotFound` |
//! | `lid` | `All` / `Typed` | unchanged `lid` |

use tracing::{debug, warn};

use crate::backend::SearchBackend;
use crate::constraint::GroupConstraint;
use crate::error::{RegistryError, Result};
use crate::identifiers::{LidVid, ProductIdentifier, VersionSelector};

/// What the latest-version lookup may see.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionScope<'a> {
    pub constraint: &'a GroupConstraint,
    pub fields: &'a [String],
}

/// Resolve an already-parsed identifier.
pub async fn resolve<B>(
    backend: &B,
    requested: Option<&ProductIdentifier>,
    selector: VersionSelector,
    scope: ResolutionScope<'_>,
) -> Result<Option<ProductIdentifier>>
where
    B: SearchBackend + ?Sized,
{
    let requested = match requested {
        Some(identifier) => identifier,
        None => return Ok(None),
    };

    match (requested, selector) {
        (ProductIdentifier::LidVid(_), _) => Ok(Some(requested.clone())),
        (ProductIdentifier::Lid(lid), VersionSelector::Latest) => {
            debug!(
                "resolving latest version of {} (scope fields: {})",
                lid,
                scope.fields.len()
            );
            match backend.resolve_latest_version(lid, scope.constraint).await? {
                Some(vid) => Ok(Some(ProductIdentifier::LidVid(LidVid::new(
                    lid.clone(),
                    vid,
                )))),
                None => {
                    warn!("Could not find lid(vid) in the registry: {}", lid);
                    Err(RegistryError::IdentifierNotFound {
                        identifier: lid.to_string(),
                    })
                }
            }
        }
        (ProductIdentifier::Lid(_), VersionSelector::All | VersionSelector::Typed) => {
            Ok(Some(requested.clone()))
        }
    }
}

/// Parse and resolve a raw identifier string.
pub async fn resolve_raw<B>(
    backend: &B,
    raw: &str,
    selector: VersionSelector,
    scope: ResolutionScope<'_>,
) -> Result<Option<ProductIdentifier>>
where
    B: SearchBackend + ?Sized,
{
    let requested = ProductIdentifier::parse(raw)?;
    resolve(backend, requested.as_ref(), selector, scope).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryBackend;
    use crate::identifiers::{Lid, Vid};
    use serde_json::json;

    fn backend() -> InMemoryBackend {
        [json!({"lid": "X", "vid": "3", "lidvid": "X::3"}),
         json!({"lid": "X", "vid": "2", "lidvid": "X::2"})]
        .into_iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
    }

    fn scope(constraint: &GroupConstraint) -> ResolutionScope<'_> {
        ResolutionScope {
            constraint,
            fields: &[],
        }
    }

    #[tokio::test]
    async fn test_blank_resolves_to_none_without_backend() {
        let b = backend();
        let empty = GroupConstraint::empty();
        let resolved = resolve_raw(&b, "", VersionSelector::All, scope(&empty))
            .await
            .unwrap();
        assert_eq!(resolved, None);
        assert_eq!(b.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_typed_lidvid_is_identity() {
        let b = backend();
        let empty = GroupConstraint::empty();
        let resolved = resolve_raw(&b, "X::2", VersionSelector::Typed, scope(&empty))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.to_string(), "X::2");
        assert_eq!(b.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_latest_derives_version() {
        let b = backend();
        let empty = GroupConstraint::empty();
        let resolved = resolve_raw(&b, "X", VersionSelector::Latest, scope(&empty))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            resolved,
            ProductIdentifier::LidVid(LidVid::new(Lid::new("X"), Vid::new("3")))
        );
        assert_eq!(b.round_trips(), 1);
    }

    #[tokio::test]
    async fn test_all_keeps_lid() {
        let b = backend();
        let empty = GroupConstraint::empty();
        let resolved = resolve_raw(&b, "X", VersionSelector::All, scope(&empty))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved, ProductIdentifier::Lid(Lid::new("X")));
        assert_eq!(b.round_trips(), 0);
    }

    #[tokio::test]
    async fn test_latest_missing_is_not_found() {
        let b = backend();
        let empty = GroupConstraint::empty();
        let err = resolve_raw(&b, "Y", VersionSelector::Latest, scope(&empty))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::IdentifierNotFound { identifier } if identifier == "Y"));
    }
}
