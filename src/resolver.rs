//! Batched resolution of parent-entity references.
//!
//! Listing a page of entities must not cost one store round trip per record:
//! the union of all parent identifiers across the batch is collected and
//! fetched in a single query. Identifiers with no backing record are simply
//! absent from the returned map; callers fold a missing key to `null`.

use std::collections::{BTreeSet, HashMap};

use crate::error::AppError;
use crate::model::{Entity, EntityReference};
use crate::store::RecordStore;

/// Resolve `member_of`/`root_collection` targets for a batch of entities into
/// lightweight `{id, name}` references, in one store lookup.
pub async fn resolve_references(
    store: &dyn RecordStore,
    entities: &[Entity],
) -> Result<HashMap<String, EntityReference>, AppError> {
    let mut wanted: BTreeSet<&str> = BTreeSet::new();
    for entity in entities {
        if let Some(parent) = entity.member_of.as_deref() {
            wanted.insert(parent);
        }
        if let Some(root) = entity.root_collection.as_deref() {
            wanted.insert(root);
        }
    }
    if wanted.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: Vec<String> = wanted.into_iter().map(|s| s.to_string()).collect();
    let parents = store.entities_by_ids(&ids).await?;
    if parents.len() < ids.len() {
        // Dangling references degrade to null downstream; worth a trace, not a warning.
        tracing::debug!(
            requested = ids.len(),
            resolved = parents.len(),
            "some parent references did not resolve"
        );
    }

    let mut resolved = HashMap::with_capacity(parents.len());
    for parent in parents {
        resolved.insert(
            parent.id.clone(),
            EntityReference { id: parent.id, name: parent.name },
        );
    }
    Ok(resolved)
}
