//! Conflict-aware merging of catalog snapshots.
//!
//! Properties merge per key with the right-hand side winning. Resources and
//! representations are unions keyed by id: left-hand entries keep their
//! order, right-hand-only entries are appended. A representation id present
//! on both sides must describe the same representation.

use tracing::warn;

use crate::catalog::ResourceCatalog;
use crate::error::{CatalogError, Result};
use crate::representation::Representation;
use crate::resource::{Properties, Resource};

/// Merge two snapshots of the same catalog.
pub fn merge(a: &ResourceCatalog, b: &ResourceCatalog) -> Result<ResourceCatalog> {
    if a.id() != b.id() {
        return Err(CatalogError::merge_conflict(format!(
            "the catalogs to be merged have different identifiers ('{}' and '{}')",
            a.id(),
            b.id()
        )));
    }

    let properties = merge_properties(a.properties(), b.properties());

    let resources = merge_optional(
        a.resources(),
        b.resources(),
        |r: &Resource| r.id().to_string(),
        merge_resources,
    )?;

    Ok(ResourceCatalog::from_parts_unchecked(
        a.id().to_string(),
        properties,
        resources,
    ))
}

fn merge_resources(a: &Resource, b: &Resource) -> Result<Resource> {
    let properties = merge_properties(a.properties(), b.properties());

    let representations = merge_optional(
        a.representations(),
        b.representations(),
        |r: &Representation| r.id(),
        |left, right| {
            if left == right {
                Ok(left.clone())
            } else {
                warn!(
                    resource = %a.id(),
                    representation = %left.id(),
                    "Representation conflict during catalog merge"
                );
                Err(CatalogError::merge_conflict(format!(
                    "the representations to be merged are not equal (resource '{}', representation '{}')",
                    a.id(),
                    left.id()
                )))
            }
        },
    )?;

    Ok(Resource::from_parts_unchecked(
        a.id().to_string(),
        properties,
        representations,
    ))
}

fn merge_properties(a: &Properties, b: &Properties) -> Properties {
    let mut merged = a.clone();
    for (key, value) in b {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Union two optional lists by key, merging entries present on both sides.
fn merge_optional<T, K, F, M>(
    a: Option<&[T]>,
    b: Option<&[T]>,
    key: F,
    merge_entry: M,
) -> Result<Option<Vec<T>>>
where
    T: Clone,
    K: PartialEq,
    F: Fn(&T) -> K,
    M: Fn(&T, &T) -> Result<T>,
{
    let (a, b) = match (a, b) {
        (None, None) => return Ok(None),
        (Some(a), None) => return Ok(Some(a.to_vec())),
        (None, Some(b)) => return Ok(Some(b.to_vec())),
        (Some(a), Some(b)) => (a, b),
    };

    let b_keys: Vec<K> = b.iter().map(&key).collect();
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a_keys = Vec::with_capacity(a.len());

    for left in a {
        let left_key = key(left);
        let entry = match b_keys.iter().position(|k| *k == left_key) {
            Some(index) => merge_entry(left, &b[index])?,
            None => left.clone(),
        };
        merged.push(entry);
        a_keys.push(left_key);
    }

    for (right, right_key) in b.iter().zip(b_keys) {
        if !a_keys.contains(&right_key) {
            merged.push(right.clone());
        }
    }

    Ok(Some(merged))
}
