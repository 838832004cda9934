//! Resource catalogs, their builder and path lookup.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::ids::validate_catalog_id;
use crate::item::CatalogItem;
use crate::path::ResourcePath;
use crate::resource::{Properties, Resource};

/// Reserved catalog property keys.
pub mod keys {
    pub const README: &str = "readme";
    pub const LICENSE: &str = "license";
}

/// An immutable snapshot of a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCatalog")]
pub struct ResourceCatalog {
    id: String,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    resources: Option<Vec<Resource>>,
}

impl ResourceCatalog {
    /// Build a catalog, validating the id and resource id uniqueness.
    pub fn new(
        id: impl Into<String>,
        properties: Option<Properties>,
        resources: Option<Vec<Resource>>,
    ) -> Result<Self> {
        let id = id.into();
        validate_catalog_id(&id)?;

        if let Some(resources) = &resources {
            let mut seen = HashSet::new();
            for resource in resources {
                if !seen.insert(resource.id()) {
                    return Err(CatalogError::validation(format!(
                        "the resource id '{}' occurs more than once in catalog '{}'",
                        resource.id(),
                        id
                    )));
                }
            }
        }

        Ok(Self {
            id,
            properties: properties.unwrap_or_default(),
            resources,
        })
    }

    pub(crate) fn from_parts_unchecked(
        id: String,
        properties: Properties,
        resources: Option<Vec<Resource>>,
    ) -> Self {
        Self {
            id,
            properties,
            resources,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn resources(&self) -> Option<&[Resource]> {
        self.resources.as_deref()
    }

    /// Look up a resource by id (case-sensitive).
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|resource| resource.id() == id)
    }

    /// The `readme` property, if it is a string.
    pub fn readme(&self) -> Option<&str> {
        self.properties.get(keys::README).and_then(Value::as_str)
    }

    /// The `license` property, if it is a string.
    pub fn license(&self) -> Option<&str> {
        self.properties.get(keys::LICENSE).and_then(Value::as_str)
    }

    /// A copy of this catalog without its resources.
    pub fn without_resources(&self) -> Self {
        Self {
            id: self.id.clone(),
            properties: self.properties.clone(),
            resources: None,
        }
    }

    /// Merge `other` into a new catalog; see [`crate::merge::merge`].
    pub fn merge(&self, other: &ResourceCatalog) -> Result<ResourceCatalog> {
        crate::merge::merge(self, other)
    }

    /// Resolve a path to a native item of this catalog.
    ///
    /// The representation token is first matched together with the path's
    /// parameters against the derived ids. If that fails, the bare token is
    /// matched and the parameters become the item's binding.
    pub fn find(&self, path: &str) -> Result<CatalogItem> {
        let parsed = ResourcePath::parse(path)?;
        self.find_parsed(&parsed)
    }

    /// Like [`find`](Self::find), returning `None` on any failure.
    pub fn try_find(&self, path: &str) -> Option<CatalogItem> {
        match self.find(path) {
            Ok(item) => Some(item),
            Err(err) => {
                debug!(path = %path, error = %err, "Catalog lookup failed");
                None
            }
        }
    }

    pub(crate) fn find_parsed(&self, path: &ResourcePath) -> Result<CatalogItem> {
        let resource = self.find_resource(path)?;

        let (representation, parameters) = match resource
            .representation(&path.representation_with_parameters())
        {
            Some(representation) if path.parameters.is_some() => (representation, None),
            _ => {
                let representation = resource.representation(&path.representation_id).ok_or_else(|| {
                    CatalogError::RepresentationNotFound {
                        resource_id: resource.id().to_string(),
                        representation_id: path.representation_with_parameters(),
                    }
                })?;
                (representation, path.parameters.clone())
            }
        };

        let base = match &path.base_representation_id {
            Some(base_id) => Some(
                resource
                    .representation(base_id)
                    .ok_or_else(|| CatalogError::RepresentationNotFound {
                        resource_id: resource.id().to_string(),
                        representation_id: base_id.clone(),
                    })?
                    .clone(),
            ),
            None => None,
        };

        Ok(CatalogItem::new(
            self,
            resource,
            representation.clone(),
            parameters,
            base,
        ))
    }

    pub(crate) fn find_resource(&self, path: &ResourcePath) -> Result<&Resource> {
        if path.catalog_id != self.id {
            return Err(CatalogError::CatalogNotFound(path.catalog_id.clone()));
        }

        self.resource(&path.resource_id)
            .ok_or_else(|| CatalogError::ResourceNotFound {
                catalog_id: self.id.clone(),
                resource_id: path.resource_id.clone(),
            })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalog {
    id: String,
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    resources: Option<Vec<Resource>>,
}

impl TryFrom<RawCatalog> for ResourceCatalog {
    type Error = CatalogError;

    fn try_from(raw: RawCatalog) -> Result<Self> {
        ResourceCatalog::new(raw.id, raw.properties, raw.resources)
    }
}

/// Builder for [`ResourceCatalog`].
#[derive(Debug, Clone)]
pub struct ResourceCatalogBuilder {
    id: String,
    properties: Properties,
    resources: Vec<Resource>,
}

impl ResourceCatalogBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: Properties::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_readme(self, readme: impl Into<String>) -> Self {
        self.with_property(keys::README, readme.into())
    }

    pub fn with_license(self, license: impl Into<String>) -> Self {
        self.with_property(keys::LICENSE, license.into())
    }

    pub fn add_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn add_resources(mut self, resources: impl IntoIterator<Item = Resource>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Build the catalog. A builder without resources yields `None`.
    pub fn build(self) -> Result<ResourceCatalog> {
        let resources = if self.resources.is_empty() {
            None
        } else {
            Some(self.resources)
        };

        ResourceCatalog::new(self.id, Some(self.properties), resources)
    }
}
