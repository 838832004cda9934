//! Resources and their builder.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::ids::validate_resource_id;
use crate::representation::Representation;

/// Free-form structured properties attached to catalogs and resources.
pub type Properties = BTreeMap<String, Value>;

/// Reserved resource property keys.
pub mod keys {
    pub const DESCRIPTION: &str = "description";
    pub const WARNING: &str = "warning";
    pub const UNIT: &str = "unit";
    pub const GROUPS: &str = "groups";
}

/// A named time series within a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawResource")]
pub struct Resource {
    id: String,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    representations: Option<Vec<Representation>>,
}

impl Resource {
    /// Create a resource, validating the id and the uniqueness of the
    /// representations' derived ids.
    pub fn new(
        id: impl Into<String>,
        properties: Option<Properties>,
        representations: Option<Vec<Representation>>,
    ) -> Result<Self> {
        let id = id.into();
        validate_resource_id(&id)?;

        if let Some(representations) = &representations {
            ensure_unique_representations(&id, representations)?;
        }

        Ok(Self {
            id,
            properties: properties.unwrap_or_default(),
            representations,
        })
    }

    pub(crate) fn from_parts_unchecked(
        id: String,
        properties: Properties,
        representations: Option<Vec<Representation>>,
    ) -> Self {
        Self {
            id,
            properties,
            representations,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn representations(&self) -> Option<&[Representation]> {
        self.representations.as_deref()
    }

    /// Look up a representation by its derived id.
    pub fn representation(&self, id: &str) -> Option<&Representation> {
        self.representations
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|representation| representation.id() == id)
    }

    /// The `unit` property, if it is a string.
    pub fn unit(&self) -> Option<&str> {
        self.properties.get(keys::UNIT).and_then(Value::as_str)
    }

    /// The `description` property, if it is a string.
    pub fn description(&self) -> Option<&str> {
        self.properties.get(keys::DESCRIPTION).and_then(Value::as_str)
    }

    /// A copy of this resource without its representations.
    pub fn without_representations(&self) -> Self {
        Self {
            id: self.id.clone(),
            properties: self.properties.clone(),
            representations: None,
        }
    }
}

fn ensure_unique_representations(resource_id: &str, representations: &[Representation]) -> Result<()> {
    let mut seen = HashSet::new();

    for representation in representations {
        let id = representation.id();
        if !seen.insert(id.clone()) {
            return Err(CatalogError::validation(format!(
                "the representation id '{}' occurs more than once on resource '{}'",
                id, resource_id
            )));
        }
    }

    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResource {
    id: String,
    #[serde(default)]
    properties: Option<Properties>,
    #[serde(default)]
    representations: Option<Vec<Representation>>,
}

impl TryFrom<RawResource> for Resource {
    type Error = CatalogError;

    fn try_from(raw: RawResource) -> Result<Self> {
        Resource::new(raw.id, raw.properties, raw.representations)
    }
}

/// Builder for [`Resource`].
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    id: String,
    properties: Properties,
    representations: Vec<Representation>,
}

impl ResourceBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: Properties::new(),
            representations: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_unit(self, unit: impl Into<String>) -> Self {
        self.with_property(keys::UNIT, unit.into())
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.with_property(keys::DESCRIPTION, description.into())
    }

    pub fn with_warning(self, warning: impl Into<String>) -> Self {
        self.with_property(keys::WARNING, warning.into())
    }

    pub fn with_groups<I, S>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups: Vec<Value> = groups.into_iter().map(|g| Value::String(g.into())).collect();
        self.with_property(keys::GROUPS, Value::Array(groups))
    }

    pub fn add_representation(mut self, representation: Representation) -> Self {
        self.representations.push(representation);
        self
    }

    pub fn add_representations(mut self, representations: impl IntoIterator<Item = Representation>) -> Self {
        self.representations.extend(representations);
        self
    }

    /// Build the resource. A builder without representations yields `None`.
    pub fn build(self) -> Result<Resource> {
        let representations = if self.representations.is_empty() {
            None
        } else {
            Some(self.representations)
        };

        Resource::new(self.id, Some(self.properties), representations)
    }
}
