//! Fully resolved catalog items.

use std::fmt;

use crate::catalog::ResourceCatalog;
use crate::representation::{render_parameters, Parameters, Representation};
use crate::resource::Resource;

/// One addressable unit: a catalog and resource (both stripped of their
/// children), one representation and an optional parameter binding.
///
/// Items are built per request and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub catalog: ResourceCatalog,
    pub resource: Resource,
    pub representation: Representation,
    pub parameters: Option<Parameters>,
    /// The native representation a derived item is computed from.
    pub base_representation: Option<Representation>,
}

impl CatalogItem {
    /// Create an item, stripping the catalog's resources and the resource's
    /// representations.
    pub fn new(
        catalog: &ResourceCatalog,
        resource: &Resource,
        representation: Representation,
        parameters: Option<Parameters>,
        base_representation: Option<Representation>,
    ) -> Self {
        Self {
            catalog: catalog.without_resources(),
            resource: resource.without_representations(),
            representation,
            parameters: parameters.filter(|p| !p.is_empty()),
            base_representation,
        }
    }

    /// The canonical path of this item.
    pub fn to_path(&self) -> String {
        let mut path = format!(
            "{}/{}/{}",
            self.catalog.id(),
            self.resource.id(),
            self.representation.id()
        );

        if let Some(parameters) = &self.parameters {
            path.push_str(&render_parameters(parameters));
        }

        if let Some(base) = &self.base_representation {
            path.push_str("#base=");
            path.push_str(&base.id());
        }

        path
    }

    /// The same item addressed through its base representation, if derived.
    pub fn base_item(&self) -> Option<CatalogItem> {
        self.base_representation.as_ref().map(|base| CatalogItem {
            catalog: self.catalog.clone(),
            resource: self.resource.clone(),
            representation: base.clone(),
            parameters: self.parameters.clone(),
            base_representation: None,
        })
    }
}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}
