//! Catalog registrations reported by data sources.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::ids::is_valid_catalog_id;

/// The path of a registered catalog: absolute (`/A/B`), relative to the
/// parent it was reported under (`B`), or the root `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogPath(String);

impl CatalogPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();

        let absolute = if path.starts_with('/') {
            path.clone()
        } else {
            format!("/{}", path)
        };

        if path != "/" && !is_valid_catalog_id(&absolute) {
            return Err(CatalogError::validation(format!(
                "the catalog path '{}' is not valid",
                path
            )));
        }

        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn is_relative(&self) -> bool {
        !self.0.starts_with('/')
    }

    /// The absolute catalog id, resolving a relative path against `parent`.
    ///
    /// `parent` is the path the registration was requested for, e.g. `/` or
    /// `/A/B/`.
    pub fn to_absolute(&self, parent: &str) -> String {
        if self.is_relative() {
            format!("{}/{}", parent.trim_end_matches('/'), self.0)
        } else {
            self.0.clone()
        }
    }
}

impl TryFrom<String> for CatalogPath {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CatalogPath> for String {
    fn from(path: CatalogPath) -> Self {
        path.0
    }
}

/// A catalog announced by a data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRegistration {
    pub path: CatalogPath,
    #[serde(default)]
    pub title: Option<String>,
    /// Reload the catalog and its children on every request.
    #[serde(default)]
    pub is_transient: bool,
    /// Where the catalog's content is served from, if elsewhere.
    #[serde(default)]
    pub link_target: Option<String>,
}

impl CatalogRegistration {
    pub fn new(path: impl Into<String>, title: Option<String>) -> Result<Self> {
        Ok(Self {
            path: CatalogPath::new(path)?,
            title,
            is_transient: false,
            link_target: None,
        })
    }

    pub fn transient(mut self) -> Self {
        self.is_transient = true;
        self
    }

    pub fn with_link_target(mut self, target: impl Into<String>) -> Self {
        self.link_target = Some(target.into());
        self
    }
}
