//! Mapping of catalog ids to the data sources serving them.

use std::collections::BTreeMap;
use std::sync::Arc;

use nexus_catalog::ids::is_valid_catalog_id;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::source::DataSource;

/// Finds the data source responsible for a catalog.
pub trait DataSourceResolver: Send + Sync {
    fn resolve(&self, catalog_id: &str) -> Option<Arc<dyn DataSource>>;
}

/// Data sources registered under catalog id prefixes.
///
/// A source registered under `/A` serves `/A` and every catalog below it
/// (`/A/B`), but not `/AB`. The longest matching prefix wins; `/` matches
/// everything.
#[derive(Default, Clone)]
pub struct DataSourceRegistry {
    sources: BTreeMap<String, Arc<dyn DataSource>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` for `prefix`, replacing any earlier registration.
    pub fn register(&mut self, prefix: impl Into<String>, source: Arc<dyn DataSource>) -> Result<()> {
        let prefix = prefix.into();

        if prefix != "/" && !is_valid_catalog_id(&prefix) {
            return Err(PipelineError::config(format!(
                "'{}' is not a valid catalog prefix",
                prefix
            )));
        }

        info!(prefix = %prefix, "Registered data source");
        self.sources.insert(prefix, source);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Registered prefixes in lexical order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

impl DataSourceResolver for DataSourceRegistry {
    fn resolve(&self, catalog_id: &str) -> Option<Arc<dyn DataSource>> {
        self.sources
            .iter()
            .filter(|(prefix, _)| prefix_matches(prefix, catalog_id))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, source)| Arc::clone(source))
    }
}

fn prefix_matches(prefix: &str, catalog_id: &str) -> bool {
    if prefix == "/" {
        return true;
    }

    match catalog_id.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
