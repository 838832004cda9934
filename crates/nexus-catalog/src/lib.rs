//! Catalog data model for equidistant time series.
//!
//! Data sources describe what they can deliver as [`ResourceCatalog`]
//! snapshots. A catalog holds [`Resource`]s, each of which owns one or more
//! [`Representation`]s (data type, sample period, aggregation kind). Every
//! representation is addressable by a resource path:
//!
//! ```text
//! /{catalog}/{resource}/{representation}[(k=v,...)][#base={representation}]
//! ```
//!
//! # Example
//!
//! ```ignore
//! use nexus_catalog::{DataType, Representation, ResourceBuilder, ResourceCatalogBuilder, SamplePeriod};
//!
//! let resource = ResourceBuilder::new("T1")
//!     .with_unit("°C")
//!     .add_representation(Representation::new(DataType::FLOAT64, SamplePeriod::from_secs(1)?))
//!     .build()?;
//!
//! let catalog = ResourceCatalogBuilder::new("/IN_MEMORY/TEST")
//!     .add_resource(resource)
//!     .build()?;
//!
//! // native lookup
//! let item = catalog.find("/IN_MEMORY/TEST/T1/1_s")?;
//!
//! // derived representation, aggregated from the 1 s base
//! let resolved = catalog.resolve("/IN_MEMORY/TEST/T1/5_min_mean")?;
//! ```

pub mod catalog;
pub mod error;
pub mod ids;
pub mod item;
pub mod merge;
pub mod path;
pub mod period;
pub mod registration;
pub mod representation;
pub mod resolver;
pub mod resource;
pub mod types;

// Re-export commonly used types at crate root
pub use catalog::{ResourceCatalog, ResourceCatalogBuilder};
pub use error::{CatalogError, Result};
pub use item::CatalogItem;
pub use merge::merge;
pub use path::ResourcePath;
pub use period::SamplePeriod;
pub use registration::{CatalogPath, CatalogRegistration};
pub use representation::{derive_id, Parameters, Representation};
pub use resolver::ResolvedItem;
pub use resource::{Properties, Resource, ResourceBuilder};
pub use types::{DataType, RepresentationKind};
