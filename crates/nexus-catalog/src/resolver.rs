//! Resolution of representations that do not exist natively.
//!
//! A token such as `5_min_mean` that names no native representation is
//! interpreted as `{period}_{kind}` and served from a base representation:
//! - aggregations use the base with the largest period dividing the requested
//!   period, preferring original data on ties;
//! - `resampled` uses the base with the smallest period that is a multiple of
//!   the requested period.
//!
//! A `#base=` suffix overrides the inference.

use tracing::debug;

use crate::catalog::ResourceCatalog;
use crate::error::{CatalogError, Result};
use crate::item::CatalogItem;
use crate::path::ResourcePath;
use crate::period::SamplePeriod;
use crate::representation::{parse_id, Representation};
use crate::resource::Resource;
use crate::types::{DataType, RepresentationKind};

/// An item ready to be read, with the native item to read from when the
/// requested representation is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub item: CatalogItem,
    pub base: Option<CatalogItem>,
}

impl ResolvedItem {
    /// The item a data source must actually deliver.
    pub fn native_item(&self) -> &CatalogItem {
        self.base.as_ref().unwrap_or(&self.item)
    }

    pub fn is_derived(&self) -> bool {
        self.base.is_some()
    }
}

impl ResourceCatalog {
    /// Resolve a path to a native or derived item.
    pub fn resolve(&self, path: &str) -> Result<ResolvedItem> {
        let parsed = ResourcePath::parse(path)?;
        let resource = self.find_resource(&parsed)?;

        let native = resource.representation(&parsed.representation_with_parameters()).is_some()
            || resource.representation(&parsed.representation_id).is_some();

        if native {
            let item = self.find_parsed(&parsed)?;
            return Ok(ResolvedItem { item, base: None });
        }

        let not_found = || CatalogError::RepresentationNotFound {
            resource_id: resource.id().to_string(),
            representation_id: parsed.representation_with_parameters(),
        };

        let (period, kind) = parse_id(&parsed.representation_id).map_err(|_| not_found())?;
        if kind == RepresentationKind::Original {
            return Err(not_found());
        }

        let base = match &parsed.base_representation_id {
            Some(base_id) => {
                let base = resource.representation(base_id).ok_or_else(|| {
                    CatalogError::RepresentationNotFound {
                        resource_id: resource.id().to_string(),
                        representation_id: base_id.clone(),
                    }
                })?;

                check_base(&parsed.representation_id, period, kind, base)?;
                base.clone()
            }
            None => infer_base(resource, &parsed.representation_id, period, kind)?
                .ok_or_else(not_found)?,
        };

        debug!(
            path = %path,
            base = %base.id(),
            "Resolved derived representation"
        );

        let representation =
            Representation::with_details(DataType::FLOAT64, period, kind, None)?;

        let item = CatalogItem::new(
            self,
            resource,
            representation,
            parsed.parameters.clone(),
            Some(base),
        );
        let base = item.base_item();

        Ok(ResolvedItem { item, base })
    }
}

fn is_candidate(period: SamplePeriod, kind: RepresentationKind, base: &Representation) -> bool {
    if kind.is_bitwise() && !base.data_type().is_integer() {
        return false;
    }

    if kind == RepresentationKind::Resampled {
        base.kind() == RepresentationKind::Original
            && period.divides(&base.sample_period())
            && base.sample_period() > period
    } else {
        let kind_fits = base.kind() == RepresentationKind::Original
            || (base.kind() == kind && composes_over_windows(kind));
        kind_fits && base.sample_period().divides(&period)
    }
}

/// Whether reducing equal windows of already reduced values gives the same
/// result as reducing the original samples.
fn composes_over_windows(kind: RepresentationKind) -> bool {
    matches!(
        kind,
        RepresentationKind::Mean
            | RepresentationKind::Min
            | RepresentationKind::Max
            | RepresentationKind::Sum
            | RepresentationKind::Rms
            | RepresentationKind::MinBitwise
            | RepresentationKind::MaxBitwise
    )
}

fn check_base(
    representation_id: &str,
    period: SamplePeriod,
    kind: RepresentationKind,
    base: &Representation,
) -> Result<()> {
    if is_candidate(period, kind, base) {
        return Ok(());
    }

    let reason = if kind.is_bitwise() && !base.data_type().is_integer() {
        format!("bitwise aggregation requires integer data, found {}", base.data_type())
    } else if kind == RepresentationKind::Resampled {
        format!(
            "the requested period {} does not divide the base period {}",
            period,
            base.sample_period()
        )
    } else if !base.sample_period().divides(&period) {
        format!(
            "the base period {} does not divide the requested period {}",
            base.sample_period(),
            period
        )
    } else {
        format!("a '{}' representation cannot serve as base", base.kind())
    };

    Err(CatalogError::IncompatibleBase {
        representation_id: representation_id.to_string(),
        base_id: base.id(),
        reason,
    })
}

fn infer_base(
    resource: &Resource,
    representation_id: &str,
    period: SamplePeriod,
    kind: RepresentationKind,
) -> Result<Option<Representation>> {
    let candidates: Vec<&Representation> = resource
        .representations()
        .unwrap_or_default()
        .iter()
        .filter(|base| is_candidate(period, kind, base))
        .collect();

    // resampling prefers the finest coarser base, aggregation the coarsest finer one
    let best_period = if kind == RepresentationKind::Resampled {
        candidates.iter().map(|c| c.sample_period()).min()
    } else {
        candidates.iter().map(|c| c.sample_period()).max()
    };

    let Some(best_period) = best_period else {
        return Ok(None);
    };

    let at_best: Vec<&Representation> = candidates
        .into_iter()
        .filter(|c| c.sample_period() == best_period)
        .collect();

    let originals: Vec<&Representation> = at_best
        .iter()
        .copied()
        .filter(|c| c.kind() == RepresentationKind::Original)
        .collect();

    let finalists = if originals.is_empty() { at_best } else { originals };

    match finalists.as_slice() {
        [single] => Ok(Some((*single).clone())),
        many => Err(CatalogError::AmbiguousBase {
            resource_id: resource.id().to_string(),
            representation_id: representation_id.to_string(),
            candidates: many.iter().map(|c| c.id()).collect(),
        }),
    }
}
