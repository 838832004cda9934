//! Representations: one concrete encoding of a resource's samples.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::ids::{validate_parameter_key, validate_parameter_value};
use crate::period::SamplePeriod;
use crate::types::{DataType, RepresentationKind};

/// Parameters refining a representation, kept sorted by key.
pub type Parameters = BTreeMap<String, String>;

/// A representation of a resource.
///
/// The identifier is derived from the sample period, the kind and the
/// parameters; two representations are equal iff all four fields are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRepresentation")]
pub struct Representation {
    data_type: DataType,
    sample_period: SamplePeriod,
    kind: RepresentationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Parameters>,
}

impl Representation {
    /// Create an original representation without parameters.
    pub fn new(data_type: DataType, sample_period: SamplePeriod) -> Self {
        Self {
            data_type,
            sample_period,
            kind: RepresentationKind::Original,
            parameters: None,
        }
    }

    /// Create a representation with every field given explicitly.
    ///
    /// An empty parameter map is stored as `None`.
    pub fn with_details(
        data_type: DataType,
        sample_period: SamplePeriod,
        kind: RepresentationKind,
        parameters: Option<Parameters>,
    ) -> Result<Self> {
        let parameters = parameters.filter(|p| !p.is_empty());

        if let Some(parameters) = &parameters {
            validate_parameters(parameters)?;
        }

        Ok(Self {
            data_type,
            sample_period,
            kind,
            parameters,
        })
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn sample_period(&self) -> SamplePeriod {
        self.sample_period
    }

    pub fn kind(&self) -> RepresentationKind {
        self.kind
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    /// Bytes per element.
    pub fn element_size(&self) -> usize {
        self.data_type.byte_width()
    }

    /// The derived identifier, e.g. `1_s`, `10_min_mean` or `1_s(window=10)`.
    pub fn id(&self) -> String {
        derive_id(self.sample_period, self.kind, self.parameters.as_ref())
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Derive a representation identifier.
pub fn derive_id(
    sample_period: SamplePeriod,
    kind: RepresentationKind,
    parameters: Option<&Parameters>,
) -> String {
    let mut id = sample_period.to_unit_string();

    if let Some(suffix) = kind.suffix() {
        id.push('_');
        id.push_str(suffix);
    }

    if let Some(parameters) = parameters.filter(|p| !p.is_empty()) {
        id.push_str(&render_parameters(parameters));
    }

    id
}

/// Render parameters as `(k=v,...)` in key order.
pub fn render_parameters(parameters: &Parameters) -> String {
    let pairs: Vec<String> = parameters
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    format!("({})", pairs.join(","))
}

/// Split a representation token (without parameters) into period and kind.
///
/// The token must be canonical: `60_s_mean` is rejected because the same
/// period renders as `1_min_mean`.
pub fn parse_id(token: &str) -> Result<(SamplePeriod, RepresentationKind)> {
    let invalid = || {
        CatalogError::validation(format!("'{}' is not a valid representation identifier", token))
    };

    let (number, rest) = token.split_once('_').ok_or_else(invalid)?;

    for unit in ["ns", "us", "ms", "s", "min", "h", "d"] {
        let kind = if rest == unit {
            RepresentationKind::Original
        } else if let Some(suffix) = rest
            .strip_prefix(unit)
            .and_then(|tail| tail.strip_prefix('_'))
        {
            RepresentationKind::from_suffix(suffix).ok_or_else(invalid)?
        } else {
            continue;
        };

        let period_string = format!("{}_{}", number, unit);
        let period = SamplePeriod::from_unit_string(&period_string)?;

        if period.to_unit_string() != period_string {
            return Err(invalid());
        }

        return Ok((period, kind));
    }

    Err(invalid())
}

fn validate_parameters(parameters: &Parameters) -> Result<()> {
    for (key, value) in parameters {
        validate_parameter_key(key)?;
        validate_parameter_value(value)?;
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepresentation {
    data_type: DataType,
    sample_period: SamplePeriod,
    #[serde(default)]
    kind: RepresentationKind,
    #[serde(default)]
    parameters: Option<Parameters>,
}

impl TryFrom<RawRepresentation> for Representation {
    type Error = CatalogError;

    fn try_from(raw: RawRepresentation) -> Result<Self> {
        Representation::with_details(raw.data_type, raw.sample_period, raw.kind, raw.parameters)
    }
}
