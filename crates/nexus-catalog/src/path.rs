//! Resource path grammar.
//!
//! ```text
//! /{seg}(/{seg})*/{resourceId}/{representationId}[(<k>=<v>(,<k>=<v>)*)][#base=<representationId>[(<k>=<v>(,<k>=<v>)*)]]
//! ```
//!
//! The representation token is kept opaque here and only checked for its
//! character set; matching it against derived ids happens during lookup.
//! A base representation may carry its own parameter list, which is kept in
//! canonical (sorted) form.

use std::fmt;
use std::str::FromStr;

use crate::error::{CatalogError, Result};
use crate::ids::{is_valid_identifier, is_valid_representation_token, validate_parameter_value};
use crate::representation::{render_parameters, Parameters};

const BASE_PREFIX: &str = "#base=";

/// A parsed resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub catalog_id: String,
    pub resource_id: String,
    pub representation_id: String,
    pub parameters: Option<Parameters>,
    pub base_representation_id: Option<String>,
}

impl ResourcePath {
    /// Parse a path string.
    pub fn parse(path: &str) -> Result<Self> {
        let fail = |reason: &str| CatalogError::path_syntax(path, reason);

        if path.is_empty() {
            return Err(fail("path is empty"));
        }

        let (head, base_representation_id) = match path.find('#') {
            Some(index) => {
                let suffix = &path[index..];
                let base = suffix
                    .strip_prefix(BASE_PREFIX)
                    .ok_or_else(|| fail("malformed base suffix, expected '#base='"))?;

                let (token, parameters) = split_parameter_list(base).map_err(|reason| fail(&reason))?;
                if !is_valid_representation_token(token) {
                    return Err(fail("malformed base representation id"));
                }

                let base_id = match parameters {
                    Some(parameters) => format!("{}{}", token, render_parameters(&parameters)),
                    None => token.to_string(),
                };

                (&path[..index], Some(base_id))
            }
            None => (path, None),
        };

        let (head, parameters) = split_parameter_list(head).map_err(|reason| fail(&reason))?;

        let rest = head
            .strip_prefix('/')
            .ok_or_else(|| fail("path must start with '/'"))?;

        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() < 3 {
            return Err(fail("missing resource or representation segment"));
        }

        let (catalog_segments, tail) = segments.split_at(segments.len() - 2);
        let resource_id = tail[0];
        let representation_id = tail[1];

        if let Some(segment) = catalog_segments.iter().find(|s| !is_valid_identifier(s)) {
            return Err(fail(&format!("invalid catalog segment '{}'", segment)));
        }

        if !is_valid_identifier(resource_id) {
            return Err(fail(&format!("invalid resource id '{}'", resource_id)));
        }

        if !is_valid_representation_token(representation_id) {
            return Err(fail(&format!(
                "invalid representation id '{}'",
                representation_id
            )));
        }

        Ok(Self {
            catalog_id: format!("/{}", catalog_segments.join("/")),
            resource_id: resource_id.to_string(),
            representation_id: representation_id.to_string(),
            parameters,
            base_representation_id,
        })
    }

    /// The representation token including the rendered parameters.
    pub fn representation_with_parameters(&self) -> String {
        match &self.parameters {
            Some(parameters) => format!("{}{}", self.representation_id, render_parameters(parameters)),
            None => self.representation_id.clone(),
        }
    }
}

/// Split `text(k=v,...)` into `text` and the parsed list.
fn split_parameter_list(text: &str) -> std::result::Result<(&str, Option<Parameters>), String> {
    match text.find('(') {
        Some(index) => {
            let list = text[index + 1..]
                .strip_suffix(')')
                .ok_or_else(|| "parameter list is not closed".to_string())?;

            Ok((&text[..index], Some(parse_parameters(list)?)))
        }
        None if text.contains(')') => Err("unexpected ')'".to_string()),
        None => Ok((text, None)),
    }
}

fn parse_parameters(list: &str) -> std::result::Result<Parameters, String> {
    if list.is_empty() {
        return Err("parameter list is empty".to_string());
    }

    let mut parameters = Parameters::new();

    for pair in list.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("parameter '{}' has no value", pair))?;

        if !is_valid_identifier(key) {
            return Err(format!("invalid parameter key '{}'", key));
        }

        validate_parameter_value(value).map_err(|_| format!("invalid value for parameter '{}'", key))?;

        if parameters.insert(key.to_string(), value.to_string()).is_some() {
            return Err(format!("duplicate parameter '{}'", key));
        }
    }

    Ok(parameters)
}

impl FromStr for ResourcePath {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.catalog_id,
            self.resource_id,
            self.representation_with_parameters()
        )?;

        if let Some(base) = &self.base_representation_id {
            write!(f, "{}{}", BASE_PREFIX, base)?;
        }

        Ok(())
    }
}
