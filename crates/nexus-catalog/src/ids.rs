//! Identifier grammars for catalogs, resources and parameter keys.
//!
//! A resource identifier is a single segment matching `[A-Za-z_][A-Za-z0-9_]*`.
//! A catalog identifier is an absolute path of one or more such segments
//! (`/a`, `/a_1/b`), without a trailing slash. The bare root `/` is reserved
//! for catalog registrations and is not a valid catalog identifier.

use crate::error::{CatalogError, Result};

/// Check a single identifier segment.
pub fn is_valid_identifier(value: &str) -> bool {
    let mut chars = value.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Check an absolute catalog identifier.
pub fn is_valid_catalog_id(value: &str) -> bool {
    match value.strip_prefix('/') {
        Some(rest) => rest.split('/').all(is_valid_identifier),
        None => false,
    }
}

/// Validate a catalog identifier.
pub fn validate_catalog_id(value: &str) -> Result<()> {
    if is_valid_catalog_id(value) {
        Ok(())
    } else {
        Err(CatalogError::validation(format!(
            "the catalog identifier '{}' is not valid",
            value
        )))
    }
}

/// Validate a resource identifier.
pub fn validate_resource_id(value: &str) -> Result<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(CatalogError::validation(format!(
            "the resource identifier '{}' is not valid",
            value
        )))
    }
}

/// Validate a representation parameter key.
///
/// Parameter keys follow the resource identifier grammar.
pub fn validate_parameter_key(value: &str) -> Result<()> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(CatalogError::validation(format!(
            "the representation parameter key '{}' is not valid",
            value
        )))
    }
}

/// Validate a representation parameter value.
///
/// Values are free text except for the characters that delimit the
/// parameter list in a resource path.
pub fn validate_parameter_value(value: &str) -> Result<()> {
    let delimiter = value
        .chars()
        .any(|c| matches!(c, ',' | '=' | '(' | ')' | '#') || c.is_whitespace());

    if value.is_empty() || delimiter {
        Err(CatalogError::validation(format!(
            "the representation parameter value '{}' is not valid",
            value
        )))
    } else {
        Ok(())
    }
}

/// Check a representation id token as it appears in a resource path.
pub fn is_valid_representation_token(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sanitize an arbitrary name into a valid resource identifier.
///
/// Invalid characters become `_`; an invalid leading character is
/// prefixed with `_`. Useful for backends that derive ids from channel names.
pub fn to_resource_id(name: &str) -> String {
    let mut id: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    let needs_prefix = id
        .chars()
        .next()
        .map(|c| !(c.is_ascii_alphabetic() || c == '_'))
        .unwrap_or(true);

    if needs_prefix {
        id.insert(0, '_');
    }

    id
}
