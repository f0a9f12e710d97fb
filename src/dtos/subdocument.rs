//! Subdocument DTOs - validazione dei parametri delle operazioni su array annidati

use crate::core::{CrudError, Result};
use bson::{Bson, Document};
use lazy_static::lazy_static;
use regex::Regex;
use validator::{Validate, ValidationError};

/// Alias bound to each element in `list_subdocuments` predicates when the caller names none
pub const DEFAULT_ELEMENT_ALIAS: &str = "item";

lazy_static! {
    // dotted field path: no empty segments, no operator segments
    static ref FIELD_PATH: Regex =
        Regex::new(r"^[^.$ \t\r\n][^. \t\r\n]*(\.[^.$ \t\r\n][^. \t\r\n]*)*$").expect("field path pattern");
    // aggregation variable names start with a lowercase letter
    static ref ELEMENT_ALIAS: Regex =
        Regex::new(r"^[a-z][A-Za-z0-9_]*$").expect("element alias pattern");
}

fn validate_field_path(path: &str) -> std::result::Result<(), ValidationError> {
    if FIELD_PATH.is_match(path) {
        Ok(())
    } else {
        let mut err = ValidationError::new("field_path");
        err.message = Some("array field must be a non-empty dotted path without operators".into());
        Err(err)
    }
}

fn validate_element_alias(alias: &str) -> std::result::Result<(), ValidationError> {
    if ELEMENT_ALIAS.is_match(alias) {
        Ok(())
    } else {
        let mut err = ValidationError::new("element_alias");
        err.message = Some("element alias must start with a lowercase letter".into());
        Err(err)
    }
}

/// The array field a subdocument operation works on
#[derive(Debug, Clone, Validate)]
pub struct SubdocumentTarget {
    #[validate(custom(function = "validate_field_path"))]
    pub array_field: String,

    #[validate(custom(function = "validate_element_alias"))]
    pub alias: Option<String>,
}

impl SubdocumentTarget {
    /// Validates `array_field` (and the optional alias) before any I/O
    pub fn parse(array_field: &str, alias: Option<&str>) -> Result<Self> {
        let target = Self {
            array_field: array_field.to_string(),
            alias: alias.map(str::to_string),
        };
        target.validate()?;
        Ok(target)
    }

    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(DEFAULT_ELEMENT_ALIAS)
    }

    /// Arguments of `get_subdocument`
    ///
    /// # Returns
    /// * `Err(CrudError::InvalidArgument)` - Bad path or empty element query
    pub fn for_query(array_field: &str, element_query: &Document) -> Result<Self> {
        let target = Self::parse(array_field, None)?;
        require_element_query(element_query)?;
        Ok(target)
    }

    /// Arguments of `add_subdocument`
    pub fn for_add(array_field: &str, value: &Bson) -> Result<Self> {
        let target = Self::parse(array_field, None)?;
        require_value(value)?;
        Ok(target)
    }

    /// Arguments of `patch_subdocument`: a non-empty element query and at least one field
    pub fn for_patch(array_field: &str, element_query: &Document, fields: &Document) -> Result<Self> {
        let target = Self::for_query(array_field, element_query)?;
        if fields.is_empty() {
            return Err(CrudError::invalid_argument("fields to patch are required"));
        }
        Ok(target)
    }

    /// Arguments of `remove_subdocument`: a value, or a non-empty predicate document
    pub fn for_remove(array_field: &str, element: &Bson) -> Result<Self> {
        let target = Self::parse(array_field, None)?;
        require_value(element)?;
        if matches!(element, Bson::Document(predicate) if predicate.is_empty()) {
            return Err(CrudError::invalid_argument("element predicate must not be empty"));
        }
        Ok(target)
    }
}

/// Rejects missing values (`null` / undefined) handed to `add_subdocument`
pub fn require_value(value: &Bson) -> Result<()> {
    match value {
        Bson::Null | Bson::Undefined => Err(CrudError::invalid_argument("value is required")),
        _ => Ok(()),
    }
}

fn require_element_query(element_query: &Document) -> Result<()> {
    if element_query.is_empty() {
        return Err(CrudError::invalid_argument("element query is required"));
    }
    Ok(())
}
