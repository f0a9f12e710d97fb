//! Update DTOs - specifica di una modifica (patch o documento di operatori)

use crate::core::{CrudError, Result};
use bson::{Bson, Document, doc};

/// What a caller asks to change on a matched record
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateSpec {
    /// Plain field assignments (patch). Fields set to `Bson::Undefined` are
    /// omitted rather than nulled out.
    Assign(Document),

    /// Arbitrary operator document (`$set`, `$unset`, `$push`, ...), passed
    /// through as-is apart from the timestamp merge.
    Operators(Document),
}

impl UpdateSpec {
    /// Builds the operator document sent to the driver, with `updated_field`
    /// stamped to `now` inside `$set`
    ///
    /// # Returns
    /// * `Ok(Document)` - Operator document; every caller operator is preserved
    /// * `Err(CrudError::InvalidArgument)` - Operator names in a patch, plain
    ///   fields in an operator document, or a `$set` that is not a document
    pub fn into_update(self, updated_field: &str, now: bson::DateTime) -> Result<Document> {
        match self {
            UpdateSpec::Assign(fields) => {
                let mut set = Document::new();
                for (key, value) in fields {
                    if key.starts_with('$') {
                        return Err(CrudError::invalid_argument(format!(
                            "patch fields must not be operators, found '{key}'"
                        )));
                    }
                    if matches!(value, Bson::Undefined) {
                        continue;
                    }
                    set.insert(key, value);
                }
                set.insert(updated_field, now);
                Ok(doc! { "$set": set })
            }
            UpdateSpec::Operators(mut operators) => {
                if let Some(key) = operators.keys().find(|k| !k.starts_with('$')) {
                    return Err(CrudError::invalid_argument(format!(
                        "update must contain only operators, found field '{key}' (use patch to assign fields)"
                    )));
                }
                match operators.get_mut("$set") {
                    Some(Bson::Document(set)) => {
                        set.insert(updated_field, now);
                    }
                    Some(_) => return Err(CrudError::invalid_argument("$set must be a document")),
                    None => {
                        let mut set = Document::new();
                        set.insert(updated_field, now);
                        operators.insert("$set", set);
                    }
                }
                Ok(operators)
            }
        }
    }
}
