//! Splitting of Zarr V2 array attributes into dimension names and user attributes.

use serde::{Deserialize, Serialize};

/// The attribute key xarray uses to store dimension names in Zarr V2 arrays.
pub const DIMENSION_NAMES_ATTRIBUTE: &str = "_ARRAY_DIMENSIONS";

/// Array attributes with the dimension names separated from the user attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayAttributes {
    /// User attributes, copied verbatim.
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Dimension names, if the source array had them.
    pub dimension_names: Option<Vec<String>>,
}

/// Translate raw array attributes into [`ArrayAttributes`].
///
/// If the [`DIMENSION_NAMES_ATTRIBUTE`] holds a list of strings, it is removed from the attributes and returned as the dimension names.
/// Otherwise, the attributes pass through unchanged.
#[must_use]
pub fn translate_attributes(
    mut attributes: serde_json::Map<String, serde_json::Value>,
) -> ArrayAttributes {
    let dimension_names = attributes
        .get(DIMENSION_NAMES_ATTRIBUTE)
        .and_then(|value| serde_json::from_value::<Vec<String>>(value.clone()).ok());
    if dimension_names.is_some() {
        attributes.remove(DIMENSION_NAMES_ATTRIBUTE);
    }
    ArrayAttributes {
        attributes,
        dimension_names,
    }
}
