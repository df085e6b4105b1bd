use std::{ops::Range, sync::Arc};

use zarrs::{
    array::{Array, ArrayBytes, ArrayMetadata, DataType, FillValue},
    group::GroupMetadata,
    node::{Node, NodeMetadata},
    storage::{ListableStorageTraits, ReadableStorageTraits},
};

use super::{window::window_subset, StoreError};

/// The description of a source array.
#[derive(Debug, Clone)]
pub struct ArrayDescriptor {
    pub shape: Vec<u64>,
    pub data_type: DataType,
    pub fill_value: FillValue,
    /// The source chunk shape.
    pub chunks: Vec<u64>,
    /// The raw array attributes, including any dimension names.
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ArrayDescriptor {
    /// The decoded size of the array in bytes, if the data type has a fixed size.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        let num_elements = self.shape.iter().product::<u64>();
        self.data_type
            .fixed_size()
            .map(|size| num_elements.saturating_mul(size as u64))
    }
}

/// A read-only hierarchy with a root group holding arrays.
pub trait SourceStore {
    /// Returns the attributes of the root group.
    fn group_attributes(&self) -> Result<serde_json::Map<String, serde_json::Value>, StoreError>;

    /// Returns the name and description of every array in the root group, ordered by name.
    fn list_arrays(&self) -> Result<Vec<(String, ArrayDescriptor)>, StoreError>;

    /// Read the elements of array `name` in `window` along the leading axis.
    fn read_window(&self, name: &str, window: Range<u64>)
        -> Result<ArrayBytes<'static>, StoreError>;
}

/// A [`SourceStore`] over a Zarr V2 hierarchy in any `zarrs` storage.
pub struct ZarrSourceStore<TStorage: ?Sized> {
    group_attributes: serde_json::Map<String, serde_json::Value>,
    arrays: Vec<(String, Array<TStorage>)>,
}

impl<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits + 'static>
    ZarrSourceStore<TStorage>
{
    /// Open the Zarr V2 hierarchy in `storage`.
    ///
    /// A `null` fill value in array metadata is read as zero.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if the root is not a Zarr V2 group, any child array is not a Zarr V2 array, or the metadata cannot be read.
    pub fn open(storage: Arc<TStorage>) -> Result<Self, StoreError> {
        let root = Node::open(&storage, "/")?;
        let group_attributes = match root.metadata() {
            NodeMetadata::Group(GroupMetadata::V2(metadata)) => metadata.attributes.clone(),
            NodeMetadata::Group(GroupMetadata::V3(_)) => {
                return Err(StoreError::Other(
                    "the root group is already Zarr V3".to_string(),
                ))
            }
            NodeMetadata::Array(_) => {
                return Err(StoreError::Other(
                    "the root node is an array, expected a group".to_string(),
                ))
            }
        };

        let mut arrays = Vec::new();
        for child in root.children() {
            let path = child.path().as_str();
            match child.metadata() {
                NodeMetadata::Array(ArrayMetadata::V2(metadata)) => {
                    let name = path.trim_start_matches('/').to_string();
                    let mut metadata = metadata.clone();
                    if serde_json::to_value(&metadata.fill_value)?.is_null() {
                        tracing::warn!("array {name} has a null fill value, using zero");
                        metadata.fill_value = serde_json::from_value(serde_json::json!(0))?;
                    }
                    let array = Array::new_with_metadata(
                        storage.clone(),
                        path,
                        ArrayMetadata::V2(metadata),
                    )?;
                    arrays.push((name, array));
                }
                NodeMetadata::Array(ArrayMetadata::V3(_)) => {
                    return Err(StoreError::Other(format!(
                        "array {path} is already Zarr V3"
                    )));
                }
                NodeMetadata::Group(_) => {
                    tracing::warn!("skipping nested group {path}");
                }
            }
        }
        arrays.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(Self {
            group_attributes,
            arrays,
        })
    }

    fn array(&self, name: &str) -> Result<&Array<TStorage>, StoreError> {
        self.arrays
            .iter()
            .find_map(|(array_name, array)| (array_name == name).then_some(array))
            .ok_or_else(|| StoreError::Other(format!("array {name} does not exist")))
    }
}

fn describe<TStorage: ?Sized>(array: &Array<TStorage>) -> Result<ArrayDescriptor, StoreError> {
    let ArrayMetadata::V2(metadata) = array.metadata() else {
        return Err(StoreError::Other(format!(
            "array {} is not Zarr V2",
            array.path().as_str()
        )));
    };
    Ok(ArrayDescriptor {
        shape: array.shape().to_vec(),
        data_type: array.data_type().clone(),
        fill_value: array.fill_value().clone(),
        chunks: metadata.chunks.iter().map(|chunk| chunk.get()).collect(),
        attributes: metadata.attributes.clone(),
    })
}

impl<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits + 'static> SourceStore
    for ZarrSourceStore<TStorage>
{
    fn group_attributes(&self) -> Result<serde_json::Map<String, serde_json::Value>, StoreError> {
        Ok(self.group_attributes.clone())
    }

    fn list_arrays(&self) -> Result<Vec<(String, ArrayDescriptor)>, StoreError> {
        self.arrays
            .iter()
            .map(|(name, array)| Ok((name.clone(), describe(array)?)))
            .collect()
    }

    fn read_window(
        &self,
        name: &str,
        window: Range<u64>,
    ) -> Result<ArrayBytes<'static>, StoreError> {
        let array = self.array(name)?;
        let subset = window_subset(array.shape(), window);
        Ok(array.retrieve_array_subset(&subset)?.into_owned())
    }
}
