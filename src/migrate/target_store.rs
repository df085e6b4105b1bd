use std::{ops::Range, sync::Arc};

use zarrs::{
    array::{
        chunk_grid::RegularChunkGrid, codec::array_to_bytes::sharding::ShardingCodecBuilder, Array,
        ArrayBuilder, ArrayBytes, ArrayMetadataOptions, ChunkGrid, ChunkShape, DataType,
        FillValue,
    },
    group::{Group, GroupBuilder},
    metadata_ext::group::consolidated_metadata::ConsolidatedMetadata,
    node::{node_exists, Node, NodePath},
    storage::{
        ListableStorageTraits, ReadableStorageTraits, ReadableWritableListableStorageTraits,
        StorePrefix, WritableStorageTraits,
    },
};

use crate::{attributes::ArrayAttributes, geometry::TargetGeometry};

use super::{window::window_subset, StoreError};

/// Everything needed to create a target array.
#[derive(Debug, Clone)]
pub struct TargetArraySpec {
    pub shape: Vec<u64>,
    pub data_type: DataType,
    pub fill_value: FillValue,
    pub geometry: TargetGeometry,
    pub attributes: ArrayAttributes,
}

/// A write-only Zarr V3 hierarchy with a root group holding arrays.
pub trait TargetStore {
    /// A created array.
    type ArrayHandle: Send + Sync;

    /// Create the root group with `attributes`.
    fn create_group(
        &self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError>;

    /// Create (or overwrite) array `name` in the root group.
    fn create_array(
        &self,
        name: &str,
        spec: &TargetArraySpec,
    ) -> Result<Self::ArrayHandle, StoreError>;

    /// Write the elements of `window` along the leading axis of `array`.
    fn write_window(
        &self,
        array: &Self::ArrayHandle,
        window: Range<u64>,
        bytes: ArrayBytes<'_>,
    ) -> Result<(), StoreError>;

    /// Reopen array `name` from its stored metadata and return its shape and data type.
    fn reopen_array(&self, name: &str) -> Result<(Vec<u64>, DataType), StoreError>;

    /// Write the consolidated metadata of every array in the root group to the root group metadata.
    ///
    /// This must be the last write to the store. Returns the consolidated metadata.
    fn consolidate_metadata(&self) -> Result<ConsolidatedMetadata, StoreError>;
}

/// A [`TargetStore`] writing sharded Zarr V3 arrays to any `zarrs` storage.
pub struct ZarrTargetStore<TStorage: ?Sized> {
    storage: Arc<TStorage>,
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits + 'static> ZarrTargetStore<TStorage> {
    /// Create a target store in `storage`, erasing any existing content.
    ///
    /// # Errors
    /// Returns a [`StoreError`] if the existing content cannot be erased.
    pub fn create(storage: Arc<TStorage>) -> Result<Self, StoreError> {
        storage.erase_prefix(&StorePrefix::root())?;
        Ok(Self { storage })
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }
}

fn nonzero_chunk_shape(shape: &[u64]) -> Result<ChunkShape, StoreError> {
    shape
        .to_vec()
        .try_into()
        .map_err(|_| StoreError::Other(format!("chunk shape {shape:?} has a zero extent")))
}

fn get_array_builder(spec: &TargetArraySpec) -> Result<ArrayBuilder, StoreError> {
    let geometry = spec.geometry.encodable();
    let block_shape = geometry.shards.as_ref().unwrap_or(&geometry.chunks);
    let chunk_grid = ChunkGrid::new(RegularChunkGrid::new(nonzero_chunk_shape(block_shape)?));

    let mut array_builder = ArrayBuilder::new(
        spec.shape.clone(),
        spec.data_type.clone(),
        chunk_grid,
        spec.fill_value.clone(),
    );
    array_builder.attributes(spec.attributes.attributes.clone());
    array_builder.dimension_names(spec.attributes.dimension_names.clone());
    if geometry.shards.is_some() {
        // Inner chunks are uncompressed and the shard index is checksummed
        let sharding_codec =
            ShardingCodecBuilder::new(nonzero_chunk_shape(&geometry.chunks)?).build();
        array_builder.array_to_bytes_codec(Arc::new(sharding_codec));
    }
    Ok(array_builder)
}

/// Read the consolidated metadata of the root group in `storage`.
///
/// Returns [`None`] if the root group does not exist or has no consolidated metadata.
///
/// # Errors
/// Returns a [`StoreError`] if the root group metadata cannot be read.
pub fn read_consolidated_metadata<
    TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits + 'static,
>(
    storage: &Arc<TStorage>,
) -> Result<Option<ConsolidatedMetadata>, StoreError> {
    if !node_exists(storage, &NodePath::root())? {
        return Ok(None);
    }
    let group = Group::open(storage.clone(), "/")?;
    Ok(group.consolidated_metadata())
}

impl<TStorage: ?Sized + ReadableWritableListableStorageTraits + 'static> TargetStore
    for ZarrTargetStore<TStorage>
{
    type ArrayHandle = Array<TStorage>;

    fn create_group(
        &self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StoreError> {
        let group = GroupBuilder::new()
            .attributes(attributes)
            .build(self.storage.clone(), "/")?;
        group.store_metadata()?;
        Ok(())
    }

    fn create_array(
        &self,
        name: &str,
        spec: &TargetArraySpec,
    ) -> Result<Array<TStorage>, StoreError> {
        self.storage
            .erase_prefix(&StorePrefix::new(format!("{name}/"))?)?;
        let array = get_array_builder(spec)?.build(self.storage.clone(), &format!("/{name}"))?;
        array.store_metadata_opt(
            &ArrayMetadataOptions::default().with_include_zarrs_metadata(false),
        )?;
        Ok(array)
    }

    fn write_window(
        &self,
        array: &Array<TStorage>,
        window: Range<u64>,
        bytes: ArrayBytes<'_>,
    ) -> Result<(), StoreError> {
        let subset = window_subset(array.shape(), window);
        array.store_array_subset(&subset, bytes)?;
        Ok(())
    }

    fn reopen_array(&self, name: &str) -> Result<(Vec<u64>, DataType), StoreError> {
        let array = Array::open(self.storage.clone(), &format!("/{name}"))?;
        Ok((array.shape().to_vec(), array.data_type().clone()))
    }

    fn consolidate_metadata(&self) -> Result<ConsolidatedMetadata, StoreError> {
        let metadata = Node::open(&self.storage, "/")?
            .consolidate_metadata()
            .ok_or_else(|| StoreError::Other("the root node is not a group".to_string()))?;
        let consolidated_metadata = ConsolidatedMetadata {
            metadata,
            ..Default::default()
        };
        let mut group = Group::open(self.storage.clone(), "/")?;
        group.set_consolidated_metadata(Some(consolidated_metadata.clone()));
        group.store_metadata()?;
        Ok(consolidated_metadata)
    }
}
