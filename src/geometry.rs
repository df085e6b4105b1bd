//! Target chunk and shard geometry planning.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arrays with a dimensionality below this are never sharded.
pub const MIN_SHARDED_DIMENSIONALITY: usize = 3;

/// The chunk shape of an array does not match its dimensionality.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chunk shape {chunks:?} has {} dimensions but array shape {shape:?} has {}", .chunks.len(), .shape.len())]
pub struct ShapeMismatchError {
    /// The array shape.
    pub shape: Vec<u64>,
    /// The offending chunk shape.
    pub chunks: Vec<u64>,
}

/// The chunk and (optional) shard shape of a migrated array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGeometry {
    /// The chunk shape. Only the leading axis keeps the source chunking.
    pub chunks: Vec<u64>,
    /// The shard shape, present iff the array has at least [`MIN_SHARDED_DIMENSIONALITY`] dimensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shards: Option<Vec<u64>>,
}

impl TargetGeometry {
    /// Returns true if the geometry groups chunks into shards.
    #[must_use]
    pub fn is_sharded(&self) -> bool {
        self.shards.is_some()
    }

    /// The geometry that can actually be encoded in a Zarr V3 array.
    ///
    /// Chunk extents must be non-zero and shard extents must be a multiple of the chunk extent.
    /// Zero extents (from zero-sized arrays) are set to 1 and shard extents are rounded up to the next multiple of the chunk extent.
    /// A geometry that is already encodable is returned unchanged.
    #[must_use]
    pub fn encodable(&self) -> Self {
        let chunks: Vec<u64> = self.chunks.iter().map(|&c| c.max(1)).collect();
        let shards = self.shards.as_ref().map(|shards| {
            std::iter::zip(shards, &chunks)
                .map(|(&s, &c)| s.max(c).next_multiple_of(c))
                .collect()
        });
        Self { chunks, shards }
    }
}

/// Plan the target geometry of an array with `shape` and source chunk shape `source_chunks`.
///
/// Every non-leading axis is chunked at its full extent, while the leading axis keeps the source chunk extent.
/// Arrays with at least [`MIN_SHARDED_DIMENSIONALITY`] dimensions are additionally sharded along the leading axis only,
/// with `shards_factor` chunks per shard (clipped to the array extent).
///
/// # Errors
/// Returns a [`ShapeMismatchError`] if `source_chunks` and `shape` have a different length.
pub fn plan_geometry(
    shape: &[u64],
    source_chunks: &[u64],
    shards_factor: NonZeroU64,
) -> Result<TargetGeometry, ShapeMismatchError> {
    if source_chunks.len() != shape.len() {
        return Err(ShapeMismatchError {
            shape: shape.to_vec(),
            chunks: source_chunks.to_vec(),
        });
    }

    let mut chunks = source_chunks.to_vec();
    for (chunk, &extent) in chunks.iter_mut().zip(shape).skip(1) {
        *chunk = extent;
    }

    if shape.len() < MIN_SHARDED_DIMENSIONALITY {
        return Ok(TargetGeometry {
            chunks,
            shards: None,
        });
    }

    let mut shards = chunks.clone();
    shards[0] = std::cmp::min(shape[0], chunks[0].saturating_mul(shards_factor.get()));
    Ok(TargetGeometry {
        chunks,
        shards: Some(shards),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(f: u64) -> NonZeroU64 {
        NonZeroU64::new(f).unwrap()
    }

    #[test]
    fn plan_time_series() {
        let geometry = plan_geometry(&[1000, 721, 1440], &[1, 721, 1440], factor(10)).unwrap();
        assert_eq!(geometry.chunks, vec![1, 721, 1440]);
        assert_eq!(geometry.shards, Some(vec![10, 721, 1440]));
        assert_eq!(geometry.encodable(), geometry);
    }

    #[test]
    fn plan_forces_full_extent_on_non_leading_axes() {
        let geometry = plan_geometry(&[100, 13, 721, 1440], &[4, 1, 100, 100], factor(3)).unwrap();
        assert_eq!(geometry.chunks, vec![4, 13, 721, 1440]);
        assert_eq!(geometry.shards, Some(vec![12, 13, 721, 1440]));
    }

    #[test]
    fn plan_shard_clipped_to_leading_extent() {
        let geometry = plan_geometry(&[7, 2, 3], &[2, 1, 1], factor(10)).unwrap();
        assert_eq!(geometry.chunks, vec![2, 2, 3]);
        assert_eq!(geometry.shards, Some(vec![7, 2, 3]));
    }

    #[test]
    fn plan_shard_properties() {
        for (shape, chunks, f) in [
            (vec![50u64, 4, 5], vec![3u64, 2, 2], 4u64),
            (vec![1, 1, 1, 1], vec![1, 1, 1, 1], 1),
            (vec![9, 8, 7, 6, 5], vec![9, 1, 1, 1, 1], 100),
        ] {
            let geometry = plan_geometry(&shape, &chunks, factor(f)).unwrap();
            let shards = geometry.shards.unwrap();
            assert_eq!(shards[0], std::cmp::min(shape[0], geometry.chunks[0] * f));
            assert_eq!(geometry.chunks[0], chunks[0]);
            for axis in 1..shape.len() {
                assert_eq!(shards[axis], shape[axis]);
                assert_eq!(geometry.chunks[axis], shape[axis]);
            }
        }
    }

    #[test]
    fn plan_rank_one_is_unsharded() {
        let geometry = plan_geometry(&[500], &[100], factor(10)).unwrap();
        assert_eq!(geometry.chunks, vec![100]);
        assert!(geometry.shards.is_none());
        assert!(!geometry.is_sharded());
    }

    #[test]
    fn plan_rank_two_is_unsharded() {
        let geometry = plan_geometry(&[500, 40], &[100, 10], factor(10)).unwrap();
        assert_eq!(geometry.chunks, vec![100, 40]);
        assert!(geometry.shards.is_none());
    }

    #[test]
    fn plan_scalar() {
        let geometry = plan_geometry(&[], &[], factor(10)).unwrap();
        assert!(geometry.chunks.is_empty());
        assert!(geometry.shards.is_none());
    }

    #[test]
    fn plan_shape_mismatch() {
        let err = plan_geometry(&[10, 10, 10], &[1, 10], factor(10)).unwrap_err();
        assert_eq!(err.shape, vec![10, 10, 10]);
        assert_eq!(err.chunks, vec![1, 10]);
        assert!(err.to_string().contains("has 2 dimensions"));
    }

    #[test]
    fn plan_zero_leading_extent() {
        let geometry = plan_geometry(&[0, 4, 4], &[5, 2, 2], factor(10)).unwrap();
        assert_eq!(geometry.chunks, vec![5, 4, 4]);
        assert_eq!(geometry.shards, Some(vec![0, 4, 4]));
        let encodable = geometry.encodable();
        assert_eq!(encodable.chunks, vec![5, 4, 4]);
        assert_eq!(encodable.shards, Some(vec![5, 4, 4]));
    }

    #[test]
    fn encodable_rounds_shard_to_chunk_multiple() {
        let geometry = plan_geometry(&[15, 2, 2], &[10, 2, 2], factor(10)).unwrap();
        assert_eq!(geometry.shards, Some(vec![15, 2, 2]));
        assert_eq!(geometry.encodable().shards, Some(vec![20, 2, 2]));
    }

    #[test]
    fn encodable_zero_non_leading_extent() {
        let geometry = plan_geometry(&[3, 0], &[1, 1], factor(10)).unwrap();
        assert_eq!(geometry.chunks, vec![1, 0]);
        assert_eq!(geometry.encodable().chunks, vec![1, 1]);
    }
}
