#![allow(dead_code)]

use serde_json::json;
use zarrs::storage::{Bytes, StoreKey, WritableStorageTraits};

fn set_json<TStorage: WritableStorageTraits + ?Sized>(
    store: &TStorage,
    key: &str,
    value: &serde_json::Value,
) {
    store
        .set(
            &StoreKey::new(key).unwrap(),
            Bytes::from(serde_json::to_vec(value).unwrap()),
        )
        .unwrap();
}

/// The value of the element at `index` in a test array.
pub fn element(index: u64) -> u32 {
    u32::try_from(index).unwrap() + 1
}

/// The elements of a test array with `num_elements` elements.
pub fn elements(num_elements: u64) -> Vec<u32> {
    (0..num_elements).map(element).collect()
}

/// Write a Zarr V2 root group with `attributes`.
pub fn write_v2_group<TStorage: WritableStorageTraits + ?Sized>(
    store: &TStorage,
    attributes: serde_json::Value,
) {
    set_json(store, ".zgroup", &json!({"zarr_format": 2}));
    set_json(store, ".zattrs", &attributes);
}

fn unravel(mut index: u64, shape: &[u64]) -> Vec<u64> {
    let mut indices = vec![0; shape.len()];
    for (i, &extent) in indices.iter_mut().zip(shape).rev() {
        *i = index % extent;
        index /= extent;
    }
    indices
}

fn ravel(indices: &[u64], shape: &[u64]) -> u64 {
    indices
        .iter()
        .zip(shape)
        .fold(0, |acc, (&i, &extent)| acc * extent + i)
}

/// Write an uncompressed little-endian `uint32` Zarr V2 array of rank 1 or more.
///
/// Element `i` (in C order) has the value [`element`]`(i)`.
pub fn write_v2_array<TStorage: WritableStorageTraits + ?Sized>(
    store: &TStorage,
    name: &str,
    shape: &[u64],
    chunks: &[u64],
    attributes: serde_json::Value,
) {
    write_v2_array_with_fill_value(store, name, shape, chunks, attributes, json!(0));
}

/// Write a test array like [`write_v2_array`] with the `fill_value` metadata.
pub fn write_v2_array_with_fill_value<TStorage: WritableStorageTraits + ?Sized>(
    store: &TStorage,
    name: &str,
    shape: &[u64],
    chunks: &[u64],
    attributes: serde_json::Value,
    fill_value: serde_json::Value,
) {
    set_json(
        store,
        &format!("{name}/.zarray"),
        &json!({
            "zarr_format": 2,
            "shape": shape,
            "chunks": chunks,
            "dtype": "<u4",
            "compressor": null,
            "fill_value": fill_value,
            "order": "C",
            "filters": null,
            "dimension_separator": ".",
        }),
    );
    set_json(store, &format!("{name}/.zattrs"), &attributes);

    let grid: Vec<u64> = std::iter::zip(shape, chunks)
        .map(|(&s, &c)| s.div_ceil(c))
        .collect();
    let num_chunks: u64 = grid.iter().product();
    let chunk_elements: u64 = chunks.iter().product();
    for chunk in 0..num_chunks {
        let chunk_indices = unravel(chunk, &grid);
        let mut bytes = Vec::with_capacity(chunk_elements as usize * 4);
        for local in 0..chunk_elements {
            let global: Vec<u64> = std::iter::zip(unravel(local, chunks), &chunk_indices)
                .zip(chunks)
                .map(|((l, &c), &extent)| c * extent + l)
                .collect();
            let value = if std::iter::zip(&global, shape).all(|(g, s)| g < s) {
                element(ravel(&global, shape))
            } else {
                0
            };
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let key = chunk_indices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        store
            .set(
                &StoreKey::new(format!("{name}/{key}")).unwrap(),
                Bytes::from(bytes),
            )
            .unwrap();
    }
}

/// Write a time series hierarchy with a 3D `t2m` array and 1D `lat`/`lon` coordinates.
pub fn write_time_series<TStorage: WritableStorageTraits + ?Sized>(store: &TStorage) {
    write_v2_group(store, json!({"title": "reanalysis", "version": 2}));
    write_v2_array(
        store,
        "t2m",
        &[25, 3, 4],
        &[2, 2, 2],
        json!({
            "_ARRAY_DIMENSIONS": ["time", "lat", "lon"],
            "units": "K",
            "long_name": "2 metre temperature",
        }),
    );
    write_v2_array(
        store,
        "lat",
        &[3],
        &[2],
        json!({"_ARRAY_DIMENSIONS": ["lat"], "units": "degrees_north"}),
    );
    write_v2_array(
        store,
        "lon",
        &[4],
        &[4],
        json!({"_ARRAY_DIMENSIONS": ["lon"]}),
    );
}
