use std::{num::NonZeroU64, ops::Range};

use zarrs::array_subset::ArraySubset;

/// Split the leading axis extent `extent` into consecutive windows of at most `window_size` elements.
///
/// The windows are non-overlapping, ordered and cover `0..extent` exactly.
/// An `extent` of zero yields no windows.
pub fn windows(extent: u64, window_size: NonZeroU64) -> impl Iterator<Item = Range<u64>> {
    let window_size = window_size.get();
    (0..extent.div_ceil(window_size)).map(move |i| {
        let start = i * window_size;
        start..std::cmp::min(start + window_size, extent)
    })
}

/// The subset of an array with `shape` covering `window` along the leading axis and the full extent of all other axes.
///
/// A scalar array has a single zero-dimensional subset, regardless of `window`.
#[must_use]
pub fn window_subset(shape: &[u64], window: Range<u64>) -> ArraySubset {
    let ranges: Vec<Range<u64>> = shape
        .iter()
        .enumerate()
        .map(|(axis, &extent)| if axis == 0 { window.clone() } else { 0..extent })
        .collect();
    ArraySubset::new_with_ranges(&ranges)
}
