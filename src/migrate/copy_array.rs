use std::time::Duration;

use zarrs::array::DataType;

use crate::{
    attributes::translate_attributes,
    geometry::{plan_geometry, TargetGeometry},
    progress::{Progress, ProgressCallback},
};

use super::{
    window::windows, ArrayDescriptor, MigrateError, MigrateOptions, SourceStore, TargetArraySpec,
    TargetStore,
};

/// A summary of a copied array.
#[derive(Debug, Clone)]
pub struct ArrayReport {
    pub name: String,
    pub shape: Vec<u64>,
    pub data_type: DataType,
    /// The planned geometry.
    pub geometry: TargetGeometry,
    pub dimension_names: Option<Vec<String>>,
    pub num_windows: usize,
    /// The number of decoded bytes copied.
    pub bytes: usize,
    pub duration_read: Duration,
    pub duration_write: Duration,
}

/// Copy array `name` described by `descriptor` from `source` to `target`.
///
/// The target array is created once, then the array is copied window by window along the leading axis.
/// Each window is written before the next is read, so at most one window is held in memory.
/// A scalar array is copied as a single window.
///
/// # Errors
/// Returns a [`MigrateError`] if
///  - the source chunk shape does not match the array dimensionality,
///  - the target array cannot be created or written, or
///  - a window cannot be read from the source.
pub fn copy_array<TSource, TTarget>(
    source: &TSource,
    target: &TTarget,
    name: &str,
    descriptor: &ArrayDescriptor,
    options: &MigrateOptions,
    progress_callback: &ProgressCallback,
) -> Result<ArrayReport, MigrateError>
where
    TSource: SourceStore + ?Sized,
    TTarget: TargetStore + ?Sized,
{
    let geometry = plan_geometry(&descriptor.shape, &descriptor.chunks, options.shards_factor)
        .map_err(|source| MigrateError::ShapeMismatch {
            name: name.to_string(),
            source,
        })?;
    let spec = TargetArraySpec {
        shape: descriptor.shape.clone(),
        data_type: descriptor.data_type.clone(),
        fill_value: descriptor.fill_value.clone(),
        geometry: geometry.clone(),
        attributes: translate_attributes(descriptor.attributes.clone()),
    };
    let array = target
        .create_array(name, &spec)
        .map_err(MigrateError::target_write(format!("array {name}")))?;
    tracing::debug!(
        array = name,
        chunks = ?geometry.chunks,
        shards = ?geometry.shards,
        dimension_names = ?spec.attributes.dimension_names,
        "created target array"
    );

    let extent = descriptor.shape.first().copied().unwrap_or(1);
    let num_windows = extent.div_ceil(options.window_size.get());
    let progress = Progress::new(
        name,
        usize::try_from(num_windows).unwrap_or(usize::MAX),
        progress_callback,
    );
    for window in windows(extent, options.window_size) {
        let bytes = progress
            .read(|| source.read_window(name, window.clone()))
            .map_err(MigrateError::source_read(format!(
                "array {name} window {window:?}"
            )))?;
        let size = bytes.size();
        progress
            .write(|| target.write_window(&array, window.clone(), bytes))
            .map_err(MigrateError::target_write(format!(
                "array {name} window {window:?}"
            )))?;
        tracing::trace!(array = name, ?window, bytes = size, "copied window");
        progress.next(window, size);
    }
    let stats = progress.finish();
    tracing::info!(
        array = name,
        windows = stats.step,
        bytes = stats.bytes,
        read = ?stats.read,
        write = ?stats.write,
        "copied array"
    );

    Ok(ArrayReport {
        name: name.to_string(),
        shape: spec.shape,
        data_type: spec.data_type,
        geometry,
        dimension_names: spec.attributes.dimension_names,
        num_windows: stats.step,
        bytes: stats.bytes,
        duration_read: stats.read,
        duration_write: stats.write,
    })
}
