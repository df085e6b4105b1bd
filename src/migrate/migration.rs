use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon_iter_concurrent_limit::iter_concurrent_limit;
use zarrs::{
    filesystem::FilesystemStore,
    metadata_ext::group::consolidated_metadata::ConsolidatedMetadata,
};

use crate::progress::{ProgressCallback, ProgressEvent};

use super::{
    copy_array, ArrayDescriptor, ArrayReport, MigrateError, MigrateOptions, SourceStore,
    StoreError, TargetStore, ZarrSourceStore, ZarrTargetStore,
};

/// The state of a migration.
///
/// A target store is only valid once it reaches [`MigrationState::Consolidated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MigrationState {
    /// The source store is open.
    Opened,
    /// The target store has been created, erasing any prior content.
    Created,
    /// The root group and its attributes have been written.
    GroupCopied,
    /// Every array has been created and copied.
    ArraysCopied,
    /// The consolidated metadata has been written.
    Consolidated,
}

/// A summary of a completed migration.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// The copied arrays, ordered by name.
    pub arrays: Vec<ArrayReport>,
    /// The consolidated metadata written to the target root group.
    pub consolidated_metadata: ConsolidatedMetadata,
    pub duration: Duration,
}

impl MigrationReport {
    /// The total number of decoded bytes copied.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.arrays.iter().map(|array| array.bytes).sum()
    }
}

fn enter(state: MigrationState, progress_callback: &ProgressCallback) {
    tracing::debug!(?state, "migration state");
    progress_callback.update(ProgressEvent::StateChanged(state));
}

/// Check that every migrated array has the shape and data type of its source.
fn check_consistency<TTarget: TargetStore + ?Sized>(
    target: &TTarget,
    reports: &[ArrayReport],
) -> Result<(), MigrateError> {
    for report in reports {
        let (shape, data_type) = target.reopen_array(&report.name).map_err(|source| {
            MigrateError::Inconsistent {
                name: report.name.clone(),
                detail: format!("cannot be reopened: {source}"),
            }
        })?;
        if shape != report.shape {
            return Err(MigrateError::Inconsistent {
                name: report.name.clone(),
                detail: format!("shape {shape:?} != source shape {:?}", report.shape),
            });
        }
        if data_type != report.data_type {
            return Err(MigrateError::Inconsistent {
                name: report.name.clone(),
                detail: format!(
                    "data type {data_type:?} != source data type {:?}",
                    report.data_type
                ),
            });
        }
    }
    Ok(())
}

/// Migrate the hierarchy in `source` to `target`.
///
/// `source` must be open and `target` freshly created.
/// The root group is copied first, then every array (up to [`MigrateOptions::concurrent_arrays`] at a time), and finally the metadata is consolidated.
///
/// # Errors
/// Returns a [`MigrateError`] on the first failure.
/// The target is then left without consolidated metadata and must be treated as invalid.
pub fn migrate<TSource, TTarget>(
    source: &TSource,
    target: &TTarget,
    options: &MigrateOptions,
    progress_callback: &ProgressCallback,
) -> Result<MigrationReport, MigrateError>
where
    TSource: SourceStore + Sync + ?Sized,
    TTarget: TargetStore + Sync + ?Sized,
{
    let start = Instant::now();

    let group_attributes = source
        .group_attributes()
        .map_err(MigrateError::source_read("the group attributes"))?;
    let arrays = source
        .list_arrays()
        .map_err(MigrateError::source_read("the array listing"))?;
    target
        .create_group(group_attributes)
        .map_err(MigrateError::target_write("the root group"))?;
    enter(MigrationState::GroupCopied, progress_callback);

    let num_arrays = arrays.len();
    tracing::info!(num_arrays, ?options, "copying arrays");
    let tasks: Vec<(usize, &(String, ArrayDescriptor))> = arrays.iter().enumerate().collect();
    let reports = iter_concurrent_limit!(
        options.concurrent_arrays.get(),
        tasks,
        map,
        |(index, (name, descriptor)): (usize, &(String, ArrayDescriptor))| {
            progress_callback.update(ProgressEvent::ArrayStarted {
                index,
                num_arrays,
                name: name.as_str(),
                shape: &descriptor.shape,
                size_bytes: descriptor.size_bytes(),
            });
            copy_array(source, target, name, descriptor, options, progress_callback)
        }
    )
    .collect::<Result<Vec<_>, _>>()?;
    enter(MigrationState::ArraysCopied, progress_callback);

    check_consistency(target, &reports)?;

    let consolidated_metadata = target
        .consolidate_metadata()
        .map_err(MigrateError::ConsolidationFailure)?;
    enter(MigrationState::Consolidated, progress_callback);

    Ok(MigrationReport {
        arrays: reports,
        consolidated_metadata,
        duration: start.elapsed(),
    })
}

/// Migrate the Zarr V2 hierarchy at `source_path` to a new Zarr V3 hierarchy at `target_path`.
///
/// Any existing content at `target_path` is erased.
///
/// # Errors
/// Returns a [`MigrateError`] if either store cannot be opened or [`migrate`] fails.
pub fn migrate_path(
    source_path: &Path,
    target_path: &Path,
    options: &MigrateOptions,
    progress_callback: &ProgressCallback,
) -> Result<MigrationReport, MigrateError> {
    if let (Ok(source), Ok(target)) = (source_path.canonicalize(), target_path.canonicalize()) {
        if source == target {
            return Err(MigrateError::target_write(format!(
                "the hierarchy at {}",
                target_path.display()
            ))(StoreError::Other(
                "the target is the source".to_string(),
            )));
        }
    }

    let source = FilesystemStore::new(source_path)
        .map_err(StoreError::from)
        .and_then(|storage| ZarrSourceStore::open(Arc::new(storage)))
        .map_err(MigrateError::source_read(format!(
            "the hierarchy at {}",
            source_path.display()
        )))?;
    enter(MigrationState::Opened, progress_callback);

    let target = FilesystemStore::new(target_path)
        .map_err(StoreError::from)
        .and_then(|storage| ZarrTargetStore::create(Arc::new(storage)))
        .map_err(MigrateError::target_write(format!(
            "the hierarchy at {}",
            target_path.display()
        )))?;
    enter(MigrationState::Created, progress_callback);

    migrate(&source, &target, options, progress_callback)
}
