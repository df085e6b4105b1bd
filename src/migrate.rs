//! Migration of a Zarr V2 hierarchy to a sharded Zarr V3 hierarchy with consolidated metadata.

mod copy_array;
mod migrate_error;
mod migrate_options;
mod migration;
mod source_store;
mod target_store;
mod window;

pub use copy_array::{copy_array, ArrayReport};
pub use migrate_error::{MigrateError, StoreError};
pub use migrate_options::MigrateOptions;
pub use migration::{migrate, migrate_path, MigrationReport, MigrationState};
pub use source_store::{ArrayDescriptor, SourceStore, ZarrSourceStore};
pub use target_store::{read_consolidated_metadata, TargetArraySpec, TargetStore, ZarrTargetStore};
pub use window::{window_subset, windows};
