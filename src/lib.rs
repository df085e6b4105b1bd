#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

pub mod attributes;
pub mod geometry;
pub mod migrate;
pub mod progress;

pub use attributes::{translate_attributes, ArrayAttributes, DIMENSION_NAMES_ATTRIBUTE};
pub use geometry::{plan_geometry, ShapeMismatchError, TargetGeometry};
pub use migrate::{
    copy_array, migrate, migrate_path, read_consolidated_metadata, MigrateError, MigrateOptions,
    MigrationReport, MigrationState, SourceStore, StoreError, TargetStore, ZarrSourceStore,
    ZarrTargetStore,
};
