use std::num::{NonZeroU64, NonZeroUsize};

use clap::Parser;
use serde::{Deserialize, Serialize};

/// The default number of leading axis chunks per shard.
pub const DEFAULT_SHARDS_FACTOR: NonZeroU64 = match NonZeroU64::new(10) {
    Some(value) => value,
    None => unreachable!(),
};

/// The default number of leading axis elements per copy window.
pub const DEFAULT_WINDOW_SIZE: NonZeroU64 = match NonZeroU64::new(10) {
    Some(value) => value,
    None => unreachable!(),
};

/// Migration options.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
pub struct MigrateOptions {
    /// The number of leading axis chunks per shard.
    ///
    /// Only applies to arrays with 3 or more dimensions.
    #[arg(long, default_value_t = DEFAULT_SHARDS_FACTOR)]
    pub shards_factor: NonZeroU64,

    /// The number of leading axis elements copied per read/write.
    ///
    /// Peak memory per array is one window.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window_size: NonZeroU64,

    /// The maximum number of arrays to copy concurrently.
    ///
    /// Windows within an array are always copied sequentially.
    #[arg(long, default_value_t = NonZeroUsize::MIN)]
    pub concurrent_arrays: NonZeroUsize,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            shards_factor: DEFAULT_SHARDS_FACTOR,
            window_size: DEFAULT_WINDOW_SIZE,
            concurrent_arrays: NonZeroUsize::MIN,
        }
    }
}
