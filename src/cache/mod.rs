// Cache module for on-disk metric files.
// One CSV per (metric, owner, repo); the file's modification time is the staleness clock.

pub mod paths;
pub mod store;

pub use paths::{repo_dir, series_path};
pub use store::{
    delete, delete_dir, is_stale, is_stale_at, load_series, modified_at, save_series,
};
