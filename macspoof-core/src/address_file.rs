//! Lookup of the file that persists the factory hardware address.

use macspoof_hal::FsOps;
use std::path::{Path, PathBuf};

pub use macspoof_hal::path::backup_path;

/// Return the first candidate that exists, checking in list order.
pub fn locate_address_file<F: FsOps + ?Sized>(fs: &F, candidates: &[PathBuf]) -> Option<PathBuf> {
    let found = candidates.iter().find(|p| fs.path_exists(p)).cloned();
    match &found {
        Some(path) => log::debug!("address file found at {}", path.display()),
        None => log::debug!("no address file among {} candidates", candidates.len()),
    }
    found
}

/// True when a backup already sits next to `file`.
pub fn has_backup<F: FsOps + ?Sized>(fs: &F, file: &Path, suffix: &str) -> bool {
    fs.path_exists(&backup_path(file, suffix))
}
