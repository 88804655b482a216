use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use tracing::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrashEntry {
    pub path: PathBuf,
    pub allocated_bytes: u64,
}

/// The current user's trash folder for this platform.
pub fn default_trash_path() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new()?;

    if cfg!(target_os = "macos") {
        return Some(base_dirs.home_dir().join(".Trash"));
    }

    Some(base_dirs.data_local_dir().join("Trash").join("files"))
}

/// List the top-level entries of `trash_path` in name order.
///
/// Failing to list the directory itself is the permission signal, so only
/// that error is returned. A folder that does not exist yet is an empty trash.
/// Entries that vanish or cannot be inspected while being sized count as zero
/// bytes.
#[instrument(level = "trace")]
pub fn list_entries(trash_path: &Path) -> io::Result<Vec<TrashEntry>> {
    let read_dir = match fs::read_dir(trash_path) {
        Ok(read_dir) => read_dir,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            trace!("Trash folder {trash_path:?} does not exist yet");
            return Ok(vec![]);
        }
        Err(error) => return Err(error),
    };

    let mut paths = read_dir
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(error) => {
                debug!("Skipping unreadable trash entry: {error:?}");
                None
            }
        })
        .collect::<Vec<PathBuf>>();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| TrashEntry {
            allocated_bytes: allocated_size(&path),
            path,
        })
        .collect())
}

/// Space taken on disk by `path`, directories included recursively.
pub fn allocated_size(path: &Path) -> u64 {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) => {
            debug!("Failed reading metadata of {path:?}: {error:?}");
            return 0;
        }
    };

    let own_size = allocated_bytes(&metadata);
    if !metadata.is_dir() {
        return own_size;
    }

    let children = match fs::read_dir(path) {
        Ok(children) => children,
        Err(error) => {
            debug!("Failed listing {path:?}: {error:?}");
            return own_size;
        }
    };

    own_size
        + children
            .filter_map(Result::ok)
            .map(|child| allocated_size(&child.path()))
            .sum::<u64>()
}

#[cfg(unix)]
fn allocated_bytes(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;

    // st_blocks is always in 512-byte units
    metadata.blocks() * 512
}

#[cfg(not(unix))]
fn allocated_bytes(metadata: &fs::Metadata) -> u64 {
    metadata.len()
}

pub fn remove_entry(entry: &TrashEntry) -> io::Result<()> {
    let metadata = fs::symlink_metadata(&entry.path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(&entry.path)?;
    } else {
        fs::remove_file(&entry.path)?;
    }

    remove_trash_info(&entry.path)
}

/// Drop the freedesktop `info/<name>.trashinfo` record of an entry of
/// `Trash/files`, if there is one.
fn remove_trash_info(path: &Path) -> io::Result<()> {
    let Some(info_path) = trash_info_path(path) else {
        return Ok(());
    };

    match fs::remove_file(&info_path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

fn trash_info_path(path: &Path) -> Option<PathBuf> {
    let files_dir = path.parent()?;
    if files_dir.file_name()? != "files" {
        return None;
    }

    let info_dir = files_dir.parent()?.join("info");
    if !info_dir.is_dir() {
        return None;
    }

    let mut info_name = path.file_name()?.to_os_string();
    info_name.push(".trashinfo");
    Some(info_dir.join(info_name))
}
