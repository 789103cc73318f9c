//! The output directory: one .ics file per item.
//!
//! Items are written atomically: content is staged in a temporary file in the
//! same directory and renamed into place, so a concurrent reader never sees a
//! half-written file.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{VdirError, VdirResult};
use crate::filename::VDIR_FILE_EXTENSION;
use crate::ics::parse_document;
use crate::item::Item;

const STAGING_PREFIX: &str = ".ical2vdir-";
const STAGING_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct Vdir {
    path: PathBuf,
}

impl Vdir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Vdir { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn item_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }

    /// Regular files in the directory that carry the item extension.
    pub fn managed_files(&self) -> VdirResult<HashSet<PathBuf>> {
        let mut files = HashSet::new();

        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            let has_extension = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(VDIR_FILE_EXTENSION));

            if has_extension && path.is_file() {
                files.insert(path);
            }
        }

        Ok(files)
    }

    /// Parse a stored file back into an item (the first event or task in it).
    pub fn read_item(&self, path: &Path) -> VdirResult<Item> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => {
                VdirError::IcsParse(format!("{} is not valid UTF-8", path.display()))
            }
            _ => VdirError::Io(e),
        })?;

        let document = parse_document(&content)?;

        document
            .components
            .iter()
            .find_map(Item::from_component)
            .ok_or_else(|| VdirError::IcsParse(format!("No event or task in {}", path.display())))
    }

    /// Atomically create or replace the file at `path`.
    pub fn write_item(&self, path: &Path, content: &str) -> VdirResult<()> {
        write_atomic(&self.path, path, content.as_bytes())
    }

    pub fn remove(&self, path: &Path) -> VdirResult<()> {
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Stage `contents` in a fresh temporary file inside `staging_dir`, then
/// rename it onto `target`.
///
/// `staging_dir` must be on the same filesystem as `target`. The temporary
/// file is removed on every error path. A `target` that exists but is not a
/// regular file is refused before anything is written.
pub fn write_atomic(staging_dir: &Path, target: &Path, contents: &[u8]) -> VdirResult<()> {
    if let Ok(metadata) = fs::metadata(target) {
        if !metadata.is_file() {
            return Err(VdirError::NotAFile(target.to_path_buf()));
        }
    }

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(STAGING_SUFFIX)
        .tempfile_in(staging_dir)?;

    staged.write_all(contents)?;
    staged.as_file().sync_all()?;

    staged.persist(target).map_err(|e| VdirError::Persist {
        path: target.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
