use crate::{
    error::{SiteError, SiteResult},
    log,
    logger::Sink,
};
use std::{fs, path::Path};
use walkdir::WalkDir;

/// Mirror every file under `src` into `dest`, replacing existing files.
///
/// A missing `src` directory is skipped. Returns the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path, sink: &Sink) -> SiteResult<usize> {
    if !src.is_dir() {
        log!(sink => "assets"; "{} not found, skipping", src.display());
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|source| SiteError::Walk {
            path: src.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        copy_file(entry.path(), &dest.join(relative))?;
        copied += 1;
    }

    Ok(copied)
}

/// Copy one file byte-for-byte, creating parent directories.
pub fn copy_file(from: &Path, to: &Path) -> SiteResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|err| SiteError::write(parent, err))?;
    }
    fs::copy(from, to).map_err(|err| SiteError::write(to, err))?;
    Ok(())
}

/// Write a generated page, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> SiteResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| SiteError::write(parent, err))?;
    }
    fs::write(path, contents).map_err(|err| SiteError::write(path, err))
}
