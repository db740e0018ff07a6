//! Output publishing.
//!
//! Rewritten documents are never streamed straight to their destination:
//! - the bytes go to a temp file in the destination directory (same filesystem, so the final
//!   rename cannot turn into a copy)
//! - the temp file is flushed and `sync_all`'d
//! - it is renamed over the destination, replacing any previous file (including on Windows)
//!
//! A failure at any step leaves the destination as it was and removes the temp file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::RenumberError;

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` is `Some("")` for bare names like `diagram.xml`.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Atomically replace `dest` with `bytes`.
pub fn write_atomically(dest: impl AsRef<Path>, bytes: &[u8]) -> Result<(), RenumberError> {
    let dest = dest.as_ref();
    publish(dest, |file| file.write_all(bytes)).map_err(|source| RenumberError::Write {
        path: dest.to_path_buf(),
        source,
    })
}

fn publish(dest: &Path, write_fn: impl FnOnce(&mut File) -> io::Result<()>) -> io::Result<()> {
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write_fn(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    let tmp_path = tmp.into_temp_path();
    replace_file(tmp_path.as_ref(), dest)?;

    // Best-effort: the file is already in place even if the directory sync fails.
    let _ = sync_parent_dir(dest);
    Ok(())
}

/// Resolve `path` for same-file comparisons, falling back to an absolute-but-unresolved path
/// when it does not exist yet.
pub(crate) fn canonical_or_absolute(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let dir = parent_dir_or_dot(path);
    match (fs::canonicalize(dir), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn sync_parent_dir(path: &Path) -> io::Result<()> {
    // Opening a directory as a file works on most Unix platforms; elsewhere this just fails.
    File::open(parent_dir_or_dot(path))?.sync_all()
}

fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt as _;
        use windows_sys::Win32::Storage::FileSystem::{MoveFileExW, MOVEFILE_REPLACE_EXISTING};

        fn to_wide_null(path: &Path) -> Vec<u16> {
            let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
            wide.push(0);
            wide
        }

        let from_w = to_wide_null(from);
        let to_w = to_wide_null(to);
        let ok = unsafe { MoveFileExW(from_w.as_ptr(), to_w.as_ptr(), MOVEFILE_REPLACE_EXISTING) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(windows))]
    {
        fs::rename(from, to)
    }
}
