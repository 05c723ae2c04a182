//! Filesystem primitives used by placement.
//!
//! Nothing here overwrites an existing file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::scanner::split_name;
use crate::error::PlacementError;

/// Move a file, falling back to copy + delete across filesystems.
///
/// Fails if `to` already exists.
pub fn move_file(from: &Path, to: &Path) -> Result<(), PlacementError> {
    let wrap = |source: io::Error| PlacementError::MoveFile {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if to.exists() {
        return Err(wrap(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "destination already exists",
        )));
    }

    fs::rename(from, to)
        .or_else(|rename_error| {
            debug!(from = %from.display(), error = %rename_error, "rename failed, copying");
            copy_then_delete(from, to)
        })
        .map_err(wrap)?;

    debug!(from = %from.display(), to = %to.display(), "moved");
    Ok(())
}

// rename fails across filesystems; the source is only deleted once the copy
// has the same size
fn copy_then_delete(from: &Path, to: &Path) -> io::Result<()> {
    let source_size = fs::metadata(from)?.len();
    fs::copy(from, to)?;

    let dest_size = fs::metadata(to)?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(to);
        return Err(io::Error::other(format!(
            "Copy verification failed: source {} bytes, dest {} bytes",
            source_size, dest_size
        )));
    }

    fs::remove_file(from)
}

/// Permanently delete a file
pub fn remove_file(path: &Path) -> Result<(), PlacementError> {
    fs::remove_file(path).map_err(|source| PlacementError::RemoveFile {
        path: path.to_path_buf(),
        source,
    })
}

/// First free path for `file_name` in `dir`: the name itself, then
/// `stem_1.ext`, `stem_2.ext`, ...
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = split_name(file_name);
    let mut counter = 1usize;
    loop {
        let name = if extension.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, extension)
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Move a file into a side folder under a free name; returns the new path
pub fn divert(path: &Path, bucket_dir: &Path) -> Result<PathBuf, PlacementError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let destination = unique_destination(bucket_dir, &file_name);
    if destination.file_name() != path.file_name() {
        warn!(
            file = %path.display(),
            renamed = %destination.display(),
            "name taken in side folder, adding a counter"
        );
    }
    move_file(path, &destination)?;
    Ok(destination)
}

/// Create a directory (and parents) if it does not exist
pub fn ensure_dir(path: &Path) -> Result<(), PlacementError> {
    fs::create_dir_all(path).map_err(|source| PlacementError::CreateFolder {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(content).unwrap();
    }

    #[test]
    fn move_relocates_file() {
        let temp_src = TempDir::new().unwrap();
        let temp_dest = TempDir::new().unwrap();

        let src_file = temp_src.path().join("IMG_0001.jpg");
        write(&src_file, b"test content");
        let dest_file = temp_dest.path().join("FR_20240501_102030.jpg");

        move_file(&src_file, &dest_file).unwrap();

        assert!(!src_file.exists());
        assert_eq!(fs::read(&dest_file).unwrap(), b"test content");
    }

    #[test]
    fn move_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let src_file = temp.path().join("a.jpg");
        let dest_file = temp.path().join("b.jpg");
        write(&src_file, b"incoming");
        write(&dest_file, b"resident");

        let error = move_file(&src_file, &dest_file).unwrap_err();

        assert!(matches!(error, PlacementError::MoveFile { .. }));
        assert!(src_file.exists());
        assert_eq!(fs::read(&dest_file).unwrap(), b"resident");
    }

    #[test]
    fn move_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let result = move_file(
            &temp.path().join("missing.jpg"),
            &temp.path().join("dest.jpg"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn unique_destination_adds_counter() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("photo.jpg"), b"1");
        write(&temp.path().join("photo_1.jpg"), b"2");

        assert_eq!(
            unique_destination(temp.path(), "photo.jpg"),
            temp.path().join("photo_2.jpg")
        );
        assert_eq!(
            unique_destination(temp.path(), "other.jpg"),
            temp.path().join("other.jpg")
        );
    }

    #[test]
    fn divert_keeps_both_copies() {
        let temp_src = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();
        write(&bucket.path().join("IMG_0001.jpg"), b"earlier");
        let incoming = temp_src.path().join("IMG_0001.jpg");
        write(&incoming, b"later");

        let landed = divert(&incoming, bucket.path()).unwrap();

        assert_eq!(landed, bucket.path().join("IMG_0001_1.jpg"));
        assert_eq!(fs::read(bucket.path().join("IMG_0001.jpg")).unwrap(), b"earlier");
        assert_eq!(fs::read(&landed).unwrap(), b"later");
    }
}
