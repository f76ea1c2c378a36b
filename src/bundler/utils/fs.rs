//! File system utilities for bundling.
//!
//! Idempotent directory helpers plus copy, move and permission operations
//! used by the layout stages. Every failure carries the offending path.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }

    // create_dir_all is already idempotent - succeeds even if dir exists
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes a file or a directory tree. Missing paths are not an error.
///
/// Symlinks are removed, never followed.
pub async fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e).fs_context("inspecting path", path),
    };

    if metadata.is_dir() {
        remove_dir_all(path).await?;
    } else {
        fs::remove_file(path)
            .await
            .fs_context("removing file", path)?;
    }
    Ok(true)
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::write(path, contents)
        .await
        .fs_context("writing file", path)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// An existing destination file is overwritten.
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Symlinks are followed: the bundle receives the files they point to, so
/// archives built from it never depend on links. Files already present at
/// the destination are overwritten.
/// Fails if the source path is not a directory, doesn't exist, or holds a
/// dangling link or a link loop.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::GenericError(format!("{from:?} does not exist")));
    }
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a Directory")));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }

        for entry in walkdir::WalkDir::new(&from)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path)
                    .fs_context("creating directory", &dest_path)?;
            } else {
                if dest_path.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink()) {
                    std::fs::remove_file(&dest_path)
                        .fs_context("replacing symlink", &dest_path)?;
                }
                std::fs::copy(entry.path(), &dest_path)
                    .fs_context("copying file", entry.path())?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}

/// Copies a file or a directory tree to `to`.
pub async fn copy_path(from: &Path, to: &Path) -> Result<()> {
    if from.is_dir() {
        copy_dir(from, to).await
    } else {
        copy_file(from, to).await
    }
}

/// Moves a file or directory, creating the destination's parent first.
///
/// Both paths must live on the same file system.
pub async fn move_path(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::rename(from, to).await.fs_context("moving", from)
}

/// Adds the executable bits (`0o111`) to an existing file.
#[cfg(unix)]
pub async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let result = async {
        let mut permissions = fs::metadata(path).await?.permissions();
        permissions.set_mode(permissions.mode() | 0o111);
        fs::set_permissions(path, permissions).await
    }
    .await;

    result.map_err(|error| Error::Permission {
        path: path.to_path_buf(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_path_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("man");
        std::fs::create_dir_all(dir.join("man1")).unwrap();
        std::fs::write(dir.join("man1/java.1"), b"page").unwrap();

        assert!(remove_path(&dir).await.unwrap());
        assert!(!dir.exists());
        assert!(!remove_path(&dir).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_file_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("first.txt");
        let second = temp.path().join("second.txt");
        let dest = temp.path().join("out/nested/file.txt");
        std::fs::write(&first, b"one").unwrap();
        std::fs::write(&second, b"two").unwrap();

        copy_file(&first, &dest).await.unwrap();
        copy_file(&second, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_copy_file_missing_source() {
        let temp = tempfile::tempdir().unwrap();
        let err = copy_file(&temp.path().join("nope"), &temp.path().join("out"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_copy_dir_recurses() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("lib/deep")).unwrap();
        std::fs::write(src.join("lib/deep/a.txt"), b"a").unwrap();

        let dest = temp.path().join("dest");
        copy_path(&src, &dest).await.unwrap();
        assert_eq!(std::fs::read(dest.join("lib/deep/a.txt")).unwrap(), b"a");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_dir_resolves_symlinks() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("natives");
        std::fs::create_dir_all(src.join("real")).unwrap();
        std::fs::write(src.join("libfoo.so.1"), b"elf").unwrap();
        std::fs::write(src.join("real/config.txt"), b"cfg").unwrap();
        std::os::unix::fs::symlink("libfoo.so.1", src.join("libfoo.so")).unwrap();
        std::os::unix::fs::symlink("real", src.join("linked")).unwrap();

        let dest = temp.path().join("dest");
        copy_path(&src, &dest).await.unwrap();

        let lib = dest.join("libfoo.so");
        assert!(!lib.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&lib).unwrap(), b"elf");
        let linked = dest.join("linked");
        assert!(linked.symlink_metadata().unwrap().is_dir());
        assert_eq!(std::fs::read(linked.join("config.txt")).unwrap(), b"cfg");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_dir_rejects_dangling_link() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("natives");
        std::fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink("missing.so", src.join("libbar.so")).unwrap();

        assert!(copy_path(&src, &temp.path().join("dest")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_executable_adds_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("launcher");
        std::fs::write(&file, b"#!").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();

        set_executable(&file).await.unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_executable_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let err = set_executable(&temp.path().join("gone")).await.unwrap_err();
        assert!(matches!(err, Error::Permission { .. }));
    }
}
