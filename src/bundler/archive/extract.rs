//! Archive extraction.

use super::{ArchiveFormat, sanitize_entry_path};
use crate::bundler::error::{Error, ErrorExt, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Extracts every entry of `archive` into `dest`.
///
/// Parent directories are created as needed and file contents are streamed
/// verbatim. Symlinks are skipped. Entries that would land outside `dest`
/// abort the extraction.
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] for 7z archives, otherwise I/O or codec
/// errors.
pub async fn extract(format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<()> {
    log::debug!(
        "Extracting {} ({}) into {}",
        archive.display(),
        format,
        dest.display()
    );

    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    match format {
        ArchiveFormat::TarGz => {
            blocking(move || {
                let file = File::open(&archive).fs_context("opening archive", &archive)?;
                extract_tar(flate2::read::GzDecoder::new(BufReader::new(file)), &dest)
            })
            .await
        }
        ArchiveFormat::Tar => {
            blocking(move || {
                let file = File::open(&archive).fs_context("opening archive", &archive)?;
                extract_tar(BufReader::new(file), &dest)
            })
            .await
        }
        ArchiveFormat::TarXz => {
            let file = tokio::fs::File::open(&archive)
                .await
                .fs_context("opening archive", &archive)?;
            let decoder = async_compression::tokio::bufread::XzDecoder::new(
                tokio::io::BufReader::new(file),
            );
            // The bridge captures the current runtime handle, so it is built
            // here and only then moved onto the blocking pool.
            let reader = tokio_util::io::SyncIoBridge::new(decoder);
            blocking(move || extract_tar(reader, &dest)).await
        }
        ArchiveFormat::Zip => blocking(move || extract_zip(&archive, &dest)).await,
        ArchiveFormat::SevenZip => Err(Error::UnsupportedFormat(format.to_string())),
    }
}

async fn blocking<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::GenericError(format!("Extraction task panicked: {}", e)))?
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).fs_context("creating directory", dest)?;

    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative = sanitize_entry_path(&entry.path()?)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(&relative);
        let kind = entry.header().entry_type();

        if kind.is_dir() {
            fs::create_dir_all(&target).fs_context("creating directory", &target)?;
        } else if kind.is_file() {
            create_parent(&target)?;
            entry
                .unpack(&target)
                .fs_context("extracting entry", &target)?;
        } else if kind.is_symlink() || kind.is_hard_link() {
            log::debug!("Skipping link entry {}", relative.display());
        } else {
            log::trace!("Skipping {:?} entry {}", kind, relative.display());
        }
    }
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).fs_context("opening archive", archive)?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))?;
    fs::create_dir_all(dest).fs_context("creating directory", dest)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = sanitize_entry_path(Path::new(entry.name()))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).fs_context("creating directory", &target)?;
            continue;
        }
        if entry.is_symlink() {
            log::debug!("Skipping link entry {}", relative.display());
            continue;
        }

        create_parent(&target)?;
        let mut out = File::create(&target).fs_context("creating file", &target)?;
        io::copy(&mut entry, &mut out).fs_context("extracting entry", &target)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                .fs_context("setting permissions", &target)?;
        }
    }
    Ok(())
}

fn create_parent(target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).fs_context("creating directory", parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tar(path: &Path, entries: &[(&str, &str)]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, data.as_bytes()).unwrap();
        }
        builder.finish().unwrap();
    }

    #[tokio::test]
    async fn test_extract_plain_tar() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("runtime.tar");
        write_tar(
            &archive,
            &[("jdk-17/bin/java", "elf"), ("jdk-17/release", "JAVA_VERSION=17")],
        );

        let dest = temp.path().join("out");
        extract(ArchiveFormat::Tar, &archive, &dest).await.unwrap();
        assert_eq!(fs::read(dest.join("jdk-17/bin/java")).unwrap(), b"elf");
        assert_eq!(fs::read(dest.join("jdk-17/release")).unwrap(), b"JAVA_VERSION=17");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extract_tar_xz() {
        use tokio::io::AsyncWriteExt;

        let temp = tempfile::tempdir().unwrap();
        let tarball = temp.path().join("runtime.tar");
        write_tar(
            &tarball,
            &[("jdk-21/bin/java", "elf"), ("jdk-21/lib/modules", "mods")],
        );

        let mut encoder = async_compression::tokio::write::XzEncoder::new(Vec::new());
        encoder.write_all(&fs::read(&tarball).unwrap()).await.unwrap();
        encoder.shutdown().await.unwrap();
        let archive = temp.path().join("runtime.tar.xz");
        fs::write(&archive, encoder.into_inner()).unwrap();

        let dest = temp.path().join("out");
        extract(ArchiveFormat::TarXz, &archive, &dest).await.unwrap();
        assert_eq!(fs::read(dest.join("jdk-21/bin/java")).unwrap(), b"elf");
        assert_eq!(fs::read(dest.join("jdk-21/lib/modules")).unwrap(), b"mods");
    }

    #[tokio::test]
    async fn test_extract_zip_creates_parents() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("runtime.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("jdk/bin/java.exe", options).unwrap();
            zip.write_all(b"MZ").unwrap();
            zip.finish().unwrap();
        }

        let dest = temp.path().join("out");
        extract(ArchiveFormat::Zip, &archive, &dest).await.unwrap();
        assert_eq!(fs::read(dest.join("jdk/bin/java.exe")).unwrap(), b"MZ");
    }

    #[tokio::test]
    async fn test_extract_rejects_traversal() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("evil.zip");
        {
            let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
            zip.start_file("../escape.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"nope").unwrap();
            zip.finish().unwrap();
        }

        let dest = temp.path().join("out");
        assert!(extract(ArchiveFormat::Zip, &archive, &dest).await.is_err());
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_seven_zip_is_unsupported() {
        let temp = tempfile::tempdir().unwrap();
        let err = extract(
            ArchiveFormat::SevenZip,
            &temp.path().join("runtime.7z"),
            temp.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref name) if name == "7z"));
    }
}
