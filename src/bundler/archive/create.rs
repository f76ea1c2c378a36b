//! Artifact creation.

use super::ArchiveFormat;
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    utils::http::part_path,
};
use flate2::{Compression, write::GzEncoder};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::HeaderMode;
use walkdir::WalkDir;

/// Packs every regular file below `source` into `dest`.
///
/// Entry names are the files' paths relative to `source`, joined with `/`.
/// Directories are not written as entries. Symlinks are followed and stored
/// as the files they point to. Files are visited depth-first
/// in file-name order with fixed timestamps, so identical trees produce
/// identical archives.
///
/// The archive is written to `<dest>.part` and renamed once complete; a
/// failed create leaves no file at `dest`.
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] for anything but zip and tar.gz.
pub async fn create(format: ArchiveFormat, source: &Path, dest: &Path) -> Result<()> {
    if !matches!(format, ArchiveFormat::Zip | ArchiveFormat::TarGz) {
        return Err(Error::UnsupportedFormat(format.to_string()));
    }
    log::debug!(
        "Packing {} into {} ({})",
        source.display(),
        dest.display(),
        format
    );

    let source = source.to_path_buf();
    let dest = dest.to_path_buf();
    let part = part_path(&dest);

    let written = {
        let part = part.clone();
        tokio::task::spawn_blocking(move || {
            let files = collect_files(&source)?;
            let file = File::create(&part).fs_context("creating archive", &part)?;
            match format {
                ArchiveFormat::Zip => write_zip(BufWriter::new(file), &files),
                _ => write_tar_gz(BufWriter::new(file), &files),
            }
        })
        .await
        .map_err(|e| Error::GenericError(format!("Archive task panicked: {}", e)))?
    };

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e);
    }

    tokio::fs::rename(&part, &dest)
        .await
        .fs_context("moving archive into place", &dest)
}

/// A regular file and its entry name.
struct Member {
    path: PathBuf,
    name: String,
}

fn collect_files(source: &Path) -> Result<Vec<Member>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(source)?;
        let name = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(Member {
            path: entry.path().to_path_buf(),
            name,
        });
    }
    Ok(files)
}

fn write_tar_gz<W: Write>(writer: W, files: &[Member]) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(encoder);

    for member in files {
        let metadata = std::fs::metadata(&member.path).fs_context("reading metadata", &member.path)?;
        let mut header = tar::Header::new_gnu();
        header.set_metadata_in_mode(&metadata, HeaderMode::Deterministic);

        let mut file = File::open(&member.path).fs_context("opening file", &member.path)?;
        tar.append_data(&mut header, &member.name, &mut file)?;
    }

    let encoder = tar.into_inner()?;
    let mut finished = encoder.finish()?;
    finished.flush()?;
    Ok(())
}

fn write_zip<W: Write + io::Seek>(writer: W, files: &[Member]) -> Result<()> {
    use zip::{CompressionMethod, DateTime, write::SimpleFileOptions};

    let mut zip = zip::ZipWriter::new(writer);

    for member in files {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(file_mode(&member.path)?);
        zip.start_file(member.name.as_str(), options)?;
        let mut file = File::open(&member.path).fs_context("opening file", &member.path)?;
        io::copy(&mut file, &mut zip).fs_context("packing file", &member.path)?;
    }

    let mut finished = zip.finish()?;
    finished.flush()?;
    Ok(())
}

/// Deterministic permission bits: 0o755 when any execute bit is set, 0o644 otherwise.
#[cfg(unix)]
fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)
        .fs_context("reading metadata", path)?
        .permissions()
        .mode();
    Ok(if mode & 0o111 != 0 { 0o755 } else { 0o644 })
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Result<u32> {
    Ok(0o644)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tar_xz_cannot_be_written() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("out.tar.xz");
        let err = create(ArchiveFormat::TarXz, temp.path(), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref name) if name == "tar.xz"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_directories_are_not_entries() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("bundle");
        std::fs::create_dir_all(source.join("runtime/lib/empty")).unwrap();
        std::fs::write(source.join("runtime/lib/modules"), b"mods").unwrap();
        std::fs::write(source.join("vmargs.txt"), b"-jar app.jar").unwrap();

        let dest = temp.path().join("bundle.zip");
        create(ArchiveFormat::Zip, &source, &dest).await.unwrap();

        let zip = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<&str> = zip.file_names().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, ["runtime/lib/modules", "vmargs.txt"]);
        assert!(!part_path(&dest).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_stored_as_files() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("bundle");
        std::fs::create_dir_all(source.join("lib")).unwrap();
        std::fs::write(source.join("lib/libjvm.so.17"), b"jvm").unwrap();
        std::os::unix::fs::symlink("libjvm.so.17", source.join("lib/libjvm.so")).unwrap();

        let dest = temp.path().join("bundle.zip");
        create(ArchiveFormat::Zip, &source, &dest).await.unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut contents = String::new();
        io::Read::read_to_string(&mut zip.by_name("lib/libjvm.so").unwrap(), &mut contents)
            .unwrap();
        assert_eq!(contents, "jvm");
        assert!(zip.by_name("lib/libjvm.so.17").is_ok());
    }

    #[tokio::test]
    async fn test_output_is_reproducible() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("bundle");
        std::fs::create_dir_all(source.join("b")).unwrap();
        std::fs::write(source.join("b/two"), b"2").unwrap();
        std::fs::write(source.join("a"), b"1").unwrap();

        let first = temp.path().join("first.tar.gz");
        let second = temp.path().join("second.tar.gz");
        create(ArchiveFormat::TarGz, &source, &first).await.unwrap();
        create(ArchiveFormat::TarGz, &source, &second).await.unwrap();
        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }
}
