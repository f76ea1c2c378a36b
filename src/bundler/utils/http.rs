//! HTTP utilities for downloading runtime archives.
//!
//! Provides streaming downloads with optional SHA-256 verification. Bytes
//! are written to a `.part` sibling and only renamed onto the destination
//! once complete and verified.

use crate::bundler::error::{Error, ErrorExt, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Path of the in-progress download for `dest`.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Streams `url` into `dest`.
///
/// When `expected_sha256` is given the digest of the received bytes must
/// match it (case-insensitive) or the partial file is removed and
/// [`Error::HashMismatch`] is returned. Returns the hex digest.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
) -> Result<String> {
    log::info!("Downloading {}", url);

    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| Error::TransferFailure(format!("download of {url} failed: {e}")))?;

    let part = part_path(dest);
    let mut file = tokio::fs::File::create(&part)
        .await
        .fs_context("creating download file", &part)?;
    let mut hasher = Sha256::new();
    let mut received = 0u64;

    let streamed: Result<()> = async {
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::TransferFailure(format!("reading {url} failed: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .fs_context("writing download file", &part)?;
            hasher.update(&chunk);
            received += chunk.len() as u64;
        }
        file.flush().await.fs_context("flushing download file", &part)?;
        Ok(())
    }
    .await;
    drop(file);

    if let Err(e) = streamed {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e);
    }

    let actual = hex::encode(hasher.finalize());
    log::debug!("Received {} bytes, sha256 {}", received, actual);

    if let Some(expected) = expected_sha256.filter(|expected| !actual.eq_ignore_ascii_case(expected)) {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(Error::HashMismatch {
            file: dest
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            expected: expected.to_string(),
            actual,
        });
    }

    tokio::fs::rename(&part, dest)
        .await
        .fs_context("moving download into place", dest)?;
    Ok(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/cache/OpenJDK17.tar.gz")),
            Path::new("/cache/OpenJDK17.tar.gz.part")
        );
    }

    #[tokio::test]
    async fn test_download_verifies_hash() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/file.zip")
            .with_status(200)
            .with_body("payload")
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("file.zip");
        let client = reqwest::Client::new();
        let url = format!("{}/file.zip", server.url());

        let err = download_to_file(&client, &url, &dest, Some("00"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HashMismatch { .. }));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());

        let expected = hex::encode(Sha256::digest(b"payload"));
        let actual = download_to_file(&client, &url, &dest, Some(&expected.to_uppercase()))
            .await
            .unwrap();
        assert_eq!(actual, expected);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_download_http_error_is_transfer_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing.zip")
            .with_status(500)
            .create_async()
            .await;

        let temp = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let err = download_to_file(
            &client,
            &format!("{}/missing.zip", server.url()),
            &temp.path().join("missing.zip"),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::TransferFailure(_)));
    }
}
