//! Shared download cache with per-file-name single-flight.

use crate::bundler::{
    error::{Error, Result},
    utils::http::download_to_file,
};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Flat directory of downloaded archives.
#[derive(Debug)]
pub struct DownloadCache {
    dir: PathBuf,
    client: reqwest::Client,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DownloadCache {
    /// Cache rooted at `dir`, downloading with `client`.
    pub fn new(dir: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            dir: dir.into(),
            client,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Location of `name` inside the cache.
    ///
    /// `name` must be a single plain file name.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(name)),
            _ => Err(Error::TransferFailure(format!(
                "refusing to cache file under unsafe name {name:?}"
            ))),
        }
    }

    /// Returns the cached `name`, downloading it from `url` first if absent.
    ///
    /// A file already present under `name` is trusted and never re-checked.
    /// A fresh download is verified against `sha256` when one is given.
    pub async fn fetch(&self, name: &str, url: &str, sha256: Option<&str>) -> Result<PathBuf> {
        let path = self.path_for(name)?;

        let lock = self.lock_for(name).await;
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(name, url, &path, sha256).await
        };
        self.release(name, lock).await;
        result.map(|()| path)
    }

    async fn fetch_locked(
        &self,
        name: &str,
        url: &str,
        path: &Path,
        sha256: Option<&str>,
    ) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| transfer_failure(path, e))?
        {
            log::info!("{} is cached, using that instead", name);
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| transfer_failure(&self.dir, e))?;

        log::info!("Found a link, downloading {}", name);
        download_to_file(&self.client, url, path, sha256)
            .await
            .map_err(|e| match e {
                Error::TransferFailure(_) | Error::HashMismatch { .. } => e,
                other => Error::TransferFailure(other.to_string()),
            })?;
        log::info!("Finished downloading {}", name);

        Ok(())
    }

    async fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        Arc::clone(in_flight.entry(name.to_string()).or_default())
    }

    /// Drops the entry for `name` once no other fetch holds its lock.
    async fn release(&self, name: &str, lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // One reference lives in the map, one in `lock`. Clones are only
        // taken or dropped while the map is locked.
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(name);
        }
        drop(lock);
    }
}

fn transfer_failure(path: &Path, error: std::io::Error) -> Error {
    Error::TransferFailure(format!("cache {}: {}", path.display(), error))
}
