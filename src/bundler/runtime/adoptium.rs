//! Adoptium (Eclipse Temurin) listing client.

use super::{DownloadCache, RuntimeResolver};
use crate::bundler::{Arch, Error, OperatingSystem, Result, RuntimeSettings, Target};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Architecture name used by the listing API.
pub fn api_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::X86 => "x86",
        Arch::X86_64 => "x64",
        Arch::Arm => "arm",
        Arch::AArch64 => "aarch64",
        Arch::Riscv64 => "riscv64",
    }
}

/// Operating system name used by the listing API.
pub fn api_os(os: OperatingSystem) -> &'static str {
    match os {
        OperatingSystem::LinuxGlibc => "linux",
        OperatingSystem::LinuxMusl => "alpine-linux",
        OperatingSystem::MacOs => "mac",
        OperatingSystem::Windows => "windows",
    }
}

#[derive(Debug, Deserialize)]
struct Asset {
    #[serde(default)]
    binary: Option<Binary>,
}

#[derive(Debug, Deserialize)]
struct Binary {
    #[serde(default)]
    package: Option<RuntimePackage>,
}

/// Downloadable archive reported by the listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimePackage {
    /// Download URL.
    #[serde(default)]
    pub link: Option<String>,
    /// Archive file name; also the cache key.
    #[serde(default)]
    pub name: Option<String>,
    /// SHA-256 of the archive, when published.
    #[serde(default)]
    pub checksum: Option<String>,
    /// Archive size in bytes, when published.
    #[serde(default)]
    pub size: Option<u64>,
}

/// [`RuntimeResolver`] backed by the Adoptium assets API.
///
/// Picks the first asset exposing a package with both a link and a name.
#[derive(Debug)]
pub struct AdoptiumResolver {
    settings: RuntimeSettings,
    client: reqwest::Client,
    cache: DownloadCache,
}

impl AdoptiumResolver {
    /// Creates a resolver that caches archives in `cache_dir`.
    pub fn new(settings: RuntimeSettings, cache_dir: &Path) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kodegen_bundler_runtime/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            cache: DownloadCache::new(cache_dir, client.clone()),
            settings,
            client,
        })
    }

    /// Listing URL for `version` on `target`.
    pub fn listing_url(&self, version: u32, target: Target) -> Result<url::Url> {
        let mut url = url::Url::parse(&format!(
            "{}/v3/assets/latest/{}/hotspot",
            self.settings.api_base.trim_end_matches('/'),
            version
        ))?;
        url.query_pairs_mut()
            .append_pair("architecture", api_arch(target.arch))
            .append_pair("image_type", &self.settings.image_type)
            .append_pair("os", api_os(target.os))
            .append_pair("vendor", "eclipse");
        Ok(url)
    }

    /// Looks up the best package for `version` on `target`.
    pub async fn find_package(&self, version: u32, target: Target) -> Result<RuntimePackage> {
        let url = self.listing_url(version, target)?;
        log::debug!("Querying {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::TransferFailure(format!("listing {url} failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::UnsupportedTarget { version, target });
        }
        if !status.is_success() {
            return Err(Error::TransferFailure(format!(
                "listing {url} returned {status}"
            )));
        }

        let assets: Vec<Asset> = response
            .json()
            .await
            .map_err(|e| Error::TransferFailure(format!("listing {url} is malformed: {e}")))?;
        log::trace!("Loaded build data: {:?}", assets);

        assets
            .into_iter()
            .filter_map(|asset| asset.binary.and_then(|binary| binary.package))
            .find(|package| package.link.is_some() && package.name.is_some())
            .ok_or(Error::UnsupportedTarget { version, target })
    }
}

impl RuntimeResolver for AdoptiumResolver {
    async fn resolve(&self, version: u32, target: Target) -> Result<PathBuf> {
        log::info!("Looking for build ({}:{}:{})", version, target.arch, target.os);
        let package = self.find_package(version, target).await?;

        let (Some(link), Some(name)) = (package.link.as_deref(), package.name.as_deref()) else {
            return Err(Error::UnsupportedTarget { version, target });
        };
        log::debug!("Url: {}, Name: {}", link, name);

        let checksum = package
            .checksum
            .as_deref()
            .filter(|_| self.settings.verify_checksums);
        self.cache.fetch(name, link, checksum).await
    }
}
