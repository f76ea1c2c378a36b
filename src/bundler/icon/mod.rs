//! Application icon streams.
//!
//! One source image is rasterized once per run into the three encodings
//! the platform layouts consume: a PNG for Linux, an ICNS for macOS and an
//! ICO whose images are embedded into the Windows launcher by [`pe`].

pub mod pe;
pub mod resources;

pub use resources::{IconResource, IconResourceSet};

use crate::bundler::error::{Error, Result};
use icns::{IconFamily, IconType, Image as IcnsImage, PixelFormat};
use ico::{IconDir, IconDirEntry, IconImage, ResourceType};
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use std::io::Cursor;
use std::path::Path;

/// Edge length of the Linux PNG.
pub const PNG_SIZE: u32 = 256;

/// Windows icon sizes.
pub const ICO_SIZES: [u32; 7] = [16, 24, 32, 48, 64, 128, 256];

const ICNS_TYPES: [(IconType, u32); 11] = [
    (IconType::RGBA32_16x16, 16),
    (IconType::RGBA32_16x16_2x, 32),
    (IconType::RGBA32_32x32, 32),
    (IconType::RGBA32_32x32_2x, 64),
    (IconType::RGBA32_64x64, 64),
    (IconType::RGBA32_128x128, 128),
    (IconType::RGBA32_128x128_2x, 256),
    (IconType::RGBA32_256x256, 256),
    (IconType::RGBA32_256x256_2x, 512),
    (IconType::RGBA32_512x512, 512),
    (IconType::RGBA32_512x512_2x, 1024),
];

/// Encoded icon streams for every platform.
#[derive(Debug, Clone)]
pub struct AppIcon {
    /// 256×256 PNG.
    pub png: Vec<u8>,
    /// Multi-resolution ICO.
    pub ico: Vec<u8>,
    /// Multi-resolution ICNS.
    pub icns: Vec<u8>,
}

impl AppIcon {
    /// Loads `source` and rasterizes it.
    pub async fn from_path(source: &Path) -> Result<Self> {
        let source = source.to_path_buf();
        tokio::task::spawn_blocking(move || {
            log::debug!("Rasterizing icon {}", source.display());
            let image = image::open(&source)?;
            Self::from_image(&image)
        })
        .await
        .map_err(|e| Error::GenericError(format!("icon rasterization task failed: {e}")))?
    }

    /// Rasterizes an already decoded image.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        Ok(Self {
            png: encode_png(image)?,
            ico: encode_ico(image)?,
            icns: encode_icns(image)?,
        })
    }

    /// ICO images ready for embedding as PE resources.
    pub fn resources(&self) -> Result<IconResourceSet> {
        IconResourceSet::from_ico(&self.ico)
    }
}

fn resize(image: &DynamicImage, size: u32) -> image::RgbaImage {
    image
        .resize_exact(size, size, FilterType::Lanczos3)
        .to_rgba8()
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(resize(image, PNG_SIZE)).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

fn encode_ico(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut dir = IconDir::new(ResourceType::Icon);
    for size in ICO_SIZES {
        let rgba = resize(image, size);
        let entry = IconDirEntry::encode(&IconImage::from_rgba_data(size, size, rgba.into_raw()))
            .map_err(|e| Error::GenericError(format!("encoding {size}x{size} icon: {e}")))?;
        dir.add_entry(entry);
    }

    let mut out = Vec::new();
    dir.write(&mut out)
        .map_err(|e| Error::GenericError(format!("writing ICO data: {e}")))?;
    Ok(out)
}

fn encode_icns(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut family = IconFamily::new();
    for (icon_type, size) in ICNS_TYPES {
        let rgba = resize(image, size);
        let icon = IcnsImage::from_data(PixelFormat::RGBA, size, size, rgba.into_raw())
            .map_err(|e| Error::GenericError(format!("creating {size}px ICNS image: {e}")))?;
        family
            .add_icon_with_type(&icon, icon_type)
            .map_err(|e| Error::GenericError(format!("adding {size}px image to ICNS: {e}")))?;
    }

    let mut out = Vec::new();
    family
        .write(&mut out)
        .map_err(|e| Error::GenericError(format!("writing ICNS data: {e}")))?;
    Ok(out)
}
