//! Icon embedding for Windows launchers.
//!
//! Adds `RT_ICON` images and one `RT_GROUP_ICON` directory to a PE image
//! without touching any resource that was already there. The rebuilt
//! resource tree is written back into the existing resource section when
//! that section is the last one in the image, and into a new `.rsrc`
//! section otherwise. Bytes after the last section (overlay) survive.
//!
//! Signed images are refused: any change would invalidate the signature.

mod headers;
mod tree;

pub use headers::{PeLayout, Placement, Section, pe_checksum};
pub use tree::{
    RT_GROUP_ICON, RT_ICON, ResourceData, ResourceDirectory, ResourceEntry, ResourceId,
    ResourceNode,
};

use super::resources::IconResourceSet;
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    utils::http::part_path,
};
use headers::{DIR_CERTIFICATE, DIR_RESOURCE};
use std::path::Path;

/// Language of the inserted leaves (en-GB).
pub const ICON_LANGUAGE: u32 = 2057;
/// Code page of the inserted leaves.
pub const ICON_CODE_PAGE: u32 = 1252;

/// Embeds `icons` into the PE file at `pe_path`, replacing it atomically.
pub async fn patch(pe_path: &Path, icons: &IconResourceSet) -> Result<()> {
    let bytes = tokio::fs::read(pe_path)
        .await
        .fs_context("reading launcher", pe_path)?;

    let owned = icons.clone();
    let patched = tokio::task::spawn_blocking(move || patch_image(&bytes, &owned))
        .await
        .map_err(|e| Error::GenericError(format!("icon patch task failed: {e}")))??;

    let part = part_path(pe_path);
    if let Err(e) = tokio::fs::write(&part, &patched).await {
        let _ = tokio::fs::remove_file(&part).await;
        return Err(e).fs_context("writing patched launcher", part);
    }
    tokio::fs::rename(&part, pe_path)
        .await
        .fs_context("replacing launcher", pe_path)?;

    log::debug!(
        "Embedded {} icon image(s) into {}",
        icons.len(),
        pe_path.display()
    );
    Ok(())
}

/// Returns a copy of `bytes` with `icons` embedded.
pub fn patch_image(bytes: &[u8], icons: &IconResourceSet) -> Result<Vec<u8>> {
    if icons.is_empty() {
        return Err(Error::IconPatch("no icon images to embed".into()));
    }

    let layout = PeLayout::parse(bytes)?;
    let (_, certificate_size) = layout.data_directory(bytes, DIR_CERTIFICATE)?;
    if certificate_size != 0 {
        return Err(Error::IconPatch(
            "launcher carries an Authenticode signature; refusing to modify it".into(),
        ));
    }

    let mut tree = read_resources(&layout, bytes)?;
    add_icons(&mut tree, icons)?;

    let (resource_rva, _) = layout.data_directory(bytes, DIR_RESOURCE)?;
    let placement = layout.plan(resource_rva);
    log::trace!("Resource placement: {:?}", placement);

    let blob = tree.serialize(layout.placement_rva(placement))?;
    layout.rebuild(bytes, placement, &blob)
}

/// Reads the resource tree of an image; empty when it has none.
pub fn read_resources(layout: &PeLayout, bytes: &[u8]) -> Result<ResourceDirectory> {
    let (rva, size) = layout.data_directory(bytes, DIR_RESOURCE)?;
    if rva == 0 || size == 0 {
        return Ok(ResourceDirectory::new());
    }

    let dir = layout
        .read_rva(bytes, rva, size)
        .ok_or_else(|| Error::IconPatch("resource directory points outside the image".into()))?;
    ResourceDirectory::parse(dir, &|rva, size| {
        layout.read_rva(bytes, rva, size).map(<[u8]>::to_vec)
    })
}

/// Inserts icon leaves after the highest existing ids.
fn add_icons(tree: &mut ResourceDirectory, icons: &IconResourceSet) -> Result<()> {
    let icon_table = tree.directory_or_insert(ResourceId::Id(RT_ICON))?;
    let first = icon_table.max_id().map_or(Some(1), |id| id.checked_add(1));
    let first_id = first
        .and_then(|id| u16::try_from(id).ok())
        .ok_or_else(|| Error::IconPatch("icon ids exhausted".into()))?;
    let group = icons.group_directory(first_id)?;

    for (id, image) in (u32::from(first_id)..).zip(&icons.images) {
        icon_table.insert(
            ResourceId::Id(id),
            ResourceNode::Directory(ResourceDirectory::leaf(
                ICON_LANGUAGE,
                ResourceData {
                    data: image.data.clone(),
                    code_page: ICON_CODE_PAGE,
                },
            )),
        )?;
    }

    let group_table = tree.directory_or_insert(ResourceId::Id(RT_GROUP_ICON))?;
    let group_id = group_table
        .max_id()
        .map_or(Some(1), |id| id.checked_add(1))
        .ok_or_else(|| Error::IconPatch("icon group ids exhausted".into()))?;
    group_table.insert(
        ResourceId::Id(group_id),
        ResourceNode::Directory(ResourceDirectory::leaf(
            ICON_LANGUAGE,
            ResourceData {
                data: group,
                code_page: ICON_CODE_PAGE,
            },
        )),
    )
}
