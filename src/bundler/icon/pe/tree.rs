//! Resource directory tree.
//!
//! The `.rsrc` directory is a tree of tables keyed by name or numeric id:
//! type → name → language → data. This module holds an owned model of that
//! tree, reads it out of an image and writes it back in a canonical layout.
//!
//! Mutation is insert-only: an existing entry can be descended into but never
//! replaced or removed, so every resource that was present before a patch is
//! present, unchanged, afterwards.
//!
//! # Serialized layout
//!
//! ```text
//! directory tables     breadth-first, root first
//! name strings         u16 length + UTF-16LE units
//! data entries         16 bytes each, 4-aligned
//! data                 each blob 8-aligned
//! ```

use crate::bundler::error::{Error, Result};
use std::fmt;

/// `RT_ICON`
pub const RT_ICON: u32 = 3;
/// `RT_GROUP_ICON`
pub const RT_GROUP_ICON: u32 = 14;

const TABLE_LEN: usize = 16;
const ENTRY_LEN: usize = 8;
const DATA_ENTRY_LEN: usize = 16;
const HIGH_BIT: u32 = 0x8000_0000;
const MAX_DEPTH: usize = 8;

/// Key of a directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    /// Named entry.
    Name(String),
    /// Numeric entry.
    Id(u32),
}

impl ResourceId {
    /// Named entries sort before numeric ones; names keep their relative order.
    fn sort_key(&self) -> (u8, u32) {
        match self {
            ResourceId::Name(_) => (0, 0),
            ResourceId::Id(id) => (1, *id),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Name(name) => write!(f, "{name:?}"),
            ResourceId::Id(id) => write!(f, "#{id}"),
        }
    }
}

/// Leaf payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceData {
    /// Raw resource bytes.
    pub data: Vec<u8>,
    /// Code page annotation.
    pub code_page: u32,
}

/// What an entry points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceNode {
    /// Nested table.
    Directory(ResourceDirectory),
    /// Leaf.
    Data(ResourceData),
}

/// One row of a directory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Key.
    pub id: ResourceId,
    /// Target.
    pub node: ResourceNode,
}

/// One directory table and everything below it.
///
/// Entries are always kept in on-disk order: named entries first, then
/// numeric ids ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDirectory {
    /// Reserved flags, preserved as read.
    pub characteristics: u32,
    /// Time stamp, preserved as read.
    pub time_date_stamp: u32,
    /// Major version, preserved as read.
    pub major_version: u16,
    /// Minor version, preserved as read.
    pub minor_version: u16,
    entries: Vec<ResourceEntry>,
}

impl Default for ResourceDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceDirectory {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            characteristics: 0,
            time_date_stamp: 0,
            major_version: 4,
            minor_version: 0,
            entries: Vec::new(),
        }
    }

    /// Table holding a single language leaf.
    pub fn leaf(language: u32, data: ResourceData) -> Self {
        let mut directory = Self::new();
        directory.entries.push(ResourceEntry {
            id: ResourceId::Id(language),
            node: ResourceNode::Data(data),
        });
        directory
    }

    /// Entries in on-disk order.
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Node stored under `id`.
    pub fn get(&self, id: &ResourceId) -> Option<&ResourceNode> {
        self.entries
            .iter()
            .find(|entry| &entry.id == id)
            .map(|entry| &entry.node)
    }

    /// Nested table stored under `id`.
    pub fn get_directory(&self, id: &ResourceId) -> Option<&ResourceDirectory> {
        match self.get(id) {
            Some(ResourceNode::Directory(directory)) => Some(directory),
            _ => None,
        }
    }

    /// Largest numeric id in this table.
    pub fn max_id(&self) -> Option<u32> {
        self.entries
            .iter()
            .filter_map(|entry| match entry.id {
                ResourceId::Id(id) => Some(id),
                ResourceId::Name(_) => None,
            })
            .max()
    }

    /// Adds a new entry.
    ///
    /// # Errors
    ///
    /// [`Error::IconPatch`] if an entry with the same key already exists.
    pub fn insert(&mut self, id: ResourceId, node: ResourceNode) -> Result<()> {
        if self.get(&id).is_some() {
            return Err(Error::IconPatch(format!("resource {id} already exists")));
        }
        self.entries.push(ResourceEntry { id, node });
        self.sort_entries();
        Ok(())
    }

    /// Nested table under `id`, created empty if absent.
    ///
    /// # Errors
    ///
    /// [`Error::IconPatch`] if `id` holds a leaf.
    pub fn directory_or_insert(&mut self, id: ResourceId) -> Result<&mut ResourceDirectory> {
        if self.get(&id).is_none() {
            self.insert(id.clone(), ResourceNode::Directory(ResourceDirectory::new()))?;
        }
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| &mut entry.node)
        {
            Some(ResourceNode::Directory(directory)) => Ok(directory),
            _ => Err(Error::IconPatch(format!("resource {id} is not a directory"))),
        }
    }

    fn sort_entries(&mut self) {
        self.entries.sort_by_key(|entry| entry.id.sort_key());
    }

    /// Reads a tree.
    ///
    /// `dir` starts at the root table; name and table offsets are relative
    /// to it. `read_data` returns the bytes of a leaf given its RVA and size.
    pub fn parse(dir: &[u8], read_data: &dyn Fn(u32, u32) -> Option<Vec<u8>>) -> Result<Self> {
        Self::parse_at(dir, 0, read_data, 0)
    }

    fn parse_at(
        dir: &[u8],
        offset: usize,
        read_data: &dyn Fn(u32, u32) -> Option<Vec<u8>>,
        depth: usize,
    ) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(Error::IconPatch("resource directory nests too deep".into()));
        }

        let named = read_u16(dir, offset + 12)? as usize;
        let ids = read_u16(dir, offset + 14)? as usize;
        let mut entries = Vec::with_capacity(named + ids);

        for index in 0..named + ids {
            let at = offset + TABLE_LEN + index * ENTRY_LEN;
            let name = read_u32(dir, at)?;
            let target = read_u32(dir, at + 4)?;

            let id = if name & HIGH_BIT != 0 {
                ResourceId::Name(read_name(dir, (name & !HIGH_BIT) as usize)?)
            } else {
                ResourceId::Id(name)
            };

            let node = if target & HIGH_BIT != 0 {
                ResourceNode::Directory(Self::parse_at(
                    dir,
                    (target & !HIGH_BIT) as usize,
                    read_data,
                    depth + 1,
                )?)
            } else {
                let at = target as usize;
                let rva = read_u32(dir, at)?;
                let size = read_u32(dir, at + 4)?;
                let code_page = read_u32(dir, at + 8)?;
                let data = read_data(rva, size).ok_or_else(|| {
                    Error::IconPatch(format!("resource {id} points outside the image"))
                })?;
                ResourceNode::Data(ResourceData { data, code_page })
            };

            entries.push(ResourceEntry { id, node });
        }

        let mut directory = Self {
            characteristics: read_u32(dir, offset)?,
            time_date_stamp: read_u32(dir, offset + 4)?,
            major_version: read_u16(dir, offset + 8)?,
            minor_version: read_u16(dir, offset + 10)?,
            entries,
        };
        directory.sort_entries();
        Ok(directory)
    }

    /// Writes the tree for placement at `base_rva`.
    pub fn serialize(&self, base_rva: u32) -> Result<Vec<u8>> {
        let mut dirs: Vec<&ResourceDirectory> = vec![self];
        let mut next = 0;
        while next < dirs.len() {
            let dir = dirs[next];
            dirs.extend(dir.entries.iter().filter_map(|entry| match &entry.node {
                ResourceNode::Directory(child) => Some(child),
                ResourceNode::Data(_) => None,
            }));
            next += 1;
        }

        let mut cursor = 0;
        let mut dir_offsets = Vec::with_capacity(dirs.len());
        for dir in &dirs {
            dir_offsets.push(cursor);
            cursor += TABLE_LEN + ENTRY_LEN * dir.entries.len();
        }

        let mut names: Vec<(usize, Vec<u16>)> = Vec::new();
        let mut leaves: Vec<&ResourceData> = Vec::new();
        for dir in &dirs {
            for entry in &dir.entries {
                if let ResourceId::Name(name) = &entry.id {
                    let units: Vec<u16> = name.encode_utf16().collect();
                    let len = units.len();
                    names.push((cursor, units));
                    cursor += 2 + 2 * len;
                }
                if let ResourceNode::Data(data) = &entry.node {
                    leaves.push(data);
                }
            }
        }

        cursor = align(cursor, 4);
        let data_entries = cursor;
        cursor += DATA_ENTRY_LEN * leaves.len();

        let mut blob_offsets = Vec::with_capacity(leaves.len());
        for leaf in &leaves {
            cursor = align(cursor, 8);
            blob_offsets.push(cursor);
            cursor += leaf.data.len();
        }

        let total = u32::try_from(cursor)
            .ok()
            .filter(|total| base_rva.checked_add(*total).is_some())
            .ok_or_else(|| Error::IconPatch("resource section too large".into()))?;
        log::trace!(
            "Serializing {} tables, {} names, {} leaves ({} bytes)",
            dirs.len(),
            names.len(),
            leaves.len(),
            total
        );

        let mut out = vec![0u8; cursor];
        let (mut child, mut name_index, mut leaf_index) = (1, 0, 0);

        for (dir, &offset) in dirs.iter().zip(&dir_offsets) {
            let named = dir
                .entries
                .iter()
                .filter(|entry| matches!(entry.id, ResourceId::Name(_)))
                .count();
            let ids = dir.entries.len() - named;
            put_u32(&mut out, offset, dir.characteristics);
            put_u32(&mut out, offset + 4, dir.time_date_stamp);
            put_u16(&mut out, offset + 8, dir.major_version);
            put_u16(&mut out, offset + 10, dir.minor_version);
            put_u16(&mut out, offset + 12, count_u16(named)?);
            put_u16(&mut out, offset + 14, count_u16(ids)?);

            for (index, entry) in dir.entries.iter().enumerate() {
                let at = offset + TABLE_LEN + index * ENTRY_LEN;

                let name_field = match &entry.id {
                    ResourceId::Name(_) => {
                        let (name_offset, units) = &names[name_index];
                        name_index += 1;
                        put_u16(&mut out, *name_offset, count_u16(units.len())?);
                        for (i, unit) in units.iter().enumerate() {
                            put_u16(&mut out, name_offset + 2 + 2 * i, *unit);
                        }
                        HIGH_BIT | *name_offset as u32
                    }
                    ResourceId::Id(id) => *id,
                };

                let target_field = match &entry.node {
                    ResourceNode::Directory(_) => {
                        let target = dir_offsets[child];
                        child += 1;
                        HIGH_BIT | target as u32
                    }
                    ResourceNode::Data(_) => {
                        let leaf = leaves[leaf_index];
                        let blob = blob_offsets[leaf_index];
                        let target = data_entries + leaf_index * DATA_ENTRY_LEN;
                        leaf_index += 1;

                        put_u32(&mut out, target, base_rva + blob as u32);
                        put_u32(&mut out, target + 4, leaf.data.len() as u32);
                        put_u32(&mut out, target + 8, leaf.code_page);
                        out[blob..blob + leaf.data.len()].copy_from_slice(&leaf.data);
                        target as u32
                    }
                };

                put_u32(&mut out, at, name_field);
                put_u32(&mut out, at + 4, target_field);
            }
        }

        Ok(out)
    }
}

fn align(value: usize, to: usize) -> usize {
    value.div_ceil(to) * to
}

fn count_u16(count: usize) -> Result<u16> {
    u16::try_from(count).map_err(|_| Error::IconPatch("too many resource entries".into()))
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(truncated)
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(truncated)
}

fn read_name(bytes: &[u8], at: usize) -> Result<String> {
    let len = read_u16(bytes, at)? as usize;
    let units = (0..len)
        .map(|i| read_u16(bytes, at + 2 + 2 * i))
        .collect::<Result<Vec<u16>>>()?;
    String::from_utf16(&units).map_err(|_| Error::IconPatch("resource name is not UTF-16".into()))
}

fn truncated() -> Error {
    Error::IconPatch("truncated resource directory".into())
}

fn put_u16(out: &mut [u8], at: usize, value: u16) {
    out[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
