//! PE image layout: headers, section table and resource placement.

use crate::bundler::error::{Error, Result};

/// Optional-header offsets shared by PE32 and PE32+.
const OPT_SIZE_OF_IMAGE: usize = 56;
const OPT_SIZE_OF_HEADERS: usize = 60;
const OPT_CHECKSUM: usize = 64;

const PE32_MAGIC: u16 = 0x10b;
const PE32_PLUS_MAGIC: u16 = 0x20b;

const SECTION_HEADER_LEN: usize = 40;

/// Data directory slots.
pub const DIR_RESOURCE: usize = 2;
pub const DIR_CERTIFICATE: usize = 4;

/// `IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_READ`
const RSRC_CHARACTERISTICS: u32 = 0x4000_0040;

/// One section header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// File offset of the 40-byte header.
    pub header_offset: usize,
    /// Raw 8-byte name.
    pub name: [u8; 8],
    /// VirtualSize.
    pub virtual_size: u32,
    /// VirtualAddress.
    pub virtual_address: u32,
    /// SizeOfRawData.
    pub size_of_raw_data: u32,
    /// PointerToRawData.
    pub pointer_to_raw_data: u32,
}

impl Section {
    fn virtual_end(&self) -> u32 {
        self.virtual_address
            .saturating_add(self.virtual_size.max(self.size_of_raw_data))
    }

    fn raw_end(&self) -> usize {
        self.pointer_to_raw_data as usize + self.size_of_raw_data as usize
    }

    fn contains_rva(&self, rva: u32) -> bool {
        rva >= self.virtual_address && rva < self.virtual_end()
    }
}

/// Header facts needed to relocate the resource directory.
#[derive(Debug, Clone)]
pub struct PeLayout {
    optional_header: usize,
    data_directories: usize,
    data_directory_count: u32,
    section_table: usize,
    section_alignment: u32,
    file_alignment: u32,
    size_of_headers: u32,
    /// Sections in table order.
    pub sections: Vec<Section>,
}

impl PeLayout {
    /// Reads headers and the section table of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if !matches!(goblin::peek_bytes(&peek_window(bytes)?)?, goblin::Hint::PE) {
            return Err(Error::IconPatch("launcher is not a PE image".into()));
        }

        let header = goblin::pe::header::Header::parse(bytes)?;
        if header.optional_header.is_none() {
            return Err(Error::IconPatch("PE image has no optional header".into()));
        }

        let optional_header = header.dos_header.pe_pointer as usize + 4 + 20;
        let section_table =
            optional_header + header.coff_header.size_of_optional_header as usize;

        let (data_directories, count_offset) = match read_u16(bytes, optional_header)? {
            PE32_MAGIC => (optional_header + 96, optional_header + 92),
            PE32_PLUS_MAGIC => (optional_header + 112, optional_header + 108),
            magic => {
                return Err(Error::IconPatch(format!(
                    "unknown optional header magic {magic:#x}"
                )));
            }
        };

        let mut sections = Vec::with_capacity(header.coff_header.number_of_sections as usize);
        for index in 0..header.coff_header.number_of_sections as usize {
            let at = section_table + index * SECTION_HEADER_LEN;
            let mut name = [0u8; 8];
            name.copy_from_slice(bytes.get(at..at + 8).ok_or_else(truncated)?);
            sections.push(Section {
                header_offset: at,
                name,
                virtual_size: read_u32(bytes, at + 8)?,
                virtual_address: read_u32(bytes, at + 12)?,
                size_of_raw_data: read_u32(bytes, at + 16)?,
                pointer_to_raw_data: read_u32(bytes, at + 20)?,
            });
        }

        Ok(Self {
            optional_header,
            data_directories,
            data_directory_count: read_u32(bytes, count_offset)?,
            section_table,
            section_alignment: read_u32(bytes, optional_header + 32)?,
            file_alignment: read_u32(bytes, optional_header + 36)?.max(1),
            size_of_headers: read_u32(bytes, optional_header + OPT_SIZE_OF_HEADERS)?,
            sections,
        })
    }

    /// `(rva, size)` of data directory `index`, zero when absent.
    pub fn data_directory(&self, bytes: &[u8], index: usize) -> Result<(u32, u32)> {
        if index as u32 >= self.data_directory_count {
            return Ok((0, 0));
        }
        let at = self.data_directories + index * 8;
        Ok((read_u32(bytes, at)?, read_u32(bytes, at + 4)?))
    }

    /// Section containing `rva`.
    pub fn section_for(&self, rva: u32) -> Option<&Section> {
        self.sections.iter().find(|section| section.contains_rva(rva))
    }

    /// File offset of `rva`, when it is backed by raw data.
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        let section = self.section_for(rva)?;
        let delta = rva - section.virtual_address;
        (delta < section.size_of_raw_data)
            .then(|| section.pointer_to_raw_data as usize + delta as usize)
    }

    /// `size` bytes at `rva`, when fully backed by raw data.
    pub fn read_rva<'a>(&self, bytes: &'a [u8], rva: u32, size: u32) -> Option<&'a [u8]> {
        let start = self.rva_to_offset(rva)?;
        let section = self.section_for(rva)?;
        let end = start.checked_add(size as usize)?;
        if end > section.raw_end() {
            return None;
        }
        bytes.get(start..end)
    }

    /// End of the last section's raw data; anything after it is overlay.
    fn raw_end(&self) -> usize {
        self.sections
            .iter()
            .filter(|section| section.size_of_raw_data > 0)
            .map(Section::raw_end)
            .max()
            .unwrap_or(self.size_of_headers as usize)
    }

    fn virtual_end(&self) -> u32 {
        self.sections
            .iter()
            .map(Section::virtual_end)
            .max()
            .unwrap_or(self.size_of_headers)
    }

    /// Where the resource blob will live.
    ///
    /// Rewrites the existing section when it holds the directory at its
    /// start and is the last section both in memory and on disk. Otherwise
    /// a new section is appended.
    pub fn plan(&self, resource_rva: u32) -> Placement {
        let last = self
            .sections
            .iter()
            .enumerate()
            .max_by_key(|(_, section)| section.virtual_address);
        if let Some((index, section)) = last {
            let last_on_disk = section.raw_end() >= self.raw_end();
            if resource_rva != 0 && section.virtual_address == resource_rva && last_on_disk {
                return Placement::InPlace { index };
            }
        }
        Placement::Append {
            rva: align(self.virtual_end(), self.section_alignment),
        }
    }

    /// Address the resource blob is loaded at for `placement`.
    pub fn placement_rva(&self, placement: Placement) -> u32 {
        match placement {
            Placement::InPlace { index } => self.sections[index].virtual_address,
            Placement::Append { rva } => rva,
        }
    }

    /// Writes `blob` at `placement` and fixes up the headers.
    ///
    /// Overlay bytes after the last section are carried over unchanged.
    pub fn rebuild(&self, bytes: &[u8], placement: Placement, blob: &[u8]) -> Result<Vec<u8>> {
        let raw_len = align_usize(blob.len(), self.file_alignment as usize);
        let blob_len = u32::try_from(blob.len())
            .map_err(|_| Error::IconPatch("resource section too large".into()))?;
        let raw_size = u32::try_from(raw_len)
            .map_err(|_| Error::IconPatch("resource section too large".into()))?;

        let mut sections = self.sections.clone();
        let (mut out, overlay_start, rva) = match placement {
            Placement::InPlace { index } => {
                let section = &mut sections[index];
                let start = section.pointer_to_raw_data as usize;
                let overlay_start = section.raw_end();
                section.virtual_size = blob_len;
                section.size_of_raw_data = raw_size;
                let rva = section.virtual_address;
                (bytes.get(..start).ok_or_else(truncated)?.to_vec(), overlay_start, rva)
            }
            Placement::Append { rva } => {
                let header_offset = self.section_table + self.sections.len() * SECTION_HEADER_LEN;
                let first_raw = self
                    .sections
                    .iter()
                    .filter(|section| section.pointer_to_raw_data > 0)
                    .map(|section| section.pointer_to_raw_data as usize)
                    .min()
                    .unwrap_or(self.size_of_headers as usize);
                if header_offset + SECTION_HEADER_LEN > (self.size_of_headers as usize).min(first_raw) {
                    return Err(Error::IconPatch(
                        "no room in the headers for another section".into(),
                    ));
                }

                let overlay_start = self.raw_end().min(bytes.len());
                let pointer = align_usize(overlay_start, self.file_alignment as usize);
                let mut out = bytes[..overlay_start].to_vec();
                out.resize(pointer, 0);

                sections.push(Section {
                    header_offset,
                    name: *b".rsrc\0\0\0",
                    virtual_size: blob_len,
                    virtual_address: rva,
                    size_of_raw_data: raw_size,
                    pointer_to_raw_data: u32::try_from(pointer)
                        .map_err(|_| Error::IconPatch("image too large".into()))?,
                });
                (out, overlay_start, rva)
            }
        };

        out.extend_from_slice(blob);
        out.resize(out.len() + (raw_len - blob.len()), 0);
        if let Some(overlay) = bytes.get(overlay_start..) {
            out.extend_from_slice(overlay);
        }

        // Section table.
        if let Placement::Append { .. } = placement {
            let count_at = self.optional_header - 20 + 2;
            put_u16(&mut out, count_at, u16::try_from(sections.len()).map_err(|_| {
                Error::IconPatch("too many sections".into())
            })?)?;
        }
        for section in &sections {
            let at = section.header_offset;
            if let Some(header) = out.get_mut(at..at + 8) {
                header.copy_from_slice(&section.name);
            }
            put_u32(&mut out, at + 8, section.virtual_size)?;
            put_u32(&mut out, at + 12, section.virtual_address)?;
            put_u32(&mut out, at + 16, section.size_of_raw_data)?;
            put_u32(&mut out, at + 20, section.pointer_to_raw_data)?;
        }
        if let (Placement::Append { .. }, Some(added)) = (placement, sections.last()) {
            let at = added.header_offset;
            out.get_mut(at + 24..at + 36)
                .ok_or_else(truncated)?
                .fill(0);
            put_u32(&mut out, at + 36, RSRC_CHARACTERISTICS)?;
        }

        // Resource data directory.
        if self.data_directory_count as usize <= DIR_RESOURCE {
            return Err(Error::IconPatch("image has no resource data directory slot".into()));
        }
        let dir_at = self.data_directories + DIR_RESOURCE * 8;
        put_u32(&mut out, dir_at, rva)?;
        put_u32(&mut out, dir_at + 4, blob_len)?;

        // SizeOfImage.
        let virtual_end = sections
            .iter()
            .map(Section::virtual_end)
            .max()
            .unwrap_or(self.size_of_headers);
        put_u32(
            &mut out,
            self.optional_header + OPT_SIZE_OF_IMAGE,
            align(virtual_end, self.section_alignment),
        )?;

        // Checksum last, over the final bytes.
        let checksum_at = self.optional_header + OPT_CHECKSUM;
        let checksum = pe_checksum(&out, checksum_at);
        put_u32(&mut out, checksum_at, checksum)?;

        Ok(out)
    }
}

/// Where a rebuilt resource blob goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Replace the raw data of section `index`.
    InPlace {
        /// Index into [`PeLayout::sections`].
        index: usize,
    },
    /// Add a new `.rsrc` section at `rva`.
    Append {
        /// Section-aligned address after every existing section.
        rva: u32,
    },
}

/// Optional-header checksum, skipping the checksum field at `checksum_at`.
pub fn pe_checksum(bytes: &[u8], checksum_at: usize) -> u32 {
    let mut sum: u64 = 0;
    for (index, chunk) in bytes.chunks(2).enumerate() {
        let offset = index * 2;
        if offset == checksum_at || offset == checksum_at + 2 {
            continue;
        }
        let word = match chunk {
            [lo, hi] => u16::from_le_bytes([*lo, *hi]),
            [lo] => *lo as u16,
            _ => 0,
        };
        sum += word as u64;
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum = (sum & 0xffff) + (sum >> 16);
    (sum as u32).wrapping_add(bytes.len() as u32)
}

fn peek_window(bytes: &[u8]) -> Result<[u8; 16]> {
    let mut window = [0u8; 16];
    window.copy_from_slice(bytes.get(..16).ok_or_else(truncated)?);
    Ok(window)
}

fn align(value: u32, to: u32) -> u32 {
    if to == 0 {
        value
    } else {
        value.div_ceil(to) * to
    }
}

fn align_usize(value: usize, to: usize) -> usize {
    value.div_ceil(to.max(1)) * to.max(1)
}

fn truncated() -> Error {
    Error::IconPatch("truncated PE image".into())
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

fn put_u16(out: &mut [u8], at: usize, value: u16) -> Result<()> {
    out.get_mut(at..at + 2)
        .ok_or_else(truncated)?
        .copy_from_slice(&value.to_le_bytes());
    Ok(())
}

fn put_u32(out: &mut [u8], at: usize, value: u32) -> Result<()> {
    out.get_mut(at..at + 4)
        .ok_or_else(truncated)?
        .copy_from_slice(&value.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_skips_its_own_field() {
        let mut bytes = vec![0u8; 128];
        bytes[0] = 0x01;
        let before = pe_checksum(&bytes, 64);
        bytes[64..68].copy_from_slice(&0xdead_beef_u32.to_le_bytes());
        assert_eq!(pe_checksum(&bytes, 64), before);
        assert_eq!(before, 1 + 128);
    }

    #[test]
    fn test_not_a_pe_image() {
        let err = PeLayout::parse(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0])
            .unwrap_err();
        assert!(matches!(err, Error::IconPatch(_) | Error::BinaryParseError(_)));
    }
}
