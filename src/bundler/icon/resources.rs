//! Icon images prepared for embedding as PE resources.

use crate::bundler::error::{Error, Result};
use std::io::Cursor;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
const BITMAPINFOHEADER_LEN: u32 = 40;
const GROUP_HEADER_LEN: usize = 6;
const GROUP_ENTRY_LEN: usize = 14;

/// One `RT_ICON` payload and the facts its group entry needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconResource {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels (the bitmap header declares twice this for the mask).
    pub height: u32,
    /// Color planes.
    pub planes: u16,
    /// Bits per pixel.
    pub bit_count: u16,
    /// Raw image bytes, stored verbatim as the resource.
    pub data: Vec<u8>,
}

impl IconResource {
    /// Describes one ICO payload.
    ///
    /// PNG payloads take the directory's dimensions with 1 plane at 32 bpp.
    /// Bitmap payloads are described by their `BITMAPINFOHEADER`.
    pub fn from_payload(dir_width: u32, dir_height: u32, data: Vec<u8>) -> Result<Self> {
        if data.starts_with(&PNG_SIGNATURE) {
            return Ok(Self {
                width: dir_width,
                height: dir_height,
                planes: 1,
                bit_count: 32,
                data,
            });
        }

        let header_len = read_u32(&data, 0)?;
        if header_len < BITMAPINFOHEADER_LEN {
            return Err(Error::IconPatch(format!(
                "icon bitmap header is {header_len} bytes"
            )));
        }
        Ok(Self {
            width: (read_u32(&data, 4)? as i32).unsigned_abs(),
            height: (read_u32(&data, 8)? as i32).unsigned_abs() / 2,
            planes: read_u16(&data, 12)?,
            bit_count: read_u16(&data, 14)?,
            data,
        })
    }
}

/// Ordered icon images plus the group directory describing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconResourceSet {
    /// Images in ICO order.
    pub images: Vec<IconResource>,
}

impl IconResourceSet {
    /// Decodes every entry of an ICO file.
    pub fn from_ico(bytes: &[u8]) -> Result<Self> {
        let dir = ico::IconDir::read(Cursor::new(bytes))
            .map_err(|e| Error::IconPatch(format!("reading ICO: {e}")))?;
        let images = dir
            .entries()
            .iter()
            .map(|entry| IconResource::from_payload(entry.width(), entry.height(), entry.data().to_vec()))
            .collect::<Result<Vec<_>>>()?;
        if images.is_empty() {
            return Err(Error::IconPatch("ICO file holds no images".into()));
        }
        Ok(Self { images })
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// True when there is nothing to embed.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// `GRPICONDIR` payload whose entries reference `RT_ICON` ids
    /// `first_id`, `first_id + 1`, ... in image order.
    ///
    /// Dimensions of 256 and above are written as 0.
    pub fn group_directory(&self, first_id: u16) -> Result<Vec<u8>> {
        let count = u16::try_from(self.images.len())
            .map_err(|_| Error::IconPatch("too many icon images".into()))?;
        let mut out = Vec::with_capacity(GROUP_HEADER_LEN + GROUP_ENTRY_LEN * self.images.len());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());

        for (index, image) in self.images.iter().enumerate() {
            let id = u16::try_from(index)
                .ok()
                .and_then(|index| first_id.checked_add(index))
                .ok_or_else(|| Error::IconPatch("icon ids exhausted".into()))?;
            let bytes = u32::try_from(image.data.len())
                .map_err(|_| Error::IconPatch("icon image too large".into()))?;

            out.push(dimension_byte(image.width));
            out.push(dimension_byte(image.height));
            out.push(0); // color count
            out.push(0); // reserved
            out.extend_from_slice(&image.planes.to_le_bytes());
            out.extend_from_slice(&image.bit_count.to_le_bytes());
            out.extend_from_slice(&bytes.to_le_bytes());
            out.extend_from_slice(&id.to_le_bytes());
        }
        Ok(out)
    }
}

fn dimension_byte(value: u32) -> u8 {
    u8::try_from(value).unwrap_or(0)
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| Error::IconPatch("truncated icon image".into()))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::IconPatch("truncated icon image".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(width: i32, height: i32, bit_count: u16, pixels: usize) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&40u32.to_le_bytes());
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&(height * 2).to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&bit_count.to_le_bytes());
        data.resize(40 + pixels, 0xaa);
        data
    }

    #[test]
    fn test_bitmap_height_is_halved() {
        let image = IconResource::from_payload(32, 32, bitmap(32, 32, 32, 16)).unwrap();
        assert_eq!((image.width, image.height), (32, 32));
        assert_eq!((image.planes, image.bit_count), (1, 32));
        assert_eq!(image.data.len(), 56);
    }

    #[test]
    fn test_png_payload_uses_directory_size() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(b"rest");
        let image = IconResource::from_payload(256, 256, png).unwrap();
        assert_eq!((image.width, image.height, image.planes, image.bit_count), (256, 256, 1, 32));
    }

    #[test]
    fn test_group_directory_layout() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&[0; 4]);
        let set = IconResourceSet {
            images: vec![
                IconResource::from_payload(16, 16, bitmap(16, 16, 8, 4)).unwrap(),
                IconResource::from_payload(256, 256, png).unwrap(),
            ],
        };

        let group = set.group_directory(5).unwrap();
        assert_eq!(group.len(), 6 + 2 * 14);
        assert_eq!(&group[..6], &[0, 0, 1, 0, 2, 0]);

        let first = &group[6..20];
        assert_eq!(&first[..4], &[16, 16, 0, 0]);
        assert_eq!(u16::from_le_bytes([first[4], first[5]]), 1);
        assert_eq!(u16::from_le_bytes([first[6], first[7]]), 8);
        assert_eq!(u32::from_le_bytes([first[8], first[9], first[10], first[11]]), 44);
        assert_eq!(u16::from_le_bytes([first[12], first[13]]), 5);

        let second = &group[20..34];
        assert_eq!(&second[..2], &[0, 0]);
        assert_eq!(u16::from_le_bytes([second[12], second[13]]), 6);
    }

    #[test]
    fn test_from_ico_reads_every_entry() {
        let mut dir = ico::IconDir::new(ico::ResourceType::Icon);
        for size in [16, 32] {
            let image = ico::IconImage::from_rgba_data(size, size, vec![0x80; (size * size * 4) as usize]);
            dir.add_entry(ico::IconDirEntry::encode(&image).unwrap());
        }
        let mut bytes = Vec::new();
        dir.write(&mut bytes).unwrap();

        let set = IconResourceSet::from_ico(&bytes).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.images[0].width, 16);
        assert_eq!(set.images[1].height, 32);
    }

    #[test]
    fn test_truncated_bitmap() {
        assert!(IconResource::from_payload(16, 16, vec![40, 0, 0]).is_err());
    }
}
