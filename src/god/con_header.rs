//! CON/LIVE-style header for a GOD package.
//!
//! The header is a fixed 0xB000-byte buffer. Every field lives at a fixed
//! offset listed in [`field`]; all multi-byte integers are big-endian.
//! After all fields are set, a SHA1 over [`field::HASHED_SPAN`] is stored in
//! [`field::HEADER_HASH`], so a consumer can recompute and compare it.
//!
//! ## Fields
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x032C | 0x14 | Header hash |
//! | 0x0344 | 0x04 | Content type |
//! | 0x0354 | 0x04 | Media ID |
//! | 0x0360 | 0x04 | Title ID |
//! | 0x0364 | 0x04 | Platform, executable type, disc number, disc count (each + `'0'`) |
//! | 0x037D | 0x14 | MHT hash |
//! | 0x0392 | 0x03 | Blocks allocated |
//! | 0x0395 | 0x02 | Blocks not allocated |
//! | 0x03A0 | 0x04 | Data part count |
//! | 0x03A4 | 0x08 | Data parts total size |
//! | 0x0411 | 0x80 | Display name (UTF-16 BE) |
//! | 0x1691 | 0x80 | Title name (UTF-16 BE) |
//! | 0x1712 | 0x04 | Thumbnail image size |
//! | 0x1716 | 0x04 | Title thumbnail image size |
//! | 0x171A | 0x4000 | Thumbnail image |
//! | 0x571A | 0x4000 | Title thumbnail image |

use std::ops::Range;

use super::{ContentType, DIGEST_SIZE, sha1};
use crate::formats::xex::ExecutionInfo;
use crate::utils::be_u16;
use crate::{Error, Result};

/// Total header size.
pub const CON_HEADER_SIZE: usize = 0xB000;

/// Icon stored when the caller supplies none.
const EMPTY_ICON: [u8; 20] = [0; 20];

/// A fixed byte range in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: usize,
    pub len: usize,
}

impl Field {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    #[inline]
    pub const fn end(self) -> usize {
        self.offset + self.len
    }

    #[inline]
    pub fn range(self) -> Range<usize> {
        self.offset..self.end()
    }

    /// Largest unsigned value the field holds as a big-endian integer.
    const fn max_uint(self) -> u64 {
        if self.len >= 8 {
            u64::MAX
        } else {
            (1u64 << (self.len * 8)) - 1
        }
    }

    fn put(self, buf: &mut [u8], bytes: &[u8]) {
        let region = &mut buf[self.range()];
        region.fill(0);
        region[..bytes.len()].copy_from_slice(bytes);
    }

    fn put_uint(self, buf: &mut [u8], value: u64) {
        let be = value.to_be_bytes();
        buf[self.range()].copy_from_slice(&be[8 - self.len..]);
    }

    fn get_uint(self, buf: &[u8]) -> u64 {
        let mut be = [0u8; 8];
        be[8 - self.len..].copy_from_slice(&buf[self.range()]);
        u64::from_be_bytes(be)
    }

    fn get<const N: usize>(self, buf: &[u8]) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&buf[self.offset..self.offset + N]);
        out
    }
}

/// Header field table.
pub mod field {
    use super::Field;

    pub const HEADER_HASH: Field = Field::new(0x032C, 0x14);
    pub const CONTENT_TYPE: Field = Field::new(0x0344, 0x04);
    pub const MEDIA_ID: Field = Field::new(0x0354, 0x04);
    pub const TITLE_ID: Field = Field::new(0x0360, 0x04);
    pub const DISC_INFO: Field = Field::new(0x0364, 0x04);
    pub const MHT_HASH: Field = Field::new(0x037D, 0x14);
    pub const BLOCKS_ALLOCATED: Field = Field::new(0x0392, 0x03);
    pub const BLOCKS_NOT_ALLOCATED: Field = Field::new(0x0395, 0x02);
    pub const DATA_PART_COUNT: Field = Field::new(0x03A0, 0x04);
    pub const DATA_PARTS_SIZE: Field = Field::new(0x03A4, 0x08);
    pub const DISPLAY_NAME: Field = Field::new(0x0411, 0x80);
    pub const TITLE_NAME: Field = Field::new(0x1691, 0x80);
    pub const THUMBNAIL_SIZE: Field = Field::new(0x1712, 0x04);
    pub const TITLE_THUMBNAIL_SIZE: Field = Field::new(0x1716, 0x04);
    pub const THUMBNAIL: Field = Field::new(0x171A, 0x4000);
    pub const TITLE_THUMBNAIL: Field = Field::new(0x571A, 0x4000);

    /// Region covered by [`HEADER_HASH`].
    pub const HASHED_SPAN: Field = Field::new(0x0344, 0xACBC);

    /// Single bytes cleared on finalize.
    pub const ZEROED: [usize; 3] = [0x035B, 0x035F, 0x0391];

    pub const ALL: [Field; 17] = [
        HEADER_HASH,
        CONTENT_TYPE,
        MEDIA_ID,
        TITLE_ID,
        DISC_INFO,
        MHT_HASH,
        BLOCKS_ALLOCATED,
        BLOCKS_NOT_ALLOCATED,
        DATA_PART_COUNT,
        DATA_PARTS_SIZE,
        DISPLAY_NAME,
        TITLE_NAME,
        THUMBNAIL_SIZE,
        TITLE_THUMBNAIL_SIZE,
        THUMBNAIL,
        TITLE_THUMBNAIL,
        HASHED_SPAN,
    ];
}

const _: () = {
    let mut i = 0;
    while i < field::ALL.len() {
        assert!(field::ALL[i].end() <= CON_HEADER_SIZE);
        i += 1;
    }
    assert!(field::HEADER_HASH.end() <= field::HASHED_SPAN.offset);
    assert!(field::HASHED_SPAN.end() == CON_HEADER_SIZE);
};

/// Longest title, in UTF-16 code units, that fits the name fields.
pub const MAX_TITLE_UNITS: usize = field::TITLE_NAME.len / 2;

/// Largest icon, in bytes, that fits the thumbnail fields.
pub const MAX_ICON_SIZE: usize = field::THUMBNAIL.len;

/// Assembles a header. Setters take the builder by value and hand it back;
/// [`finalize`](Self::finalize) consumes it, so a header is hashed once.
#[derive(Debug, Clone)]
pub struct ConHeaderBuilder {
    buffer: Vec<u8>,
}

impl Default for ConHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConHeaderBuilder {
    /// An all-zero header.
    pub fn new() -> Self {
        Self {
            buffer: vec![0u8; CON_HEADER_SIZE],
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        field::CONTENT_TYPE.put_uint(&mut self.buffer, content_type.code() as u64);
        self
    }

    /// `blocks_allocated` is stored in 24 bits; larger values fail with
    /// [`Error::FieldOverflow`].
    pub fn with_block_counts(
        mut self,
        blocks_allocated: u32,
        blocks_not_allocated: u16,
    ) -> Result<Self> {
        if blocks_allocated as u64 > field::BLOCKS_ALLOCATED.max_uint() {
            return Err(Error::FieldOverflow("blocks allocated"));
        }
        field::BLOCKS_ALLOCATED.put_uint(&mut self.buffer, blocks_allocated as u64);
        field::BLOCKS_NOT_ALLOCATED.put_uint(&mut self.buffer, blocks_not_allocated as u64);
        Ok(self)
    }

    pub fn with_data_parts_info(mut self, part_count: u32, parts_total_size: u64) -> Self {
        field::DATA_PART_COUNT.put_uint(&mut self.buffer, part_count as u64);
        field::DATA_PARTS_SIZE.put_uint(&mut self.buffer, parts_total_size);
        self
    }

    /// The four disc-info bytes are stored as ASCII digits (value + `'0'`).
    pub fn with_execution_info(mut self, exe_info: &ExecutionInfo) -> Self {
        let disc_info = [
            exe_info.platform.wrapping_add(b'0'),
            exe_info.executable_type.wrapping_add(b'0'),
            exe_info.disc_number.wrapping_add(b'0'),
            exe_info.disc_count.wrapping_add(b'0'),
        ];
        field::DISC_INFO.put(&mut self.buffer, &disc_info);
        field::TITLE_ID.put(&mut self.buffer, &exe_info.title_id);
        field::MEDIA_ID.put(&mut self.buffer, &exe_info.media_id);
        self
    }

    /// Store `png` in both thumbnail slots; `None` stores a 20-byte zero
    /// placeholder. Icons over [`MAX_ICON_SIZE`] fail with
    /// [`Error::FieldOverflow`].
    pub fn with_game_icon(mut self, png: Option<&[u8]>) -> Result<Self> {
        let png = png.unwrap_or(&EMPTY_ICON);
        if png.len() > MAX_ICON_SIZE {
            return Err(Error::FieldOverflow("game icon"));
        }
        let len = png.len() as u64;
        field::THUMBNAIL_SIZE.put_uint(&mut self.buffer, len);
        field::TITLE_THUMBNAIL_SIZE.put_uint(&mut self.buffer, len);
        field::THUMBNAIL.put(&mut self.buffer, png);
        field::TITLE_THUMBNAIL.put(&mut self.buffer, png);
        Ok(self)
    }

    /// Store `title` as UTF-16 BE in both name fields. Titles over
    /// [`MAX_TITLE_UNITS`] code units fail with [`Error::FieldOverflow`].
    pub fn with_game_title(mut self, title: &str) -> Result<Self> {
        let units: Vec<u16> = title.encode_utf16().collect();
        if units.len() > MAX_TITLE_UNITS {
            return Err(Error::FieldOverflow("game title"));
        }
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_be_bytes()).collect();
        field::DISPLAY_NAME.put(&mut self.buffer, &bytes);
        field::TITLE_NAME.put(&mut self.buffer, &bytes);
        Ok(self)
    }

    pub fn with_mht_hash(mut self, mht_hash: &[u8; DIGEST_SIZE]) -> Self {
        field::MHT_HASH.put(&mut self.buffer, mht_hash);
        self
    }

    /// Clear the reserved bytes, embed the header hash, and return the
    /// finished header.
    pub fn finalize(mut self) -> Vec<u8> {
        for offset in field::ZEROED {
            self.buffer[offset] = 0;
        }
        let digest = sha1(&self.buffer[field::HASHED_SPAN.range()]);
        field::HEADER_HASH.put(&mut self.buffer, &digest);
        self.buffer
    }
}

/// A header decoded through the same field table the builder writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConHeader {
    pub header_hash: [u8; DIGEST_SIZE],
    pub content_type: ContentType,
    pub media_id: [u8; 4],
    pub title_id: [u8; 4],
    pub platform: u8,
    pub executable_type: u8,
    pub disc_number: u8,
    pub disc_count: u8,
    pub mht_hash: [u8; DIGEST_SIZE],
    pub blocks_allocated: u32,
    pub blocks_not_allocated: u16,
    pub data_part_count: u32,
    pub data_parts_total_size: u64,
    pub game_title: String,
    pub icon: Vec<u8>,
}

impl ConHeader {
    /// Decode a finished header.
    ///
    /// Returns [`Error::UnexpectedEof`] for a short buffer and
    /// [`Error::Parse`] for an unknown content type or an icon size larger
    /// than its slot.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < CON_HEADER_SIZE {
            return Err(Error::UnexpectedEof);
        }

        let disc_info = field::DISC_INFO.get::<4>(buf);

        let icon_len = field::THUMBNAIL_SIZE.get_uint(buf) as usize;
        if icon_len > MAX_ICON_SIZE {
            return Err(Error::Parse("icon size exceeds its slot"));
        }
        let icon = buf[field::THUMBNAIL.offset..field::THUMBNAIL.offset + icon_len].to_vec();

        let mut name = &buf[field::TITLE_NAME.range()];
        let mut units = Vec::new();
        while let Ok(unit) = be_u16(&mut name) {
            if unit == 0 {
                break;
            }
            units.push(unit);
        }

        Ok(Self {
            header_hash: field::HEADER_HASH.get(buf),
            content_type: ContentType::try_from(field::CONTENT_TYPE.get_uint(buf) as u32)?,
            media_id: field::MEDIA_ID.get(buf),
            title_id: field::TITLE_ID.get(buf),
            platform: disc_info[0].wrapping_sub(b'0'),
            executable_type: disc_info[1].wrapping_sub(b'0'),
            disc_number: disc_info[2].wrapping_sub(b'0'),
            disc_count: disc_info[3].wrapping_sub(b'0'),
            mht_hash: field::MHT_HASH.get(buf),
            blocks_allocated: field::BLOCKS_ALLOCATED.get_uint(buf) as u32,
            blocks_not_allocated: field::BLOCKS_NOT_ALLOCATED.get_uint(buf) as u16,
            data_part_count: field::DATA_PART_COUNT.get_uint(buf) as u32,
            data_parts_total_size: field::DATA_PARTS_SIZE.get_uint(buf),
            game_title: String::from_utf16_lossy(&units),
            icon,
        })
    }

    /// Whether the embedded header hash matches the hashed span.
    pub fn verify(buf: &[u8]) -> Result<bool> {
        if buf.len() < CON_HEADER_SIZE {
            return Err(Error::UnexpectedEof);
        }
        let stored = field::HEADER_HASH.get::<DIGEST_SIZE>(buf);
        Ok(stored == sha1(&buf[field::HASHED_SPAN.range()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exe_info() -> ExecutionInfo {
        ExecutionInfo {
            media_id: [0x11, 0x22, 0x33, 0x44],
            version: 0,
            base_version: 0,
            title_id: [0x41, 0x56, 0x08, 0x12],
            platform: 2,
            executable_type: 0,
            disc_number: 1,
            disc_count: 1,
            savegame_id: 0,
        }
    }

    fn build() -> Vec<u8> {
        ConHeaderBuilder::new()
            .with_content_type(ContentType::GamesOnDemand)
            .with_block_counts(0x01_2345, 0x0678)
            .unwrap()
            .with_data_parts_info(2, 0x1_2345_6789)
            .with_execution_info(&exe_info())
            .with_game_icon(Some(&b"\x89PNG fake"[..]))
            .unwrap()
            .with_game_title("Halo 3")
            .unwrap()
            .with_mht_hash(&[0xAB; 20])
            .finalize()
    }

    #[test]
    fn writes_fields_at_fixed_offsets() {
        let h = build();
        assert_eq!(h.len(), CON_HEADER_SIZE);
        assert_eq!(&h[0x344..0x348], &[0x00, 0x00, 0x70, 0x00]);
        assert_eq!(&h[0x392..0x397], &[0x01, 0x23, 0x45, 0x06, 0x78]);
        assert_eq!(&h[0x3A0..0x3A4], &[0, 0, 0, 2]);
        assert_eq!(&h[0x3A4..0x3AC], &[0, 0, 0, 0x01, 0x23, 0x45, 0x67, 0x89]);
        assert_eq!(&h[0x364..0x368], b"2011");
        assert_eq!(&h[0x360..0x364], &[0x41, 0x56, 0x08, 0x12]);
        assert_eq!(&h[0x354..0x358], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(&h[0x37D..0x391], &[0xAB; 20]);
        assert_eq!(&h[0x411..0x415], &[0x00, b'H', 0x00, b'a']);
        assert_eq!(&h[0x1691..0x1695], &[0x00, b'H', 0x00, b'a']);
        assert_eq!(&h[0x1712..0x1716], &[0, 0, 0, 9]);
        assert_eq!(&h[0x1716..0x171A], &[0, 0, 0, 9]);
        assert_eq!(&h[0x171A..0x1723], b"\x89PNG fake");
        assert_eq!(&h[0x571A..0x5723], b"\x89PNG fake");
    }

    #[test]
    fn embedded_hash_covers_span() {
        let h = build();
        assert_eq!(&h[0x32C..0x340], &sha1(&h[0x344..0x344 + 0xACBC]));
        assert!(ConHeader::verify(&h).unwrap());
    }

    #[test]
    fn finalize_is_deterministic() {
        assert_eq!(build(), build());
    }

    #[test]
    fn changing_hashed_byte_changes_hash() {
        let a = build();
        let b = ConHeaderBuilder::new()
            .with_content_type(ContentType::GamesOnDemand)
            .with_block_counts(0x01_2345, 0x0678)
            .unwrap()
            .with_data_parts_info(2, 0x1_2345_6789)
            .with_execution_info(&exe_info())
            .with_game_icon(Some(&b"\x89PNG fakf"[..]))
            .unwrap()
            .with_game_title("Halo 3")
            .unwrap()
            .with_mht_hash(&[0xAB; 20])
            .finalize();
        assert_ne!(&a[0x32C..0x340], &b[0x32C..0x340]);

        let mut tampered = a.clone();
        tampered[0xAFFF] ^= 1;
        assert!(!ConHeader::verify(&tampered).unwrap());
    }

    #[test]
    fn finalize_clears_reserved_bytes() {
        let h = ConHeaderBuilder::new()
            .with_execution_info(&exe_info())
            .with_mht_hash(&[0xFF; 20])
            .finalize();
        assert_eq!(h[0x0391], 0);
        assert_eq!(h[0x035B], 0);
        assert_eq!(h[0x035F], 0);
    }

    #[test]
    fn missing_icon_uses_placeholder() {
        let h = ConHeaderBuilder::new()
            .with_content_type(ContentType::GamesOnDemand)
            .with_game_icon(None)
            .unwrap()
            .finalize();
        assert_eq!(&h[0x1712..0x1716], &[0, 0, 0, 20]);
        assert_eq!(ConHeader::parse(&h).unwrap().icon, vec![0u8; 20]);
    }

    #[test]
    fn rejects_oversized_values() {
        assert!(matches!(
            ConHeaderBuilder::new().with_block_counts(0x0100_0000, 0),
            Err(Error::FieldOverflow(_))
        ));
        assert!(matches!(
            ConHeaderBuilder::new()
                .with_game_icon(Some(vec![0u8; MAX_ICON_SIZE + 1].as_slice())),
            Err(Error::FieldOverflow(_))
        ));
        let long = "x".repeat(MAX_TITLE_UNITS + 1);
        assert!(matches!(
            ConHeaderBuilder::new().with_game_title(&long),
            Err(Error::FieldOverflow(_))
        ));
        assert!(ConHeaderBuilder::new().with_game_title(&long[1..]).is_ok());
    }

    #[test]
    fn parse_reads_back_builder_fields() {
        let h = ConHeader::parse(&build()).unwrap();
        assert_eq!(h.content_type, ContentType::GamesOnDemand);
        assert_eq!(h.media_id, exe_info().media_id);
        assert_eq!(h.title_id, exe_info().title_id);
        assert_eq!((h.platform, h.executable_type, h.disc_number, h.disc_count), (2, 0, 1, 1));
        assert_eq!(h.mht_hash, [0xAB; 20]);
        assert_eq!(h.blocks_allocated, 0x01_2345);
        assert_eq!(h.blocks_not_allocated, 0x0678);
        assert_eq!(h.data_part_count, 2);
        assert_eq!(h.data_parts_total_size, 0x1_2345_6789);
        assert_eq!(h.game_title, "Halo 3");
        assert_eq!(h.icon, b"\x89PNG fake");
    }

    #[test]
    fn parse_decodes_content_type() {
        let h = ConHeaderBuilder::new()
            .with_content_type(ContentType::XboxOriginal)
            .finalize();
        assert_eq!(&h[0x344..0x348], &[0x00, 0x00, 0x50, 0x00]);
        assert_eq!(ConHeader::parse(&h).unwrap().content_type, ContentType::XboxOriginal);

        let unset = ConHeaderBuilder::new().finalize();
        assert!(matches!(ConHeader::parse(&unset), Err(Error::Parse(_))));
    }

    #[test]
    fn parse_rejects_short_buffer() {
        assert!(matches!(ConHeader::parse(&[0u8; 16]), Err(Error::UnexpectedEof)));
    }
}
