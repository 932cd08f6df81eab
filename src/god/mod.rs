//! Games on Demand (GOD) container writer.
//!
//! A GOD package is a CON/LIVE-style header file plus a directory of data
//! parts (`Data0000`, `Data0001`, ...). Each part is a two-level SHA1 hash
//! tree over 4 KiB blocks:
//!
//! ```text
//! part
//! ├── master hash page            (one digest per subpart page)
//! ├── subpart 0
//! │   ├── subpart hash page       (one digest per block)
//! │   └── blocks 0..204
//! ├── subpart 1
//! │   └── ...
//! └── ... up to 203 subparts
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`hash_list`]  | 4 KiB pages of SHA1 digests |
//! | [`part`]       | Streams one part file, backpatching its hash pages |
//! | [`con_header`] | Fixed-offset header with its own integrity hash |
//! | [`layout`]     | Directory and file naming |

pub mod con_header;
pub mod hash_list;
pub mod layout;
pub mod part;

pub use con_header::{CON_HEADER_SIZE, ConHeader, ConHeaderBuilder};
pub use hash_list::HashList;
pub use layout::FileLayout;
pub use part::{PartSummary, write_part, write_part_with};

/// Size of one data block.
pub const BLOCK_SIZE: usize = 0x1000;

/// Size of one serialized hash page.
pub const HASH_PAGE_SIZE: usize = 0x1000;

/// Size of one SHA1 digest.
pub const DIGEST_SIZE: usize = 20;

/// Data blocks covered by one subpart hash page.
pub const BLOCKS_PER_SUBPART: u64 = 0xCC;

/// Subparts in a full part.
pub const SUBPARTS_PER_PART: u64 = 0xCB;

/// Data blocks in a full part (41,412).
pub const BLOCKS_PER_PART: u64 = BLOCKS_PER_SUBPART * SUBPARTS_PER_PART;

/// On-disk size of a full part: all hash pages plus all data blocks.
pub const MAX_PART_SIZE: u64 = (1 + SUBPARTS_PER_PART + BLOCKS_PER_PART) * BLOCK_SIZE as u64;

/// Content type code stored in the header and used as a path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ContentType {
    /// Xbox 360 disc title repackaged as Games on Demand.
    GamesOnDemand = 0x0000_7000,
    /// Original Xbox title.
    XboxOriginal = 0x0000_5000,
}

impl ContentType {
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ContentType {
    type Error = crate::Error;
    fn try_from(v: u32) -> crate::Result<Self> {
        match v {
            0x0000_7000 => Ok(Self::GamesOnDemand),
            0x0000_5000 => Ok(Self::XboxOriginal),
            _ => Err(crate::Error::Parse("unknown content type")),
        }
    }
}

/// SHA1 of `data`.
#[inline]
pub(crate) fn sha1(data: &[u8]) -> [u8; DIGEST_SIZE] {
    sha1_smol::Sha1::from(data).digest().bytes()
}
