//! Layout detection and the XDVDFS volume descriptor.
//!
//! ## Candidate layouts
//! | Variant | Root offset | Notes |
//! |---------|-------------|-------|
//! | XSF     | `0x0000000` | bare XDVDFS, no video partition |
//! | GDF     | `0xFD90000` | standard XGD2 redump layout |
//! | XGD3    | `0x2080000` | later discs with a smaller video partition |
//!
//! ## Volume descriptor (sector 0x20 past the root offset)
//! ```text
//! [0x00] Magic "MICROSOFT*XBOX*MEDIA"   (20 bytes)
//! [0x14] RootDirectorySector            (u32 LE)
//! [0x18] RootDirectorySize              (u32 LE)
//! [0x1C] ImageCreationTime (FILETIME)   (8 bytes)
//! [0x24] Reserved                       (0x7C8 bytes)
//! [0x7EC] Magic again                   (20 bytes)
//! ```

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::utils::{bytesa, has_magic, le_u32};
use crate::{Error, Result};

/// XDVDFS sector size in bytes.
pub const SECTOR_SIZE: u64 = 0x800;

/// Magic found at the start of the volume descriptor.
pub const MEDIA_MAGIC: &[u8; 20] = b"MICROSOFT*XBOX*MEDIA";

/// Sector (relative to the root offset) holding the volume descriptor.
pub(crate) const DESCRIPTOR_SECTOR: u64 = 0x20;

/// On-disk layout variant of an Xbox 360 disc image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoType {
    /// Bare filesystem starting at offset zero.
    Xsf,
    /// Standard game disc layout.
    Gdf,
    /// XGD3 disc layout.
    Xgd3,
}

impl IsoType {
    /// Order in which the layouts are tried. The first match wins, so this
    /// order decides between images where more than one offset carries the
    /// magic.
    pub const DETECTION_ORDER: [IsoType; 3] = [IsoType::Xsf, IsoType::Gdf, IsoType::Xgd3];

    /// Byte offset of the filesystem root within the image.
    pub fn root_offset(self) -> u64 {
        match self {
            IsoType::Xsf => 0,
            IsoType::Gdf => 0xFD9_0000,
            IsoType::Xgd3 => 0x208_0000,
        }
    }

    /// Absolute offset of this layout's volume descriptor.
    pub fn descriptor_offset(self) -> u64 {
        self.root_offset() + DESCRIPTOR_SECTOR * SECTOR_SIZE
    }

    /// Detect which layout `r` uses.
    ///
    /// Returns [`Error::NotAnXboxImage`] when no candidate matches. A
    /// candidate whose descriptor lies past the end of the image simply does
    /// not match.
    pub fn detect<R: Read + Seek>(r: &mut R) -> Result<Self> {
        for iso_type in Self::DETECTION_ORDER {
            r.seek(SeekFrom::Start(iso_type.descriptor_offset()))?;
            if has_magic(r, MEDIA_MAGIC)? {
                debug!(?iso_type, "matched volume magic");
                return Ok(iso_type);
            }
        }
        Err(Error::NotAnXboxImage)
    }
}

/// Parsed XDVDFS volume descriptor.
#[derive(Debug, Clone)]
pub struct VolumeDescriptor {
    /// Detected layout variant.
    pub iso_type: IsoType,
    /// Byte offset of the filesystem root within the image.
    pub root_offset: u64,
    /// Always [`SECTOR_SIZE`].
    pub sector_size: u64,
    /// The 20-byte magic as read.
    pub identifier: [u8; 20],
    /// First sector of the root directory table.
    pub root_dir_sector: u32,
    /// Size in bytes of the root directory table.
    pub root_dir_size: u32,
    /// Raw FILETIME of image creation.
    pub image_creation_time: [u8; 8],
    /// Bytes from the root offset to the end of the image.
    pub volume_size: u64,
    /// `volume_size / SECTOR_SIZE`.
    pub volume_sectors: u64,
}

impl VolumeDescriptor {
    /// Detect the layout and parse the volume descriptor.
    ///
    /// The reader may be at any position; it is left just past the
    /// descriptor fields.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let iso_type = IsoType::detect(r)?;
        let root_offset = iso_type.root_offset();

        let total_len = r.seek(SeekFrom::End(0))?;
        r.seek(SeekFrom::Start(iso_type.descriptor_offset()))?;

        let identifier = bytesa::<20>(r)?;
        let root_dir_sector = le_u32(r)?;
        let root_dir_size = le_u32(r)?;
        let image_creation_time = bytesa::<8>(r)?;

        let volume_size = total_len - root_offset;

        Ok(Self {
            iso_type,
            root_offset,
            sector_size: SECTOR_SIZE,
            identifier,
            root_dir_sector,
            root_dir_size,
            image_creation_time,
            volume_size,
            volume_sectors: volume_size / SECTOR_SIZE,
        })
    }

    /// Absolute byte offset of `sector`.
    #[inline]
    pub fn sector_offset(&self, sector: u32) -> u64 {
        self.root_offset + sector as u64 * self.sector_size
    }
}
