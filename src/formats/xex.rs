//! XEX2 - Xbox 360 executable header.
//!
//! Only the parts needed to identify a title are parsed. All integers are
//! big-endian.
//!
//! ## Header
//! ```text
//! [0x00] Magic "XEX2"                 (4 bytes)
//! [0x04] ModuleFlags                  (u32 BE)
//! [0x08] CodeOffset (PE data offset)  (u32 BE)
//! [0x0C] Reserved                     (u32)
//! [0x10] CertificateOffset            (u32 BE)
//! [0x14] FieldCount                   (u32 BE)
//! [0x18] Fields                       (FieldCount × 8 bytes)
//! ```
//!
//! ## Field (8 bytes)
//! ```text
//! [0x00] FieldId  (u32 BE)
//! [0x04] Value    (u32 BE) - inline data, or an offset from the header start
//! ```
//!
//! ## Execution info (field `0x00000406`, 24 bytes)
//! ```text
//! [0x00] MediaId         (4 bytes)
//! [0x04] Version         (u32 BE)
//! [0x08] BaseVersion     (u32 BE)
//! [0x0C] TitleId         (4 bytes)
//! [0x10] Platform        (u8)
//! [0x11] ExecutableType  (u8)
//! [0x12] DiscNumber      (u8)
//! [0x13] DiscCount       (u8)
//! [0x14] SavegameId      (u32 BE)
//! ```

use std::io::{Read, Seek, SeekFrom};

use crate::utils::{be_u32, bytesa, has_magic, u8};
use crate::{Error, Result};

/// Module flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleFlags(pub u32);

impl ModuleFlags {
    pub const TITLE_MODULE: Self = Self(0x01);
    pub const EXPORTS_TO_TITLE: Self = Self(0x02);
    pub const SYSTEM_DEBUGGER: Self = Self(0x04);
    pub const DLL_MODULE: Self = Self(0x08);
    pub const MODULE_PATCH: Self = Self(0x10);
    pub const FULL_PATCH: Self = Self(0x20);
    pub const DELTA_PATCH: Self = Self(0x40);
    pub const USER_MODE: Self = Self(0x80);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Known header field identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FieldId {
    ResourceInfo = 0x0000_02FF,
    BaseFileFormat = 0x0000_03FF,
    BaseReference = 0x0000_0405,
    ExecutionInfo = 0x0000_0406,
}

impl TryFrom<u32> for FieldId {
    type Error = u32;
    fn try_from(v: u32) -> std::result::Result<Self, u32> {
        match v {
            0x0000_02FF => Ok(Self::ResourceInfo),
            0x0000_03FF => Ok(Self::BaseFileFormat),
            0x0000_0405 => Ok(Self::BaseReference),
            0x0000_0406 => Ok(Self::ExecutionInfo),
            other => Err(other),
        }
    }
}

/// Title identification taken from the execution-info field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionInfo {
    pub media_id: [u8; 4],
    pub version: u32,
    pub base_version: u32,
    pub title_id: [u8; 4],
    pub platform: u8,
    pub executable_type: u8,
    pub disc_number: u8,
    pub disc_count: u8,
    pub savegame_id: u32,
}

impl ExecutionInfo {
    /// Size of the on-disk record.
    pub const SIZE: usize = 0x18;

    fn parse<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            media_id: bytesa::<4>(r)?,
            version: be_u32(r)?,
            base_version: be_u32(r)?,
            title_id: bytesa::<4>(r)?,
            platform: u8(r)?,
            executable_type: u8(r)?,
            disc_number: u8(r)?,
            disc_count: u8(r)?,
            savegame_id: be_u32(r)?,
        })
    }
}

/// Header fields this crate understands. Everything else is skipped.
#[derive(Debug, Clone, Default)]
pub struct XexHeaderFields {
    pub execution_info: Option<ExecutionInfo>,
}

/// Parsed XEX2 header.
#[derive(Debug, Clone)]
pub struct XexHeader {
    pub module_flags: ModuleFlags,
    /// Offset of the PE image from the header start.
    pub code_offset: u32,
    /// Offset of the security info / certificate from the header start.
    pub certificate_offset: u32,
    pub fields: XexHeaderFields,
}

impl XexHeader {
    /// Parse an XEX2 header from `r`.
    ///
    /// The reader must be positioned at the magic; field offsets are resolved
    /// relative to that position. Returns [`Error::InvalidExecutableFormat`]
    /// if the magic is missing.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let base = r.stream_position()?;

        if !has_magic(r, b"XEX2")? {
            return Err(Error::InvalidExecutableFormat);
        }
        let module_flags = ModuleFlags(be_u32(r)?);
        let code_offset = be_u32(r)?;
        let _reserved = be_u32(r)?;
        let certificate_offset = be_u32(r)?;

        let mut fields = XexHeaderFields::default();
        let field_count = be_u32(r)?;
        for _ in 0..field_count {
            let key = be_u32(r)?;
            let value = be_u32(r)?;

            if let Ok(FieldId::ExecutionInfo) = FieldId::try_from(key) {
                let resume = r.stream_position()?;
                r.seek(SeekFrom::Start(base + value as u64))?;
                fields.execution_info = Some(ExecutionInfo::parse(r)?);
                r.seek(SeekFrom::Start(resume))?;
            }
        }

        Ok(Self {
            module_flags,
            code_offset,
            certificate_offset,
            fields,
        })
    }

    /// The execution-info field, or [`Error::Parse`] if the header had none.
    pub fn execution_info(&self) -> Result<&ExecutionInfo> {
        self.fields
            .execution_info
            .as_ref()
            .ok_or(Error::Parse("missing execution info"))
    }
}
