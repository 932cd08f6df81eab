//! XDVDFS directory tables.
//!
//! A table spans `ceil(size / 0x800)` sectors. Each sector holds a run of
//! entries; the run ends at an entry whose two subtree offsets are both
//! `0xFFFF` (unused space is filled with `0xFF`).
//!
//! ## Entry
//! ```text
//! [0x00] SubtreeLeft   (u16 LE, in 4-byte units)
//! [0x02] SubtreeRight  (u16 LE, in 4-byte units)
//! [0x04] Sector        (u32 LE)
//! [0x08] Size          (u32 LE)
//! [0x0C] Attributes    (u8)
//! [0x0D] NameLength    (u8)
//! [0x0E] Name          (NameLength bytes)
//!        Padding to the next 4-byte boundary
//! ```

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use super::volume::VolumeDescriptor;
use crate::utils::{bytesv, le_u16, le_u32, u8};
use crate::{Error, Result};

/// Deepest directory nesting a full-tree read will follow.
pub const MAX_DIRECTORY_DEPTH: usize = 32;

/// Fixed-size part of an entry, before the name.
const ENTRY_HEADER_SIZE: u64 = 0x0E;

/// End-of-sector marker in both subtree fields.
const SUBTREE_END: u16 = 0xFFFF;

/// File attribute bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attributes(pub u8);

impl Attributes {
    pub const READ_ONLY: Self = Self(0x01);
    pub const HIDDEN: Self = Self(0x02);
    pub const SYSTEM: Self = Self(0x04);
    pub const DIRECTORY: Self = Self(0x10);
    pub const ARCHIVE: Self = Self(0x20);
    pub const NORMAL: Self = Self(0x80);

    /// Whether every bit of `other` is set.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// One directory table and the entries it owns.
#[derive(Debug, Clone)]
pub struct DirectoryTable {
    /// First sector of the table.
    pub sector: u32,
    /// Table size in bytes.
    pub size: u32,
    /// Entries in on-disk order.
    pub entries: Vec<DirectoryEntry>,
}

/// A single file or directory record.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: String,
    pub attributes: Attributes,
    /// First data sector (or table sector for directories).
    pub sector: u32,
    /// Data size in bytes (or table size for directories).
    pub size: u32,
    pub subtree_left: u16,
    pub subtree_right: u16,
    /// Nested table, populated by [`DirectoryTable::read_tree`] only.
    pub subdirectory: Option<DirectoryTable>,
}

impl DirectoryEntry {
    #[inline]
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(Attributes::DIRECTORY)
    }

    /// Byte offset (relative to the root offset) just past this entry's data.
    #[inline]
    pub fn end_offset(&self, volume: &VolumeDescriptor) -> u64 {
        self.sector as u64 * volume.sector_size + self.size as u64
    }
}

impl DirectoryTable {
    /// Read a single table level. Subdirectories are left unparsed.
    pub fn read<R: Read + Seek>(
        r: &mut R,
        volume: &VolumeDescriptor,
        sector: u32,
        size: u32,
    ) -> Result<Self> {
        let sector_size = volume.sector_size;
        let sector_count = (size as u64).div_ceil(sector_size);

        let mut entries = Vec::new();
        for index in 0..sector_count {
            let start = volume.root_offset + (sector as u64 + index) * sector_size;
            let end = start + sector_size;
            r.seek(SeekFrom::Start(start))?;

            while r.stream_position()? + ENTRY_HEADER_SIZE <= end {
                match read_entry(r)? {
                    Some(entry) => entries.push(entry),
                    None => break,
                }
            }
        }

        Ok(Self {
            sector,
            size,
            entries,
        })
    }

    /// Read a table and every table below it.
    ///
    /// Each distinct table is read once; a directory entry pointing at a
    /// table already read keeps `subdirectory: None`. Fails with
    /// [`Error::Parse`] if nesting exceeds [`MAX_DIRECTORY_DEPTH`] or the
    /// tables read add up to more sectors than the volume holds.
    pub fn read_tree<R: Read + Seek>(
        r: &mut R,
        volume: &VolumeDescriptor,
        sector: u32,
        size: u32,
    ) -> Result<Self> {
        let mut guard = TreeGuard::new(volume);
        guard.admit(volume, sector, size)?;
        Self::read_tree_at(r, volume, sector, size, 0, &mut guard)
    }

    fn read_tree_at<R: Read + Seek>(
        r: &mut R,
        volume: &VolumeDescriptor,
        sector: u32,
        size: u32,
        depth: usize,
        guard: &mut TreeGuard,
    ) -> Result<Self> {
        if depth >= MAX_DIRECTORY_DEPTH {
            return Err(Error::Parse("directory tree too deep"));
        }

        let mut table = Self::read(r, volume, sector, size)?;
        for entry in table.entries.iter_mut().filter(|e| e.is_directory()) {
            if !guard.admit(volume, entry.sector, entry.size)? {
                continue;
            }
            entry.subdirectory = Some(Self::read_tree_at(
                r,
                volume,
                entry.sector,
                entry.size,
                depth + 1,
                guard,
            )?);
        }
        Ok(table)
    }

    /// Visit every entry reachable from the table at `sector` without
    /// keeping the tree in memory.
    ///
    /// Same limits as [`read_tree`](Self::read_tree): each distinct table is
    /// read once, in depth-first order.
    pub fn for_each_entry<R, F>(
        r: &mut R,
        volume: &VolumeDescriptor,
        sector: u32,
        size: u32,
        mut visit: F,
    ) -> Result<()>
    where
        R: Read + Seek,
        F: FnMut(&DirectoryEntry),
    {
        let mut guard = TreeGuard::new(volume);
        guard.admit(volume, sector, size)?;

        let mut pending = vec![(sector, size, 0usize)];
        while let Some((sector, size, depth)) = pending.pop() {
            if depth >= MAX_DIRECTORY_DEPTH {
                return Err(Error::Parse("directory tree too deep"));
            }
            let table = Self::read(r, volume, sector, size)?;
            for entry in &table.entries {
                visit(entry);
                if entry.is_directory() && guard.admit(volume, entry.sector, entry.size)? {
                    pending.push((entry.sector, entry.size, depth + 1));
                }
            }
        }
        Ok(())
    }

    /// Find an entry by name, ignoring ASCII case.
    pub fn get_entry(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Visit every entry in this table and all parsed subtables.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DirectoryEntry)) {
        for entry in &self.entries {
            visit(entry);
            if let Some(sub) = &entry.subdirectory {
                sub.walk(visit);
            }
        }
    }
}

/// Tables already read during one full-tree walk, and the sectors left to
/// spend on new ones.
struct TreeGuard {
    seen: HashSet<(u32, u32)>,
    sectors_left: u64,
}

impl TreeGuard {
    fn new(volume: &VolumeDescriptor) -> Self {
        Self {
            seen: HashSet::new(),
            sectors_left: volume.volume_sectors.max(1),
        }
    }

    /// Whether the table at `sector` still has to be read.
    fn admit(&mut self, volume: &VolumeDescriptor, sector: u32, size: u32) -> Result<bool> {
        if !self.seen.insert((sector, size)) {
            debug!(sector, size, "directory table already read");
            return Ok(false);
        }
        let cost = (size as u64).div_ceil(volume.sector_size);
        self.sectors_left = self
            .sectors_left
            .checked_sub(cost)
            .ok_or(Error::Parse("directory tables exceed the volume"))?;
        Ok(true)
    }
}

/// Read one entry, or `None` at the end-of-sector marker.
///
/// A zero-length name also ends the run; zero-filled slack is not a valid
/// entry.
fn read_entry<R: Read + Seek>(r: &mut R) -> Result<Option<DirectoryEntry>> {
    let subtree_left = le_u16(r)?;
    let subtree_right = le_u16(r)?;
    if subtree_left == SUBTREE_END && subtree_right == SUBTREE_END {
        return Ok(None);
    }

    let sector = le_u32(r)?;
    let size = le_u32(r)?;
    let attributes = Attributes(u8(r)?);
    let name_len = u8(r)?;
    if name_len == 0 {
        return Ok(None);
    }
    let name_bytes = bytesv(r, name_len as usize)?;
    let name = String::from_utf8_lossy(&name_bytes).into_owned();

    let pos = r.stream_position()?;
    let padding = (4 - pos % 4) % 4;
    r.seek(SeekFrom::Current(padding as i64))?;

    Ok(Some(DirectoryEntry {
        name,
        attributes,
        sector,
        size,
        subtree_left,
        subtree_right,
        subdirectory: None,
    }))
}
