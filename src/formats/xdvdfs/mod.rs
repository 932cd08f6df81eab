//! XDVDFS ("XISO") - the Xbox 360 disc filesystem.
//!
//! An image holds the filesystem at one of three root offsets (see
//! [`volume::IsoType`]). Sector numbers in directory entries are relative
//! to that root offset, and so is everything the GOD writer streams.
//!
//! [`IsoReader`] parses the volume descriptor and root directory up front
//! and reads deeper tables only when a path lookup walks into them.

use std::io::{Read, Seek, SeekFrom, Take};

use tracing::debug;

use crate::{Error, Result};

pub mod directory;
pub mod volume;

#[cfg(test)]
pub(crate) mod test_image;

pub use directory::{Attributes, DirectoryEntry, DirectoryTable, MAX_DIRECTORY_DEPTH};
pub use volume::{IsoType, MEDIA_MAGIC, SECTOR_SIZE, VolumeDescriptor};

/// Reader wrapper around an XDVDFS image.
pub struct IsoReader<R> {
    inner: R,
    /// Parsed volume descriptor.
    pub volume: VolumeDescriptor,
    root: DirectoryTable,
}

impl<R: Read + Seek> IsoReader<R> {
    /// Detect the layout, parse the volume descriptor and the root table.
    pub fn new(mut reader: R) -> Result<Self> {
        let volume = VolumeDescriptor::parse(&mut reader)?;
        let root = DirectoryTable::read(
            &mut reader,
            &volume,
            volume.root_dir_sector,
            volume.root_dir_size,
        )?;
        debug!(
            iso_type = ?volume.iso_type,
            root_entries = root.entries.len(),
            volume_size = volume.volume_size,
            "opened disc image"
        );
        Ok(Self {
            inner: reader,
            volume,
            root,
        })
    }

    /// The root directory table.
    pub fn root(&self) -> &DirectoryTable {
        &self.root
    }

    /// Resolve a backslash-separated path such as `media\default.xex`.
    ///
    /// Lookup ignores case. Returns [`Error::PathNotFound`] when a component
    /// is missing or an intermediate component is not a directory; the
    /// reader remains usable either way.
    pub fn resolve(&mut self, path: &str) -> Result<DirectoryEntry> {
        let not_found = || Error::PathNotFound(path.to_owned());
        let components: Vec<&str> = path.split('\\').filter(|c| !c.is_empty()).collect();
        let Some((last, parents)) = components.split_last() else {
            return Err(not_found());
        };

        let mut current: Option<DirectoryTable> = None;
        for name in parents {
            let table = current.as_ref().unwrap_or(&self.root);
            let entry = table.get_entry(name).ok_or_else(not_found)?;
            if !entry.is_directory() {
                return Err(not_found());
            }
            let (sector, size) = (entry.sector, entry.size);
            current = Some(DirectoryTable::read(
                &mut self.inner,
                &self.volume,
                sector,
                size,
            )?);
        }

        let table = current.as_ref().unwrap_or(&self.root);
        table.get_entry(last).cloned().ok_or_else(not_found)
    }

    /// Seek to the first byte of `entry` and hand out the underlying reader.
    ///
    /// Useful for parsers that need random access relative to the file
    /// start (they take `stream_position()` as their base).
    pub fn seek_to(&mut self, entry: &DirectoryEntry) -> Result<&mut R> {
        self.inner
            .seek(SeekFrom::Start(self.volume.sector_offset(entry.sector)))?;
        Ok(&mut self.inner)
    }

    /// Open a file for streaming access, bounded to its size.
    pub fn read_file(&mut self, entry: &DirectoryEntry) -> Result<Take<&mut R>> {
        let size = entry.size as u64;
        Ok(self.seek_to(entry)?.by_ref().take(size))
    }

    /// Seek to the root offset, where the GOD data stream begins.
    pub fn seek_to_root(&mut self) -> Result<&mut R> {
        self.inner.seek(SeekFrom::Start(self.volume.root_offset))?;
        Ok(&mut self.inner)
    }

    /// Size of the prefix of the volume (from the root offset) that contains
    /// every directory table and file.
    ///
    /// Visits every reachable table once. Never smaller than the volume
    /// descriptor region, never larger than the volume.
    pub fn max_used_prefix_size(&mut self) -> Result<u64> {
        let volume = &self.volume;
        let root_end =
            volume.root_dir_sector as u64 * volume.sector_size + volume.root_dir_size as u64;
        let mut max = ((volume::DESCRIPTOR_SECTOR + 1) * volume.sector_size).max(root_end);

        DirectoryTable::for_each_entry(
            &mut self.inner,
            volume,
            volume.root_dir_sector,
            volume.root_dir_size,
            |entry| max = max.max(entry.end_offset(volume)),
        )?;

        Ok(max.min(volume.volume_size))
    }

    /// Consume the reader, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
