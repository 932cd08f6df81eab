//! In-memory disc images for unit tests.

use std::io::{self, Read, Seek, SeekFrom};

use super::volume::{IsoType, MEDIA_MAGIC, SECTOR_SIZE, VolumeDescriptor};

/// A zero-filled image of arbitrary length with a few written regions.
///
/// Lets tests place the GDF descriptor ~250 MiB in without allocating it.
pub(crate) struct SparseImage {
    len: u64,
    pos: u64,
    chunks: Vec<(u64, Vec<u8>)>,
}

impl SparseImage {
    pub(crate) fn new(len: u64) -> Self {
        Self {
            len,
            pos: 0,
            chunks: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Later writes win where regions overlap.
    pub(crate) fn write(&mut self, offset: u64, bytes: &[u8]) {
        self.len = self.len.max(offset + bytes.len() as u64);
        self.chunks.push((offset, bytes.to_vec()));
    }
}

impl Read for SparseImage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len {
            return Ok(0);
        }
        let n = buf.len().min((self.len - self.pos) as usize);
        let (start, end) = (self.pos, self.pos + n as u64);
        buf[..n].fill(0);
        for (offset, data) in &self.chunks {
            let chunk_end = offset + data.len() as u64;
            if *offset >= end || chunk_end <= start {
                continue;
            }
            let from = start.max(*offset);
            let to = end.min(chunk_end);
            buf[(from - start) as usize..(to - start) as usize]
                .copy_from_slice(&data[(from - offset) as usize..(to - offset) as usize]);
        }
        self.pos = end;
        Ok(n)
    }
}

impl Seek for SparseImage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::End(d) => self.len as i128 + d as i128,
            SeekFrom::Current(d) => self.pos as i128 + d as i128,
        };
        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "negative seek"));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}

/// Builds one sector of directory entries, padded with `0xFF`.
pub(crate) struct TableBuilder {
    buf: Vec<u8>,
}

impl TableBuilder {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub(crate) fn file(self, name: &str, sector: u32, size: u32) -> Self {
        self.entry(name, 0x80, sector, size)
    }

    pub(crate) fn dir(self, name: &str, sector: u32, size: u32) -> Self {
        self.entry(name, 0x10, sector, size)
    }

    fn entry(mut self, name: &str, attributes: u8, sector: u32, size: u32) -> Self {
        self.buf.extend_from_slice(&0u16.to_le_bytes());
        self.buf.extend_from_slice(&0u16.to_le_bytes());
        self.buf.extend_from_slice(&sector.to_le_bytes());
        self.buf.extend_from_slice(&size.to_le_bytes());
        self.buf.push(attributes);
        self.buf.push(name.len() as u8);
        self.buf.extend_from_slice(name.as_bytes());
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
        self
    }

    pub(crate) fn build(mut self) -> Vec<u8> {
        self.buf.resize(SECTOR_SIZE as usize, 0xFF);
        self.buf
    }
}

/// Descriptor for an XSF image of `len` bytes with the root table at sector 0.
pub(crate) fn xsf_volume(len: u64) -> VolumeDescriptor {
    VolumeDescriptor {
        iso_type: IsoType::Xsf,
        root_offset: 0,
        sector_size: SECTOR_SIZE,
        identifier: *MEDIA_MAGIC,
        root_dir_sector: 0,
        root_dir_size: SECTOR_SIZE as u32,
        image_creation_time: [0; 8],
        volume_size: len,
        volume_sectors: len / SECTOR_SIZE,
    }
}

/// Write a volume descriptor for `iso_type` into `img`.
pub(crate) fn write_descriptor(img: &mut SparseImage, iso_type: IsoType, root_sector: u32) {
    let off = iso_type.descriptor_offset();
    img.write(off, MEDIA_MAGIC);
    img.write(off + 0x14, &root_sector.to_le_bytes());
    img.write(off + 0x18, &(SECTOR_SIZE as u32).to_le_bytes());
}

/// Counts absolute seeks; every table sector read starts with one.
pub(crate) struct SeekCounter<R> {
    pub(crate) inner: R,
    pub(crate) absolute_seeks: usize,
}

impl<R> SeekCounter<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            absolute_seeks: 0,
        }
    }
}

impl<R: Read> Read for SeekCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for SeekCounter<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if let SeekFrom::Start(_) = pos {
            self.absolute_seeks += 1;
        }
        self.inner.seek(pos)
    }
}

/// `count` one-sector tables from `first_sector` on, where every table but
/// the last holds two directories (`a`, `b`) pointing at the next table.
pub(crate) fn shared_table_chain(first_sector: u32, count: u32) -> Vec<u8> {
    let mut img = Vec::new();
    for i in 0..count {
        let next = first_sector + i + 1;
        let table = if i + 1 < count {
            TableBuilder::new()
                .dir("a", next, SECTOR_SIZE as u32)
                .dir("b", next, SECTOR_SIZE as u32)
        } else {
            TableBuilder::new()
        };
        img.extend_from_slice(&table.build());
    }
    img
}
