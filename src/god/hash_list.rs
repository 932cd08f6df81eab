//! Hash pages: up to 204 SHA1 digests serialized into exactly 4 KiB.

use std::io::{Read, Write};

use super::{DIGEST_SIZE, HASH_PAGE_SIZE, sha1};
use crate::utils::bytesa;
use crate::{Error, Result};

/// A growable list of SHA1 digests that serializes to one hash page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashList {
    buffer: Vec<u8>,
}

impl HashList {
    /// Most digests one page can hold.
    pub const CAPACITY: usize = HASH_PAGE_SIZE / DIGEST_SIZE;

    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(HASH_PAGE_SIZE),
        }
    }

    /// Read a serialized page from `r`.
    ///
    /// Consumes exactly one page. Digests are taken in order up to the first
    /// all-zero digest.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let page = bytesa::<HASH_PAGE_SIZE>(r)?;
        Ok(Self::from_page(&page))
    }

    /// Recover the digests from a serialized page.
    pub fn from_page(page: &[u8]) -> Self {
        let mut list = Self::new();
        for digest in page.chunks_exact(DIGEST_SIZE) {
            if digest.iter().all(|&b| b == 0) {
                break;
            }
            list.buffer.extend_from_slice(digest);
        }
        list
    }

    /// Append a digest. Fails once the page is full.
    pub fn add_hash(&mut self, hash: &[u8; DIGEST_SIZE]) -> Result<()> {
        if self.len() >= Self::CAPACITY {
            return Err(Error::Parse("hash page full"));
        }
        self.buffer.extend_from_slice(hash);
        Ok(())
    }

    /// Append the digest of `block`.
    pub fn add_block_hash(&mut self, block: &[u8]) -> Result<()> {
        self.add_hash(&sha1(block))
    }

    /// SHA1 over the concatenated digests (without page padding).
    pub fn digest(&self) -> [u8; DIGEST_SIZE] {
        sha1(&self.buffer)
    }

    /// Number of digests held.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len() / DIGEST_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Iterate over the digests in insertion order.
    pub fn hashes(&self) -> impl Iterator<Item = &[u8]> {
        self.buffer.chunks_exact(DIGEST_SIZE)
    }

    /// The serialized page, zero padded to [`HASH_PAGE_SIZE`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut page = self.buffer.clone();
        page.resize(HASH_PAGE_SIZE, 0);
        page
    }

    /// Write the serialized page to `w`.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.to_bytes())?;
        Ok(())
    }
}
