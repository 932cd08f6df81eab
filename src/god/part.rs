//! Part file writer.
//!
//! ## Layout
//! ```text
//! [0x0000] Master hash page                    (0x1000 bytes)
//! for each subpart (at most 203):
//!     Subpart hash page                        (0x1000 bytes)
//!     Data blocks (at most 204)                (0x1000 bytes each)
//! ```
//!
//! Hash pages are reserved as zeros, filled in once the content they cover
//! has been written, and the writer then returns to the end of the output.
//! Subpart digests in the master page are taken over the padded 4 KiB
//! subpart page. The last block of the source may be short; it is written
//! and hashed as read.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::debug;

use super::hash_list::HashList;
use super::{BLOCK_SIZE, BLOCKS_PER_SUBPART, HASH_PAGE_SIZE, SUBPARTS_PER_PART};
use crate::utils::fill;
use crate::{Error, Result};

/// What [`write_part`] produced.
#[derive(Debug, Clone)]
pub struct PartSummary {
    /// Subparts written (each with its own hash page).
    pub subparts: u64,
    /// Data blocks written, including a trailing short block.
    pub blocks: u64,
    /// Source bytes copied into the part.
    pub data_bytes: u64,
    /// Total bytes written to the sink, hash pages included.
    pub bytes_written: u64,
    /// The part's master hash list as written.
    pub master: HashList,
}

/// Reserved regions waiting to be overwritten, innermost last.
#[derive(Debug, Default)]
struct Backpatch {
    stack: Vec<u64>,
}

impl Backpatch {
    /// Record the current position and write `len` zero bytes there.
    fn reserve<W: Write + Seek>(&mut self, w: &mut W, len: usize) -> Result<()> {
        self.stack.push(w.stream_position()?);
        w.write_all(&vec![0u8; len])?;
        Ok(())
    }

    /// Overwrite the innermost reservation with `bytes` and return to where
    /// writing left off.
    fn patch<W: Write + Seek>(&mut self, w: &mut W, bytes: &[u8]) -> Result<()> {
        let at = self
            .stack
            .pop()
            .ok_or(Error::Parse("backpatch without reservation"))?;
        let resume = w.stream_position()?;
        w.seek(SeekFrom::Start(at))?;
        w.write_all(bytes)?;
        w.seek(SeekFrom::Start(resume))?;
        Ok(())
    }
}

/// Stream `src` into one part written to `dest`.
///
/// Reads until the source is exhausted or the part is full, whichever comes
/// first; a full part never reads past its last block, so the caller can
/// keep reading `src` for the next part. `dest` is written from its current
/// position.
pub fn write_part<R: Read, W: Write + Seek>(src: R, dest: W) -> Result<PartSummary> {
    write_part_with(src, dest, |_| {})
}

/// [`write_part`] with a callback receiving the number of blocks written to
/// this part so far, after every block.
pub fn write_part_with<R, W, F>(mut src: R, mut dest: W, mut on_block: F) -> Result<PartSummary>
where
    R: Read,
    W: Write + Seek,
    F: FnMut(u64),
{
    let start = dest.stream_position()?;
    let mut patches = Backpatch::default();
    let mut master = HashList::new();
    let mut block = vec![0u8; BLOCK_SIZE];

    let mut subparts = 0u64;
    let mut blocks = 0u64;
    let mut data_bytes = 0u64;
    let mut eof = false;

    patches.reserve(&mut dest, HASH_PAGE_SIZE)?;

    while !eof && subparts < SUBPARTS_PER_PART {
        // Only open a subpart when there is data for it.
        let mut len = fill(&mut src, &mut block)?;
        if len == 0 {
            break;
        }

        let mut sub = HashList::new();
        patches.reserve(&mut dest, HASH_PAGE_SIZE)?;

        for index in 0..BLOCKS_PER_SUBPART {
            if index > 0 {
                len = fill(&mut src, &mut block)?;
                if len == 0 {
                    eof = true;
                    break;
                }
            }

            let data = &block[..len];
            sub.add_block_hash(data)?;
            dest.write_all(data)?;
            blocks += 1;
            data_bytes += len as u64;
            on_block(blocks);

            if len < BLOCK_SIZE {
                eof = true;
                break;
            }
        }

        let page = sub.to_bytes();
        patches.patch(&mut dest, &page)?;
        master.add_block_hash(&page)?;
        subparts += 1;
    }

    patches.patch(&mut dest, &master.to_bytes())?;
    let bytes_written = dest.stream_position()? - start;

    debug!(subparts, blocks, bytes_written, "wrote part");

    Ok(PartSummary {
        subparts,
        blocks,
        data_bytes,
        bytes_written,
        master,
    })
}
