//! Disc image to GOD package conversion.
//!
//! Wires the pieces together:
//!
//! 1. open the image with [`IsoReader`] and find `default.xex`,
//! 2. read its [`ExecutionInfo`],
//! 3. stream the volume (from the root offset) into as many parts as
//!    needed with [`write_part_with`],
//! 4. chain the parts' master hash pages, last to first, so each one
//!    carries the digest of the next,
//! 5. write the header named by [`FileLayout`].
//!
//! Part files are opened, written, flushed, and closed one at a time. A
//! failure part-way leaves the files written so far in place.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::formats::xdvdfs::IsoReader;
use crate::formats::xex::{ExecutionInfo, ModuleFlags, XexHeader};
use crate::god::{
    BLOCK_SIZE, BLOCKS_PER_PART, BLOCKS_PER_SUBPART, ConHeaderBuilder, ContentType, DIGEST_SIZE,
    FileLayout, HASH_PAGE_SIZE, HashList, write_part_with,
};
use crate::{Error, Result};

/// Path of the title executable inside the image.
pub const EXECUTABLE_PATH: &str = "default.xex";

/// Everything a caller can configure about a conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Base directory; the package lands in `<dest_dir>/<TITLEID>/...`.
    pub dest_dir: PathBuf,
    /// Title written into the header. Defaults to the title ID in hex.
    pub game_title: Option<String>,
    /// PNG stored as the package icon.
    pub icon: Option<Vec<u8>>,
    /// Only convert the prefix of the volume that holds files.
    pub trim: bool,
    /// Compute the plan without writing anything.
    pub dry_run: bool,
}

/// Progress events, in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    PartStarted { index: u64, count: u64 },
    BlocksWritten { done: u64, total: u64 },
    Finished,
}

/// Outcome of [`convert`].
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub exe_info: ExecutionInfo,
    pub layout: FileLayout,
    /// Bytes of the volume that were (or would be) converted.
    pub data_size: u64,
    pub block_count: u64,
    pub part_count: u64,
    /// Combined size of all part files.
    pub parts_total_size: u64,
    /// Digest stored in the header; `None` for dry runs.
    pub mht_hash: Option<[u8; DIGEST_SIZE]>,
}

/// On-disk size of a part holding `data_bytes` of volume data.
pub fn part_file_size(data_bytes: u64) -> u64 {
    let blocks = data_bytes.div_ceil(BLOCK_SIZE as u64);
    let pages = 1 + blocks.div_ceil(BLOCKS_PER_SUBPART);
    pages * HASH_PAGE_SIZE as u64 + data_bytes
}

/// Convert the disc image `source` into a GOD package.
///
/// `progress` receives [`Progress`] events; pass `|_| {}` to ignore them.
pub fn convert<R, F>(source: R, options: &ConvertOptions, mut progress: F) -> Result<ConvertSummary>
where
    R: Read + Seek,
    F: FnMut(Progress),
{
    let mut iso = IsoReader::new(source)?;

    let xex = iso.resolve(EXECUTABLE_PATH)?;
    let header = XexHeader::parse(iso.seek_to(&xex)?)?;
    let exe_info = header.execution_info()?.clone();
    if !header.module_flags.contains(ModuleFlags::TITLE_MODULE) {
        warn!(flags = header.module_flags.0, "executable is not flagged as a title module");
    }

    let layout = FileLayout::new(&options.dest_dir, &exe_info, ContentType::GamesOnDemand);
    info!(
        title_id = layout.title_id_hex(),
        media_id = layout.media_id_hex(),
        disc = exe_info.disc_number,
        discs = exe_info.disc_count,
        "found title"
    );

    let data_size = if options.trim {
        iso.max_used_prefix_size()?
    } else {
        iso.volume.volume_size
    };
    let block_count = data_size.div_ceil(BLOCK_SIZE as u64);
    let part_count = block_count.div_ceil(BLOCKS_PER_PART);
    if part_count == 0 {
        return Err(Error::Parse("empty volume"));
    }
    let part_count_u32 =
        u32::try_from(part_count).map_err(|_| Error::FieldOverflow("data part count"))?;
    let blocks_allocated =
        u32::try_from(block_count).map_err(|_| Error::FieldOverflow("blocks allocated"))?;

    info!(data_size, block_count, part_count, trim = options.trim, "planned conversion");

    if options.dry_run {
        let full_part = BLOCKS_PER_PART * BLOCK_SIZE as u64;
        let parts_total_size = (part_count - 1) * part_file_size(full_part)
            + part_file_size(data_size - (part_count - 1) * full_part);
        return Ok(ConvertSummary {
            exe_info,
            layout,
            data_size,
            block_count,
            part_count,
            parts_total_size,
            mht_hash: None,
        });
    }

    fs::create_dir_all(layout.data_dir_path())?;

    let mut src = iso.seek_to_root()?.take(data_size);
    let mut masters = Vec::with_capacity(part_count as usize);
    let mut blocks_done = 0u64;
    let mut parts_total_size = 0u64;

    for index in 0..part_count {
        progress(Progress::PartStarted {
            index,
            count: part_count,
        });

        let path = layout.part_file_path(index);
        debug!(path = %path.display(), "writing part");
        let mut dest = BufWriter::new(File::create(&path)?);

        let part_src = src.by_ref().take(BLOCKS_PER_PART * BLOCK_SIZE as u64);
        let summary = write_part_with(part_src, &mut dest, |n| {
            progress(Progress::BlocksWritten {
                done: blocks_done + n,
                total: block_count,
            })
        })?;
        dest.flush()?;

        blocks_done += summary.blocks;
        parts_total_size += summary.bytes_written;
        masters.push(summary.master);
    }

    let mht_hash = chain_master_hashes(&layout, &mut masters)?;

    let not_allocated = (part_count * BLOCKS_PER_PART - blocks_done) as u16;
    let title = options
        .game_title
        .clone()
        .unwrap_or_else(|| layout.title_id_hex().to_owned());

    let con_header = ConHeaderBuilder::new()
        .with_execution_info(&exe_info)
        .with_block_counts(blocks_allocated, not_allocated)?
        .with_data_parts_info(part_count_u32, parts_total_size)
        .with_content_type(ContentType::GamesOnDemand)
        .with_mht_hash(&mht_hash)
        .with_game_icon(options.icon.as_deref())?
        .with_game_title(&title)?
        .finalize();
    let header_path = layout.con_header_file_path();
    fs::write(&header_path, &con_header)?;

    info!(
        header = %header_path.display(),
        parts_total_size,
        "conversion finished"
    );
    progress(Progress::Finished);

    Ok(ConvertSummary {
        exe_info,
        layout,
        data_size,
        block_count,
        part_count,
        parts_total_size,
        mht_hash: Some(mht_hash),
    })
}

/// Append each part's master digest to the previous part's master page and
/// rewrite those pages. Returns the digest of part 0's chained master list.
fn chain_master_hashes(layout: &FileLayout, masters: &mut [HashList]) -> Result<[u8; DIGEST_SIZE]> {
    for index in (0..masters.len().saturating_sub(1)).rev() {
        let next = masters[index + 1].digest();
        masters[index].add_hash(&next)?;

        let mut file = OpenOptions::new()
            .write(true)
            .open(layout.part_file_path(index as u64))?;
        file.seek(SeekFrom::Start(0))?;
        masters[index].write(&mut file)?;
        file.flush()?;
    }

    masters
        .first()
        .map(HashList::digest)
        .ok_or(Error::Parse("no parts written"))
}
