//! Synthetic disc images for the integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;

use xgod::formats::xdvdfs::{MEDIA_MAGIC, SECTOR_SIZE};

pub const TITLE_ID: [u8; 4] = [0x4D, 0x53, 0x08, 0x4E];
pub const MEDIA_ID: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

pub const ROOT_SECTOR: u32 = 0x21;
pub const XEX_SECTOR: u32 = 0x22;
pub const MEDIA_DIR_SECTOR: u32 = 0x23;
pub const MOVIE_SECTOR: u32 = 0x40;
pub const MOVIE_SIZE: u32 = 0x2800;

/// Where the last file of [`sample_image`] ends.
pub const USED_PREFIX: u64 = MOVIE_SECTOR as u64 * SECTOR_SIZE + MOVIE_SIZE as u64;

/// One directory sector; `(name, attributes, sector, size)` per entry.
pub fn table(entries: &[(&str, u8, u32, u32)]) -> Vec<u8> {
    let mut buf = Vec::new();
    for &(name, attributes, sector, size) in entries {
        buf.extend_from_slice(&[0, 0, 0, 0]);
        buf.extend_from_slice(&sector.to_le_bytes());
        buf.extend_from_slice(&size.to_le_bytes());
        buf.push(attributes);
        buf.push(name.len() as u8);
        buf.extend_from_slice(name.as_bytes());
        while buf.len() % 4 != 0 {
            buf.push(0);
        }
    }
    buf.resize(SECTOR_SIZE as usize, 0xFF);
    buf
}

/// An XEX2 header with a single execution-info field.
pub fn xex_header() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"XEX2");
    buf.extend_from_slice(&0x01u32.to_be_bytes()); // title module
    buf.extend_from_slice(&0x3000u32.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&0x200u32.to_be_bytes());
    buf.extend_from_slice(&1u32.to_be_bytes());
    buf.extend_from_slice(&0x0406u32.to_be_bytes());
    buf.extend_from_slice(&0x20u32.to_be_bytes());

    buf.extend_from_slice(&MEDIA_ID);
    buf.extend_from_slice(&0x0002_0000u32.to_be_bytes());
    buf.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    buf.extend_from_slice(&TITLE_ID);
    buf.extend_from_slice(&[0, 0, 1, 2]); // platform, type, disc 1 of 2
    buf.extend_from_slice(&0x1234_5678u32.to_be_bytes());
    buf
}

/// Byte pattern stored in `media\intro.bik`.
pub fn movie_bytes() -> Vec<u8> {
    (0..MOVIE_SIZE).map(|i| (i % 251) as u8).collect()
}

/// An XSF image of `len` bytes, backed by a temporary file:
///
/// ```text
/// \default.xex
/// \media\intro.bik
/// ```
///
/// Everything past the last file is left as a hole, so large images take
/// no disk space.
pub fn sample_image(len: u64) -> File {
    image_with_root(len, true)
}

/// [`sample_image`] without `default.xex`.
pub fn image_without_executable(len: u64) -> File {
    image_with_root(len, false)
}

fn put(img: &mut Vec<u8>, offset: u64, bytes: &[u8]) {
    let offset = offset as usize;
    if img.len() < offset + bytes.len() {
        img.resize(offset + bytes.len(), 0);
    }
    img[offset..offset + bytes.len()].copy_from_slice(bytes);
}

fn image_with_root(len: u64, with_xex: bool) -> File {
    let sector = |s: u32| s as u64 * SECTOR_SIZE;
    let mut img = Vec::new();

    let descriptor = sector(0x20);
    put(&mut img, descriptor, MEDIA_MAGIC);
    put(&mut img, descriptor + 0x14, &ROOT_SECTOR.to_le_bytes());
    put(&mut img, descriptor + 0x18, &(SECTOR_SIZE as u32).to_le_bytes());

    let xex = xex_header();
    let mut root = vec![("media", 0x10, MEDIA_DIR_SECTOR, SECTOR_SIZE as u32)];
    if with_xex {
        root.insert(0, ("default.xex", 0x80, XEX_SECTOR, xex.len() as u32));
    }
    put(&mut img, sector(ROOT_SECTOR), &table(&root));
    put(&mut img, sector(XEX_SECTOR), &xex);
    put(
        &mut img,
        sector(MEDIA_DIR_SECTOR),
        &table(&[("intro.bik", 0x80, MOVIE_SECTOR, MOVIE_SIZE)]),
    );
    put(&mut img, sector(MOVIE_SECTOR), &movie_bytes());

    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&img).unwrap();
    file.set_len(len.max(img.len() as u64)).unwrap();
    file
}
