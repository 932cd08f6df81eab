//! **xgod** - convert Xbox 360 disc images (XISO) into Games on Demand
//! packages.
//!
//! # Modules
//! | Module | Purpose |
//! |--------|---------|
//! | [`formats::xdvdfs`] | XDVDFS volume detection and directory lookup |
//! | [`formats::xex`]    | XEX2 header and execution info |
//! | [`god`]             | Hash pages, part files, header, output layout |
//! | [`convert`]         | End-to-end image to package conversion |
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use xgod::convert::{ConvertOptions, convert};
//!
//! let image = BufReader::new(File::open("game.iso")?);
//! let options = ConvertOptions {
//!     dest_dir: "out".into(),
//!     ..Default::default()
//! };
//! let summary = convert(image, &options, |_| {})?;
//! println!("{} parts", summary.part_count);
//! # Ok::<(), xgod::Error>(())
//! ```

pub mod convert;
pub mod error;
pub mod formats;
pub mod god;
pub mod utils;

pub use error::{Error, Result};
