//! Parsers for the Xbox 360 input formats.
//!
//! All parsers follow the same conventions:
//!
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] - pass a
//!   [`std::fs::File`], a [`std::io::Cursor`], or anything else that
//!   implements both traits.
//! * **Metadata only** - `parse` reads headers and builds an in-memory
//!   description. File data is never eagerly loaded.
//!
//! | Module     | Format | Description |
//! |------------|--------|-------------|
//! | [`xdvdfs`] | XDVDFS / XISO | Disc filesystem; three root-offset variants |
//! | [`xex`]    | XEX2 | Executable header; carries title and media IDs |

pub mod xdvdfs;
pub mod xex;
