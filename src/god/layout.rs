//! Output naming.
//!
//! ```text
//! <base>/<TITLEID>/<CONTENTTYPE>/<MEDIAID>            header file
//! <base>/<TITLEID>/<CONTENTTYPE>/<MEDIAID>.data/Data0000
//! <base>/<TITLEID>/<CONTENTTYPE>/<MEDIAID>.data/Data0001
//! ```
//!
//! All IDs are rendered as 8 uppercase hex digits.

use std::path::{Path, PathBuf};

use super::ContentType;
use crate::formats::xex::ExecutionInfo;

/// Paths of every file a conversion produces.
#[derive(Debug, Clone)]
pub struct FileLayout {
    base: PathBuf,
    title_id: String,
    content_type: String,
    media_id: String,
}

impl FileLayout {
    pub fn new(
        base: impl AsRef<Path>,
        exe_info: &ExecutionInfo,
        content_type: ContentType,
    ) -> Self {
        Self::from_ids(base, exe_info.title_id, exe_info.media_id, content_type)
    }

    pub fn from_ids(
        base: impl AsRef<Path>,
        title_id: [u8; 4],
        media_id: [u8; 4],
        content_type: ContentType,
    ) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            title_id: hex_upper(&title_id),
            content_type: format!("{:08X}", content_type.code()),
            media_id: hex_upper(&media_id),
        }
    }

    pub fn title_id_hex(&self) -> &str {
        &self.title_id
    }

    pub fn content_type_hex(&self) -> &str {
        &self.content_type
    }

    pub fn media_id_hex(&self) -> &str {
        &self.media_id
    }

    fn content_dir(&self) -> PathBuf {
        self.base.join(&self.title_id).join(&self.content_type)
    }

    /// Directory holding the part files.
    pub fn data_dir_path(&self) -> PathBuf {
        self.content_dir().join(format!("{}.data", self.media_id))
    }

    /// Path of part `index` (`Data0000`, `Data0001`, ...).
    pub fn part_file_path(&self, index: u64) -> PathBuf {
        self.data_dir_path().join(format!("Data{index:04}"))
    }

    /// Path of the header file.
    pub fn con_header_file_path(&self) -> PathBuf {
        self.content_dir().join(&self.media_id)
    }
}

pub(crate) fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
