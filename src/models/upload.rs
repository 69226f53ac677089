//! Statement upload request parts and the status-coded result.

use alloc::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One statement file to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFile {
    /// Bank name; sent as the multipart field name so the server picks the
    /// matching parser.
    pub bank: String,
    /// Original file name.
    pub file_name: String,
    /// Raw file contents.
    pub contents: Vec<u8>,
}

/// Body returned by the upload endpoint for every documented status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// File name to failure reason.
    #[serde(default)]
    pub failed: BTreeMap<String, String>,
    /// File name to bank name.
    #[serde(default)]
    pub success: BTreeMap<String, String>,
    /// Number of imported transactions.
    #[serde(default)]
    pub amount: u64,
    /// Human-readable note, set when nothing was uploaded.
    #[serde(default)]
    pub info: String,
}

/// How an upload ended, decided solely by the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    /// `201`: every file was imported.
    Complete,
    /// `206`: some files were imported, some failed.
    Partial,
    /// `415`: no file could be imported.
    Rejected,
    /// `400`: the request carried no files.
    NoFiles,
}

impl UploadStatus {
    /// Maps a response status to an outcome; `None` for any other status.
    #[inline]
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            201 => Some(Self::Complete),
            206 => Some(Self::Partial),
            415 => Some(Self::Rejected),
            400 => Some(Self::NoFiles),
            _ => None,
        }
    }

    /// Returns the HTTP status this outcome is signalled with.
    #[inline]
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Complete => 201,
            Self::Partial => 206,
            Self::Rejected => 415,
            Self::NoFiles => 400,
        }
    }

    /// Returns `true` if at least one file made it in.
    #[inline]
    #[must_use]
    pub const fn imported_any(self) -> bool {
        matches!(self, Self::Complete | Self::Partial)
    }
}

/// Upload status together with the server's per-file breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Overall outcome.
    pub status: UploadStatus,
    /// Per-file details.
    pub outcome: UploadOutcome,
}
