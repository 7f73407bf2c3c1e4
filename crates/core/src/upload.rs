//! Chunk upload protocol types.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Length of a session key in hex characters.
pub const SESSION_KEY_LEN: usize = 32;

/// Key identifying one in-progress chunked upload.
///
/// Always 32 lowercase hex characters, so it is safe to use as a directory
/// name under the temp root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Mint a fresh random session key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a client-supplied session key.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let valid = s.len() == SESSION_KEY_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(crate::Error::InvalidSessionKey(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Resolve an optional client-supplied key, minting one when absent or blank.
    pub fn parse_or_generate(s: Option<&str>) -> crate::Result<Self> {
        match s.map(str::trim) {
            None | Some("") => Ok(Self::generate()),
            Some(s) => Self::parse(s),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({})", self.0)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of one chunk within its upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkCoordinates {
    pub index: u32,
    pub total: u32,
}

impl ChunkCoordinates {
    /// Validate `total >= 1` and `index < total`.
    pub fn new(index: u32, total: u32) -> crate::Result<Self> {
        if total == 0 || index >= total {
            return Err(crate::Error::InvalidChunk { index, total });
        }
        Ok(Self { index, total })
    }

    /// Whether this is conventionally the last chunk of the upload.
    ///
    /// This says nothing about whether earlier chunks have arrived.
    pub fn is_final(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Result of submitting one chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// All chunks were merged and the artifact was finalized.
    Complete { uri_name: String },
    /// More chunks are needed. The key must be echoed on the next chunk.
    InProgress {
        #[serde(rename = "unique")]
        session_key: SessionKey,
    },
}

/// Transfer failure reported by the platform that received the upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFault {
    SizeExceeded,
    Partial,
    NoFile,
    NoTempDir,
    WriteFailure,
    ExtensionAborted,
    Unknown,
}

impl TransferFault {
    /// Map a conventional numeric upload status code. Zero means success.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => None,
            1 | 2 => Some(Self::SizeExceeded),
            3 => Some(Self::Partial),
            4 => Some(Self::NoFile),
            6 => Some(Self::NoTempDir),
            7 => Some(Self::WriteFailure),
            8 => Some(Self::ExtensionAborted),
            _ => Some(Self::Unknown),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::SizeExceeded => "the uploaded file exceeds the maximum allowed size",
            Self::Partial => "the uploaded file was only partially received",
            Self::NoFile => "no file was uploaded",
            Self::NoTempDir => "missing a temporary folder",
            Self::WriteFailure => "failed to write file to disk",
            Self::ExtensionAborted => "file upload stopped by extension",
            Self::Unknown => "unknown upload error",
        }
    }
}

impl fmt::Display for TransferFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Why a submission was rejected as invalid input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    DisallowedExtension(String),
    InvalidExtension(String),
    ChunkTooLarge { size: u64, max: u64 },
    FileTooLarge { size: u64, max: u64 },
    MalformedSessionKey(String),
    InvalidChunk { index: u32, total: u32 },
    TotalMismatch { declared: u32, expected: u32 },
}

impl RejectReason {
    /// Short stable label, used for metrics and error codes.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DisallowedExtension(_) => "disallowed_extension",
            Self::InvalidExtension(_) => "invalid_extension",
            Self::ChunkTooLarge { .. } => "chunk_too_large",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::MalformedSessionKey(_) => "malformed_session_key",
            Self::InvalidChunk { .. } => "invalid_chunk",
            Self::TotalMismatch { .. } => "total_mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisallowedExtension(ext) => write!(f, "file type not allowed: {ext}"),
            Self::InvalidExtension(ext) => write!(f, "unusable file extension: {ext:?}"),
            Self::ChunkTooLarge { size, max } => {
                write!(f, "chunk of {size} bytes exceeds the {max} byte limit")
            }
            Self::FileTooLarge { size, max } => {
                write!(f, "file of {size} bytes exceeds the {max} byte limit")
            }
            Self::MalformedSessionKey(key) => write!(f, "malformed session key: {key}"),
            Self::InvalidChunk { index, total } => {
                write!(f, "chunk index {index} is outside 0..{total}")
            }
            Self::TotalMismatch { declared, expected } => write!(
                f,
                "chunk declares {declared} total chunks but the session expects {expected}"
            ),
        }
    }
}

impl RejectReason {
    /// The rejection corresponding to a core validation error, if any.
    pub fn from_error(err: &crate::Error) -> Option<Self> {
        match err {
            crate::Error::InvalidSessionKey(key) => Some(Self::MalformedSessionKey(key.clone())),
            crate::Error::InvalidChunk { index, total } => Some(Self::InvalidChunk {
                index: *index,
                total: *total,
            }),
            crate::Error::InvalidExtension(ext) => Some(Self::InvalidExtension(ext.clone())),
            _ => None,
        }
    }
}

/// Extract the lowercase extension of a client-supplied file name.
///
/// Only the final path segment is considered. The extension must be
/// non-empty ASCII alphanumeric.
pub fn extension_of(file_name: &str) -> crate::Result<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let ext = base.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    normalize_extension(ext)
}

/// Lowercase and validate a bare extension.
pub fn normalize_extension(ext: &str) -> crate::Result<String> {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(crate::Error::InvalidExtension(ext.to_string()));
    }
    Ok(ext.to_ascii_lowercase())
}
