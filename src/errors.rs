//! Errors specific to decoding, modifying or encoding a resource section.

use std::io::Error as IOError;

use thiserror::Error;

/// Error that occurs when a value is stored into an on-disk field too
/// narrow to hold it. Field widths are fixed by the PE format; values are
/// never wrapped or truncated to fit.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("value {value:#x} does not fit into the {width}-bit field `{field}`")]
pub struct ValueOutOfRange {
    /// Name of the on-disk field the value was destined for.
    pub field: &'static str,
    /// Width of the field in bits.
    pub width: u32,
    /// The rejected value.
    pub value: u64,
}

/// Errors that can occur when reading a resource section.
#[derive(Debug, Error)]
pub enum SectionReadError {
    /// The input ended before a fixed-size field could be fully read.
    /// Short input never produces a zero-filled structure.
    #[error("input truncated: {needed} bytes required at offset {offset:#x}, {available} available")]
    TruncatedInput {
        offset:    usize,
        needed:    usize,
        available: usize,
    },
    /// A structural invariant of the section is violated: entry counts
    /// disagree with the parsed rows, an offset or data range points outside
    /// the section, or name/string data cannot be decoded. A single bad
    /// offset invalidates every offset after it, so parsing aborts.
    #[error("malformed resource section: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    IOError(#[from] IOError),
}

/// Errors that can occur when building a resource section.
#[derive(Debug, Error)]
pub enum SectionWriteError {
    #[error(transparent)]
    ValueOutOfRange(#[from] ValueOutOfRange),
    #[error("io error: {0}")]
    IOError(#[from] IOError),
}

/// Errors that can occur when decoding or modifying string table resources.
#[derive(Debug, Error)]
pub enum StringTableError {
    /// No loaded string table block covers the given string id.
    #[error("unknown string id {0}")]
    UnknownStringId(u32),
    /// A string table block directory carries no resource data.
    #[error("string table block {0} has no resource data")]
    EmptyBlock(u32),
    #[error(transparent)]
    ValueOutOfRange(#[from] ValueOutOfRange),
    #[error(transparent)]
    InvalidBlock(#[from] SectionReadError),
}
