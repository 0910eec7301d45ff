//! FIF boundary support.
//!
//! This crate reads the small part of a FIF recording header that megsync needs: the
//! measurement timestamp and the subject's hospital identifier. It does not decode channel info,
//! projections or data buffers.
//!
//! FIF is a tag-structured binary container. Every tag starts with a 16-byte big-endian header
//! (`kind`, `type`, `size`, `next`) followed by `size` bytes of payload. `next` is either
//! [`constants::NEXT_SEQ`] (the next tag follows immediately), [`constants::NEXT_NONE`] (end of
//! the tag chain) or an absolute byte offset. Tags are grouped into nested blocks opened and
//! closed by [`constants::FIFF_BLOCK_START`] and [`constants::FIFF_BLOCK_END`]; only the
//! measurement info block is consulted.

pub mod constants;
mod reader;

pub use reader::{read_header, MeasurementHeader};

use std::path::Path;
use thiserror::Error;

/// Errors returned by the `megsync-fif` boundary crate.
#[derive(Debug, Error)]
pub enum FifError {
    #[error("failed to read FIF file: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a FIF file (first tag kind {0}, expected file id)")]
    NotFif(i32),

    #[error("truncated tag header at byte {0}")]
    Truncated(u64),

    #[error("corrupt tag at byte {offset}: {reason}")]
    CorruptTag { offset: u64, reason: String },

    #[error("measurement date tag not found")]
    MissingMeasDate,

    #[error("measurement timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

/// Read the measurement header of the FIF file at `path`.
pub fn read_measurement_header(path: &Path) -> Result<MeasurementHeader, FifError> {
    let file = std::fs::File::open(path)?;
    read_header(std::io::BufReader::new(file))
}
