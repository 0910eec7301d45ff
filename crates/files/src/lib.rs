//! megsync File Transfer
//!
//! This crate provides the copy primitive used to move recordings from the source archive into
//! the destination tree.
//!
//! ## Design Principles
//!
//! - A destination file is written at most once and never overwritten
//! - The existence check and the creation of the destination are a single atomic step
//! - A partially written copy is never visible under the destination name
//! - Every copy produces an auditable receipt (size and SHA-256 of the bytes written)
//! - All writes are scoped to one destination root
//!
//! ## Publishing Model
//!
//! ```text
//! <dest_root>/
//! └── <paradigm>/
//!     └── <subject>/
//!         └── visit_<YYYYMMDD>/
//!             ├── .megsync-partial-XXXX   # staging file, removed on failure
//!             └── <recording>             # published with a no-clobber link/rename
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use megsync_files::{TransferOutcome, TransferService};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TransferService::new(Path::new("/data/MEG"))?;
//! let dest = Path::new("/data/MEG/AttenAud/012345/visit_20220101/012345_AttenAud_raw.fif");
//! match service.copy_if_absent(Path::new("/archive/012345_AttenAud_raw.fif"), dest)? {
//!     TransferOutcome::Copied(receipt) => println!("copied {} bytes", receipt.size_bytes),
//!     TransferOutcome::AlreadyPresent => println!("already there"),
//! }
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;

pub use constants::{COPY_BUFFER_BYTES, PARTIAL_FILE_PREFIX};
pub use files::{CopyReceipt, TransferOutcome, TransferService};

/// Errors that can occur during transfer operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Destination directory for a copy does not exist
    #[error("Destination directory missing: {0}")]
    DestinationDirMissing(String),

    /// Path validation failed (outside the destination root, or wrong entry type)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
