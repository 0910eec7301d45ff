//! Root-scoped, copy-once transfer service
//!
//! This module provides the core implementation of megsync's file transfer through the
//! [`TransferService`] type. It owns every write the synchronisation engine makes into the
//! destination tree.
//!
//! # Exactly-once publishing
//!
//! A copy runs in three steps:
//!
//! 1. If the destination already exists, nothing is read or written.
//! 2. The source is streamed into a staging file next to the destination, hashing as it goes.
//! 3. The staging file is published with a no-clobber rename. If another writer created the
//!    destination in the meantime, publishing fails with `AlreadyExists`, the staging file is
//!    discarded and the outcome is [`TransferOutcome::AlreadyPresent`].
//!
//! Step 3 makes check-and-create atomic, so two runs racing on the same destination still
//! produce exactly one physical copy, and an interrupted copy never leaves a truncated file
//! under the destination name.
//!
//! # Security Model
//!
//! - The destination root is canonicalised at construction time
//! - Every destination path must resolve inside that root
//! - Directories are created one level at a time, never recursively

use crate::{FilesError, COPY_BUFFER_BYTES, PARTIAL_FILE_PREFIX};
use chrono::{DateTime, Utc};
use megsync_types::NonEmptyText;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Audit record for a completed copy
///
/// This structure is serialised into the disposition log so that an operator can verify what
/// was written without re-reading the destination tree.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CopyReceipt {
    /// Final filename at the destination
    pub filename: NonEmptyText,

    /// Number of bytes written
    pub size_bytes: u64,

    /// Hexadecimal SHA-256 digest of the bytes written
    pub sha256: String,

    /// UTC timestamp when the copy was published
    pub copied_at: DateTime<Utc>,
}

/// Result of a copy attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The destination was absent and now holds a copy of the source
    Copied(CopyReceipt),
    /// The destination already existed; nothing was written
    AlreadyPresent,
}

/// Service for writing into the destination tree
///
/// # Design
///
/// - Root-scoped: each service instance is bound to one destination root
/// - Copy-once: destination files are never overwritten
/// - Stateless apart from the root; safe to share by reference
#[derive(Debug)]
pub struct TransferService {
    /// Canonicalised destination root
    root_directory: PathBuf,
}

impl TransferService {
    /// Creates a new `TransferService` bound to `root_directory`
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if:
    /// - The root directory does not exist or is not a directory
    /// - Path canonicalisation fails
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Returns the canonicalised destination root
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Creates a single directory level if it is absent
    ///
    /// # Returns
    ///
    /// `true` if the directory was created by this call, `false` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `path` resolves outside the destination root
    /// - `path` exists but is not a directory
    /// - the parent directory does not exist, or creation fails (I/O)
    pub fn ensure_dir(&self, path: &Path) -> Result<bool, FilesError> {
        self.check_within_root(path)?;

        match fs::create_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if path.is_dir() {
                    Ok(false)
                } else {
                    Err(FilesError::InvalidPath(format!(
                        "Path exists but is not a directory: {}",
                        path.display()
                    )))
                }
            }
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory {}: {}", path.display(), e),
            ))),
        }
    }

    /// Copies `source_path` to `dest_path` unless `dest_path` already exists
    ///
    /// The destination's parent directory must already exist; creating it is the caller's
    /// responsibility so that directory provisioning stays an explicit step.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `dest_path` resolves outside the destination root
    /// - the destination directory does not exist
    /// - the source cannot be opened or read (I/O)
    /// - the staging file cannot be written or published (I/O)
    pub fn copy_if_absent(
        &self,
        source_path: &Path,
        dest_path: &Path,
    ) -> Result<TransferOutcome, FilesError> {
        self.check_within_root(dest_path)?;

        let filename = dest_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NonEmptyText::new(n).ok())
            .ok_or_else(|| {
                FilesError::InvalidPath(format!(
                    "Destination has no usable filename: {}",
                    dest_path.display()
                ))
            })?;

        if dest_path.exists() {
            return Ok(TransferOutcome::AlreadyPresent);
        }

        let dest_dir = match dest_path.parent() {
            Some(dir) if dir.is_dir() => dir,
            _ => {
                return Err(FilesError::DestinationDirMissing(
                    dest_path.display().to_string(),
                ))
            }
        };

        let mut source = fs::File::open(source_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to open source file {}: {}",
                    source_path.display(),
                    e
                ),
            ))
        })?;

        let mut staged = tempfile::Builder::new()
            .prefix(PARTIAL_FILE_PREFIX)
            .tempfile_in(dest_dir)
            .map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create staging file in {}: {}",
                        dest_dir.display(),
                        e
                    ),
                ))
            })?;

        let (size_bytes, sha256) = stream_copy(&mut source, staged.as_file_mut())?;
        staged.as_file().sync_all()?;

        match staged.persist_noclobber(dest_path) {
            Ok(_) => Ok(TransferOutcome::Copied(CopyReceipt {
                filename,
                size_bytes,
                sha256,
                copied_at: Utc::now(),
            })),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(
                    "destination appeared while copying, keeping existing file: {}",
                    dest_path.display()
                );
                Ok(TransferOutcome::AlreadyPresent)
            }
            Err(e) => Err(FilesError::Io(std::io::Error::new(
                e.error.kind(),
                format!("Failed to publish {}: {}", dest_path.display(), e.error),
            ))),
        }
    }

    /// Verifies that `path` lies inside the destination root
    ///
    /// `path` itself may not exist yet, so its parent is canonicalised instead.
    fn check_within_root(&self, path: &Path) -> Result<(), FilesError> {
        let parent = path.parent().ok_or_else(|| {
            FilesError::InvalidPath(format!("Path has no parent: {}", path.display()))
        })?;

        if path
            .file_name()
            .map_or(true, |n| n == "." || n == "..")
        {
            return Err(FilesError::InvalidPath(format!(
                "Path must end in a normal component: {}",
                path.display()
            )));
        }

        let canonical_parent = parent.canonicalize().map_err(|e| {
            FilesError::DestinationDirMissing(format!("{}: {}", parent.display(), e))
        })?;

        if !canonical_parent.starts_with(&self.root_directory) {
            return Err(FilesError::InvalidPath(format!(
                "Path escapes destination root {}: {}",
                self.root_directory.display(),
                path.display()
            )));
        }

        Ok(())
    }
}

/// Streams `reader` into `writer`, returning the byte count and hex SHA-256 of what was written
fn stream_copy(reader: &mut impl Read, writer: &mut impl Write) -> Result<(u64, String), FilesError> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; COPY_BUFFER_BYTES];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FilesError::Io(e)),
        };
        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok((total, hex::encode(hasher.finalize())))
}
