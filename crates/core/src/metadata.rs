//! Recording metadata access.
//!
//! The synchronisation engine only needs two facts from a recording: the acquisition date (the
//! canonical visit date used in destination paths) and, when present, the subject identifier
//! recorded by the acquisition system. [`MetadataReader`] is the seam; [`FifMetadataReader`]
//! reads them from FIF headers.

use crate::{SyncError, SyncResult};
use megsync_types::VisitDate;
use std::path::Path;

/// Metadata needed to place a recording in the destination tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionInfo {
    pub subject_id: Option<String>,
    pub acquisition_date: VisitDate,
}

/// Reads acquisition metadata from a recording file.
pub trait MetadataReader {
    /// # Errors
    ///
    /// Returns `SyncError::MetadataUnreadable` when the file is not a valid recording or carries
    /// no acquisition date.
    fn read_acquisition_info(&self, path: &Path) -> SyncResult<AcquisitionInfo>;
}

/// [`MetadataReader`] for FIF recordings.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifMetadataReader;

impl MetadataReader for FifMetadataReader {
    fn read_acquisition_info(&self, path: &Path) -> SyncResult<AcquisitionInfo> {
        let unreadable = |reason: String| SyncError::MetadataUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let header =
            megsync_fif::read_measurement_header(path).map_err(|e| unreadable(e.to_string()))?;
        let acquisition_date = header.visit_date().map_err(|e| unreadable(e.to_string()))?;

        Ok(AcquisitionInfo {
            subject_id: header.subject_his_id,
            acquisition_date,
        })
    }
}
