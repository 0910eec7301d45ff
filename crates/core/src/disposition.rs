//! Per-file dispositions and the disposition log.
//!
//! Every candidate recording found by a run ends in exactly one [`CopyDisposition`]. The record
//! of that outcome is the externally observable contract of a run; where it goes is decided by
//! the caller through a [`DispositionSink`].

use crate::{SyncError, SyncResult};
use megsync_files::CopyReceipt;
use megsync_types::VisitDate;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Terminal classification of one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyDisposition {
    Copied,
    AlreadyPresent,
    RejectedIdentityMismatch,
    RejectedRegistryInconsistent,
    RejectedUnaccounted,
}

impl CopyDisposition {
    pub const ALL: [CopyDisposition; 5] = [
        CopyDisposition::Copied,
        CopyDisposition::AlreadyPresent,
        CopyDisposition::RejectedIdentityMismatch,
        CopyDisposition::RejectedRegistryInconsistent,
        CopyDisposition::RejectedUnaccounted,
    ];

    pub fn is_rejection(self) -> bool {
        matches!(
            self,
            CopyDisposition::RejectedIdentityMismatch
                | CopyDisposition::RejectedRegistryInconsistent
                | CopyDisposition::RejectedUnaccounted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CopyDisposition::Copied => "copied",
            CopyDisposition::AlreadyPresent => "already_present",
            CopyDisposition::RejectedIdentityMismatch => "rejected_identity_mismatch",
            CopyDisposition::RejectedRegistryInconsistent => "rejected_registry_inconsistent",
            CopyDisposition::RejectedUnaccounted => "rejected_unaccounted",
        }
    }
}

impl std::fmt::Display for CopyDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for a file before any copy is attempted.
///
/// The checks run in a fixed priority order; the first failing one decides. The three booleans
/// fully determine the outcome, so there is no fallthrough case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    RejectIdentity,
    RejectRegistry,
    SkipPresent,
    Copy,
}

pub fn classify(identity_ok: bool, registry_consistent: bool, dest_exists: bool) -> Decision {
    match (identity_ok, registry_consistent, dest_exists) {
        (false, _, _) => Decision::RejectIdentity,
        (true, false, _) => Decision::RejectRegistry,
        (true, true, true) => Decision::SkipPresent,
        (true, true, false) => Decision::Copy,
    }
}

/// One line of the disposition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispositionRecord {
    pub subject_id: String,
    pub visit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_date: Option<VisitDate>,
    pub paradigm: String,
    pub source_file: PathBuf,
    pub dest_file: Option<PathBuf>,
    pub disposition: CopyDisposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<CopyReceipt>,
}

/// Destination for disposition records.
pub trait DispositionSink {
    /// # Errors
    ///
    /// A failing sink aborts the run, since the log is the audit trail.
    fn record(&mut self, record: &DispositionRecord) -> SyncResult<()>;
}

impl DispositionSink for Vec<DispositionRecord> {
    fn record(&mut self, record: &DispositionRecord) -> SyncResult<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Emits one tracing event per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DispositionSink for TracingSink {
    fn record(&mut self, record: &DispositionRecord) -> SyncResult<()> {
        let dest = record
            .dest_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let reason = record.reason.as_deref().unwrap_or_default();

        match record.disposition {
            CopyDisposition::Copied | CopyDisposition::AlreadyPresent => tracing::info!(
                subject = %record.subject_id,
                visit = %record.visit,
                paradigm = %record.paradigm,
                source = %record.source_file.display(),
                dest = %dest,
                disposition = %record.disposition,
                "file disposition"
            ),
            _ => tracing::error!(
                subject = %record.subject_id,
                visit = %record.visit,
                paradigm = %record.paradigm,
                source = %record.source_file.display(),
                dest = %dest,
                disposition = %record.disposition,
                reason = %reason,
                "file disposition"
            ),
        }
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DispositionSink for JsonLinesSink<W> {
    fn record(&mut self, record: &DispositionRecord) -> SyncResult<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(SyncError::Serialization)?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(SyncError::DispositionLog)
    }
}

/// Forwards every record to two sinks.
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A: DispositionSink, B: DispositionSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: DispositionSink, B: DispositionSink> DispositionSink for TeeSink<A, B> {
    fn record(&mut self, record: &DispositionRecord) -> SyncResult<()> {
        self.first.record(record)?;
        self.second.record(record)
    }
}
