//! Synchronisation driver.
//!
//! [`SyncService`] walks the source archive subject by subject, resolves the visit/paradigm
//! groups of interest, provisions their destination directories and decides, file by file,
//! whether to copy. Processing is strictly sequential.
//!
//! Error handling follows four levels:
//!
//! - **Run**: a missing archive root or destination root aborts before any subject is read; so
//!   does a failing disposition sink.
//! - **Subject**: an invalid or unreadable subject folder is skipped and reported.
//! - **Group**: unreadable first-file metadata, or a destination directory that cannot be
//!   created, skips the whole visit/paradigm group.
//! - **File**: every candidate file that reaches the per-file stage gets exactly one
//!   [`CopyDisposition`].

use crate::config::SyncConfig;
use crate::disposition::{classify, CopyDisposition, Decision, DispositionRecord, DispositionSink};
use crate::metadata::MetadataReader;
use crate::naming::{derive_destination_name, identity_matches, VisitFolderName};
use crate::provision::{destination_file, ensure_path};
use crate::registry::{RegistrySnapshot, VisitCandidate};
use crate::resolver::{resolve, VisitParadigmKey};
use crate::subject::SubjectId;
use crate::{SyncError, SyncResult};
use megsync_files::{TransferOutcome, TransferService};
use megsync_types::VisitDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A folder directly under the source archive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFolder {
    pub name: String,
    pub path: PathBuf,
    /// `None` when the folder name does not denote a legitimate subject.
    pub subject: Option<SubjectId>,
}

/// Lists the folders under `source_root`, sorted by name, with their subject verdicts.
///
/// # Errors
///
/// Returns `SyncError::ArchiveRootMissing` if `source_root` is not a directory, or
/// `SyncError::DirRead` if it cannot be listed.
pub fn scan_subject_folders(source_root: &Path) -> SyncResult<Vec<SubjectFolder>> {
    if !source_root.is_dir() {
        return Err(SyncError::ArchiveRootMissing(source_root.to_path_buf()));
    }

    let entries = fs::read_dir(source_root).map_err(|source| SyncError::DirRead {
        path: source_root.to_path_buf(),
        source,
    })?;

    let mut folders = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::warn!("skipping folder with non UTF-8 name: {}", path.display());
            continue;
        };
        let subject = SubjectId::from_folder_name(&name);
        folders.push(SubjectFolder {
            name,
            path,
            subject,
        });
    }
    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

/// A visit/paradigm group that was not processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedGroup {
    pub subject: String,
    pub key: String,
    pub reason: String,
    pub file_count: usize,
}

/// Everything a run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub dispositions: Vec<DispositionRecord>,
    pub skipped_subjects: Vec<String>,
    pub skipped_groups: Vec<SkippedGroup>,
}

impl RunReport {
    pub fn count(&self, disposition: CopyDisposition) -> usize {
        self.dispositions
            .iter()
            .filter(|r| r.disposition == disposition)
            .count()
    }

    pub fn rejection_count(&self) -> usize {
        self.dispositions
            .iter()
            .filter(|r| r.disposition.is_rejection())
            .count()
    }
}

/// Per-group context shared by every file of the group.
struct GroupContext<'a> {
    subject: &'a SubjectId,
    key: &'a VisitParadigmKey,
    source_visit_dir: PathBuf,
    dest_visit_dir: PathBuf,
    visit_date: VisitDate,
}

/// Drives a synchronisation run.
pub struct SyncService<M> {
    cfg: Arc<SyncConfig>,
    metadata: M,
    registry: RegistrySnapshot,
}

impl<M: MetadataReader> SyncService<M> {
    /// Creates a new `SyncService`.
    ///
    /// # Arguments
    ///
    /// * `cfg` - Run configuration.
    /// * `metadata` - Reader for recording acquisition metadata.
    /// * `registry` - Registry snapshot fetched before the run.
    pub fn new(cfg: Arc<SyncConfig>, metadata: M, registry: RegistrySnapshot) -> Self {
        Self {
            cfg,
            metadata,
            registry,
        }
    }

    /// Runs one synchronisation pass over the whole archive.
    ///
    /// Every disposition is handed to `sink` as soon as it is decided, and also collected in the
    /// returned report.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `SyncError::ArchiveRootMissing` / `SyncError::DestinationRootMissing` when a root is
    ///   missing (nothing is processed),
    /// - `SyncError::DirRead` if the archive root cannot be listed,
    /// - any error returned by `sink`.
    pub fn run(&self, sink: &mut dyn DispositionSink) -> SyncResult<RunReport> {
        let folders = scan_subject_folders(self.cfg.source_root())?;
        let transfer = TransferService::new(self.cfg.dest_root())
            .map_err(|_| SyncError::DestinationRootMissing(self.cfg.dest_root().to_path_buf()))?;

        tracing::info!(
            "sync run started: {} folders in {}",
            folders.len(),
            self.cfg.source_root().display()
        );

        let mut report = RunReport::default();
        for folder in &folders {
            let Some(subject) = &folder.subject else {
                tracing::warn!("skipping invalid subject folder {}", folder.name);
                report.skipped_subjects.push(folder.name.clone());
                continue;
            };
            self.sync_subject(&transfer, folder, subject, sink, &mut report)?;
        }

        tracing::info!(
            "sync run finished: {} copied, {} already present, {} rejected, {} groups skipped",
            report.count(CopyDisposition::Copied),
            report.count(CopyDisposition::AlreadyPresent),
            report.rejection_count(),
            report.skipped_groups.len()
        );
        Ok(report)
    }

    fn sync_subject(
        &self,
        transfer: &TransferService,
        folder: &SubjectFolder,
        subject: &SubjectId,
        sink: &mut dyn DispositionSink,
        report: &mut RunReport,
    ) -> SyncResult<()> {
        let groups = match resolve(&folder.path, self.cfg.years(), self.cfg.paradigms()) {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!("skipping subject folder {}: {}", folder.name, e);
                report.skipped_subjects.push(folder.name.clone());
                return Ok(());
            }
        };

        for (key, files) in &groups {
            let ctx = match self.prepare_group(transfer, folder, subject, key, files) {
                Ok(ctx) => ctx,
                Err(e) => {
                    tracing::error!("skipping {} for subject {}: {}", key, subject, e);
                    report.skipped_groups.push(SkippedGroup {
                        subject: subject.to_string(),
                        key: key.to_string(),
                        reason: e.to_string(),
                        file_count: files.len(),
                    });
                    continue;
                }
            };

            tracing::info!("{} has {} files for {}", subject, files.len(), key);
            for file in files {
                let record = self.sync_file(transfer, &ctx, file);
                sink.record(&record)?;
                report.dispositions.push(record);
            }
        }
        Ok(())
    }

    /// Reads the canonical visit date from the group's first file and provisions the
    /// destination visit directory.
    fn prepare_group<'a>(
        &self,
        transfer: &TransferService,
        folder: &SubjectFolder,
        subject: &'a SubjectId,
        key: &'a VisitParadigmKey,
        files: &[String],
    ) -> SyncResult<GroupContext<'a>> {
        let source_visit_dir = folder.path.join(&key.visit);
        let first = files
            .first()
            .ok_or_else(|| SyncError::InvalidInput(format!("group {key} has no files")))?;

        let info = self
            .metadata
            .read_acquisition_info(&source_visit_dir.join(first))?;
        if let Some(recorded) = &info.subject_id {
            if recorded != subject.as_str() {
                tracing::warn!(
                    "{} records subject '{}' but was found under subject {}",
                    first,
                    recorded,
                    subject
                );
            }
        }

        let paradigm_dir = self.cfg.paradigm_dir(&key.paradigm);
        let dest_visit_dir = ensure_path(transfer, &paradigm_dir, subject, &info.acquisition_date)?;

        Ok(GroupContext {
            subject,
            key,
            source_visit_dir,
            dest_visit_dir,
            visit_date: info.acquisition_date,
        })
    }

    fn sync_file(
        &self,
        transfer: &TransferService,
        ctx: &GroupContext<'_>,
        file: &str,
    ) -> DispositionRecord {
        let mut record = DispositionRecord {
            subject_id: ctx.subject.to_string(),
            visit: ctx.key.visit.clone(),
            visit_date: Some(ctx.visit_date),
            paradigm: ctx.key.paradigm.clone(),
            source_file: ctx.source_visit_dir.join(file),
            dest_file: None,
            disposition: CopyDisposition::RejectedUnaccounted,
            reason: None,
            receipt: None,
        };

        let dest_visit_name = ctx
            .dest_visit_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let identity_ok = identity_matches(ctx.subject, file);
        let dest_name = derive_destination_name(
            file,
            &VisitFolderName::parse(dest_visit_name),
            self.cfg.is_fixation(&ctx.key.paradigm),
        );
        let dest_file = match (dest_name, identity_ok) {
            (Ok(name), _) => Some(destination_file(
                &self.cfg.paradigm_dir(&ctx.key.paradigm),
                ctx.subject,
                &ctx.visit_date,
                &name,
            )),
            // The identity rejection below takes precedence over a malformed name.
            (Err(_), false) => None,
            (Err(e), true) => return unaccounted(record, SyncError::from(e).to_string()),
        };
        record.dest_file = dest_file.clone();

        let candidate = VisitCandidate {
            date: ctx.visit_date,
            paradigm: ctx.key.paradigm.clone(),
        };
        let decision = classify(
            identity_ok,
            !self.registry.is_inconsistent(ctx.subject, &candidate),
            dest_file.as_deref().is_some_and(Path::exists),
        );

        match decision {
            Decision::RejectIdentity => {
                record.disposition = CopyDisposition::RejectedIdentityMismatch;
                record.reason = Some(format!(
                    "filename subject token does not match subject {}",
                    ctx.subject
                ));
            }
            Decision::RejectRegistry => {
                record.disposition = CopyDisposition::RejectedRegistryInconsistent;
                record.reason = Some(format!(
                    "visit {} with paradigm {} is not registered for subject {}",
                    ctx.visit_date, ctx.key.paradigm, ctx.subject
                ));
            }
            Decision::SkipPresent => record.disposition = CopyDisposition::AlreadyPresent,
            Decision::Copy => {
                let Some(dest_file) = dest_file else {
                    return unaccounted(record, "no destination path was derived".into());
                };
                match transfer.copy_if_absent(&record.source_file, &dest_file) {
                    Ok(TransferOutcome::Copied(receipt)) => {
                        record.disposition = CopyDisposition::Copied;
                        record.receipt = Some(receipt);
                    }
                    Ok(TransferOutcome::AlreadyPresent) => {
                        record.disposition = CopyDisposition::AlreadyPresent;
                    }
                    Err(e) => return unaccounted(record, SyncError::from(e).to_string()),
                }
            }
        }
        record
    }
}

fn unaccounted(mut record: DispositionRecord, reason: String) -> DispositionRecord {
    tracing::error!(
        "{} could not be accounted for and needs manual investigation: {}",
        record.source_file.display(),
        reason
    );
    record.disposition = CopyDisposition::RejectedUnaccounted;
    record.reason = Some(reason);
    record
}
