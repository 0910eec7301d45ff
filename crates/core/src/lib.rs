//! # megsync Core
//!
//! Visit resolution and synchronisation engine for MEG recordings.
//!
//! This crate decides which recordings in a loosely structured source archive belong in the
//! destination tree, where they go, and whether they may be copied:
//! - Subject folder validation (`subject`)
//! - Visit and paradigm resolution (`resolver`)
//! - Filename reconciliation and identity checks (`naming`)
//! - Destination path derivation and provisioning (`provision`)
//! - Registry consistency checks (`registry`)
//! - Per-file dispositions and the disposition log (`disposition`)
//! - The synchronisation driver (`sync`)
//!
//! **No I/O policy**: where the disposition log is persisted, how the registry snapshot is
//! obtained and how recordings are parsed are decided by the caller through the
//! [`DispositionSink`], [`RegistryProvider`] and [`MetadataReader`] traits.

pub mod config;
pub mod constants;
pub mod disposition;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod provision;
pub mod registry;
pub mod resolver;
pub mod subject;
pub mod sync;

pub use config::{ConfigFile, SyncConfig};
pub use disposition::{
    CopyDisposition, DispositionRecord, DispositionSink, JsonLinesSink, TeeSink, TracingSink,
};
pub use error::{SyncError, SyncResult};
pub use metadata::{AcquisitionInfo, FifMetadataReader, MetadataReader};
pub use naming::{derive_destination_name, identity_matches, NameError, VisitFolderName};
pub use registry::{RegistryProvider, RegistrySnapshot, VisitCandidate, YamlRegistryFile};
pub use resolver::{resolve, ResolvedVisits, VisitParadigmKey};
pub use subject::{is_valid_subject, SubjectId};
pub use sync::{scan_subject_folders, RunReport, SkippedGroup, SubjectFolder, SyncService};
