//! Registry consistency checking.
//!
//! The registry is the external system of record listing every subject's expected visits and the
//! paradigms recorded at each. A snapshot is fetched once before a run starts and is only ever
//! queried; a recording whose (visit date, paradigm) is not in its subject's registered record
//! must not be copied.
//!
//! The snapshot is exported as YAML:
//!
//! ```yaml
//! subjects:
//!   "012345":
//!     - date: "20220101"
//!       paradigms: [AttenAud, erm]
//! ```

use crate::subject::SubjectId;
use crate::{SyncError, SyncResult};
use megsync_types::VisitDate;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One registered visit of a subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisteredVisit {
    pub date: VisitDate,
    #[serde(default)]
    pub paradigms: BTreeSet<String>,
}

/// Read-only snapshot of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySnapshot {
    #[serde(default)]
    subjects: BTreeMap<String, Vec<RegisteredVisit>>,
}

/// The visit a recording is about to be filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitCandidate {
    pub date: VisitDate,
    pub paradigm: String,
}

impl RegistrySnapshot {
    pub fn new(subjects: BTreeMap<String, Vec<RegisteredVisit>>) -> Self {
        Self { subjects }
    }

    pub fn parse(yaml: &str) -> SyncResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SyncError::RegistryUnavailable(format!("invalid registry snapshot: {e}")))
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Registered visits of `subject`, if the subject is known.
    pub fn visits(&self, subject: &SubjectId) -> Option<&[RegisteredVisit]> {
        self.subjects.get(subject.as_str()).map(Vec::as_slice)
    }

    /// True when `candidate` must be blocked.
    ///
    /// A candidate is inconsistent when the subject is not registered at all, or when none of
    /// the subject's registered visits on the candidate date lists the candidate paradigm.
    pub fn is_inconsistent(&self, subject: &SubjectId, candidate: &VisitCandidate) -> bool {
        let Some(visits) = self.visits(subject) else {
            return true;
        };
        !visits
            .iter()
            .any(|v| v.date == candidate.date && v.paradigms.contains(&candidate.paradigm))
    }
}

/// Source of the registry snapshot, fetched once per run.
pub trait RegistryProvider {
    /// # Errors
    ///
    /// Returns `SyncError::RegistryUnavailable` when the snapshot cannot be obtained. Callers
    /// must abort the run.
    fn fetch(&self) -> SyncResult<RegistrySnapshot>;
}

/// Registry snapshot exported to a YAML file.
#[derive(Debug, Clone)]
pub struct YamlRegistryFile {
    path: PathBuf,
}

impl YamlRegistryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryProvider for YamlRegistryFile {
    fn fetch(&self) -> SyncResult<RegistrySnapshot> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            SyncError::RegistryUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        let snapshot = RegistrySnapshot::parse(&contents)?;
        tracing::info!(
            "registry snapshot loaded from {} ({} subjects)",
            self.path.display(),
            snapshot.subject_count()
        );
        Ok(snapshot)
    }
}
