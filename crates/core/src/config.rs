//! Run configuration.
//!
//! This module defines configuration that is resolved once at process startup and then passed
//! into the synchronisation engine. No component reads environment variables or scans the
//! archive at module load; everything a run needs is carried by [`SyncConfig`].

use crate::{SyncError, SyncResult};
use megsync_types::NonEmptyText;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Immutable configuration for one synchronisation run.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    source_root: PathBuf,
    dest_root: PathBuf,
    years: BTreeSet<String>,
    paradigms: Vec<NonEmptyText>,
    fixation_marker: NonEmptyText,
}

impl SyncConfig {
    /// Create a new `SyncConfig`.
    ///
    /// # Arguments
    ///
    /// * `source_root` - Root of the source archive (one folder per subject).
    /// * `dest_root` - Root of the destination tree (one folder per paradigm).
    /// * `years` - Four-digit years of interest.
    /// * `paradigms` - Paradigm allow-list; duplicates are dropped, order is kept.
    /// * `fixation_marker` - Name of the paradigm whose files get the visit date embedded.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidInput` if:
    /// - a year is not exactly four ASCII digits, or no year is given,
    /// - no paradigm is given, or a paradigm contains glob metacharacters or path separators,
    /// - the fixation marker is empty.
    pub fn new<Y, P>(
        source_root: PathBuf,
        dest_root: PathBuf,
        years: Y,
        paradigms: P,
        fixation_marker: &str,
    ) -> SyncResult<Self>
    where
        Y: IntoIterator,
        Y::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut year_set = BTreeSet::new();
        for year in years {
            let year = year.as_ref().trim();
            if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
                return Err(SyncError::InvalidInput(format!(
                    "year of interest must be four digits, got '{year}'"
                )));
            }
            year_set.insert(year.to_owned());
        }
        if year_set.is_empty() {
            return Err(SyncError::InvalidInput(
                "at least one year of interest is required".into(),
            ));
        }

        let mut paradigm_list: Vec<NonEmptyText> = Vec::new();
        for paradigm in paradigms {
            let paradigm = NonEmptyText::new(paradigm.as_ref())?;
            validate_paradigm(paradigm.as_str())?;
            if !paradigm_list.contains(&paradigm) {
                paradigm_list.push(paradigm);
            }
        }
        if paradigm_list.is_empty() {
            return Err(SyncError::InvalidInput(
                "at least one paradigm is required".into(),
            ));
        }
        warn_on_overlapping_paradigms(&paradigm_list);

        let fixation_marker = NonEmptyText::new(fixation_marker).map_err(|_| {
            SyncError::InvalidInput("fixation marker cannot be empty".into())
        })?;

        Ok(Self {
            source_root,
            dest_root,
            years: year_set,
            paradigms: paradigm_list,
            fixation_marker,
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    pub fn years(&self) -> &BTreeSet<String> {
        &self.years
    }

    pub fn paradigms(&self) -> &[NonEmptyText] {
        &self.paradigms
    }

    pub fn fixation_marker(&self) -> &str {
        self.fixation_marker.as_str()
    }

    /// True when `paradigm` is the fixation paradigm.
    pub fn is_fixation(&self, paradigm: &str) -> bool {
        paradigm == self.fixation_marker.as_str()
    }

    /// Directory of `paradigm` in the destination tree.
    pub fn paradigm_dir(&self, paradigm: &str) -> PathBuf {
        self.dest_root.join(paradigm)
    }
}

fn validate_paradigm(paradigm: &str) -> SyncResult<()> {
    let forbidden = ['*', '?', '[', ']', '/', '\\'];
    if paradigm.contains(forbidden) {
        return Err(SyncError::InvalidInput(format!(
            "paradigm '{paradigm}' contains glob metacharacters or path separators"
        )));
    }
    if paradigm == "." || paradigm == ".." {
        return Err(SyncError::InvalidInput(format!(
            "paradigm '{paradigm}' is not a valid directory name"
        )));
    }
    Ok(())
}

/// Paradigm matching is by substring, so "ASSR" also picks up "ASSRnew" recordings.
fn warn_on_overlapping_paradigms(paradigms: &[NonEmptyText]) {
    for a in paradigms {
        for b in paradigms {
            if a != b && b.as_str().contains(a.as_str()) {
                tracing::warn!(
                    "paradigm '{}' is a substring of '{}'; its search will also match '{}' recordings",
                    a,
                    b,
                    b
                );
            }
        }
    }
}

/// On-disk configuration (YAML).
///
/// ```yaml
/// source_root: /archive/megraid
/// dest_root: /data/MEG
/// years: ["2022"]
/// paradigms: [erm, AttenAud]
/// fixation_marker: fix
/// registry: /data/registry.yaml
/// log_dir: /data/logs
/// ```
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub years: Vec<String>,
    pub paradigms: Vec<String>,
    pub fixation_marker: String,
    #[serde(default)]
    pub registry: Option<PathBuf>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Read and parse a YAML configuration file.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(SyncError::ConfigRead)?;
        Self::parse(&contents)
    }

    /// Parse YAML configuration text.
    pub fn parse(yaml: &str) -> SyncResult<Self> {
        serde_yaml::from_str(yaml).map_err(SyncError::YamlDeserialization)
    }

    /// Validate into the immutable run configuration.
    pub fn to_sync_config(&self) -> SyncResult<SyncConfig> {
        SyncConfig::new(
            self.source_root.clone(),
            self.dest_root.clone(),
            &self.years,
            &self.paradigms,
            &self.fixation_marker,
        )
    }
}
