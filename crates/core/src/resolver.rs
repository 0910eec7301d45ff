//! Visit and paradigm resolution.
//!
//! A subject folder in the source archive holds one folder per visit, named with a two-digit
//! year prefix (`220101`, `220101_fix`, ...). Resolution narrows a subject folder down to the
//! recordings of interest:
//!
//! 1. keep visit folders whose `20YY` year is one of the configured years,
//! 2. in each kept folder, match `*<paradigm>*raw.fif` for every configured paradigm,
//! 3. drop (visit, paradigm) groups with no matching file.
//!
//! Paradigm matching is by substring, so a paradigm that is a substring of another ("ASSR" and
//! "ASSRnew") also matches the longer paradigm's recordings.

use crate::constants::{CENTURY_PREFIX, NAME_DELIMITER, RECORDING_SUFFIX};
use crate::{SyncError, SyncResult};
use megsync_types::NonEmptyText;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use wildmatch::WildMatch;

/// Identifies one visit folder and paradigm combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitParadigmKey {
    pub visit: String,
    pub paradigm: String,
}

impl fmt::Display for VisitParadigmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.visit, NAME_DELIMITER, self.paradigm)
    }
}

/// Resolved groups of a subject folder; only non-empty groups are present.
pub type ResolvedVisits = BTreeMap<VisitParadigmKey, Vec<String>>;

/// Resolves the recordings of interest in `subject_folder`.
///
/// Files within a group are sorted by name so that runs process them in a stable order.
///
/// # Errors
///
/// Returns `SyncError::DirRead` if the subject folder or one of its kept visit folders cannot be
/// listed.
pub fn resolve(
    subject_folder: &Path,
    years: &BTreeSet<String>,
    paradigms: &[NonEmptyText],
) -> SyncResult<ResolvedVisits> {
    let visits = relevant_visits(subject_folder, years)?;

    let patterns: Vec<(&NonEmptyText, WildMatch)> = paradigms
        .iter()
        .map(|p| (p, WildMatch::new(&recording_pattern(p.as_str()))))
        .collect();

    let mut resolved = ResolvedVisits::new();
    for visit in visits {
        let visit_dir = subject_folder.join(&visit);
        let files = list_files(&visit_dir)?;

        for (paradigm, pattern) in &patterns {
            let matches: Vec<String> = files
                .iter()
                .filter(|name| pattern.matches(name))
                .cloned()
                .collect();

            if matches.is_empty() {
                continue;
            }

            resolved.insert(
                VisitParadigmKey {
                    visit: visit.clone(),
                    paradigm: paradigm.as_str().to_owned(),
                },
                matches,
            );
        }
    }

    tracing::debug!(
        "resolved {} visit/paradigm groups in {}",
        resolved.len(),
        subject_folder.display()
    );
    Ok(resolved)
}

/// The glob a recording of `paradigm` must match.
pub fn recording_pattern(paradigm: &str) -> String {
    format!("*{paradigm}*{RECORDING_SUFFIX}")
}

/// True when the visit folder's two-digit year prefix, read as `20YY`, is a year of interest.
pub fn is_relevant_visit(visit_folder: &str, years: &BTreeSet<String>) -> bool {
    match visit_folder.get(..2) {
        Some(yy) => years.contains(&format!("{CENTURY_PREFIX}{yy}")),
        None => false,
    }
}

fn relevant_visits(subject_folder: &Path, years: &BTreeSet<String>) -> SyncResult<Vec<String>> {
    let entries = fs::read_dir(subject_folder).map_err(|source| SyncError::DirRead {
        path: subject_folder.to_path_buf(),
        source,
    })?;

    let mut visits = Vec::new();
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::warn!(
                "skipping visit folder with non UTF-8 name in {}",
                subject_folder.display()
            );
            continue;
        };
        if is_relevant_visit(&name, years) {
            visits.push(name);
        }
    }
    visits.sort();
    Ok(visits)
}

fn list_files(dir: &Path) -> SyncResult<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|source| SyncError::DirRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(str::to_owned))
        .collect();
    files.sort();

    tracing::debug!("{} files found in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn years(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|y| (*y).to_owned()).collect()
    }

    fn paradigms(list: &[&str]) -> Vec<NonEmptyText> {
        list.iter().map(|p| NonEmptyText::new(p).unwrap()).collect()
    }

    fn touch(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), b"").unwrap();
    }

    fn key(visit: &str, paradigm: &str) -> VisitParadigmKey {
        VisitParadigmKey {
            visit: visit.into(),
            paradigm: paradigm.into(),
        }
    }

    #[test]
    fn keeps_only_years_of_interest() {
        let temp = TempDir::new().unwrap();
        let subject = temp.path().join("subj_012345");
        touch(&subject.join("220101"), "012345_erm_raw.fif");
        touch(&subject.join("210505"), "012345_erm_raw.fif");

        let resolved = resolve(&subject, &years(&["2022"]), &paradigms(&["erm"])).unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[&key("220101", "erm")], vec!["012345_erm_raw.fif"]);
    }

    #[test]
    fn matches_paradigm_and_recording_suffix() {
        let temp = TempDir::new().unwrap();
        let subject = temp.path().join("subj_012345");
        let visit = subject.join("22010a");
        touch(&visit, "012345_AttenAud_raw.fif");
        touch(&visit, "012345_AttenAud_run2_raw.fif");
        touch(&visit, "012345_AttenAud_raw-1.fif");
        touch(&visit, "012345_AttenAud_raw.fif.log");
        touch(&visit, "012345_erm_raw.fif");

        let resolved = resolve(
            &subject,
            &years(&["2022"]),
            &paradigms(&["AttenAud", "erm"]),
        )
        .unwrap();

        let atten: BTreeSet<&str> = resolved[&key("22010a", "AttenAud")]
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(
            atten,
            BTreeSet::from(["012345_AttenAud_raw.fif", "012345_AttenAud_run2_raw.fif"])
        );
        assert_eq!(resolved[&key("22010a", "erm")], vec!["012345_erm_raw.fif"]);
    }

    #[test]
    fn empty_groups_are_dropped() {
        let temp = TempDir::new().unwrap();
        let subject = temp.path().join("subj_012345");
        touch(&subject.join("220101"), "012345_erm_raw.fif");
        fs::create_dir_all(subject.join("220202")).unwrap();

        let resolved = resolve(
            &subject,
            &years(&["2022"]),
            &paradigms(&["erm", "fix"]),
        )
        .unwrap();

        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec![&key("220101", "erm")]);
    }

    #[test]
    fn substring_paradigms_over_match() {
        let temp = TempDir::new().unwrap();
        let subject = temp.path().join("subj_012345");
        touch(&subject.join("220101"), "012345_ASSRnew_raw.fif");

        let resolved = resolve(
            &subject,
            &years(&["2022"]),
            &paradigms(&["ASSR", "ASSRnew"]),
        )
        .unwrap();

        assert_eq!(resolved.len(), 2);
        assert!(resolved.contains_key(&key("220101", "ASSR")));
        assert!(resolved.contains_key(&key("220101", "ASSRnew")));
    }

    #[test]
    fn files_at_subject_level_are_not_visits() {
        let temp = TempDir::new().unwrap();
        let subject = temp.path().join("subj_012345");
        touch(&subject, "22_notes_raw.fif");

        let resolved = resolve(&subject, &years(&["2022"]), &paradigms(&["notes"])).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn missing_subject_folder_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = resolve(
            &temp.path().join("missing"),
            &years(&["2022"]),
            &paradigms(&["erm"]),
        );
        assert!(matches!(result, Err(SyncError::DirRead { .. })));
    }

    #[test]
    fn relevant_visit_uses_two_digit_prefix() {
        let y = years(&["2022"]);
        assert!(is_relevant_visit("220101", &y));
        assert!(is_relevant_visit("22", &y));
        assert!(!is_relevant_visit("2", &y));
        assert!(!is_relevant_visit("120101", &y));
    }

    #[test]
    fn key_displays_as_visit_underscore_paradigm() {
        assert_eq!(key("220101", "AttenAud").to_string(), "220101_AttenAud");
    }
}
