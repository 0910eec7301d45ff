//! Destination path derivation and provisioning.
//!
//! The destination tree is laid out as:
//!
//! ```text
//! <dest_root>/
//! └── <paradigm>/
//!     └── <subject>/
//!         └── visit_<YYYYMMDD>/
//!             └── <recording>
//! ```
//!
//! The visit date in the path always comes from recording metadata, never from the source
//! folder's abbreviated date token.

use crate::constants::VISIT_DIR_PREFIX;
use crate::subject::SubjectId;
use crate::{SyncError, SyncResult};
use megsync_files::TransferService;
use megsync_types::VisitDate;
use std::path::{Path, PathBuf};

/// Visit directory for `subject` under `paradigm_dir`.
///
/// Pure function of its inputs: equal inputs always give the same path.
pub fn destination_visit_dir(
    paradigm_dir: &Path,
    subject: &SubjectId,
    visit_date: &VisitDate,
) -> PathBuf {
    paradigm_dir
        .join(subject.as_str())
        .join(format!("{VISIT_DIR_PREFIX}{}", visit_date.compact()))
}

/// Full destination path of a reconciled recording filename.
pub fn destination_file(
    paradigm_dir: &Path,
    subject: &SubjectId,
    visit_date: &VisitDate,
    dest_filename: &str,
) -> PathBuf {
    destination_visit_dir(paradigm_dir, subject, visit_date).join(dest_filename)
}

/// Ensures `paradigm_dir/subject/visit_<date>/` exists and returns it.
///
/// Each missing level is created individually, so re-running is a no-op once the hierarchy
/// exists.
///
/// # Errors
///
/// Returns `SyncError::DirCreation` if a level cannot be created, lies outside the destination
/// root, or exists as something other than a directory.
pub fn ensure_path(
    transfer: &TransferService,
    paradigm_dir: &Path,
    subject: &SubjectId,
    visit_date: &VisitDate,
) -> SyncResult<PathBuf> {
    let subject_dir = paradigm_dir.join(subject.as_str());
    let visit_dir = destination_visit_dir(paradigm_dir, subject, visit_date);

    for dir in [paradigm_dir, subject_dir.as_path(), visit_dir.as_path()] {
        if transfer.ensure_dir(dir).map_err(SyncError::DirCreation)? {
            tracing::info!("created directory {}", dir.display());
        }
    }

    Ok(visit_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn subject(id: &str) -> SubjectId {
        SubjectId::from_folder_name(id).unwrap()
    }

    #[test]
    fn visit_dir_uses_compact_metadata_date() {
        let date = VisitDate::from_ymd(2022, 1, 1).unwrap();
        let path = destination_file(
            Path::new("/dest/AttenAud"),
            &subject("012345"),
            &date,
            "012345_AttenAud_raw.fif",
        );
        assert_eq!(
            path,
            PathBuf::from("/dest/AttenAud/012345/visit_20220101/012345_AttenAud_raw.fif")
        );
    }

    #[test]
    fn ensure_path_creates_missing_levels() {
        let temp = TempDir::new().unwrap();
        let transfer = TransferService::new(temp.path()).unwrap();
        let paradigm_dir = transfer.root_directory().join("erm");
        let date = VisitDate::from_ymd(2022, 3, 4).unwrap();

        let visit_dir = ensure_path(&transfer, &paradigm_dir, &subject("012345"), &date).unwrap();

        assert!(visit_dir.is_dir());
        assert!(visit_dir.ends_with("erm/012345/visit_20220304"));
    }

    #[test]
    fn ensure_path_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let transfer = TransferService::new(temp.path()).unwrap();
        let paradigm_dir = transfer.root_directory().join("erm");
        let date = VisitDate::from_ymd(2022, 3, 4).unwrap();

        let first = ensure_path(&transfer, &paradigm_dir, &subject("012345"), &date).unwrap();
        std::fs::write(first.join("keep.txt"), b"x").unwrap();
        let second = ensure_path(&transfer, &paradigm_dir, &subject("012345"), &date).unwrap();

        assert_eq!(first, second);
        assert!(second.join("keep.txt").exists());
    }

    #[test]
    fn ensure_path_fails_when_level_is_a_file() {
        let temp = TempDir::new().unwrap();
        let transfer = TransferService::new(temp.path()).unwrap();
        let paradigm_dir = transfer.root_directory().join("erm");
        std::fs::write(&paradigm_dir, b"not a dir").unwrap();
        let date = VisitDate::from_ymd(2022, 3, 4).unwrap();

        let result = ensure_path(&transfer, &paradigm_dir, &subject("012345"), &date);
        assert!(matches!(result, Err(SyncError::DirCreation(_))));
    }

    proptest! {
        #[test]
        fn prop_destination_path_is_deterministic(
            paradigm in "[A-Za-z]{1,10}",
            id in "[0-9]{6}",
            days in 0i64..20_000,
            file in "[A-Za-z0-9_]{1,20}raw\\.fif",
        ) {
            let date = VisitDate::from_unix_seconds(days * 86_400).unwrap();
            let paradigm_dir = Path::new("/dest").join(&paradigm);
            let a = destination_file(&paradigm_dir, &subject(&id), &date, &file);
            let b = destination_file(&paradigm_dir, &subject(&id), &date, &file);
            prop_assert_eq!(&a, &b);
            let expected_visit = format!("visit_{}", date.compact());
            prop_assert!(a.starts_with(paradigm_dir.join(&id).join(expected_visit)));
        }
    }
}
