//! Subject folder validation.
//!
//! Source archive folders follow a `<prefix>_<SUBJECTID>` pattern. The identifier is the token
//! after the last underscore (or the whole name when there is none). A folder denotes a
//! legitimate subject only when that token is exactly six ASCII digits and does not contain the
//! excluded `AC` marker; every other folder is skipped before any of its contents are read.

use crate::constants::{EXCLUDED_SUBJECT_MARKER, NAME_DELIMITER, SUBJECT_ID_LEN};
use std::fmt;

/// A validated subject identifier taken from a source folder name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Extracts and validates the subject identifier of `folder_name`.
    ///
    /// Returns `None` when the folder does not denote a legitimate subject.
    pub fn from_folder_name(folder_name: &str) -> Option<Self> {
        let token = subject_token(folder_name);
        if is_valid_subject_token(token) {
            Some(Self(token.to_owned()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true when `folder_name` denotes a legitimate subject.
///
/// A folder is rejected if its trailing token is not a six-digit numeric id, or if it contains
/// the `AC` marker.
pub fn is_valid_subject(folder_name: &str) -> bool {
    is_valid_subject_token(subject_token(folder_name))
}

fn subject_token(folder_name: &str) -> &str {
    folder_name
        .rsplit(NAME_DELIMITER)
        .next()
        .unwrap_or(folder_name)
}

fn is_valid_subject_token(token: &str) -> bool {
    let numeric = !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit());
    let rejected =
        !(numeric && token.len() == SUBJECT_ID_LEN) || token.contains(EXCLUDED_SUBJECT_MARKER);
    !rejected
}
