//! Filename reconciliation.
//!
//! Recording filenames and visit folder names are underscore-delimited identifier lists. This
//! module parses them into typed records instead of indexing into split strings, derives the
//! destination filename (embedding the visit date for the fixation paradigm) and checks that a
//! filename belongs to the subject whose folder it was found in.

use crate::constants::NAME_DELIMITER;
use crate::subject::SubjectId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("'{0}' has fewer than two underscore-delimited components")]
    TooFewComponents(String),
    #[error("'{0}' contains an empty component")]
    EmptyComponent(String),
    #[error("visit folder '{0}' has no numeric date component")]
    MissingVisitDateToken(String),
}

/// A recording filename split into its identifier components.
///
/// `012345_AttenAud_run1_raw.fif` parses into subject token `012345`, identifiers
/// `[AttenAud, run1]` and final component `raw.fif`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingName {
    subject_token: String,
    identifiers: Vec<String>,
    final_component: String,
}

impl RecordingName {
    pub fn parse(filename: &str) -> Result<Self, NameError> {
        let parts: Vec<&str> = filename.split(NAME_DELIMITER).collect();
        if parts.len() < 2 {
            return Err(NameError::TooFewComponents(filename.to_owned()));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(NameError::EmptyComponent(filename.to_owned()));
        }

        let (first, rest) = parts.split_at(1);
        let (middle, last) = rest.split_at(rest.len() - 1);
        Ok(Self {
            subject_token: first[0].to_owned(),
            identifiers: middle.iter().map(|s| (*s).to_owned()).collect(),
            final_component: last[0].to_owned(),
        })
    }

    /// Inserts `token` immediately before the final component.
    pub fn with_token_before_final(mut self, token: &str) -> Self {
        self.identifiers.push(token.to_owned());
        self
    }

    /// Rebuilds the underscore-delimited filename.
    pub fn to_filename(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.identifiers.len() + 2);
        parts.push(&self.subject_token);
        parts.extend(self.identifiers.iter().map(String::as_str));
        parts.push(&self.final_component);
        let delimiter = NAME_DELIMITER.to_string();
        parts.join(delimiter.as_str())
    }
}

/// A visit folder name carrying a date token, e.g. `visit_20220101` or `220101_fix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitFolderName {
    name: String,
    date_token: Option<String>,
}

impl VisitFolderName {
    /// The date token is the second underscore-delimited component when that is numeric,
    /// otherwise the first numeric component.
    pub fn parse(name: &str) -> Self {
        let is_numeric = |t: &&str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());
        let date_token = name
            .split(NAME_DELIMITER)
            .nth(1)
            .filter(is_numeric)
            .or_else(|| name.split(NAME_DELIMITER).find(is_numeric))
            .map(str::to_owned);
        Self {
            name: name.to_owned(),
            date_token,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The date token inserted into fixation filenames.
    pub fn date_token(&self) -> Result<&str, NameError> {
        self.date_token
            .as_deref()
            .ok_or_else(|| NameError::MissingVisitDateToken(self.name.clone()))
    }
}

/// Derives the destination filename for `source_filename`.
///
/// Fixation recordings do not carry the visit date in their raw name, so it is inserted before
/// the final component; all other recordings keep their name unchanged.
pub fn derive_destination_name(
    source_filename: &str,
    visit_folder: &VisitFolderName,
    is_fixation: bool,
) -> Result<String, NameError> {
    let parsed = RecordingName::parse(source_filename)?;
    if !is_fixation {
        return Ok(source_filename.to_owned());
    }
    let token = visit_folder.date_token()?;
    Ok(parsed.with_token_before_final(token).to_filename())
}

/// True iff the filename's leading token equals `subject` exactly.
pub fn identity_matches(subject: &SubjectId, filename: &str) -> bool {
    filename
        .split(NAME_DELIMITER)
        .next()
        .is_some_and(|leading| leading == subject.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn subject(id: &str) -> SubjectId {
        SubjectId::from_folder_name(&format!("subj_{id}")).unwrap()
    }

    #[test]
    fn fixation_name_gets_visit_date_before_final_component() {
        let visit = VisitFolderName::parse("220101_fix");
        let name = derive_destination_name("0123456_task_raw.fif", &visit, true).unwrap();
        assert_eq!(name, "0123456_task_220101_raw.fif");
    }

    #[test]
    fn non_fixation_name_is_unchanged() {
        let visit = VisitFolderName::parse("220101_fix");
        let name = derive_destination_name("012345_AttenAud_raw.fif", &visit, false).unwrap();
        assert_eq!(name, "012345_AttenAud_raw.fif");
    }

    #[test]
    fn destination_visit_folder_supplies_full_date() {
        let visit = VisitFolderName::parse("visit_20220101");
        assert_eq!(visit.date_token().unwrap(), "20220101");
        let name = derive_destination_name("012345_fix_raw.fif", &visit, true).unwrap();
        assert_eq!(name, "012345_fix_20220101_raw.fif");
    }

    #[test]
    fn fixation_requires_visit_date_token() {
        let visit = VisitFolderName::parse("pilot_fix");
        assert_eq!(
            derive_destination_name("012345_fix_raw.fif", &visit, true),
            Err(NameError::MissingVisitDateToken("pilot_fix".into()))
        );
    }

    #[test]
    fn single_component_names_are_parse_errors() {
        assert_eq!(
            RecordingName::parse("raw.fif"),
            Err(NameError::TooFewComponents("raw.fif".into()))
        );
        assert_eq!(
            RecordingName::parse("012345__raw.fif"),
            Err(NameError::EmptyComponent("012345__raw.fif".into()))
        );
    }

    #[test]
    fn recording_name_rebuilds_with_inserted_token() {
        let name = RecordingName::parse("012345_AttenAud_run1_raw.fif").unwrap();
        assert_eq!(name.to_filename(), "012345_AttenAud_run1_raw.fif");
        assert_eq!(
            name.with_token_before_final("20220101").to_filename(),
            "012345_AttenAud_run1_20220101_raw.fif"
        );
    }

    #[test]
    fn identity_requires_exact_leading_token() {
        let s = subject("012345");
        assert!(identity_matches(&s, "012345_AttenAud_raw.fif"));
        assert!(!identity_matches(&s, "012354_AttenAud_raw.fif"));
        assert!(!identity_matches(&s, "0123456_AttenAud_raw.fif"));
        assert!(!identity_matches(&s, "12345_AttenAud_raw.fif"));
    }

    proptest! {
        #[test]
        fn prop_identity_mismatch_detected(
            id in "[0-9]{6}",
            other in "[0-9A-Za-z]{1,8}",
            paradigm in "[A-Za-z]{1,10}",
        ) {
            prop_assume!(id != other);
            let s = subject(&id);
            let filename = format!("{other}_{paradigm}_raw.fif");
            prop_assert!(!identity_matches(&s, &filename));
        }

        #[test]
        fn prop_fixation_rename_keeps_leading_token(
            id in "[0-9]{6}",
            middle in "[A-Za-z0-9]{1,8}",
            date in "[0-9]{6}",
        ) {
            let visit = VisitFolderName::parse(&format!("{date}_fix"));
            let source = format!("{id}_{middle}_raw.fif");
            let renamed = derive_destination_name(&source, &visit, true).unwrap();
            let expected = format!("{}_{}_{}_raw.fif", id, middle, date);
            prop_assert_eq!(renamed, expected);
            prop_assert!(identity_matches(&subject(&id), &source));
        }
    }
}
