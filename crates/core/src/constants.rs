//! Constants used throughout the megsync core crate.
//!
//! Naming conventions of the source archive and destination tree live here so that every
//! component derives names the same way.

/// Suffix marker identifying a raw recording file in a visit folder.
pub const RECORDING_SUFFIX: &str = "raw.fif";

/// Prefix of destination visit directories (`visit_YYYYMMDD`).
pub const VISIT_DIR_PREFIX: &str = "visit_";

/// Century prefix applied to the two-digit year at the start of a visit folder name.
pub const CENTURY_PREFIX: &str = "20";

/// Number of digits in a subject identifier.
pub const SUBJECT_ID_LEN: usize = 6;

/// Marker that disqualifies a subject folder.
pub const EXCLUDED_SUBJECT_MARKER: &str = "AC";

/// Delimiter between identifier components in folder names and filenames.
pub const NAME_DELIMITER: char = '_';

/// Default configuration file used by the runner.
pub const DEFAULT_CONFIG_FILE: &str = "megsync.yaml";

/// Default directory for disposition logs.
pub const DEFAULT_LOG_DIR: &str = "logs";
