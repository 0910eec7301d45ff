use chrono::{DateTime, NaiveDate};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when creating a [`VisitDate`].
#[derive(Debug, thiserror::Error)]
pub enum VisitDateError {
    /// The input was not an 8-digit `YYYYMMDD` calendar date
    #[error("visit date must be an 8-digit YYYYMMDD calendar date, got: '{0}'")]
    InvalidFormat(String),

    /// The timestamp is outside the range chrono can represent
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}

/// The canonical, unambiguous date of a visit.
///
/// Source archive folders only carry a two-digit year, so the canonical date always comes from
/// the recording's own metadata. It is displayed and serialised as `YYYYMMDD`, which is also the
/// form embedded in destination directory names (`visit_YYYYMMDD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitDate(NaiveDate);

impl VisitDate {
    /// Builds a visit date from year, month and day.
    ///
    /// Returns `None` when the combination is not a real calendar date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses the compact `YYYYMMDD` form.
    ///
    /// # Errors
    ///
    /// Returns [`VisitDateError::InvalidFormat`] unless `input` is exactly eight ASCII digits
    /// forming a valid calendar date.
    pub fn parse_compact(input: &str) -> Result<Self, VisitDateError> {
        if input.len() != 8 || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VisitDateError::InvalidFormat(input.to_owned()));
        }
        NaiveDate::parse_from_str(input, "%Y%m%d")
            .map(Self)
            .map_err(|_| VisitDateError::InvalidFormat(input.to_owned()))
    }

    /// Derives the UTC calendar date of a Unix timestamp (seconds).
    ///
    /// # Errors
    ///
    /// Returns [`VisitDateError::TimestampOutOfRange`] if chrono cannot represent `secs`.
    pub fn from_unix_seconds(secs: i64) -> Result<Self, VisitDateError> {
        DateTime::from_timestamp(secs, 0)
            .map(|dt| Self(dt.date_naive()))
            .ok_or(VisitDateError::TimestampOutOfRange(secs))
    }

    /// Returns the `YYYYMMDD` form.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl std::fmt::Display for VisitDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl std::str::FromStr for VisitDate {
    type Err = VisitDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisitDate::parse_compact(s)
    }
}

impl serde::Serialize for VisitDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.compact())
    }
}

impl<'de> serde::Deserialize<'de> for VisitDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        VisitDate::parse_compact(&s).map_err(serde::de::Error::custom)
    }
}
