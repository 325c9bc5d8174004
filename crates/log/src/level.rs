//! Severity levels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::value_type_name;
use crate::core::{LogError, LogResult};

/// PSR-3 severity, from most (`Emergency = 0`) to least (`Debug = 7`) severe
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// System is unusable
    Emergency = 0,
    /// Action must be taken immediately
    Alert = 1,
    /// Critical conditions
    Critical = 2,
    /// Runtime errors that do not require immediate action
    Error = 3,
    /// Exceptional occurrences that are not errors
    Warning = 4,
    /// Normal but significant events
    Notice = 5,
    /// Interesting events
    Info = 6,
    /// Detailed debug information
    Debug = 7,
}

impl Level {
    /// All levels in ascending code order
    pub const ALL: [Level; 8] = [
        Level::Emergency,
        Level::Alert,
        Level::Critical,
        Level::Error,
        Level::Warning,
        Level::Notice,
        Level::Info,
        Level::Debug,
    ];

    /// Numeric code (0-7)
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Lowercase PSR-3 name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Level::Emergency => "emergency",
            Level::Alert => "alert",
            Level::Critical => "critical",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }

    /// Uppercase name used in rendered entries
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Level::Emergency => "EMERGENCY",
            Level::Alert => "ALERT",
            Level::Critical => "CRITICAL",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Notice => "NOTICE",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }

    /// Capitalized variant name, as handed to entry transforms
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Level::Emergency => "Emergency",
            Level::Alert => "Alert",
            Level::Critical => "Critical",
            Level::Error => "Error",
            Level::Warning => "Warning",
            Level::Notice => "Notice",
            Level::Info => "Info",
            Level::Debug => "Debug",
        }
    }

    /// Look a level up by its PSR-3 name
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidLevelName`] for anything but the eight lowercase names
    pub fn from_name(name: &str) -> LogResult<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.name() == name)
            .ok_or_else(|| LogError::InvalidLevelName(name.to_string()))
    }

    /// Convert a raw integer code
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] when `code` is outside 0-7
    pub fn from_code(code: i64) -> LogResult<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or_else(|| LogError::InvalidArgument(format!("invalid log level {code}")))
    }

    /// Convert a raw level given as an integer or a PSR-3 name
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] for other JSON types or out of range
    /// integers, [`LogError::InvalidLevelName`] for unknown names
    pub fn from_value(value: &serde_json::Value) -> LogResult<Self> {
        match value {
            serde_json::Value::String(name) => Self::from_name(name),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(code) => Self::from_code(code),
                None => Err(LogError::InvalidArgument(format!(
                    "level must be of type int|Level|string, {} given",
                    value_type_name(value)
                ))),
            },
            other => Err(LogError::InvalidArgument(format!(
                "level must be of type int|Level|string, {} given",
                value_type_name(other)
            ))),
        }
    }
}

/// Name of the level with the given code
///
/// # Errors
///
/// [`LogError::InvalidArgument`] when `code` is outside 0-7
pub fn to_name(code: i64) -> LogResult<&'static str> {
    Level::from_code(code).map(Level::name)
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<i64> for Level {
    type Error = LogError;

    fn try_from(code: i64) -> Result<Self, LogError> {
        Self::from_code(code)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.code()
    }
}

/// Set of severities a handler accepts
///
/// Never empty. Iteration is in ascending code order regardless of the
/// order levels were supplied in.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelSet(u8);

impl LevelSet {
    /// Every level
    pub const ALL: LevelSet = LevelSet(u8::MAX);

    /// Build a set from levels, dropping duplicates
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] when `levels` is empty
    pub fn new(levels: impl IntoIterator<Item = Level>) -> LogResult<Self> {
        let mask = levels
            .into_iter()
            .fold(0u8, |mask, level| mask | (1 << level.code()));
        if mask == 0 {
            return Err(LogError::InvalidArgument("levels must not be empty".into()));
        }
        Ok(Self(mask))
    }

    /// Build a set from raw integer codes
    ///
    /// # Errors
    ///
    /// [`LogError::InvalidArgument`] when `codes` is empty or holds a value
    /// outside 0-7; the message names the 1-based position of that value
    pub fn from_codes(codes: &[i64]) -> LogResult<Self> {
        if codes.is_empty() {
            return Err(LogError::InvalidArgument("levels must not be empty".into()));
        }
        let mut levels = Vec::with_capacity(codes.len());
        for (idx, &code) in codes.iter().enumerate() {
            let level = Level::from_code(code).map_err(|_| {
                LogError::InvalidArgument(format!(
                    "value #{} of levels cannot be {code}; it is not in the range 0 - 7",
                    idx + 1
                ))
            })?;
            levels.push(level);
        }
        Self::new(levels)
    }

    /// Whether `level` is accepted
    #[inline]
    #[must_use]
    pub const fn contains(self, level: Level) -> bool {
        self.0 & (1 << level.code()) != 0
    }

    /// Number of accepted levels
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty; never true once constructed
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Accepted levels in ascending order
    pub fn iter(self) -> impl Iterator<Item = Level> {
        Level::ALL.into_iter().filter(move |level| self.contains(*level))
    }

    /// Accepted levels as a vector
    #[must_use]
    pub fn to_vec(self) -> Vec<Level> {
        self.iter().collect()
    }
}

impl Default for LevelSet {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Debug for LevelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn names_round_trip_for_every_code() {
        for code in 0..8 {
            let name = to_name(code).unwrap();
            assert_eq!(to_name(i64::from(Level::from_name(name).unwrap().code())).unwrap(), name);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(matches!(Level::from_name("loud"), Err(LogError::InvalidLevelName(n)) if n == "loud"));
        assert!("ERROR".parse::<Level>().is_err());
    }

    #[test]
    fn codes_outside_range_fail() {
        assert!(Level::from_code(-1).is_err());
        assert!(Level::from_code(8).is_err());
        assert_eq!(Level::try_from(3).unwrap(), Level::Error);
        assert!(matches!(Level::try_from(8), Err(LogError::InvalidArgument(_))));
    }

    #[test]
    fn raw_values() {
        assert_eq!(Level::from_value(&json!("notice")).unwrap(), Level::Notice);
        assert_eq!(Level::from_value(&json!(7)).unwrap(), Level::Debug);

        let err = Level::from_value(&json!(2.5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: level must be of type int|Level|string, float given"
        );
        assert!(matches!(Level::from_value(&json!(42)), Err(LogError::InvalidArgument(_))));
        assert!(matches!(Level::from_value(&json!(null)), Err(LogError::InvalidArgument(_))));
    }

    #[test]
    fn labels_are_uppercase_names() {
        for level in Level::ALL {
            assert_eq!(level.label(), level.name().to_uppercase());
            assert_eq!(level.title().to_lowercase(), level.name());
        }
        assert_eq!(Level::Warning.title(), "Warning");
    }

    #[test]
    fn level_set_is_deduplicated_and_sorted() {
        let set = LevelSet::new([
            Level::Notice,
            Level::Info,
            Level::Debug,
            Level::Info,
            Level::Critical,
            Level::Emergency,
            Level::Error,
            Level::Alert,
            Level::Error,
            Level::Warning,
        ])
        .unwrap();
        assert_eq!(set.to_vec(), Level::ALL.to_vec());
        assert_eq!(set, LevelSet::ALL);
    }

    #[test]
    fn empty_level_set_fails() {
        assert!(matches!(LevelSet::new([]), Err(LogError::InvalidArgument(_))));
        assert!(matches!(LevelSet::from_codes(&[]), Err(LogError::InvalidArgument(_))));
    }

    #[test]
    fn raw_codes_report_position() {
        let err = LevelSet::from_codes(&[0, 42]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: value #2 of levels cannot be 42; it is not in the range 0 - 7"
        );

        let set = LevelSet::from_codes(&[3, 0, 3]).unwrap();
        assert_eq!(set.to_vec(), vec![Level::Emergency, Level::Error]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn serde_uses_psr3_names() {
        assert_eq!(serde_json::to_string(&Level::Warning).unwrap(), "\"warning\"");
        let level: Level = serde_json::from_str("\"alert\"").unwrap();
        assert_eq!(level, Level::Alert);
    }
}
