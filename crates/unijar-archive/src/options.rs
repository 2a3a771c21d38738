use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unijar_types::Compression;

use crate::error::ArchiveError;

/// How the writer picks the compression of each output entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMode {
    /// Keep the compression hint carried by the entry.
    #[default]
    Preserve,
    /// Deflate every file entry.
    Deflate,
    /// Store every file entry uncompressed.
    Store,
}

impl CompressionMode {
    /// The compression actually used for an entry with the given hint.
    pub fn resolve(self, hint: Compression) -> Compression {
        match self {
            Self::Preserve => hint,
            Self::Deflate => Compression::Deflated,
            Self::Store => Compression::Stored,
        }
    }
}

/// Modification time stamped on every output entry.
///
/// Input timestamps are never carried over: a fixed value is what makes two
/// runs over the same inputs byte-identical. The default is midnight on
/// 2010-01-01, well inside the DOS date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    pub const DEFAULT: Self = Self {
        year: 2010,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };

    /// Convert to the zip crate's DOS date-time, validating the range.
    pub fn to_zip(self) -> Result<zip::DateTime, ArchiveError> {
        zip::DateTime::from_date_and_time(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
        .map_err(|_| ArchiveError::InvalidTimestamp(self.to_string()))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl FromStr for Timestamp {
    type Err = ArchiveError;

    /// Parse `YYYY-MM-DD HH:MM:SS` (a `T` separator is also accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ArchiveError::InvalidTimestamp(s.to_string());
        let (date, time) = s
            .split_once(|c: char| c == ' ' || c == 'T')
            .ok_or_else(invalid)?;

        let date: Vec<&str> = date.split('-').collect();
        let time: Vec<&str> = time.split(':').collect();
        if date.len() != 3 || time.len() != 3 {
            return Err(invalid());
        }

        let ts = Self {
            year: date[0].parse().map_err(|_| invalid())?,
            month: date[1].parse().map_err(|_| invalid())?,
            day: date[2].parse().map_err(|_| invalid())?,
            hour: time[0].parse().map_err(|_| invalid())?,
            minute: time[1].parse().map_err(|_| invalid())?,
            second: time[2].parse().map_err(|_| invalid())?,
        };
        // Reject values the zip format cannot represent at parse time.
        ts.to_zip()?;
        Ok(ts)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ArchiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

/// Settings for the output archive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterOptions {
    /// Compression selection for file entries.
    pub compression: CompressionMode,
    /// Modification time written on every entry.
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_compression() {
        assert_eq!(
            CompressionMode::Preserve.resolve(Compression::Stored),
            Compression::Stored
        );
        assert_eq!(
            CompressionMode::Deflate.resolve(Compression::Stored),
            Compression::Deflated
        );
        assert_eq!(
            CompressionMode::Store.resolve(Compression::Deflated),
            Compression::Stored
        );
    }

    #[test]
    fn timestamp_parse_and_display() {
        let ts: Timestamp = "2015-06-30 12:34:56".parse().unwrap();
        assert_eq!(ts.year, 2015);
        assert_eq!(ts.second, 56);
        assert_eq!(ts.to_string(), "2015-06-30 12:34:56");

        let iso: Timestamp = "2015-06-30T12:34:56".parse().unwrap();
        assert_eq!(ts, iso);
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!("yesterday".parse::<Timestamp>().is_err());
        assert!("2015-06-30".parse::<Timestamp>().is_err());
        assert!("2015-13-01 00:00:00".parse::<Timestamp>().is_err());
        // DOS dates start at 1980.
        assert!("1970-01-01 00:00:00".parse::<Timestamp>().is_err());
    }

    #[test]
    fn default_timestamp_is_valid() {
        assert!(Timestamp::default().to_zip().is_ok());
    }

    #[test]
    fn writer_options_from_toml() {
        let opts: WriterOptions =
            toml::from_str("compression = \"store\"\ntimestamp = \"2020-02-02 02:02:02\"")
                .unwrap();
        assert_eq!(opts.compression, CompressionMode::Store);
        assert_eq!(opts.timestamp.month, 2);

        let defaults: WriterOptions = toml::from_str("").unwrap();
        assert_eq!(defaults, WriterOptions::default());
    }
}
