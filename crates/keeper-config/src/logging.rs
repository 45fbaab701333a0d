use strum::{Display, EnumString};

use crate::defaults::{DEFAULT_LOG_FILTER, default_log_format};

/// Supported logging output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// Logging settings resolved from the command line and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    filter: String,
    format: LogFormat,
}

impl LoggingSettings {
    /// Builds settings from an `EnvFilter` expression and output format.
    #[must_use]
    pub fn new(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            filter: filter.into(),
            format,
        }
    }

    /// Filter expression handed to the subscriber.
    #[must_use]
    pub fn filter(&self) -> &str {
        self.filter.as_str()
    }

    /// Selected output format.
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILTER, default_log_format())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::json("json", LogFormat::Json)]
    #[case::compact("compact", LogFormat::Compact)]
    #[case::mixed_case("JSON", LogFormat::Json)]
    fn parses_log_formats(#[case] text: &str, #[case] expected: LogFormat) {
        assert_eq!(LogFormat::from_str(text).expect("format parses"), expected);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(LogFormat::from_str("pretty").is_err());
    }

    #[test]
    fn default_settings_use_info_filter() {
        let settings = LoggingSettings::default();
        assert_eq!(settings.filter(), "info");
        assert_eq!(settings.format(), LogFormat::Compact);
    }
}
