//! Loads the application descriptor naming the pluggable application types.
//!
//! The descriptor lives in the installation's configuration directory and
//! uses the properties format. A key ends at the first unescaped `=`, `:` or
//! whitespace; a key with nothing after it has an empty value. `#` and `!`
//! start comment lines, a backslash escapes the next character, and a line
//! ending in an odd number of backslashes continues on the next line. Only the
//! two bootstrap keys are interpreted; other keys are ignored so the file can
//! be shared with the application's own settings.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Key naming the application type driven through init and start.
pub const START_TYPE_KEY: &str = "bootstrap.start.type";

/// Key naming the application type driven through stop and destroy.
pub const STOP_TYPE_KEY: &str = "bootstrap.stop.type";

/// Errors raised while loading the descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The descriptor file could not be read.
    #[error("failed to read application descriptor '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A required key was absent or empty.
    #[error("application descriptor is missing required key '{key}'")]
    MissingKey { key: &'static str },
}

/// Start and stop application type names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    start_type: String,
    stop_type: String,
}

impl ApplicationDescriptor {
    /// Builds a descriptor from explicit type names.
    #[must_use]
    pub fn new(start_type: impl Into<String>, stop_type: impl Into<String>) -> Self {
        Self {
            start_type: start_type.into(),
            stop_type: stop_type.into(),
        }
    }

    /// Reads and parses the descriptor file.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses descriptor text.
    pub fn parse(content: &str) -> Result<Self, DescriptorError> {
        let entries = parse_entries(content);
        let start_type = required(&entries, START_TYPE_KEY)?;
        let stop_type = required(&entries, STOP_TYPE_KEY)?;
        Ok(Self {
            start_type,
            stop_type,
        })
    }

    /// Type driven through init and start.
    #[must_use]
    pub fn start_type(&self) -> &str {
        self.start_type.as_str()
    }

    /// Type driven through stop and destroy.
    #[must_use]
    pub fn stop_type(&self) -> &str {
        self.stop_type.as_str()
    }

    /// Whether stop and destroy reuse the start instance.
    #[must_use]
    pub fn shares_instance(&self) -> bool {
        self.start_type == self.stop_type
    }
}

fn parse_entries(content: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    let mut lines = content.lines();
    while let Some(raw) = lines.next() {
        let line = raw.trim_start();
        if line.is_empty() || line.starts_with(['#', '!']) {
            continue;
        }
        let mut logical = line.to_owned();
        while continues(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }
        let (key, value) = split_entry(&logical);
        entries.insert(key, value);
    }
    entries
}

fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let mut chars = line.chars();
    let mut key = String::new();
    let mut whitespace_separated = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    key.push(unescape(escaped));
                }
            }
            '=' | ':' => break,
            c if c.is_whitespace() => {
                whitespace_separated = true;
                break;
            }
            c => key.push(c),
        }
    }
    let mut rest = chars.as_str().trim_start();
    if whitespace_separated && let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start();
    }
    (key, unescape_value(rest))
}

fn unescape_value(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(unescape(escaped));
            }
        } else {
            value.push(c);
        }
    }
    value.trim_end().to_owned()
}

fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{c}',
        other => other,
    }
}

fn required(
    entries: &HashMap<String, String>,
    key: &'static str,
) -> Result<String, DescriptorError> {
    entries
        .get(key)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(DescriptorError::MissingKey { key })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_both_keys() {
        let descriptor = ApplicationDescriptor::parse(
            "# bootstrap\nbootstrap.start.type=directory.server\nbootstrap.stop.type = directory.stopper\n",
        )
        .expect("descriptor parses");
        assert_eq!(descriptor.start_type(), "directory.server");
        assert_eq!(descriptor.stop_type(), "directory.stopper");
        assert!(!descriptor.shares_instance());
    }

    #[test]
    fn accepts_colon_separator_and_bang_comments() {
        let descriptor = ApplicationDescriptor::parse(
            "! legacy comment\nbootstrap.start.type: idle\nbootstrap.stop.type: idle\n",
        )
        .expect("descriptor parses");
        assert!(descriptor.shares_instance());
    }

    #[test]
    fn later_duplicates_win() {
        let descriptor = ApplicationDescriptor::parse(
            "bootstrap.start.type=first\nbootstrap.start.type=second\nbootstrap.stop.type=stop\n",
        )
        .expect("descriptor parses");
        assert_eq!(descriptor.start_type(), "second");
    }

    #[rstest]
    #[case::missing_start("bootstrap.stop.type=idle\n", START_TYPE_KEY)]
    #[case::missing_stop("bootstrap.start.type=idle\n", STOP_TYPE_KEY)]
    #[case::empty_start("bootstrap.start.type=\nbootstrap.stop.type=idle\n", START_TYPE_KEY)]
    fn reports_missing_keys(#[case] content: &str, #[case] expected: &str) {
        let error = ApplicationDescriptor::parse(content).expect_err("descriptor should fail");
        match error {
            DescriptorError::MissingKey { key } => assert_eq!(key, expected),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case::whitespace("bootstrap.start.type idle\nbootstrap.stop.type\tidle\n")]
    #[case::whitespace_then_equals("bootstrap.start.type = idle\nbootstrap.stop.type  :idle\n")]
    #[case::bare_key_ignored("bootstrap.start.type=idle\nserver.debug\nbootstrap.stop.type=idle\n")]
    #[case::indented_comment("   # comment\nbootstrap.start.type=idle\nbootstrap.stop.type=idle\n")]
    fn accepts_properties_syntax(#[case] content: &str) {
        let descriptor = ApplicationDescriptor::parse(content).expect("descriptor parses");
        assert_eq!(descriptor.start_type(), "idle");
        assert_eq!(descriptor.stop_type(), "idle");
    }

    #[test]
    fn bare_required_key_counts_as_missing() {
        let error = ApplicationDescriptor::parse("bootstrap.start.type\nbootstrap.stop.type=idle\n")
            .expect_err("descriptor should fail");
        assert!(matches!(
            error,
            DescriptorError::MissingKey { key: START_TYPE_KEY }
        ));
    }

    #[test]
    fn joins_continuation_lines_and_unescapes() {
        let descriptor = ApplicationDescriptor::parse(
            "bootstrap.start.type=directory.\\\n    server\nbootstrap\\.stop\\.type=path\\\\name\n",
        )
        .expect("descriptor parses");
        assert_eq!(descriptor.start_type(), "directory.server");
        assert_eq!(descriptor.stop_type(), "path\\name");
    }

    #[test]
    fn load_reports_unreadable_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = ApplicationDescriptor::load(&dir.path().join("keeper.conf"))
            .expect_err("missing file should fail");
        assert!(matches!(error, DescriptorError::Read { .. }));
    }
}
