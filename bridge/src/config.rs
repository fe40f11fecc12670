//! Module configuration strings.
//!
//! Format: `<path>[,<name>[=<value>]]*`. The path runs up to the first
//! comma; each following segment is one option, forwarded to the module
//! in order. A segment without `=` forwards an empty value.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::BridgeError;

/// A module path plus the options to apply after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleConfig {
    /// Filesystem path of the module.
    pub path: PathBuf,

    /// `(name, value)` pairs in the order given.
    pub options: Vec<(String, String)>,
}

impl ModuleConfig {
    /// A config with no options.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: Vec::new(),
        }
    }

    /// Append an option.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }
}

impl FromStr for ModuleConfig {
    type Err = BridgeError;

    fn from_str(config: &str) -> Result<Self, Self::Err> {
        let mut segments = config.split(',');
        let path = segments.next().unwrap_or_default().trim();
        if path.is_empty() {
            return Err(BridgeError::InvalidConfigSyntax(format!(
                "missing module path in {config:?}"
            )));
        }

        let mut options = Vec::new();
        for segment in segments {
            let (name, value) = segment.split_once('=').unwrap_or((segment, ""));
            if name.is_empty() {
                return Err(BridgeError::InvalidConfigSyntax(format!(
                    "empty option name in segment {segment:?}"
                )));
            }
            options.push((name.to_owned(), value.to_owned()));
        }

        Ok(Self {
            path: PathBuf::from(path),
            options,
        })
    }
}
