//! Parser-wide settings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_USAGE: &str = "%prog [options]";

/// Everything about a parser that is not an option.
///
/// `%prog` in `usage` and `version` is replaced with the program name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    pub prog: Option<String>,
    pub usage: Option<String>,
    pub description: Option<String>,
    /// Adds `--version` when set.
    pub version: Option<String>,
    pub add_help_option: bool,
    pub allow_interspersed_args: bool,
    pub camel_case_allowed: bool,
    /// Exact positional count to enforce after scanning.
    pub expected_positionals: Option<usize>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            prog: None,
            usage: None,
            description: None,
            version: None,
            add_help_option: true,
            allow_interspersed_args: true,
            camel_case_allowed: false,
            expected_positionals: None,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn without_help_option(mut self) -> Self {
        self.add_help_option = false;
        self
    }

    pub fn with_interspersed_args(mut self, allow: bool) -> Self {
        self.allow_interspersed_args = allow;
        self
    }

    pub fn with_camel_case(mut self, allowed: bool) -> Self {
        self.camel_case_allowed = allowed;
        self
    }

    /// Program name: configured, else the file name of `argv[0]`.
    pub fn prog(&self) -> String {
        if let Some(prog) = &self.prog {
            return prog.clone();
        }
        std::env::args_os()
            .next()
            .as_deref()
            .map(std::path::Path::new)
            .and_then(std::path::Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prog".to_string())
    }

    pub fn usage(&self) -> &str {
        self.usage.as_deref().unwrap_or(DEFAULT_USAGE)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ParserSettings::default();
        assert!(s.add_help_option);
        assert!(s.allow_interspersed_args);
        assert!(!s.camel_case_allowed);
        assert_eq!(s.usage(), DEFAULT_USAGE);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: ParserSettings =
            serde_json::from_str(r#"{"prog": "tool", "allow_interspersed_args": false}"#).unwrap();
        assert_eq!(s.prog(), "tool");
        assert!(!s.allow_interspersed_args);
        assert!(s.add_help_option);
    }
}
