//! Error taxonomy for the engine.
//!
//! - [`SetupError`]: programmer mistakes while declaring options.
//! - [`LookupError`]: querying a name that is not registered, or a value on a
//!   handler that has none.
//! - [`ParseError`]: user input errors found while scanning argv. Carries the
//!   offending option and a readable cause so the embedding CLI can print a
//!   diagnostic. Help/version requests travel the same path.
//! - [`InvocationError`]: whatever a callback or slot setter raised.
//!
//! The engine never prints and never exits; [`ParseError::exit_code`] is the
//! hint an application can use if it wants exit-on-error behavior.

use thiserror::Error;

use crate::convert::ConversionError;

/// Errors raised while building the option registry.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("an option needs at least one option string")]
    NoOptionStrings,

    #[error("invalid option string '{0}': use -x, +x or --name")]
    MalformedOptionString(String),

    #[error("option string '{0}' is listed more than once")]
    DuplicateOptionString(String),

    #[error("option {option_strings}: conflicting option string(s): {}", .conflicting.join(", "))]
    Conflict {
        option_strings: String,
        conflicting: Vec<String>,
    },

    #[error("option {options}: action '{action}' {reason} (nargs={nargs})")]
    InvalidArity {
        options: String,
        action: String,
        nargs: usize,
        reason: &'static str,
    },

    #[error("option {options}: action '{action}' is not registered")]
    UnknownAction { options: String, action: String },

    #[error("option {options}: action '{action}' requires a constant")]
    MissingConstant { options: String, action: String },

    #[error("option {options}: {reason}")]
    InvalidChoices { options: String, reason: String },

    #[error("option {options}: action '{action}' requires {expected}")]
    TargetType {
        options: String,
        action: String,
        expected: &'static str,
    },
}

/// Errors raised when querying parsed values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("could not find option for '{0}'")]
    UnknownOption(String),

    #[error("'{0}' is not a stored value")]
    NoValue(String),

    #[error("'{name}' does not hold a value of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// A callback or slot setter failed while an option was being applied.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InvocationError {
    inner: anyhow::Error,
}

impl InvocationError {
    pub fn new(inner: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: inner.into(),
        }
    }

    /// The error the callback raised.
    pub fn cause(&self) -> &anyhow::Error {
        &self.inner
    }
}

/// Errors raised while scanning an argument vector.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no such option: {option}{}", did_you_mean(.suggestion))]
    UnknownOption {
        option: String,
        suggestion: Option<String>,
    },

    #[error("ambiguous option: {option} (could be {})", .candidates.join(", "))]
    AmbiguousOption {
        option: String,
        candidates: Vec<String>,
    },

    #[error("{option} option requires {expected} argument(s), found {found}")]
    MissingArgument {
        option: String,
        expected: usize,
        found: usize,
    },

    #[error("{option} option does not take a value")]
    UnexpectedValue { option: String },

    /// The cause is part of the message, not a `source`.
    #[error("option {option}: {cause}")]
    Conversion {
        option: String,
        cause: ConversionError,
    },

    #[error("option {option}: invalid choice: '{value}' (choose from {})", .choices.join(", "))]
    InvalidChoice {
        option: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("expected {expected} positional argument(s), found {found}")]
    PositionalCount { expected: usize, found: usize },

    #[error("option {option}: {cause}")]
    Invocation {
        option: String,
        cause: InvocationError,
    },

    #[error("help requested")]
    HelpRequested { text: String },

    #[error("version requested")]
    VersionRequested { text: String },
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean {s}?)"),
        None => String::new(),
    }
}

impl ParseError {
    /// The option the error is about, when there is one.
    pub fn option(&self) -> Option<&str> {
        match self {
            ParseError::UnknownOption { option, .. }
            | ParseError::AmbiguousOption { option, .. }
            | ParseError::MissingArgument { option, .. }
            | ParseError::UnexpectedValue { option }
            | ParseError::Conversion { option, .. }
            | ParseError::InvalidChoice { option, .. }
            | ParseError::Invocation { option, .. } => Some(option),
            ParseError::PositionalCount { .. }
            | ParseError::HelpRequested { .. }
            | ParseError::VersionRequested { .. } => None,
        }
    }

    /// True for `--help`/`--version`: not a failure, but parsing stops.
    pub fn is_exit_request(&self) -> bool {
        matches!(
            self,
            ParseError::HelpRequested { .. } | ParseError::VersionRequested { .. }
        )
    }

    /// Text to print for help/version requests.
    pub fn exit_message(&self) -> Option<&str> {
        match self {
            ParseError::HelpRequested { text } | ParseError::VersionRequested { text } => {
                Some(text)
            }
            _ => None,
        }
    }

    /// Conventional process exit code: 0 for help/version, 2 for usage errors.
    pub fn exit_code(&self) -> i32 {
        if self.is_exit_request() { 0 } else { 2 }
    }
}

/// Any engine error, for callers that want a single `?`-friendly type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

// ============================================================================
// Tests
// ============================================================================
