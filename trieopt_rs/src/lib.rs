//! # trieopt
//!
//! **Command-line option parsing engine** built around a prefix trie, so long
//! options can be abbreviated to any unambiguous prefix (`--verb` for
//! `--verbose`).
//!
//! ## Features
//!
//! - **Prefix matching** - exact match first, then unique prefix; ambiguous
//!   prefixes report every candidate
//! - **Short clusters** - `-ab5` means `-a -b 5`
//! - **Typed values** - integers with `0x`/`0b`/octal literals, floats, bools,
//!   paths, `tracing` levels, enums and caller-defined types
//! - **Actions** - store, store-const, toggles, append, append-const, count
//!   and callbacks that can consume extra tokens
//! - **Conflict policies** - reject reused option strings, or let the newer
//!   option take them over
//!
//! ## Quick Start
//!
//! ```rust
//! use trieopt::{OptionDescriptor, OptionParser, ParserSettings, Shape, ValueType};
//!
//! let mut parser = OptionParser::new(ParserSettings::new().with_prog("tool"));
//! parser
//!     .add_option(OptionDescriptor::new(["-v", "--verbose"]).action("count"))
//!     .unwrap();
//! parser
//!     .add_option(
//!         OptionDescriptor::new(["-I", "--include"])
//!             .action("append")
//!             .shape(Shape::List),
//!     )
//!     .unwrap();
//! parser
//!     .add_option(OptionDescriptor::new(["-n"]).value_type(ValueType::I32))
//!     .unwrap();
//!
//! let values = parser
//!     .parse(["-vvn0x10", "--incl", "src", "main.rs", "--verb"])
//!     .unwrap();
//! assert_eq!(values.get::<i64>("verbose").unwrap(), Some(3));
//! assert_eq!(values.get::<i32>("n").unwrap(), Some(16));
//! assert_eq!(values.get::<Vec<String>>("include").unwrap(), Some(vec!["src".to_string()]));
//! assert_eq!(values.positional(), ["main.rs"]);
//! ```
//!
//! The library never prints and never exits: `--help` and `--version` come
//! back as [`ParseError::HelpRequested`] / [`ParseError::VersionRequested`],
//! and [`ParseError::exit_code`] tells a CLI what to exit with.

// ============================================================================
// Core Modules
// ============================================================================

/// Character trie with unambiguous-prefix lookup and a fail-fast cursor.
pub mod trie;

/// Handler arena plus long/short option indexes and conflict policies.
pub mod registry;

/// Token-to-value converters.
pub mod convert;

/// `Value`, `ValueType`, `Shape` and typed extraction.
pub mod value;

/// Option descriptors and name-to-option-string derivation.
pub mod descriptor;

/// Target slots actions write into.
pub mod slot;

/// Option handlers, behaviors, callbacks and handler factories.
pub mod handler;

/// The argv scanner.
pub mod scanner;

/// The `OptionParser` facade.
pub mod parser;

/// Parse results.
pub mod values;

/// Parser-wide settings.
pub mod settings;

/// Help text rendering.
pub mod help;

/// Error types.
pub mod error;

/// "Did you mean" suggestions.
pub mod suggest;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use convert::{ConversionError, Converters};
pub use descriptor::{DescribeOptions, OptionDescriptor};
pub use error::{Error, InvocationError, LookupError, ParseError, SetupError};
pub use handler::{
    Action, ActionOutcome, Behavior, Callback, HandlerFactory, OptionHandler, ParserContext,
};
pub use help::{HelpFormatter, IndentedHelpFormatter};
pub use parser::{OptionParser, parse_into};
pub use registry::{ErrorOnConflict, HandlerId, ResolveByPruning};
pub use scanner::ScanState;
pub use settings::ParserSettings;
pub use slot::{Accessor, Slot, ValueCell};
pub use trie::TrieMap;
pub use value::{EnumType, FromValue, Shape, Value, ValueType};
pub use values::OptionValues;
