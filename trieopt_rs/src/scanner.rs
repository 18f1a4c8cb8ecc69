//! The argument scanner.
//!
//! A small state machine walks the token queue front to back. Options are
//! resolved through the registry, their argument tokens are pulled off the
//! queue verbatim and converted, and the handler runs. Everything that is not
//! an option (or comes after a terminator) is collected as positional.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::error::ParseError;
use crate::handler::{ActionOutcome, ParserContext};
use crate::parser::OptionParser;
use crate::registry::{HandlerId, ResolveError};
use crate::suggest::suggest_similar;
use crate::value::{Value, ValueType};

/// How a single token reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `-` alone.
    BareDash,
    /// `--` alone.
    DoubleDash,
    /// `--name` or `--name=value`.
    Long,
    /// `-abc` or `+abc`.
    ShortCluster,
    Positional,
}

impl TokenKind {
    pub fn classify(token: &str) -> Self {
        match token {
            "-" => TokenKind::BareDash,
            "--" => TokenKind::DoubleDash,
            t if t.starts_with("--") => TokenKind::Long,
            t if t.len() > 1 && (t.starts_with('-') || t.starts_with('+')) => {
                TokenKind::ShortCluster
            }
            _ => TokenKind::Positional,
        }
    }

    pub fn is_positional(self) -> bool {
        self == TokenKind::Positional
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    Scanning,
    AfterBareDash,
    AfterDoubleDash,
    Done,
}

/// Tokens not yet consumed plus positionals collected so far.
///
/// Full-signature callbacks get mutable access, so they may consume extra
/// tokens or push some back.
#[derive(Debug, Clone, Default)]
pub struct ScanState {
    remaining: VecDeque<String>,
    positional: Vec<String>,
}

impl ScanState {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            remaining: args.into_iter().map(Into::into).collect(),
            positional: Vec::new(),
        }
    }

    pub fn peek(&self) -> Option<&str> {
        self.remaining.front().map(String::as_str)
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.remaining.pop_front()
    }

    pub fn push_front(&mut self, token: impl Into<String>) {
        self.remaining.push_front(token.into());
    }

    /// Pop tokens up to (not including) the next option or terminator.
    pub fn take_while_not_option(&mut self) -> Vec<String> {
        let mut taken = Vec::new();
        while self
            .peek()
            .is_some_and(|token| TokenKind::classify(token).is_positional())
        {
            taken.extend(self.pop_front());
        }
        taken
    }

    pub fn remaining(&self) -> impl Iterator<Item = &str> {
        self.remaining.iter().map(String::as_str)
    }

    pub fn remaining_len(&self) -> usize {
        self.remaining.len()
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn push_positional(&mut self, token: impl Into<String>) {
        self.positional.push(token.into());
    }

    fn drain_into_positional(&mut self) {
        self.positional.extend(self.remaining.drain(..));
    }

    pub(crate) fn into_positional(self) -> Vec<String> {
        self.positional
    }
}

/// Scan `args`, applying every option. Returns the positional arguments.
pub(crate) fn scan(parser: &mut OptionParser, args: Vec<String>) -> Result<Vec<String>, ParseError> {
    let mut state = ScanState::new(args);
    let mut phase = ScanPhase::Scanning;

    loop {
        phase = match phase {
            ScanPhase::Scanning => match state.peek().map(TokenKind::classify) {
                None => ScanPhase::Done,
                Some(kind) => {
                    trace!(token = ?state.peek(), ?kind, "scan");
                    scan_token(parser, &mut state, kind)?
                }
            },
            ScanPhase::AfterBareDash | ScanPhase::AfterDoubleDash => {
                debug!(?phase, remaining = state.remaining_len(), "option scanning stopped");
                ScanPhase::Done
            }
            ScanPhase::Done => {
                state.drain_into_positional();
                break;
            }
        };
    }

    let positional = state.into_positional();
    if let Some(expected) = parser.settings.expected_positionals
        && positional.len() != expected
    {
        return Err(ParseError::PositionalCount {
            expected,
            found: positional.len(),
        });
    }
    Ok(positional)
}

fn scan_token(
    parser: &mut OptionParser,
    state: &mut ScanState,
    kind: TokenKind,
) -> Result<ScanPhase, ParseError> {
    let next = match kind {
        TokenKind::BareDash => ScanPhase::AfterBareDash,
        TokenKind::DoubleDash => {
            state.pop_front();
            ScanPhase::AfterDoubleDash
        }
        TokenKind::Long => {
            scan_long(parser, state)?;
            ScanPhase::Scanning
        }
        TokenKind::ShortCluster => {
            scan_short_cluster(parser, state)?;
            ScanPhase::Scanning
        }
        TokenKind::Positional if parser.settings.allow_interspersed_args => {
            state.positional.extend(state.remaining.pop_front());
            ScanPhase::Scanning
        }
        TokenKind::Positional => ScanPhase::Done,
    };
    Ok(next)
}

fn scan_long(parser: &mut OptionParser, state: &mut ScanState) -> Result<(), ParseError> {
    let Some(token) = state.pop_front() else {
        return Ok(());
    };
    let body = &token[2..];
    let (name, inline) = match body.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    };
    if name.is_empty() {
        return Err(ParseError::UnknownOption {
            option: token.clone(),
            suggestion: None,
        });
    }

    let resolved = parser
        .registry
        .resolve_long(name)
        .map_err(|err| resolve_failure(parser, err))?;
    let (num_args, ty) = handler_shape(parser, resolved.id, &resolved.option)?;

    if let Some(value) = inline {
        if num_args == 0 {
            return Err(ParseError::UnexpectedValue {
                option: resolved.option,
            });
        }
        state.push_front(value);
    }

    let values = take_args(parser, state, &resolved.option, num_args, &ty)?;
    dispatch(parser, resolved.id, &resolved.option, values, state)
}

fn scan_short_cluster(parser: &mut OptionParser, state: &mut ScanState) -> Result<(), ParseError> {
    let Some(token) = state.pop_front() else {
        return Ok(());
    };
    let mut chars = token.chars();
    let Some(prefix) = chars.next() else {
        return Ok(());
    };
    let body = chars.as_str();

    for (offset, c) in body.char_indices() {
        let option = format!("{prefix}{c}");
        let id = parser
            .registry
            .resolve_short(c)
            .ok_or_else(|| ParseError::UnknownOption {
                option: option.clone(),
                suggestion: None,
            })?;
        let (num_args, ty) = handler_shape(parser, id, &option)?;
        if num_args == 0 {
            dispatch(parser, id, &option, Vec::new(), state)?;
            continue;
        }
        // The rest of the cluster is this option's first argument.
        let rest = &body[offset + c.len_utf8()..];
        if !rest.is_empty() {
            state.push_front(rest);
        }
        let values = take_args(parser, state, &option, num_args, &ty)?;
        return dispatch(parser, id, &option, values, state);
    }
    Ok(())
}

fn handler_shape(
    parser: &OptionParser,
    id: HandlerId,
    option: &str,
) -> Result<(usize, ValueType), ParseError> {
    let handler = parser
        .registry
        .handler(id)
        .ok_or_else(|| ParseError::UnknownOption {
            option: option.to_string(),
            suggestion: None,
        })?;
    let ty = handler.value_type().cloned().unwrap_or(ValueType::Str);
    Ok((handler.num_args(), ty))
}

/// Pull exactly `num_args` tokens and convert them.
fn take_args(
    parser: &OptionParser,
    state: &mut ScanState,
    option: &str,
    num_args: usize,
    ty: &ValueType,
) -> Result<Vec<Value>, ParseError> {
    if state.remaining_len() < num_args {
        return Err(ParseError::MissingArgument {
            option: option.to_string(),
            expected: num_args,
            found: state.remaining_len(),
        });
    }
    let raw: Vec<String> = state.remaining.drain(..num_args).collect();
    trace!(option, ?raw, "option arguments");
    parser
        .converters
        .convert(ty, raw.as_slice())
        .map_err(|cause| ParseError::Conversion {
            option: option.to_string(),
            cause,
        })
}

fn dispatch(
    parser: &mut OptionParser,
    id: HandlerId,
    option: &str,
    values: Vec<Value>,
    state: &mut ScanState,
) -> Result<(), ParseError> {
    let prog = parser.prog();
    let mut handler = parser
        .registry
        .take_handler(id)
        .ok_or_else(|| ParseError::UnknownOption {
            option: option.to_string(),
            suggestion: None,
        })?;
    let result = {
        let ctx = ParserContext::new(&parser.registry, &parser.converters, &prog);
        handler.perform_action(option, values, &ctx, state)
    };
    parser.registry.restore_handler(id, handler);
    match result? {
        ActionOutcome::Continue => Ok(()),
        ActionOutcome::ShowHelp => Err(ParseError::HelpRequested {
            text: parser.help_string(),
        }),
        ActionOutcome::ShowVersion(text) => Err(ParseError::VersionRequested { text }),
    }
}

fn resolve_failure(parser: &OptionParser, err: ResolveError) -> ParseError {
    match err {
        ResolveError::Unknown(option) => {
            let names = parser.registry.long_names();
            let suggestion =
                suggest_similar(&option, names.iter().map(String::as_str)).map(str::to_string);
            ParseError::UnknownOption { option, suggestion }
        }
        ResolveError::Ambiguous { option, candidates } => {
            ParseError::AmbiguousOption { option, candidates }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
