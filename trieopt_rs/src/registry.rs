//! Option registry: every handler, indexed by its option strings.
//!
//! Long options live in a [`TrieMap`] (keyed without the `--` prefix) so they
//! can be abbreviated to any unambiguous prefix. Short options are a plain
//! character map. Handlers sit in an arena addressed by [`HandlerId`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::SetupError;
use crate::handler::OptionHandler;
use crate::trie::TrieMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A syntactically valid option string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName<'a> {
    /// `--name`, stored without the dashes.
    Long(&'a str),
    /// `-x` or `+x`.
    Short(char),
}

impl<'a> OptionName<'a> {
    pub fn parse(option_string: &'a str) -> Option<Self> {
        if let Some(name) = option_string.strip_prefix("--") {
            return (!name.is_empty()).then_some(OptionName::Long(name));
        }
        let rest = option_string
            .strip_prefix('-')
            .or_else(|| option_string.strip_prefix('+'))?;
        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c != '-' => Some(OptionName::Short(c)),
            _ => None,
        }
    }
}

/// Why a token did not resolve to a handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no such option: {0}")]
    Unknown(String),

    #[error("ambiguous option: {option} (could be {})", .candidates.join(", "))]
    Ambiguous {
        option: String,
        candidates: Vec<String>,
    },
}

/// A successful lookup: the handler and the full option string it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub id: HandlerId,
    pub option: String,
}

/// What a registration collided with.
#[derive(Debug, Clone)]
pub struct ConflictRecord {
    /// All option strings of the handler being registered.
    pub option_strings: Vec<String>,
    /// Its strings that are already bound, paired with the current owner.
    pub conflicts: Vec<(String, HandlerId)>,
}

impl ConflictRecord {
    pub fn conflicting_strings(&self) -> Vec<String> {
        self.conflicts.iter().map(|(s, _)| s.clone()).collect()
    }
}

/// Decides what happens when a new handler reuses bound option strings.
pub trait ConflictHandler {
    /// `Ok` lets the registration proceed; the newer handler then takes over
    /// every conflicting string.
    fn handle_conflict(&self, record: &ConflictRecord) -> Result<(), SetupError>;
}

/// Reject the registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorOnConflict;

impl ConflictHandler for ErrorOnConflict {
    fn handle_conflict(&self, record: &ConflictRecord) -> Result<(), SetupError> {
        Err(SetupError::Conflict {
            option_strings: record.option_strings.join("/"),
            conflicting: record.conflicting_strings(),
        })
    }
}

/// Newer handler wins; older handlers lose the contested strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveByPruning;

impl ConflictHandler for ResolveByPruning {
    fn handle_conflict(&self, record: &ConflictRecord) -> Result<(), SetupError> {
        warn!(
            options = %record.option_strings.join("/"),
            conflicting = %record.conflicting_strings().join(", "),
            "option strings taken over by newer option"
        );
        Ok(())
    }
}

pub struct OptionRegistry {
    handlers: Vec<Option<OptionHandler>>,
    order: Vec<HandlerId>,
    long: TrieMap<HandlerId>,
    short: HashMap<char, HandlerId>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::with_conflict_handler(ErrorOnConflict)
    }

    pub fn with_conflict_handler(handler: impl ConflictHandler + 'static) -> Self {
        Self {
            handlers: Vec::new(),
            order: Vec::new(),
            long: TrieMap::new(),
            short: HashMap::new(),
            conflict_handler: Box::new(handler),
        }
    }

    pub fn set_conflict_handler(&mut self, handler: impl ConflictHandler + 'static) {
        self.conflict_handler = Box::new(handler);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add a handler under all of its option strings.
    ///
    /// Nothing is modified unless the whole registration succeeds.
    pub fn register(&mut self, handler: OptionHandler) -> Result<HandlerId, SetupError> {
        if handler.option_strings().is_empty() {
            return Err(SetupError::NoOptionStrings);
        }
        let mut seen = HashSet::new();
        let mut conflicts = Vec::new();
        for option_string in handler.option_strings() {
            let name = OptionName::parse(option_string)
                .ok_or_else(|| SetupError::MalformedOptionString(option_string.clone()))?;
            if !seen.insert(name) {
                return Err(SetupError::DuplicateOptionString(option_string.clone()));
            }
            if let Some(owner) = self.bound(name) {
                conflicts.push((option_string.clone(), owner));
            }
        }

        if !conflicts.is_empty() {
            let record = ConflictRecord {
                option_strings: handler.option_strings().to_vec(),
                conflicts,
            };
            self.conflict_handler.handle_conflict(&record)?;
            for (option_string, owner) in record.conflicts {
                self.prune(owner, &option_string);
            }
        }

        let id = HandlerId(self.handlers.len());
        for option_string in handler.option_strings() {
            match OptionName::parse(option_string) {
                Some(OptionName::Long(name)) => {
                    self.long.insert(name, id);
                }
                Some(OptionName::Short(c)) => {
                    self.short.insert(c, id);
                }
                None => {}
            }
        }
        debug!(id = %id, options = ?handler.option_strings(), "registered option");
        self.handlers.push(Some(handler));
        self.order.push(id);
        Ok(id)
    }

    /// Remove a handler and every binding that still points at it.
    pub fn unregister(&mut self, id: HandlerId) -> Option<OptionHandler> {
        let handler = self.handlers.get_mut(id.0)?.take()?;
        for option_string in handler.option_strings() {
            self.unbind(option_string, id);
        }
        self.order.retain(|other| *other != id);
        debug!(id = %id, options = ?handler.option_strings(), "unregistered option");
        Some(handler)
    }

    /// Strip the string matching `contested` from `owner`; drop `owner` if it
    /// has nothing left.
    fn prune(&mut self, owner: HandlerId, contested: &str) {
        let Some(name) = OptionName::parse(contested) else {
            return;
        };
        let Some(handler) = self.handlers.get_mut(owner.0).and_then(Option::as_mut) else {
            return;
        };
        // "-v" and "+v" share a binding, so remove the owner's own spelling.
        let owned: Vec<String> = handler
            .option_strings()
            .iter()
            .filter(|s| OptionName::parse(s) == Some(name))
            .cloned()
            .collect();
        for option_string in &owned {
            handler.remove_option_string(option_string);
        }
        let emptied = handler.option_strings().is_empty();
        for option_string in &owned {
            self.unbind(option_string, owner);
        }
        debug!(id = %owner, option = contested, "pruned conflicting option string");
        if emptied {
            self.unregister(owner);
        }
    }

    fn unbind(&mut self, option_string: &str, id: HandlerId) {
        match OptionName::parse(option_string) {
            Some(OptionName::Long(name)) if self.long.get(name) == Some(&id) => {
                self.long.remove(name);
            }
            Some(OptionName::Short(c)) if self.short.get(&c) == Some(&id) => {
                self.short.remove(&c);
            }
            _ => {}
        }
    }

    fn bound(&self, name: OptionName<'_>) -> Option<HandlerId> {
        match name {
            OptionName::Long(name) => self.long.get(name).copied(),
            OptionName::Short(c) => self.short.get(&c).copied(),
        }
    }

    /// Exact lookup of an option string.
    pub fn lookup(&self, option_string: &str) -> Option<HandlerId> {
        OptionName::parse(option_string).and_then(|name| self.bound(name))
    }

    pub fn contains(&self, option_string: &str) -> bool {
        self.lookup(option_string).is_some()
    }

    /// The subset of `option_strings` already bound.
    pub fn existing_options<S: AsRef<str>>(&self, option_strings: &[S]) -> Vec<String> {
        option_strings
            .iter()
            .map(AsRef::as_ref)
            .filter(|s| self.contains(s))
            .map(str::to_string)
            .collect()
    }

    /// Long option by name (no dashes): exact match, then unambiguous prefix.
    pub fn resolve_long(&self, name: &str) -> Result<Resolved, ResolveError> {
        if let Some((full, id)) = self.long.get_unambiguous(name) {
            return Ok(Resolved {
                id: *id,
                option: format!("--{full}"),
            });
        }
        let option = format!("--{name}");
        if self.long.contains_prefix(name) {
            let candidates = self
                .long
                .keys_with_prefix(name)
                .into_iter()
                .map(|k| format!("--{k}"))
                .collect();
            return Err(ResolveError::Ambiguous { option, candidates });
        }
        Err(ResolveError::Unknown(option))
    }

    pub fn resolve_short(&self, c: char) -> Option<HandlerId> {
        self.short.get(&c).copied()
    }

    /// Resolve an option token (`--name`, abbreviated `--na`, `-x` or `+x`).
    pub fn resolve(&self, token: &str) -> Result<Resolved, ResolveError> {
        match OptionName::parse(token) {
            Some(OptionName::Long(name)) => self.resolve_long(name),
            Some(OptionName::Short(c)) => self
                .resolve_short(c)
                .map(|id| Resolved {
                    id,
                    option: token.to_string(),
                })
                .ok_or_else(|| ResolveError::Unknown(token.to_string())),
            None => Err(ResolveError::Unknown(token.to_string())),
        }
    }

    pub fn handler(&self, id: HandlerId) -> Option<&OptionHandler> {
        self.handlers.get(id.0).and_then(Option::as_ref)
    }

    pub fn handler_mut(&mut self, id: HandlerId) -> Option<&mut OptionHandler> {
        self.handlers.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Detach a handler so its action can run against a shared borrow of
    /// the registry. Bindings stay in place; pair with [`Self::restore_handler`].
    pub(crate) fn take_handler(&mut self, id: HandlerId) -> Option<OptionHandler> {
        self.handlers.get_mut(id.0)?.take()
    }

    pub(crate) fn restore_handler(&mut self, id: HandlerId, handler: OptionHandler) {
        if let Some(entry) = self.handlers.get_mut(id.0) {
            *entry = Some(handler);
        }
    }

    /// Live handlers in registration order.
    pub fn handlers(&self) -> impl Iterator<Item = (HandlerId, &OptionHandler)> {
        self.order
            .iter()
            .filter_map(|id| self.handler(*id).map(|h| (*id, h)))
    }

    /// Every long option string, sorted.
    pub fn long_names(&self) -> Vec<String> {
        self.long.iter().map(|(k, _)| format!("--{k}")).collect()
    }
}

impl fmt::Debug for OptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionRegistry")
            .field("handlers", &self.handlers().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
