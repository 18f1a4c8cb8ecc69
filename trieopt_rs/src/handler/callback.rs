//! User callbacks and the context they run in.

use std::fmt;

use crate::convert::{ConversionError, Converters};
use crate::descriptor::option_string_for;
use crate::error::LookupError;
use crate::handler::OptionHandler;
use crate::registry::{HandlerId, OptionRegistry};
use crate::scanner::ScanState;
use crate::value::{Value, ValueType};

pub type CallbackResult = anyhow::Result<()>;

type ZeroArgFn = Box<dyn FnMut() -> CallbackResult>;
type SingleArgFn = Box<dyn FnMut(Value) -> CallbackResult>;
type FullFn = Box<dyn FnMut(&str, &[Value], &ParserContext<'_>, &mut ScanState) -> CallbackResult>;

/// Read-only view of the running parser handed to actions and callbacks.
///
/// The option whose action is running is detached from the registry for the
/// duration of the call, so it cannot be looked up through this context.
pub struct ParserContext<'a> {
    registry: &'a OptionRegistry,
    converters: &'a Converters,
    prog: &'a str,
}

impl<'a> ParserContext<'a> {
    pub fn new(registry: &'a OptionRegistry, converters: &'a Converters, prog: &'a str) -> Self {
        Self {
            registry,
            converters,
            prog,
        }
    }

    pub fn registry(&self) -> &OptionRegistry {
        self.registry
    }

    /// Handler for `name`: an option string (`-n`, `--name`) or a bare name
    /// (`n`, `name`, `dryRun`).
    pub fn option(&self, name: &str) -> Option<&OptionHandler> {
        self.find(name).and_then(|id| self.registry.handler(id))
    }

    /// Current value of another option, as parsed so far.
    pub fn value(&self, name: &str) -> Result<Option<Value>, LookupError> {
        self.option(name)
            .ok_or_else(|| LookupError::UnknownOption(name.to_string()))?
            .value()
    }

    fn find(&self, name: &str) -> Option<HandlerId> {
        if name.starts_with(['-', '+']) {
            return self.registry.lookup(name);
        }
        self.registry
            .lookup(&option_string_for(name, false))
            .or_else(|| self.registry.lookup(&option_string_for(name, true)))
    }

    pub fn converters(&self) -> &Converters {
        self.converters
    }

    pub fn prog(&self) -> &str {
        self.prog
    }

    pub fn convert(&self, ty: &ValueType, raw: &str) -> Result<Value, ConversionError> {
        self.converters.convert_one(ty, raw)
    }
}

/// The three callback shapes.
pub enum Callback {
    /// Invoked with nothing.
    ZeroArg(ZeroArgFn),
    /// Invoked with the one converted value.
    SingleArg(SingleArgFn),
    /// Invoked with the option name, its converted values, the parser context
    /// and the live scan state, so it can consume or push back tokens.
    Full(FullFn),
}

impl Callback {
    pub fn zero_arg<F>(f: F) -> Self
    where
        F: FnMut() -> CallbackResult + 'static,
    {
        Callback::ZeroArg(Box::new(f))
    }

    pub fn single_arg<F>(f: F) -> Self
    where
        F: FnMut(Value) -> CallbackResult + 'static,
    {
        Callback::SingleArg(Box::new(f))
    }

    pub fn full<F>(f: F) -> Self
    where
        F: FnMut(&str, &[Value], &ParserContext<'_>, &mut ScanState) -> CallbackResult + 'static,
    {
        Callback::Full(Box::new(f))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Callback::ZeroArg(_) => "zero-arg",
            Callback::SingleArg(_) => "single-arg",
            Callback::Full(_) => "full",
        }
    }

    pub(crate) fn invoke(
        &mut self,
        name: &str,
        mut args: Vec<Value>,
        ctx: &ParserContext<'_>,
        state: &mut ScanState,
    ) -> CallbackResult {
        match self {
            Callback::ZeroArg(f) => f(),
            Callback::SingleArg(f) => {
                let value = args
                    .pop()
                    .ok_or_else(|| anyhow::anyhow!("{name} callback expects one value"))?;
                f(value)
            }
            Callback::Full(f) => f(name, &args, ctx, state),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({})", self.kind())
    }
}
