//! Option handlers: what happens when an option is seen.
//!
//! An [`OptionHandler`] carries the option's strings, arity and type plus a
//! [`Behavior`]. The scanner converts the option's tokens and calls
//! [`OptionHandler::perform_action`]; the behavior decides what to write.

mod callback;
mod factory;

pub use callback::{Callback, CallbackResult, ParserContext};
pub use factory::{
    ActionRegistry, AppendConstFactory, AppendFactory, CallbackFactory, CountFactory,
    HandlerFactory, StoreConstFactory, StoreFactory, ToggleFactory,
};

use std::fmt;

use tracing::debug;

use crate::error::{InvocationError, LookupError, ParseError};
use crate::scanner::ScanState;
use crate::slot::Slot;
use crate::value::{Shape, Value, ValueType, insert_unique};

/// What the scanner should do after an action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Continue,
    ShowHelp,
    ShowVersion(String),
}

/// Extension point for actions the built-in behaviors do not cover.
pub trait Action {
    /// Whether this action exposes a value through [`Action::value`].
    fn has_value(&self) -> bool {
        false
    }

    fn value(&self) -> Option<Value> {
        None
    }

    fn perform(
        &mut self,
        name: &str,
        args: Vec<Value>,
        ctx: &ParserContext<'_>,
        state: &mut ScanState,
    ) -> anyhow::Result<ActionOutcome>;
}

pub enum Behavior {
    Store {
        slot: Box<dyn Slot>,
        choices: Option<Vec<Value>>,
    },
    StoreConst {
        slot: Box<dyn Slot>,
        constant: Value,
    },
    Append {
        slot: Box<dyn Slot>,
    },
    AppendConst {
        slot: Box<dyn Slot>,
        constant: Value,
    },
    Count {
        slot: Box<dyn Slot>,
    },
    Callback(Callback),
    Help,
    Version {
        text: String,
    },
    Custom(Box<dyn Action>),
}

impl Behavior {
    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Store { .. } => "store",
            Behavior::StoreConst { .. } => "store_const",
            Behavior::Append { .. } => "append",
            Behavior::AppendConst { .. } => "append_const",
            Behavior::Count { .. } => "count",
            Behavior::Callback(_) => "callback",
            Behavior::Help => "help",
            Behavior::Version { .. } => "version",
            Behavior::Custom(_) => "custom",
        }
    }

    fn slot(&self) -> Option<&dyn Slot> {
        match self {
            Behavior::Store { slot, .. }
            | Behavior::StoreConst { slot, .. }
            | Behavior::Append { slot }
            | Behavior::AppendConst { slot, .. }
            | Behavior::Count { slot } => Some(slot.as_ref()),
            Behavior::Callback(_)
            | Behavior::Help
            | Behavior::Version { .. }
            | Behavior::Custom(_) => None,
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct OptionHandler {
    option_strings: Vec<String>,
    num_args: usize,
    value_type: Option<ValueType>,
    shape: Shape,
    help: Option<String>,
    metavar: Option<String>,
    behavior: Behavior,
}

impl OptionHandler {
    pub fn new(option_strings: Vec<String>, num_args: usize, behavior: Behavior) -> Self {
        Self {
            option_strings,
            num_args,
            value_type: None,
            shape: Shape::Scalar,
            help: None,
            metavar: None,
            behavior,
        }
    }

    pub fn with_value_type(mut self, ty: ValueType) -> Self {
        self.value_type = Some(ty);
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_help(mut self, help: Option<String>) -> Self {
        self.help = help;
        self
    }

    pub fn with_metavar(mut self, metavar: Option<String>) -> Self {
        self.metavar = metavar;
        self
    }

    pub fn option_strings(&self) -> &[String] {
        &self.option_strings
    }

    pub fn num_args(&self) -> usize {
        self.num_args
    }

    pub fn value_type(&self) -> Option<&ValueType> {
        self.value_type.as_ref()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Explicit metavar, else the first long name uppercased, else the first
    /// short name uppercased.
    pub fn metavar(&self) -> String {
        if let Some(metavar) = &self.metavar {
            return metavar.clone();
        }
        self.dest().to_uppercase()
    }

    /// Canonical name: first long option without dashes, else the first short
    /// option without its prefix.
    pub fn dest(&self) -> &str {
        self.option_strings
            .iter()
            .find_map(|s| s.strip_prefix("--"))
            .or_else(|| self.option_strings.first().map(|s| &s[1..]))
            .unwrap_or_default()
    }

    pub fn has_value(&self) -> bool {
        match &self.behavior {
            Behavior::Custom(action) => action.has_value(),
            other => other.slot().is_some(),
        }
    }

    /// Current value of the target slot.
    pub fn value(&self) -> Result<Option<Value>, LookupError> {
        match &self.behavior {
            Behavior::Custom(action) if action.has_value() => Ok(action.value()),
            other => other
                .slot()
                .map(|slot| slot.get())
                .ok_or_else(|| LookupError::NoValue(self.option_strings.join("/"))),
        }
    }

    pub(crate) fn remove_option_string(&mut self, option_string: &str) {
        self.option_strings.retain(|s| s != option_string);
    }

    /// Apply this option. `name` is the option string as the user typed it
    /// (canonicalized for abbreviated long options), `args` the converted
    /// argument values.
    pub fn perform_action(
        &mut self,
        name: &str,
        mut args: Vec<Value>,
        ctx: &ParserContext<'_>,
        state: &mut ScanState,
    ) -> Result<ActionOutcome, ParseError> {
        debug!(option = name, action = self.behavior.name(), args = args.len(), "perform action");
        let invocation = |cause: anyhow::Error| ParseError::Invocation {
            option: name.to_string(),
            cause: InvocationError::new(cause),
        };
        let shape = self.shape;

        match &mut self.behavior {
            Behavior::Store { slot, choices } => {
                if let Some(choices) = choices
                    && let Some(first) = args.first()
                    && !choices.contains(first)
                {
                    return Err(ParseError::InvalidChoice {
                        option: name.to_string(),
                        value: first.to_string(),
                        choices: choices.iter().map(ToString::to_string).collect(),
                    });
                }
                let value = match shape {
                    Shape::Scalar if args.len() == 1 => args.remove(0),
                    Shape::Scalar | Shape::Array => Value::Tuple(args),
                    Shape::List => Value::List(args),
                    Shape::Set => Value::set_of(args),
                };
                slot.set(value).map_err(invocation)?;
            }
            Behavior::StoreConst { slot, constant } => {
                slot.set(constant.clone()).map_err(invocation)?;
            }
            Behavior::Append { slot } => {
                let element = if args.len() == 1 {
                    args.remove(0)
                } else {
                    Value::Tuple(args)
                };
                append(slot.as_mut(), shape, element).map_err(invocation)?;
            }
            Behavior::AppendConst { slot, constant } => {
                append(slot.as_mut(), shape, constant.clone()).map_err(invocation)?;
            }
            Behavior::Count { slot } => {
                let ty = self.value_type.clone().unwrap_or(ValueType::I64);
                let next = next_count(slot.get(), &ty).map_err(invocation)?;
                slot.set(next).map_err(invocation)?;
            }
            Behavior::Callback(callback) => {
                callback.invoke(name, args, ctx, state).map_err(invocation)?;
            }
            Behavior::Help => return Ok(ActionOutcome::ShowHelp),
            Behavior::Version { text } => return Ok(ActionOutcome::ShowVersion(text.clone())),
            Behavior::Custom(action) => {
                return action.perform(name, args, ctx, state).map_err(invocation);
            }
        }
        Ok(ActionOutcome::Continue)
    }
}

/// `current + 1`, kept within the bounds of the declared integer type.
fn next_count(current: Option<Value>, ty: &ValueType) -> anyhow::Result<Value> {
    let current = match current {
        None => 0,
        Some(Value::Int(n)) => i128::from(n),
        Some(Value::UInt(n)) => i128::from(n),
        Some(other) => anyhow::bail!("cannot count into a {} value", other.type_name()),
    };
    let Some((_, max)) = ty.int_range() else {
        anyhow::bail!("cannot count into a {ty} value");
    };
    let next = current + 1;
    if next > max {
        anyhow::bail!("count {next} is out of range for {ty}");
    }
    let value = if ty.is_unsigned() {
        Value::UInt(u64::try_from(next)?)
    } else {
        Value::Int(i64::try_from(next)?)
    };
    Ok(value)
}

fn append(slot: &mut dyn Slot, shape: Shape, element: Value) -> anyhow::Result<()> {
    let mut items = match slot.get() {
        None => Vec::new(),
        Some(Value::List(items)) | Some(Value::Set(items)) => items,
        Some(other) => anyhow::bail!("cannot append to a {} value", other.type_name()),
    };
    let collection = if shape == Shape::Set {
        insert_unique(&mut items, element);
        Value::Set(items)
    } else {
        items.push(element);
        Value::List(items)
    };
    slot.set(collection)
}

impl fmt::Debug for OptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionHandler")
            .field("option_strings", &self.option_strings)
            .field("num_args", &self.num_args)
            .field("value_type", &self.value_type)
            .field("shape", &self.shape)
            .field("behavior", &self.behavior)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
