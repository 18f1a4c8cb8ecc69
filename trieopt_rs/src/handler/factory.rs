//! Handler factories, looked up by action name.

use std::collections::HashMap;
use std::fmt;

use crate::convert::Converters;
use crate::descriptor::{OptionDescriptor, action};
use crate::error::SetupError;
use crate::handler::{Behavior, Callback, OptionHandler};
use crate::slot::{Slot, ValueCell};
use crate::value::{Shape, Value, ValueType};

/// Builds an [`OptionHandler`] from a descriptor, validating the combination.
pub trait HandlerFactory {
    fn new_handler(
        &self,
        descriptor: OptionDescriptor,
        converters: &Converters,
    ) -> Result<OptionHandler, SetupError>;
}

impl<F> HandlerFactory for F
where
    F: Fn(OptionDescriptor, &Converters) -> Result<OptionHandler, SetupError>,
{
    fn new_handler(
        &self,
        descriptor: OptionDescriptor,
        converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        self(descriptor, converters)
    }
}

/// Action name to factory table.
pub struct ActionRegistry {
    factories: HashMap<String, Box<dyn HandlerFactory>>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    /// Table with every built-in action.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert(action::STORE, StoreFactory);
        registry.insert(action::STORE_CONST, StoreConstFactory);
        registry.insert(action::STORE_TRUE, ToggleFactory(true));
        registry.insert(action::STORE_FALSE, ToggleFactory(false));
        registry.insert(action::APPEND, AppendFactory);
        registry.insert(action::APPEND_CONST, AppendConstFactory);
        registry.insert(action::COUNT, CountFactory);
        registry.insert(action::CALLBACK, CallbackFactory);
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        factory: impl HandlerFactory + 'static,
    ) -> Option<Box<dyn HandlerFactory>> {
        self.factories.insert(name.into(), Box::new(factory))
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn HandlerFactory>> {
        self.factories.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn HandlerFactory> {
        self.factories.get(name).map(Box::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a handler with the factory registered for the descriptor's action.
    pub fn build(
        &self,
        descriptor: OptionDescriptor,
        converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        let action = descriptor.effective_action();
        let factory = self.get(&action).ok_or_else(|| SetupError::UnknownAction {
            options: descriptor.display_strings(),
            action: action.clone(),
        })?;
        factory.new_handler(descriptor, converters)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry")
            .field("actions", &names)
            .finish()
    }
}

// ============================================================================
// Shared validation
// ============================================================================

fn arity_error(d: &OptionDescriptor, action: &str, nargs: usize, reason: &'static str) -> SetupError {
    SetupError::InvalidArity {
        options: d.display_strings(),
        action: action.to_string(),
        nargs,
        reason,
    }
}

/// Arity for actions that consume arguments: unset means 1, zero is invalid.
fn value_arity(d: &OptionDescriptor, action: &str) -> Result<usize, SetupError> {
    match d.nargs {
        None => Ok(1),
        Some(0) => Err(arity_error(d, action, 0, "needs at least one argument")),
        Some(n) => Ok(n),
    }
}

/// Arity for actions that take no arguments: unset or zero.
fn flag_arity(d: &OptionDescriptor, action: &str) -> Result<usize, SetupError> {
    match d.nargs {
        None | Some(0) => Ok(0),
        Some(n) => Err(arity_error(d, action, n, "takes no arguments")),
    }
}

fn reject_choices(d: &OptionDescriptor, action: &str) -> Result<(), SetupError> {
    if d.choices.is_some() {
        return Err(SetupError::InvalidChoices {
            options: d.display_strings(),
            reason: format!("choices are not supported by action '{action}'"),
        });
    }
    Ok(())
}

fn require_constant(d: &mut OptionDescriptor, action: &str) -> Result<Value, SetupError> {
    d.constant.take().ok_or_else(|| SetupError::MissingConstant {
        options: d.display_strings(),
        action: action.to_string(),
    })
}

fn require_collection(d: &OptionDescriptor, action: &str) -> Result<(), SetupError> {
    if d.shape.is_collection() {
        Ok(())
    } else {
        Err(SetupError::TargetType {
            options: d.display_strings(),
            action: action.to_string(),
            expected: "a list or set shape",
        })
    }
}

fn take_slot(d: &mut OptionDescriptor) -> Box<dyn Slot> {
    d.slot
        .take()
        .unwrap_or_else(|| Box::new(ValueCell::new()))
}

/// Assemble a handler, carrying over help, metavar, type and shape.
fn finish(
    d: OptionDescriptor,
    num_args: usize,
    value_type: Option<ValueType>,
    behavior: Behavior,
) -> OptionHandler {
    let mut handler = OptionHandler::new(d.option_strings, num_args, behavior)
        .with_shape(d.shape)
        .with_help(d.help)
        .with_metavar(d.metavar);
    if let Some(ty) = value_type {
        handler = handler.with_value_type(ty);
    }
    handler
}

// ============================================================================
// Built-in factories
// ============================================================================

/// `store`: write the converted value(s), optionally restricted to choices.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreFactory;

impl HandlerFactory for StoreFactory {
    fn new_handler(
        &self,
        mut d: OptionDescriptor,
        converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        let num_args = value_arity(&d, action::STORE)?;
        let ty = d.value_type.clone().unwrap_or(ValueType::Str);
        let choices = match d.choices.take() {
            None => None,
            Some(_) if num_args != 1 => {
                return Err(SetupError::InvalidChoices {
                    options: d.display_strings(),
                    reason: format!("choices need exactly one argument, not {num_args}"),
                });
            }
            Some(raw) => Some(converters.convert(&ty, raw.as_slice()).map_err(|e| {
                SetupError::InvalidChoices {
                    options: d.display_strings(),
                    reason: e.to_string(),
                }
            })?),
        };
        let slot = take_slot(&mut d);
        Ok(finish(d, num_args, Some(ty), Behavior::Store { slot, choices }))
    }
}

/// `store_const`: write a fixed value.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreConstFactory;

impl HandlerFactory for StoreConstFactory {
    fn new_handler(
        &self,
        mut d: OptionDescriptor,
        _converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        let num_args = flag_arity(&d, action::STORE_CONST)?;
        reject_choices(&d, action::STORE_CONST)?;
        let constant = require_constant(&mut d, action::STORE_CONST)?;
        let slot = take_slot(&mut d);
        let ty = d.value_type.clone();
        Ok(finish(d, num_args, ty, Behavior::StoreConst { slot, constant }))
    }
}

/// `store_true` / `store_false`: constant sugar over a bool slot.
#[derive(Debug, Clone, Copy)]
pub struct ToggleFactory(pub bool);

impl HandlerFactory for ToggleFactory {
    fn new_handler(
        &self,
        mut d: OptionDescriptor,
        _converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        let action = if self.0 {
            action::STORE_TRUE
        } else {
            action::STORE_FALSE
        };
        let num_args = flag_arity(&d, action)?;
        reject_choices(&d, action)?;
        if d.value_type.as_ref().is_some_and(|ty| *ty != ValueType::Bool) {
            return Err(SetupError::TargetType {
                options: d.display_strings(),
                action: action.to_string(),
                expected: "a bool value type",
            });
        }
        let slot = take_slot(&mut d);
        Ok(finish(
            d,
            num_args,
            Some(ValueType::Bool),
            Behavior::StoreConst {
                slot,
                constant: Value::Bool(self.0),
            },
        ))
    }
}

/// `append`: add the converted value (or a tuple of them) to a list or set.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendFactory;

impl HandlerFactory for AppendFactory {
    fn new_handler(
        &self,
        mut d: OptionDescriptor,
        _converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        let num_args = value_arity(&d, action::APPEND)?;
        reject_choices(&d, action::APPEND)?;
        require_collection(&d, action::APPEND)?;
        let ty = d.value_type.clone().unwrap_or(ValueType::Str);
        let slot = take_slot(&mut d);
        Ok(finish(d, num_args, Some(ty), Behavior::Append { slot }))
    }
}

/// `append_const`: add a fixed value to a list or set.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendConstFactory;

impl HandlerFactory for AppendConstFactory {
    fn new_handler(
        &self,
        mut d: OptionDescriptor,
        _converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        let num_args = flag_arity(&d, action::APPEND_CONST)?;
        reject_choices(&d, action::APPEND_CONST)?;
        require_collection(&d, action::APPEND_CONST)?;
        let constant = require_constant(&mut d, action::APPEND_CONST)?;
        let slot = take_slot(&mut d);
        let ty = d.value_type.clone();
        Ok(finish(d, num_args, ty, Behavior::AppendConst { slot, constant }))
    }
}

/// `count`: increment an integer per occurrence.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountFactory;

impl HandlerFactory for CountFactory {
    fn new_handler(
        &self,
        mut d: OptionDescriptor,
        _converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        let num_args = flag_arity(&d, action::COUNT)?;
        reject_choices(&d, action::COUNT)?;
        let ty = d.value_type.clone().unwrap_or(ValueType::I32);
        if !ty.is_integer() {
            return Err(SetupError::TargetType {
                options: d.display_strings(),
                action: action::COUNT.to_string(),
                expected: "an integer value type",
            });
        }
        let slot = take_slot(&mut d);
        Ok(finish(d, num_args, Some(ty), Behavior::Count { slot }))
    }
}

/// `callback`: run user code.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackFactory;

impl HandlerFactory for CallbackFactory {
    fn new_handler(
        &self,
        mut d: OptionDescriptor,
        _converters: &Converters,
    ) -> Result<OptionHandler, SetupError> {
        reject_choices(&d, action::CALLBACK)?;
        let callback = d.callback.take().ok_or_else(|| SetupError::TargetType {
            options: d.display_strings(),
            action: action::CALLBACK.to_string(),
            expected: "a callback",
        })?;
        let num_args = match &callback {
            Callback::ZeroArg(_) | Callback::Full(_) => flag_arity(&d, action::CALLBACK)?,
            Callback::SingleArg(_) => match d.nargs {
                None | Some(1) => 1,
                Some(n) => {
                    return Err(arity_error(&d, action::CALLBACK, n, "needs exactly one argument"));
                }
            },
        };
        let ty = match num_args {
            0 => d.value_type.clone(),
            _ => Some(d.value_type.clone().unwrap_or(ValueType::Str)),
        };
        Ok(finish(d, num_args, ty, Behavior::Callback(callback)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn build(d: OptionDescriptor) -> Result<OptionHandler, SetupError> {
        ActionRegistry::new().build(d, &Converters::new())
    }

    #[test]
    fn test_store_defaults() {
        let h = build(OptionDescriptor::new(["-f", "--file"])).unwrap();
        assert_eq!(h.num_args(), 1);
        assert_eq!(h.value_type(), Some(&ValueType::Str));
        assert_eq!(h.behavior().name(), "store");
    }

    #[test]
    fn test_store_rejects_zero_arity() {
        let err = build(OptionDescriptor::new(["-f"]).nargs(0)).unwrap_err();
        assert!(matches!(err, SetupError::InvalidArity { nargs: 0, .. }));
    }

    #[test]
    fn test_choices_validation() {
        let err = build(OptionDescriptor::new(["-m"]).nargs(2).choices(["a", "b"])).unwrap_err();
        assert!(matches!(err, SetupError::InvalidChoices { .. }));

        let err = build(
            OptionDescriptor::new(["-n"])
                .value_type(ValueType::I32)
                .choices(["1", "two"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("two"));

        let err = build(
            OptionDescriptor::new(["-a"])
                .action("append")
                .shape(Shape::List)
                .choices(["x"]),
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::InvalidChoices { .. }));
    }

    #[test]
    fn test_toggle_requires_bool() {
        let h = build(OptionDescriptor::new(["-q"]).action("store_false")).unwrap();
        assert_eq!(h.num_args(), 0);
        assert!(matches!(
            h.behavior(),
            Behavior::StoreConst {
                constant: Value::Bool(false),
                ..
            }
        ));
        let err = build(
            OptionDescriptor::new(["-q"])
                .action("store_true")
                .value_type(ValueType::I32),
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::TargetType { .. }));
    }

    #[test]
    fn test_count_requires_integer() {
        let err = build(
            OptionDescriptor::new(["-v"])
                .action("count")
                .value_type(ValueType::Str),
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::TargetType { .. }));
        assert!(build(OptionDescriptor::new(["-v"]).action("count").nargs(1)).is_err());
    }

    #[test]
    fn test_append_requires_collection() {
        let err = build(OptionDescriptor::new(["-I"]).action("append")).unwrap_err();
        assert!(matches!(err, SetupError::TargetType { .. }));
        let h = build(
            OptionDescriptor::new(["-t"])
                .action("append")
                .nargs(3)
                .shape(Shape::List)
                .value_type(ValueType::I32),
        )
        .unwrap();
        assert_eq!(h.num_args(), 3);
    }

    #[test]
    fn test_constant_required() {
        let err = build(OptionDescriptor::new(["-c"]).action("store_const")).unwrap_err();
        assert!(matches!(err, SetupError::MissingConstant { .. }));
        let err = build(
            OptionDescriptor::new(["-c"])
                .action("append_const")
                .shape(Shape::List),
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::MissingConstant { .. }));
    }

    #[test]
    fn test_unknown_action() {
        let err = build(OptionDescriptor::new(["-z"]).action("frobnicate")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "option -z: action 'frobnicate' is not registered"
        );
    }

    #[test]
    fn test_callback_arity() {
        let h = build(OptionDescriptor::new(["--go"]).callback(Callback::single_arg(|_| Ok(()))))
            .unwrap();
        assert_eq!(h.num_args(), 1);
        let err = build(
            OptionDescriptor::new(["--go"])
                .nargs(2)
                .callback(Callback::single_arg(|_| Ok(()))),
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::InvalidArity { nargs: 2, .. }));
        let h = build(OptionDescriptor::new(["--go"]).callback(Callback::zero_arg(|| Ok(()))))
            .unwrap();
        assert_eq!(h.num_args(), 0);
    }

    #[test]
    fn test_closure_factory() {
        let mut registry = ActionRegistry::new();
        registry.insert(
            "help",
            |d: OptionDescriptor, _: &Converters| -> Result<OptionHandler, SetupError> {
                Ok(OptionHandler::new(d.option_strings, 0, Behavior::Help))
            },
        );
        let h = registry
            .build(OptionDescriptor::new(["-?"]).action("help"), &Converters::new())
            .unwrap();
        assert_eq!(h.behavior().name(), "help");
        assert!(registry.remove("help").is_some());
        assert!(!registry.contains("help"));
    }
}
