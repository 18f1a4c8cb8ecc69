//! Declarative option descriptions.
//!
//! An [`OptionDescriptor`] is everything a handler factory needs to build one
//! option: its strings, arity, type, action name and target slot. Types that
//! know their own options implement [`DescribeOptions`].

use std::fmt;

use heck::ToKebabCase;

use crate::handler::Callback;
use crate::slot::Slot;
use crate::value::{Shape, Value, ValueType};

/// Built-in action names.
pub mod action {
    pub const STORE: &str = "store";
    pub const STORE_CONST: &str = "store_const";
    pub const STORE_TRUE: &str = "store_true";
    pub const STORE_FALSE: &str = "store_false";
    pub const APPEND: &str = "append";
    pub const APPEND_CONST: &str = "append_const";
    pub const COUNT: &str = "count";
    pub const CALLBACK: &str = "callback";
}

#[derive(Default)]
pub struct OptionDescriptor {
    /// Field-style name used to derive an option string when none is given.
    pub name: Option<String>,
    pub option_strings: Vec<String>,
    /// Argument count; `None` lets the action pick its default.
    pub nargs: Option<usize>,
    pub value_type: Option<ValueType>,
    pub shape: Shape,
    pub action: Option<String>,
    pub help: Option<String>,
    pub metavar: Option<String>,
    pub choices: Option<Vec<String>>,
    pub constant: Option<Value>,
    pub slot: Option<Box<dyn Slot>>,
    pub callback: Option<Callback>,
}

impl OptionDescriptor {
    pub fn new<I, S>(option_strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            option_strings: option_strings.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A descriptor whose option string is derived from `name` at registration.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn nargs(mut self, nargs: usize) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn value_type(mut self, ty: ValueType) -> Self {
        self.value_type = Some(ty);
        self
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn constant(mut self, constant: impl Into<Value>) -> Self {
        self.constant = Some(constant.into());
        self
    }

    pub fn slot(mut self, slot: impl Slot + 'static) -> Self {
        self.slot = Some(Box::new(slot));
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Option strings joined with `/`, for diagnostics.
    pub fn display_strings(&self) -> String {
        match (&self.name, self.option_strings.is_empty()) {
            (Some(name), true) => name.clone(),
            _ => self.option_strings.join("/"),
        }
    }

    /// The action this descriptor resolves to when none is named explicitly.
    pub fn effective_action(&self) -> String {
        if let Some(action) = &self.action {
            return action.clone();
        }
        if self.callback.is_some() {
            action::CALLBACK.to_string()
        } else if self.value_type == Some(ValueType::Bool) && self.nargs.is_none() {
            action::STORE_TRUE.to_string()
        } else {
            action::STORE.to_string()
        }
    }

    /// Fill in `option_strings` from `name` when the caller gave none.
    pub(crate) fn derive_option_strings(&mut self, camel_case_allowed: bool) {
        if self.option_strings.is_empty()
            && let Some(name) = &self.name
        {
            self.option_strings = vec![option_string_for(name, camel_case_allowed)];
        }
    }
}

impl fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("name", &self.name)
            .field("option_strings", &self.option_strings)
            .field("nargs", &self.nargs)
            .field("value_type", &self.value_type)
            .field("shape", &self.shape)
            .field("action", &self.action)
            .field("choices", &self.choices)
            .field("has_slot", &self.slot.is_some())
            .field("callback", &self.callback)
            .finish()
    }
}

/// Turn a field-style name into an option string.
///
/// One character becomes `-x`. Longer names become `--kebab-case`, or keep
/// their spelling as `--camelCase` when camel case is allowed.
pub fn option_string_for(name: &str, camel_case_allowed: bool) -> String {
    if name.starts_with('-') || name.starts_with('+') {
        return name.to_string();
    }
    if name.chars().count() == 1 {
        format!("-{name}")
    } else if camel_case_allowed {
        format!("--{name}")
    } else {
        format!("--{}", name.to_kebab_case())
    }
}

/// Something that can list its own options.
pub trait DescribeOptions {
    fn describe_options(&self) -> Vec<OptionDescriptor>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_string_derivation() {
        assert_eq!(option_string_for("x", false), "-x");
        assert_eq!(option_string_for("verbose", false), "--verbose");
        assert_eq!(option_string_for("dryRun", false), "--dry-run");
        assert_eq!(option_string_for("AStrangeThing", false), "--a-strange-thing");
        assert_eq!(option_string_for("dryRun", true), "--dryRun");
        assert_eq!(option_string_for("--keep", false), "--keep");
    }

    #[test]
    fn test_default_action() {
        assert_eq!(OptionDescriptor::new(["-a"]).effective_action(), "store");
        assert_eq!(
            OptionDescriptor::new(["-a"])
                .value_type(ValueType::Bool)
                .effective_action(),
            "store_true"
        );
        assert_eq!(
            OptionDescriptor::new(["-a"])
                .callback(Callback::zero_arg(|| Ok(())))
                .effective_action(),
            "callback"
        );
        assert_eq!(
            OptionDescriptor::new(["-a"])
                .action("count")
                .effective_action(),
            "count"
        );
    }

    #[test]
    fn test_named_descriptor_derives_strings() {
        let mut d = OptionDescriptor::named("outputDir");
        assert_eq!(d.display_strings(), "outputDir");
        d.derive_option_strings(false);
        assert_eq!(d.option_strings, vec!["--output-dir".to_string()]);
    }
}
