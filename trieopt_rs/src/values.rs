//! Snapshot of a finished parse.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::descriptor::option_string_for;
use crate::error::LookupError;
use crate::registry::OptionRegistry;
use crate::value::{FromValue, Value};

/// Positional arguments plus the value of every option after a parse.
///
/// Values are captured when the parse finishes; slots the caller holds keep
/// changing on later parses, this snapshot does not.
#[derive(Debug, Clone, Default)]
pub struct OptionValues {
    positional: Vec<String>,
    /// Option string to value, for every value-bearing handler.
    by_option: BTreeMap<String, Option<Value>>,
    /// Option strings of handlers without a value (callbacks, help, ...).
    valueless: BTreeSet<String>,
    /// Canonical option name to value, in registration order. A name already
    /// taken by an earlier option is replaced by the full option string.
    options: Vec<(String, Option<Value>)>,
    camel_case_allowed: bool,
}

impl OptionValues {
    pub(crate) fn capture(
        registry: &OptionRegistry,
        positional: Vec<String>,
        camel_case_allowed: bool,
    ) -> Self {
        let mut values = Self {
            positional,
            camel_case_allowed,
            ..Self::default()
        };
        for (_, handler) in registry.handlers() {
            match handler.value() {
                Ok(value) => {
                    for option_string in handler.option_strings() {
                        values
                            .by_option
                            .insert(option_string.clone(), value.clone());
                    }
                    let mut key = handler.dest().to_string();
                    if values.options.iter().any(|(name, _)| *name == key) {
                        key = handler.option_strings().first().cloned().unwrap_or(key);
                        warn!(name = handler.dest(), key = %key, "option name already in use");
                    }
                    values.options.push((key, value));
                }
                Err(_) => values
                    .valueless
                    .extend(handler.option_strings().iter().cloned()),
            }
        }
        values
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn into_positional(self) -> Vec<String> {
        self.positional
    }

    /// Value of an option, named by option string (`-v`, `--verbose`) or by
    /// bare name (`v`, `verbose`, `dryRun`). `Ok(None)` means never set.
    pub fn value(&self, name: &str) -> Result<Option<&Value>, LookupError> {
        let option_string = option_string_for(name, self.camel_case_allowed);
        let key = if self.by_option.contains_key(&option_string)
            || self.valueless.contains(&option_string)
        {
            option_string
        } else {
            // "+x" and "-x" name the same option
            match option_string.strip_prefix('+') {
                Some(rest) => format!("-{rest}"),
                None => option_string,
            }
        };
        match self.by_option.get(&key) {
            Some(value) => Ok(value.as_ref()),
            None if self.valueless.contains(&key) => Err(LookupError::NoValue(name.to_string())),
            None => Err(LookupError::UnknownOption(name.to_string())),
        }
    }

    /// Typed value. `Ok(None)` means never set.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<Option<T>, LookupError> {
        match self.value(name)? {
            None => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| LookupError::TypeMismatch {
                    name: name.to_string(),
                    expected: T::EXPECTED,
                }),
        }
    }

    /// True when the option exists and holds a value.
    pub fn is_set(&self, name: &str) -> bool {
        matches!(self.value(name), Ok(Some(_)))
    }

    /// Every option string (without its prefix) mapped to its value.
    pub fn options_map(&self) -> BTreeMap<String, Option<Value>> {
        self.by_option
            .iter()
            .map(|(option_string, value)| {
                let stripped = option_string.trim_start_matches(['-', '+']);
                (stripped.to_string(), value.clone())
            })
            .collect()
    }

    /// `{"positional": [...], "options": {"name": value, ...}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let options: serde_json::Map<String, serde_json::Value> = self
            .options
            .iter()
            .map(|(name, value)| {
                let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                (name.clone(), json)
            })
            .collect();
        serde_json::json!({
            "positional": self.positional,
            "options": options,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Behavior, OptionHandler};
    use crate::slot::ValueCell;

    fn registry() -> OptionRegistry {
        let mut r = OptionRegistry::new();
        r.register(OptionHandler::new(
            vec!["-v".into(), "--verbose".into()],
            0,
            Behavior::Count {
                slot: Box::new(ValueCell::with_value(2)),
            },
        ))
        .unwrap();
        r.register(OptionHandler::new(
            vec!["--dry-run".into()],
            0,
            Behavior::StoreConst {
                slot: Box::new(ValueCell::new()),
                constant: Value::Bool(true),
            },
        ))
        .unwrap();
        r.register(OptionHandler::new(vec!["-h".into()], 0, Behavior::Help))
            .unwrap();
        r
    }

    #[test]
    fn test_lookup_by_any_name() {
        let values = OptionValues::capture(&registry(), vec!["a".into()], false);
        assert_eq!(values.get::<i64>("v"), Ok(Some(2)));
        assert_eq!(values.get::<i64>("-v"), Ok(Some(2)));
        assert_eq!(values.get::<i64>("+v"), Ok(Some(2)));
        assert_eq!(values.get::<i64>("verbose"), Ok(Some(2)));
        assert_eq!(values.get::<bool>("dryRun"), Ok(None));
        assert!(!values.is_set("dry-run"));
        assert_eq!(values.positional(), ["a"]);
    }

    #[test]
    fn test_lookup_errors() {
        let values = OptionValues::capture(&registry(), vec![], false);
        assert_eq!(
            values.value("nope"),
            Err(LookupError::UnknownOption("nope".into()))
        );
        assert_eq!(values.value("h"), Err(LookupError::NoValue("h".into())));
        assert!(matches!(
            values.get::<bool>("verbose"),
            Err(LookupError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_json_keeps_options_sharing_a_name() {
        let mut r = OptionRegistry::new();
        for (option, n) in [("-x", 1), ("--x", 2)] {
            r.register(OptionHandler::new(
                vec![option.into()],
                0,
                Behavior::StoreConst {
                    slot: Box::new(ValueCell::with_value(n)),
                    constant: Value::Int(n.into()),
                },
            ))
            .unwrap();
        }
        let values = OptionValues::capture(&r, vec![], false);
        assert_eq!(
            values.to_json(),
            serde_json::json!({
                "positional": [],
                "options": {"x": 1, "--x": 2},
            })
        );
    }

    #[test]
    fn test_options_map_and_json() {
        let values = OptionValues::capture(&registry(), vec!["x".into()], false);
        let map = values.options_map();
        assert_eq!(map.get("v"), Some(&Some(Value::Int(2))));
        assert_eq!(map.get("verbose"), Some(&Some(Value::Int(2))));
        assert_eq!(map.get("dry-run"), Some(&None));
        assert!(!map.contains_key("h"));
        assert_eq!(
            values.to_json(),
            serde_json::json!({
                "positional": ["x"],
                "options": {"verbose": 2, "dry-run": null},
            })
        );
    }
}
