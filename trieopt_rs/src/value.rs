//! Typed option values.
//!
//! [`ValueType`] names what a raw token converts into, [`Shape`] says how an
//! action assembles several converted tokens, and [`Value`] is what ends up in
//! a slot. [`FromValue`] gets plain Rust types back out.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};
use tracing::Level;

/// Conversion target of an option's argument tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    Path,
    /// A `tracing` verbosity level.
    Level,
    Enum(EnumType),
    /// Caller-defined type; needs a converter registered under this name.
    Named(String),
}

impl ValueType {
    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            ValueType::I8 | ValueType::I16 | ValueType::I32 | ValueType::I64
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            ValueType::U8 | ValueType::U16 | ValueType::U32 | ValueType::U64
        )
    }

    /// Inclusive bounds of an integer type.
    pub fn int_range(&self) -> Option<(i128, i128)> {
        let range = match self {
            ValueType::I8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
            ValueType::I16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
            ValueType::I32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            ValueType::I64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            ValueType::U8 => (0, i128::from(u8::MAX)),
            ValueType::U16 => (0, i128::from(u16::MAX)),
            ValueType::U32 => (0, i128::from(u32::MAX)),
            ValueType::U64 => (0, i128::from(u64::MAX)),
            _ => return None,
        };
        Some(range)
    }

    pub fn name(&self) -> &str {
        match self {
            ValueType::Bool => "bool",
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::U8 => "u8",
            ValueType::U16 => "u16",
            ValueType::U32 => "u32",
            ValueType::U64 => "u64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::Str => "string",
            ValueType::Path => "path",
            ValueType::Level => "level",
            ValueType::Enum(e) => e.name(),
            ValueType::Named(n) => n,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A closed set of member names, matched case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: String,
    members: Vec<String>,
}

impl EnumType {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn member(&self, raw: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.as_str() == raw)
            .map(String::as_str)
    }
}

/// How an action assembles converted tokens into the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// One value (or a tuple when the option takes several tokens).
    #[default]
    Scalar,
    /// Fixed-size sequence; stored as a tuple.
    Array,
    /// Growable, ordered, duplicates kept.
    List,
    /// Growable, insertion-ordered, duplicates dropped.
    Set,
}

impl Shape {
    pub fn is_collection(self) -> bool {
        matches!(self, Shape::List | Shape::Set)
    }
}

/// A converted option value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    Level(Level),
    Enum(String),
    List(Vec<Value>),
    Set(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Path(_) => "path",
            Value::Level(_) => "level",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Tuple(_) => "tuple",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list, set or tuple.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Build a set value, dropping duplicates but keeping first-seen order.
    pub fn set_of(values: impl IntoIterator<Item = Value>) -> Value {
        let mut items = Vec::new();
        for value in values {
            insert_unique(&mut items, value);
        }
        Value::Set(items)
    }
}

pub(crate) fn insert_unique(items: &mut Vec<Value>, value: Value) {
    if !items.contains(&value) {
        items.push(value);
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) | Value::Enum(s) => f.write_str(s),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::Level(l) => write!(f, "{l}"),
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) | Value::Enum(s) => serializer.serialize_str(s),
            Value::Path(p) => serializer.serialize_str(&p.to_string_lossy()),
            Value::Level(l) => serializer.collect_str(l),
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
                serializer.collect_seq(items)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<Level> for Value {
    fn from(l: Level) -> Self {
        Value::Level(l)
    }
}

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    /// Name used in type-mismatch diagnostics.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "i64";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "i32";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for u64 {
    const EXPECTED: &'static str = "u64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl FromValue for usize {
    const EXPECTED: &'static str = "usize";

    fn from_value(value: &Value) -> Option<Self> {
        u64::from_value(value).and_then(|u| usize::try_from(u).ok())
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) | Value::Enum(s) => Some(s.clone()),
            Value::Path(p) => Some(p.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}

impl FromValue for PathBuf {
    const EXPECTED: &'static str = "path";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Path(p) => Some(p.clone()),
            Value::Str(s) => Some(PathBuf::from(s)),
            _ => None,
        }
    }
}

impl FromValue for Level {
    const EXPECTED: &'static str = "level";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Level(l) => Some(*l),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "sequence";

    fn from_value(value: &Value) -> Option<Self> {
        value.items()?.iter().map(T::from_value).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_of_keeps_first_seen_order() {
        let set = Value::set_of([Value::Int(3), Value::Int(1), Value::Int(3)]);
        assert_eq!(set, Value::Set(vec![Value::Int(3), Value::Int(1)]));
    }

    #[test]
    fn test_display_nested() {
        let v = Value::List(vec![
            Value::Tuple(vec![Value::Int(3), Value::Int(4)]),
            Value::Str("x".into()),
        ]);
        assert_eq!(v.to_string(), "[[3, 4], x]");
    }

    #[test]
    fn test_serialize_to_json() {
        let v = Value::List(vec![
            Value::Level(Level::DEBUG),
            Value::Path(PathBuf::from("/tmp/a")),
            Value::UInt(7),
        ]);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json, serde_json::json!(["DEBUG", "/tmp/a", 7]));
    }

    #[test]
    fn test_from_value_sequences() {
        let v = Value::Tuple(vec![Value::Int(5), Value::Int(-2)]);
        assert_eq!(Vec::<i32>::from_value(&v), Some(vec![5, -2]));
        assert_eq!(Vec::<bool>::from_value(&v), None);
        assert_eq!(i32::from_value(&Value::Int(i64::MAX)), None);
    }

    #[test]
    fn test_enum_members_case_sensitive() {
        let e = EnumType::new("Color", ["RED", "GREEN"]);
        assert_eq!(e.member("RED"), Some("RED"));
        assert_eq!(e.member("red"), None);
        assert_eq!(ValueType::Enum(e).name(), "Color");
    }
}
