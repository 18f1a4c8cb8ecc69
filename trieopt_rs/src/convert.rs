//! String-to-value conversion.
//!
//! Each parser owns a [`Converters`] table keyed by [`ValueType`]. The defaults
//! cover every built-in type; callers can replace any of them or register
//! converters for [`ValueType::Named`] types.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use thiserror::Error;
use tracing::Level;

use crate::value::{Value, ValueType};

/// Turns one raw token into a value, or explains why it cannot.
pub type Converter = Rc<dyn Fn(&str) -> Result<Value, String>>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("no converter registered for type {0}")]
    Unsupported(String),

    #[error("invalid {ty} value '{value}': {reason}")]
    Malformed {
        value: String,
        ty: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Converters {
    table: HashMap<ValueType, Converter>,
}

impl Default for Converters {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Converters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.table.keys().map(ValueType::name).collect();
        names.sort_unstable();
        f.debug_struct("Converters").field("types", &names).finish()
    }
}

impl Converters {
    /// A table with converters for every built-in scalar type.
    pub fn new() -> Self {
        let mut table: HashMap<ValueType, Converter> = HashMap::new();
        table.insert(ValueType::Bool, Rc::new(parse_bool));
        table.insert(ValueType::I8, Rc::new(signed::<i8>));
        table.insert(ValueType::I16, Rc::new(signed::<i16>));
        table.insert(ValueType::I32, Rc::new(signed::<i32>));
        table.insert(ValueType::I64, Rc::new(signed::<i64>));
        table.insert(ValueType::U8, Rc::new(unsigned::<u8>));
        table.insert(ValueType::U16, Rc::new(unsigned::<u16>));
        table.insert(ValueType::U32, Rc::new(unsigned::<u32>));
        table.insert(ValueType::U64, Rc::new(unsigned::<u64>));
        table.insert(
            ValueType::F32,
            Rc::new(|raw: &str| {
                raw.parse::<f32>()
                    .map(|x| Value::Float(f64::from(x)))
                    .map_err(|e| e.to_string())
            }),
        );
        table.insert(
            ValueType::F64,
            Rc::new(|raw: &str| {
                raw.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| e.to_string())
            }),
        );
        table.insert(
            ValueType::Str,
            Rc::new(|raw: &str| Ok(Value::Str(raw.to_string()))),
        );
        table.insert(
            ValueType::Path,
            Rc::new(|raw: &str| Ok(Value::Path(PathBuf::from(raw)))),
        );
        table.insert(
            ValueType::Level,
            Rc::new(|raw: &str| {
                raw.parse::<Level>()
                    .map(Value::Level)
                    .map_err(|e| e.to_string())
            }),
        );
        Self { table }
    }

    /// Register or replace a converter. Returns the one it displaced.
    pub fn insert<F>(&mut self, ty: ValueType, converter: F) -> Option<Converter>
    where
        F: Fn(&str) -> Result<Value, String> + 'static,
    {
        self.table.insert(ty, Rc::new(converter))
    }

    pub fn remove(&mut self, ty: &ValueType) -> Option<Converter> {
        self.table.remove(ty)
    }

    /// Enum types are always supported through their member list.
    pub fn supports(&self, ty: &ValueType) -> bool {
        matches!(ty, ValueType::Enum(_)) || self.table.contains_key(ty)
    }

    pub fn convert_one(&self, ty: &ValueType, raw: &str) -> Result<Value, ConversionError> {
        let result = match (self.table.get(ty), ty) {
            (Some(converter), _) => converter(raw),
            (None, ValueType::Enum(e)) => e
                .member(raw)
                .map(|m| Value::Enum(m.to_string()))
                .ok_or_else(|| format!("expected one of: {}", e.members().join(", "))),
            (None, _) => return Err(ConversionError::Unsupported(ty.name().to_string())),
        };
        result.map_err(|reason| ConversionError::Malformed {
            value: raw.to_string(),
            ty: ty.name().to_string(),
            reason,
        })
    }

    /// Convert each token independently into `ty`.
    pub fn convert<S: AsRef<str>>(
        &self,
        ty: &ValueType,
        raw: &[S],
    ) -> Result<Vec<Value>, ConversionError> {
        raw.iter()
            .map(|token| self.convert_one(ty, token.as_ref()))
            .collect()
    }
}

fn parse_bool(raw: &str) -> Result<Value, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
        _ => Err("expected true/false, yes/no, on/off or 1/0".to_string()),
    }
}

/// Integer literal: `0`, `0x..` hex, `0b..` binary, `0..` octal, else decimal.
pub fn parse_int_literal(raw: &str) -> Result<i128, String> {
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (digits, radix) = if body == "0" {
        (body, 10)
    } else if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(bin) = body.strip_prefix("0b").or_else(|| body.strip_prefix("0B")) {
        (bin, 2)
    } else if let Some(oct) = body.strip_prefix('0') {
        (oct, 8)
    } else {
        (body, 10)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err("not an integer literal".to_string());
    }
    let magnitude = i128::from_str_radix(digits, radix).map_err(|e| e.to_string())?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn signed<T>(raw: &str) -> Result<Value, String>
where
    T: TryFrom<i128> + Into<i64>,
{
    let n = parse_int_literal(raw)?;
    T::try_from(n)
        .map(|v| Value::Int(v.into()))
        .map_err(|_| format!("{n} is out of range for {}", std::any::type_name::<T>()))
}

fn unsigned<T>(raw: &str) -> Result<Value, String>
where
    T: TryFrom<i128> + Into<u64>,
{
    let n = parse_int_literal(raw)?;
    T::try_from(n)
        .map(|v| Value::UInt(v.into()))
        .map_err(|_| format!("{n} is out of range for {}", std::any::type_name::<T>()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EnumType;

    fn int(raw: &str) -> Result<Value, ConversionError> {
        Converters::new().convert_one(&ValueType::I32, raw)
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(int("0"), Ok(Value::Int(0)));
        assert_eq!(int("42"), Ok(Value::Int(42)));
        assert_eq!(int("0x1f"), Ok(Value::Int(31)));
        assert_eq!(int("0X1F"), Ok(Value::Int(31)));
        assert_eq!(int("0b101"), Ok(Value::Int(5)));
        assert_eq!(int("017"), Ok(Value::Int(15)));
        assert_eq!(int("-1"), Ok(Value::Int(-1)));
        assert_eq!(int("-0x10"), Ok(Value::Int(-16)));
    }

    #[test]
    fn test_integer_rejects_bad_digits() {
        assert!(matches!(int("08"), Err(ConversionError::Malformed { .. })));
        assert!(matches!(int("0x"), Err(ConversionError::Malformed { .. })));
        assert!(matches!(int("--3"), Err(ConversionError::Malformed { .. })));
        assert!(matches!(int("abc"), Err(ConversionError::Malformed { .. })));
    }

    #[test]
    fn test_integer_width_checked() {
        let c = Converters::new();
        assert_eq!(c.convert_one(&ValueType::I8, "127"), Ok(Value::Int(127)));
        assert!(c.convert_one(&ValueType::I8, "128").is_err());
        assert!(c.convert_one(&ValueType::U8, "-1").is_err());
        assert_eq!(c.convert_one(&ValueType::U64, "0xff"), Ok(Value::UInt(255)));
    }

    #[test]
    fn test_bool_spellings() {
        let c = Converters::new();
        for raw in ["true", "YES", "On", "1"] {
            assert_eq!(c.convert_one(&ValueType::Bool, raw), Ok(Value::Bool(true)));
        }
        for raw in ["false", "no", "OFF", "0"] {
            assert_eq!(c.convert_one(&ValueType::Bool, raw), Ok(Value::Bool(false)));
        }
        assert!(c.convert_one(&ValueType::Bool, "maybe").is_err());
    }

    #[test]
    fn test_enum_and_level() {
        let c = Converters::new();
        let color = ValueType::Enum(EnumType::new("Color", ["RED", "GREEN"]));
        assert_eq!(c.convert_one(&color, "RED"), Ok(Value::Enum("RED".into())));
        let err = c.convert_one(&color, "red").unwrap_err();
        assert!(err.to_string().contains("RED, GREEN"));
        assert_eq!(
            c.convert_one(&ValueType::Level, "debug"),
            Ok(Value::Level(Level::DEBUG))
        );
    }

    #[test]
    fn test_named_types_need_registration() {
        let mut c = Converters::new();
        let ty = ValueType::Named("Point".into());
        assert_eq!(
            c.convert_one(&ty, "1,2"),
            Err(ConversionError::Unsupported("Point".into()))
        );
        c.insert(ty.clone(), |raw| {
            let (x, y) = raw.split_once(',').ok_or("expected x,y")?;
            let x = x.parse::<i64>().map_err(|e| e.to_string())?;
            let y = y.parse::<i64>().map_err(|e| e.to_string())?;
            Ok(Value::Tuple(vec![Value::Int(x), Value::Int(y)]))
        });
        assert!(c.supports(&ty));
        assert_eq!(
            c.convert(&ty, &["1,2", "3,4"][..]).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_replace_builtin() {
        let mut c = Converters::new();
        let old = c.insert(ValueType::Str, |raw| Ok(Value::Str(raw.to_uppercase())));
        assert!(old.is_some());
        assert_eq!(c.convert_one(&ValueType::Str, "ab"), Ok(Value::Str("AB".into())));
    }
}
