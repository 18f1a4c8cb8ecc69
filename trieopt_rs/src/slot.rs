//! Where an action writes its value.
//!
//! A [`Slot`] is read/write access to one target location. [`ValueCell`] is a
//! shared cell the caller keeps a clone of; [`Accessor`] wraps a getter/setter
//! pair around caller-owned state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::value::{FromValue, Value};

pub trait Slot {
    fn get(&self) -> Option<Value>;

    /// Store a new value. Setter failures surface as invocation errors.
    fn set(&mut self, value: Value) -> anyhow::Result<()>;
}

/// Shared, initially empty (or pre-seeded) value cell.
#[derive(Clone, Default)]
pub struct ValueCell(Rc<RefCell<Option<Value>>>);

impl ValueCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cell holding a default value.
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self(Rc::new(RefCell::new(Some(value.into()))))
    }

    pub fn get(&self) -> Option<Value> {
        self.0.borrow().clone()
    }

    pub fn get_as<T: FromValue>(&self) -> Option<T> {
        self.0.borrow().as_ref().and_then(T::from_value)
    }

    pub fn set(&self, value: impl Into<Value>) {
        *self.0.borrow_mut() = Some(value.into());
    }

    pub fn take(&self) -> Option<Value> {
        self.0.borrow_mut().take()
    }

    pub fn is_set(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl fmt::Debug for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValueCell").field(&*self.0.borrow()).finish()
    }
}

impl Slot for ValueCell {
    fn get(&self) -> Option<Value> {
        ValueCell::get(self)
    }

    fn set(&mut self, value: Value) -> anyhow::Result<()> {
        ValueCell::set(self, value);
        Ok(())
    }
}

type Getter = Box<dyn Fn() -> Option<Value>>;
type Setter = Box<dyn FnMut(Value) -> anyhow::Result<()>>;

/// Getter/setter closures over state the caller owns.
pub struct Accessor {
    getter: Getter,
    setter: Setter,
}

impl Accessor {
    pub fn new<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn() -> Option<Value> + 'static,
        S: FnMut(Value) -> anyhow::Result<()> + 'static,
    {
        Self {
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").finish_non_exhaustive()
    }
}

impl Slot for Accessor {
    fn get(&self) -> Option<Value> {
        (self.getter)()
    }

    fn set(&mut self, value: Value) -> anyhow::Result<()> {
        (self.setter)(value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_cell_is_shared() {
        let cell = ValueCell::new();
        let mut slot: Box<dyn Slot> = Box::new(cell.clone());
        assert!(!cell.is_set());
        slot.set(Value::Int(4)).unwrap();
        assert_eq!(cell.get_as::<i64>(), Some(4));
        assert_eq!(slot.get(), Some(Value::Int(4)));
    }

    #[test]
    fn test_accessor_roundtrip_and_failure() {
        let state = Rc::new(RefCell::new(0i64));
        let read = Rc::clone(&state);
        let write = Rc::clone(&state);
        let mut accessor = Accessor::new(
            move || Some(Value::Int(*read.borrow())),
            move |value| {
                let n = value
                    .as_i64()
                    .ok_or_else(|| anyhow::anyhow!("expected an integer"))?;
                *write.borrow_mut() = n;
                Ok(())
            },
        );
        accessor.set(Value::Int(9)).unwrap();
        assert_eq!(*state.borrow(), 9);
        assert_eq!(accessor.get(), Some(Value::Int(9)));
        assert!(accessor.set(Value::Str("x".into())).is_err());
    }
}
