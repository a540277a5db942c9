//! Reactive State
//!
//! A record of `serde_json::Value` fields whose writes call a change
//! callback. Containers assigned into the record are wrapped one level at
//! a time: an assigned array or object becomes a reactive [`StateList`] or
//! [`StateRecord`], and its own nested containers are only promoted when
//! first reached through [`StateRecord::record`] / [`StateList::list`].
//! Handles share storage, so a nested write is visible through every handle
//! and reaches the same callback.
//!
//! The callback never runs while a field borrow is held; it may read and
//! write the state it observes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

/// Change notification: `(key, value)` of the write that happened
pub type ChangeCallback = Rc<dyn Fn(&str, &Value)>;

/// Key reserved for internal bookkeeping; writes to it are dropped
pub const RESERVED_KEY: &str = "prototype";

/// Most `null` slots a single list write may pad past the end
pub const MAX_LIST_PADDING: usize = 1024;

type Fields = Rc<RefCell<BTreeMap<String, Entry>>>;
type Items = Rc<RefCell<Vec<Entry>>>;

enum Entry {
    Plain(Value),
    Record(Fields),
    List(Items),
}

impl Entry {
    /// Wrap one level deep; inner containers stay plain until promoted
    fn wrap(value: Value) -> Self {
        match value {
            Value::Object(map) => Entry::Record(Rc::new(RefCell::new(
                map.into_iter().map(|(k, v)| (k, Entry::Plain(v))).collect(),
            ))),
            Value::Array(items) => Entry::List(Rc::new(RefCell::new(
                items.into_iter().map(Entry::Plain).collect(),
            ))),
            scalar => Entry::Plain(scalar),
        }
    }

    fn promote(&mut self) {
        if let Entry::Plain(value) = self {
            if is_container(value) {
                let value = value.take();
                *self = Entry::wrap(value);
            }
        }
    }

    fn snapshot(&self) -> Value {
        match self {
            Entry::Plain(value) => value.clone(),
            Entry::Record(fields) => Value::Object(
                fields
                    .borrow()
                    .iter()
                    .map(|(k, e)| (k.clone(), e.snapshot()))
                    .collect::<Map<String, Value>>(),
            ),
            Entry::List(items) => Value::Array(items.borrow().iter().map(Entry::snapshot).collect()),
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Entry::Plain(Value::Null))
    }

    /// Scalar equality; a container never equals a fresh value
    fn equals(&self, value: &Value) -> bool {
        match self {
            Entry::Plain(current) => !is_container(value) && current == value,
            _ => false,
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Outcome of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    /// Reserved key or out-of-range index, nothing stored
    Ignored,
    /// Value equal to the current one
    Unchanged,
    /// New scalar field
    Created,
    /// New container field, wrapped for nested notification
    Wrapped,
    /// Existing field overwritten
    Updated,
}

/// Classify a write inside a nested container
fn nested_outcome(current: Option<&Entry>, value: &Value) -> Write {
    match current {
        Some(entry) if entry.equals(value) => Write::Unchanged,
        None if value.is_null() => Write::Unchanged,
        Some(entry) if !entry.is_null() => Write::Updated,
        _ if is_container(value) => Write::Wrapped,
        _ => Write::Created,
    }
}

/// Create a reactive state record
pub fn create_state(on_change: impl Fn(&str, &Value) + 'static) -> State {
    State::new(on_change)
}

/// Top-level reactive record
#[derive(Clone)]
pub struct State {
    fields: Fields,
    on_change: ChangeCallback,
}

impl State {
    pub fn new(on_change: impl Fn(&str, &Value) + 'static) -> Self {
        Self {
            fields: Rc::default(),
            on_change: Rc::new(on_change),
        }
    }

    /// Current value of a field
    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).map(Entry::snapshot)
    }

    /// Write a field.
    ///
    /// Only overwriting a present, non-null field notifies. Establishing a
    /// field, scalar or container, is silent.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Write {
        if key == RESERVED_KEY {
            return Write::Ignored;
        }
        let value = value.into();

        let mut fields = self.fields.borrow_mut();
        // A field holding null counts as absent
        let current = match fields.get(key) {
            Some(entry) if !entry.is_null() => Some(entry.equals(&value)),
            _ => None,
        };

        match current {
            Some(true) => Write::Unchanged,
            None if value.is_null() => Write::Unchanged,
            Some(false) => {
                let notified = value.clone();
                fields.insert(key.to_string(), Entry::wrap(value));
                drop(fields);
                (self.on_change)(key, &notified);
                Write::Updated
            }
            None => {
                let outcome = if is_container(&value) {
                    Write::Wrapped
                } else {
                    Write::Created
                };
                fields.insert(key.to_string(), Entry::wrap(value));
                outcome
            }
        }
    }

    /// Write a field computed from its current value (`null` if absent)
    pub fn update(&self, key: &str, f: impl FnOnce(&Value) -> Value) -> Write {
        let current = self.get(key).unwrap_or(Value::Null);
        self.set(key, f(&current))
    }

    /// Write every entry of an object; anything else is ignored
    pub fn merge(&self, values: Value) -> Vec<Write> {
        match values {
            Value::Object(map) => map.into_iter().map(|(k, v)| self.set(&k, v)).collect(),
            other => {
                tracing::warn!("state merge expects an object, got {}", other);
                Vec::new()
            }
        }
    }

    /// Reactive handle to an object field
    pub fn record(&self, key: &str) -> Option<StateRecord> {
        record_in(&self.fields, key, &self.on_change)
    }

    /// Reactive handle to an array field
    pub fn list(&self, key: &str) -> Option<StateList> {
        list_in(&self.fields, key, &self.on_change)
    }

    pub fn keys(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.borrow().contains_key(key)
    }

    /// Plain copy of the whole record
    pub fn snapshot(&self) -> Value {
        Entry::Record(Rc::clone(&self.fields)).snapshot()
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("fields", &self.snapshot())
            .finish_non_exhaustive()
    }
}

fn record_in(fields: &Fields, key: &str, on_change: &ChangeCallback) -> Option<StateRecord> {
    let mut fields = fields.borrow_mut();
    let entry = fields.get_mut(key)?;
    entry.promote();
    match entry {
        Entry::Record(inner) => Some(StateRecord {
            fields: Rc::clone(inner),
            on_change: Rc::clone(on_change),
        }),
        _ => None,
    }
}

fn list_in(fields: &Fields, key: &str, on_change: &ChangeCallback) -> Option<StateList> {
    let mut fields = fields.borrow_mut();
    let entry = fields.get_mut(key)?;
    entry.promote();
    match entry {
        Entry::List(inner) => Some(StateList {
            items: Rc::clone(inner),
            on_change: Rc::clone(on_change),
        }),
        _ => None,
    }
}

/// Reactive handle to a nested object
#[derive(Clone)]
pub struct StateRecord {
    fields: Fields,
    on_change: ChangeCallback,
}

impl StateRecord {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).map(Entry::snapshot)
    }

    /// Write a nested field.
    ///
    /// Scalar writes always notify with the field name. Container writes
    /// notify only when they replace an existing field.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Write {
        if key == RESERVED_KEY {
            return Write::Ignored;
        }
        let value = value.into();

        let mut fields = self.fields.borrow_mut();
        let outcome = nested_outcome(fields.get(key), &value);
        if matches!(outcome, Write::Unchanged) {
            return outcome;
        }

        let notified = matches!(outcome, Write::Created | Write::Updated).then(|| value.clone());
        fields.insert(key.to_string(), Entry::wrap(value));
        drop(fields);

        if let Some(value) = notified {
            (self.on_change)(key, &value);
        }
        outcome
    }

    pub fn record(&self, key: &str) -> Option<StateRecord> {
        record_in(&self.fields, key, &self.on_change)
    }

    pub fn list(&self, key: &str) -> Option<StateList> {
        list_in(&self.fields, key, &self.on_change)
    }

    pub fn keys(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Value {
        Entry::Record(Rc::clone(&self.fields)).snapshot()
    }
}

impl fmt::Debug for StateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateRecord").field(&self.snapshot()).finish()
    }
}

/// Reactive handle to a nested array
#[derive(Clone)]
pub struct StateList {
    items: Items,
    on_change: ChangeCallback,
}

impl StateList {
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).map(Entry::snapshot)
    }

    /// Write an element, padding with `null` past the end.
    ///
    /// Notifies with the decimal index under the same rules as
    /// [`StateRecord::set`]. An index more than [`MAX_LIST_PADDING`] past
    /// the end is dropped with a warning.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Write {
        let value = value.into();

        let mut items = self.items.borrow_mut();
        if index.saturating_sub(items.len()) > MAX_LIST_PADDING {
            tracing::warn!("list write at {} dropped, length is {}", index, items.len());
            return Write::Ignored;
        }
        let outcome = nested_outcome(items.get(index), &value);
        if matches!(outcome, Write::Unchanged) {
            return outcome;
        }

        let notified = matches!(outcome, Write::Created | Write::Updated).then(|| value.clone());
        if index >= items.len() {
            items.resize_with(index + 1, || Entry::Plain(Value::Null));
        }
        items[index] = Entry::wrap(value);
        drop(items);

        if let Some(value) = notified {
            (self.on_change)(&index.to_string(), &value);
        }
        outcome
    }

    /// Append an element
    pub fn push(&self, value: impl Into<Value>) -> Write {
        let len = self.len();
        self.set(len, value)
    }

    /// Remove the last element; notifies `("length", new_len)`
    pub fn pop(&self) -> Option<Value> {
        let (popped, len) = {
            let mut items = self.items.borrow_mut();
            let popped = items.pop()?;
            (popped.snapshot(), items.len())
        };
        (self.on_change)("length", &Value::from(len));
        Some(popped)
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn record(&self, index: usize) -> Option<StateRecord> {
        let mut items = self.items.borrow_mut();
        let entry = items.get_mut(index)?;
        entry.promote();
        match entry {
            Entry::Record(inner) => Some(StateRecord {
                fields: Rc::clone(inner),
                on_change: Rc::clone(&self.on_change),
            }),
            _ => None,
        }
    }

    pub fn list(&self, index: usize) -> Option<StateList> {
        let mut items = self.items.borrow_mut();
        let entry = items.get_mut(index)?;
        entry.promote();
        match entry {
            Entry::List(inner) => Some(StateList {
                items: Rc::clone(inner),
                on_change: Rc::clone(&self.on_change),
            }),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Value {
        Entry::List(Rc::clone(&self.items)).snapshot()
    }
}

impl fmt::Debug for StateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateList").field(&self.snapshot()).finish()
    }
}
