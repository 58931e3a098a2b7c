//! Host capability and the dynamic value model the host exposes.
//!
//! The host owns a loosely typed world: nested tables keyed by integers or
//! names, with fields that may be missing while the game is mid-transition.
//! Tables are shared handles so that the same card can be found in several
//! places and compared by identity.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Capability object handed to every bridge component that touches the world.
pub trait Host {
    /// Root table of the world as it stands this frame.
    fn world(&self) -> HostValue;

    /// Whether the named mutation entry point exists on this host build.
    fn has_operation(&self, name: &str) -> bool;

    /// Invoke a mutation entry point.
    fn invoke(&mut self, name: &str, args: &[HostValue]) -> Result<(), HostError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The host refused the call; reported to the caller as a domain failure.
    #[error("{0}")]
    Rejected(String),
    /// The host failed unexpectedly while running the call.
    #[error("host fault in {operation}: {detail}")]
    Fault { operation: String, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKey {
    Index(i64),
    Name(String),
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Index(index) => write!(f, "{index}"),
            TableKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for TableKey {
    fn from(value: i64) -> Self {
        TableKey::Index(value)
    }
}

impl From<usize> for TableKey {
    fn from(value: usize) -> Self {
        TableKey::Index(value as i64)
    }
}

impl From<&str> for TableKey {
    fn from(value: &str) -> Self {
        TableKey::Name(value.to_string())
    }
}

#[derive(Debug, Default)]
pub struct HostTable {
    entries: BTreeMap<TableKey, HostValue>,
}

impl HostTable {
    pub fn get(&self, key: &TableKey) -> Option<&HostValue> {
        self.entries.get(key)
    }

    /// Setting [`HostValue::Nil`] removes the key.
    pub fn set(&mut self, key: TableKey, value: HostValue) {
        if value.is_nil() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &HostValue)> {
        self.entries.iter()
    }

    /// Length N of the 1..N integer run, if the table is exactly such a run.
    pub fn sequence_len(&self) -> Option<usize> {
        let mut expected = 1i64;
        for key in self.entries.keys() {
            match key {
                TableKey::Index(index) if *index == expected => expected += 1,
                _ => return None,
            }
        }
        Some((expected - 1) as usize)
    }
}

/// Shared handle to a host table. Equality is identity.
#[derive(Clone, Default)]
pub struct TableRef(Rc<RefCell<HostTable>>);

impl TableRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, HostTable> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, HostTable> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &TableRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self, key: impl Into<TableKey>) -> HostValue {
        self.borrow().get(&key.into()).cloned().unwrap_or_default()
    }

    pub fn set(&self, key: impl Into<TableKey>, value: impl Into<HostValue>) {
        self.borrow_mut().set(key.into(), value.into());
    }

    /// Values stored under 1..N, stopping at the first gap.
    pub fn sequence(&self) -> Vec<HostValue> {
        let table = self.borrow();
        let mut items = Vec::new();
        let mut index = 1i64;
        while let Some(value) = table.get(&TableKey::Index(index)) {
            items.push(value.clone());
            index += 1;
        }
        items
    }

    /// Replace the table's 1..N run with `items`, keeping named fields.
    pub fn replace_sequence(&self, items: Vec<HostValue>) {
        let mut table = self.borrow_mut();
        table
            .entries
            .retain(|key, _| matches!(key, TableKey::Name(_)));
        for (offset, item) in items.into_iter().enumerate() {
            table.set(TableKey::Index(offset as i64 + 1), item);
        }
    }

    pub fn from_sequence(items: impl IntoIterator<Item = HostValue>) -> Self {
        let table = TableRef::new();
        table.replace_sequence(items.into_iter().collect());
        table
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Tables may refer back to their owners, so never recurse here.
impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(table) => write!(f, "TableRef(len={})", table.len()),
            Err(_) => f.write_str("TableRef(<borrowed>)"),
        }
    }
}

/// One value in the host world.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HostValue {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Table(TableRef),
}

impl HostValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil)
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            HostValue::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|value| value.trunc() as i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Host truthiness: everything except nil and `false`.
    pub fn truthy(&self) -> bool {
        !matches!(self, HostValue::Nil | HostValue::Bool(false))
    }

    /// Text form of a scalar; numbers print without a trailing `.0`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            HostValue::Str(value) => Some(value.clone()),
            HostValue::Number(value) if value.is_finite() && value.fract() == 0.0 => {
                Some(format!("{}", *value as i64))
            }
            HostValue::Number(value) if value.is_finite() => Some(value.to_string()),
            HostValue::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// Field lookup; anything that is not a table has no fields.
    pub fn get(&self, key: &str) -> HostValue {
        self.as_table()
            .map(|table| table.get(key))
            .unwrap_or_default()
    }

    /// Nested lookup, nil as soon as any hop is missing.
    pub fn path(&self, keys: &[&str]) -> HostValue {
        keys.iter().fold(self.clone(), |value, key| value.get(key))
    }

    /// 1..N items of a table, empty for anything else.
    pub fn sequence(&self) -> Vec<HostValue> {
        self.as_table().map(TableRef::sequence).unwrap_or_default()
    }

    pub fn table(fields: impl IntoIterator<Item = (&'static str, HostValue)>) -> HostValue {
        let table = TableRef::new();
        for (key, value) in fields {
            table.set(key, value);
        }
        HostValue::Table(table)
    }

    pub fn list(items: impl IntoIterator<Item = HostValue>) -> HostValue {
        HostValue::Table(TableRef::from_sequence(items))
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Number(value as f64)
    }
}

impl From<usize> for HostValue {
    fn from(value: usize) -> Self {
        HostValue::Number(value as f64)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Str(value)
    }
}

impl From<TableRef> for HostValue {
    fn from(value: TableRef) -> Self {
        HostValue::Table(value)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}
