//! Pointer-like and collection destinations.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::context::Context;
use crate::errors::{BindError, Result};
use crate::hook::bind_slot;
use crate::target::{Record, Target, UnmarshalValue};
use crate::descriptor::TypeDescriptor;
use crate::value::{Map, Value};

/// `None` stands for an unset pointer. Null leaves it unset; anything else
/// allocates (or reuses) the pointee and binds into it.
impl<T: Target + Default> Target for Option<T> {
    fn coerce_from(&mut self, value: &Value, cx: &mut Context) -> Result<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        bind_slot(self.get_or_insert_with(T::default), value, cx)
    }

    fn to_value(&self) -> Value {
        self.as_ref().map(Target::to_value).unwrap_or(Value::Null)
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        T::record_descriptor()?;
        self.get_or_insert_with(T::default).as_record_mut()
    }

    fn as_record(&self) -> Option<&dyn Record> {
        self.as_ref()?.as_record()
    }

    fn record_descriptor() -> Option<&'static TypeDescriptor> {
        T::record_descriptor()
    }
}

impl<T: Target + Default> Target for Box<T> {
    fn coerce_from(&mut self, value: &Value, cx: &mut Context) -> Result<()> {
        bind_slot(&mut **self, value, cx)
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn as_hook(&mut self) -> Option<&mut dyn UnmarshalValue> {
        (**self).as_hook()
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn Record> {
        (**self).as_record_mut()
    }

    fn as_record(&self) -> Option<&dyn Record> {
        (**self).as_record()
    }

    fn record_descriptor() -> Option<&'static TypeDescriptor> {
        T::record_descriptor()
    }
}

/// Reads a source as a list of elements. A string holding a JSON array is
/// decoded; any other scalar becomes a single element.
fn elements(value: &Value) -> Cow<'_, [Value]> {
    match value {
        Value::Null => Cow::Borrowed(&[]),
        Value::Seq(items) => Cow::Borrowed(items),
        Value::String(s) if s.trim_start().starts_with('[') => match Value::from_json_text(s) {
            Ok(Value::Seq(items)) => Cow::Owned(items),
            _ => Cow::Owned(vec![value.clone()]),
        },
        other => Cow::Owned(vec![other.clone()]),
    }
}

impl<T: Target + Default> Target for Vec<T> {
    fn coerce_from(&mut self, value: &Value, cx: &mut Context) -> Result<()> {
        let items = elements(value);
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut slot = T::default();
            bind_slot(&mut slot, item, cx).map_err(|e| e.at_index(i))?;
            out.push(slot);
        }
        *self = out;
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::Seq(self.iter().map(Target::to_value).collect())
    }
}

/// Reads a source as a mapping; JSON object text is decoded.
fn entries<'a>(value: &'a Value, target: &'static str) -> Result<Cow<'a, Map>> {
    match value {
        Value::Null => Ok(Cow::Owned(Map::new())),
        Value::Map(map) => Ok(Cow::Borrowed(map)),
        Value::String(s) => match Value::from_json_text(s) {
            Ok(Value::Map(map)) => Ok(Cow::Owned(map)),
            _ => Err(BindError::conversion(value, target)),
        },
        other => Err(BindError::conversion(other.kind_name(), target)),
    }
}

fn coerce_entries<K, V>(
    map: &Map,
    cx: &mut Context,
    mut insert: impl FnMut(K, V),
) -> Result<()>
where
    K: Target + Default,
    V: Target + Default,
{
    for (key, item) in map.iter() {
        let mut k = K::default();
        bind_slot(&mut k, &Value::from(key), cx).map_err(|e| e.at_key(key))?;
        let mut v = V::default();
        bind_slot(&mut v, item, cx).map_err(|e| e.at_key(key))?;
        insert(k, v);
    }
    Ok(())
}

fn snapshot_entries<'a, K, V>(iter: impl Iterator<Item = (&'a K, &'a V)>) -> Value
where
    K: Target,
    V: Target,
{
    Value::Map(
        iter.map(|(k, v)| (k.to_value().to_string(), v.to_value()))
            .collect(),
    )
}

impl<K, V> Target for HashMap<K, V>
where
    K: Target + Default + Eq + Hash,
    V: Target + Default,
{
    fn coerce_from(&mut self, value: &Value, cx: &mut Context) -> Result<()> {
        let map = entries(value, self.target_name())?;
        let mut out = HashMap::with_capacity(map.len());
        coerce_entries(&map, cx, |k, v| {
            out.insert(k, v);
        })?;
        *self = out;
        Ok(())
    }

    fn to_value(&self) -> Value {
        snapshot_entries(self.iter())
    }
}

impl<K, V> Target for BTreeMap<K, V>
where
    K: Target + Default + Ord,
    V: Target + Default,
{
    fn coerce_from(&mut self, value: &Value, cx: &mut Context) -> Result<()> {
        let map = entries(value, self.target_name())?;
        let mut out = BTreeMap::new();
        coerce_entries(&map, cx, |k, v| {
            out.insert(k, v);
        })?;
        *self = out;
        Ok(())
    }

    fn to_value(&self) -> Value {
        snapshot_entries(self.iter())
    }
}
