//! Recursive descent that drives a bind: resolves source keys to schema
//! fields, walks field paths through embedded structs, and hands each value
//! to [`bind_slot`].

use crate::context::Context;
use crate::descriptor::TypeDescriptor;
use crate::errors::{BindError, Result};
use crate::hook::bind_slot;
use crate::matcher::{match_key, MatchRule};
use crate::target::{Record, Target};
use crate::value::{Map, Source, Value};

fn field_slot<'a>(rec: &'a mut dyn Record, path: &[usize]) -> Option<&'a mut dyn Target> {
    let (first, rest) = path.split_first()?;
    let field = rec.field_mut(*first)?;
    if rest.is_empty() {
        return Some(field);
    }
    field_slot(field.as_record_mut()?, rest)
}

fn field_ref<'a>(rec: &'a dyn Record, path: &[usize]) -> Option<&'a dyn Target> {
    let (first, rest) = path.split_first()?;
    let field = rec.field_ref(*first)?;
    if rest.is_empty() {
        return Some(field);
    }
    field_ref(field.as_record()?, rest)
}

/// Standard coercion for struct-typed slots. Mappings bind field by field,
/// strings are decoded as raw JSON text, null leaves the struct untouched.
pub fn coerce_record(rec: &mut dyn Record, value: &Value, cx: &mut Context) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Map(map) => bind_map(rec, map, cx),
        Value::String(text) => {
            let decoded = Value::from_json_text(text)?;
            let Value::Map(map) = &decoded else {
                return Err(BindError::UnsupportedSource(format!(
                    "JSON text for {} is a {}, not an object",
                    rec.target_name(),
                    decoded.kind_name()
                )));
            };
            let strict = cx.policy().strict();
            cx.with_policy(strict, |cx| bind_map(rec, map, cx))
        }
        other => Err(BindError::conversion(other.kind_name(), rec.target_name())),
    }
}

fn bind_map(rec: &mut dyn Record, map: &Map, cx: &mut Context) -> Result<()> {
    let source_id = map as *const Map as usize;
    let dest_id = &*rec as *const dyn Record as *const () as usize;
    if !cx.enter(source_id, dest_id) {
        tracing::warn!(ty = rec.target_name(), "cycle detected, skipping");
        return Ok(());
    }
    let out = bind_fields(rec, map, cx);
    cx.leave(source_id, dest_id);
    out
}

fn bind_fields(rec: &mut dyn Record, map: &Map, cx: &mut Context) -> Result<()> {
    let desc: &'static TypeDescriptor = rec.descriptor();
    let policy = cx.policy();

    // Several keys may resolve to one field; the best rule wins, then the
    // earliest key.
    let mut chosen: Vec<Option<(MatchRule, &str, &Value)>> = vec![None; desc.len()];
    for (key, value) in map.iter() {
        match match_key(key, desc, &policy) {
            Some((pos, rule)) => {
                let slot = &mut chosen[pos];
                if slot.map_or(true, |(best, _, _)| rule < best) {
                    *slot = Some((rule, key, value));
                }
            }
            None => tracing::debug!(key, ty = desc.type_name(), "no field matches key"),
        }
    }

    for (field, choice) in desc.fields().iter().zip(chosen) {
        let Some((rule, key, value)) = choice else {
            continue;
        };
        if !field.exported {
            continue;
        }
        let slot = field_slot(rec, &field.path).ok_or_else(|| {
            BindError::InvalidDestination(format!(
                "{} has no field at {:?}",
                desc.type_name(),
                field.path
            ))
        })?;
        tracing::trace!(field = field.name, key, ?rule, "binding field");
        bind_slot(slot, value, cx).map_err(|e| e.at_field(field.name))?;
    }
    Ok(())
}

/// Snapshots a struct into a mapping keyed by tag name (or declared name).
/// Private and `-` fields are left out; `omitempty` drops empty values and
/// `string` renders scalars as text.
pub fn to_value(rec: &dyn Record) -> Value {
    let desc = rec.descriptor();
    let mut map = Map::new();
    for field in desc.fields().iter().filter(|f| f.is_matchable()) {
        let Some(target) = field_ref(rec, &field.path) else {
            continue;
        };
        let mut value = target.to_value();
        if field.has_option("omitempty") && value.is_empty_like() {
            continue;
        }
        if field.has_option("string")
            && matches!(
                value,
                Value::Bool(_) | Value::Int(_) | Value::Uint(_) | Value::Float(_)
            )
        {
            value = Value::String(value.to_string());
        }
        map.insert(field.key_name(), value);
    }
    Value::Map(map)
}

fn require_record<D: Target>() -> Result<()> {
    match D::record_descriptor() {
        Some(_) => Ok(()),
        None => Err(BindError::InvalidDestination(format!(
            "{} is not a struct or pointer to struct",
            std::any::type_name::<D>()
        ))),
    }
}

fn bind_value<D: Target>(value: &Value, dest: &mut D, cx: &mut Context) -> Result<()> {
    match value {
        Value::Null => return Ok(()),
        Value::Map(_) | Value::String(_) => {}
        other => {
            return Err(BindError::UnsupportedSource(format!(
                "cannot bind a {} into {}",
                other.kind_name(),
                std::any::type_name::<D>()
            )))
        }
    }
    let rec = dest.as_record_mut().ok_or_else(|| {
        BindError::InvalidDestination(format!("{} has no struct", std::any::type_name::<D>()))
    })?;
    coerce_record(rec, value, cx)
}

/// Decodes text sources; returns the value and whether it came from text.
fn resolve(source: Source) -> Result<(Value, bool)> {
    match source {
        Source::Value(value) => Ok((value, false)),
        Source::Text(text) => Ok((Value::from_json_text(&text)?, true)),
    }
}

pub(crate) fn bind_root<D: Target>(source: Source, dest: &mut D, cx: &mut Context) -> Result<()> {
    require_record::<D>()?;
    let (value, from_text) = resolve(source)?;
    tracing::debug!(
        ty = std::any::type_name::<D>(),
        source = value.kind_name(),
        from_text,
        "binding"
    );
    if from_text {
        let strict = cx.policy().strict();
        cx.with_policy(strict, |cx| bind_value(&value, dest, cx))
    } else {
        bind_value(&value, dest, cx)
    }
}

pub(crate) fn bind_many_root<T: Target + Default>(
    source: Source,
    dest: &mut Vec<T>,
    cx: &mut Context,
) -> Result<()> {
    require_record::<T>()?;
    let (value, from_text) = resolve(source)?;
    let items = match value {
        Value::Seq(items) => items,
        Value::Null => Vec::new(),
        other => {
            return Err(BindError::UnsupportedSource(format!(
                "expected a sequence, got a {}",
                other.kind_name()
            )))
        }
    };
    tracing::debug!(
        ty = std::any::type_name::<T>(),
        len = items.len(),
        from_text,
        "binding sequence"
    );

    dest.resize_with(items.len(), T::default);
    let policy = if from_text {
        cx.policy().strict()
    } else {
        cx.policy()
    };
    cx.with_policy(policy, |cx| {
        for (i, (slot, item)) in dest.iter_mut().zip(&items).enumerate() {
            bind_value(item, slot, cx).map_err(|e| e.at_index(i))?;
        }
        Ok(())
    })
}

/// Binds `value` into the field of `dest` declared as `name`. Returns
/// `false` without writing when the field is unknown or private.
pub fn bind_field<R: Record>(dest: &mut R, name: &str, value: &Value, cx: &mut Context) -> Result<bool> {
    let desc = dest.descriptor();
    let Some(field) = desc.field(name).filter(|f| f.is_matchable()) else {
        return Ok(false);
    };
    let Some(slot) = field_slot(dest, &field.path) else {
        return Ok(false);
    };
    bind_slot(slot, value, cx).map_err(|e| e.at_field(field.name))?;
    Ok(true)
}
