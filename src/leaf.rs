//! Scalar destinations: numbers, booleans, strings, time, dynamic slots and
//! raw JSON containers.

use std::any::type_name;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::context::Context;
use crate::errors::{BindError, Result};
use crate::target::Target;
use crate::value::Value;

fn float_to_int<T>(f: f64) -> Option<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t < 0.0 {
        (t >= i64::MIN as f64)
            .then(|| <T as TryFrom<i64>>::try_from(t as i64).ok())
            .flatten()
    } else {
        (t < u64::MAX as f64)
            .then(|| <T as TryFrom<u64>>::try_from(t as u64).ok())
            .flatten()
    }
}

fn parse_int<T>(s: &str) -> Option<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    if let Ok(i) = s.parse::<i64>() {
        return <T as TryFrom<i64>>::try_from(i).ok();
    }
    if let Ok(u) = s.parse::<u64>() {
        return <T as TryFrom<u64>>::try_from(u).ok();
    }
    s.parse::<f64>().ok().and_then(float_to_int::<T>)
}

/// Best-effort integer conversion. Null and empty strings give zero.
pub fn to_int<T>(value: &Value) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64> + Default,
{
    let out = match value {
        Value::Null => Some(T::default()),
        Value::Bool(b) => <T as TryFrom<i64>>::try_from(*b as i64).ok(),
        Value::Int(i) => <T as TryFrom<i64>>::try_from(*i).ok(),
        Value::Uint(u) => <T as TryFrom<u64>>::try_from(*u).ok(),
        Value::Float(f) => float_to_int::<T>(*f),
        Value::String(s) if s.trim().is_empty() => Some(T::default()),
        Value::String(s) => parse_int::<T>(s.trim()),
        Value::Time(t) => <T as TryFrom<i64>>::try_from(t.timestamp()).ok(),
        _ => None,
    };
    out.ok_or_else(|| BindError::conversion(value, type_name::<T>()))
}

pub fn to_float(value: &Value) -> Result<f64> {
    float_for(value, "f64")
}

fn float_for(value: &Value, target: &'static str) -> Result<f64> {
    let out = match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Some(*i as f64),
        Value::Uint(u) => Some(*u as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    out.ok_or_else(|| BindError::conversion(value, target))
}

pub fn to_bool(value: &Value) -> Result<bool> {
    let out = match value {
        Value::Null => Some(false),
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::Uint(u) => Some(*u != 0),
        Value::Float(f) => Some(*f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
            "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
            _ => None,
        },
        _ => None,
    };
    out.ok_or_else(|| BindError::conversion(value, "bool"))
}

pub fn to_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Opaque(_) => Err(BindError::conversion(value, "String")),
        // Numbers, booleans and time use their display form; containers
        // become compact JSON.
        other => Ok(other.to_string()),
    }
}

const LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d",
    "%Y/%m/%d",
];

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// Parses `text` with the recognised layouts, then `extra`. Layouts without
/// an offset are read as local time.
pub fn parse_time(text: &str, extra: &[String]) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(text) {
        return Some(t.with_timezone(&Utc));
    }
    let layouts = LAYOUTS.iter().copied().chain(extra.iter().map(String::as_str));
    for layout in layouts {
        if let Ok(t) = DateTime::parse_from_str(text, layout) {
            return Some(t.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return local_to_utc(naive);
        }
        if let Some(naive) = NaiveDate::parse_from_str(text, layout)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return local_to_utc(naive);
        }
    }
    None
}

macro_rules! int_target {
    ($($t:ty),*) => {$(
        impl Target for $t {
            fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
                *self = to_int(value)?;
                Ok(())
            }

            fn to_value(&self) -> Value {
                Value::from(*self)
            }
        }
    )*};
}

int_target!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Target for f64 {
    fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
        *self = to_float(value)?;
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Target for f32 {
    fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
        let f = float_for(value, "f32")?;
        let narrowed = f as f32;
        if f.is_finite() && !narrowed.is_finite() {
            return Err(BindError::conversion(value, "f32"));
        }
        *self = narrowed;
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl Target for bool {
    fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
        *self = to_bool(value)?;
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Target for String {
    fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
        *self = to_string(value)?;
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Target for DateTime<Utc> {
    fn coerce_from(&mut self, value: &Value, cx: &mut Context) -> Result<()> {
        let parsed = match value {
            Value::Null => return Ok(()),
            Value::String(s) if s.trim().is_empty() => return Ok(()),
            Value::Time(t) => Some(*t),
            Value::String(s) => parse_time(s, &cx.time_layouts),
            Value::Int(secs) => Utc.timestamp_opt(*secs, 0).single(),
            Value::Uint(secs) => i64::try_from(*secs)
                .ok()
                .and_then(|s| Utc.timestamp_opt(s, 0).single()),
            Value::Float(f) if f.is_finite() => {
                let secs = f.floor();
                let nanos = ((f - secs) * 1e9).round() as u32;
                Utc.timestamp_opt(secs as i64, nanos.min(999_999_999)).single()
            }
            _ => None,
        };
        *self = parsed.ok_or_else(|| BindError::conversion(value, "DateTime<Utc>"))?;
        Ok(())
    }

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }
}

/// A dynamically typed slot keeps the source as is, `Null` included.
impl Target for Value {
    fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
        *self = value.clone();
        Ok(())
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

/// Holds the canonical compact JSON encoding of whatever was bound into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawJson(Vec<u8>);

impl RawJson {
    /// Canonicalises `text`, which must be valid JSON.
    pub fn from_text(text: &str) -> Result<Self> {
        Value::from_json_text(text)?.to_canonical_bytes().map(RawJson)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Always produced by serde_json, which emits UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl Target for RawJson {
    fn coerce_from(&mut self, value: &Value, _cx: &mut Context) -> Result<()> {
        self.0 = value.to_canonical_bytes()?;
        Ok(())
    }

    fn to_value(&self) -> Value {
        if self.0.is_empty() {
            return Value::Null;
        }
        Value::from_json_text(self.as_str()).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cx() -> Context {
        Context::default()
    }

    #[test]
    fn integers_parse_from_strings_and_reject_overflow() {
        assert_eq!(to_int::<u64>(&Value::from(" 42 ")).unwrap(), 42);
        assert_eq!(to_int::<i32>(&Value::from("1.9")).unwrap(), 1);
        assert_eq!(to_int::<i8>(&Value::Float(-3.7)).unwrap(), -3);
        assert!(to_int::<u8>(&Value::Int(300)).is_err());
        assert!(to_int::<u32>(&Value::Int(-1)).is_err());
        assert!(to_int::<i64>(&Value::from("twelve")).is_err());
        assert_eq!(to_int::<u16>(&Value::Null).unwrap(), 0);
    }

    #[test]
    fn float_failures_name_the_destination_width() {
        let mut f = 0f32;
        let err = f.coerce_from(&Value::from("x"), &mut cx()).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert x into f32");
        let mut d = 0f64;
        let err = d.coerce_from(&Value::from("x"), &mut cx()).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert x into f64");
    }

    #[test]
    fn booleans_accept_common_literals() {
        assert!(to_bool(&Value::from("Yes")).unwrap());
        assert!(to_bool(&Value::Int(5)).unwrap());
        assert!(!to_bool(&Value::from("off")).unwrap());
        assert!(!to_bool(&Value::from("")).unwrap());
        assert!(to_bool(&Value::from("maybe")).is_err());
    }

    #[test]
    fn strings_render_containers_as_json() {
        let v = Value::from(json!({"a": [1, true]}));
        assert_eq!(to_string(&v).unwrap(), r#"{"a":[1,true]}"#);
        assert_eq!(to_string(&Value::Float(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn times_parse_rfc3339_and_local_layouts() {
        let t = parse_time("2022-12-15T08:11:34Z", &[]).unwrap();
        assert_eq!(t.to_rfc3339(), "2022-12-15T08:11:34+00:00");

        let naive = NaiveDateTime::parse_from_str("2022-12-15 16:11:34", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_time("2022-12-15 16:11:34", &[]), Some(expected));

        assert_eq!(parse_time("15.12.2022", &[]), None);
        let extra = vec!["%d.%m.%Y".to_string()];
        assert!(parse_time("15.12.2022", &extra).is_some());
    }

    #[test]
    fn unparseable_time_is_a_conversion_failure() {
        let mut t = DateTime::<Utc>::default();
        let err = t.coerce_from(&Value::from("yesterday"), &mut cx()).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Conversion);
    }

    #[test]
    fn raw_json_canonicalises_any_shape() {
        let mut raw = RawJson::default();
        raw.coerce_from(&Value::from(json!({"hello": "world"})), &mut cx())
            .unwrap();
        assert_eq!(raw.as_bytes(), br#"{"hello":"world"}"#);

        let raw = RawJson::from_text("[1, 2,\n 3]").unwrap();
        assert_eq!(raw.as_str(), "[1,2,3]");
    }

    #[test]
    fn dynamic_slot_keeps_null() {
        let mut slot = Value::from("x");
        slot.coerce_from(&Value::Null, &mut cx()).unwrap();
        assert!(slot.is_null());
    }
}
