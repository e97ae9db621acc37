//! Payload encoding.
//!
//! Payloads are encoded through [`Encoder`], a `serde::Serializer` that builds
//! a `serde_json::Value` while applying [`SerializerOptions`]: key and variant
//! casing, date rendering, null handling and per-field error recovery. It works
//! for any `Serialize` type, not only the ones defined in this crate.

use std::fmt::{self, Write};

use chrono::{DateTime, NaiveDateTime};
use serde::ser::{self, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Error, Map, Value};
use tracing::warn;

use crate::error::IntegrationError;

/// `yyyy-MM-dd H:mm:ss`
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %-H:%M:%S";

/// How object keys and enum variant names are written.
///
/// With `CamelCase`, keys that collide after conversion (`user_name` and
/// `userName`) keep the last value and a warning is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    /// lowerCamelCase keys and variant names.
    #[default]
    CamelCase,
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerOptions {
    pub key_case: KeyCase,
    /// strftime pattern for date values (chrono `DateTime` and
    /// `NaiveDateTime`), rendered in their own offset. Plain strings are never
    /// touched. `None` leaves dates as serde produced them.
    pub date_format: Option<String>,
    pub include_nulls: bool,
    pub pretty: bool,
    /// Write `null` for a field that can not be encoded instead of failing
    /// the call. A payload that fails as a whole becomes a `null` body.
    pub ignore_errors: bool,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            key_case: KeyCase::CamelCase,
            date_format: Some(DEFAULT_DATE_FORMAT.to_string()),
            include_nulls: true,
            pretty: true,
            ignore_errors: true,
        }
    }
}

impl SerializerOptions {
    pub fn with_key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }

    pub fn with_date_format(mut self, format: Option<String>) -> Self {
        self.date_format = format;
        self
    }

    pub fn with_include_nulls(mut self, include: bool) -> Self {
        self.include_nulls = include;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }
}

/// Encodes `value` as the request body.
pub fn to_json<T>(value: &T, options: &SerializerOptions) -> Result<String, IntegrationError>
where
    T: Serialize + ?Sized,
{
    match encode(value, options) {
        Ok(body) => Ok(body),
        Err(e) if options.ignore_errors => {
            warn!(error = %e, "Failed to serialize payload, sending null body");
            Ok(Value::Null.to_string())
        }
        Err(e) => Err(e.into()),
    }
}

fn encode<T>(value: &T, options: &SerializerOptions) -> Result<String, Error>
where
    T: Serialize + ?Sized,
{
    let tree = value.serialize(Encoder { options })?;
    if options.pretty {
        serde_json::to_string_pretty(&tree)
    } else {
        serde_json::to_string(&tree)
    }
}

#[derive(Clone, Copy)]
struct Encoder<'a> {
    options: &'a SerializerOptions,
}

impl<'a> Encoder<'a> {
    fn name(&self, name: &str) -> String {
        match self.options.key_case {
            KeyCase::CamelCase => to_camel_case(name),
            KeyCase::Preserve => name.to_string(),
        }
    }

    /// Encodes one object member, `null` in its place when it fails and
    /// errors are ignored.
    fn member<T>(&self, key: &str, value: &T) -> Result<Value, Error>
    where
        T: Serialize + ?Sized,
    {
        match value.serialize(*self) {
            Ok(encoded) => Ok(encoded),
            Err(e) if self.options.ignore_errors => {
                warn!(field = key, error = %e, "Failed to serialize field, sending null");
                Ok(Value::Null)
            }
            Err(e) => Err(e),
        }
    }

    fn object(self, len: Option<usize>) -> ObjectEncoder<'a> {
        ObjectEncoder {
            encoder: self,
            map: Map::with_capacity(len.unwrap_or(0)),
            next_key: None,
        }
    }

    fn seq(self, len: Option<usize>) -> SeqEncoder<'a> {
        SeqEncoder {
            encoder: self,
            items: Vec::with_capacity(len.unwrap_or(0)),
        }
    }

    /// `{"<variant>": value}`, the externally tagged enum form.
    fn tagged(&self, variant: &str, value: Value) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.name(variant), value);
        Value::Object(map)
    }
}

impl<'a> ser::Serializer for Encoder<'a> {
    type Ok = Value;
    type Error = Error;
    type SerializeSeq = SeqEncoder<'a>;
    type SerializeTuple = SeqEncoder<'a>;
    type SerializeTupleStruct = SeqEncoder<'a>;
    type SerializeTupleVariant = TupleVariantEncoder<'a>;
    type SerializeMap = ObjectEncoder<'a>;
    type SerializeStruct = ObjectEncoder<'a>;
    type SerializeStructVariant = StructVariantEncoder<'a>;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        Ok(v.into())
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Error> {
        Ok(Value::Array(v.iter().map(|&b| b.into()).collect()))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value, Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Error> {
        Ok(Value::String(self.name(variant)))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Value, Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error>
    where
        T: Serialize + ?Sized,
    {
        let inner = value.serialize(self)?;
        Ok(self.tagged(variant, inner))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqEncoder<'a>, Error> {
        Ok(self.seq(len))
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqEncoder<'a>, Error> {
        Ok(self.seq(Some(len)))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqEncoder<'a>, Error> {
        Ok(self.seq(Some(len)))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantEncoder<'a>, Error> {
        Ok(TupleVariantEncoder {
            variant,
            seq: self.seq(Some(len)),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<ObjectEncoder<'a>, Error> {
        Ok(self.object(len))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<ObjectEncoder<'a>, Error> {
        Ok(self.object(Some(len)))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<StructVariantEncoder<'a>, Error> {
        Ok(StructVariantEncoder {
            variant,
            object: self.object(Some(len)),
        })
    }

    // chrono's `DateTime` and `NaiveDateTime` arrive here, strings do not.
    fn collect_str<T>(self, value: &T) -> Result<Value, Error>
    where
        T: fmt::Display + ?Sized,
    {
        let text = value.to_string();
        Ok(Value::String(match self.options.date_format.as_deref() {
            Some(format) => format_date(text, format),
            None => text,
        }))
    }
}

struct SeqEncoder<'a> {
    encoder: Encoder<'a>,
    items: Vec<Value>,
}

impl ser::SerializeSeq for SeqEncoder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(self.encoder)?);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl ser::SerializeTuple for SeqEncoder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqEncoder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Error> {
        ser::SerializeSeq::end(self)
    }
}

struct TupleVariantEncoder<'a> {
    variant: &'static str,
    seq: SeqEncoder<'a>,
}

impl ser::SerializeTupleVariant for TupleVariantEncoder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(&mut self.seq, value)
    }

    fn end(self) -> Result<Value, Error> {
        let encoder = self.seq.encoder;
        Ok(encoder.tagged(self.variant, Value::Array(self.seq.items)))
    }
}

struct ObjectEncoder<'a> {
    encoder: Encoder<'a>,
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl ObjectEncoder<'_> {
    fn insert(&mut self, key: &str, value: Value) {
        if value.is_null() && !self.encoder.options.include_nulls {
            return;
        }
        let key = self.encoder.name(key);
        if self.map.contains_key(&key) {
            warn!(key = %key, "Duplicate object key after renaming, keeping the last value");
        }
        self.map.insert(key, value);
    }
}

impl ser::SerializeMap for ObjectEncoder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        self.next_key = Some(map_key(key.serialize(self.encoder)?)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| Error::custom("map value serialized before its key"))?;
        let value = self.encoder.member(&key, value)?;
        self.insert(&key, value);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for ObjectEncoder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        let value = self.encoder.member(key, value)?;
        self.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Object(self.map))
    }
}

struct StructVariantEncoder<'a> {
    variant: &'static str,
    object: ObjectEncoder<'a>,
}

impl ser::SerializeStructVariant for StructVariantEncoder<'_> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeStruct::serialize_field(&mut self.object, key, value)
    }

    fn end(self) -> Result<Value, Error> {
        let encoder = self.object.encoder;
        Ok(encoder.tagged(self.variant, Value::Object(self.object.map)))
    }
}

fn map_key(key: Value) -> Result<String, Error> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::custom("map key must be a string, number or bool")),
    }
}

/// Renders an RFC 3339 or naive ISO 8601 timestamp with `format`, keeping
/// the value's own offset. Anything else is returned as is.
fn format_date(text: String, format: &str) -> String {
    let mut out = String::new();
    let written = if let Ok(date) = DateTime::parse_from_rfc3339(&text) {
        write!(out, "{}", date.format(format))
    } else if let Ok(date) = NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f") {
        write!(out, "{}", date.format(format))
    } else {
        return text;
    };
    // An invalid pattern surfaces as a fmt error; keep the original text then.
    match written {
        Ok(()) => out,
        Err(_) => text,
    }
}

/// `snake_case`, `PascalCase` and `URLValue` style keys to lowerCamelCase.
pub(crate) fn to_camel_case(key: &str) -> String {
    let mut parts = key.split('_').filter(|p| !p.is_empty());
    let Some(first) = parts.next() else {
        return key.to_string();
    };

    let mut out = lower_leading(first);
    for part in parts {
        let mut chars = part.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

fn lower_leading(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, c) in chars.iter().enumerate() {
        let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
        if !c.is_uppercase() || (i > 0 && next_is_lower) {
            out.extend(&chars[i..]);
            return out;
        }
        out.extend(c.to_lowercase());
    }
    out
}
