//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Typed extraction of mandatory, optional, and repeated fields from JSON objects.
//!
//! Every payload declares its wire fields once as [`Mandatory`] / [`Optional`]
//! descriptors; the descriptors drive both parsing and serialization so a
//! concrete message only lists its fields.

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number};

pub use serde_json::Value as JsonValue;

/// JSON object as carried on the wire.
pub type JsonObject = Map<String, JsonValue>;

/// Structured failure raised while extracting a field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// A mandatory field was absent (or `null`).
    #[error("mandatory field '{field}' is missing")]
    Missing { field: String },
    /// The field was present with the wrong JSON shape.
    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    /// The field had the right shape but failed domain parsing.
    #[error("field '{field}' is invalid: {reason}")]
    Invalid { field: String, reason: String },
    /// One element of a repeated field failed to parse.
    #[error("element {index} of '{field}' is invalid: {reason}")]
    Element {
        field: String,
        index: usize,
        reason: String,
    },
}

/// Failure reported by a [`FieldValue`] conversion, before the field name is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Wrong JSON shape.
    WrongType,
    /// Right shape, rejected by domain parsing.
    Invalid(String),
}

/// A value that can be read from and written to a single JSON field.
pub trait FieldValue: Sized {
    /// Shape description used in error messages, e.g. `"a string"`.
    const EXPECTED: &'static str;

    /// Convert a present JSON value.
    fn from_json(value: &JsonValue) -> Result<Self, ValueError>;

    /// Render the value for the wire.
    fn to_json(&self) -> JsonValue;
}

impl FieldValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or(ValueError::WrongType)
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::String(self.clone())
    }
}

impl FieldValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        value.as_bool().ok_or(ValueError::WrongType)
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::Bool(*self)
    }
}

impl FieldValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        value.as_i64().ok_or(ValueError::WrongType)
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::from(*self)
    }
}

macro_rules! narrow_integer_field {
    ($ty:ty, $expected:literal) => {
        impl FieldValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
                let wide = value.as_i64().ok_or(ValueError::WrongType)?;
                <$ty>::try_from(wide)
                    .map_err(|_| ValueError::Invalid(format!("{} is out of range", wide)))
            }

            fn to_json(&self) -> JsonValue {
                JsonValue::from(*self)
            }
        }
    };
}

narrow_integer_field!(i32, "an integer");
narrow_integer_field!(u32, "a non-negative integer");

impl FieldValue for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        value.as_u64().ok_or(ValueError::WrongType)
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::from(*self)
    }
}

impl FieldValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        value.as_f64().ok_or(ValueError::WrongType)
    }

    fn to_json(&self) -> JsonValue {
        serde_json::Number::from_f64(*self)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

impl FieldValue for DateTime<Utc> {
    const EXPECTED: &'static str = "an RFC 3339 timestamp";

    fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        let text = value.as_str().ok_or(ValueError::WrongType)?;
        DateTime::parse_from_rfc3339(text)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|err| ValueError::Invalid(err.to_string()))
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

/// Implement [`FieldValue`] for a protocol enumeration that derives
/// `strum::EnumString` and `strum::AsRefStr`.
#[macro_export]
macro_rules! text_enum_field {
    ($ty:ty, $expected:literal) => {
        impl $crate::fields::FieldValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_json(
                value: &$crate::fields::JsonValue,
            ) -> ::std::result::Result<Self, $crate::fields::ValueError> {
                let text = value
                    .as_str()
                    .ok_or($crate::fields::ValueError::WrongType)?;
                <$ty as ::std::str::FromStr>::from_str(text).map_err(|_| {
                    $crate::fields::ValueError::Invalid(format!("unknown value '{}'", text))
                })
            }

            fn to_json(&self) -> $crate::fields::JsonValue {
                $crate::fields::JsonValue::String(
                    <$ty as ::std::convert::AsRef<str>>::as_ref(self).to_owned(),
                )
            }
        }
    };
}

fn classify(field: &str, expected: &'static str, err: ValueError) -> FieldError {
    match err {
        ValueError::WrongType => FieldError::WrongType {
            field: field.to_owned(),
            expected,
        },
        ValueError::Invalid(reason) => FieldError::Invalid {
            field: field.to_owned(),
            reason,
        },
    }
}

fn present<'a>(obj: &'a JsonObject, name: &str) -> Option<&'a JsonValue> {
    obj.get(name).filter(|value| !value.is_null())
}

/// Extract a mandatory field using its [`FieldValue`] conversion.
pub fn mandatory<T: FieldValue>(obj: &JsonObject, name: &str) -> Result<T, FieldError> {
    mandatory_with(obj, name, T::EXPECTED, T::from_json)
}

/// Extract a mandatory field with a caller supplied parse function.
pub fn mandatory_with<T>(
    obj: &JsonObject,
    name: &str,
    expected: &'static str,
    parse: impl FnOnce(&JsonValue) -> Result<T, ValueError>,
) -> Result<T, FieldError> {
    let value = present(obj, name).ok_or_else(|| FieldError::Missing {
        field: name.to_owned(),
    })?;
    parse(value).map_err(|err| classify(name, expected, err))
}

/// Extract an optional field. Absence (or `null`) yields `None`; a malformed
/// value is still an error.
pub fn optional<T: FieldValue>(obj: &JsonObject, name: &str) -> Result<Option<T>, FieldError> {
    optional_with(obj, name, T::EXPECTED, T::from_json)
}

/// Extract an optional field with a caller supplied parse function.
pub fn optional_with<T>(
    obj: &JsonObject,
    name: &str,
    expected: &'static str,
    parse: impl FnOnce(&JsonValue) -> Result<T, ValueError>,
) -> Result<Option<T>, FieldError> {
    match present(obj, name) {
        None => Ok(None),
        Some(value) => parse(value)
            .map(Some)
            .map_err(|err| classify(name, expected, err)),
    }
}

/// Extract a repeated field element by element, preserving wire order.
///
/// Absence yields an empty vector. The first failing element aborts the
/// whole extraction.
pub fn set<T>(
    obj: &JsonObject,
    name: &str,
    mut parse_element: impl FnMut(&JsonValue) -> Result<T, String>,
) -> Result<Vec<T>, FieldError> {
    let Some(value) = present(obj, name) else {
        return Ok(Vec::new());
    };
    let elements = value.as_array().ok_or_else(|| FieldError::WrongType {
        field: name.to_owned(),
        expected: "an array",
    })?;
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            parse_element(element).map_err(|reason| FieldError::Element {
                field: name.to_owned(),
                index,
                reason,
            })
        })
        .collect()
}

/// Whether a field must be present on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Mandatory,
    Optional,
}

/// Static description of one wire field of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub presence: Presence,
    pub expected: &'static str,
}

/// Descriptor for a mandatory field of type `T`.
#[derive(Debug)]
pub struct Mandatory<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> Mandatory<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name,
            presence: Presence::Mandatory,
            expected: T::EXPECTED,
        }
    }

    pub fn read(&self, obj: &JsonObject) -> Result<T, FieldError> {
        mandatory(obj, self.name)
    }

    pub fn write(&self, obj: &mut JsonObject, value: &T) {
        obj.insert(self.name.to_owned(), value.to_json());
    }
}

/// Descriptor for an optional field of type `T`.
#[derive(Debug)]
pub struct Optional<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FieldValue> Optional<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name,
            presence: Presence::Optional,
            expected: T::EXPECTED,
        }
    }

    pub fn read(&self, obj: &JsonObject) -> Result<Option<T>, FieldError> {
        optional(obj, self.name)
    }

    /// Write the value, omitting the field entirely when absent.
    pub fn write(&self, obj: &mut JsonObject, value: Option<&T>) {
        if let Some(value) = value {
            obj.insert(self.name.to_owned(), value.to_json());
        }
    }
}

/// Feed `value` into `state` consistently with `JsonValue` equality: object
/// key order is ignored and `0.0` hashes like `-0.0`.
pub fn hash_json<H: Hasher>(value: &JsonValue, state: &mut H) {
    match value {
        JsonValue::Null => 0u8.hash(state),
        JsonValue::Bool(flag) => {
            1u8.hash(state);
            flag.hash(state);
        }
        JsonValue::Number(number) => {
            2u8.hash(state);
            hash_number(number, state);
        }
        JsonValue::String(text) => {
            3u8.hash(state);
            text.hash(state);
        }
        JsonValue::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_json(item, state);
            }
        }
        JsonValue::Object(obj) => {
            5u8.hash(state);
            hash_object(obj, state);
        }
    }
}

/// [`hash_json`] for a bare object.
pub fn hash_object<H: Hasher>(obj: &JsonObject, state: &mut H) {
    let mut entries: Vec<(&String, &JsonValue)> = obj.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.len().hash(state);
    for (key, value) in entries {
        key.hash(state);
        hash_json(value, state);
    }
}

fn hash_number<H: Hasher>(number: &Number, state: &mut H) {
    if let Some(unsigned) = number.as_u64() {
        0u8.hash(state);
        unsigned.hash(state);
    } else if let Some(signed) = number.as_i64() {
        1u8.hash(state);
        signed.hash(state);
    } else {
        let float = number.as_f64().unwrap_or_default();
        let float = if float == 0.0 { 0.0 } else { float };
        2u8.hash(state);
        float.to_bits().hash(state);
    }
}
