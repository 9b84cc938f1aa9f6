//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Detachable signatures carried by any message.
//!
//! This layer parses and serializes signatures only; verification is done by
//! the security crate against [`crate::SignableMessage::canonical_bytes`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use indexmap::IndexSet;

use crate::custom_data::CustomData;
use crate::fields::{self, FieldError, JsonObject, JsonValue, Mandatory, Optional, ValueError};
use crate::hooks::CustomHooks;

/// Wire name of the signature array.
pub const SIGNATURES_FIELD: &str = "signatures";

const KEY_ID: Mandatory<String> = Mandatory::new("keyId");
const VALUE: &str = "value";
const SIGNING_METHOD: Optional<String> = Optional::new("signingMethod");
const ENCODING_METHOD: Optional<String> = Optional::new("encodingMethod");

/// A single signature over a message's canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    key_id: String,
    value: Vec<u8>,
    signing_method: Option<String>,
    encoding_method: Option<String>,
    custom_data: Option<CustomData>,
}

impl Signature {
    pub fn new(key_id: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: key_id.into(),
            value: value.into(),
            signing_method: None,
            encoding_method: None,
            custom_data: None,
        }
    }

    pub fn with_signing_method(mut self, method: impl Into<String>) -> Self {
        self.signing_method = Some(method.into());
        self
    }

    pub fn with_encoding_method(mut self, method: impl Into<String>) -> Self {
        self.encoding_method = Some(method.into());
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    /// Reference to the key that produced the signature.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Raw signature bytes (base64 on the wire).
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn signing_method(&self) -> Option<&str> {
        self.signing_method.as_deref()
    }

    pub fn encoding_method(&self) -> Option<&str> {
        self.encoding_method.as_deref()
    }

    pub fn custom_data(&self) -> Option<&CustomData> {
        self.custom_data.as_ref()
    }

    /// Parse one signature object, then apply the registered `Signature` hook.
    pub fn try_parse(obj: &JsonObject, hooks: &CustomHooks) -> Result<Self, FieldError> {
        let key_id = KEY_ID.read(obj)?;
        let value = fields::mandatory_with(obj, VALUE, "a base64 string", |value| {
            let text = value.as_str().ok_or(ValueError::WrongType)?;
            BASE64
                .decode(text.trim())
                .map_err(|err| ValueError::Invalid(err.to_string()))
        })?;
        let signing_method = SIGNING_METHOD.read(obj)?;
        let encoding_method = ENCODING_METHOD.read(obj)?;
        let custom_data = CustomData::read_optional(obj, hooks)?;
        Ok(hooks.parse(
            obj,
            Self {
                key_id,
                value,
                signing_method,
                encoding_method,
                custom_data,
            },
        ))
    }

    pub fn to_json(&self, hooks: &CustomHooks) -> JsonValue {
        let mut obj = JsonObject::new();
        KEY_ID.write(&mut obj, &self.key_id);
        obj.insert(VALUE.to_owned(), JsonValue::String(BASE64.encode(&self.value)));
        SIGNING_METHOD.write(&mut obj, self.signing_method.as_ref());
        ENCODING_METHOD.write(&mut obj, self.encoding_method.as_ref());
        CustomData::write_optional(self.custom_data.as_ref(), &mut obj, hooks);
        JsonValue::Object(hooks.serialize(self, obj))
    }
}

/// Signatures attached to a message: unique by value, insertion ordered.
///
/// Equality ignores order; serialization keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet(IndexSet<Signature>);

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signature; returns `false` if an identical one was already present.
    pub fn insert(&mut self, signature: Signature) -> bool {
        self.0.insert(signature)
    }

    pub fn contains(&self, signature: &Signature) -> bool {
        self.0.contains(signature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.0.iter()
    }

    /// Read the `signatures` member. Absence yields an empty set; any failing
    /// element aborts with that element's error.
    pub fn read(obj: &JsonObject, hooks: &CustomHooks) -> Result<Self, FieldError> {
        let signatures = fields::set(obj, SIGNATURES_FIELD, |element| {
            let nested = element
                .as_object()
                .ok_or_else(|| "expected a signature object".to_string())?;
            Signature::try_parse(nested, hooks).map_err(|err| err.to_string())
        })?;
        Ok(signatures.into_iter().collect())
    }

    /// Write the `signatures` member; omitted entirely when empty.
    pub fn write(&self, obj: &mut JsonObject, hooks: &CustomHooks) {
        if self.is_empty() {
            return;
        }
        let array = self.iter().map(|signature| signature.to_json(hooks)).collect();
        obj.insert(SIGNATURES_FIELD.to_owned(), JsonValue::Array(array));
    }
}

impl FromIterator<Signature> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SignatureSet {
    type Item = &'a Signature;
    type IntoIter = indexmap::set::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
