//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Envelope members shared by every request and response.

use crate::custom_data::CustomData;
use crate::fields::{FieldError, JsonObject, JsonValue};
use crate::hooks::CustomHooks;
use crate::identity::Role;
use crate::signature::{SignatureSet, SIGNATURES_FIELD};

/// Signatures and custom data read from a message object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub signatures: SignatureSet,
    pub custom_data: Option<CustomData>,
}

impl Envelope {
    /// Read signatures, then custom data.
    pub fn read(obj: &JsonObject, hooks: &CustomHooks) -> Result<Self, FieldError> {
        let signatures = SignatureSet::read(obj, hooks)?;
        let custom_data = CustomData::read_optional(obj, hooks)?;
        Ok(Self {
            signatures,
            custom_data,
        })
    }

    /// Append signatures and custom data to an object already holding the payload.
    pub fn write(
        signatures: &SignatureSet,
        custom_data: Option<&CustomData>,
        obj: &mut JsonObject,
        hooks: &CustomHooks,
    ) {
        signatures.write(obj, hooks);
        CustomData::write_optional(custom_data, obj, hooks);
    }
}

/// A message whose canonical form can be signed and verified.
///
/// The canonical form is the message's wire object with the `signatures`
/// member removed, rendered as compact JSON with keys in lexicographic order.
/// It therefore covers every operation field plus `customData`.
pub trait SignableMessage {
    /// Operation name, e.g. `"GetLog"`.
    fn action(&self) -> &'static str;

    /// Request or response.
    fn role(&self) -> Role;

    /// Signatures currently attached.
    fn signatures(&self) -> &SignatureSet;

    /// Wire object as produced for the transport.
    fn wire_object(&self, hooks: &CustomHooks) -> JsonValue;

    /// Bytes covered by a signature.
    fn canonical_bytes(&self, hooks: &CustomHooks) -> Vec<u8> {
        let mut wire = self.wire_object(hooks);
        if let Some(obj) = wire.as_object_mut() {
            obj.remove(SIGNATURES_FIELD);
        }
        canonicalize(&wire).to_string().into_bytes()
    }
}

/// Rebuild `value` with every object's keys inserted in lexicographic order.
fn canonicalize(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            let mut sorted = JsonObject::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&obj[key.as_str()]));
            }
            JsonValue::Object(sorted)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom_data::CustomData;
    use crate::signature::Signature;
    use serde_json::json;

    struct Fixture(JsonValue, SignatureSet);

    impl SignableMessage for Fixture {
        fn action(&self) -> &'static str {
            "Fixture"
        }

        fn role(&self) -> Role {
            Role::Request
        }

        fn signatures(&self) -> &SignatureSet {
            &self.1
        }

        fn wire_object(&self, _hooks: &CustomHooks) -> JsonValue {
            self.0.clone()
        }
    }

    #[test]
    fn canonical_form_drops_signatures_and_sorts_keys() {
        let message = Fixture(
            json!({
                "status": "Idle",
                "signatures": [{"keyId": "k", "value": "AA=="}],
                "customData": {"vendorId": "acme", "b": 2, "a": 1}
            }),
            SignatureSet::new(),
        );
        let canonical = String::from_utf8(message.canonical_bytes(&CustomHooks::new()))
            .expect("utf-8");
        assert_eq!(
            canonical,
            r#"{"customData":{"a":1,"b":2,"vendorId":"acme"},"status":"Idle"}"#
        );
    }

    #[test]
    fn envelope_reads_what_it_writes() {
        let hooks = CustomHooks::new();
        let signatures: SignatureSet = vec![Signature::new("k-1", vec![1, 2, 3])]
            .into_iter()
            .collect();
        let custom = CustomData::new("acme");
        let mut obj = JsonObject::new();
        Envelope::write(&signatures, Some(&custom), &mut obj, &hooks);
        let envelope = Envelope::read(&obj, &hooks).expect("envelope");
        assert_eq!(envelope.signatures, signatures);
        assert_eq!(envelope.custom_data, Some(custom));
    }
}
