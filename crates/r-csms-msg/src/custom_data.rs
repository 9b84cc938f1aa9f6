//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::hash::{Hash, Hasher};

use crate::fields::{self, FieldError, JsonObject, JsonValue, Mandatory, ValueError};
use crate::hooks::CustomHooks;

/// Wire name of the vendor extension object.
pub const CUSTOM_DATA_FIELD: &str = "customData";

const VENDOR_ID: Mandatory<String> = Mandatory::new("vendorId");

/// Vendor-namespaced extension object. The core only preserves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomData {
    vendor_id: String,
    properties: JsonObject,
}

impl CustomData {
    pub fn new(vendor_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            properties: JsonObject::new(),
        }
    }

    /// Attach a vendor property. `vendorId` itself cannot be overridden.
    pub fn with_property(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        let key = key.into();
        if key != VENDOR_ID.name() {
            self.properties.insert(key, value);
        }
        self
    }

    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    pub fn properties(&self) -> &JsonObject {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Parse a custom data object, then apply the registered `CustomData` hook.
    pub fn try_parse(obj: &JsonObject, hooks: &CustomHooks) -> Result<Self, FieldError> {
        let vendor_id = VENDOR_ID.read(obj)?;
        let properties = obj
            .iter()
            .filter(|(key, _)| key.as_str() != VENDOR_ID.name())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(hooks.parse(
            obj,
            Self {
                vendor_id,
                properties,
            },
        ))
    }

    pub fn to_json(&self, hooks: &CustomHooks) -> JsonValue {
        let mut obj = self.properties.clone();
        VENDOR_ID.write(&mut obj, &self.vendor_id);
        JsonValue::Object(hooks.serialize(self, obj))
    }

    /// Read the optional `customData` member of a message or signature.
    pub fn read_optional(obj: &JsonObject, hooks: &CustomHooks) -> Result<Option<Self>, FieldError> {
        fields::optional_with(obj, CUSTOM_DATA_FIELD, "a custom data object", |value| {
            let nested = value.as_object().ok_or(ValueError::WrongType)?;
            Self::try_parse(nested, hooks).map_err(|err| ValueError::Invalid(err.to_string()))
        })
    }

    /// Write the `customData` member when present.
    pub fn write_optional(custom_data: Option<&Self>, obj: &mut JsonObject, hooks: &CustomHooks) {
        if let Some(custom_data) = custom_data {
            obj.insert(CUSTOM_DATA_FIELD.to_owned(), custom_data.to_json(hooks));
        }
    }
}

impl Hash for CustomData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vendor_id.hash(state);
        fields::hash_object(&self.properties, state);
    }
}
