//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Vendor extension hooks applied after the core parse/serialize steps.
//!
//! A [`CustomHooks`] value is assembled once at the transport boundary and then
//! shared read-only. Hooks are keyed by the Rust type they transform, so the
//! same registry serves requests, responses, signatures, and custom data.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::fields::JsonObject;

type ParserFn<T> = dyn Fn(&JsonObject, T) -> T + Send + Sync;
type SerializerFn<T> = dyn Fn(&T, JsonObject) -> JsonObject + Send + Sync;

/// Registry of per-type parse and serialize overrides.
#[derive(Default)]
pub struct CustomHooks {
    parsers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    serializers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl CustomHooks {
    /// Empty registry; every hook is the identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the parse hook for `T`, replacing any earlier one.
    ///
    /// The hook receives the raw JSON object and the fully parsed value; its
    /// return value replaces the parsed value.
    pub fn with_parser<T: 'static>(
        mut self,
        hook: impl Fn(&JsonObject, T) -> T + Send + Sync + 'static,
    ) -> Self {
        let hook: Box<ParserFn<T>> = Box::new(hook);
        self.parsers.insert(TypeId::of::<T>(), Box::new(hook));
        self
    }

    /// Register the serialize hook for `T`, replacing any earlier one.
    ///
    /// The hook receives the value and the JSON object built by the core; its
    /// return value is what goes on the wire.
    pub fn with_serializer<T: 'static>(
        mut self,
        hook: impl Fn(&T, JsonObject) -> JsonObject + Send + Sync + 'static,
    ) -> Self {
        let hook: Box<SerializerFn<T>> = Box::new(hook);
        self.serializers.insert(TypeId::of::<T>(), Box::new(hook));
        self
    }

    pub fn has_parser<T: 'static>(&self) -> bool {
        self.parsers.contains_key(&TypeId::of::<T>())
    }

    pub fn has_serializer<T: 'static>(&self) -> bool {
        self.serializers.contains_key(&TypeId::of::<T>())
    }

    /// Run the parse hook for `T`, if any.
    pub fn parse<T: 'static>(&self, raw: &JsonObject, value: T) -> T {
        match self
            .parsers
            .get(&TypeId::of::<T>())
            .and_then(|hook| hook.downcast_ref::<Box<ParserFn<T>>>())
        {
            Some(hook) => hook(raw, value),
            None => value,
        }
    }

    /// Run the serialize hook for `T`, if any.
    pub fn serialize<T: 'static>(&self, value: &T, json: JsonObject) -> JsonObject {
        match self
            .serializers
            .get(&TypeId::of::<T>())
            .and_then(|hook| hook.downcast_ref::<Box<SerializerFn<T>>>())
        {
            Some(hook) => hook(value, json),
            None => json,
        }
    }
}

impl fmt::Debug for CustomHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHooks")
            .field("parsers", &self.parsers.len())
            .field("serializers", &self.serializers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Probe(u32);

    #[test]
    fn missing_hooks_are_identity() {
        let hooks = CustomHooks::new();
        let raw = JsonObject::new();
        assert_eq!(hooks.parse(&raw, Probe(1)), Probe(1));
        assert!(hooks.serialize(&Probe(1), raw).is_empty());
    }

    #[test]
    fn hooks_are_keyed_by_type() {
        let hooks = CustomHooks::new()
            .with_parser(|raw: &JsonObject, probe: Probe| {
                Probe(probe.0 + raw.len() as u32)
            })
            .with_serializer(|probe: &Probe, mut json: JsonObject| {
                json.insert("probe".into(), json!(probe.0));
                json
            });

        let raw = json!({"a": 1, "b": 2}).as_object().cloned().unwrap();
        assert_eq!(hooks.parse(&raw, Probe(1)), Probe(3));
        assert_eq!(hooks.parse(&raw, 7u32), 7);
        assert!(hooks.has_parser::<Probe>());
        assert!(!hooks.has_serializer::<u32>());

        let out = hooks.serialize(&Probe(9), JsonObject::new());
        assert_eq!(out.get("probe"), Some(&json!(9)));
    }
}
