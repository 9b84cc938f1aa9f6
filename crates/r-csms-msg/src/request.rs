//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::custom_data::CustomData;
use crate::envelope::{Envelope, SignableMessage};
use crate::fields::{FieldDescriptor, FieldError, JsonObject, JsonValue};
use crate::hooks::CustomHooks;
use crate::identity::{IdentityHash, Role};
use crate::signature::{Signature, SignatureSet};
use crate::types::{
    CancellationToken, EventTrackingId, NetworkPath, NodeId, RequestHeader, RequestId, Routing,
    DEFAULT_REQUEST_TIMEOUT,
};
use crate::{MessageError, Result};

/// Operation-specific fields of a request.
pub trait RequestPayload:
    Clone + fmt::Debug + fmt::Display + Eq + Hash + Send + Sync + 'static
{
    /// Operation name on the wire, e.g. `"GetLog"`.
    const ACTION: &'static str;

    /// Wire fields in parse order.
    const FIELDS: &'static [FieldDescriptor];

    /// Read the operation fields from the message object.
    fn read(obj: &JsonObject) -> std::result::Result<Self, FieldError>;

    /// Write the operation fields into the message object.
    fn write(&self, obj: &mut JsonObject);
}

/// An immutable, correlated request carrying payload `P`.
///
/// Equality and hashing cover the payload only (see [`IdentityHash`]).
#[derive(Debug, Clone)]
pub struct Request<P: RequestPayload> {
    request_id: RequestId,
    routing: Routing,
    timestamp: DateTime<Utc>,
    timeout: Duration,
    event_tracking_id: EventTrackingId,
    signatures: SignatureSet,
    custom_data: Option<CustomData>,
    cancellation: Option<CancellationToken>,
    payload: P,
    identity: IdentityHash,
}

impl<P: RequestPayload> Request<P> {
    /// Build a request with a fresh id, no hops, the current time, and the
    /// default timeout.
    pub fn new(destination: NodeId, payload: P) -> Self {
        Self::from_header(RequestHeader::new(RequestId::new(), Routing::to(destination)), payload)
    }

    /// Build a request from transport metadata, filling defaults for absent values.
    pub fn from_header(header: RequestHeader, payload: P) -> Self {
        let identity = IdentityHash::compute(Role::Request, P::ACTION, &payload);
        Self {
            request_id: header.request_id,
            routing: header.routing,
            timestamp: header.timestamp.unwrap_or_else(Utc::now),
            timeout: header.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            event_tracking_id: header.event_tracking_id.unwrap_or_default(),
            signatures: SignatureSet::new(),
            custom_data: None,
            cancellation: header.cancellation,
            payload,
            identity,
        }
    }

    pub fn with_signatures(mut self, signatures: SignatureSet) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.insert(signature);
        self
    }

    pub fn with_custom_data(mut self, custom_data: Option<CustomData>) -> Self {
        self.custom_data = custom_data;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn action(&self) -> &'static str {
        P::ACTION
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    pub fn destination(&self) -> &NodeId {
        &self.routing.destination
    }

    pub fn network_path(&self) -> &NetworkPath {
        &self.routing.network_path
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn event_tracking_id(&self) -> EventTrackingId {
        self.event_tracking_id
    }

    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    pub fn custom_data(&self) -> Option<&CustomData> {
        self.custom_data.as_ref()
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn identity(&self) -> IdentityHash {
        self.identity
    }

    /// Parse a request object: operation fields, signatures, custom data, then
    /// the registered `Request<P>` hook. Fails atomically.
    pub fn try_parse(json: &JsonValue, header: RequestHeader, hooks: &CustomHooks) -> Result<Self> {
        let invalid = |source| MessageError::Invalid {
            action: P::ACTION,
            role: Role::Request,
            source,
        };
        let obj = json.as_object().ok_or(MessageError::NotAnObject {
            action: P::ACTION,
            role: Role::Request,
        })?;
        let payload = P::read(obj).map_err(invalid)?;
        let envelope = Envelope::read(obj, hooks).map_err(invalid)?;
        let request = Self::from_header(header, payload)
            .with_signatures(envelope.signatures)
            .with_custom_data(envelope.custom_data);
        Ok(hooks.parse(obj, request))
    }

    /// Fail-fast variant of [`Request::try_parse`] for call sites that treat
    /// malformed input as fatal.
    pub fn parse(
        json: &JsonValue,
        header: RequestHeader,
        hooks: &CustomHooks,
    ) -> anyhow::Result<Self> {
        let request_id = header.request_id.clone();
        Self::try_parse(json, header, hooks)
            .with_context(|| format!("unable to parse {} request {}", P::ACTION, request_id))
    }

    /// Serialize: operation fields, signatures (omitted when empty), custom
    /// data, then the registered `Request<P>` hook.
    pub fn to_json(&self, hooks: &CustomHooks) -> JsonValue {
        let mut obj = JsonObject::new();
        self.payload.write(&mut obj);
        Envelope::write(&self.signatures, self.custom_data.as_ref(), &mut obj, hooks);
        JsonValue::Object(hooks.serialize(self, obj))
    }
}

impl<P: RequestPayload> PartialEq for Request<P> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl<P: RequestPayload> Eq for Request<P> {}

impl<P: RequestPayload> Hash for Request<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl<P: RequestPayload> fmt::Display for Request<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.payload, f)
    }
}

impl<P: RequestPayload> SignableMessage for Request<P> {
    fn action(&self) -> &'static str {
        P::ACTION
    }

    fn role(&self) -> Role {
        Role::Request
    }

    fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    fn wire_object(&self, hooks: &CustomHooks) -> JsonValue {
        self.to_json(hooks)
    }
}
