//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Responses correlated to the request that caused them, including the
//! failure factories used when no operation handler produced a payload.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::custom_data::CustomData;
use crate::envelope::{Envelope, SignableMessage};
use crate::fields::{FieldDescriptor, FieldError, JsonObject, JsonValue};
use crate::hooks::CustomHooks;
use crate::identity::{IdentityHash, Role};
use crate::outcome::{Outcome, ResultCode};
use crate::request::{Request, RequestPayload};
use crate::signature::{Signature, SignatureSet};
use crate::types::{NetworkPath, NodeId, Routing};
use crate::{MessageError, Result};

/// Operation-specific fields of a response.
pub trait ResponsePayload:
    Clone + fmt::Debug + fmt::Display + Eq + Hash + Send + Sync + 'static
{
    /// Request payload this response answers.
    type Request: RequestPayload;

    /// Wire fields in parse order.
    const FIELDS: &'static [FieldDescriptor];

    fn read(obj: &JsonObject) -> std::result::Result<Self, FieldError>;

    fn write(&self, obj: &mut JsonObject);

    /// Payload carried by responses whose outcome is not a success.
    fn failure_default() -> Self;
}

/// An immutable response carrying payload `P`, tied to its request.
///
/// Equality and hashing cover the payload only; the correlated request and
/// the outcome do not take part.
#[derive(Debug, Clone)]
pub struct Response<P: ResponsePayload> {
    request: Arc<Request<P::Request>>,
    routing: Routing,
    timestamp: DateTime<Utc>,
    runtime: Option<Duration>,
    outcome: Outcome,
    signatures: SignatureSet,
    custom_data: Option<CustomData>,
    payload: P,
    identity: IdentityHash,
}

impl<P: ResponsePayload> Response<P> {
    fn build(
        request: Arc<Request<P::Request>>,
        routing: Routing,
        timestamp: DateTime<Utc>,
        outcome: Outcome,
        payload: P,
    ) -> Self {
        let identity = IdentityHash::compute(Role::Response, Self::action_name(), &payload);
        let runtime = (timestamp - request.timestamp()).to_std().ok();
        Self {
            request,
            routing,
            timestamp,
            runtime,
            outcome,
            signatures: SignatureSet::new(),
            custom_data: None,
            payload,
            identity,
        }
    }

    fn action_name() -> &'static str {
        <P::Request as RequestPayload>::ACTION
    }

    fn failure(request: Arc<Request<P::Request>>, outcome: Outcome) -> Self {
        let routing = request.routing().reply();
        Self::build(request, routing, Utc::now(), outcome, P::failure_default())
    }

    /// Successful response routed back to the request's source.
    ///
    /// Every factory routes with [`Routing::reply`]. A request without a
    /// recorded path only names the node it was sent to, so its responses
    /// are addressed there until [`Response::with_routing`] says otherwise.
    pub fn new(request: Arc<Request<P::Request>>, payload: P) -> Self {
        let routing = request.routing().reply();
        Self::build(request, routing, Utc::now(), Outcome::Success, payload)
    }

    /// The responder declined the request.
    ///
    /// `ResultCode::Ok` is not a failure code and is recorded as
    /// `ResultCode::Unknown`.
    pub fn rejected(
        request: Arc<Request<P::Request>>,
        code: ResultCode,
        description: Option<String>,
        details: Option<JsonValue>,
    ) -> Self {
        let code = if code == ResultCode::Ok {
            tracing::warn!(
                action = Self::action_name(),
                request_id = %request.request_id(),
                "failure response built with code Ok; recording Unknown"
            );
            ResultCode::Unknown
        } else {
            code
        };
        Self::failure(
            request,
            Outcome::Rejected {
                code,
                description,
                details,
            },
        )
    }

    /// The request could not be delivered or answered (routing, timeout,
    /// network). Carries the transport's code unchanged.
    pub fn request_error(
        request: Arc<Request<P::Request>>,
        code: ResultCode,
        description: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self::rejected(request, code, Some(description.into()), details)
    }

    pub fn formation_violation(
        request: Arc<Request<P::Request>>,
        description: impl Into<String>,
    ) -> Self {
        Self::failure(
            request,
            Outcome::FormationViolation {
                description: description.into(),
            },
        )
    }

    pub fn signature_error(
        request: Arc<Request<P::Request>>,
        description: impl Into<String>,
    ) -> Self {
        Self::failure(
            request,
            Outcome::SignatureError {
                description: description.into(),
            },
        )
    }

    /// Generic responder-side failure.
    pub fn failed(request: Arc<Request<P::Request>>, description: Option<String>) -> Self {
        Self::failure(request, Outcome::ServerError { description })
    }

    /// Failure reported by the peer in a call-error object.
    pub fn from_call_error(request: Arc<Request<P::Request>>, error: &JsonValue) -> Self {
        Self::failure(request, Outcome::from_json(error))
    }

    /// Fault caught while producing a response; the error's source chain is
    /// rendered into the description.
    pub fn exception_occurred(
        request: Arc<Request<P::Request>>,
        error: &(dyn StdError + 'static),
    ) -> Self {
        Self::failure(
            request,
            Outcome::Exception {
                description: render_chain(error),
            },
        )
    }

    /// Run a handler and turn an error or a panic into an `Exception`
    /// response. Never propagates either.
    pub fn produce<F>(request: Arc<Request<P::Request>>, handler: F) -> Self
    where
        F: FnOnce(&Request<P::Request>) -> anyhow::Result<P>,
    {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&request)));
        match outcome {
            Ok(Ok(payload)) => Self::new(request, payload),
            Ok(Err(err)) => {
                tracing::warn!(
                    action = Self::action_name(),
                    request_id = %request.request_id(),
                    error = %err,
                    "response handler failed"
                );
                Self::exception_occurred(request, &*err)
            }
            Err(panic) => {
                let description = panic_message(panic.as_ref());
                tracing::error!(
                    action = Self::action_name(),
                    request_id = %request.request_id(),
                    %description,
                    "response handler panicked"
                );
                Self::failure(request, Outcome::Exception { description })
            }
        }
    }

    /// Address the response explicitly, replacing the routing derived from
    /// the request.
    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
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

    pub fn action(&self) -> &'static str {
        Self::action_name()
    }

    pub fn request(&self) -> &Arc<Request<P::Request>> {
        &self.request
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

    /// Time between the request and this response, when the clocks agree.
    pub fn runtime(&self) -> Option<Duration> {
        self.runtime
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn result_code(&self) -> ResultCode {
        self.outcome.code()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    pub fn custom_data(&self) -> Option<&CustomData> {
        self.custom_data.as_ref()
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn identity(&self) -> IdentityHash {
        self.identity
    }

    /// Parse a response object for `request`. The outcome of a parsed
    /// response is always `Success`; failures travel as call errors and are
    /// built with the factories above.
    pub fn try_parse(
        request: Arc<Request<P::Request>>,
        json: &JsonValue,
        routing: Routing,
        timestamp: Option<DateTime<Utc>>,
        hooks: &CustomHooks,
    ) -> Result<Self> {
        let action = Self::action_name();
        let invalid = |source| MessageError::Invalid {
            action,
            role: Role::Response,
            source,
        };
        let obj = json.as_object().ok_or(MessageError::NotAnObject {
            action,
            role: Role::Response,
        })?;
        let payload = P::read(obj).map_err(invalid)?;
        let envelope = Envelope::read(obj, hooks).map_err(invalid)?;
        let response = Self::build(
            request,
            routing,
            timestamp.unwrap_or_else(Utc::now),
            Outcome::Success,
            payload,
        )
        .with_signatures(envelope.signatures)
        .with_custom_data(envelope.custom_data);
        Ok(hooks.parse(obj, response))
    }

    /// Fail-fast variant of [`Response::try_parse`].
    pub fn parse(
        request: Arc<Request<P::Request>>,
        json: &JsonValue,
        routing: Routing,
        timestamp: Option<DateTime<Utc>>,
        hooks: &CustomHooks,
    ) -> anyhow::Result<Self> {
        let request_id = request.request_id().clone();
        Self::try_parse(request, json, routing, timestamp, hooks).with_context(|| {
            format!(
                "unable to parse {} response to request {}",
                Self::action_name(),
                request_id
            )
        })
    }

    pub fn to_json(&self, hooks: &CustomHooks) -> JsonValue {
        let mut obj = JsonObject::new();
        self.payload.write(&mut obj);
        Envelope::write(&self.signatures, self.custom_data.as_ref(), &mut obj, hooks);
        JsonValue::Object(hooks.serialize(self, obj))
    }
}

fn render_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        format!("panic: {}", text)
    } else if let Some(text) = panic.downcast_ref::<String>() {
        format!("panic: {}", text)
    } else {
        "panic with non-text payload".to_owned()
    }
}

impl<P: ResponsePayload> PartialEq for Response<P> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl<P: ResponsePayload> Eq for Response<P> {}

impl<P: ResponsePayload> Hash for Response<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl<P: ResponsePayload> fmt::Display for Response<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.payload, f)
    }
}

impl<P: ResponsePayload> SignableMessage for Response<P> {
    fn action(&self) -> &'static str {
        Self::action_name()
    }

    fn role(&self) -> Role {
        Role::Response
    }

    fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    fn wire_object(&self, hooks: &CustomHooks) -> JsonValue {
        self.to_json(hooks)
    }
}
