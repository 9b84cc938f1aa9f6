//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use tracing::debug;

use crate::identity::{IdentityHash, Role};
use crate::outcome::ResultCode;
use crate::request::{Request, RequestPayload};
use crate::response::{Response, ResponsePayload};
use crate::types::RequestId;

/// Direction of the message movement, used for consistent logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    /// Message encoded for a transport.
    Outbound,
    /// Message decoded from a transport.
    Inbound,
}

/// The fields of a message that go into its log line.
#[derive(Debug, Clone, Copy)]
pub struct MessageSummary<'a> {
    pub action: &'static str,
    pub role: Role,
    pub request_id: &'a RequestId,
    pub identity: IdentityHash,
    /// Absent for requests.
    pub result: Option<ResultCode>,
    pub signatures: usize,
}

impl<'a, P: RequestPayload> From<&'a Request<P>> for MessageSummary<'a> {
    fn from(request: &'a Request<P>) -> Self {
        Self {
            action: request.action(),
            role: Role::Request,
            request_id: request.request_id(),
            identity: request.identity(),
            result: None,
            signatures: request.signatures().len(),
        }
    }
}

impl<'a, P: ResponsePayload> From<&'a Response<P>> for MessageSummary<'a> {
    fn from(response: &'a Response<P>) -> Self {
        Self {
            action: response.action(),
            role: Role::Response,
            request_id: response.request().request_id(),
            identity: response.identity(),
            result: Some(response.result_code()),
            signatures: response.signatures().len(),
        }
    }
}

/// Emit a structured log entry for message activity.
pub fn log_message(direction: MessageDirection, summary: &MessageSummary<'_>) {
    debug!(
        action = summary.action,
        role = %summary.role,
        request_id = %summary.request_id,
        identity = %summary.identity,
        result = ?summary.result,
        signatures = summary.signatures,
        direction = ?direction,
        "messaging activity"
    );
}

/// Prometheus metric handles for message encoding and decoding.
#[derive(Debug, Clone)]
pub struct MessagingMetricsExporter {
    parsed: IntCounter,
    parse_failures: IntCounter,
    serialized: IntCounter,
    failure_responses: IntCounter,
    runtime: Histogram,
}

impl MessagingMetricsExporter {
    /// Register messaging metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let parsed = IntCounter::with_opts(Opts::new(
            "csms_messages_parsed_total",
            "Messages decoded from wire JSON",
        ))?;
        let parse_failures = IntCounter::with_opts(Opts::new(
            "csms_message_parse_failures_total",
            "Wire objects rejected while decoding",
        ))?;
        let serialized = IntCounter::with_opts(Opts::new(
            "csms_messages_serialized_total",
            "Messages encoded to wire JSON",
        ))?;
        let failure_responses = IntCounter::with_opts(Opts::new(
            "csms_failure_responses_total",
            "Responses encoded with a non-success outcome",
        ))?;
        let runtime = Histogram::with_opts(HistogramOpts::new(
            "csms_response_runtime_seconds",
            "Elapsed time between a request and its response",
        ))?;

        registry.register(Box::new(parsed.clone()))?;
        registry.register(Box::new(parse_failures.clone()))?;
        registry.register(Box::new(serialized.clone()))?;
        registry.register(Box::new(failure_responses.clone()))?;
        registry.register(Box::new(runtime.clone()))?;

        Ok(Self {
            parsed,
            parse_failures,
            serialized,
            failure_responses,
            runtime,
        })
    }

    pub fn observe_parsed(&self) {
        self.parsed.inc();
    }

    pub fn observe_parse_failure(&self) {
        self.parse_failures.inc();
    }

    pub fn observe_serialized(&self) {
        self.serialized.inc();
    }

    pub fn observe_failure_response(&self) {
        self.failure_responses.inc();
    }

    /// Record how long a response took to produce.
    pub fn observe_runtime(&self, duration: Duration) {
        self.runtime.observe(duration.as_secs_f64());
    }
}
