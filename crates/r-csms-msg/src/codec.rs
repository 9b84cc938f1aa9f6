//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Boundary facade used by transports to move messages to and from JSON.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use r_csms_common::ProtocolConfig;
use tracing::warn;

use crate::fields::JsonValue;
use crate::hooks::CustomHooks;
use crate::identity::Role;
use crate::logging::{log_message, MessageDirection, MessageSummary, MessagingMetricsExporter};
use crate::request::{Request, RequestPayload};
use crate::response::{Response, ResponsePayload};
use crate::types::{NetworkPath, NodeId, RequestHeader, RequestId, Routing};
use crate::{MessageError, Result};

/// Shared codec holding the registered hooks and protocol settings.
///
/// Cheap to clone; every clone shares the same hook registry.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    hooks: Arc<CustomHooks>,
    protocol: ProtocolConfig,
    metrics: Option<MessagingMetricsExporter>,
}

impl MessageCodec {
    pub fn new(hooks: Arc<CustomHooks>, protocol: ProtocolConfig) -> Self {
        Self {
            hooks,
            protocol,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MessagingMetricsExporter) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn hooks(&self) -> &CustomHooks {
        &self.hooks
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub fn local_node(&self) -> NodeId {
        NodeId::new(self.protocol.local_node_id.clone())
    }

    /// Outbound request originating at this node, using the configured timeout.
    pub fn new_request<P: RequestPayload>(&self, destination: NodeId, payload: P) -> Request<P> {
        let routing = Routing::new(destination, NetworkPath::from_source(self.local_node()));
        let header = RequestHeader::new(RequestId::new(), routing)
            .with_timeout(self.protocol.default_request_timeout);
        Request::from_header(header, payload)
    }

    pub fn decode_request<P: RequestPayload>(
        &self,
        json: &JsonValue,
        mut header: RequestHeader,
    ) -> Result<Request<P>> {
        if header.timeout.is_none() {
            header.timeout = Some(self.protocol.default_request_timeout);
        }
        let decoded = self
            .check_path::<P>(&header.routing.network_path)
            .and_then(|()| Request::try_parse(json, header, &self.hooks));
        match &decoded {
            Ok(request) => self.record_decoded(MessageSummary::from(request)),
            Err(err) => self.record_rejected(P::ACTION, Role::Request, err),
        }
        decoded
    }

    pub fn decode_response<P: ResponsePayload>(
        &self,
        request: Arc<Request<P::Request>>,
        json: &JsonValue,
        routing: Routing,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Response<P>> {
        let decoded = self
            .check_path::<P::Request>(&routing.network_path)
            .and_then(|()| Response::try_parse(request, json, routing, timestamp, &self.hooks));
        let response = match decoded {
            Ok(response) => response,
            Err(err) => {
                self.record_rejected(<P::Request as RequestPayload>::ACTION, Role::Response, &err);
                return Err(err);
            }
        };
        self.record_decoded(MessageSummary::from(&response));
        if let (Some(metrics), Some(runtime)) = (&self.metrics, response.runtime()) {
            metrics.observe_runtime(runtime);
        }
        Ok(response)
    }

    pub fn encode_request<P: RequestPayload>(&self, request: &Request<P>) -> JsonValue {
        let json = request.to_json(&self.hooks);
        log_message(MessageDirection::Outbound, &MessageSummary::from(request));
        if let Some(metrics) = &self.metrics {
            metrics.observe_serialized();
        }
        json
    }

    /// Encode a response. Non-success outcomes are still encoded (with the
    /// failure payload) but are logged and counted separately.
    pub fn encode_response<P: ResponsePayload>(&self, response: &Response<P>) -> JsonValue {
        let json = response.to_json(&self.hooks);
        log_message(MessageDirection::Outbound, &MessageSummary::from(response));
        if !response.is_success() {
            warn!(
                action = response.action(),
                request_id = %response.request().request_id(),
                outcome = %response.outcome(),
                "encoding failure response"
            );
        }
        if let Some(metrics) = &self.metrics {
            metrics.observe_serialized();
            if !response.is_success() {
                metrics.observe_failure_response();
            }
        }
        json
    }

    fn check_path<P: RequestPayload>(&self, path: &NetworkPath) -> Result<()> {
        let max = self.protocol.max_network_path_len;
        if path.len() > max {
            return Err(MessageError::NetworkPathTooLong {
                action: P::ACTION,
                hops: path.len(),
                max,
            });
        }
        Ok(())
    }

    fn record_decoded(&self, summary: MessageSummary<'_>) {
        log_message(MessageDirection::Inbound, &summary);
        if let Some(metrics) = &self.metrics {
            metrics.observe_parsed();
        }
    }

    fn record_rejected(&self, action: &'static str, role: Role, err: &MessageError) {
        warn!(action, role = %role, error = %err, "rejected inbound message");
        if let Some(metrics) = &self.metrics {
            metrics.observe_parse_failure();
        }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(Arc::new(CustomHooks::new()), ProtocolConfig::default())
    }
}
