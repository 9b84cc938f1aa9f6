//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Request/response contracts exchanged between the CSMS and charge points.
//!
//! Every operation is a typed request payload plus a typed response payload.
//! [`Request`] and [`Response`] wrap them with the shared envelope (routing,
//! timestamps, signatures, vendor `customData`) and round-trip losslessly to
//! the wire JSON object.

pub mod codec;
pub mod custom_data;
pub mod envelope;
pub mod fields;
pub mod hooks;
pub mod identity;
pub mod logging;
pub mod messages;
pub mod outcome;
pub mod request;
pub mod response;
pub mod signature;
pub mod types;

use fields::FieldError;
use identity::Role;

/// Shared result type for message parsing.
pub type Result<T> = std::result::Result<T, MessageError>;

/// Reasons a wire object could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// The JSON value was not an object.
    #[error("invalid {action} {role}: expected a JSON object")]
    NotAnObject { action: &'static str, role: Role },
    /// A field (operation, signature, or custom data) failed to parse.
    #[error("invalid {action} {role}: {source}")]
    Invalid {
        action: &'static str,
        role: Role,
        #[source]
        source: FieldError,
    },
    /// The message travelled through more nodes than configured.
    #[error("{action} message crossed {hops} nodes, limit is {max}")]
    NetworkPathTooLong {
        action: &'static str,
        hops: usize,
        max: usize,
    },
}

pub use codec::MessageCodec;
pub use custom_data::CustomData;
pub use envelope::SignableMessage;
pub use fields::{JsonObject, JsonValue};
pub use hooks::CustomHooks;
pub use identity::IdentityHash;
pub use logging::{log_message, MessageDirection, MessageSummary, MessagingMetricsExporter};
pub use outcome::{Outcome, ResultCode};
pub use request::{Request, RequestPayload};
pub use response::{Response, ResponsePayload};
pub use signature::{Signature, SignatureSet};
pub use types::{
    CancellationToken, EventTrackingId, NetworkPath, NodeId, RequestHeader, RequestId, Routing,
};
