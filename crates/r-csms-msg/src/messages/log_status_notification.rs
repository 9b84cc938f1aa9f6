//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! `LogStatusNotification`: a charge point reports progress of a log upload.

use std::fmt;

use strum::{AsRefStr, Display, EnumString};

use crate::fields::{FieldDescriptor, FieldError, JsonObject, Mandatory, Optional};
use crate::request::RequestPayload;
use crate::response::ResponsePayload;
use crate::text_enum_field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
pub enum UploadLogStatus {
    BadMessage,
    Idle,
    NotSupportedOperation,
    PermissionDenied,
    Uploaded,
    UploadFailure,
    Uploading,
    AcceptedCanceled,
}

text_enum_field!(UploadLogStatus, "an upload log status");

const STATUS: Mandatory<UploadLogStatus> = Mandatory::new("status");
const REQUEST_ID: Optional<i32> = Optional::new("requestId");

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogStatusNotificationRequest {
    pub status: UploadLogStatus,
    /// The `GetLog` request id this notification reports on. Absent when idle.
    pub request_id: Option<i32>,
}

impl LogStatusNotificationRequest {
    pub fn new(status: UploadLogStatus, request_id: Option<i32>) -> Self {
        Self { status, request_id }
    }
}

impl RequestPayload for LogStatusNotificationRequest {
    const ACTION: &'static str = "LogStatusNotification";

    const FIELDS: &'static [FieldDescriptor] = &[STATUS.descriptor(), REQUEST_ID.descriptor()];

    fn read(obj: &JsonObject) -> Result<Self, FieldError> {
        Ok(Self {
            status: STATUS.read(obj)?,
            request_id: REQUEST_ID.read(obj)?,
        })
    }

    fn write(&self, obj: &mut JsonObject) {
        STATUS.write(obj, &self.status);
        REQUEST_ID.write(obj, self.request_id.as_ref());
    }
}

impl fmt::Display for LogStatusNotificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.request_id {
            Some(request_id) => write!(f, "{} ({})", self.status, request_id),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Acknowledgement with no operation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LogStatusNotificationResponse;

impl ResponsePayload for LogStatusNotificationResponse {
    type Request = LogStatusNotificationRequest;

    const FIELDS: &'static [FieldDescriptor] = &[];

    fn read(_obj: &JsonObject) -> Result<Self, FieldError> {
        Ok(Self)
    }

    fn write(&self, _obj: &mut JsonObject) {}

    fn failure_default() -> Self {
        Self
    }
}

impl fmt::Display for LogStatusNotificationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogStatusNotificationResponse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::JsonValue;
    use serde_json::json;

    fn object(value: JsonValue) -> JsonObject {
        value.as_object().cloned().expect("object fixture")
    }

    #[test]
    fn text_projection_includes_request_id_when_present() {
        let with_id = LogStatusNotificationRequest::new(UploadLogStatus::Uploading, Some(7));
        assert_eq!(with_id.to_string(), "Uploading (7)");
        let idle = LogStatusNotificationRequest::new(UploadLogStatus::Idle, None);
        assert_eq!(idle.to_string(), "Idle");
    }

    #[test]
    fn status_is_mandatory() {
        let obj = object(json!({"requestId": 42}));
        assert_eq!(
            LogStatusNotificationRequest::read(&obj),
            Err(FieldError::Missing {
                field: "status".into()
            })
        );
    }

    #[test]
    fn mistyped_request_id_is_rejected() {
        let obj = object(json!({"status": "Uploaded", "requestId": "42"}));
        assert!(matches!(
            LogStatusNotificationRequest::read(&obj),
            Err(FieldError::WrongType { ref field, .. }) if field == "requestId"
        ));
    }

    #[test]
    fn response_ignores_unknown_fields() {
        let obj = object(json!({"vendorNote": "ok"}));
        assert_eq!(
            LogStatusNotificationResponse::read(&obj),
            Ok(LogStatusNotificationResponse)
        );
        assert_eq!(
            LogStatusNotificationResponse.to_string(),
            "LogStatusNotificationResponse"
        );
    }
}
