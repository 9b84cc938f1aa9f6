//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Concrete operations. Each one pairs a request payload with the response
//! payload that answers it.

pub mod get_log;
pub mod log_status_notification;

pub use get_log::{GetLogRequest, GetLogResponse, LogParameters, LogStatus, LogType};
pub use log_status_notification::{
    LogStatusNotificationRequest, LogStatusNotificationResponse, UploadLogStatus,
};
