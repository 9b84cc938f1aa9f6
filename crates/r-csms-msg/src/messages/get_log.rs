//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! `GetLog`: the CSMS asks a charge point to upload a log file.

use std::fmt;

use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};

use crate::fields::{
    FieldDescriptor, FieldError, FieldValue, JsonObject, JsonValue, Mandatory, Optional,
    ValueError,
};
use crate::request::RequestPayload;
use crate::response::ResponsePayload;
use crate::text_enum_field;

/// Documented upper bound for [`GetLogResponse::filename`]. Not enforced when
/// parsing.
pub const MAX_FILENAME_LEN: usize = 255;

/// Kind of log the charge point should upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
pub enum LogType {
    DiagnosticsLog,
    SecurityLog,
    DataCollectorLog,
}

text_enum_field!(LogType, "a log type");

/// Whether the charge point will upload the requested log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
pub enum LogStatus {
    Accepted,
    Rejected,
    /// Accepted; an upload already in progress was cancelled.
    AcceptedCanceled,
}

text_enum_field!(LogStatus, "a log status");

const REMOTE_LOCATION: Mandatory<String> = Mandatory::new("remoteLocation");
const OLDEST_TIMESTAMP: Optional<DateTime<Utc>> = Optional::new("oldestTimestamp");
const LATEST_TIMESTAMP: Optional<DateTime<Utc>> = Optional::new("latestTimestamp");

/// Where to upload the log and which time window it should cover.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogParameters {
    pub remote_location: String,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub latest_timestamp: Option<DateTime<Utc>>,
}

impl LogParameters {
    pub fn new(remote_location: impl Into<String>) -> Self {
        Self {
            remote_location: remote_location.into(),
            oldest_timestamp: None,
            latest_timestamp: None,
        }
    }

    pub fn with_window(
        mut self,
        oldest: Option<DateTime<Utc>>,
        latest: Option<DateTime<Utc>>,
    ) -> Self {
        self.oldest_timestamp = oldest;
        self.latest_timestamp = latest;
        self
    }
}

impl FieldValue for LogParameters {
    const EXPECTED: &'static str = "a log parameters object";

    fn from_json(value: &JsonValue) -> Result<Self, ValueError> {
        let obj = value.as_object().ok_or(ValueError::WrongType)?;
        let read = || -> Result<Self, FieldError> {
            Ok(Self {
                remote_location: REMOTE_LOCATION.read(obj)?,
                oldest_timestamp: OLDEST_TIMESTAMP.read(obj)?,
                latest_timestamp: LATEST_TIMESTAMP.read(obj)?,
            })
        };
        read().map_err(|err| ValueError::Invalid(err.to_string()))
    }

    fn to_json(&self) -> JsonValue {
        let mut obj = JsonObject::new();
        REMOTE_LOCATION.write(&mut obj, &self.remote_location);
        OLDEST_TIMESTAMP.write(&mut obj, self.oldest_timestamp.as_ref());
        LATEST_TIMESTAMP.write(&mut obj, self.latest_timestamp.as_ref());
        JsonValue::Object(obj)
    }
}

const LOG_TYPE: Mandatory<LogType> = Mandatory::new("logType");
const REQUEST_ID: Mandatory<i32> = Mandatory::new("requestId");
const LOG: Mandatory<LogParameters> = Mandatory::new("log");
const RETRIES: Optional<u32> = Optional::new("retries");
const RETRY_INTERVAL: Optional<u32> = Optional::new("retryInterval");

/// Request fields of `GetLog`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GetLogRequest {
    pub log_type: LogType,
    /// Correlates the later `LogStatusNotification` messages with this upload.
    pub request_id: i32,
    pub log: LogParameters,
    pub retries: Option<u32>,
    /// Seconds between upload attempts.
    pub retry_interval: Option<u32>,
}

impl GetLogRequest {
    pub fn new(log_type: LogType, request_id: i32, log: LogParameters) -> Self {
        Self {
            log_type,
            request_id,
            log,
            retries: None,
            retry_interval: None,
        }
    }

    pub fn with_retries(mut self, retries: u32, retry_interval: Option<u32>) -> Self {
        self.retries = Some(retries);
        self.retry_interval = retry_interval;
        self
    }
}

impl RequestPayload for GetLogRequest {
    const ACTION: &'static str = "GetLog";

    const FIELDS: &'static [FieldDescriptor] = &[
        LOG_TYPE.descriptor(),
        REQUEST_ID.descriptor(),
        LOG.descriptor(),
        RETRIES.descriptor(),
        RETRY_INTERVAL.descriptor(),
    ];

    fn read(obj: &JsonObject) -> Result<Self, FieldError> {
        Ok(Self {
            log_type: LOG_TYPE.read(obj)?,
            request_id: REQUEST_ID.read(obj)?,
            log: LOG.read(obj)?,
            retries: RETRIES.read(obj)?,
            retry_interval: RETRY_INTERVAL.read(obj)?,
        })
    }

    fn write(&self, obj: &mut JsonObject) {
        LOG_TYPE.write(obj, &self.log_type);
        REQUEST_ID.write(obj, &self.request_id);
        LOG.write(obj, &self.log);
        RETRIES.write(obj, self.retries.as_ref());
        RETRY_INTERVAL.write(obj, self.retry_interval.as_ref());
    }
}

impl fmt::Display for GetLogRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.log_type, self.request_id)
    }
}

const STATUS: Mandatory<LogStatus> = Mandatory::new("status");
const FILENAME: Optional<String> = Optional::new("filename");

/// Response fields of `GetLog`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GetLogResponse {
    pub status: LogStatus,
    /// Name of the file that will be uploaded; at most [`MAX_FILENAME_LEN`] characters.
    pub filename: Option<String>,
}

impl GetLogResponse {
    pub fn new(status: LogStatus, filename: Option<String>) -> Self {
        Self { status, filename }
    }

    /// Whether `filename` respects [`MAX_FILENAME_LEN`].
    pub fn filename_fits(&self) -> bool {
        self.filename
            .as_ref()
            .map_or(true, |name| name.chars().count() <= MAX_FILENAME_LEN)
    }
}

impl ResponsePayload for GetLogResponse {
    type Request = GetLogRequest;

    const FIELDS: &'static [FieldDescriptor] = &[STATUS.descriptor(), FILENAME.descriptor()];

    fn read(obj: &JsonObject) -> Result<Self, FieldError> {
        Ok(Self {
            status: STATUS.read(obj)?,
            filename: FILENAME.read(obj)?,
        })
    }

    fn write(&self, obj: &mut JsonObject) {
        STATUS.write(obj, &self.status);
        FILENAME.write(obj, self.filename.as_ref());
    }

    fn failure_default() -> Self {
        Self::new(LogStatus::Rejected, None)
    }
}

impl fmt::Display for GetLogResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.status, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Presence;
    use chrono::TimeZone;
    use serde_json::json;

    fn object(value: JsonValue) -> JsonObject {
        value.as_object().cloned().expect("object fixture")
    }

    #[test]
    fn request_fields_are_declared_in_wire_order() {
        let names: Vec<_> = GetLogRequest::FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            ["logType", "requestId", "log", "retries", "retryInterval"]
        );
        assert_eq!(GetLogRequest::FIELDS[2].presence, Presence::Mandatory);
        assert_eq!(GetLogRequest::FIELDS[3].presence, Presence::Optional);
    }

    #[test]
    fn request_reads_nested_log_parameters() {
        let obj = object(json!({
            "logType": "SecurityLog",
            "requestId": 17,
            "log": {
                "remoteLocation": "ftp://logs.example.net/cp-1",
                "oldestTimestamp": "2024-03-01T00:00:00Z"
            },
            "retries": 3
        }));
        let request = GetLogRequest::read(&obj).expect("valid request");
        assert_eq!(request.log_type, LogType::SecurityLog);
        assert_eq!(request.request_id, 17);
        assert_eq!(request.retries, Some(3));
        assert_eq!(request.retry_interval, None);
        assert_eq!(
            request.log.oldest_timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(request.to_string(), "SecurityLog (17)");
    }

    #[test]
    fn nested_failure_names_the_outer_field() {
        let obj = object(json!({
            "logType": "DiagnosticsLog",
            "requestId": 1,
            "log": {"oldestTimestamp": "2024-03-01T00:00:00Z"}
        }));
        let err = GetLogRequest::read(&obj).expect_err("remoteLocation missing");
        assert!(matches!(err, FieldError::Invalid { ref field, .. } if field == "log"));
        assert!(err.to_string().contains("remoteLocation"));
    }

    #[test]
    fn unknown_enum_value_is_invalid() {
        let obj = object(json!({"status": "Maybe"}));
        assert!(matches!(
            GetLogResponse::read(&obj),
            Err(FieldError::Invalid { .. })
        ));
    }

    #[test]
    fn response_omits_absent_filename() {
        let mut obj = JsonObject::new();
        GetLogResponse::new(LogStatus::AcceptedCanceled, None).write(&mut obj);
        assert_eq!(JsonValue::Object(obj), json!({"status": "AcceptedCanceled"}));
    }

    #[test]
    fn long_filenames_parse_but_do_not_fit() {
        let long = "x".repeat(MAX_FILENAME_LEN + 1);
        let obj = object(json!({"status": "Accepted", "filename": long}));
        let response = GetLogResponse::read(&obj).expect("length is not enforced");
        assert!(!response.filename_fits());
        assert!(GetLogResponse::failure_default().filename_fits());
        assert_eq!(GetLogResponse::failure_default().status, LogStatus::Rejected);
    }
}
