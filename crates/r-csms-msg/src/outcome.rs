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

use serde_json::json;
use strum::{AsRefStr, Display, EnumString};

use crate::fields::{JsonObject, JsonValue};

/// Machine-readable classification of a response outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
pub enum ResultCode {
    /// Operation completed; payload fields are meaningful.
    Ok,
    /// Operation executed but the responder declined.
    Rejected,
    /// The request was malformed.
    FormationViolation,
    /// A signature could not be verified.
    SignatureError,
    /// Responder-side failure unrelated to the request.
    Server,
    /// Unexpected fault while producing the response.
    Exception,
    /// The request could not be delivered over the network.
    NetworkError,
    /// No answer arrived before the request timeout.
    Timeout,
    /// No route to the destination node.
    RoutingError,
    /// Catch-all for codes this node does not recognise.
    Unknown,
}

impl ResultCode {
    /// Parse a code received from a peer. Text this node does not recognise
    /// becomes [`ResultCode::Unknown`].
    pub fn from_wire(text: &str) -> Self {
        text.parse().unwrap_or(ResultCode::Unknown)
    }

    /// Codes that mean the request never reached an operation-specific handler.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            ResultCode::NetworkError | ResultCode::Timeout | ResultCode::RoutingError
        )
    }
}

/// Terminal result attached to every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Operation-specific fields are meaningful.
    Success,
    /// Declined, or failed before reaching a handler, with an explicit code.
    Rejected {
        /// Reason code.
        code: ResultCode,
        /// Human-readable explanation.
        description: Option<String>,
        /// Opaque details blob, passed through untouched.
        details: Option<JsonValue>,
    },
    /// The request violated shape rules.
    FormationViolation {
        /// What was wrong with the request.
        description: String,
    },
    /// Signature verification failed.
    SignatureError {
        /// Which signature failed and why.
        description: String,
    },
    /// Internal failure at the responder.
    ServerError {
        /// Optional explanation.
        description: Option<String>,
    },
    /// A fault was caught while producing the response.
    Exception {
        /// Rendered error chain or panic message.
        description: String,
    },
}

impl Outcome {
    pub fn code(&self) -> ResultCode {
        match self {
            Outcome::Success => ResultCode::Ok,
            Outcome::Rejected { code, .. } => *code,
            Outcome::FormationViolation { .. } => ResultCode::FormationViolation,
            Outcome::SignatureError { .. } => ResultCode::SignatureError,
            Outcome::ServerError { .. } => ResultCode::Server,
            Outcome::Exception { .. } => ResultCode::Exception,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Rejected { description, .. } | Outcome::ServerError { description } => {
                description.as_deref()
            }
            Outcome::FormationViolation { description }
            | Outcome::SignatureError { description }
            | Outcome::Exception { description } => Some(description),
        }
    }

    pub fn details(&self) -> Option<&JsonValue> {
        match self {
            Outcome::Rejected { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Outcome described by a call-error object received from a peer.
    ///
    /// A call error never describes a success, so a missing, unknown, or `Ok`
    /// code is read as `Unknown`.
    pub fn from_json(error: &JsonValue) -> Self {
        let code = match error.get("code").and_then(JsonValue::as_str) {
            Some(text) => ResultCode::from_wire(text),
            None => ResultCode::Unknown,
        };
        let description = error
            .get("description")
            .and_then(JsonValue::as_str)
            .map(str::to_owned);
        match code {
            ResultCode::FormationViolation => Outcome::FormationViolation {
                description: description.unwrap_or_default(),
            },
            ResultCode::SignatureError => Outcome::SignatureError {
                description: description.unwrap_or_default(),
            },
            ResultCode::Server => Outcome::ServerError { description },
            ResultCode::Exception => Outcome::Exception {
                description: description.unwrap_or_default(),
            },
            ResultCode::Ok => Outcome::Rejected {
                code: ResultCode::Unknown,
                description,
                details: error.get("details").cloned(),
            },
            code => Outcome::Rejected {
                code,
                description,
                details: error.get("details").cloned(),
            },
        }
    }

    /// Error object a transport can put in its call-error frame.
    pub fn to_json(&self) -> JsonValue {
        let mut obj = JsonObject::new();
        obj.insert("code".into(), JsonValue::String(self.code().to_string()));
        if let Some(description) = self.description() {
            obj.insert("description".into(), json!(description));
        }
        if let Some(details) = self.details() {
            obj.insert("details".into(), details.clone());
        }
        JsonValue::Object(obj)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(description) => write!(f, "{}: {}", self.code(), description),
            None => write!(f, "{}", self.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(Outcome::Success.code(), ResultCode::Ok);
        assert_eq!(
            Outcome::ServerError { description: None }.code(),
            ResultCode::Server
        );
        let routing = Outcome::Rejected {
            code: ResultCode::RoutingError,
            description: Some("no path to cp-7".into()),
            details: Some(json!({"hops": 0})),
        };
        assert_eq!(routing.code(), ResultCode::RoutingError);
        assert!(routing.code().is_transport_error());
        assert!(!ResultCode::Rejected.is_transport_error());
    }

    #[test]
    fn code_text_round_trips() {
        assert_eq!(ResultCode::FormationViolation.to_string(), "FormationViolation");
        assert_eq!("SignatureError".parse::<ResultCode>(), Ok(ResultCode::SignatureError));
        assert!("signatureerror".parse::<ResultCode>().is_err());
    }

    #[test]
    fn unrecognised_codes_fall_back_to_unknown() {
        assert_eq!(ResultCode::from_wire("Timeout"), ResultCode::Timeout);
        assert_eq!(ResultCode::from_wire("NotImplemented"), ResultCode::Unknown);
        assert_eq!(ResultCode::from_wire(""), ResultCode::Unknown);
    }

    #[test]
    fn call_errors_map_back_to_outcomes() {
        let violation = Outcome::FormationViolation {
            description: "requestId must be an integer".into(),
        };
        assert_eq!(Outcome::from_json(&violation.to_json()), violation);

        let timeout = Outcome::Rejected {
            code: ResultCode::Timeout,
            description: None,
            details: Some(json!({"timeoutSeconds": 30})),
        };
        assert_eq!(Outcome::from_json(&timeout.to_json()), timeout);

        let vendor = Outcome::from_json(&json!({"code": "VendorBusy", "description": "later"}));
        assert_eq!(vendor.code(), ResultCode::Unknown);
        assert_eq!(vendor.description(), Some("later"));

        let contradictory = Outcome::from_json(&json!({"code": "Ok"}));
        assert!(!contradictory.is_success());
        assert_eq!(contradictory.code(), ResultCode::Unknown);
        assert_eq!(Outcome::from_json(&json!("oops")).code(), ResultCode::Unknown);
    }

    #[test]
    fn error_object_carries_details() {
        let outcome = Outcome::Rejected {
            code: ResultCode::Timeout,
            description: Some("no answer in 30s".into()),
            details: Some(json!({"timeoutSeconds": 30})),
        };
        assert_eq!(
            outcome.to_json(),
            json!({
                "code": "Timeout",
                "description": "no answer in 30s",
                "details": {"timeoutSeconds": 30}
            })
        );
        assert_eq!(outcome.to_string(), "Timeout: no answer in 30s");
        assert_eq!(Outcome::Success.to_json(), json!({"code": "Ok"}));
    }
}
