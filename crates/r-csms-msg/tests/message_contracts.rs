//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use r_csms_msg::fields::FieldError;
use r_csms_msg::messages::{
    GetLogRequest, GetLogResponse, LogParameters, LogStatus, LogStatusNotificationRequest,
    LogStatusNotificationResponse, LogType, UploadLogStatus,
};
use r_csms_msg::{
    CustomData, CustomHooks, JsonObject, MessageError, NetworkPath, NodeId, Outcome, Request,
    RequestHeader, RequestId, Response, ResponsePayload, ResultCode, Routing, Signature,
    SignatureSet,
};
use serde_json::json;

fn get_log_request() -> Arc<Request<GetLogRequest>> {
    let payload = GetLogRequest::new(
        LogType::DiagnosticsLog,
        9,
        LogParameters::new("https://logs.example.net/upload"),
    );
    Arc::new(Request::new(NodeId::from("cp-1"), payload))
}

fn notification_request(
    status: UploadLogStatus,
    id: Option<i32>,
) -> Arc<Request<LogStatusNotificationRequest>> {
    Arc::new(Request::new(
        NodeId::from("csms"),
        LogStatusNotificationRequest::new(status, id),
    ))
}

fn header(id: &str) -> RequestHeader {
    RequestHeader::new(RequestId::from(id), Routing::to(NodeId::from("cp-1")))
}

#[test]
fn get_log_request_round_trips() {
    let hooks = CustomHooks::new();
    let payload = GetLogRequest::new(
        LogType::SecurityLog,
        3,
        LogParameters::new("ftp://logs.example.net").with_window(
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 12, 30, 0).unwrap()),
        ),
    )
    .with_retries(2, Some(60));
    let original = Request::new(NodeId::from("cp-1"), payload)
        .with_custom_data(Some(CustomData::new("acme").with_property("zone", json!("b"))))
        .with_signature(Signature::new("csms-key", vec![1, 2, 3]));

    let wire = original.to_json(&hooks);
    let parsed = Request::<GetLogRequest>::try_parse(&wire, header("r-1"), &hooks).expect("parse");
    assert_eq!(parsed, original);
    assert_eq!(parsed.payload(), original.payload());
    assert_eq!(parsed.custom_data(), original.custom_data());
    assert_eq!(parsed.signatures(), original.signatures());
    assert_eq!(parsed.to_json(&hooks), wire);
}

#[test]
fn responses_round_trip_for_both_operations() {
    let hooks = CustomHooks::new();
    let get_log = Response::new(
        get_log_request(),
        GetLogResponse::new(LogStatus::Accepted, Some("diag.log".into())),
    );
    let wire = get_log.to_json(&hooks);
    let parsed = Response::<GetLogResponse>::try_parse(
        get_log.request().clone(),
        &wire,
        get_log.routing().clone(),
        Some(get_log.timestamp()),
        &hooks,
    )
    .expect("parse");
    assert_eq!(parsed, get_log);

    let ack = Response::new(
        notification_request(UploadLogStatus::Uploaded, Some(9)),
        LogStatusNotificationResponse,
    );
    let wire = ack.to_json(&hooks);
    assert_eq!(wire, json!({}));
    let parsed = Response::<LogStatusNotificationResponse>::try_parse(
        ack.request().clone(),
        &wire,
        ack.routing().clone(),
        None,
        &hooks,
    )
    .expect("parse");
    assert_eq!(parsed, ack);
    assert_eq!(parsed.to_string(), "LogStatusNotificationResponse");
}

#[test]
fn get_log_response_scenario() {
    let hooks = CustomHooks::new();
    let request = get_log_request();
    let wire = json!({"status": "Accepted", "filename": "diag.log"});
    let response = Response::<GetLogResponse>::try_parse(
        request,
        &wire,
        Routing::to(NodeId::from("csms")),
        None,
        &hooks,
    )
    .expect("parse");
    assert_eq!(response.payload().status, LogStatus::Accepted);
    assert_eq!(response.payload().filename.as_deref(), Some("diag.log"));
    assert!(response.signatures().is_empty());
    assert!(response.custom_data().is_none());
    assert!(response.is_success());
    assert_eq!(response.to_string(), "Accepted");
    assert_eq!(response.to_json(&hooks), wire);
}

#[test]
fn log_status_notification_scenario() {
    let hooks = CustomHooks::new();
    let wire = json!({"status": "Idle", "requestId": 42});
    let request =
        Request::<LogStatusNotificationRequest>::try_parse(&wire, header("r-42"), &hooks)
            .expect("parse");
    assert_eq!(request.payload().status, UploadLogStatus::Idle);
    assert_eq!(request.payload().request_id, Some(42));
    assert_eq!(request.to_string(), "Idle (42)");
    assert_eq!(request.request_id().as_str(), "r-42");
    assert_eq!(request.to_json(&hooks), wire);
}

#[test]
fn log_status_notification_request_round_trips() {
    let hooks = CustomHooks::new();
    for wire in [
        json!({"status": "Uploaded", "requestId": 7}),
        json!({"status": "Idle"}),
        json!({
            "status": "UploadFailure",
            "requestId": 8,
            "signatures": [{"keyId": "cp-1-key", "value": "AQID", "signingMethod": "Ed25519"}],
            "customData": {"vendorId": "acme", "attempt": 3}
        }),
    ] {
        let parsed =
            Request::<LogStatusNotificationRequest>::try_parse(&wire, header("r-7"), &hooks)
                .expect("parse");
        assert_eq!(parsed.to_json(&hooks), wire);
    }
}

#[test]
fn missing_mandatory_status_is_reported_not_defaulted() {
    let hooks = CustomHooks::new();
    let err = Response::<GetLogResponse>::try_parse(
        get_log_request(),
        &json!({"filename": "diag.log"}),
        Routing::to(NodeId::from("csms")),
        None,
        &hooks,
    )
    .expect_err("status is mandatory");
    assert_eq!(
        err.to_string(),
        "invalid GetLog response: mandatory field 'status' is missing"
    );

    let err = Request::<LogStatusNotificationRequest>::try_parse(
        &json!({"requestId": 42}),
        header("r-1"),
        &hooks,
    )
    .expect_err("status is mandatory");
    assert!(matches!(
        err,
        MessageError::Invalid {
            action: "LogStatusNotification",
            source: FieldError::Missing { .. },
            ..
        }
    ));
}

#[test]
fn non_objects_are_rejected() {
    let hooks = CustomHooks::new();
    let err = Request::<GetLogRequest>::try_parse(&json!([1, 2]), header("r-1"), &hooks)
        .expect_err("array is not a message");
    assert!(matches!(err, MessageError::NotAnObject { action: "GetLog", .. }));
}

#[test]
fn parse_adds_context_for_fail_fast_callers() {
    let hooks = CustomHooks::new();
    let err = Request::<GetLogRequest>::parse(
        &json!({"logType": "SecurityLog"}),
        header("r-7"),
        &hooks,
    )
    .expect_err("incomplete");
    let rendered = format!("{:#}", err);
    assert!(rendered.starts_with("unable to parse GetLog request r-7"));
    assert!(rendered.contains("requestId"));
}

#[test]
fn absent_optionals_are_omitted_from_the_wire() {
    let hooks = CustomHooks::new();
    let response = Response::new(
        get_log_request(),
        GetLogResponse::new(LogStatus::Accepted, None),
    );
    assert_eq!(response.to_json(&hooks), json!({"status": "Accepted"}));

    let request = notification_request(UploadLogStatus::Idle, None);
    assert_eq!(request.to_json(&hooks), json!({"status": "Idle"}));
    assert_eq!(request.to_string(), "Idle");
}

#[test]
fn signatures_keep_insertion_order_and_compare_as_sets() {
    let hooks = CustomHooks::new();
    let first = Signature::new("k-1", b"one".to_vec());
    let second = Signature::new("k-2", b"two".to_vec()).with_encoding_method("base64");
    let third = Signature::new("k-3", b"three".to_vec());
    let request = notification_request(UploadLogStatus::Uploading, Some(1));

    let signed = Response::new(request.clone(), LogStatusNotificationResponse)
        .with_signature(first.clone())
        .with_signature(second.clone())
        .with_signature(third.clone());
    let wire = signed.to_json(&hooks);
    let keys: Vec<_> = wire["signatures"]
        .as_array()
        .expect("signatures array")
        .iter()
        .map(|s| s["keyId"].as_str().unwrap_or_default().to_owned())
        .collect();
    assert_eq!(keys, ["k-1", "k-2", "k-3"]);
    assert_eq!(wire["signatures"][1]["encodingMethod"], "base64");

    let parsed = Response::<LogStatusNotificationResponse>::try_parse(
        request,
        &wire,
        signed.routing().clone(),
        None,
        &hooks,
    )
    .expect("parse");
    assert_eq!(parsed.signatures().len(), 3);

    let reversed: SignatureSet = vec![third, second, first].into_iter().collect();
    assert_eq!(parsed.signatures(), &reversed);
}

#[test]
fn one_bad_signature_fails_the_whole_message() {
    let hooks = CustomHooks::new();
    let wire = json!({
        "status": "Uploaded",
        "signatures": [
            {"keyId": "k-1", "value": "AQID"},
            {"keyId": "k-2", "value": "not base64!"}
        ]
    });
    let err = Request::<LogStatusNotificationRequest>::try_parse(&wire, header("r-1"), &hooks)
        .expect_err("second signature is malformed");
    assert!(matches!(
        err,
        MessageError::Invalid {
            source: FieldError::Element { index: 1, .. },
            ..
        }
    ));
}

#[test]
fn identity_ignores_envelope_metadata() {
    let payload = LogStatusNotificationRequest::new(UploadLogStatus::Uploading, Some(5));
    let plain = Request::from_header(
        RequestHeader::new(RequestId::from("a"), Routing::to(NodeId::from("csms")))
            .with_timestamp(Utc::now() - ChronoDuration::minutes(5)),
        payload.clone(),
    );
    let decorated = Request::from_header(
        RequestHeader::new(
            RequestId::from("b"),
            Routing::new(
                NodeId::from("lc-1"),
                NetworkPath::from_source(NodeId::from("cp-9")),
            ),
        ),
        payload,
    )
    .with_signature(Signature::new("k-1", vec![9]))
    .with_custom_data(Some(CustomData::new("acme")));

    assert_eq!(plain, decorated);
    assert_eq!(plain.identity(), decorated.identity());
    let set: HashSet<_> = [plain, decorated].into_iter().collect();
    assert_eq!(set.len(), 1);

    let five = notification_request(UploadLogStatus::Uploading, Some(5));
    let six = notification_request(UploadLogStatus::Uploading, Some(6));
    assert_ne!(five, six);
    assert_ne!(five.identity(), six.identity());
}

#[test]
fn failure_factories_always_yield_a_response() {
    let request = get_log_request();
    let cases: Vec<(Response<GetLogResponse>, ResultCode)> = vec![
        (
            Response::rejected(request.clone(), ResultCode::Rejected, None, None),
            ResultCode::Rejected,
        ),
        (
            Response::request_error(
                request.clone(),
                ResultCode::RoutingError,
                "no route to cp-1",
                Some(json!({"hops": 0})),
            ),
            ResultCode::RoutingError,
        ),
        (
            Response::formation_violation(request.clone(), "requestId out of range"),
            ResultCode::FormationViolation,
        ),
        (
            Response::signature_error(request.clone(), "unknown key k-9"),
            ResultCode::SignatureError,
        ),
        (Response::failed(request.clone(), None), ResultCode::Server),
        (
            Response::exception_occurred(
                request.clone(),
                &io::Error::new(io::ErrorKind::Other, "disk full"),
            ),
            ResultCode::Exception,
        ),
    ];
    for (response, code) in cases {
        assert_eq!(response.result_code(), code);
        assert!(Arc::ptr_eq(response.request(), &request));
        assert_eq!(response.payload(), &GetLogResponse::new(LogStatus::Rejected, None));
        // no recorded path: addressed to the node the request named
        assert_eq!(response.destination(), &NodeId::from("cp-1"));
    }
}

#[test]
fn failure_factories_refuse_success_codes() {
    let request = get_log_request();
    let rejected = Response::<GetLogResponse>::rejected(request.clone(), ResultCode::Ok, None, None);
    assert_eq!(rejected.result_code(), ResultCode::Unknown);
    assert!(!rejected.is_success());
    assert_eq!(rejected.payload().status, LogStatus::Rejected);

    let transport =
        Response::<GetLogResponse>::request_error(request, ResultCode::Ok, "lost frame", None);
    assert_eq!(transport.result_code(), ResultCode::Unknown);
    assert_eq!(transport.outcome().description(), Some("lost frame"));
}

#[test]
fn call_errors_become_failure_responses() {
    let request = get_log_request();
    let timeout = Response::<GetLogResponse>::from_call_error(
        request.clone(),
        &json!({"code": "Timeout", "description": "no answer in 30s"}),
    );
    assert_eq!(timeout.result_code(), ResultCode::Timeout);
    assert!(timeout.result_code().is_transport_error());
    assert_eq!(timeout.payload(), &GetLogResponse::failure_default());

    let vendor = Response::<GetLogResponse>::from_call_error(
        request,
        &json!({"code": "AcmeBusy", "details": {"retryAfter": 5}}),
    );
    assert_eq!(vendor.result_code(), ResultCode::Unknown);
    assert_eq!(vendor.outcome().details(), Some(&json!({"retryAfter": 5})));
}

#[test]
fn failure_responses_return_to_the_sender() {
    let routing = Routing::new(
        NodeId::from("cp-1"),
        NetworkPath::from_source(NodeId::from("csms")),
    );
    let request = Arc::new(Request::from_header(
        RequestHeader::new(RequestId::from("r-9"), routing),
        GetLogRequest::new(
            LogType::SecurityLog,
            9,
            LogParameters::new("https://logs.example.net/upload"),
        ),
    ));
    let failed = Response::<GetLogResponse>::failed(request, None);
    assert_eq!(failed.destination(), &NodeId::from("csms"));

    let direct = Response::<GetLogResponse>::signature_error(get_log_request(), "unknown key")
        .with_routing(Routing::to(NodeId::from("csms")));
    assert_eq!(direct.destination(), &NodeId::from("csms"));
    assert_eq!(direct.result_code(), ResultCode::SignatureError);
}

#[test]
fn produce_catches_errors_and_panics() {
    let request = get_log_request();
    let ok = Response::<GetLogResponse>::produce(request.clone(), |req| {
        Ok(GetLogResponse::new(
            LogStatus::Accepted,
            Some(format!("{}.log", req.payload().request_id)),
        ))
    });
    assert!(ok.is_success());
    assert_eq!(ok.payload().filename.as_deref(), Some("9.log"));

    let failed = Response::<GetLogResponse>::produce(request.clone(), |_| {
        Err(anyhow::anyhow!("storage offline")).map_err(|e| e.context("cannot stage log"))
    });
    assert_eq!(failed.result_code(), ResultCode::Exception);
    assert_eq!(
        failed.outcome().description(),
        Some("cannot stage log: storage offline")
    );

    let panicked = Response::<GetLogResponse>::produce(request, |_| panic!("handler bug"));
    assert_eq!(
        panicked.outcome(),
        &Outcome::Exception {
            description: "panic: handler bug".into()
        }
    );
}

#[test]
fn response_equality_ignores_request_and_outcome() {
    let payload = GetLogResponse::failure_default();
    let rejected = Response::rejected(get_log_request(), ResultCode::Rejected, None, None);
    let success = Response::new(get_log_request(), payload);
    assert_eq!(rejected, success);
    assert_eq!(rejected.identity(), success.identity());
}

#[test]
fn hooks_run_after_core_processing() {
    let hooks = CustomHooks::new()
        .with_parser::<Request<LogStatusNotificationRequest>>(|raw, request| {
            let vendor = raw
                .get("x-vendor")
                .and_then(|v| v.as_str())
                .map(|v| CustomData::new(v));
            request.with_custom_data(vendor)
        })
        .with_serializer::<Response<GetLogResponse>>(|response, mut json: JsonObject| {
            json.insert("x-trace".into(), json!(response.request().request_id().as_str()));
            json
        })
        .with_serializer::<Signature>(|_, mut json: JsonObject| {
            json.insert("signingMethod".into(), json!("Ed25519"));
            json
        });

    let request = Request::<LogStatusNotificationRequest>::try_parse(
        &json!({"status": "Uploading", "requestId": 1, "x-vendor": "acme"}),
        header("r-1"),
        &hooks,
    )
    .expect("parse");
    assert_eq!(request.custom_data().map(CustomData::vendor_id), Some("acme"));

    let get_log = get_log_request();
    let response = Response::new(get_log.clone(), GetLogResponse::new(LogStatus::Accepted, None))
        .with_signature(Signature::new("k-1", vec![1]));
    let wire = response.to_json(&hooks);
    assert_eq!(wire["x-trace"], json!(get_log.request_id().as_str()));
    assert_eq!(wire["signatures"][0]["signingMethod"], "Ed25519");
}

#[test]
fn runtime_measures_request_to_response() {
    let hooks = CustomHooks::new();
    let sent = Utc::now() - ChronoDuration::seconds(2);
    let request = Arc::new(Request::from_header(
        header("r-1").with_timestamp(sent),
        LogStatusNotificationRequest::new(UploadLogStatus::Uploaded, Some(1)),
    ));
    let response = Response::<LogStatusNotificationResponse>::try_parse(
        request,
        &json!({}),
        Routing::to(NodeId::from("cp-1")),
        Some(sent + ChronoDuration::milliseconds(1500)),
        &hooks,
    )
    .expect("parse");
    assert_eq!(response.runtime(), Some(std::time::Duration::from_millis(1500)));
}
