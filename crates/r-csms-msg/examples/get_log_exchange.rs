//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::sync::Arc;

use r_csms_common::{init_tracing, AppConfig};
use r_csms_msg::messages::{GetLogRequest, GetLogResponse, LogParameters, LogStatus, LogType};
use r_csms_msg::{CustomHooks, MessageCodec, NodeId, RequestHeader, Response, Routing};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::default();
    init_tracing("get-log-exchange", &config.logging)?;

    // The CSMS side builds and encodes the request.
    let csms = MessageCodec::new(Arc::new(CustomHooks::new()), config.protocol.clone());
    let request = csms.new_request(
        NodeId::from("cp-1"),
        GetLogRequest::new(
            LogType::DiagnosticsLog,
            1,
            LogParameters::new("https://logs.example.net/upload"),
        ),
    );
    let wire = csms.encode_request(&request);
    println!("CSMS -> cp-1: {}", wire);

    // The charge point decodes it and answers.
    let charge_point = MessageCodec::default();
    let header = RequestHeader::new(request.request_id().clone(), request.routing().clone());
    let received = Arc::new(charge_point.decode_request::<GetLogRequest>(&wire, header)?);
    let response = Response::<GetLogResponse>::produce(received.clone(), |req| {
        Ok(GetLogResponse::new(
            LogStatus::Accepted,
            Some(format!("diagnostics-{}.log", req.payload().request_id)),
        ))
    });
    let answer = charge_point.encode_response(&response);
    println!("cp-1 -> CSMS: {}", answer);

    // Back at the CSMS the answer is correlated with the original request.
    let decoded = csms.decode_response::<GetLogResponse>(
        Arc::new(request),
        &answer,
        Routing::to(csms.local_node()),
        None,
    )?;
    println!("outcome={} status={}", decoded.outcome(), decoded);
    Ok(())
}
