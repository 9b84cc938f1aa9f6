//! ---
//! csms_section: "06-security-access-control"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message signing, verification, and key material."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! [`MessageCodec`] with the `[signatures]` policy applied at the boundary.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use r_csms_common::SignatureConfig;
use r_csms_msg::{
    JsonValue, MessageCodec, MessageError, Request, RequestHeader, RequestPayload, Response,
    ResponsePayload, Routing,
};
use tracing::{debug, warn};

use crate::crypto::KeyMaterial;
use crate::signing::{MessageSigner, MessageVerifier, SigningError};

/// An inbound request that must not reach its handler.
#[derive(Debug, thiserror::Error)]
pub enum RequestRejection<R: ResponsePayload> {
    /// The object could not be parsed, so there is no request to answer.
    #[error(transparent)]
    Malformed(#[from] MessageError),
    /// Parsed but failed verification; carries the `SignatureError`
    /// response to send back.
    #[error("request failed signature verification: {}", .0.outcome())]
    Unverified(Box<Response<R>>),
}

/// An inbound response that must not be handed to the requester.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseRejection {
    #[error(transparent)]
    Malformed(#[from] MessageError),
    #[error("response failed signature verification: {0}")]
    Unverified(#[from] SigningError),
}

/// Signs outbound messages when `sign_outbound` is set and verifies inbound
/// ones when `verify_inbound` is set.
#[derive(Debug)]
pub struct SignedCodec {
    codec: MessageCodec,
    signer: Option<MessageSigner>,
    verifier: MessageVerifier,
    verify_inbound: bool,
}

impl SignedCodec {
    /// `key` is required when signing outbound messages; `verifier` must
    /// trust at least one key when verifying inbound ones.
    pub fn new(
        codec: MessageCodec,
        config: &SignatureConfig,
        key: Option<KeyMaterial>,
        verifier: MessageVerifier,
    ) -> Result<Self, SigningError> {
        let signer = match (config.sign_outbound, key) {
            (true, Some(key)) => Some(MessageSigner::from_config(config, key)?),
            (true, None) => {
                return Err(SigningError::Config(
                    "sign_outbound is set but no signing key was supplied".into(),
                ))
            }
            (false, _) => None,
        };
        if config.verify_inbound && verifier.is_empty() {
            return Err(SigningError::Config(
                "verify_inbound is set but no verification keys are trusted".into(),
            ));
        }
        debug!(
            sign_outbound = signer.is_some(),
            verify_inbound = config.verify_inbound,
            "signature policy loaded"
        );
        Ok(Self {
            codec,
            signer,
            verifier,
            verify_inbound: config.verify_inbound,
        })
    }

    pub fn codec(&self) -> &MessageCodec {
        &self.codec
    }

    pub fn signs_outbound(&self) -> bool {
        self.signer.is_some()
    }

    pub fn verifies_inbound(&self) -> bool {
        self.verify_inbound
    }

    /// Attach this node's signature when outbound signing is enabled.
    pub fn sign_request<P: RequestPayload>(&self, request: Request<P>) -> Request<P> {
        match &self.signer {
            Some(signer) => signer.sign_request(request, self.codec.hooks()),
            None => request,
        }
    }

    pub fn sign_response<P: ResponsePayload>(&self, response: Response<P>) -> Response<P> {
        match &self.signer {
            Some(signer) => signer.sign_response(response, self.codec.hooks()),
            None => response,
        }
    }

    pub fn encode_request<P: RequestPayload>(&self, request: Request<P>) -> JsonValue {
        self.codec.encode_request(&self.sign_request(request))
    }

    pub fn encode_response<P: ResponsePayload>(&self, response: Response<P>) -> JsonValue {
        self.codec.encode_response(&self.sign_response(response))
    }

    /// Decode a request that will be answered with `R`.
    pub fn decode_request<R: ResponsePayload>(
        &self,
        json: &JsonValue,
        header: RequestHeader,
    ) -> Result<Arc<Request<R::Request>>, RequestRejection<R>> {
        let request = Arc::new(self.codec.decode_request::<R::Request>(json, header)?);
        if self.verify_inbound {
            self.verifier
                .check_request::<R>(&request, self.codec.hooks())
                .map_err(RequestRejection::Unverified)?;
        }
        Ok(request)
    }

    pub fn decode_response<P: ResponsePayload>(
        &self,
        request: Arc<Request<P::Request>>,
        json: &JsonValue,
        routing: Routing,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Response<P>, ResponseRejection> {
        let response = self
            .codec
            .decode_response::<P>(request, json, routing, timestamp)?;
        if self.verify_inbound {
            if let Err(err) = self.verifier.verify(&response, self.codec.hooks()) {
                warn!(
                    action = response.action(),
                    request_id = %response.request().request_id(),
                    error = %err,
                    "discarding response with bad signature"
                );
                return Err(err.into());
            }
        }
        Ok(response)
    }
}
