//! ---
//! csms_section: "06-security-access-control"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message signing, verification, and key material."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Ed25519 signatures over the canonical form of a message.

use std::collections::HashMap;
use std::sync::Arc;

use ed25519_dalek::{Signature as Ed25519Signature, Signer, VerifyingKey};
use r_csms_common::SignatureConfig;
use r_csms_msg::{
    CustomHooks, Request, RequestPayload, Response, ResponsePayload, Signature, SignableMessage,
};
use tracing::{debug, warn};

use crate::crypto::{fingerprint, KeyMaterial};

/// `signingMethod` written on every signature produced here.
pub const ED25519_METHOD: &str = "Ed25519";
/// `encodingMethod` written on every signature produced here.
pub const BASE64_ENCODING: &str = "base64";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("signing configuration is invalid: {0}")]
    Config(String),
    #[error("{action} {role} carries no signatures")]
    Unsigned {
        action: &'static str,
        role: &'static str,
    },
    #[error("no trusted key for signature '{key_id}'")]
    UnknownKey { key_id: String },
    #[error("signature '{key_id}' uses unsupported method '{method}'")]
    UnsupportedMethod { key_id: String, method: String },
    #[error("signature '{key_id}' is {len} bytes, expected 64")]
    Length { key_id: String, len: usize },
    #[error("signature '{key_id}' does not match the message")]
    Mismatch { key_id: String },
}

/// Produces signatures with one Ed25519 key.
#[derive(Debug)]
pub struct MessageSigner {
    key_id: String,
    material: KeyMaterial,
}

impl MessageSigner {
    pub fn new(key_id: impl Into<String>, material: KeyMaterial) -> Self {
        Self {
            key_id: key_id.into(),
            material,
        }
    }

    /// Build the signer configured for outbound messages.
    pub fn from_config(
        config: &SignatureConfig,
        material: KeyMaterial,
    ) -> Result<Self, SigningError> {
        if config.signing_method != ED25519_METHOD {
            return Err(SigningError::Config(format!(
                "unsupported signing method '{}'",
                config.signing_method
            )));
        }
        let key_id = config
            .key_id
            .clone()
            .ok_or_else(|| SigningError::Config("signatures.key_id is not set".into()))?;
        Ok(Self::new(key_id, material))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.material.verifying_key()
    }

    /// Sign the canonical form of `message`. The result is not attached.
    pub fn sign<M: SignableMessage>(&self, message: &M, hooks: &CustomHooks) -> Signature {
        let payload = message.canonical_bytes(hooks);
        let signature = self.material.signing_key().sign(&payload);
        debug!(
            action = message.action(),
            role = %message.role(),
            key_id = %self.key_id,
            "signed message"
        );
        Signature::new(self.key_id.clone(), signature.to_bytes().to_vec())
            .with_signing_method(ED25519_METHOD)
            .with_encoding_method(BASE64_ENCODING)
    }

    pub fn sign_request<P: RequestPayload>(
        &self,
        request: Request<P>,
        hooks: &CustomHooks,
    ) -> Request<P> {
        let signature = self.sign(&request, hooks);
        request.with_signature(signature)
    }

    pub fn sign_response<P: ResponsePayload>(
        &self,
        response: Response<P>,
        hooks: &CustomHooks,
    ) -> Response<P> {
        let signature = self.sign(&response, hooks);
        response.with_signature(signature)
    }
}

/// Checks message signatures against a set of trusted public keys.
#[derive(Debug, Clone, Default)]
pub struct MessageVerifier {
    keys: HashMap<String, VerifyingKey>,
}

impl MessageVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `public_key` for signatures carrying `key_id`.
    pub fn with_key(
        mut self,
        key_id: impl Into<String>,
        public_key: &[u8; 32],
    ) -> Result<Self, SigningError> {
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|err| SigningError::InvalidKey(err.to_string()))?;
        self.keys.insert(key_id.into(), key);
        Ok(self)
    }

    /// Trust the public half of `signer`.
    pub fn trust(mut self, signer: &MessageSigner) -> Self {
        self.keys
            .insert(signer.key_id().to_owned(), signer.verifying_key());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_trusted(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    /// Verify every signature made with a trusted key and return how many
    /// were checked.
    ///
    /// Signatures from unknown keys are skipped, but at least one signature
    /// must be checkable.
    pub fn verify<M: SignableMessage>(
        &self,
        message: &M,
        hooks: &CustomHooks,
    ) -> Result<usize, SigningError> {
        let signatures = message.signatures();
        let Some(first) = signatures.iter().next() else {
            return Err(SigningError::Unsigned {
                action: message.action(),
                role: message.role().as_str(),
            });
        };
        let payload = message.canonical_bytes(hooks);
        let mut verified = 0;
        for signature in signatures {
            let Some(key) = self.keys.get(signature.key_id()) else {
                debug!(key_id = signature.key_id(), "skipping signature from unknown key");
                continue;
            };
            verify_one(key, signature, &payload)?;
            verified += 1;
        }
        if verified == 0 {
            return Err(SigningError::UnknownKey {
                key_id: first.key_id().to_owned(),
            });
        }
        Ok(verified)
    }

    /// Verify an inbound request; on failure, the `SignatureError` response
    /// to send back instead of handling it.
    pub fn check_request<R: ResponsePayload>(
        &self,
        request: &Arc<Request<R::Request>>,
        hooks: &CustomHooks,
    ) -> Result<(), Box<Response<R>>> {
        match self.verify(&**request, hooks) {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(
                    action = request.action(),
                    request_id = %request.request_id(),
                    error = %err,
                    "rejecting request with bad signature"
                );
                Err(Box::new(Response::signature_error(
                    Arc::clone(request),
                    err.to_string(),
                )))
            }
        }
    }
}

fn verify_one(
    key: &VerifyingKey,
    signature: &Signature,
    payload: &[u8],
) -> Result<(), SigningError> {
    let key_id = signature.key_id();
    if let Some(method) = signature.signing_method() {
        if method != ED25519_METHOD {
            return Err(SigningError::UnsupportedMethod {
                key_id: key_id.to_owned(),
                method: method.to_owned(),
            });
        }
    }
    let bytes: [u8; 64] = signature
        .value()
        .try_into()
        .map_err(|_| SigningError::Length {
            key_id: key_id.to_owned(),
            len: signature.value().len(),
        })?;
    key.verify_strict(payload, &Ed25519Signature::from_bytes(&bytes))
        .map_err(|_| SigningError::Mismatch {
            key_id: key_id.to_owned(),
        })?;
    debug!(key_id, key = %fingerprint(key), "signature verified");
    Ok(())
}
