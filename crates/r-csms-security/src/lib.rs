//! ---
//! csms_section: "06-security-access-control"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message signing, verification, and key material."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
//! Signing and verification of protocol messages.

pub mod codec;
pub mod crypto;
pub mod signing;

pub use codec::{RequestRejection, ResponseRejection, SignedCodec};
pub use crypto::KeyMaterial;
pub use signing::{MessageSigner, MessageVerifier, SigningError, BASE64_ENCODING, ED25519_METHOD};
