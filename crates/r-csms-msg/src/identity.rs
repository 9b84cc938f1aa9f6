//! ---
//! csms_section: "02-messaging-ipc-data-model"
//! csms_subsection: "module"
//! csms_type: "source"
//! csms_scope: "code"
//! csms_description: "Message contracts, envelopes, and protocol codecs."
//! csms_version: "v0.0.0-prealpha"
//! csms_owner: "tbd"
//! ---
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Which side of an exchange a message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Message that asks for an operation.
    Request,
    /// Message that answers a request.
    Response,
}

impl Role {
    /// Lower-case name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Request => "request",
            Role::Response => "response",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content hash of a message, computed once when the message is built.
///
/// Covers the role, the action, and the operation-specific payload. Signatures,
/// custom data, routing, timestamps, identifiers, and outcomes are excluded, so
/// a re-signed copy of a message hashes the same as the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityHash(u64);

impl IdentityHash {
    /// Fold the role/action base contribution with the payload's hash.
    pub fn compute<P: Hash + ?Sized>(role: Role, action: &str, payload: &P) -> Self {
        let mut hasher = DefaultHasher::new();
        role.hash(&mut hasher);
        action.hash(&mut hasher);
        payload.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Raw hash value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
