#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

pub mod apdu;
pub mod card;
pub mod cardobjects;
pub mod crypto;
pub mod domain_params;
pub mod ec;
/// TR-03110 object identifier constants used by the protocol implementations.
pub mod oids;
pub mod protocols;
pub mod secstatus;
pub mod tlv;

use std::{fmt, result};

pub use apdu::{CommandApdu, ResponseApdu, Status};
pub use card::Card;
pub use cardobjects::{
    CardObject, IdMatcher, Identifier, KeyObject, LifeCycle, ObjectId, ObjectKind, ObjectTree,
    PasswordObject, TrustPoint,
};
pub use domain_params::{DomainParameterSet, GroupElement};
pub use secstatus::{Authorization, SecCondition, SecurityStatus, TerminalType};

/// The crate-wide [Result] type.
pub type Result<T> = result::Result<T, Error>;

/// Host-facing error of the simulator core.
///
/// These errors never travel to the card edge. Anything a real card would
/// answer with a status word (bad TLV, unknown reference, failed
/// authentication) is reported through [Status] inside a [ResponseApdu].
/// An [Error] means the simulator itself was set up or driven incorrectly:
/// a broken personalization profile, invalid key material, a violated tree
/// invariant.
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub description: String,
}

impl Error {
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Error {
            kind,
            description: description.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.description)
    }
}

impl std::error::Error for Error {}

/// Coarse classification of host-facing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Key material or domain parameters that cannot be interpreted.
    InvalidKeyMaterial,
    /// A lookup identifier that does not resolve to any object.
    UnknownReference,
    /// A caller-supplied value outside its allowed range.
    InvalidParameter,
    /// A broken internal invariant (cyclic tree, missing policy on a
    /// personalized object). Not recoverable.
    InvariantViolation,
}

impl From<iso7816_tlv::TlvError> for Error {
    fn from(value: iso7816_tlv::TlvError) -> Self {
        Error::new(ErrorKind::InvalidParameter, format!("TLV error: {}", value))
    }
}
