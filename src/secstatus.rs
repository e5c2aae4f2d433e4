//! Session security status and the condition algebra evaluated against it.
//!
//! The status is a per-session record of which authentication mechanisms
//! succeeded, together with their outcome parameters. Mechanisms are only
//! ever added by protocol success or cleared wholesale by supersession
//! rules; nothing removes a single mechanism in place.

use bitflags::bitflags;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::oids;

bitflags! {
    /// Authorization bits of an authentication-terminal certificate holder
    /// authorization template, without the two role bits.
    ///
    /// The bit positions follow TR-03110 part 4, counted from the least
    /// significant bit of the 5-byte discretionary data field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Authorization: u64 {
        const AGE_VERIFICATION = 1 << 0;
        const COMMUNITY_ID_VERIFICATION = 1 << 1;
        const RESTRICTED_IDENTIFICATION = 1 << 2;
        const PRIVILEGED_TERMINAL = 1 << 3;
        const CAN_ALLOWED = 1 << 4;
        const PIN_MANAGEMENT = 1 << 5;
        const INSTALL_CERT = 1 << 6;
        const INSTALL_QUALIFIED_CERT = 1 << 7;
        const READ_DG1 = 1 << 8;
        const READ_DG2 = 1 << 9;
        const READ_DG3 = 1 << 10;
        const READ_DG4 = 1 << 11;
        const READ_DG5 = 1 << 12;
        const READ_DG6 = 1 << 13;
        const READ_DG7 = 1 << 14;
        const READ_DG8 = 1 << 15;
        const READ_DG9 = 1 << 16;
        const READ_DG10 = 1 << 17;
        const READ_DG11 = 1 << 18;
        const READ_DG12 = 1 << 19;
        const READ_DG13 = 1 << 20;
        const READ_DG14 = 1 << 21;
        const READ_DG15 = 1 << 22;
        const READ_DG16 = 1 << 23;
        const READ_DG17 = 1 << 24;
        const READ_DG18 = 1 << 25;
        const READ_DG19 = 1 << 26;
        const READ_DG20 = 1 << 27;
        const READ_DG21 = 1 << 28;
        const WRITE_DG21 = 1 << 29;
        const WRITE_DG20 = 1 << 30;
        const WRITE_DG19 = 1 << 31;
        const WRITE_DG18 = 1 << 32;
        const WRITE_DG17 = 1 << 33;
    }
}

impl Authorization {
    /// Decodes big-endian discretionary data, masking out the role bits in
    /// the two most significant positions of the first byte.
    pub fn from_chat_bytes(bytes: &[u8]) -> Authorization {
        let mut value: u64 = 0;
        for byte in bytes.iter().take(8) {
            value = (value << 8) | u64::from(*byte);
        }
        if !bytes.is_empty() && bytes.len() <= 8 {
            let role_shift = bytes.len() * 8 - 2;
            value &= !(0b11 << role_shift);
        }
        Authorization::from_bits_retain(value)
    }

    /// Effective authorization along a certificate chain.
    pub fn intersect(self, other: Authorization) -> Authorization {
        self & other
    }
}

/// Terminal types distinguished by the certificate holder authorization
/// template OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalType {
    InspectionSystem,
    AuthenticationTerminal,
    SignatureTerminal,
}

impl TerminalType {
    pub fn from_oid(oid: &[u8]) -> Option<TerminalType> {
        if oid == oids::ROLE_INSPECTION_SYSTEM {
            Some(TerminalType::InspectionSystem)
        } else if oid == oids::ROLE_AUTHENTICATION_TERMINAL {
            Some(TerminalType::AuthenticationTerminal)
        } else if oid == oids::ROLE_SIGNATURE_TERMINAL {
            Some(TerminalType::SignatureTerminal)
        } else {
            None
        }
    }
}

/// Secure channel session keys derived from a key agreement. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    pub enc: [u8; 16],
    pub mac: [u8; 16],
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys { .. }")
    }
}

/// Outcome parameters of a successful PACE run.
#[derive(Debug, Clone)]
pub struct PaceOutcome {
    /// Identifier of the password object the run was keyed to.
    pub password_ref: u8,
    /// Terminal type and authorization requested in the CHAT, if any was
    /// presented during MSE:SET AT.
    pub requested_chat: Option<(TerminalType, Authorization)>,
    /// Compressed ephemeral public key of the card from the key agreement;
    /// terminal authentication signs over this value.
    pub id_picc: Vec<u8>,
}

/// Outcome parameters of a successful terminal authentication.
#[derive(Debug, Clone)]
pub struct TaOutcome {
    pub terminal_type: TerminalType,
    /// Intersection of the authorization bits along the verified chain.
    pub authorization: Authorization,
    /// Certified terminal public key, for the later chip authentication.
    pub terminal_key: Vec<u8>,
    /// Compressed ephemeral key announced during TA; chip authentication
    /// must be run with exactly this key.
    pub ephemeral_key: Vec<u8>,
}

/// Per-session record of established mechanisms.
#[derive(Debug, Default)]
pub struct SecurityStatus {
    pace: Option<PaceOutcome>,
    ta: Option<TaOutcome>,
    ca_established: bool,
    ri_performed: bool,
    channel: Option<SessionKeys>,
}

impl SecurityStatus {
    pub fn new() -> Self {
        SecurityStatus::default()
    }

    /// Clears everything, as on card reset.
    pub fn reset(&mut self) {
        debug!("security status reset");
        *self = SecurityStatus::default();
    }

    /// Registers a successful PACE run and installs its channel keys.
    ///
    /// A new password-authenticated channel supersedes any terminal or chip
    /// authentication bound to the previous one.
    pub fn grant_pace(&mut self, outcome: PaceOutcome, keys: SessionKeys) {
        debug!(password_ref = outcome.password_ref, "PACE established");
        self.pace = Some(outcome);
        self.ta = None;
        self.ca_established = false;
        self.ri_performed = false;
        self.channel = Some(keys);
    }

    /// Registers a successful terminal authentication.
    pub fn grant_ta(&mut self, outcome: TaOutcome) {
        debug!(
            terminal_type = ?outcome.terminal_type,
            authorization = ?outcome.authorization,
            "terminal authentication established"
        );
        self.ta = Some(outcome);
    }

    /// Registers a successful chip authentication, replacing the channel
    /// keys with the freshly agreed ones.
    pub fn grant_ca(&mut self, keys: SessionKeys) {
        debug!("chip authentication established");
        self.ca_established = true;
        self.channel = Some(keys);
    }

    /// Records that a restricted identification ran this session. No
    /// condition gates on the mark; it is the mechanism's only trace here.
    pub fn grant_ri(&mut self) {
        debug!("restricted identification performed");
        self.ri_performed = true;
    }

    pub fn pace(&self) -> Option<&PaceOutcome> {
        self.pace.as_ref()
    }

    pub fn ta(&self) -> Option<&TaOutcome> {
        self.ta.as_ref()
    }

    pub fn ca_established(&self) -> bool {
        self.ca_established
    }

    pub fn ri_performed(&self) -> bool {
        self.ri_performed
    }

    /// Keys of the currently active secure channel, if one is up.
    pub fn channel(&self) -> Option<&SessionKeys> {
        self.channel.as_ref()
    }
}

/// Pure predicate over a [SecurityStatus].
///
/// Evaluation never mutates the status and never fails; the same status
/// always yields the same verdict.
#[derive(Debug, Clone)]
pub enum SecCondition {
    Always,
    Never,
    /// PACE succeeded with any password.
    PaceEstablished,
    /// PACE succeeded with the given password object.
    PaceWithPassword(u8),
    /// Terminal authentication succeeded with any terminal type.
    TaEstablished,
    /// Terminal authentication succeeded for the given terminal type.
    TaWithType(TerminalType),
    /// Terminal authentication succeeded and the effective authorization
    /// covers all the given bits.
    TaWithAuthorization(Authorization),
    /// Chip authentication succeeded.
    CaEstablished,
    And(Vec<SecCondition>),
    Or(Vec<SecCondition>),
    Not(Box<SecCondition>),
}

impl SecCondition {
    pub fn evaluate(&self, status: &SecurityStatus) -> bool {
        match self {
            SecCondition::Always => true,
            SecCondition::Never => false,
            SecCondition::PaceEstablished => status.pace().is_some(),
            SecCondition::PaceWithPassword(password_ref) => status
                .pace()
                .map_or(false, |outcome| outcome.password_ref == *password_ref),
            SecCondition::TaEstablished => status.ta().is_some(),
            SecCondition::TaWithType(terminal_type) => status
                .ta()
                .map_or(false, |outcome| outcome.terminal_type == *terminal_type),
            SecCondition::TaWithAuthorization(required) => status
                .ta()
                .map_or(false, |outcome| outcome.authorization.contains(*required)),
            SecCondition::CaEstablished => status.ca_established(),
            SecCondition::And(conditions) => conditions.iter().all(|c| c.evaluate(status)),
            SecCondition::Or(conditions) => conditions.iter().any(|c| c.evaluate(status)),
            SecCondition::Not(condition) => !condition.evaluate(status),
        }
    }
}
