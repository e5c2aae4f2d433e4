//! Terminal authentication (TR-03110 version 2).
//!
//! A terminal proves possession of a certified key: MSE:SET DST selects the
//! verification anchor, PSO:VERIFY CERTIFICATE walks the chain link by link
//! down to the terminal certificate, MSE:SET AT fixes the terminal key and
//! its announced ephemeral key, and GET CHALLENGE / EXTERNAL AUTHENTICATE
//! close with a challenge signature. Verification is fail-closed: a bad
//! signature, an expired certificate or a role violation anywhere aborts
//! the chain and nothing is registered.

use crate::apdu::{ins, CommandApdu, ResponseApdu, Status};
use crate::cardobjects::ObjectTree;
use crate::ec::{self, EcGroup, EcPoint};
use crate::oids;
use crate::secstatus::{Authorization, SecurityStatus, TaOutcome, TerminalType};
use crate::tlv::{self, Tlv};

use super::cv_cert::{digest_for, CvCertificate, CvRole};
use super::{command_oid, mse, p1p2, template_field, CardProtocol};

/// Verification chain state: the key the next certificate must be signed
/// with, plus what the walked chain established so far.
#[derive(Debug, Clone)]
struct Chain {
    group: EcGroup,
    key: EcPoint,
    key_oid: Vec<u8>,
    holder: Vec<u8>,
    role: CvRole,
    effective_auth: Authorization,
    terminal: Option<Terminal>,
}

/// Facts about the terminal certificate once the chain reaches it.
#[derive(Debug, Clone)]
struct Terminal {
    terminal_type: TerminalType,
    chr: Vec<u8>,
    key: EcPoint,
    key_oid: Vec<u8>,
}

enum State {
    Idle,
    Verifying(Chain),
    TemplateSet {
        chain: Chain,
        ephemeral_key: Vec<u8>,
        auxiliary: Option<Vec<u8>>,
    },
    Challenged {
        chain: Chain,
        ephemeral_key: Vec<u8>,
        auxiliary: Option<Vec<u8>>,
        challenge: [u8; 8],
    },
}

pub struct TerminalAuthProtocol {
    state: State,
}

impl TerminalAuthProtocol {
    pub fn new() -> Self {
        TerminalAuthProtocol { state: State::Idle }
    }

    /// MSE:SET DST selects the verification key by name: the trust point's
    /// CAR or the holder of the most recently verified certificate.
    fn set_dst(&mut self, command: &CommandApdu, tree: &ObjectTree) -> ResponseApdu {
        let objects = match tlv::parse(&command.data) {
            Ok(objects) => objects,
            Err(_) => return Status::IncorrectData.into(),
        };
        let name = match template_field(&objects, tlv::tags::CONTEXT_3) {
            Some(name) => name,
            None => return Status::IncorrectData.into(),
        };

        // Selecting the current chain key again is a no-op.
        if let State::Verifying(chain) = &self.state {
            if chain.holder == name {
                return Status::Ok.into();
            }
        }

        match super::find_trust_point(tree, Some(name)) {
            Some(trust_point) => {
                self.state = State::Verifying(Chain {
                    group: trust_point.group,
                    key: trust_point.public,
                    key_oid: trust_point.oid,
                    holder: trust_point.car,
                    role: CvRole::Cvca,
                    effective_auth: Authorization::from_bits_retain(!0),
                    terminal: None,
                });
                Status::Ok.into()
            }
            None => {
                self.state = State::Idle;
                Status::ReferenceNotFound.into()
            }
        }
    }

    fn verify_certificate(&mut self, command: &CommandApdu, tree: &mut ObjectTree) -> ResponseApdu {
        let mut chain = match std::mem::replace(&mut self.state, State::Idle) {
            State::Verifying(chain) => chain,
            other => {
                self.state = other;
                return Status::ConditionsNotSatisfied.into();
            }
        };

        let certificate = match CvCertificate::parse(&command.data) {
            Ok(certificate) => certificate,
            Err(word) => return word.into(),
        };

        // Issuer must be the selected key.
        if certificate.car != chain.holder {
            return Status::ConditionsNotSatisfied.into();
        }
        if !role_may_issue(chain.role, certificate.role()) {
            return Status::ConditionsNotSatisfied.into();
        }
        if !certificate.verify(&chain.key_oid, &chain.group, &chain.key) {
            warn!("certificate signature verification failed");
            return Status::VerificationFailed.into();
        }
        if let Some(current) = super::current_date(tree) {
            if certificate.expiration < current {
                warn!(chr = ?certificate.chr, "certificate expired");
                return Status::ConditionsNotSatisfied.into();
            }
        }

        let public = match chain.group.decode_point(&certificate.public_key) {
            Ok(public) => public,
            Err(_) => return Status::IncorrectData.into(),
        };

        // Certificates of trusted issuers move the card's date forward.
        if matches!(chain.role, CvRole::Cvca | CvRole::DvDomestic) {
            super::advance_current_date(tree, certificate.effective);
        }

        chain.effective_auth = chain.effective_auth.intersect(certificate.authorization());
        if certificate.role() == CvRole::Terminal {
            let terminal_type = match certificate.terminal_type() {
                Some(terminal_type) => terminal_type,
                None => return Status::IncorrectData.into(),
            };
            chain.terminal = Some(Terminal {
                terminal_type,
                chr: certificate.chr.clone(),
                key: public.clone(),
                key_oid: certificate.key_oid.clone(),
            });
        }
        chain.role = certificate.role();
        chain.holder = certificate.chr;
        chain.key = public;
        chain.key_oid = certificate.key_oid;

        debug!(holder = ?chain.holder, role = ?chain.role, "certificate accepted");
        self.state = State::Verifying(chain);
        Status::Ok.into()
    }

    /// MSE:SET AT binds the run to the verified terminal key and records
    /// the compressed ephemeral key the terminal will use for chip
    /// authentication.
    fn set_at(&mut self, command: &CommandApdu, status: &SecurityStatus) -> ResponseApdu {
        let chain = match std::mem::replace(&mut self.state, State::Idle) {
            State::Verifying(chain) => chain,
            _ => return Status::ConditionsNotSatisfied.into(),
        };
        let terminal = match &chain.terminal {
            Some(terminal) => terminal.clone(),
            None => return Status::ConditionsNotSatisfied.into(),
        };
        if status.pace().is_none() {
            return Status::SecurityStatusNotSatisfied.into();
        }

        let objects = match tlv::parse(&command.data) {
            Ok(objects) => objects,
            Err(_) => return Status::IncorrectData.into(),
        };
        let oid = match template_field(&objects, tlv::tags::CONTEXT_0) {
            Some(oid) => oid,
            None => return Status::IncorrectData.into(),
        };
        if oid != terminal.key_oid {
            return Status::ReferenceNotFound.into();
        }
        match template_field(&objects, tlv::tags::CONTEXT_3) {
            Some(name) if name == terminal.chr => {}
            Some(_) => return Status::ReferenceNotFound.into(),
            None => return Status::IncorrectData.into(),
        }
        let ephemeral_key = match template_field(&objects, &[0x91]) {
            Some(ephemeral_key) => ephemeral_key.to_vec(),
            None => return Status::IncorrectData.into(),
        };
        let auxiliary = tlv::find_first(&objects, &[0x67]).map(|object| object.to_vec());

        self.state = State::TemplateSet {
            chain,
            ephemeral_key,
            auxiliary,
        };
        Status::Ok.into()
    }

    fn get_challenge(&mut self) -> ResponseApdu {
        let (chain, ephemeral_key, auxiliary) = match std::mem::replace(&mut self.state, State::Idle) {
            State::TemplateSet {
                chain,
                ephemeral_key,
                auxiliary,
            } => (chain, ephemeral_key, auxiliary),
            State::Challenged {
                chain,
                ephemeral_key,
                auxiliary,
                ..
            } => (chain, ephemeral_key, auxiliary),
            _ => return Status::ConditionsNotSatisfied.into(),
        };

        let mut challenge = [0u8; 8];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut challenge);
        let response = ResponseApdu::new(Status::Ok, challenge.to_vec());
        self.state = State::Challenged {
            chain,
            ephemeral_key,
            auxiliary,
            challenge,
        };
        response
    }

    fn external_authenticate(&mut self, command: &CommandApdu, status: &mut SecurityStatus) -> ResponseApdu {
        let (chain, ephemeral_key, auxiliary, challenge) =
            match std::mem::replace(&mut self.state, State::Idle) {
                State::Challenged {
                    chain,
                    ephemeral_key,
                    auxiliary,
                    challenge,
                } => (chain, ephemeral_key, auxiliary, challenge),
                _ => return Status::ConditionsNotSatisfied.into(),
            };
        let terminal = match chain.terminal {
            Some(terminal) => terminal,
            None => return Status::ConditionsNotSatisfied.into(),
        };
        let id_picc = match status.pace() {
            Some(outcome) => outcome.id_picc.clone(),
            None => return Status::SecurityStatusNotSatisfied.into(),
        };

        let mut message = id_picc;
        message.extend_from_slice(&challenge);
        message.extend_from_slice(&ephemeral_key);
        if let Some(auxiliary) = &auxiliary {
            message.extend_from_slice(auxiliary);
        }
        let digest = digest_for(&terminal.key_oid, &message);

        if !ec::ecdsa_verify(&chain.group, &terminal.key, &digest, &command.data) {
            warn!("terminal challenge signature rejected");
            return Status::VerificationFailed.into();
        }

        let encoded_terminal_key = match chain.group.encode_point(&terminal.key) {
            Ok(encoded) => encoded,
            Err(_) => return Status::IncorrectData.into(),
        };
        status.grant_ta(TaOutcome {
            terminal_type: terminal.terminal_type,
            authorization: chain.effective_auth,
            terminal_key: encoded_terminal_key,
            ephemeral_key,
        });
        info!(terminal_type = ?terminal.terminal_type, "terminal authentication completed");
        Status::Ok.into()
    }
}

impl CardProtocol for TerminalAuthProtocol {
    fn name(&self) -> &'static str {
        "TA"
    }

    fn handles(&self, command: &CommandApdu) -> bool {
        match command.ins {
            ins::MSE_SET => {
                p1p2(command) == mse::SET_DST
                    || (p1p2(command) == mse::SET_AT_AUTH
                        && command_oid(command).map_or(false, |oid| oids::in_family(&oid, oids::ID_TA)))
            }
            ins::PSO => p1p2(command) == (0x00, 0xBE),
            ins::GET_CHALLENGE => true,
            ins::EXTERNAL_AUTHENTICATE => true,
            _ => false,
        }
    }

    fn process(
        &mut self,
        command: &CommandApdu,
        tree: &mut ObjectTree,
        status: &mut SecurityStatus,
    ) -> ResponseApdu {
        match command.ins {
            ins::MSE_SET if p1p2(command) == mse::SET_DST => self.set_dst(command, tree),
            ins::MSE_SET => self.set_at(command, status),
            ins::PSO => self.verify_certificate(command, tree),
            ins::GET_CHALLENGE => self.get_challenge(),
            ins::EXTERNAL_AUTHENTICATE => self.external_authenticate(command, status),
            _ => Status::InstructionNotSupported.into(),
        }
    }

    fn security_infos(&self, _tree: &ObjectTree) -> Vec<Tlv> {
        vec![super::security_info(oids::ID_TA, 2, None)]
    }

    fn clear_selection(&mut self) {
        self.state = State::Idle;
    }

    fn reset(&mut self) {
        self.state = State::Idle;
    }
}

impl Default for TerminalAuthProtocol {
    fn default() -> Self {
        TerminalAuthProtocol::new()
    }
}

/// Role descent along a chain: CVCA issues link, DV and terminal
/// certificates; a DV issues terminal certificates only.
fn role_may_issue(issuer: CvRole, subject: CvRole) -> bool {
    match issuer {
        CvRole::Cvca => true,
        CvRole::DvDomestic | CvRole::DvForeign => subject == CvRole::Terminal,
        CvRole::Terminal => false,
    }
}
