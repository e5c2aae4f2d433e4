//! Chip authentication version 2.
//!
//! The terminal presents an ephemeral public key, the card computes a key
//! agreement against its static key and answers with a nonce and an
//! authentication token. The derived keys replace the PACE channel. When a
//! terminal authentication preceded, the presented key must be the one the
//! terminal committed to in its TA template.

use crate::apdu::{ins, CommandApdu, ResponseApdu, Status};
use crate::cardobjects::{Identifier, ObjectKind, ObjectTree, Operation};
use crate::crypto;
use crate::oids;
use crate::secstatus::{SecurityStatus, SessionKeys};
use crate::tlv::{self, Tlv};

use super::{
    command_oid, compress, dynamic_auth_response, dynamic_auth_template, find_key, mse, p1p2,
    public_key_object, template_field, CardProtocol,
};

enum State {
    Idle,
    Selected { oid: Vec<u8>, key_id: u8 },
}

pub struct ChipAuthProtocol {
    state: State,
}

impl ChipAuthProtocol {
    pub fn new() -> Self {
        ChipAuthProtocol { state: State::Idle }
    }

    fn set_at(&mut self, command: &CommandApdu, tree: &ObjectTree, status: &SecurityStatus) -> ResponseApdu {
        self.state = State::Idle;

        let objects = match tlv::parse(&command.data) {
            Ok(objects) => objects,
            Err(_) => return Status::IncorrectData.into(),
        };
        let oid = match template_field(&objects, tlv::tags::CONTEXT_0) {
            Some(oid) => oid.to_vec(),
            None => return Status::IncorrectData.into(),
        };
        if oid != oids::CA_ECDH_AES_CBC_CMAC_128 && oid != oids::CA_DH_AES_CBC_CMAC_128 {
            return Status::ReferenceNotFound.into();
        }
        let key_id = match template_field(&objects, tlv::tags::CONTEXT_4) {
            Some([key_id]) => *key_id,
            Some(_) => return Status::IncorrectData.into(),
            None => return Status::IncorrectData.into(),
        };

        let object_id = match find_key(tree, key_id, oids::ID_CA) {
            Some(object_id) => object_id,
            None => return Status::ReferenceNotFound.into(),
        };
        match tree.check_access(object_id, Operation::Use, status) {
            Ok(true) => {}
            _ => return Status::SecurityStatusNotSatisfied.into(),
        }

        debug!(key_id, "chip authentication key selected");
        self.state = State::Selected { oid, key_id };
        Status::Ok.into()
    }

    fn general_authenticate(
        &mut self,
        command: &CommandApdu,
        tree: &ObjectTree,
        status: &mut SecurityStatus,
    ) -> ResponseApdu {
        let (oid, key_id) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Selected { oid, key_id } => (oid, key_id),
            State::Idle => return Status::ConditionsNotSatisfied.into(),
        };

        let children = match dynamic_auth_template(command) {
            Ok(children) => children,
            Err(word) => return word.into(),
        };
        let terminal_raw = match template_field(&children, tlv::tags::CONTEXT_0) {
            Some(terminal_raw) => terminal_raw,
            None => return Status::IncorrectData.into(),
        };

        let object_id = match find_key(tree, key_id, oids::ID_CA) {
            Some(object_id) => object_id,
            None => return Status::ReferenceNotFound.into(),
        };
        let key = match tree.get(object_id) {
            Ok(object) => match &object.kind {
                ObjectKind::Key(key) => key,
                _ => return Status::ReferenceNotFound.into(),
            },
            Err(_) => return Status::ReferenceNotFound.into(),
        };

        let terminal_key = match key.params.reconstruct_public_key(terminal_raw) {
            Ok(terminal_key) => terminal_key,
            Err(_) => return Status::IncorrectData.into(),
        };

        // A preceding TA pins the ephemeral key the terminal may use here.
        if let Some(ta) = status.ta() {
            let compressed = match compress(&key.params, &terminal_key) {
                Ok(compressed) => compressed,
                Err(_) => return Status::IncorrectData.into(),
            };
            if compressed != ta.ephemeral_key {
                warn!("chip authentication key differs from the TA commitment");
                return Status::SecurityStatusNotSatisfied.into();
            }
        }

        let shared = match key.params.mul(&terminal_key, &key.private) {
            Ok(shared) => shared,
            Err(_) => return Status::IncorrectData.into(),
        };
        let agreement = match key.params.agreement_bytes(&shared) {
            Ok(agreement) => agreement,
            Err(_) => return Status::IncorrectData.into(),
        };

        let mut nonce = [0u8; 8];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

        // Session keys bind the nonce: KDF(K || r, counter).
        let mut secret = agreement;
        secret.extend_from_slice(&nonce);
        let enc = crypto::kdf_enc(&secret);
        let mac = crypto::kdf_mac(&secret);

        let token_input = match public_key_object(&oid, &key.params, &terminal_key) {
            Ok(token_input) => token_input,
            Err(_) => return Status::IncorrectData.into(),
        };
        let token = crypto::auth_token(&mac, &token_input);

        status.grant_ca(SessionKeys { enc, mac });
        info!(key_id, "chip authentication completed");
        dynamic_auth_response(&[
            (tlv::tags::CONTEXT_1, &nonce),
            (tlv::tags::CONTEXT_2, &token),
        ])
    }
}

impl CardProtocol for ChipAuthProtocol {
    fn name(&self) -> &'static str {
        "CA"
    }

    fn handles(&self, command: &CommandApdu) -> bool {
        match command.ins {
            ins::MSE_SET => {
                p1p2(command) == mse::SET_AT_INTERNAL
                    && command_oid(command).map_or(false, |oid| oids::in_family(&oid, oids::ID_CA))
            }
            ins::GENERAL_AUTHENTICATE => matches!(self.state, State::Selected { .. }),
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
            ins::MSE_SET => self.set_at(command, tree, status),
            ins::GENERAL_AUTHENTICATE => self.general_authenticate(command, tree, status),
            _ => Status::InstructionNotSupported.into(),
        }
    }

    fn security_infos(&self, tree: &ObjectTree) -> Vec<Tlv> {
        let mut infos = Vec::new();
        for (key_id, oid) in ca_keys(tree) {
            infos.push(super::security_info(&oid, 2, Some(key_id)));
        }
        infos
    }

    fn clear_selection(&mut self) {
        self.state = State::Idle;
    }

    fn reset(&mut self) {
        self.state = State::Idle;
    }
}

impl Default for ChipAuthProtocol {
    fn default() -> Self {
        ChipAuthProtocol::new()
    }
}

/// All chip-authentication keys in the tree with their cipher-suite OID.
fn ca_keys(tree: &ObjectTree) -> Vec<(u8, Vec<u8>)> {
    use crate::domain_params::DomainParameterSet;

    fn walk(tree: &ObjectTree, id: crate::cardobjects::ObjectId, keys: &mut Vec<(u8, Vec<u8>)>) {
        if let Ok(object) = tree.get(id) {
            if let ObjectKind::Key(key) = &object.kind {
                let is_ca = object
                    .identifiers
                    .iter()
                    .any(|identifier| *identifier == Identifier::Oid(oids::ID_CA.to_vec()));
                if is_ca {
                    let key_id = object.identifiers.iter().find_map(|identifier| match identifier {
                        Identifier::KeyId(key_id) => Some(*key_id),
                        _ => None,
                    });
                    if let Some(key_id) = key_id {
                        let oid = match key.params {
                            DomainParameterSet::Ec(_) => oids::CA_ECDH_AES_CBC_CMAC_128,
                            DomainParameterSet::Dh(_) => oids::CA_DH_AES_CBC_CMAC_128,
                        };
                        keys.push((key_id, oid.to_vec()));
                    }
                }
            }
        }
        if let Ok(children) = tree.children(id) {
            for child in children.to_vec() {
                walk(tree, child, keys);
            }
        }
    }

    let mut keys = Vec::new();
    walk(tree, tree.root(), &mut keys);
    keys
}
