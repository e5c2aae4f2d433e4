//! Restricted identification: sector-specific pseudonyms.
//!
//! The terminal presents a sector public key; the card agrees it with its
//! static RI key and hashes the result into a pseudonym that is stable per
//! sector but unlinkable across sectors. The mechanism records only that it
//! ran; access to the RI key is gated by its own use policy (typically
//! terminal authentication with the matching authorization bit).

use crate::apdu::{ins, CommandApdu, ResponseApdu, Status};
use crate::cardobjects::{ObjectKind, ObjectTree, Operation};
use crate::crypto;
use crate::oids;
use crate::secstatus::SecurityStatus;
use crate::tlv::{self, Tlv};

use super::{
    command_oid, dynamic_auth_response, dynamic_auth_template, find_key, mse, p1p2, template_field,
    CardProtocol,
};

/// First and second sector public key data objects of the template.
const SECTOR_FIRST: &[u8] = &[0xA0];
const SECTOR_SECOND: &[u8] = &[0xA2];

enum State {
    Idle,
    Selected { oid: Vec<u8>, key_id: u8 },
}

pub struct RestrictedIdProtocol {
    state: State,
}

impl RestrictedIdProtocol {
    pub fn new() -> Self {
        RestrictedIdProtocol { state: State::Idle }
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
        if oid != oids::RI_ECDH_SHA_1 && oid != oids::RI_ECDH_SHA_256 {
            return Status::ReferenceNotFound.into();
        }
        let key_id = match template_field(&objects, tlv::tags::CONTEXT_4) {
            Some([key_id]) => *key_id,
            Some(_) => return Status::IncorrectData.into(),
            None => return Status::IncorrectData.into(),
        };

        let object_id = match find_key(tree, key_id, oids::ID_RI) {
            Some(object_id) => object_id,
            None => return Status::ReferenceNotFound.into(),
        };
        match tree.check_access(object_id, Operation::Use, status) {
            Ok(true) => {}
            _ => return Status::SecurityStatusNotSatisfied.into(),
        }

        debug!(key_id, "restricted identification key selected");
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
        let sector_object = tlv::find_first(&children, SECTOR_FIRST)
            .or_else(|| tlv::find_first(&children, SECTOR_SECOND));
        let sector_raw = match sector_object.map(std::slice::from_ref) {
            Some(objects) => match tlv::find_recursive(objects, tlv::tags::CONTEXT_6)
                .first()
                .and_then(|object| tlv::primitive_value(object))
            {
                Some(sector_raw) => sector_raw,
                None => return Status::IncorrectData.into(),
            },
            None => return Status::IncorrectData.into(),
        };

        let object_id = match find_key(tree, key_id, oids::ID_RI) {
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

        let sector_key = match key.params.reconstruct_public_key(sector_raw) {
            Ok(sector_key) => sector_key,
            Err(_) => return Status::IncorrectData.into(),
        };
        let shared = match key.params.mul(&sector_key, &key.private) {
            Ok(shared) => shared,
            Err(_) => return Status::IncorrectData.into(),
        };
        let agreement = match key.params.agreement_bytes(&shared) {
            Ok(agreement) => agreement,
            Err(_) => return Status::IncorrectData.into(),
        };

        let pseudonym = if oid == oids::RI_ECDH_SHA_1 {
            crypto::sha1(&agreement).to_vec()
        } else {
            crypto::sha256(&agreement).to_vec()
        };
        status.grant_ri();
        info!(key_id, "sector pseudonym derived");
        dynamic_auth_response(&[(tlv::tags::CONTEXT_1, &pseudonym)])
    }
}

impl CardProtocol for RestrictedIdProtocol {
    fn name(&self) -> &'static str {
        "RI"
    }

    fn handles(&self, command: &CommandApdu) -> bool {
        match command.ins {
            ins::MSE_SET => {
                p1p2(command) == mse::SET_AT_INTERNAL
                    && command_oid(command).map_or(false, |oid| oids::in_family(&oid, oids::ID_RI))
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
        for key_id in 0u8..=31 {
            if find_key(tree, key_id, oids::ID_RI).is_some() {
                infos.push(super::security_info(oids::RI_ECDH_SHA_256, 1, Some(key_id)));
            }
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

impl Default for RestrictedIdProtocol {
    fn default() -> Self {
        RestrictedIdProtocol::new()
    }
}
