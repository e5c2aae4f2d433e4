//! Password Authenticated Connection Establishment with generic mapping.
//!
//! The exchange is MSE:SET AT followed by four GENERAL AUTHENTICATE steps:
//! encrypted nonce, mapping, key agreement, mutual authentication. Any
//! failed step drops back to idle without touching the session status; the
//! retry counter of a retry-limited password moves only on a token mismatch
//! (wrong password) and is restored to its maximum on full success.

use num_bigint_dig::BigUint;

use crate::apdu::{ins, CommandApdu, ResponseApdu, Status};
use crate::cardobjects::{ObjectKind, ObjectTree};
use crate::crypto;
use crate::domain_params::{DomainParameterSet, GroupElement};
use crate::ec::EcGroup;
use crate::oids;
use crate::secstatus::{Authorization, PaceOutcome, SecurityStatus, SessionKeys, TerminalType};
use crate::tlv::{self, Tlv};

use super::{
    command_oid, compress, dynamic_auth_response, dynamic_auth_template, find_password, mse, p1p2,
    public_key_object, resolve_domain_params, template_field, CardProtocol,
};

/// Parameter-set id assumed when MSE:SET AT carries no reference.
const DEFAULT_PARAMETER_ID: u8 = 13;

#[derive(Debug, Clone)]
struct Selection {
    oid: Vec<u8>,
    password_ref: u8,
    params: DomainParameterSet,
    chat: Option<(TerminalType, Authorization)>,
}

enum State {
    Idle,
    TemplateSet(Selection),
    NonceSent {
        selection: Selection,
        nonce: Vec<u8>,
    },
    Mapped {
        selection: Selection,
        mapped: DomainParameterSet,
    },
    KeyAgreed {
        selection: Selection,
        enc: [u8; 16],
        mac: [u8; 16],
        card_key: GroupElement,
        terminal_key: GroupElement,
        id_picc: Vec<u8>,
    },
}

pub struct PaceProtocol {
    state: State,
}

impl PaceProtocol {
    pub fn new() -> Self {
        PaceProtocol { state: State::Idle }
    }

    fn set_template(&mut self, command: &CommandApdu, tree: &ObjectTree) -> ResponseApdu {
        // A fresh MSE:SET AT always discards any run in progress.
        self.state = State::Idle;

        let objects = match tlv::parse(&command.data) {
            Ok(objects) => objects,
            Err(_) => return Status::IncorrectData.into(),
        };
        let oid = match super::template_field(&objects, tlv::tags::CONTEXT_0) {
            Some(oid) => oid.to_vec(),
            None => return Status::IncorrectData.into(),
        };
        if oid != oids::PACE_ECDH_GM_AES_CBC_CMAC_128 && oid != oids::PACE_DH_GM_AES_CBC_CMAC_128 {
            return Status::ReferenceNotFound.into();
        }

        let password_ref = match super::template_field(&objects, tlv::tags::CONTEXT_3) {
            Some([password_ref]) => *password_ref,
            Some(_) => return Status::IncorrectData.into(),
            None => return Status::IncorrectData.into(),
        };
        let password_id = match find_password(tree, password_ref) {
            Some(id) => id,
            None => return Status::ReferenceNotFound.into(),
        };

        let parameter_id = match super::template_field(&objects, tlv::tags::CONTEXT_4) {
            Some([parameter_id]) => *parameter_id,
            Some(_) => return Status::IncorrectData.into(),
            None => DEFAULT_PARAMETER_ID,
        };
        let params = match resolve_domain_params(tree, parameter_id) {
            Some(params) => params,
            None => return Status::ReferenceNotFound.into(),
        };
        let suite_matches = match params {
            DomainParameterSet::Ec(_) => oid == oids::PACE_ECDH_GM_AES_CBC_CMAC_128,
            DomainParameterSet::Dh(_) => oid == oids::PACE_DH_GM_AES_CBC_CMAC_128,
        };
        if !suite_matches {
            return Status::IncorrectData.into();
        }

        let chat = match parse_chat(&objects) {
            Ok(chat) => chat,
            Err(status) => return status.into(),
        };

        // Password prechecks: the run is only admitted for an activated,
        // unblocked password; a started counter is reported as a warning.
        let object = match tree.get(password_id) {
            Ok(object) => object,
            Err(_) => return Status::ReferenceNotFound.into(),
        };
        if !object.life_cycle.usable_for_authentication() {
            return Status::ReferenceDeactivated.into();
        }
        let warning = match &object.kind {
            ObjectKind::Password(password) => {
                if password.is_blocked() {
                    return Status::AuthMethodBlocked.into();
                }
                password
                    .retry
                    .as_ref()
                    .filter(|retry| retry.remaining < retry.limit)
                    .map(|retry| Status::RetriesRemaining(retry.remaining))
            }
            _ => return Status::ReferenceNotFound.into(),
        };

        debug!(password_ref, parameter_id, "PACE template set");
        self.state = State::TemplateSet(Selection {
            oid,
            password_ref,
            params,
            chat,
        });
        warning.unwrap_or(Status::Ok).into()
    }

    fn send_nonce(&mut self, selection: Selection, tree: &ObjectTree) -> ResponseApdu {
        let password = match password_value(tree, selection.password_ref) {
            Some(password) => password,
            None => return Status::ReferenceNotFound.into(),
        };
        let mut nonce = vec![0u8; crypto::BLOCK_SIZE];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

        let key = crypto::kdf_pi(&password);
        let encrypted = match crypto::aes_cbc_encrypt(&key, &nonce) {
            Ok(encrypted) => encrypted,
            Err(_) => return Status::IncorrectData.into(),
        };

        let response = dynamic_auth_response(&[(tlv::tags::CONTEXT_0, &encrypted)]);
        self.state = State::NonceSent { selection, nonce };
        response
    }

    fn map_nonce(&mut self, selection: Selection, nonce: Vec<u8>, terminal_mapping: &[u8]) -> ResponseApdu {
        let terminal_key = match selection.params.reconstruct_public_key(terminal_mapping) {
            Ok(key) => key,
            Err(_) => return Status::IncorrectData.into(),
        };

        let mut rng = rand::thread_rng();
        let secret = selection.params.random_scalar(&mut rng);
        let card_key = match selection.params.mul(&selection.params.generator(), &secret) {
            Ok(key) => key,
            Err(_) => return Status::IncorrectData.into(),
        };
        let shared = match selection.params.mul(&terminal_key, &secret) {
            Ok(shared) => shared,
            Err(_) => return Status::IncorrectData.into(),
        };

        // Generic mapping: g' = g^s * h, with s the nonce as an integer.
        let s = BigUint::from_bytes_be(&nonce) % selection.params.order();
        let g_s = match selection.params.mul(&selection.params.generator(), &s) {
            Ok(element) => element,
            Err(_) => return Status::IncorrectData.into(),
        };
        let new_generator = match selection.params.combine(&g_s, &shared) {
            Ok(element) => element,
            Err(_) => return Status::IncorrectData.into(),
        };
        let mapped = match with_generator(&selection.params, &new_generator) {
            Ok(mapped) => mapped,
            Err(_) => return Status::IncorrectData.into(),
        };

        let encoded = match selection.params.encode_element(&card_key) {
            Ok(encoded) => encoded,
            Err(_) => return Status::IncorrectData.into(),
        };
        let response = dynamic_auth_response(&[(tlv::tags::CONTEXT_2, &encoded)]);
        self.state = State::Mapped { selection, mapped };
        response
    }

    fn agree_keys(&mut self, selection: Selection, mapped: DomainParameterSet, terminal_raw: &[u8]) -> ResponseApdu {
        let terminal_key = match mapped.reconstruct_public_key(terminal_raw) {
            Ok(key) => key,
            Err(_) => return Status::IncorrectData.into(),
        };

        let mut rng = rand::thread_rng();
        let secret = mapped.random_scalar(&mut rng);
        let card_key = match mapped.mul(&mapped.generator(), &secret) {
            Ok(key) => key,
            Err(_) => return Status::IncorrectData.into(),
        };
        if card_key == terminal_key {
            return Status::IncorrectData.into();
        }
        let shared = match mapped.mul(&terminal_key, &secret) {
            Ok(shared) => shared,
            Err(_) => return Status::IncorrectData.into(),
        };
        let agreement = match mapped.agreement_bytes(&shared) {
            Ok(agreement) => agreement,
            Err(_) => return Status::IncorrectData.into(),
        };
        let id_picc = match compress(&mapped, &card_key) {
            Ok(id_picc) => id_picc,
            Err(_) => return Status::IncorrectData.into(),
        };

        let encoded = match mapped.encode_element(&card_key) {
            Ok(encoded) => encoded,
            Err(_) => return Status::IncorrectData.into(),
        };
        let response = dynamic_auth_response(&[(tlv::tags::CONTEXT_4, &encoded)]);
        self.state = State::KeyAgreed {
            enc: crypto::kdf_enc(&agreement),
            mac: crypto::kdf_mac(&agreement),
            card_key,
            terminal_key,
            id_picc,
            selection,
        };
        response
    }

    #[allow(clippy::too_many_arguments)]
    fn mutual_authenticate(
        &mut self,
        selection: Selection,
        enc: [u8; 16],
        mac: [u8; 16],
        card_key: GroupElement,
        terminal_key: GroupElement,
        id_picc: Vec<u8>,
        terminal_token: &[u8],
        tree: &mut ObjectTree,
        status: &mut SecurityStatus,
    ) -> ResponseApdu {
        let expected_input = match public_key_object(&selection.oid, &selection.params, &card_key) {
            Ok(input) => input,
            Err(_) => return Status::IncorrectData.into(),
        };
        let expected = crypto::auth_token(&mac, &expected_input);

        if terminal_token != expected {
            // The only mismatch reachable with well-formed data is a wrong
            // password, so this is where the retry counter moves.
            let response = punish_wrong_password(tree, selection.password_ref);
            warn!(password_ref = selection.password_ref, "PACE token mismatch");
            return response;
        }

        let token_input = match public_key_object(&selection.oid, &selection.params, &terminal_key) {
            Ok(input) => input,
            Err(_) => return Status::IncorrectData.into(),
        };
        let card_token = crypto::auth_token(&mac, &token_input);

        restore_retry_counter(tree, selection.password_ref);

        let mut fields: Vec<(&[u8], Vec<u8>)> = vec![(tlv::tags::CONTEXT_6, card_token.to_vec())];
        if selection.chat.is_some() {
            if let Some(car) = current_trust_point_car(tree) {
                fields.push((tlv::tags::CONTEXT_7, car));
            }
        }
        let borrowed: Vec<(&[u8], &[u8])> = fields
            .iter()
            .map(|(tag, value)| (*tag, value.as_slice()))
            .collect();
        let response = dynamic_auth_response(&borrowed);

        status.grant_pace(
            PaceOutcome {
                password_ref: selection.password_ref,
                requested_chat: selection.chat,
                id_picc,
            },
            SessionKeys { enc, mac },
        );
        info!(password_ref = selection.password_ref, "PACE completed");
        response
    }
}

impl CardProtocol for PaceProtocol {
    fn name(&self) -> &'static str {
        "PACE"
    }

    fn handles(&self, command: &CommandApdu) -> bool {
        match command.ins {
            ins::MSE_SET => {
                p1p2(command) == mse::SET_AT_AUTH
                    && command_oid(command).map_or(false, |oid| oids::in_family(&oid, oids::ID_PACE))
            }
            ins::GENERAL_AUTHENTICATE => !matches!(self.state, State::Idle),
            _ => false,
        }
    }

    fn process(
        &mut self,
        command: &CommandApdu,
        tree: &mut ObjectTree,
        status: &mut SecurityStatus,
    ) -> ResponseApdu {
        if command.ins == ins::MSE_SET {
            return self.set_template(command, tree);
        }

        let children = match dynamic_auth_template(command) {
            Ok(children) => children,
            Err(word) => {
                self.state = State::Idle;
                return word.into();
            }
        };

        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => Status::ConditionsNotSatisfied.into(),
            State::TemplateSet(selection) => {
                if !children.is_empty() {
                    return Status::IncorrectData.into();
                }
                self.send_nonce(selection, tree)
            }
            State::NonceSent { selection, nonce } => {
                match template_field(&children, tlv::tags::CONTEXT_1) {
                    Some(mapping) => self.map_nonce(selection, nonce, mapping),
                    None => Status::IncorrectData.into(),
                }
            }
            State::Mapped { selection, mapped } => {
                match template_field(&children, tlv::tags::CONTEXT_3) {
                    Some(terminal) => self.agree_keys(selection, mapped, terminal),
                    None => Status::IncorrectData.into(),
                }
            }
            State::KeyAgreed {
                selection,
                enc,
                mac,
                card_key,
                terminal_key,
                id_picc,
            } => match template_field(&children, tlv::tags::CONTEXT_5) {
                Some(token) => self.mutual_authenticate(
                    selection,
                    enc,
                    mac,
                    card_key,
                    terminal_key,
                    id_picc,
                    token,
                    tree,
                    status,
                ),
                None => Status::IncorrectData.into(),
            },
        }
    }

    fn security_infos(&self, tree: &ObjectTree) -> Vec<Tlv> {
        let mut infos = Vec::new();
        for parameter_id in [DEFAULT_PARAMETER_ID] {
            if let Some(params) = resolve_domain_params(tree, parameter_id) {
                let oid = match params {
                    DomainParameterSet::Ec(_) => oids::PACE_ECDH_GM_AES_CBC_CMAC_128,
                    DomainParameterSet::Dh(_) => oids::PACE_DH_GM_AES_CBC_CMAC_128,
                };
                infos.push(super::security_info(oid, 2, Some(parameter_id)));
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

impl Default for PaceProtocol {
    fn default() -> Self {
        PaceProtocol::new()
    }
}

/// Swaps the generator of a parameter set, keeping the group itself.
fn with_generator(params: &DomainParameterSet, generator: &GroupElement) -> crate::Result<DomainParameterSet> {
    match (params, generator) {
        (DomainParameterSet::Ec(group), GroupElement::Ec(crate::ec::EcPoint::Affine { x, y })) => {
            Ok(DomainParameterSet::Ec(EcGroup {
                gx: x.clone(),
                gy: y.clone(),
                ..group.clone()
            }))
        }
        (DomainParameterSet::Dh(group), GroupElement::Dh(value)) => {
            let mut mapped = group.clone();
            mapped.g = value.clone();
            Ok(DomainParameterSet::Dh(mapped))
        }
        _ => Err(crate::Error::new(
            crate::ErrorKind::InvalidKeyMaterial,
            "mapped generator is degenerate",
        )),
    }
}

fn parse_chat(objects: &[Tlv]) -> Result<Option<(TerminalType, Authorization)>, Status> {
    let chat = match tlv::find_first(objects, tlv::tags::CHAT) {
        Some(chat) => chat,
        None => return Ok(None),
    };
    let children = tlv::children(chat).ok_or(Status::IncorrectData)?;
    let role_oid = template_field(children, tlv::tags::OID).ok_or(Status::IncorrectData)?;
    let terminal_type = TerminalType::from_oid(role_oid).ok_or(Status::IncorrectData)?;
    let auth_bytes = template_field(children, tlv::tags::DISCRETIONARY_DATA).ok_or(Status::IncorrectData)?;
    Ok(Some((terminal_type, Authorization::from_chat_bytes(auth_bytes))))
}

fn password_value(tree: &ObjectTree, password_ref: u8) -> Option<Vec<u8>> {
    let id = find_password(tree, password_ref)?;
    match &tree.get(id).ok()?.kind {
        ObjectKind::Password(password) => Some(password.value.to_vec()),
        _ => None,
    }
}

/// Decrements the retry counter of a retry-limited password and reports the
/// outcome; passwords without a counter answer with a plain failure.
fn punish_wrong_password(tree: &mut ObjectTree, password_ref: u8) -> ResponseApdu {
    let Some(id) = find_password(tree, password_ref) else {
        return Status::VerificationFailed.into();
    };
    let Ok(object) = tree.get_mut(id) else {
        return Status::VerificationFailed.into();
    };
    if let ObjectKind::Password(password) = &mut object.kind {
        if let Some(retry) = &mut password.retry {
            retry.decrement();
            return Status::RetriesRemaining(retry.remaining).into();
        }
    }
    Status::VerificationFailed.into()
}

fn restore_retry_counter(tree: &mut ObjectTree, password_ref: u8) {
    if let Some(id) = find_password(tree, password_ref) {
        if let Ok(object) = tree.get_mut(id) {
            if let ObjectKind::Password(password) = &mut object.kind {
                if let Some(retry) = &mut password.retry {
                    retry.reset();
                }
            }
        }
    }
}

/// CAR of the current trust point, reported to terminals that announced a
/// terminal-authentication intent in their CHAT.
fn current_trust_point_car(tree: &ObjectTree) -> Option<Vec<u8>> {
    super::find_trust_point(tree, None).map(|trust_point| trust_point.car)
}
