//! Protocol state machines and the dispatch contract between them.
//!
//! Each mechanism (PACE, terminal/chip authentication, restricted
//! identification) plus the file and password management commands is one
//! [CardProtocol]. The card holds them in a fixed order and routes every
//! command to the first protocol that claims it; unclaimed commands answer
//! with "instruction not supported".

pub mod ca;
pub mod cv_cert;
pub mod file_ops;
pub mod pace;
pub mod pin_ops;
pub mod ri;
pub mod ta;

pub use ca::ChipAuthProtocol;
pub use file_ops::FileProtocol;
pub use pace::PaceProtocol;
pub use pin_ops::PasswordProtocol;
pub use ri::RestrictedIdProtocol;
pub use ta::TerminalAuthProtocol;

use crate::apdu::{CommandApdu, ResponseApdu, Status};
use crate::cardobjects::ObjectTree;
use crate::secstatus::SecurityStatus;
use crate::tlv::{self, Tlv};

/// A protocol able to claim and process command APDUs.
///
/// `handles` inspects the instruction byte and, for the shared generic
/// instructions (MSE:SET, GENERAL AUTHENTICATE), the protocol's own
/// selection state established by a preceding MSE:SET. `process` is only
/// called after `handles` returned true.
pub trait CardProtocol {
    fn name(&self) -> &'static str;

    fn handles(&self, command: &CommandApdu) -> bool;

    fn process(
        &mut self,
        command: &CommandApdu,
        tree: &mut ObjectTree,
        status: &mut SecurityStatus,
    ) -> ResponseApdu;

    /// TLV security-info objects this protocol contributes to the card's
    /// discovery file. The assembling of that file is up to the caller.
    fn security_infos(&self, _tree: &ObjectTree) -> Vec<Tlv> {
        Vec::new()
    }

    /// Drops a pending selection made by an earlier MSE:SET. Called when a
    /// later MSE:SET is claimed by a different protocol, so exactly one
    /// selection is in force at a time; mechanisms already registered in
    /// the security status are unaffected.
    fn clear_selection(&mut self) {}

    /// Drops all transient state, as on card reset.
    fn reset(&mut self);
}

/// The standard protocol set in dispatch order.
pub fn default_protocols() -> Vec<Box<dyn CardProtocol>> {
    vec![
        Box::new(PaceProtocol::new()),
        Box::new(TerminalAuthProtocol::new()),
        Box::new(ChipAuthProtocol::new()),
        Box::new(RestrictedIdProtocol::new()),
        Box::new(PasswordProtocol::new()),
        Box::new(FileProtocol::new()),
    ]
}

/// Well-known password object identifiers of the personalization layout.
pub mod password {
    pub const MRZ: u8 = 1;
    pub const CAN: u8 = 2;
    pub const PIN: u8 = 3;
    pub const PUK: u8 = 4;
}

/// P1-P2 combinations of the MSE:SET variants.
pub mod mse {
    /// Set authentication template for mutual authentication (PACE, TA).
    pub const SET_AT_AUTH: (u8, u8) = (0xC1, 0xA4);
    /// Set authentication template for internal authentication (CA, RI).
    pub const SET_AT_INTERNAL: (u8, u8) = (0x41, 0xA4);
    /// Set digital signature template for verification (TA chain).
    pub const SET_DST: (u8, u8) = (0x81, 0xB6);
}

pub(crate) fn p1p2(command: &CommandApdu) -> (u8, u8) {
    (command.p1, command.p2)
}

/// The cryptographic mechanism reference (tag 80) of an MSE:SET command
/// body, without reporting malformed bodies: `handles` peeks, `process`
/// validates.
pub(crate) fn command_oid(command: &CommandApdu) -> Option<Vec<u8>> {
    let objects = tlv::parse(&command.data).ok()?;
    let object = tlv::find_first(&objects, tlv::tags::CONTEXT_0)?;
    tlv::primitive_value(object).map(<[u8]>::to_vec)
}

/// Parses the single dynamic authentication template (tag 7C) of a GENERAL
/// AUTHENTICATE body and returns its children.
pub(crate) fn dynamic_auth_template(command: &CommandApdu) -> Result<Vec<Tlv>, Status> {
    let objects = tlv::parse(&command.data).map_err(|_| Status::IncorrectData)?;
    if objects.len() != 1 {
        return Err(Status::IncorrectData);
    }
    let template = tlv::find_first(&objects, tlv::tags::DYNAMIC_AUTH_TEMPLATE).ok_or(Status::IncorrectData)?;
    match tlv::children(template) {
        Some(children) => Ok(children.to_vec()),
        // An empty template parses as a primitive with an empty value.
        None if tlv::primitive_value(template).map_or(false, <[u8]>::is_empty) => Ok(Vec::new()),
        None => Err(Status::IncorrectData),
    }
}

/// The value of a primitive child with the given tag, if present.
pub(crate) fn template_field<'a>(children: &'a [Tlv], tag: &[u8]) -> Option<&'a [u8]> {
    tlv::find_first(children, tag).and_then(tlv::primitive_value)
}

/// Builds a dynamic authentication template response carrying the given
/// primitive fields, in order.
pub(crate) fn dynamic_auth_response(fields: &[(&[u8], &[u8])]) -> ResponseApdu {
    let children = fields
        .iter()
        .map(|(tag, value)| tlv::prim(tag, value))
        .collect();
    let template = tlv::cons(tlv::tags::DYNAMIC_AUTH_TEMPLATE, children);
    ResponseApdu::new(Status::Ok, template.to_vec())
}

/// Finds a password object by its auth-object identifier anywhere under
/// the master file.
pub(crate) fn find_password(tree: &ObjectTree, auth_id: u8) -> Option<crate::cardobjects::ObjectId> {
    use crate::cardobjects::{IdMatcher, Identifier, ObjectKind};
    let id = tree.find_descendant(tree.root(), &[IdMatcher::exactly(Identifier::AuthId(auth_id))])?;
    match tree.get(id) {
        Ok(object) if matches!(object.kind, ObjectKind::Password(_)) => Some(id),
        _ => None,
    }
}

/// Finds a key object by its key identifier and protocol-family OID.
pub(crate) fn find_key(tree: &ObjectTree, key_id: u8, family: &[u8]) -> Option<crate::cardobjects::ObjectId> {
    use crate::cardobjects::{IdMatcher, Identifier, ObjectKind};
    let id = tree.find_descendant(
        tree.root(),
        &[
            IdMatcher::exactly(Identifier::KeyId(key_id)),
            IdMatcher::exactly(Identifier::Oid(family.to_vec())),
        ],
    )?;
    match tree.get(id) {
        Ok(object) if matches!(object.kind, ObjectKind::Key(_)) => Some(id),
        _ => None,
    }
}

/// Resolves a domain-parameter reference: a personalized domain-parameter
/// object wins over the standardized table.
pub(crate) fn resolve_domain_params(
    tree: &ObjectTree,
    id: u8,
) -> Option<crate::domain_params::DomainParameterSet> {
    use crate::cardobjects::{IdMatcher, Identifier, ObjectKind};
    if let Some(object_id) =
        tree.find_descendant(tree.root(), &[IdMatcher::exactly(Identifier::KeyId(id))])
    {
        if let Ok(object) = tree.get(object_id) {
            if let ObjectKind::DomainParams(params) = &object.kind {
                return Some(params.clone());
            }
        }
    }
    crate::domain_params::standardized_by_id(id).ok()
}

/// Finds a certificate-chain trust point, optionally constrained to a
/// specific certification authority reference.
pub(crate) fn find_trust_point(
    tree: &ObjectTree,
    car: Option<&[u8]>,
) -> Option<crate::cardobjects::TrustPoint> {
    use crate::cardobjects::{ObjectId, ObjectKind};
    fn walk(tree: &ObjectTree, id: ObjectId, car: Option<&[u8]>) -> Option<crate::cardobjects::TrustPoint> {
        if let Ok(object) = tree.get(id) {
            if let ObjectKind::TrustPoint(trust_point) = &object.kind {
                if car.map_or(true, |car| trust_point.car == car) {
                    return Some(trust_point.clone());
                }
            }
        }
        for child in tree.children(id).ok()?.to_vec() {
            if let Some(found) = walk(tree, child, car) {
                return Some(found);
            }
        }
        None
    }
    walk(tree, tree.root(), car)
}

/// The card's current date, if a date object is personalized.
pub(crate) fn current_date(tree: &ObjectTree) -> Option<time::Date> {
    use crate::cardobjects::{ObjectId, ObjectKind};
    fn walk(tree: &ObjectTree, id: ObjectId) -> Option<time::Date> {
        if let Ok(object) = tree.get(id) {
            if let ObjectKind::CurrentDate(date) = &object.kind {
                return Some(*date);
            }
        }
        for child in tree.children(id).ok()?.to_vec() {
            if let Some(date) = walk(tree, child) {
                return Some(date);
            }
        }
        None
    }
    walk(tree, tree.root())
}

/// Moves the card's date forward; earlier dates are ignored.
pub(crate) fn advance_current_date(tree: &mut ObjectTree, date: time::Date) {
    use crate::cardobjects::{ObjectId, ObjectKind};
    fn walk(tree: &mut ObjectTree, id: ObjectId, date: time::Date) -> bool {
        if let Ok(object) = tree.get_mut(id) {
            if let ObjectKind::CurrentDate(current) = &mut object.kind {
                if date > *current {
                    *current = date;
                }
                return true;
            }
        }
        let children = match tree.children(id) {
            Ok(children) => children.to_vec(),
            Err(_) => return false,
        };
        children.into_iter().any(|child| walk(tree, child, date))
    }
    walk(tree, tree.root(), date);
}

/// Key compression per TR-03110: the x coordinate for EC keys, a SHA-1
/// digest of the encoding for DH keys.
pub(crate) fn compress(
    params: &crate::domain_params::DomainParameterSet,
    element: &crate::domain_params::GroupElement,
) -> crate::Result<Vec<u8>> {
    use crate::domain_params::DomainParameterSet;
    match params {
        DomainParameterSet::Ec(_) => params.agreement_bytes(element),
        DomainParameterSet::Dh(_) => {
            let encoded = params.encode_element(element)?;
            Ok(crate::crypto::sha1(&encoded).to_vec())
        }
    }
}

/// Ephemeral public key data object (tag 7F49) fed into the authentication
/// token MAC: the protocol OID plus the encoded key under tag 86 (EC) or
/// 84 (DH).
pub(crate) fn public_key_object(
    oid: &[u8],
    params: &crate::domain_params::DomainParameterSet,
    element: &crate::domain_params::GroupElement,
) -> crate::Result<Vec<u8>> {
    use crate::domain_params::DomainParameterSet;
    let key_tag = match params {
        DomainParameterSet::Ec(_) => tlv::tags::CONTEXT_6,
        DomainParameterSet::Dh(_) => tlv::tags::CONTEXT_4,
    };
    let object = tlv::cons(
        tlv::tags::PUBLIC_KEY,
        vec![
            tlv::prim(tlv::tags::OID, oid),
            tlv::prim(key_tag, &params.encode_element(element)?),
        ],
    );
    Ok(object.to_vec())
}

/// `SEQUENCE { OID, INTEGER version [, INTEGER key-id] }` as used by the
/// security-info objects.
pub(crate) fn security_info(oid: &[u8], version: u8, key_id: Option<u8>) -> Tlv {
    let mut children = vec![
        tlv::prim(tlv::tags::OID, oid),
        tlv::prim(tlv::tags::INTEGER, &[version]),
    ];
    if let Some(key_id) = key_id {
        children.push(tlv::prim(tlv::tags::INTEGER, &[key_id]));
    }
    tlv::cons(tlv::tags::SEQUENCE, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::ins;

    fn command(data: Vec<u8>) -> CommandApdu {
        CommandApdu {
            cla: 0x00,
            ins: ins::GENERAL_AUTHENTICATE,
            p1: 0x00,
            p2: 0x00,
            data,
            le: Some(256),
        }
    }

    #[test]
    fn empty_template_yields_no_children() {
        let children = dynamic_auth_template(&command(vec![0x7C, 0x00])).unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn template_fields_are_found_by_tag() {
        let children =
            dynamic_auth_template(&command(vec![0x7C, 0x06, 0x80, 0x01, 0xAA, 0x81, 0x01, 0xBB])).unwrap();
        assert_eq!(template_field(&children, tlv::tags::CONTEXT_0), Some(&[0xAA][..]));
        assert_eq!(template_field(&children, tlv::tags::CONTEXT_1), Some(&[0xBB][..]));
        assert_eq!(template_field(&children, tlv::tags::CONTEXT_2), None);
    }

    #[test]
    fn garbage_and_trailing_objects_are_rejected() {
        assert_eq!(
            dynamic_auth_template(&command(vec![0x7C, 0x05, 0x80])),
            Err(Status::IncorrectData)
        );
        assert_eq!(
            dynamic_auth_template(&command(vec![0x7C, 0x00, 0x02, 0x01, 0x2A])),
            Err(Status::IncorrectData)
        );
    }

    #[test]
    fn command_oid_reads_the_mechanism_reference() {
        let mut data = vec![0x80, crate::oids::ID_PACE.len() as u8];
        data.extend_from_slice(crate::oids::ID_PACE);
        let cmd = CommandApdu {
            cla: 0x00,
            ins: ins::MSE_SET,
            p1: 0xC1,
            p2: 0xA4,
            data,
            le: None,
        };
        assert_eq!(command_oid(&cmd).as_deref(), Some(crate::oids::ID_PACE));
    }
}
