//! End-to-end exchanges against a personalized card, with the terminal side
//! driven from here.

use num_bigint_dig::BigUint;
use time::macros::date;

use eidsim::cardobjects::{CardObject, Identifier, KeyObject, ObjectKind, PasswordObject, TrustPoint};
use eidsim::crypto;
use eidsim::domain_params::{standardized_by_id, DomainParameterSet, GroupElement};
use eidsim::ec::{EcGroup, EcPoint};
use eidsim::oids;
use eidsim::protocols::cv_cert::{digest_for, CvCertBuilder};
use eidsim::protocols::password;
use eidsim::secstatus::{Authorization, SecCondition, TerminalType};
use eidsim::tlv;
use eidsim::{Card, ObjectTree};

const PIN_VALUE: &[u8] = b"123456";
const CAN_VALUE: &[u8] = b"654321";
const PUK_VALUE: &[u8] = b"9876543210";
const CA_KEY_ID: u8 = 0x11;
const RI_KEY_ID: u8 = 0x1A;
const PARAM_ID: u8 = 13;

const CVCA_CAR: &[u8] = b"DECVCA00001";
const DV_CHR: &[u8] = b"DEDVTEST001";
const TERM_CHR: &[u8] = b"DETERMTST01";

// ---------------------------------------------------------------- transport

fn apdu(cla: u8, ins: u8, p1: u8, p2: u8, data: &[u8], le: bool) -> Vec<u8> {
    let mut raw = vec![cla, ins, p1, p2];
    if !data.is_empty() {
        raw.push(data.len() as u8);
        raw.extend_from_slice(data);
    }
    if le {
        raw.push(0x00);
    }
    raw
}

fn tx(card: &mut Card, raw: Vec<u8>) -> (Vec<u8>, [u8; 2]) {
    let mut response = card.process(&raw);
    assert!(response.len() >= 2, "response must carry a status word");
    let sw = [response[response.len() - 2], response[response.len() - 1]];
    response.truncate(response.len() - 2);
    (response, sw)
}

// ------------------------------------------------------------------- setup

struct Pki {
    group: EcGroup,
    cvca_public: EcPoint,
    dv_cert: Vec<u8>,
    term_cert: Vec<u8>,
    term_private: BigUint,
}

fn ec_group() -> EcGroup {
    match standardized_by_id(PARAM_ID).unwrap() {
        DomainParameterSet::Ec(group) => group,
        DomainParameterSet::Dh(_) => unreachable!(),
    }
}

fn build_pki(dv_expiration: time::Date) -> Pki {
    let group = ec_group();
    let mut rng = rand::thread_rng();

    let cvca_private = group.random_scalar(&mut rng);
    let cvca_public = group.mul(&group.generator(), &cvca_private);
    let dv_private = group.random_scalar(&mut rng);
    let dv_public = group.mul(&group.generator(), &dv_private);
    let term_private = group.random_scalar(&mut rng);
    let term_public = group.mul(&group.generator(), &term_private);

    let dv_cert = CvCertBuilder {
        car: CVCA_CAR.to_vec(),
        chr: DV_CHR.to_vec(),
        key_oid: oids::TA_ECDSA_SHA_256.to_vec(),
        public_key: group.encode_point(&dv_public).unwrap(),
        chat_oid: oids::ROLE_AUTHENTICATION_TERMINAL.to_vec(),
        chat_bytes: vec![0x80, 0x00, 0x00, 0x00, 0x07],
        effective: date!(2026 - 01 - 01),
        expiration: dv_expiration,
    }
    .sign(oids::TA_ECDSA_SHA_256, &group, &cvca_private, &mut rng)
    .unwrap();

    let term_cert = CvCertBuilder {
        car: DV_CHR.to_vec(),
        chr: TERM_CHR.to_vec(),
        key_oid: oids::TA_ECDSA_SHA_256.to_vec(),
        public_key: group.encode_point(&term_public).unwrap(),
        chat_oid: oids::ROLE_AUTHENTICATION_TERMINAL.to_vec(),
        chat_bytes: vec![0x00, 0x00, 0x00, 0x00, 0x07],
        effective: date!(2026 - 02 - 01),
        expiration: date!(2028 - 02 - 01),
    }
    .sign(oids::TA_ECDSA_SHA_256, &group, &dv_private, &mut rng)
    .unwrap();

    Pki {
        group,
        cvca_public,
        dv_cert,
        term_cert,
        term_private,
    }
}

fn build_card(pki: &Pki) -> (Card, GroupElement) {
    let mut rng = rand::thread_rng();
    let params = standardized_by_id(PARAM_ID).unwrap();
    let mut tree = ObjectTree::new(CardObject::new(
        ObjectKind::Container,
        vec![Identifier::FileId(0x3F00)],
    ));
    let root = tree.root();

    // Freely readable discovery data.
    tree.attach(
        root,
        CardObject::new(
            ObjectKind::ElementaryFile {
                content: b"card access".to_vec(),
                read_cond: Some(SecCondition::Always),
                update_cond: None,
                delete_cond: None,
            },
            vec![Identifier::FileId(0x011C), Identifier::ShortFileId(0x1C)],
        ),
    )
    .unwrap();

    // Data group readable only after PACE with the PIN.
    tree.attach(
        root,
        CardObject::new(
            ObjectKind::ElementaryFile {
                content: b"personal data".to_vec(),
                read_cond: Some(SecCondition::PaceWithPassword(password::PIN)),
                update_cond: None,
                delete_cond: None,
            },
            vec![Identifier::FileId(0x0102), Identifier::ShortFileId(0x02)],
        ),
    )
    .unwrap();

    // Data group requiring both a verified terminal and chip authentication.
    tree.attach(
        root,
        CardObject::new(
            ObjectKind::ElementaryFile {
                content: b"sensitive data".to_vec(),
                read_cond: Some(SecCondition::And(vec![
                    SecCondition::TaWithType(TerminalType::AuthenticationTerminal),
                    SecCondition::CaEstablished,
                ])),
                update_cond: None,
                delete_cond: None,
            },
            vec![Identifier::FileId(0x0103), Identifier::ShortFileId(0x03)],
        ),
    )
    .unwrap();

    let mut pin = PasswordObject::new(PIN_VALUE, Some(3));
    pin.change_cond = Some(SecCondition::PaceEstablished);
    pin.unblock_cond = Some(SecCondition::PaceWithPassword(password::PUK));
    tree.attach(
        root,
        CardObject::new(ObjectKind::Password(pin), vec![Identifier::AuthId(password::PIN)]),
    )
    .unwrap();
    tree.attach(
        root,
        CardObject::new(
            ObjectKind::Password(PasswordObject::new(CAN_VALUE, None)),
            vec![Identifier::AuthId(password::CAN)],
        ),
    )
    .unwrap();
    tree.attach(
        root,
        CardObject::new(
            ObjectKind::Password(PasswordObject::new(PUK_VALUE, Some(10))),
            vec![Identifier::AuthId(password::PUK)],
        ),
    )
    .unwrap();

    let ca_private = params.random_scalar(&mut rng);
    let ca_public = params.mul(&params.generator(), &ca_private).unwrap();
    tree.attach(
        root,
        CardObject::new(
            ObjectKind::Key(KeyObject {
                params: params.clone(),
                private: ca_private,
                use_cond: Some(SecCondition::PaceEstablished),
            }),
            vec![
                Identifier::KeyId(CA_KEY_ID),
                Identifier::Oid(oids::ID_CA.to_vec()),
            ],
        ),
    )
    .unwrap();

    let ri_private = params.random_scalar(&mut rng);
    tree.attach(
        root,
        CardObject::new(
            ObjectKind::Key(KeyObject {
                params: params.clone(),
                private: ri_private,
                use_cond: Some(SecCondition::And(vec![
                    SecCondition::TaWithAuthorization(Authorization::RESTRICTED_IDENTIFICATION),
                    SecCondition::CaEstablished,
                ])),
            }),
            vec![
                Identifier::KeyId(RI_KEY_ID),
                Identifier::Oid(oids::ID_RI.to_vec()),
            ],
        ),
    )
    .unwrap();

    tree.attach(
        root,
        CardObject::new(
            ObjectKind::TrustPoint(TrustPoint {
                car: CVCA_CAR.to_vec(),
                oid: oids::TA_ECDSA_SHA_256.to_vec(),
                group: pki.group.clone(),
                public: pki.cvca_public.clone(),
            }),
            vec![],
        ),
    )
    .unwrap();

    tree.attach(
        root,
        CardObject::new(ObjectKind::CurrentDate(date!(2026 - 08 - 30)), vec![]),
    )
    .unwrap();

    (Card::new(tree), ca_public)
}

// -------------------------------------------------------- terminal drivers

fn compress_element(params: &DomainParameterSet, element: &GroupElement) -> Vec<u8> {
    match params {
        DomainParameterSet::Ec(_) => params.agreement_bytes(element).unwrap(),
        DomainParameterSet::Dh(_) => crypto::sha1(&params.encode_element(element).unwrap()).to_vec(),
    }
}

fn public_key_data_object(oid: &[u8], params: &DomainParameterSet, element: &GroupElement) -> Vec<u8> {
    let key_tag: &[u8] = match params {
        DomainParameterSet::Ec(_) => &[0x86],
        DomainParameterSet::Dh(_) => &[0x84],
    };
    tlv::cons(
        tlv::tags::PUBLIC_KEY,
        vec![
            tlv::prim(tlv::tags::OID, oid),
            tlv::prim(key_tag, &params.encode_element(element).unwrap()),
        ],
    )
    .to_vec()
}

fn template(fields: &[(&[u8], &[u8])]) -> Vec<u8> {
    tlv::cons(
        tlv::tags::DYNAMIC_AUTH_TEMPLATE,
        fields.iter().map(|(tag, value)| tlv::prim(tag, value)).collect(),
    )
    .to_vec()
}

fn template_value(response: &[u8], tag: &[u8]) -> Vec<u8> {
    let objects = tlv::parse(response).unwrap();
    let fields = tlv::children(&objects[0]).unwrap();
    tlv::find_first(fields, tag)
        .and_then(tlv::primitive_value)
        .unwrap()
        .to_vec()
}

struct PaceSession {
    mac: [u8; 16],
    id_picc: Vec<u8>,
    final_sw: [u8; 2],
}

/// Drives the four-step PACE exchange from the terminal side; the guessed
/// password may differ from the card's.
fn run_pace(card: &mut Card, oid: &[u8], param_id: u8, password_ref: u8, guess: &[u8]) -> PaceSession {
    let params = standardized_by_id(param_id).unwrap();
    let mut rng = rand::thread_rng();

    let mut mse = tlv::prim(tlv::tags::CONTEXT_0, oid).to_vec();
    mse.extend(tlv::prim(tlv::tags::CONTEXT_3, &[password_ref]).to_vec());
    mse.extend(tlv::prim(tlv::tags::CONTEXT_4, &[param_id]).to_vec());
    let (_, sw) = tx(card, apdu(0x00, 0x22, 0xC1, 0xA4, &mse, false));
    assert!(
        sw == [0x90, 0x00] || sw[0] == 0x63,
        "MSE:SET AT failed: {:02X?}",
        sw
    );

    // Step 1: encrypted nonce.
    let (response, sw) = tx(card, apdu(0x10, 0x86, 0x00, 0x00, &[0x7C, 0x00], true));
    assert_eq!(sw, [0x90, 0x00]);
    let encrypted_nonce = template_value(&response, tlv::tags::CONTEXT_0);
    let nonce = crypto::aes_cbc_decrypt(&crypto::kdf_pi(guess), &encrypted_nonce).unwrap();

    // Step 2: generic mapping.
    let map_secret = params.random_scalar(&mut rng);
    let map_public = params.mul(&params.generator(), &map_secret).unwrap();
    let body = template(&[(tlv::tags::CONTEXT_1, &params.encode_element(&map_public).unwrap())]);
    let (response, sw) = tx(card, apdu(0x10, 0x86, 0x00, 0x00, &body, true));
    assert_eq!(sw, [0x90, 0x00]);
    let card_map = params
        .reconstruct_public_key(&template_value(&response, tlv::tags::CONTEXT_2))
        .unwrap();
    let h = params.mul(&card_map, &map_secret).unwrap();
    let s = BigUint::from_bytes_be(&nonce) % params.order();
    let g_s = params.mul(&params.generator(), &s).unwrap();
    let mapped_generator = params.combine(&g_s, &h).unwrap();
    let mapped = match (&params, &mapped_generator) {
        (DomainParameterSet::Ec(group), GroupElement::Ec(EcPoint::Affine { x, y })) => {
            DomainParameterSet::Ec(EcGroup {
                gx: x.clone(),
                gy: y.clone(),
                ..group.clone()
            })
        }
        (DomainParameterSet::Dh(group), GroupElement::Dh(value)) => {
            let mut mapped = group.clone();
            mapped.g = value.clone();
            DomainParameterSet::Dh(mapped)
        }
        _ => unreachable!(),
    };

    // Step 3: key agreement over the mapped generator.
    let ephemeral_secret = mapped.random_scalar(&mut rng);
    let ephemeral_public = mapped.mul(&mapped.generator(), &ephemeral_secret).unwrap();
    let body = template(&[(tlv::tags::CONTEXT_3, &mapped.encode_element(&ephemeral_public).unwrap())]);
    let (response, sw) = tx(card, apdu(0x10, 0x86, 0x00, 0x00, &body, true));
    assert_eq!(sw, [0x90, 0x00]);
    let card_public = mapped
        .reconstruct_public_key(&template_value(&response, tlv::tags::CONTEXT_4))
        .unwrap();
    let shared = mapped.mul(&card_public, &ephemeral_secret).unwrap();
    let agreement = mapped.agreement_bytes(&shared).unwrap();
    let mac = crypto::kdf_mac(&agreement);
    let id_picc = compress_element(&mapped, &card_public);

    // Step 4: mutual authentication.
    let terminal_token = crypto::auth_token(&mac, &public_key_data_object(oid, &params, &card_public));
    let body = template(&[(tlv::tags::CONTEXT_5, &terminal_token)]);
    let (response, final_sw) = tx(card, apdu(0x00, 0x86, 0x00, 0x00, &body, true));

    if final_sw == [0x90, 0x00] {
        let card_token = template_value(&response, tlv::tags::CONTEXT_6);
        let expected = crypto::auth_token(&mac, &public_key_data_object(oid, &params, &ephemeral_public));
        assert_eq!(card_token, expected, "card token mismatch");
    }

    PaceSession {
        mac,
        id_picc,
        final_sw,
    }
}

fn pace_with_pin(card: &mut Card) -> PaceSession {
    run_pace(
        card,
        oids::PACE_ECDH_GM_AES_CBC_CMAC_128,
        PARAM_ID,
        password::PIN,
        PIN_VALUE,
    )
}

fn pace_with_can(card: &mut Card) -> PaceSession {
    run_pace(
        card,
        oids::PACE_ECDH_GM_AES_CBC_CMAC_128,
        PARAM_ID,
        password::CAN,
        CAN_VALUE,
    )
}

/// Verifies the chain and answers the challenge. Returns the status words
/// of the two PSO steps and the final EXTERNAL AUTHENTICATE.
fn run_ta(card: &mut Card, pki: &Pki, id_picc: &[u8], compressed_ephemeral: &[u8]) -> [[u8; 2]; 3] {
    let mut rng = rand::thread_rng();

    let dst = tlv::prim(tlv::tags::CONTEXT_3, CVCA_CAR).to_vec();
    let (_, sw) = tx(card, apdu(0x00, 0x22, 0x81, 0xB6, &dst, false));
    assert_eq!(sw, [0x90, 0x00]);

    let (_, dv_sw) = tx(card, apdu(0x00, 0x2A, 0x00, 0xBE, &pki.dv_cert, false));

    let dst = tlv::prim(tlv::tags::CONTEXT_3, DV_CHR).to_vec();
    let _ = tx(card, apdu(0x00, 0x22, 0x81, 0xB6, &dst, false));
    let (_, term_sw) = tx(card, apdu(0x00, 0x2A, 0x00, 0xBE, &pki.term_cert, false));

    let mut at = tlv::prim(tlv::tags::CONTEXT_0, oids::TA_ECDSA_SHA_256).to_vec();
    at.extend(tlv::prim(tlv::tags::CONTEXT_3, TERM_CHR).to_vec());
    at.extend(tlv::prim(&[0x91], compressed_ephemeral).to_vec());
    let (_, at_sw) = tx(card, apdu(0x00, 0x22, 0xC1, 0xA4, &at, false));
    if at_sw != [0x90, 0x00] {
        return [dv_sw, term_sw, at_sw];
    }

    let (challenge, sw) = tx(card, apdu(0x00, 0x84, 0x00, 0x00, &[], true));
    assert_eq!(sw, [0x90, 0x00]);
    assert_eq!(challenge.len(), 8);

    let mut message = id_picc.to_vec();
    message.extend_from_slice(&challenge);
    message.extend_from_slice(compressed_ephemeral);
    let digest = digest_for(oids::TA_ECDSA_SHA_256, &message);
    let signature = eidsim::ec::ecdsa_sign(&pki.group, &pki.term_private, &digest, &mut rng).unwrap();

    let (_, final_sw) = tx(card, apdu(0x00, 0x82, 0x00, 0x00, &signature, false));
    [dv_sw, term_sw, final_sw]
}

/// Runs chip authentication with the given ephemeral key pair and verifies
/// the card's token against the card's static public key.
fn run_ca(
    card: &mut Card,
    params: &DomainParameterSet,
    secret: &BigUint,
    public: &GroupElement,
    card_public: &GroupElement,
) -> [u8; 2] {
    let mut mse = tlv::prim(tlv::tags::CONTEXT_0, oids::CA_ECDH_AES_CBC_CMAC_128).to_vec();
    mse.extend(tlv::prim(tlv::tags::CONTEXT_4, &[CA_KEY_ID]).to_vec());
    let (_, sw) = tx(card, apdu(0x00, 0x22, 0x41, 0xA4, &mse, false));
    if sw != [0x90, 0x00] {
        return sw;
    }

    let body = template(&[(tlv::tags::CONTEXT_0, &params.encode_element(public).unwrap())]);
    let (response, sw) = tx(card, apdu(0x00, 0x86, 0x00, 0x00, &body, true));
    if sw != [0x90, 0x00] {
        return sw;
    }

    // Recompute the session keys terminal-side and check the token.
    let nonce = template_value(&response, tlv::tags::CONTEXT_1);
    assert_eq!(nonce.len(), 8, "nonce must be 8 bytes");
    let shared = params.mul(card_public, secret).unwrap();
    let mut shared_secret = params.agreement_bytes(&shared).unwrap();
    shared_secret.extend_from_slice(&nonce);
    let mac = crypto::kdf_mac(&shared_secret);
    let expected = crypto::auth_token(
        &mac,
        &public_key_data_object(oids::CA_ECDH_AES_CBC_CMAC_128, params, public),
    );
    assert_eq!(template_value(&response, tlv::tags::CONTEXT_2), expected);
    sw
}

fn run_ri(card: &mut Card, params: &DomainParameterSet, sector_public: &GroupElement) -> (Vec<u8>, [u8; 2]) {
    let mut mse = tlv::prim(tlv::tags::CONTEXT_0, oids::RI_ECDH_SHA_256).to_vec();
    mse.extend(tlv::prim(tlv::tags::CONTEXT_4, &[RI_KEY_ID]).to_vec());
    let (_, sw) = tx(card, apdu(0x00, 0x22, 0x41, 0xA4, &mse, false));
    if sw != [0x90, 0x00] {
        return (Vec::new(), sw);
    }

    let key_object = tlv::cons(
        &[0xA0],
        vec![tlv::cons(
            tlv::tags::PUBLIC_KEY,
            vec![
                tlv::prim(tlv::tags::OID, oids::RI_ECDH_SHA_256),
                tlv::prim(&[0x86], &params.encode_element(sector_public).unwrap()),
            ],
        )],
    );
    let body = tlv::cons(tlv::tags::DYNAMIC_AUTH_TEMPLATE, vec![key_object]).to_vec();
    let (response, sw) = tx(card, apdu(0x00, 0x86, 0x00, 0x00, &body, true));
    if sw != [0x90, 0x00] {
        return (Vec::new(), sw);
    }
    (template_value(&response, tlv::tags::CONTEXT_1), sw)
}

fn read_by_sfi(card: &mut Card, sfi: u8) -> (Vec<u8>, [u8; 2]) {
    tx(card, apdu(0x00, 0xB0, 0x80 | sfi, 0x00, &[], true))
}

// -------------------------------------------------------------------- tests

#[test]
fn pace_grants_and_reset_revokes_file_access() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, _ca_public) = build_card(&pki);

    // Freely readable file works without any authentication.
    let (data, sw) = read_by_sfi(&mut card, 0x1C);
    assert_eq!(sw, [0x90, 0x00]);
    assert_eq!(data, b"card access");

    // The protected data group is denied before PACE.
    let (_, sw) = read_by_sfi(&mut card, 0x02);
    assert_eq!(sw, [0x69, 0x82]);

    let session = pace_with_pin(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);
    assert!(card.status().pace().is_some());
    assert!(card.status().channel().is_some());

    // Retry counter untouched by a successful run.
    let (_, sw) = tx(&mut card, apdu(0x00, 0x20, 0x00, password::PIN, &[], false));
    assert_eq!(sw, [0x90, 0x00]);

    let (data, sw) = read_by_sfi(&mut card, 0x02);
    assert_eq!(sw, [0x90, 0x00]);
    assert_eq!(data, b"personal data");

    // Session reset revokes access again.
    card.reset();
    assert!(card.status().pace().is_none());
    let (_, sw) = read_by_sfi(&mut card, 0x02);
    assert_eq!(sw, [0x69, 0x82]);
}

#[test]
fn wrong_password_decrements_the_counter_exactly_once() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, _ca_public) = build_card(&pki);

    let session = run_pace(
        &mut card,
        oids::PACE_ECDH_GM_AES_CBC_CMAC_128,
        PARAM_ID,
        password::PIN,
        b"000000",
    );
    assert_eq!(session.final_sw, [0x63, 0xC2]);
    assert!(card.status().pace().is_none());

    let (_, sw) = tx(&mut card, apdu(0x00, 0x20, 0x00, password::PIN, &[], false));
    assert_eq!(sw, [0x63, 0xC2]);

    // A later correct run restores the counter to its maximum.
    let session = pace_with_pin(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);
    let (_, sw) = tx(&mut card, apdu(0x00, 0x20, 0x00, password::PIN, &[], false));
    assert_eq!(sw, [0x90, 0x00]);
}

#[test]
fn exhausted_counter_blocks_until_unblocked_with_the_puk() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, _ca_public) = build_card(&pki);

    for expected in [0xC2, 0xC1, 0xC0] {
        let session = run_pace(
            &mut card,
            oids::PACE_ECDH_GM_AES_CBC_CMAC_128,
            PARAM_ID,
            password::PIN,
            b"000000",
        );
        assert_eq!(session.final_sw, [0x63, expected]);
    }

    // Blocked: the MSE precheck refuses to even start a run.
    let mut mse = tlv::prim(tlv::tags::CONTEXT_0, oids::PACE_ECDH_GM_AES_CBC_CMAC_128).to_vec();
    mse.extend(tlv::prim(tlv::tags::CONTEXT_3, &[password::PIN]).to_vec());
    let (_, sw) = tx(&mut card, apdu(0x00, 0x22, 0xC1, 0xA4, &mse, false));
    assert_eq!(sw, [0x69, 0x83]);

    // Unblock via PACE with the PUK; the PUK pays one try for it.
    let session = run_pace(
        &mut card,
        oids::PACE_ECDH_GM_AES_CBC_CMAC_128,
        PARAM_ID,
        password::PUK,
        PUK_VALUE,
    );
    assert_eq!(session.final_sw, [0x90, 0x00]);
    let (_, sw) = tx(&mut card, apdu(0x00, 0x2C, 0x03, password::PIN, &[], false));
    assert_eq!(sw, [0x90, 0x00]);

    let (_, sw) = tx(&mut card, apdu(0x00, 0x20, 0x00, password::PIN, &[], false));
    assert_eq!(sw, [0x90, 0x00]);
    let (_, sw) = tx(&mut card, apdu(0x00, 0x20, 0x00, password::PUK, &[], false));
    assert_eq!(sw, [0x63, 0xC9]);
}

#[test]
fn full_ta_ca_ri_chain_unlocks_the_and_protected_file() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, ca_public) = build_card(&pki);
    let params = standardized_by_id(PARAM_ID).unwrap();
    let mut rng = rand::thread_rng();

    let session = pace_with_can(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);

    // The ephemeral key for chip authentication is committed during TA.
    let ephemeral_secret = params.random_scalar(&mut rng);
    let ephemeral_public = params.mul(&params.generator(), &ephemeral_secret).unwrap();
    let compressed = compress_element(&params, &ephemeral_public);

    let sws = run_ta(&mut card, &pki, &session.id_picc, &compressed);
    assert_eq!(sws, [[0x90, 0x00]; 3]);
    let ta = card.status().ta().expect("TA must be registered");
    assert_eq!(ta.terminal_type, TerminalType::AuthenticationTerminal);
    assert!(ta.authorization.contains(Authorization::RESTRICTED_IDENTIFICATION));

    // TA alone does not satisfy AND(TA-type, CA).
    let (_, sw) = read_by_sfi(&mut card, 0x03);
    assert_eq!(sw, [0x69, 0x82]);

    let sw = run_ca(&mut card, &params, &ephemeral_secret, &ephemeral_public, &ca_public);
    assert_eq!(sw, [0x90, 0x00]);
    assert!(card.status().ca_established());

    let (data, sw) = read_by_sfi(&mut card, 0x03);
    assert_eq!(sw, [0x90, 0x00]);
    assert_eq!(data, b"sensitive data");

    // Restricted identification: stable per sector, different across
    // sectors.
    let sector_a = params
        .mul(&params.generator(), &params.random_scalar(&mut rng))
        .unwrap();
    let sector_b = params
        .mul(&params.generator(), &params.random_scalar(&mut rng))
        .unwrap();
    let (pseudonym_1, sw) = run_ri(&mut card, &params, &sector_a);
    assert_eq!(sw, [0x90, 0x00]);
    assert_eq!(pseudonym_1.len(), 32);
    assert!(card.status().ri_performed());
    let (pseudonym_2, _) = run_ri(&mut card, &params, &sector_a);
    assert_eq!(pseudonym_1, pseudonym_2);
    let (pseudonym_3, _) = run_ri(&mut card, &params, &sector_b);
    assert_ne!(pseudonym_1, pseudonym_3);
}

#[test]
fn ca_with_a_different_key_than_committed_is_rejected() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, ca_public) = build_card(&pki);
    let params = standardized_by_id(PARAM_ID).unwrap();
    let mut rng = rand::thread_rng();

    let session = pace_with_can(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);

    let committed_secret = params.random_scalar(&mut rng);
    let committed_public = params.mul(&params.generator(), &committed_secret).unwrap();
    let compressed = compress_element(&params, &committed_public);
    let sws = run_ta(&mut card, &pki, &session.id_picc, &compressed);
    assert_eq!(sws, [[0x90, 0x00]; 3]);

    // Present a different ephemeral key than the one committed during TA.
    let other_secret = params.random_scalar(&mut rng);
    let other_public = params.mul(&params.generator(), &other_secret).unwrap();
    let sw = run_ca(&mut card, &params, &other_secret, &other_public, &ca_public);
    assert_eq!(sw, [0x69, 0x82]);
    assert!(!card.status().ca_established());
}

#[test]
fn expired_certificate_fails_the_whole_chain() {
    // DV certificate expired before the card's current date.
    let pki = build_pki(date!(2026 - 01 - 01));
    let (mut card, _ca_public) = build_card(&pki);
    let params = standardized_by_id(PARAM_ID).unwrap();
    let mut rng = rand::thread_rng();

    let session = pace_with_can(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);

    let ephemeral_secret = params.random_scalar(&mut rng);
    let ephemeral_public = params.mul(&params.generator(), &ephemeral_secret).unwrap();
    let compressed = compress_element(&params, &ephemeral_public);

    let sws = run_ta(&mut card, &pki, &session.id_picc, &compressed);
    assert_eq!(sws[0], [0x69, 0x85], "expired DV must be refused");
    assert_ne!(sws[2], [0x90, 0x00]);
    assert!(card.status().ta().is_none(), "no TA after a broken chain");
}

#[test]
fn pace_works_over_a_modp_group() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, _ca_public) = build_card(&pki);

    let session = run_pace(
        &mut card,
        oids::PACE_DH_GM_AES_CBC_CMAC_128,
        0,
        password::CAN,
        CAN_VALUE,
    );
    assert_eq!(session.final_sw, [0x90, 0x00]);
    assert_eq!(card.status().pace().unwrap().password_ref, password::CAN);
    // Key material differs per run.
    assert_ne!(session.mac, [0u8; 16]);
}

#[test]
fn a_new_pace_run_supersedes_ta_and_ca() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, ca_public) = build_card(&pki);
    let params = standardized_by_id(PARAM_ID).unwrap();
    let mut rng = rand::thread_rng();

    let session = pace_with_can(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);
    let ephemeral_secret = params.random_scalar(&mut rng);
    let ephemeral_public = params.mul(&params.generator(), &ephemeral_secret).unwrap();
    let compressed = compress_element(&params, &ephemeral_public);
    let sws = run_ta(&mut card, &pki, &session.id_picc, &compressed);
    assert_eq!(sws, [[0x90, 0x00]; 3]);
    let sw = run_ca(&mut card, &params, &ephemeral_secret, &ephemeral_public, &ca_public);
    assert_eq!(sw, [0x90, 0x00]);

    let session = pace_with_pin(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);
    assert!(card.status().ta().is_none());
    assert!(!card.status().ca_established());
}

#[test]
fn an_abandoned_pace_selection_does_not_shadow_chip_authentication() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, ca_public) = build_card(&pki);
    let params = standardized_by_id(PARAM_ID).unwrap();
    let mut rng = rand::thread_rng();

    let session = pace_with_can(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);

    // Start a second PACE run but walk away after MSE:SET AT.
    let mut mse = tlv::prim(tlv::tags::CONTEXT_0, oids::PACE_ECDH_GM_AES_CBC_CMAC_128).to_vec();
    mse.extend(tlv::prim(tlv::tags::CONTEXT_3, &[password::CAN]).to_vec());
    mse.extend(tlv::prim(tlv::tags::CONTEXT_4, &[PARAM_ID]).to_vec());
    let (_, sw) = tx(&mut card, apdu(0x00, 0x22, 0xC1, 0xA4, &mse, false));
    assert_eq!(sw, [0x90, 0x00]);

    // Chip authentication must take over the GENERAL AUTHENTICATE that
    // follows its own MSE:SET AT.
    let ephemeral_secret = params.random_scalar(&mut rng);
    let ephemeral_public = params.mul(&params.generator(), &ephemeral_secret).unwrap();
    let sw = run_ca(&mut card, &params, &ephemeral_secret, &ephemeral_public, &ca_public);
    assert_eq!(sw, [0x90, 0x00]);
    assert!(card.status().ca_established());
}

#[test]
fn ca_without_ta_leaves_the_and_protected_file_closed() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (mut card, ca_public) = build_card(&pki);
    let params = standardized_by_id(PARAM_ID).unwrap();
    let mut rng = rand::thread_rng();

    let session = pace_with_can(&mut card);
    assert_eq!(session.final_sw, [0x90, 0x00]);

    // Chip authentication without any terminal authentication first.
    let ephemeral_secret = params.random_scalar(&mut rng);
    let ephemeral_public = params.mul(&params.generator(), &ephemeral_secret).unwrap();
    let sw = run_ca(&mut card, &params, &ephemeral_secret, &ephemeral_public, &ca_public);
    assert_eq!(sw, [0x90, 0x00]);
    assert!(card.status().ca_established());

    // One leg of AND(TA-type, CA) is not enough, whatever the order.
    let (_, sw) = read_by_sfi(&mut card, 0x03);
    assert_eq!(sw, [0x69, 0x82]);
}

#[test]
fn security_infos_cover_the_personalized_mechanisms() {
    let pki = build_pki(date!(2028 - 01 - 01));
    let (card, _ca_public) = build_card(&pki);

    let infos = card.security_infos();
    assert!(!infos.is_empty());
    let encoded = tlv::serialize(&infos);
    // PACE, TA, CA and RI all contribute an OID under bsi-de.
    for oid in [oids::ID_PACE, oids::ID_TA, oids::ID_CA, oids::ID_RI] {
        let found = infos.iter().any(|info| {
            tlv::children(info)
                .and_then(|children| tlv::find_first(children, tlv::tags::OID))
                .and_then(tlv::primitive_value)
                .map_or(false, |value| oids::in_family(value, oid))
        });
        assert!(found, "missing security info for {:02X?}", oid);
    }
    // And the whole set re-parses.
    assert_eq!(tlv::parse(&encoded).unwrap().len(), infos.len());
}
