//! Card-verifiable certificates (TR-03110 part 3, appendix C).
//!
//! A certificate is `7F21 { 7F4E body, 5F37 signature }`; the signature
//! covers the encoded body exactly as transmitted. The body carries issuer
//! and holder references, the holder's public key, the certificate holder
//! authorization template and a validity window in BCD dates.

use time::{Date, Month};

use crate::apdu::Status;
use crate::crypto;
use crate::ec::{self, EcGroup, EcPoint};
use crate::oids;
use crate::secstatus::{Authorization, TerminalType};
use crate::tlv::{self, Tlv};

/// Role encoded in the two most significant CHAT bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvRole {
    Cvca,
    DvDomestic,
    DvForeign,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvCertificate {
    /// Certification authority reference (issuer name).
    pub car: Vec<u8>,
    /// Certificate holder reference.
    pub chr: Vec<u8>,
    /// Signature suite the holder's key is certified for.
    pub key_oid: Vec<u8>,
    /// Holder public key, uncompressed encoding. Domain parameters are
    /// inherited from the verifying chain.
    pub public_key: Vec<u8>,
    pub chat_oid: Vec<u8>,
    pub chat_bytes: Vec<u8>,
    pub effective: Date,
    pub expiration: Date,
    /// The encoded body, the exact input of the signature.
    body: Vec<u8>,
    pub signature: Vec<u8>,
}

impl CvCertificate {
    /// Parses an encoded certificate. The input may be the bare `7F21`
    /// object or a PSO:VERIFY CERTIFICATE body (`7F4E` + `5F37`
    /// concatenated); both forms occur on the wire.
    pub fn parse(raw: &[u8]) -> Result<CvCertificate, Status> {
        let objects = tlv::parse(raw).map_err(|_| Status::IncorrectData)?;
        let fields = match tlv::find_first(&objects, tlv::tags::CV_CERTIFICATE) {
            Some(outer) => tlv::children(outer).ok_or(Status::IncorrectData)?,
            None => &objects[..],
        };
        let body_object = tlv::find_first(fields, tlv::tags::CERTIFICATE_BODY).ok_or(Status::IncorrectData)?;
        let signature = tlv::find_first(fields, tlv::tags::SIGNATURE)
            .and_then(tlv::primitive_value)
            .ok_or(Status::IncorrectData)?
            .to_vec();

        let body = body_object.to_vec();
        let children = tlv::children(body_object).ok_or(Status::IncorrectData)?;

        let car = primitive(children, tlv::tags::CAR)?;
        let chr = primitive(children, tlv::tags::CHR)?;

        let key_object = tlv::find_first(children, tlv::tags::PUBLIC_KEY).ok_or(Status::IncorrectData)?;
        let key_fields = tlv::children(key_object).ok_or(Status::IncorrectData)?;
        let key_oid = primitive(key_fields, tlv::tags::OID)?;
        let public_key = primitive(key_fields, tlv::tags::CONTEXT_6)?;

        let chat = tlv::find_first(children, tlv::tags::CHAT).ok_or(Status::IncorrectData)?;
        let chat_fields = tlv::children(chat).ok_or(Status::IncorrectData)?;
        let chat_oid = primitive(chat_fields, tlv::tags::OID)?;
        let chat_bytes = primitive(chat_fields, tlv::tags::DISCRETIONARY_DATA)?;
        if chat_bytes.is_empty() {
            return Err(Status::IncorrectData);
        }

        let effective = decode_date(&primitive(children, tlv::tags::EFFECTIVE_DATE)?)?;
        let expiration = decode_date(&primitive(children, tlv::tags::EXPIRATION_DATE)?)?;

        Ok(CvCertificate {
            car,
            chr,
            key_oid,
            public_key,
            chat_oid,
            chat_bytes,
            effective,
            expiration,
            body,
            signature,
        })
    }

    pub fn role(&self) -> CvRole {
        match self.chat_bytes[0] >> 6 {
            0b11 => CvRole::Cvca,
            0b10 => CvRole::DvDomestic,
            0b01 => CvRole::DvForeign,
            _ => CvRole::Terminal,
        }
    }

    pub fn terminal_type(&self) -> Option<TerminalType> {
        TerminalType::from_oid(&self.chat_oid)
    }

    pub fn authorization(&self) -> Authorization {
        Authorization::from_chat_bytes(&self.chat_bytes)
    }

    /// Verifies the body signature under the issuer's key; the digest is
    /// chosen by the issuer's signature suite.
    pub fn verify(&self, issuer_oid: &[u8], group: &EcGroup, issuer_key: &EcPoint) -> bool {
        let digest = digest_for(issuer_oid, &self.body);
        ec::ecdsa_verify(group, issuer_key, &digest, &self.signature)
    }
}

fn primitive(objects: &[Tlv], tag: &[u8]) -> Result<Vec<u8>, Status> {
    tlv::find_first(objects, tag)
        .and_then(tlv::primitive_value)
        .map(<[u8]>::to_vec)
        .ok_or(Status::IncorrectData)
}

/// Message digest of a terminal-authentication signature suite.
pub fn digest_for(oid: &[u8], data: &[u8]) -> Vec<u8> {
    if oid == oids::TA_ECDSA_SHA_1 {
        crypto::sha1(data).to_vec()
    } else {
        crypto::sha256(data).to_vec()
    }
}

/// Decodes a BCD date (six bytes, one decimal digit each, YYMMDD in the
/// 2000s).
pub fn decode_date(bcd: &[u8]) -> Result<Date, Status> {
    if bcd.len() != 6 || bcd.iter().any(|digit| *digit > 9) {
        return Err(Status::IncorrectData);
    }
    let year = 2000 + i32::from(bcd[0]) * 10 + i32::from(bcd[1]);
    let month_number = bcd[2] * 10 + bcd[3];
    let day = bcd[4] * 10 + bcd[5];
    let month = Month::try_from(month_number).map_err(|_| Status::IncorrectData)?;
    Date::from_calendar_date(year, month, day).map_err(|_| Status::IncorrectData)
}

/// Encodes a date back to the BCD wire form.
pub fn encode_date(date: Date) -> [u8; 6] {
    let year = (date.year() - 2000).clamp(0, 99) as u8;
    let month = date.month() as u8;
    let day = date.day();
    [year / 10, year % 10, month / 10, month % 10, day / 10, day % 10]
}

/// Builds an encoded certificate. The signing side of this (issuing) is
/// not a card operation; it exists for personalization and the tests'
/// terminal side.
pub struct CvCertBuilder {
    pub car: Vec<u8>,
    pub chr: Vec<u8>,
    pub key_oid: Vec<u8>,
    pub public_key: Vec<u8>,
    pub chat_oid: Vec<u8>,
    pub chat_bytes: Vec<u8>,
    pub effective: Date,
    pub expiration: Date,
}

impl CvCertBuilder {
    fn body(&self) -> Tlv {
        tlv::cons(
            tlv::tags::CERTIFICATE_BODY,
            vec![
                tlv::prim(tlv::tags::PROFILE_IDENTIFIER, &[0x00]),
                tlv::prim(tlv::tags::CAR, &self.car),
                tlv::cons(
                    tlv::tags::PUBLIC_KEY,
                    vec![
                        tlv::prim(tlv::tags::OID, &self.key_oid),
                        tlv::prim(tlv::tags::CONTEXT_6, &self.public_key),
                    ],
                ),
                tlv::prim(tlv::tags::CHR, &self.chr),
                tlv::cons(
                    tlv::tags::CHAT,
                    vec![
                        tlv::prim(tlv::tags::OID, &self.chat_oid),
                        tlv::prim(tlv::tags::DISCRETIONARY_DATA, &self.chat_bytes),
                    ],
                ),
                tlv::prim(tlv::tags::EFFECTIVE_DATE, &encode_date(self.effective)),
                tlv::prim(tlv::tags::EXPIRATION_DATE, &encode_date(self.expiration)),
            ],
        )
    }

    /// Signs the body with the issuer key and returns the encoded `7F21`
    /// certificate.
    pub fn sign(
        &self,
        issuer_oid: &[u8],
        group: &EcGroup,
        issuer_private: &num_bigint_dig::BigUint,
        rng: &mut dyn rand::RngCore,
    ) -> crate::Result<Vec<u8>> {
        let body = self.body();
        let encoded_body = body.to_vec();
        let digest = digest_for(issuer_oid, &encoded_body);
        let signature = ec::ecdsa_sign(group, issuer_private, &digest, rng)?;
        let certificate = tlv::cons(
            tlv::tags::CV_CERTIFICATE,
            vec![body, tlv::prim(tlv::tags::SIGNATURE, &signature)],
        );
        Ok(certificate.to_vec())
    }
}
