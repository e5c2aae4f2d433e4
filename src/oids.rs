//! BSI TR-03110 object identifiers, as raw DER values (content octets of the
//! `06` tag). All of them live under `bsi-de` (0.4.0.127.0.7).

/// `bsi-de` itself, the common prefix.
pub const BSI_DE: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07];

/// `bsi-de 1 2`, referenced by the compact algorithm-identifier form.
pub const STANDARDIZED_DOMAIN_PARAMETERS: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x01, 0x02];

// Protocol families (`bsi-de 2 2 x`).
pub const ID_PK: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x01];
pub const ID_TA: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x02];
pub const ID_CA: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x03];
pub const ID_PACE: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x04];
pub const ID_RI: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x05];

// PACE with generic mapping, AES-128 CBC/CMAC cipher suite.
pub const PACE_DH_GM_AES_CBC_CMAC_128: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x04, 0x01, 0x02];
pub const PACE_ECDH_GM_AES_CBC_CMAC_128: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x04, 0x02, 0x02];

// Terminal authentication signature suites.
pub const TA_ECDSA_SHA_1: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x02, 0x02, 0x01];
pub const TA_ECDSA_SHA_256: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x02, 0x02, 0x03];

// Chip authentication, AES-128 cipher suite.
pub const CA_DH_AES_CBC_CMAC_128: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x03, 0x01, 0x02];
pub const CA_ECDH_AES_CBC_CMAC_128: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x03, 0x02, 0x02];

// Restricted identification.
pub const RI_ECDH_SHA_1: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x05, 0x02, 0x01];
pub const RI_ECDH_SHA_256: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x05, 0x02, 0x02];

// Terminal type roots carried in the CHAT (`bsi-de 3 1 2 x`).
pub const ROLE_INSPECTION_SYSTEM: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x01];
pub const ROLE_AUTHENTICATION_TERMINAL: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x02];
pub const ROLE_SIGNATURE_TERMINAL: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x03];

// Auxiliary data references for terminal-side verification requests.
pub const AUX_DATE_OF_BIRTH: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x04, 0x01];
pub const AUX_DATE_OF_EXPIRY: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x04, 0x02];
pub const AUX_COMMUNITY_ID: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x04, 0x03];

/// True if `oid` is underneath (or equal to) the given family prefix.
pub fn in_family(oid: &[u8], family: &[u8]) -> bool {
    oid.len() >= family.len() && &oid[..family.len()] == family
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_share_the_bsi_prefix() {
        for oid in [ID_PACE, ID_TA, ID_CA, ID_RI, STANDARDIZED_DOMAIN_PARAMETERS] {
            assert!(in_family(oid, BSI_DE));
        }
    }

    #[test]
    fn family_membership() {
        assert!(in_family(PACE_ECDH_GM_AES_CBC_CMAC_128, ID_PACE));
        assert!(in_family(PACE_DH_GM_AES_CBC_CMAC_128, ID_PACE));
        assert!(!in_family(CA_ECDH_AES_CBC_CMAC_128, ID_PACE));
        assert!(in_family(ID_TA, ID_TA));
        assert!(!in_family(&ID_TA[..4], ID_TA));
    }
}
