//! Symmetric primitives for the TR-03110 protocols: the counter-mode key
//! derivation function, AES-128 CBC for nonce encryption and AES-CMAC for
//! authentication tokens.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use cmac::{Cmac, Mac};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::{Error, ErrorKind, Result};

/// AES block and key size used throughout (128-bit cipher suites).
pub const BLOCK_SIZE: usize = 16;
/// Session/derived key size.
pub const KEY_SIZE: usize = 16;
/// Length of an authentication token (truncated CMAC).
pub const TOKEN_SIZE: usize = 8;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&Sha1::new_with_prefix(data).finalize());
    digest
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::new_with_prefix(data).finalize());
    digest
}

/// TR-03110 KDF for 128-bit keys: `SHA-1(K || counter)[0..16]`.
pub fn kdf(secret: &[u8], counter: u32) -> [u8; KEY_SIZE] {
    let mut input = Vec::with_capacity(secret.len() + 4);
    input.extend_from_slice(secret);
    input.extend_from_slice(&counter.to_be_bytes());
    let digest = sha1(&input);
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest[..KEY_SIZE]);
    key
}

/// Encryption session key (counter 1).
pub fn kdf_enc(secret: &[u8]) -> [u8; KEY_SIZE] {
    kdf(secret, 1)
}

/// MAC session key (counter 2).
pub fn kdf_mac(secret: &[u8]) -> [u8; KEY_SIZE] {
    kdf(secret, 2)
}

/// Password key for PACE (counter 3).
pub fn kdf_pi(password: &[u8]) -> [u8; KEY_SIZE] {
    kdf(password, 3)
}

/// AES-128 CBC with zero IV over block-aligned data.
pub fn aes_cbc_encrypt(key: &[u8; KEY_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(Error::new(
            ErrorKind::InvalidParameter,
            "CBC input must be a non-empty multiple of the block size",
        ));
    }
    let cipher = Aes128CbcEnc::new_from_slices(key, &[0u8; BLOCK_SIZE])
        .map_err(|_| Error::new(ErrorKind::InvalidParameter, "bad AES key length"))?;
    Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(data))
}

/// AES-128 CBC decryption with zero IV over block-aligned data.
pub fn aes_cbc_decrypt(key: &[u8; KEY_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(Error::new(
            ErrorKind::InvalidParameter,
            "CBC input must be a non-empty multiple of the block size",
        ));
    }
    let cipher = Aes128CbcDec::new_from_slices(key, &[0u8; BLOCK_SIZE])
        .map_err(|_| Error::new(ErrorKind::InvalidParameter, "bad AES key length"))?;
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| Error::new(ErrorKind::InvalidParameter, "CBC unpadding failed"))
}

/// Full 16-byte AES-CMAC.
pub fn aes_cmac(key: &[u8; KEY_SIZE], data: &[u8]) -> [u8; BLOCK_SIZE] {
    // The key length is fixed by the type, new_from_slice cannot fail here.
    let mut mac = <Cmac<Aes128> as Mac>::new_from_slice(key).expect("16-byte CMAC key");
    mac.update(data);
    let mut tag = [0u8; BLOCK_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Authentication token: AES-CMAC truncated to 8 bytes per TR-03110.
pub fn auth_token(key: &[u8; KEY_SIZE], data: &[u8]) -> [u8; TOKEN_SIZE] {
    let full = aes_cmac(key, data);
    let mut token = [0u8; TOKEN_SIZE];
    token.copy_from_slice(&full[..TOKEN_SIZE]);
    token
}
