//! Short Weierstrass elliptic curve arithmetic over prime fields.
//!
//! The simulator has to work with arbitrary standardized curves (NIST and
//! Brainpool families) selected at personalization time, so the group
//! operations are implemented over big integers instead of fixed-curve
//! types. Performance is bounded by key size and irrelevant here; constant
//! time behavior is an explicit non-goal of the simulation.

use num_bigint_dig::{BigInt, BigUint, ModInverse};
use num_traits::{One, Zero};
use rand::RngCore;

use crate::{Error, ErrorKind, Result};

/// A point on a curve, affine or the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcPoint {
    Infinity,
    Affine { x: BigUint, y: BigUint },
}

/// Curve equation `y^2 = x^3 + a*x + b` over `GF(p)` with a base point of
/// prime order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcGroup {
    pub p: BigUint,
    pub a: BigUint,
    pub b: BigUint,
    pub gx: BigUint,
    pub gy: BigUint,
    pub order: BigUint,
    pub cofactor: u32,
}

impl EcGroup {
    pub fn generator(&self) -> EcPoint {
        EcPoint::Affine {
            x: self.gx.clone(),
            y: self.gy.clone(),
        }
    }

    /// Byte length of a field element.
    pub fn field_len(&self) -> usize {
        (self.p.bits() + 7) / 8
    }

    pub fn is_on_curve(&self, point: &EcPoint) -> bool {
        match point {
            EcPoint::Infinity => true,
            EcPoint::Affine { x, y } => {
                if x >= &self.p || y >= &self.p {
                    return false;
                }
                let lhs = (y * y) % &self.p;
                let rhs = (x * x * x + &self.a * x + &self.b) % &self.p;
                lhs == rhs
            }
        }
    }

    pub fn add(&self, lhs: &EcPoint, rhs: &EcPoint) -> EcPoint {
        let (x1, y1, x2, y2) = match (lhs, rhs) {
            (EcPoint::Infinity, q) => return q.clone(),
            (p, EcPoint::Infinity) => return p.clone(),
            (EcPoint::Affine { x: x1, y: y1 }, EcPoint::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };

        if x1 == x2 {
            return if (y1 + y2) % &self.p == BigUint::zero() {
                EcPoint::Infinity
            } else {
                self.double_affine(x1, y1)
            };
        }

        let numerator = mod_sub(y2, y1, &self.p);
        let denominator = mod_sub(x2, x1, &self.p);
        // x1 != x2, so the denominator is invertible in the prime field.
        let slope = match mod_inv(&denominator, &self.p) {
            Some(inverse) => (numerator * inverse) % &self.p,
            None => return EcPoint::Infinity,
        };
        self.apply_slope(&slope, x1, y1, x2)
    }

    fn double_affine(&self, x: &BigUint, y: &BigUint) -> EcPoint {
        if y.is_zero() {
            return EcPoint::Infinity;
        }
        let numerator = (BigUint::from(3u8) * x * x + &self.a) % &self.p;
        let denominator = (BigUint::from(2u8) * y) % &self.p;
        let slope = match mod_inv(&denominator, &self.p) {
            Some(inverse) => (numerator * inverse) % &self.p,
            None => return EcPoint::Infinity,
        };
        self.apply_slope(&slope, x, y, x)
    }

    fn apply_slope(&self, slope: &BigUint, x1: &BigUint, y1: &BigUint, x2: &BigUint) -> EcPoint {
        let x3 = mod_sub(&mod_sub(&((slope * slope) % &self.p), x1, &self.p), x2, &self.p);
        let y3 = mod_sub(&((slope * mod_sub(x1, &x3, &self.p)) % &self.p), y1, &self.p);
        EcPoint::Affine { x: x3, y: y3 }
    }

    /// Scalar multiplication, plain double-and-add.
    pub fn mul(&self, point: &EcPoint, scalar: &BigUint) -> EcPoint {
        let mut result = EcPoint::Infinity;
        for byte in scalar.to_bytes_be() {
            for shift in (0..8).rev() {
                result = self.add(&result, &result);
                if (byte >> shift) & 1 == 1 {
                    result = self.add(&result, point);
                }
            }
        }
        result
    }

    /// Decodes an uncompressed point (`04 || x || y`) and validates it lies
    /// on the curve.
    pub fn decode_point(&self, raw: &[u8]) -> Result<EcPoint> {
        let len = self.field_len();
        if raw.len() != 1 + 2 * len || raw[0] != 0x04 {
            return Err(Error::new(
                ErrorKind::InvalidKeyMaterial,
                "expected an uncompressed point encoding",
            ));
        }
        let point = EcPoint::Affine {
            x: BigUint::from_bytes_be(&raw[1..1 + len]),
            y: BigUint::from_bytes_be(&raw[1 + len..]),
        };
        if !self.is_on_curve(&point) {
            return Err(Error::new(ErrorKind::InvalidKeyMaterial, "point is not on the curve"));
        }
        Ok(point)
    }

    /// Encodes an affine point uncompressed; the point at infinity has no
    /// encoding.
    pub fn encode_point(&self, point: &EcPoint) -> Result<Vec<u8>> {
        match point {
            EcPoint::Infinity => Err(Error::new(
                ErrorKind::InvalidKeyMaterial,
                "the point at infinity cannot be encoded",
            )),
            EcPoint::Affine { x, y } => {
                let len = self.field_len();
                let mut encoded = Vec::with_capacity(1 + 2 * len);
                encoded.push(0x04);
                encoded.extend(left_pad(&x.to_bytes_be(), len));
                encoded.extend(left_pad(&y.to_bytes_be(), len));
                Ok(encoded)
            }
        }
    }

    /// Validates a private scalar: range `[1, order - 1]`.
    pub fn decode_scalar(&self, raw: &[u8]) -> Result<BigUint> {
        let scalar = BigUint::from_bytes_be(raw);
        if scalar.is_zero() || scalar >= self.order {
            return Err(Error::new(
                ErrorKind::InvalidKeyMaterial,
                "scalar outside the group order range",
            ));
        }
        Ok(scalar)
    }

    /// Uniform-enough random scalar in `[1, order - 1]`.
    pub fn random_scalar(&self, rng: &mut dyn RngCore) -> BigUint {
        let mut bytes = vec![0u8; self.field_len() + 8];
        rng.fill_bytes(&mut bytes);
        let reduced = BigUint::from_bytes_be(&bytes) % (&self.order - BigUint::one());
        reduced + BigUint::one()
    }
}

/// `(a - b) mod p` for reduced operands.
fn mod_sub(a: &BigUint, b: &BigUint, p: &BigUint) -> BigUint {
    ((p + a) - b) % p
}

fn mod_inv(value: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    let inverse: BigInt = value.mod_inverse(modulus)?;
    let modulus_int = BigInt::from(modulus.clone());
    let reduced = ((inverse % &modulus_int) + &modulus_int) % &modulus_int;
    reduced.to_biguint()
}

fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut padded = vec![0u8; len.saturating_sub(bytes.len())];
    padded.extend_from_slice(bytes);
    padded
}

/// Reduces a hash to an integer per ECDSA: the leftmost `order.bits()` bits.
fn hash_to_int(digest: &[u8], order: &BigUint) -> BigUint {
    let mut e = BigUint::from_bytes_be(digest);
    let digest_bits = digest.len() * 8;
    if digest_bits > order.bits() {
        e >>= digest_bits - order.bits();
    }
    e % order
}

/// Verifies a plain-format ECDSA signature (`r || s`, each padded to the
/// order length) over a message digest.
pub fn ecdsa_verify(group: &EcGroup, public: &EcPoint, digest: &[u8], signature: &[u8]) -> bool {
    let len = (group.order.bits() + 7) / 8;
    if signature.len() != 2 * len {
        return false;
    }
    let r = BigUint::from_bytes_be(&signature[..len]);
    let s = BigUint::from_bytes_be(&signature[len..]);
    if r.is_zero() || s.is_zero() || r >= group.order || s >= group.order {
        return false;
    }

    let w = match mod_inv(&s, &group.order) {
        Some(inverse) => inverse,
        None => return false,
    };
    let e = hash_to_int(digest, &group.order);
    let u1 = (e * &w) % &group.order;
    let u2 = (&r * &w) % &group.order;
    let candidate = group.add(&group.mul(&group.generator(), &u1), &group.mul(public, &u2));
    match candidate {
        EcPoint::Infinity => false,
        EcPoint::Affine { x, .. } => x % &group.order == r,
    }
}

/// Produces a plain-format ECDSA signature. Used by personalization and
/// test tooling playing the terminal/certificate-authority side.
pub fn ecdsa_sign(group: &EcGroup, private: &BigUint, digest: &[u8], rng: &mut dyn RngCore) -> Result<Vec<u8>> {
    if private.is_zero() || private >= &group.order {
        return Err(Error::new(ErrorKind::InvalidKeyMaterial, "signing key out of range"));
    }
    let e = hash_to_int(digest, &group.order);
    let len = (group.order.bits() + 7) / 8;

    loop {
        let k = group.random_scalar(rng);
        let r = match group.mul(&group.generator(), &k) {
            EcPoint::Infinity => continue,
            EcPoint::Affine { x, .. } => x % &group.order,
        };
        if r.is_zero() {
            continue;
        }
        let k_inv = match mod_inv(&k, &group.order) {
            Some(inverse) => inverse,
            None => continue,
        };
        let s = (k_inv * (&e + &r * private)) % &group.order;
        if s.is_zero() {
            continue;
        }

        let mut signature = left_pad(&r.to_bytes_be(), len);
        signature.extend(left_pad(&s.to_bytes_be(), len));
        return Ok(signature);
    }
}
