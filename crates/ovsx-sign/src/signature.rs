//! Ed25519 signatures over raw package bytes.
//!
//! The package bytes are signed as-is (pure Ed25519, no pre-hash), which is
//! what a `null` digest selection produces in OpenSSL-based signers.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

/// Signature decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The signature bytes are not a structurally valid Ed25519 signature.
    #[error("invalid signature encoding: expected {expected} bytes, got {actual}")]
    InvalidEncoding { expected: usize, actual: usize },
}

/// Sign `bytes`. Deterministic for a given key.
pub fn sign_bytes(bytes: &[u8], key: &SigningKey) -> Vec<u8> {
    let signature: Signature = key.sign(bytes);
    signature.to_bytes().to_vec()
}

/// Check `signature` over `bytes`.
///
/// A well-formed signature that does not match returns `Ok(false)`; only a
/// signature of the wrong length is an error.
pub fn verify_signature(
    bytes: &[u8],
    key: &VerifyingKey,
    signature: &[u8],
) -> Result<bool, SignatureError> {
    let signature =
        Signature::from_slice(signature).map_err(|_| SignatureError::InvalidEncoding {
            expected: Signature::BYTE_SIZE,
            actual: signature.len(),
        })?;

    Ok(key.verify(bytes, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_keypair() -> SigningKey {
        SigningKey::generate(&mut rand::thread_rng())
    }

    #[test]
    fn sign_verify_roundtrip() {
        let key = generate_keypair();
        let bytes = b"PK\x03\x04 package bytes";
        let sig = sign_bytes(bytes, &key);

        assert_eq!(sig.len(), 64);
        assert!(verify_signature(bytes, &key.verifying_key(), &sig).unwrap());
    }

    #[test]
    fn signing_is_deterministic() {
        let key = generate_keypair();
        assert_eq!(sign_bytes(b"abc", &key), sign_bytes(b"abc", &key));
    }

    #[test]
    fn flipped_message_bit_fails() {
        let key = generate_keypair();
        let bytes = b"package contents".to_vec();
        let sig = sign_bytes(&bytes, &key);

        for i in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[i] ^= 0x80;
            assert!(!verify_signature(&tampered, &key.verifying_key(), &sig).unwrap());
        }
    }

    #[test]
    fn flipped_signature_bit_fails() {
        let key = generate_keypair();
        let bytes = b"package contents";
        let sig = sign_bytes(bytes, &key);

        for i in 0..sig.len() {
            let mut tampered = sig.clone();
            tampered[i] ^= 0x01;
            assert!(!verify_signature(bytes, &key.verifying_key(), &tampered).unwrap());
        }
    }

    #[test]
    fn wrong_key_fails() {
        let bytes = b"package contents";
        let sig = sign_bytes(bytes, &generate_keypair());
        assert!(!verify_signature(bytes, &generate_keypair().verifying_key(), &sig).unwrap());
    }

    #[test]
    fn wrong_length_signature_is_error() {
        let key = generate_keypair();
        let result = verify_signature(b"x", &key.verifying_key(), &[0u8; 10]);
        assert!(matches!(
            result,
            Err(SignatureError::InvalidEncoding {
                expected: 64,
                actual: 10
            })
        ));
    }

    #[test]
    fn empty_signature_is_error() {
        let key = generate_keypair();
        assert!(verify_signature(b"x", &key.verifying_key(), &[]).is_err());
    }
}
