//! Credential hashing and cipher material for the handshake.
//!
//! The password never crosses the wire. Both sides prove knowledge of it by
//! hashing it together with a random challenge chosen by the other side:
//!
//! ```text
//! D1 = MD5(UTF-16LE(password))
//! D2 = MD5(D1 ++ "WebAPI")
//! D3 = MD5(D2 ++ hex_decode(challenge))
//! ```

use md5::{Digest, Md5};
use rand::RngCore;

use crate::core::text;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::consts::{CryptMethod, WEB_API_WORD};

/// Length of `CRYPT_RAND` in hex characters (16 blocks of 16 bytes).
pub const CRYPT_RAND_HEX_LEN: usize = 16 * 32;

fn md5_of(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// `MD5(MD5(UTF-16LE(password)) ++ "WebAPI")`, the challenge-independent part.
fn password_digest(password: &str) -> [u8; 16] {
    let first = md5_of(&[&text::to_wire(password)]);
    md5_of(&[&first, WEB_API_WORD.as_bytes()])
}

/// Hash `password` against a hex-encoded `challenge`.
///
/// Returns the lowercase hex digest. Fails when the challenge is not hex.
pub fn hash_password(password: &str, challenge: &str) -> Result<String> {
    let challenge = hex::decode(challenge).map_err(|e| ProtocolError::InvalidField {
        field: "challenge",
        reason: e.to_string(),
    })?;
    let digest = md5_of(&[&password_digest(password), &challenge]);
    Ok(hex::encode(digest))
}

/// Random hex string of `byte_len * 2` characters.
pub fn random_hex(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Cipher material agreed after a successful handshake.
///
/// The initialization vector is derived from the server's `CRYPT_RAND` and the
/// password. Packet encryption itself is not implemented: [`CipherState::encrypt`]
/// and [`CipherState::decrypt`] always report [`ProtocolError::UnsupportedCipher`].
#[derive(Clone)]
pub struct CipherState {
    method: CryptMethod,
    crypt_rand: String,
    iv: [[u8; 16]; 16],
}

impl CipherState {
    /// Derive the 16-block initialization vector.
    pub fn derive(crypt_rand: &str, password: &str) -> Result<Self> {
        if crypt_rand.len() != CRYPT_RAND_HEX_LEN {
            return Err(ProtocolError::InvalidField {
                field: "CRYPT_RAND",
                reason: constants::ERR_CRYPT_RAND_LENGTH.into(),
            });
        }
        let rand_bytes = hex::decode(crypt_rand).map_err(|e| ProtocolError::InvalidField {
            field: "CRYPT_RAND",
            reason: e.to_string(),
        })?;

        let mut out = password_digest(password);
        let mut iv = [[0u8; 16]; 16];
        for (block, chunk) in iv.iter_mut().zip(rand_bytes.chunks_exact(16)) {
            out = md5_of(&[chunk, &out]);
            *block = out;
        }

        Ok(Self {
            method: CryptMethod::Aes256Ofb,
            crypt_rand: crypt_rand.to_string(),
            iv,
        })
    }

    pub fn method(&self) -> CryptMethod {
        self.method
    }

    pub fn crypt_rand(&self) -> &str {
        &self.crypt_rand
    }

    pub fn iv(&self) -> &[[u8; 16]; 16] {
        &self.iv
    }

    pub fn encrypt(&mut self, _body: &[u8]) -> Result<Vec<u8>> {
        Err(self.unsupported())
    }

    pub fn decrypt(&mut self, _body: &[u8]) -> Result<Vec<u8>> {
        Err(self.unsupported())
    }

    fn unsupported(&self) -> ProtocolError {
        ProtocolError::UnsupportedCipher(format!(
            "{} ({})",
            constants::ERR_CIPHER_UNSUPPORTED,
            self.method.as_str()
        ))
    }
}

impl std::fmt::Debug for CipherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherState")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
