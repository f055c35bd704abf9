//! Authenticated encryption of text into URL-safe tokens
//!
//! This module implements single-key authenticated encryption using
//! AES-256 in Galois/Counter Mode. The token format is:
//!
//! ```text
//! base64url-no-padding( nonce[12] || ciphertext || tag[16] )
//! ```
//!
//! A fresh nonce is drawn from the OS CSPRNG on every call. GCM nonce reuse
//! under one key breaks both confidentiality and authentication, so there is
//! no way to encrypt with a caller-chosen nonce through [`Cipher::new`].

use crate::error::{ErrorCode, ErrorKind, Result, SealError};
use crate::key::SecretKey;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

pub use crate::key::KEY_SIZE;

/// Length of the GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Builds the AES-256 block cipher for a key.
pub trait BlockCipherFactory: Send + Sync {
    fn new_block(&self, key: &SecretKey) -> Result<Aes256>;
}

/// Wraps a block cipher in GCM with a 12-byte nonce.
pub trait AeadFactory: Send + Sync {
    fn new_aead(&self, block: Aes256) -> Result<Aes256Gcm>;
}

/// Source of nonce bytes.
///
/// Implementations fill as much of `nonce` as they can and return how many
/// bytes were written. Anything short of the full buffer is rejected by the
/// cipher; a partially random nonce is never used.
pub trait NonceSource: Send + Sync {
    fn fill_nonce(&self, nonce: &mut [u8]) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AesBlockFactory;

impl BlockCipherFactory for AesBlockFactory {
    fn new_block(&self, key: &SecretKey) -> Result<Aes256> {
        Ok(Aes256::new(GenericArray::from_slice(key.as_bytes())))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GcmFactory;

impl AeadFactory for GcmFactory {
    fn new_aead(&self, block: Aes256) -> Result<Aes256Gcm> {
        Ok(Aes256Gcm::from(block))
    }
}

/// Draws nonces from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn fill_nonce(&self, nonce: &mut [u8]) -> Result<usize> {
        OsRng.try_fill_bytes(nonce).map_err(|e| {
            SealError::with_source(ErrorCode::Internal, "secure random source failed", e)
        })?;
        Ok(nonce.len())
    }
}

#[derive(Debug, Error)]
#[error("random source returned {filled} of {NONCE_SIZE} bytes")]
struct ShortNonce {
    filled: usize,
}

/// Encrypts and decrypts text under one secret key.
///
/// Holds nothing but the key and the three construction seams, so a single
/// instance can be shared across threads and reused for any number of calls.
pub struct Cipher<B = AesBlockFactory, A = GcmFactory, N = OsNonceSource> {
    key: SecretKey,
    block_factory: B,
    aead_factory: A,
    nonce_source: N,
}

impl Cipher {
    /// Creates a cipher from raw key bytes, which must be exactly 32 bytes.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Result<Self> {
        Ok(Self::from_key(SecretKey::new(secret_key)?))
    }

    pub fn from_key(key: SecretKey) -> Self {
        Self {
            key,
            block_factory: AesBlockFactory,
            aead_factory: GcmFactory,
            nonce_source: OsNonceSource,
        }
    }
}

impl<B, A, N> Cipher<B, A, N>
where
    B: BlockCipherFactory,
    A: AeadFactory,
    N: NonceSource,
{
    pub fn with_block_factory<B2: BlockCipherFactory>(self, block_factory: B2) -> Cipher<B2, A, N> {
        Cipher {
            key: self.key,
            block_factory,
            aead_factory: self.aead_factory,
            nonce_source: self.nonce_source,
        }
    }

    pub fn with_aead_factory<A2: AeadFactory>(self, aead_factory: A2) -> Cipher<B, A2, N> {
        Cipher {
            key: self.key,
            block_factory: self.block_factory,
            aead_factory,
            nonce_source: self.nonce_source,
        }
    }

    pub fn with_nonce_source<N2: NonceSource>(self, nonce_source: N2) -> Cipher<B, A, N2> {
        Cipher {
            key: self.key,
            block_factory: self.block_factory,
            aead_factory: self.aead_factory,
            nonce_source,
        }
    }

    /// Encrypts bytes into a token.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let aead = self.aead()?;

        let mut nonce = [0u8; NONCE_SIZE];
        let filled = self.nonce_source.fill_nonce(&mut nonce).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::NonceGeneration,
                "could not create nonce",
                e,
            )
        })?;
        if filled != NONCE_SIZE {
            return Err(SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::NonceGeneration,
                "could not create nonce",
                ShortNonce { filled },
            ));
        }

        let sealed = aead
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| {
                SealError::with_kind(
                    ErrorCode::Internal,
                    ErrorKind::SealFailure,
                    "could not seal plaintext",
                )
            })?;

        let mut raw = Vec::with_capacity(NONCE_SIZE + sealed.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Decrypts a token back into bytes.
    ///
    /// Every authentication failure yields the same source-less error,
    /// whatever the reason the tag did not verify.
    pub fn open(&self, token: &str) -> Result<Vec<u8>> {
        let aead = self.aead()?;

        let raw = URL_SAFE_NO_PAD.decode(token).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::TokenDecode,
                "could not decode ciphertext",
                e,
            )
        })?;

        if raw.len() < NONCE_SIZE {
            return Err(SealError::with_kind(
                ErrorCode::Internal,
                ErrorKind::TokenTooShort,
                "ciphertext too short",
            ));
        }

        let (nonce, sealed) = raw.split_at(NONCE_SIZE);
        aead.decrypt(Nonce::from_slice(nonce), sealed).map_err(|_| {
            SealError::with_kind(
                ErrorCode::Internal,
                ErrorKind::AuthenticationFailed,
                "could not decrypt ciphertext",
            )
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.seal(plaintext.as_bytes())
    }

    pub fn decrypt(&self, token: &str) -> Result<String> {
        let plaintext = self.open(token)?;
        // Keep only the Utf8Error as source; FromUtf8Error would carry the plaintext.
        String::from_utf8(plaintext).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::InvalidUtf8,
                "decrypted plaintext is not valid UTF-8",
                e.utf8_error(),
            )
        })
    }

    fn aead(&self) -> Result<Aes256Gcm> {
        let block = self.block_factory.new_block(&self.key).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::CipherInit,
                "could not create cipher block",
                e,
            )
        })?;
        self.aead_factory.new_aead(block).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::AeadInit,
                "could not create GCM block cipher",
                e,
            )
        })
    }
}

impl<B, A, N> fmt::Debug for Cipher<B, A, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

/// Text encryption as seen by callers that only need encrypt/decrypt.
pub trait DataEncryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    fn decrypt(&self, token: &str) -> Result<String>;
}

impl<B, A, N> DataEncryptor for Cipher<B, A, N>
where
    B: BlockCipherFactory,
    A: AeadFactory,
    N: NonceSource,
{
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        Cipher::encrypt(self, plaintext)
    }

    fn decrypt(&self, token: &str) -> Result<String> {
        Cipher::decrypt(self, token)
    }
}
