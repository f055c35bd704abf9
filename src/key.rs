//! Secret key storage and key acquisition

use crate::error::{ErrorCode, ErrorKind, Result, SealError};
use std::fmt;
use std::io::{self, IsTerminal, Read, Write};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Message of the error returned for a wrongly sized key
pub(crate) const KEY_LENGTH_MESSAGE: &str = "secret key must be 32 bytes long";

/// A 256-bit secret key, wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Validates and copies raw key bytes.
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            SealError::with_kind(
                ErrorCode::BadRequest,
                ErrorKind::InvalidKeyLength,
                KEY_LENGTH_MESSAGE,
            )
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Trait for obtaining a secret key from various sources
pub trait KeyReader {
    fn read_key(&mut self) -> Result<SecretKey>;
}

/// Returns a fixed key (for testing)
pub struct ConstantKeyReader {
    key: Zeroizing<Vec<u8>>,
}

impl ConstantKeyReader {
    pub fn new(key: Vec<u8>) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }
}

impl KeyReader for ConstantKeyReader {
    fn read_key(&mut self) -> Result<SecretKey> {
        SecretKey::new(&*self.key)
    }
}

/// Reads a key from any io::Read source
///
/// A single trailing newline (`\n` or `\r\n`) is dropped so that
/// `echo "$KEY" | sealtoken --key-stdin ...` works.
pub struct ReaderKeyReader {
    reader: Box<dyn Read>,
}

impl ReaderKeyReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl KeyReader for ReaderKeyReader {
    fn read_key(&mut self) -> Result<SecretKey> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::Io,
                "error reading secret key",
                e,
            )
        })?;
        SecretKey::new(strip_newline(&data))
    }
}

fn strip_newline(data: &[u8]) -> &[u8] {
    let data = data.strip_suffix(b"\n").unwrap_or(data);
    data.strip_suffix(b"\r").unwrap_or(data)
}

/// Reads a key from the terminal with no echo
#[derive(Default)]
pub struct TerminalKeyReader;

impl TerminalKeyReader {
    pub fn new() -> Self {
        Self
    }
}

impl KeyReader for TerminalKeyReader {
    fn read_key(&mut self) -> Result<SecretKey> {
        if !io::stdin().is_terminal() {
            return Err(SealError::with_kind(
                ErrorCode::BadRequest,
                ErrorKind::KeyUnavailable,
                "cannot read secret key from terminal - stdin is not a terminal",
            ));
        }

        let mut stderr = io::stderr();
        stderr
            .write_all(b"Secret key (sealtoken): ")
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                SealError::with_kind_and_source(
                    ErrorCode::Internal,
                    ErrorKind::Io,
                    "failed to write prompt",
                    e,
                )
            })?;

        // rpassword hands back a plain String; wipe it once copied.
        let key = Zeroizing::new(rpassword::read_password().map_err(|e| {
            SealError::with_kind_and_source(
                ErrorCode::Internal,
                ErrorKind::KeyUnavailable,
                "failure reading secret key",
                e,
            )
        })?);

        SecretKey::new(key.as_bytes())
    }
}
