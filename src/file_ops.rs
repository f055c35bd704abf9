//! File encryption/decryption operations
//!
//! This module provides high-level file operations for encrypting, decrypting,
//! and updating files holding sealed tokens.

use crate::cipher::{AeadFactory, BlockCipherFactory, Cipher, NonceSource};
use crate::error::{ErrorCode, ErrorKind, Result, SealError};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Encrypt a text file
///
/// Reads UTF-8 plaintext from `input_path`, encrypts it with `cipher`, and
/// writes the token to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file<B, A, N>(
    input_path: &Path,
    output_path: &Path,
    cipher: &Cipher<B, A, N>,
) -> Result<()>
where
    B: BlockCipherFactory,
    A: AeadFactory,
    N: NonceSource,
{
    let plaintext = read_text(input_path, "input file is not valid UTF-8")?;
    let token = cipher
        .encrypt(&plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, token.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    tracing::debug!(output = %output_path.display(), token_len = token.len(), "encrypted file");

    Ok(())
}

/// Decrypt a token file
///
/// Reads a token from `input_path` (surrounding whitespace is ignored),
/// decrypts it with `cipher`, and writes the plaintext to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file<B, A, N>(
    input_path: &Path,
    output_path: &Path,
    cipher: &Cipher<B, A, N>,
) -> Result<()>
where
    B: BlockCipherFactory,
    A: AeadFactory,
    N: NonceSource,
{
    let token = read_text(input_path, "input file is not valid UTF-8")?;
    let plaintext = cipher
        .decrypt(token.trim())
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_secure(output_path, plaintext.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    tracing::debug!(output = %output_path.display(), "decrypted file");
    Ok(())
}

/// Update a token file with new plaintext under the same key
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the key
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// The atomic write ensures that either the old file or the new file exists,
/// never a partial/corrupted file.
///
/// The key validation prevents accidentally re-encrypting under a different key.
pub fn update_file<B, A, N>(
    plain_path: &Path,
    crypt_path: &Path,
    cipher: &Cipher<B, A, N>,
) -> Result<()>
where
    B: BlockCipherFactory,
    A: AeadFactory,
    N: NonceSource,
{
    let token = read_text(crypt_path, "encrypted file is not valid UTF-8")?;

    // Validate the key by opening the existing token (discard plaintext)
    cipher
        .open(token.trim())
        .map_err(|e| e.with_context("failed to decrypt"))?;

    // Great, let's re-write it (atomically).
    let crypt_dir = match crypt_path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => {
            return Err(SealError::with_kind(
                ErrorCode::BadRequest,
                ErrorKind::Io,
                "crypt_path has no parent directory",
            ));
        }
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(crypt_dir)
        .map_err(|e| io_error(ErrorCode::Internal, "failed to create tempfile", e))?;
    let new_plaintext = read_text(plain_path, "input file is not valid UTF-8")?;
    let new_token = cipher
        .encrypt(&new_plaintext)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    temp_file
        .write_all(new_token.as_bytes())
        .map_err(|e| io_error(ErrorCode::Internal, "failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error(ErrorCode::Internal, "failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error(ErrorCode::Internal, "failed to sync file prior to rename", e))?;

    // Atomically rename temp file to target (persist with restrictive permissions)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| io_error(ErrorCode::Internal, "failed to get tempfile metadata", e))?
            .permissions();
        perms.set_mode(0o600);
        temp_file
            .as_file()
            .set_permissions(perms)
            .map_err(|e| io_error(ErrorCode::Internal, "failed to set tempfile permissions", e))?;
    }
    temp_file.persist(crypt_path).map_err(|e| {
        io_error(
            ErrorCode::Internal,
            format!("failed to rename to target file {}", crypt_path.display()),
            e.error,
        )
    })?;
    tracing::debug!(output = %crypt_path.display(), "updated file");
    Ok(())
}

fn read_text(path: &Path, not_utf8_msg: &'static str) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        SealError::with_kind_and_source(
            ErrorCode::BadRequest,
            ErrorKind::Io,
            not_utf8_msg,
            e.utf8_error(),
        )
    })
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| {
                io_error(ErrorCode::BadRequest, format!("failed to open {}", path.display()), e)
            })?;

        file.write_all(contents).map_err(|e| {
            io_error(ErrorCode::Internal, format!("failed to write {}", path.display()), e)
        })?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| {
            io_error(ErrorCode::BadRequest, format!("failed to write {}", path.display()), e)
        })?;
        Ok(())
    }
}

fn io_error(code: ErrorCode, msg: impl Into<String>, err: io::Error) -> SealError {
    SealError::with_kind_and_source(code, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> SealError {
    let code = if err.kind() == io::ErrorKind::NotFound {
        ErrorCode::BadRequest
    } else {
        ErrorCode::Internal
    };
    io_error(code, format!("failed to read from {}", path.display()), err)
}
