//! sealtoken - authenticated encryption of text into URL-safe tokens
//!
//! ```
//! use sealtoken::Cipher;
//!
//! let cipher = Cipher::new(b"39b04101cac8b8f8c24f4780fd5f1950")?;
//! let token = cipher.encrypt("Hello, World!")?;
//! assert_eq!(cipher.decrypt(&token)?, "Hello, World!");
//! # Ok::<(), sealtoken::SealError>(())
//! ```

#![forbid(unsafe_code)]

pub mod cipher;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod key;
pub mod logging;
pub mod status;
pub mod validation;

pub use cipher::{Cipher, DataEncryptor};
pub use error::{ErrorCode, ErrorKind, Result, SealError};
pub use key::SecretKey;
