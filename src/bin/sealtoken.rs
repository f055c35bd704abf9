//! sealtoken CLI - AES-256-GCM token encryption of text files
//!
//! The secret key comes from stdin (`--key-stdin`), the
//! `SEALTOKEN_SECRET_KEY` environment variable, or a terminal prompt, in
//! that order of preference.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use sealtoken::config::Settings;
use sealtoken::file_ops;
use sealtoken::key::{KeyReader, ReaderKeyReader, SecretKey, TerminalKeyReader};
use sealtoken::{Cipher, Result};

#[derive(Parser)]
#[command(name = "sealtoken")]
#[command(version)]
#[command(about = "Authenticated encryption of text files into URL-safe tokens.", long_about = None)]
struct Cli {
    /// Read the secret key from stdin instead of the environment or terminal
    #[arg(long, global = true)]
    key_stdin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a text file into a token
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the token to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt a token file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the file holding the token
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the file to write the plaintext to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Update a token file with new content, while validating
    /// that the key is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing token file to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;
    settings.logger_config().build()?.install()?;

    // Failures already reach stderr as the `Error:` line.
    let logs_to_file = settings.log_file.is_some();
    execute(cli, &settings).inspect_err(|e| {
        if logs_to_file {
            tracing::error!(
                code = ?e.code(),
                kind = ?e.kind,
                error = e.message(),
                "command failed"
            );
        }
    })
}

fn execute(cli: Cli, settings: &Settings) -> Result<()> {
    let key = read_key(cli.key_stdin, settings)?;
    let cipher = Cipher::from_key(key);

    match cli.command {
        Commands::Encrypt { input, output } => file_ops::encrypt_file(&input, &output, &cipher),
        Commands::Decrypt { input, output } => file_ops::decrypt_file(&input, &output, &cipher),
        Commands::Update { input, output } => file_ops::update_file(&input, &output, &cipher),
    }
}

fn read_key(use_stdin: bool, settings: &Settings) -> Result<SecretKey> {
    if use_stdin {
        return ReaderKeyReader::new(Box::new(std::io::stdin())).read_key();
    }
    match settings.secret_key()? {
        Some(key) => Ok(key),
        None => TerminalKeyReader::new().read_key(),
    }
}
