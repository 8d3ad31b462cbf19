//! BioKey developer CLI.
//!
//! Drives the key manager against the file-backed software key store. Every
//! decryption asks for confirmation on the console, standing in for the
//! biometric prompt of a phone.

mod console;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use biokey_core::platform::{PresenceGate, SoftwareAuthenticator, SoftwareKeyStore};
use biokey_core::{CryptoKeyError, CryptoKeyManager, KeyConfig, PromptOptions};
use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use tracing_subscriber::EnvFilter;

use console::ConsoleVerifier;

#[derive(Parser)]
#[command(name = "biokey")]
#[command(version)]
#[command(about = "Biometric-gated RSA key lifecycle, backed by a software key store")]
#[command(after_help = "EXAMPLES:
  biokey init-key
  biokey encrypt 'hello'              Prints base64 ciphertext
  biokey decrypt <BASE64>             Asks for confirmation, prints plaintext
  biokey decrypt --yes --hex <BASE64>")]
struct Cli {
    /// Directory holding the software keys
    #[arg(long, env = "BIOKEY_HOME", global = true)]
    home: Option<PathBuf>,

    /// Alias of the key pair
    #[arg(long, env = "BIOKEY_ALIAS", global = true)]
    alias: Option<String>,

    /// Enable debug logging (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the key pair unless it already exists
    InitKey,

    /// Delete the key pair
    DeleteKey,

    /// Encrypt data with the public key and print it as base64
    Encrypt {
        /// Plaintext, as UTF-8 text or hex with `--hex`
        data: String,

        /// Treat `data` as hex
        #[arg(long)]
        hex: bool,
    },

    /// Decrypt base64 ciphertext after a presence confirmation
    Decrypt {
        /// Base64 ciphertext produced by `encrypt`
        ciphertext: String,

        /// Prompt title
        #[arg(long)]
        title: Option<String>,

        /// Prompt subtitle
        #[arg(long)]
        subtitle: Option<String>,

        /// Prompt description
        #[arg(long)]
        description: Option<String>,

        /// Label of the negative action
        #[arg(long)]
        negative_button_text: Option<String>,

        /// Approve the confirmation without asking
        #[arg(short, long)]
        yes: bool,

        /// Print the plaintext as hex
        #[arg(long)]
        hex: bool,
    },

    /// Report whether an authentication challenge can be presented
    Available,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(key_err) = err.downcast_ref::<CryptoKeyError>() {
                eprintln!("{}: {key_err}", key_err.code());
            } else {
                eprintln!("error: {err:?}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directives = if verbose {
        "biokey_cli=debug,biokey_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn key_home(explicit: Option<PathBuf>) -> eyre::Result<PathBuf> {
    explicit
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("biokey")))
        .ok_or_else(|| eyre!("cannot determine a data directory; set BIOKEY_HOME"))
}

fn build_manager(
    home: &Path,
    alias: Option<String>,
    assume_yes: bool,
) -> eyre::Result<CryptoKeyManager> {
    tracing::debug!(home = %home.display(), "using key directory");

    let presence = Arc::new(PresenceGate::new());
    let store = SoftwareKeyStore::in_directory(home, Arc::clone(&presence))
        .wrap_err_with(|| format!("failed to open key directory {}", home.display()))?;
    let authenticator = SoftwareAuthenticator::new(presence, ConsoleVerifier::new(assume_yes));
    let config = alias.map_or_else(KeyConfig::default, KeyConfig::with_alias);

    Ok(CryptoKeyManager::new(
        Arc::new(store),
        Arc::new(authenticator),
        config,
    )?)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let home = key_home(cli.home)?;
    let assume_yes = matches!(cli.command, Commands::Decrypt { yes: true, .. });
    let manager = build_manager(&home, cli.alias, assume_yes)?;

    match cli.command {
        Commands::InitKey => {
            manager.init_key()?;
            println!("key '{}' ready", manager.config().alias);
        }
        Commands::DeleteKey => {
            manager.delete_key()?;
            println!("key '{}' deleted", manager.config().alias);
        }
        Commands::Encrypt { data, hex } => {
            let plaintext = if hex {
                hex::decode(data.trim()).wrap_err("data is not valid hex")?
            } else {
                data.into_bytes()
            };
            let ciphertext = manager.encrypt(plaintext)?;
            println!("{}", STANDARD.encode(ciphertext));
        }
        Commands::Decrypt {
            ciphertext,
            title,
            subtitle,
            description,
            negative_button_text,
            yes: _,
            hex,
        } => {
            let ciphertext = STANDARD
                .decode(ciphertext.trim())
                .wrap_err("ciphertext is not valid base64")?;
            let prompt = PromptOptions {
                title,
                subtitle,
                description,
                negative_button_text,
            };
            let plaintext = manager.decrypt(ciphertext, prompt)?;
            if hex {
                println!("{}", hex::encode(plaintext));
            } else {
                let text = String::from_utf8(plaintext)
                    .wrap_err("plaintext is not UTF-8; rerun with --hex")?;
                println!("{text}");
            }
        }
        Commands::Available => {
            println!("{}", manager.is_biometric_available());
        }
    }
    Ok(())
}
