//! `sks`: developer CLI for the secure key store.
//!
//! Keys live in owner-only files under `<data-dir>/keys`; encrypted records
//! live in `<data-dir>/preferences.json`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::{eyre, WrapErr};
use secure_key_store::platform::{FileKeyService, FilePreferences};
use secure_key_store::{SecureKeyStore, SecureStoreError, StoreConfig, DEFAULT_KEY_ALIAS};
use tracing_subscriber::EnvFilter;

const PREFERENCES_FILE: &str = "preferences.json";
const KEYS_DIR: &str = "keys";

#[derive(Parser, Debug)]
#[command(name = "sks", version, about = "Store, read and remove encrypted values")]
struct Cli {
    /// Directory holding the key files and the record document.
    #[arg(long, env = "SKS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Alias of the master key.
    #[arg(long, env = "SKS_KEY_ALIAS", default_value = DEFAULT_KEY_ALIAS)]
    key_alias: String,

    /// Keep existing records when the installed flag is missing.
    #[arg(long)]
    no_reset_on_uninstall: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt and store a value.
    Set { key: String, value: String },
    /// Decrypt and print a value.
    Get { key: String },
    /// Delete a value.
    Remove { key: String },
    /// Wipe every value and rotate the master key.
    Reset,
}

fn default_data_dir() -> eyre::Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("secure-key-store"))
        .ok_or_else(|| eyre!("no platform data directory; pass --data-dir"))
}

fn open_store(data_dir: &Path, config: StoreConfig) -> eyre::Result<SecureKeyStore> {
    let preferences = FilePreferences::open(data_dir.join(PREFERENCES_FILE))
        .wrap_err_with(|| format!("failed to open records in {}", data_dir.display()))?;
    let key_service = FileKeyService::new(data_dir.join(KEYS_DIR));

    let store = SecureKeyStore::new(config, Arc::new(key_service), Arc::new(preferences));
    store.initialize();
    Ok(store)
}

fn execute(store: &SecureKeyStore, command: Command) -> Result<String, SecureStoreError> {
    match command {
        Command::Set { key, value } => store.set(&key, &value).map(str::to_string),
        Command::Get { key } => store.get(&key),
        Command::Remove { key } => store.remove(&key).map(str::to_string),
        Command::Reset => store.reset().map(str::to_string),
    }
}

fn run(cli: Cli) -> eyre::Result<ExitCode> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    tracing::debug!(data_dir = %data_dir.display(), "opening secure key store");

    let config = StoreConfig {
        key_alias: cli.key_alias,
        reset_on_app_uninstall: !cli.no_reset_on_uninstall,
    };
    let store = open_store(&data_dir, config)?;

    match execute(&store, cli.command) {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(code = err.code(), "operation failed");
            eprintln!("{}", err.payload());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> eyre::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
