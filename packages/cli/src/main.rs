#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for Sauce Labs storage.
//!
//! ```text
//! saucestorage list
//! saucestorage put <file> [--name <name>]
//! saucestorage update <file> [--name <name>]
//! saucestorage verify <file> [--name <name>]
//! ```
//!
//! Credentials come from `--username` / `--access-key` or the
//! `SAUCE_USERNAME` / `SAUCE_ACCESS_KEY` environment variables. Add
//! `--json` to any command for machine-readable output.
//!
//! | Exit code | Meaning |
//! |---|---|
//! | 0 | success |
//! | 1 | `verify`: not verified |
//! | 2 | missing or rejected credentials |
//! | 3 | storage unavailable |
//! | 4 | upload rejected or unconfirmed |
//! | 5 | local file unreadable |
//! | 6 | deadline exceeded |

mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sauce_storage::config::{ACCESS_KEY_VAR, ENDPOINT_VAR, USERNAME_VAR};
use sauce_storage::{ClientConfig, Credentials, LocalFile, StorageClient, StorageError};
use sauce_storage_cli_utils::{IndicatifProgress, MultiProgress};

#[derive(Parser)]
#[command(
    name = "saucestorage",
    about = "Upload, list and verify files in Sauce Labs storage"
)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Only log warnings and errors; no progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Sauce Labs username (default: $SAUCE_USERNAME)
    #[arg(long, global = true)]
    username: Option<String>,

    /// Sauce Labs access key (default: $SAUCE_ACCESS_KEY)
    #[arg(long, global = true)]
    access_key: Option<String>,

    /// Storage REST endpoint (default: $SAUCE_STORAGE_ENDPOINT or the public endpoint)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Abandon an operation that takes longer than this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// When the backend reports no checksum, treat equal sizes as a match
    #[arg(long, global = true)]
    trust_size: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored files
    List,
    /// Upload a file, replacing any stored file with the same name
    Put {
        /// File to upload
        file: PathBuf,
        /// Name to store the file under (default: the file's base name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Upload a file only if its content is not already stored
    Update {
        /// File to upload
        file: PathBuf,
        /// Name to store the file under (default: the file's base name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Check whether a file's content is stored, without uploading
    Verify {
        /// File to check
        file: PathBuf,
        /// Stored name to compare against (default: the file's base name)
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let multi = sauce_storage_cli_utils::init_logger(if cli.quiet { "warn" } else { "info" });

    match run(cli, &multi).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            if matches!(e, StorageError::Auth { .. }) {
                log::error!(
                    "Set {USERNAME_VAR} and {ACCESS_KEY_VAR}, or pass --username and --access-key"
                );
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli, multi: &MultiProgress) -> Result<ExitCode, StorageError> {
    let credentials = credentials(&cli)?;
    let config = ClientConfig {
        operation_timeout: cli.timeout.map(Duration::from_secs),
        trust_metadata_match: cli.trust_size,
        ..ClientConfig::default()
    };
    let client = StorageClient::new(credentials, config)?;
    let show_progress = !cli.json && !cli.quiet;
    let with_progress = |client: StorageClient| {
        if show_progress {
            client.with_progress(IndicatifProgress::transfer_bar(multi))
        } else {
            client
        }
    };

    match cli.command {
        Commands::List => {
            let objects = client.list().await?;
            output::emit(objects.as_slice(), cli.json, output::render_list);
        }
        Commands::Put { file, name } => {
            let file = LocalFile::new(file)?.with_name(name);
            let outcome = with_progress(client).put(&file).await?;
            output::emit(&outcome, cli.json, |o| o.url.clone());
        }
        Commands::Update { file, name } => {
            let file = LocalFile::new(file)?.with_name(name);
            let outcome = with_progress(client).update(&file).await?;
            output::emit(&outcome, cli.json, output::render_update);
        }
        Commands::Verify { file, name } => {
            let file = LocalFile::new(file)?.with_name(name);
            let outcome = client.verify(&file).await?;
            output::emit(&outcome, cli.json, output::render_verify);
            if !outcome.verified {
                return Ok(ExitCode::from(1));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Flags take precedence over the environment.
fn credentials(cli: &Cli) -> Result<Credentials, StorageError> {
    Credentials::from_lookup(|name| {
        let flag = match name {
            USERNAME_VAR => cli.username.clone(),
            ACCESS_KEY_VAR => cli.access_key.clone(),
            ENDPOINT_VAR => cli.endpoint.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(name).ok())
    })
}

const fn exit_code(e: &StorageError) -> u8 {
    match e {
        StorageError::Auth { .. } => 2,
        StorageError::RemoteUnavailable { .. } => 3,
        StorageError::UploadRejected { .. } | StorageError::Unconfirmed { .. } => 4,
        StorageError::Io { .. } => 5,
        StorageError::DeadlineExceeded { .. } => 6,
    }
}
