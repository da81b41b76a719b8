use std::{error::Error, io, process};

use clap::{command, Parser, Subcommand, ValueHint};
use log::{debug, error, info, warn, LevelFilter};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use yamusic::{
    config::Config,
    error::ErrorKind,
    http::Client,
    protocol::{tracks, Response},
    signal,
    token::Token,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Secrets file
    ///
    /// TOML file with a `token` key holding your OAuth token. Keep it
    /// private: the token grants full access to your account. Requests are
    /// sent anonymously when the file does not exist.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// API endpoint
    #[arg(long, value_hint = ValueHint::Url, env = "YAMUSIC_BASE_URL", default_value_t = String::from(Config::DEFAULT_BASE_URL))]
    base_url: String,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Subcommand)]
enum Command {
    /// Saved playback queues
    #[command(subcommand)]
    Queues(QueuesCommand),

    /// Track metadata and downloads
    #[command(subcommand)]
    Tracks(TracksCommand),
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Subcommand)]
enum QueuesCommand {
    /// List your queues
    List,

    /// Show the tracks of a queue
    Get {
        /// Queue ID
        id: String,
    },
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Subcommand)]
enum TracksCommand {
    /// Show metadata of one or more tracks
    Get {
        /// Track IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List the codecs and bitrates a track can be downloaded in
    DownloadInfo {
        /// Track ID
        id: String,
    },
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            // Quiet and verbose are mutually exclusive, and `verbose` is 0
            // by default. So this arm means: quiet mode.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Loads the OAuth token, if there is one.
///
/// A missing secrets file is not an error: the API serves some resources
/// anonymously.
fn load_token(secrets_file: &str) -> yamusic::error::Result<Option<Token>> {
    match Token::from_file(secrets_file) {
        Ok(token) => Ok(Some(token)),
        Err(e) if e.kind == ErrorKind::NotFound => {
            info!("{secrets_file} not found, continuing without a token");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Prints the envelope as JSON and reports a logical failure.
///
/// Returns `false` when the service reported an error.
fn report<T>(response: &Response<T>) -> Result<bool, Box<dyn Error>>
where
    T: Serialize,
{
    serde_json::to_writer_pretty(io::stdout().lock(), response)?;
    println!();

    if let Some(e) = response.error() {
        warn!("service reported {e}");
        return Ok(false);
    }

    Ok(true)
}

/// Runs a single command.
///
/// # Errors
///
/// Returns an error when the token cannot be loaded, the request fails or
/// is interrupted.
async fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let token = load_token(&args.secrets_file)?;
    let config = Config::new(token).with_base_url(&args.base_url)?;
    let client = Client::new(&config)?;

    // Cancel the in-flight request on Ctrl-C or SIGTERM.
    let cancel = CancellationToken::new();
    let signals = signal::Handler::new()?;
    tokio::spawn(signals.cancel_on_signal(cancel.clone()));

    let ok = match args.command {
        Command::Queues(QueuesCommand::List) => {
            let (response, raw) = client.queues().list(&cancel).await?;
            debug!("{} {}", raw.status, raw.url);
            report(&response)?
        }
        Command::Queues(QueuesCommand::Get { id }) => {
            let (response, raw) = client.queues().get(&cancel, &id).await?;
            debug!("{} {}", raw.status, raw.url);
            report(&response)?
        }
        Command::Tracks(TracksCommand::Get { ids }) => {
            let (response, raw) = client.tracks().get_tracks(&cancel, ids.as_slice()).await?;
            debug!("{} {}", raw.status, raw.url);
            let returned = tracks::by_id(&response.result);
            let missing = ids
                .iter()
                .filter(|id| !returned.contains_key(id.as_str()))
                .count();
            if missing > 0 {
                warn!("{missing} of {} tracks not returned", ids.len());
            }
            report(&response)?
        }
        Command::Tracks(TracksCommand::DownloadInfo { id }) => {
            let (response, raw) = client.tracks().get_download_info(&cancel, &id).await?;
            debug!("{} {}", raw.status, raw.url);
            report(&response)?
        }
    };

    // Stop the signal task.
    cancel.cancel();
    Ok(ok)
}

/// Main entry point of the application.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    debug!("starting {name}/{version}; {BUILD_PROFILE}");

    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}
