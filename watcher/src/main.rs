//! Lobby discovery watcher CLI.
//!
//! Tails a game console log for lobby identifiers and resolves each newly
//! observed identifier against the coordinator, exactly once, with bounded
//! retries and a supervised restart path.

use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use watcher::exit_codes;
use watcher::io::config::{WatcherConfig, load_config, write_config};
use watcher::io::coordinator::Credentials;
use watcher::io::tailer::LogTailer;
use watcher::logging;
use watcher::supervisor::run_supervised;

#[derive(Parser)]
#[command(
    name = "lobbywatch",
    version,
    about = "Watches a console log for lobby ids and resolves them against the coordinator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Tail the log and reconcile lobby detail requests until interrupted.
    Run {
        #[arg(short, long, default_value = "lobbywatch.toml")]
        config: PathBuf,
    },
    /// Force-read the whole log once and print the current lobby id.
    Scan {
        #[arg(short, long, default_value = "lobbywatch.toml")]
        config: PathBuf,
    },
    /// Write the default config file.
    Init {
        #[arg(short, long, default_value = "lobbywatch.toml")]
        config: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { config } => cmd_run(&config),
        Command::Scan { config } => cmd_scan(&config),
        Command::Init { config, force } => cmd_init(&config, force),
    }
}

fn cmd_run(config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let credentials = Credentials::from_env()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("register SIGTERM handler")?;

    run_supervised(&config, &credentials, &shutdown)?;
    Ok(exit_codes::OK)
}

fn cmd_scan(config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let mut tailer = LogTailer::new(&config.log_path, config.pattern()?);
    match tailer.poll(true) {
        Some(id) => {
            println!("{id}");
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!("no lobby marker found in {}", config.log_path.display());
            Ok(exit_codes::NO_MARKER)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &WatcherConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}
