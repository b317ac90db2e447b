//! autotag CLI entry point
//!
//! Recognize every MP3/Opus file in a directory with Shazam (through
//! songrec), rename it to `Title - Artist - Album.ext` and rewrite its tags
//! and cover art.
//!
//! Defaults can be saved to ~/.state/autotag/defaults.toml with
//! `--save-defaults`. Saved defaults override built-in defaults, and
//! command-line options override both.

use std::path::PathBuf;
use std::process::ExitCode;

use autotag::config::{Config, Settings};
use autotag::{
    AutotagError, BatchDriver, FormatTagWriters, HttpCoverFetcher, SongrecRecognizer,
    ThreadSleeper,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Rename and retag audio files from their Shazam recognition
#[derive(Parser, Debug)]
#[command(name = "autotag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to scan recursively for .mp3 and .opus files
    #[arg(value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Allow directories reserved for the self-test fixtures (path segment "test")
    #[arg(long)]
    test: bool,

    /// Rename and retag files; `--modify false` only reports what would change
    #[arg(long, value_name = "BOOL")]
    modify: Option<bool>,

    /// Seconds to wait between recognition attempts
    #[arg(long, value_name = "SECONDS")]
    delay: Option<u64>,

    /// Recognition attempts per file
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Trace-level diagnostics (cover art problems, state transitions)
    #[arg(long)]
    trace: bool,

    /// Recognizer command (songrec compatible)
    #[arg(long, value_name = "CMD")]
    recognizer: Option<String>,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Save the given options as defaults
    #[arg(long)]
    save_defaults: bool,

    /// Show saved defaults and exit
    #[arg(long)]
    show_saved_defaults: bool,
}

impl Cli {
    fn to_config(&self) -> Config {
        Config {
            delay_seconds: self.delay,
            max_retries: self.retries,
            modify: self.modify,
            trace: self.trace.then_some(true),
            recognizer_command: self.recognizer.clone(),
            http_timeout_seconds: None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.show_saved_defaults {
        return show_saved_defaults();
    }

    let saved_config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let cmdline_config = cli.to_config();

    if cli.save_defaults {
        let mut to_save = saved_config.clone();
        to_save.merge(&cmdline_config);
        match to_save.save() {
            Ok(path) => println!("Saved defaults to {}", path.display()),
            Err(e) => {
                eprintln!("Error: could not save defaults: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(directory) = cli.directory.clone() else {
        if cli.save_defaults {
            return ExitCode::SUCCESS;
        }
        eprintln!("Error: no directory given\n\n  Usage: autotag <DIR> [OPTIONS]");
        return ExitCode::FAILURE;
    };

    let mut effective = saved_config;
    effective.merge(&cmdline_config);
    let mut settings = Settings::from_config(directory, &effective);
    settings.test_mode = cli.test;
    settings.show_progress = !cli.quiet;

    init_logging(&settings, cli.verbose);

    run(&settings)
}

fn run(settings: &Settings) -> ExitCode {
    let service = SongrecRecognizer::new(&settings.recognizer_command);
    let sleeper = ThreadSleeper;
    let writers = FormatTagWriters::default();
    let fetcher = HttpCoverFetcher::new(settings.http_timeout);

    let driver = BatchDriver {
        service: &service,
        sleeper: &sleeper,
        writers: &writers,
        fetcher: &fetcher,
    };

    match driver.process_directory(settings) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e @ AutotagError::RejectedDirectory(_)) => {
            println!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn show_saved_defaults() -> ExitCode {
    let config_path = match Config::get_config_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if !config_path.exists() {
        println!("No saved defaults file found at {:?}", config_path);
        println!("Use --save-defaults to create one.");
        return ExitCode::SUCCESS;
    }
    match Config::load_from(&config_path) {
        Ok(config) => {
            config.print("Saved defaults");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(settings: &Settings, verbose: u8) {
    let level = if settings.trace {
        "trace"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = format!("warn,autotag={}", level);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter)),
        )
        .with_target(false)
        .init();
}
