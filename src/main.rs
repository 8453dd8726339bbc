//! pageforge - generate, preview and refine single-page web apps
//!
//! This is the binary entry point. Orchestration lives in `pageforge-app`.

mod headless;
mod keys;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;

use pageforge_app::config;
use pageforge_core::{paths, GenerationMode, Provider};

use headless::runner::{run_headless, HeadlessOptions};

/// pageforge - generate, preview and refine single-page web apps
#[derive(Parser, Debug)]
#[command(name = "pageforge")]
#[command(about = "Generate, preview and refine single-page web apps", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an app and stream progress as JSON lines (commands on stdin)
    Build {
        /// App description, or the page address with --url
        #[arg(value_name = "INPUT")]
        input: String,

        /// Recreate the page at INPUT instead of following a description
        #[arg(long)]
        url: bool,

        /// Write the finished document to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Exit when the generation (and export) is done
        #[arg(long)]
        exit: bool,
    },

    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Write a default config.toml
    Init,
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Show which keys are configured
    List,
    /// Store a key
    Set {
        provider: Provider,
        value: String,
    },
    /// Check stored keys against their providers
    Validate { provider: Option<Provider> },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    pageforge_core::logging::init()?;

    let config_dir = paths::config_home();
    let data_dir = paths::data_home();
    info!(
        "Config dir: {}, data dir: {}",
        config_dir.display(),
        data_dir.display()
    );

    match args.command {
        Command::Build {
            input,
            url,
            output,
            exit,
        } => {
            let options = HeadlessOptions {
                mode: if url {
                    GenerationMode::Url
                } else {
                    GenerationMode::Prompt
                },
                input,
                output,
                exit_when_done: exit,
            };
            if !run_headless(&config_dir, &data_dir, options).await? {
                std::process::exit(1);
            }
        }
        Command::Keys { action } => match action {
            KeysAction::List => keys::list(&data_dir),
            KeysAction::Set { provider, value } => keys::set(&data_dir, provider, &value)?,
            KeysAction::Validate { provider } => {
                if !keys::validate(&config_dir, &data_dir, provider).await? {
                    std::process::exit(1);
                }
            }
        },
        Command::Init => {
            if config::init_config_dir(&config_dir)? {
                eprintln!(
                    "✅ Wrote {}",
                    config_dir.join(config::CONFIG_FILENAME).display()
                );
            } else {
                eprintln!(
                    "{} already exists, leaving it unchanged.",
                    config_dir.join(config::CONFIG_FILENAME).display()
                );
            }
        }
    }

    Ok(())
}
