use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use spellbridge::settings::dictionary_target::DictionaryFileTarget;
use spellbridge::settings::helper::{
    add_custom_dictionary_to_config, calc_dictionary_info_for_repository,
    create_custom_dictionary_file,
};
use spellbridge::settings::words::{merge_words, normalize_words, remove_words};
use spellbridge::settings::{
    ConfigRepository, CSpellConfigRepository, ConfigUpdater, DictionaryDefinition, DictionaryTarget,
};

/// Editor client for a spell-checking language server
///
/// Manages the layered spell-checker configuration from the command line:
/// word lists in config files and custom dictionaries.
#[derive(Parser, Debug)]
#[command(name = "spellbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage word lists in a config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage custom dictionary files
    Dictionary {
        #[command(subcommand)]
        action: DictionaryAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Add words to the config file's word list
    AddWords {
        /// Config file (cspell.json, cspell.yaml, package.json, ...)
        #[arg(short, long)]
        config: PathBuf,
        words: Vec<String>,
    },
    /// Remove words from the config file's word list
    RemoveWords {
        #[arg(short, long)]
        config: PathBuf,
        words: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DictionaryAction {
    /// Add words to a custom dictionary file
    Add {
        /// Dictionary file (.txt, one word per line)
        #[arg(short, long)]
        path: PathBuf,
        words: Vec<String>,
    },
    /// Remove words from a custom dictionary file
    Remove {
        #[arg(short, long)]
        path: PathBuf,
        words: Vec<String>,
    },
    /// Create a custom dictionary and register it in a config file
    Create {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn setup_logging(log_level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = fmt().with_env_filter(filter).with_target(true);

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)?;
        subscriber.with_writer(file).with_ansi(false).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, args.log_file)?;

    match args.command {
        Command::Config { action } => run_config_action(action).await?,
        Command::Dictionary { action } => run_dictionary_action(action).await?,
    }

    Ok(())
}

async fn run_config_action(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::AddWords { config, words } => {
            let words = normalize_words(&words);
            let rep = CSpellConfigRepository::from_path(config);
            rep.update(&ConfigUpdater::update_words(move |current| {
                merge_words(current, &words)
            }))
            .await?;
            info!("Updated {}", rep.name());
        }
        ConfigAction::RemoveWords { config, words } => {
            let words = normalize_words(&words);
            let rep = CSpellConfigRepository::from_path(config);
            rep.update(&ConfigUpdater::update_words(move |current| {
                remove_words(current, &words)
            }))
            .await?;
            info!("Updated {}", rep.name());
        }
    }
    Ok(())
}

async fn run_dictionary_action(action: DictionaryAction) -> Result<()> {
    match action {
        DictionaryAction::Add { path, words } => {
            let words = normalize_words(&words);
            let target = DictionaryFileTarget::new(path, None);
            target.add_words(&words).await?;
            info!("Added {} word(s) to {}", words.len(), target.name());
        }
        DictionaryAction::Remove { path, words } => {
            let words = normalize_words(&words);
            let target = DictionaryFileTarget::new(path, None);
            target.remove_words(&words).await?;
            info!("Removed {} word(s) from {}", words.len(), target.name());
        }
        DictionaryAction::Create { config } => {
            let rep = CSpellConfigRepository::from_path(config);
            let dict = calc_dictionary_info_for_repository(&rep)?;
            create_custom_dictionary_file(&dict.path, false).await?;
            add_custom_dictionary_to_config(
                &rep,
                DictionaryDefinition {
                    name: dict.name.clone(),
                    path: dict.rel_path.clone(),
                    add_words: Some(true),
                    scope: dict.scope.map(|s| s.as_str().to_string()),
                },
            )
            .await?;
            println!("{}", dict.path.display());
        }
    }
    Ok(())
}
