//! Passafari CLI — `passafari` command.
//!
//! Searches a pass-style password store, reveals entries, and manages the
//! keys and configuration used to decrypt them.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use passafari::{
    ClipboardTarget, Config, EntryPath, PassError, Passphrase, Presenter, Status, Store,
};

// ── Terminal helpers ──────────────────────────────────────────────────────────

/// Prompt on the terminal without echo. Empty input dismisses.
fn read_passphrase(entry: &EntryPath) -> Option<Passphrase> {
    passphrase_from_input(rpassword::prompt_password(format!(
        "Passphrase to unlock {}: ",
        entry.name()
    )))
}

fn passphrase_from_input(input: std::io::Result<String>) -> Option<Passphrase> {
    match input {
        Ok(input) => {
            let passphrase = Passphrase::new(input);
            if passphrase.is_empty() {
                None
            } else {
                Some(passphrase)
            }
        }
        Err(e) => {
            log::warn!("could not read passphrase: {e}");
            None
        }
    }
}

/// System clipboard.
struct SystemClipboard(arboard::Clipboard);

impl SystemClipboard {
    fn open() -> Result<Self> {
        arboard::Clipboard::new()
            .map(Self)
            .context("failed to open the system clipboard")
    }
}

impl ClipboardTarget for SystemClipboard {
    fn set_text(&mut self, text: &str) -> passafari::Result<()> {
        self.0
            .set_text(text)
            .map_err(|e| PassError::Backend(format!("clipboard write failed: {e}")))
    }
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// Passafari CLI — search and reveal entries of a GPG-encrypted password
/// store.
#[derive(Parser, Debug)]
#[command(
    name = "passafari",
    about = "Passafari CLI",
    version,
    long_about = "passafari — search and decrypt entries of a pass password store.\n\nEntries are .gpg files under the store root; keys live in a dedicated GnuPG home."
)]
struct Cli {
    /// Config file (default: ~/.passafari/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Password store root (overrides config and PASSWORD_STORE_DIR)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// GnuPG home holding the keys (overrides config and PASSAFARI_GNUPGHOME)
    #[arg(long, global = true)]
    gnupg_home: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find entries whose path contains QUERY (case-insensitive)
    Search {
        query: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decrypt an entry and print its password
    Show {
        /// Entry path relative to the store root, e.g. work/aws.gpg
        entry: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Print the login instead of the password
        #[arg(long, conflicts_with = "json")]
        login: bool,

        /// Copy the password to the clipboard instead of printing it
        #[arg(long, conflicts_with_all = ["json", "login"])]
        clip: bool,
    },

    /// Import keys from an armored or binary key file
    Import {
        keyfile: PathBuf,
    },

    /// List keys in the key ring
    Keys,

    /// Inspect or change the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Set the password store root
    SetRoot { dir: PathBuf },

    /// Set the GnuPG home directory
    SetGnupgHome { dir: PathBuf },

    /// Import a key file every time the store is opened
    AddKey { file: PathBuf },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let verbose = cli.verbose;

    let result = match &cli.command {
        Commands::Search { query, json } => {
            effective_config(&cli, &config_path).and_then(|c| cmd_search(&c, query, *json))
        }
        Commands::Show {
            entry,
            json,
            login,
            clip,
        } => {
            let output = if *json {
                ShowOutput::Json
            } else if *login {
                ShowOutput::Login
            } else if *clip {
                ShowOutput::Clipboard
            } else {
                ShowOutput::Password
            };
            effective_config(&cli, &config_path)
                .and_then(|c| cmd_show(&c, entry, output, verbose))
        }
        Commands::Import { keyfile } => {
            effective_config(&cli, &config_path).and_then(|c| cmd_import(&c, keyfile, verbose))
        }
        Commands::Keys => effective_config(&cli, &config_path).and_then(|c| cmd_keys(&c)),
        Commands::Config { subcommand } => match subcommand {
            ConfigCommands::Show => {
                effective_config(&cli, &config_path).and_then(|c| cmd_config_show(&c))
            }
            ConfigCommands::SetRoot { dir } => update_config(&config_path, |config| {
                config.store_root = absolute(dir)?;
                println!("Store root set to {}", config.store_root.display());
                Ok(())
            }),
            ConfigCommands::SetGnupgHome { dir } => update_config(&config_path, |config| {
                config.gnupg_home = absolute(dir)?;
                println!("GnuPG home set to {}", config.gnupg_home.display());
                Ok(())
            }),
            ConfigCommands::AddKey { file } => update_config(&config_path, |config| {
                let file = absolute(file)?;
                if config.add_key_file(file.clone()) {
                    println!("Added key file {}", file.display());
                } else {
                    println!("Key file {} already configured", file.display());
                }
                Ok(())
            }),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Configuration helpers ─────────────────────────────────────────────────────

/// Config file, then environment, then command-line flags.
fn effective_config(cli: &Cli, path: &Path) -> Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.apply_env();
    if let Some(store) = &cli.store {
        config.store_root = store.clone();
    }
    if let Some(home) = &cli.gnupg_home {
        config.gnupg_home = home.clone();
    }
    Ok(config)
}

/// Load the file as stored (no overrides), edit it, and write it back.
fn update_config<F>(path: &Path, edit: F) -> Result<()>
where
    F: FnOnce(&mut Config) -> Result<()>,
{
    let mut config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    edit(&mut config)?;
    config
        .save(path)
        .with_context(|| format!("failed to save config to {}", path.display()))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(path))
}

fn open_store(config: &Config) -> Result<Store> {
    Store::open(config).with_context(|| {
        format!(
            "failed to open password store at {}",
            config.store_root.display()
        )
    })
}

// ── Command implementations ───────────────────────────────────────────────────

/// `passafari search QUERY [--json]`
fn cmd_search(config: &Config, query: &str, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let result = store.search(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for row in Presenter.rows(&result) {
            println!("{}", row.label);
        }
    }

    match result.status {
        Status::Found | Status::NotFound => Ok(()),
        status => Err(anyhow!(
            "search failed ({status}): {}",
            result.error.as_deref().unwrap_or("no details")
        )),
    }
}

/// Where `show` sends a revealed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowOutput {
    Password,
    Login,
    Json,
    Clipboard,
}

/// `passafari show ENTRY [--json | --login | --clip]`
fn cmd_show(config: &Config, entry: &str, output: ShowOutput, verbose: bool) -> Result<()> {
    let store = open_store(config)?;
    let result = store.reveal(entry, &mut read_passphrase);

    if output == ShowOutput::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return if result.is_found() {
            Ok(())
        } else {
            Err(anyhow!("could not reveal {entry} ({})", result.status))
        };
    }

    if !result.is_found() {
        let message = Presenter.message(result.status).unwrap_or("Unknown error.");
        return match (&result.error_message, verbose) {
            (Some(detail), true) => Err(anyhow!("{message} ({detail})")),
            _ => Err(anyhow!("{message}")),
        };
    }

    match output {
        ShowOutput::Login => {
            if result.login.is_empty() {
                return Err(anyhow!("entry {entry} has no login"));
            }
            println!("{}", result.login);
        }
        ShowOutput::Clipboard => {
            let mut clipboard = SystemClipboard::open()?;
            if !Presenter.copy_password(Some(&mut clipboard), &result) {
                return Err(anyhow!(
                    "could not copy the password of {entry} to the clipboard"
                ));
            }
            println!("Copied password of {entry} to the clipboard");
        }
        ShowOutput::Password | ShowOutput::Json => {
            println!("{}", result.password);
            if verbose && !result.login.is_empty() {
                println!("login: {}", result.login);
            }
        }
    }

    Ok(())
}

/// `passafari import KEYFILE`
fn cmd_import(config: &Config, keyfile: &Path, verbose: bool) -> Result<()> {
    let mut store = open_store(config)?;
    let summary = store
        .import_keys(keyfile)
        .with_context(|| format!("failed to import keys from {}", keyfile.display()))?;

    println!("Imported keys from {}", keyfile.display());
    println!("  Processed:  {}", summary.processed);
    println!("  Imported:   {}", summary.imported);
    println!("  Unchanged:  {}", summary.unchanged);
    println!(
        "  Secret:     {} read, {} imported",
        summary.secret_read, summary.secret_imported
    );

    if verbose {
        for fingerprint in &summary.fingerprints {
            println!("  {fingerprint}");
        }
    }

    Ok(())
}

/// `passafari keys`
fn cmd_keys(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let keys = store.keys().context("failed to list keys")?;

    if keys.is_empty() {
        println!("No keys in {}", config.gnupg_home.display());
        return Ok(());
    }

    for key in &keys {
        let kind = if key.has_secret { "sec" } else { "pub" };
        match &key.user_id {
            Some(uid) => println!("{kind}  {}  {uid}", key.fingerprint),
            None => println!("{kind}  {}", key.fingerprint),
        }
    }

    Ok(())
}

/// `passafari config show`
fn cmd_config_show(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
