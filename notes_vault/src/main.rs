//! Notes Vault - CLI
//!
//! Command-line interface for note encryption and backups.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};

use notes_vault::{
    archive, BackupCatalog, BackupJob, Credential, KeyStoreBackend, MemoryStore,
    NoteCryptoService, VaultConfig,
};

/// Env var read before prompting for a passphrase
const PASSPHRASE_ENV: &str = "NOTES_VAULT_PASSPHRASE";

#[derive(Parser)]
#[command(name = "notes-vault")]
#[command(version = notes_vault::VERSION)]
#[command(about = "Notes Vault - encrypted notes with portable backups")]
struct Cli {
    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the key store (os, file, memory)
    #[arg(long)]
    key_store: Option<KeyStoreBackend>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text (stdin when omitted)
    Encrypt {
        text: Option<String>,

        /// Use a passphrase instead of the device key
        #[arg(short, long)]
        passphrase: bool,
    },

    /// Decrypt an envelope (stdin when omitted)
    Decrypt {
        envelope: Option<String>,

        /// Envelope was sealed with a passphrase
        #[arg(short, long)]
        passphrase: bool,
    },

    /// Back up a store file into the catalog
    Backup {
        /// Store JSON file
        #[arg(short, long)]
        store: PathBuf,
    },

    /// List catalog archives
    List,

    /// Show what an archive contains
    Inspect {
        /// Catalog name or path
        archive: String,
    },

    /// Replace a store file's contents with an archive
    Restore {
        /// Catalog name or path
        archive: String,

        /// Store JSON file
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Delete a catalog archive
    Delete {
        name: String,
    },

    /// Copy a catalog archive elsewhere
    Export {
        name: String,
        output: PathBuf,
    },

    /// Validate an archive and add it to the catalog
    Import {
        path: PathBuf,
    },

    /// Delete all but the newest archives
    Prune {
        #[arg(short, long)]
        keep: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        match e.downcast_ref::<notes_vault::VaultError>() {
            Some(vault_err) => eprintln!("Error: {}", vault_err.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(cli: &Cli) -> Result<VaultConfig> {
    let path = cli.config.clone().unwrap_or_else(VaultConfig::default_path);
    let mut config = VaultConfig::load(&path)?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(backend) = cli.key_store {
        config.key_store = backend;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let catalog = BackupCatalog::new(config.backup_dir());

    match cli.command {
        Commands::Encrypt { text, passphrase } => {
            let crypto = NoteCryptoService::new(config.open_key_store());
            let plaintext = text_or_stdin(text)?;

            let envelope = if passphrase {
                let secret = read_passphrase(true)?;
                crypto.encrypt(&plaintext, Credential::Passphrase(secret.expose_secret()))?
            } else {
                crypto.encrypt(&plaintext, Credential::DeviceKey)?
            };
            println!("{}", envelope);
        }

        Commands::Decrypt { envelope, passphrase } => {
            let crypto = NoteCryptoService::new(config.open_key_store());
            let envelope = text_or_stdin(envelope)?;

            let plaintext = if passphrase {
                let secret = read_passphrase(false)?;
                crypto.decrypt(&envelope, Credential::Passphrase(secret.expose_secret()))?
            } else {
                crypto.decrypt(&envelope, Credential::DeviceKey)?
            };
            println!("{}", plaintext);
        }

        Commands::Backup { store } => {
            let notes = MemoryStore::load_json(&store)?;
            let job = BackupJob::new(catalog).with_max_backups(config.max_backups);
            let outcome = job.run_once(&notes)?;

            println!("✅ Backup saved: {}", outcome.entry.path.display());
            println!(
                "   {} notes ({} encrypted), {} labels, {} links",
                outcome.summary.notes,
                outcome.summary.encrypted_notes,
                outcome.summary.labels,
                outcome.summary.links
            );
            for old in &outcome.pruned {
                println!("🗑️ Pruned: {}", old.name);
            }
        }

        Commands::List => {
            let entries = catalog.list()?;

            if entries.is_empty() {
                println!("📭 No backups in {}", catalog.dir().display());
            } else {
                println!("📦 Backups ({}):", entries.len());
                println!("{:-<60}", "");
                for entry in entries {
                    let when = entry
                        .created_at
                        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".into());
                    println!("{:<40} {:<20} {} bytes", entry.name, when, entry.size);
                }
            }
        }

        Commands::Inspect { archive: arg } => {
            let data = archive::unpack(&load_archive(&catalog, &arg)?)?;
            let summary = data.summary();

            println!("📊 {}", arg);
            println!("{:-<40}", "");
            println!("Backup date:      {}", summary.backup_date);
            println!("Format version:   {}", data.version);
            println!("Notes:            {}", summary.notes);
            println!("Encrypted notes:  {}", summary.encrypted_notes);
            println!("Labels:           {}", summary.labels);
            println!("Links:            {}", summary.links);
        }

        Commands::Restore { archive: arg, store } => {
            let bytes = load_archive(&catalog, &arg)?;
            let mut notes = MemoryStore::load_json(&store)?;

            let report = BackupJob::new(catalog).restore(&mut notes, &bytes)?;
            notes.save_json(&store)?;

            println!("✅ Restored into {}", store.display());
            println!(
                "   {} notes ({} encrypted), {} labels, {} links",
                report.notes, report.encrypted_notes, report.labels, report.links
            );
        }

        Commands::Delete { name } => {
            let locator = catalog.resolve(&name)?;
            if catalog.delete(&locator)? {
                println!("🗑️ Deleted: {}", name);
            } else {
                println!("📭 Not found: {}", name);
            }
        }

        Commands::Export { name, output } => {
            let bytes = catalog.open(&catalog.resolve(&name)?)?;
            catalog.write_external(&output, &bytes)?;
            println!("📤 Exported to: {}", output.display());
        }

        Commands::Import { path } => {
            let bytes = catalog.read_external(&path)?;
            let data = archive::unpack(&bytes)
                .with_context(|| format!("{} is not a notes backup", path.display()))?;
            let entry = catalog.save(&bytes)?;

            println!("📥 Imported {} ({} notes)", entry.name, data.notes.len());
        }

        Commands::Prune { keep } => {
            if keep == 0 {
                bail!("--keep must be at least 1");
            }
            let removed = catalog.prune(keep)?;
            println!("🗑️ Removed {} backup(s)", removed.len());
        }
    }

    Ok(())
}

/// Catalog name, or a path to a file outside the catalog
fn load_archive(catalog: &BackupCatalog, arg: &str) -> Result<Vec<u8>> {
    let path = Path::new(arg);
    if let Ok(locator) = catalog.resolve(arg) {
        if locator.exists() || !path.is_file() {
            return Ok(catalog.open(&locator)?);
        }
    }
    Ok(catalog.read_external(path)?)
}

fn text_or_stdin(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

fn read_passphrase(confirm: bool) -> Result<SecretString> {
    if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
        return Ok(SecretString::from(value));
    }

    let first = SecretString::from(rpassword::prompt_password("Passphrase: ")?);
    if confirm {
        let second = SecretString::from(rpassword::prompt_password("Repeat passphrase: ")?);
        if first.expose_secret() != second.expose_secret() {
            bail!("passphrases do not match");
        }
    }
    if first.expose_secret().is_empty() {
        bail!("passphrase must not be empty");
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_passphrase_is_never_an_argument() {
        let cli = Cli::try_parse_from(["notes-vault", "encrypt", "--passphrase", "text"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Encrypt { passphrase: true, text: Some(ref t) } if t == "text"
        ));
        assert!(Cli::command()
            .get_arguments()
            .all(|arg| arg.get_env().is_none()));
    }
}
