//! docsync: Sync markdown folders with flat remote documents.
//!
//! Uses the same sync-core decision procedure a plugin host would, but runs
//! as a native binary with a tokio filesystem and a file-backed document
//! store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sync_cli::file_store::FileDocStore;
use sync_cli::native_fs::NativeFs;
use sync_core::store::StaticTokens;
use sync_core::{SyncConfig, SyncEngine, SyncResult};

#[derive(Parser, Debug)]
#[command(name = "docsync")]
#[command(about = "Sync markdown folders with flat remote documents")]
struct Args {
    /// Path to the vault directory containing the folders to sync
    #[arg(short, long)]
    vault: PathBuf,

    /// Directory holding the document store
    #[arg(short, long, default_value = ".docsync-store")]
    store: PathBuf,

    /// Prefix for titles of newly created documents
    #[arg(long)]
    title_prefix: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync one folder with its remote document
    Sync {
        /// Folder path, relative to the vault
        folder: String,
    },
    /// Sync several folders, continuing past per-folder failures
    SyncAll {
        /// Folder paths, relative to the vault
        folders: Vec<String>,
    },
    /// Remove a folder's sync link (files and document are kept)
    Unlink {
        /// Folder path, relative to the vault
        folder: String,
    },
    /// Show a folder's stored sync state
    Status {
        /// Folder path, relative to the vault
        folder: String,
    },
}

fn report(result: &SyncResult) {
    println!("{}", result.message);
    if let Some(url) = &result.document_url {
        println!("  document: {}", url);
    }
    for conflict in &result.conflicts {
        println!("  conflict: {}", conflict.description);
        println!("  --- local ---\n{}", conflict.local_version);
        println!("  --- remote ---\n{}", conflict.remote_version);
    }
    if let Some(error) = &result.error {
        eprintln!("  error: {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Respects RUST_LOG, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,sync_cli=debug"
    } else {
        "info,sync_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let fs = NativeFs::new(args.vault.clone());
    let store = FileDocStore::new(args.store.clone());
    let engine = SyncEngine::new(
        fs,
        store,
        StaticTokens("local".into()),
        SyncConfig {
            title_prefix: args.title_prefix.clone(),
        },
    );

    match args.command {
        Command::Sync { folder } => {
            let result = engine.sync_folder(&folder).await;
            report(&result);
            if !result.success {
                std::process::exit(1);
            }
        }
        Command::SyncAll { folders } => {
            let batch = engine.sync_all_folders(&folders).await;
            for (folder, result) in folders.iter().zip(&batch.results) {
                println!("[{}]", folder);
                report(result);
            }
            info!("{} synced, {} failed", batch.succeeded, batch.failed);
            if batch.failed > 0 {
                std::process::exit(1);
            }
        }
        Command::Unlink { folder } => {
            engine.unlink_folder(&folder).await?;
            println!("Unlinked {}", folder);
        }
        Command::Status { folder } => match engine.status(&folder).await? {
            Some(meta) => println!("{}", serde_json::to_string_pretty(&meta)?),
            None => println!("{} is not linked", folder),
        },
    }

    Ok(())
}
