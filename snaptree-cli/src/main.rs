// SPDX-License-Identifier: GPL-3.0-only

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;
use snaptree::{
    BtrfsCliLister, ConfirmPrompt, DeleteOutcome, IoctlOps, SubvolumeOps, create_snapshots,
    delete_subvolumes, discover, ensure_subvolume,
};

/// Recursive snapshot/delete for nested BTRFS subvolume trees
#[derive(Parser)]
#[command(name = "snaptree")]
#[command(about = "Recursively snapshot or delete nested BTRFS subvolume trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot a subvolume tree to a new destination
    Create {
        /// Root subvolume to snapshot
        source: String,
        /// Destination path of the new tree
        dest: String,
        /// Re-apply source read-only flags to the destination tree
        #[arg(short, long)]
        preserve: bool,
    },
    /// Delete a subvolume tree, deepest subvolume first
    Delete {
        /// Root subvolume to delete
        source: String,
        /// Delete read-only subvolumes without asking for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Discover a subvolume tree and print it in creation order
    List {
        /// Root subvolume to inspect
        source: String,
        /// Emit the tree as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Serializable output for `list --json`
#[derive(Debug, Serialize)]
struct SubvolumeReport {
    path: String,
    readonly: bool,
}

#[derive(Debug, Serialize)]
struct TreeReport {
    root: String,
    subvolumes: Vec<SubvolumeReport>,
}

/// Interactive `[y/N]` confirmation on the controlling terminal.
struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm_delete(&mut self, path: &str) -> snaptree::Result<bool> {
        println!("Subvolume {path} is marked as read-only.");
        print!("Are you sure you want to delete it? [y/N]  ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok(matches!(answer.trim_start().chars().next(), Some('y' | 'Y')))
    }
}

fn main() {
    // Diagnostics go to stderr; stdout carries only the reported mappings
    // and deletions.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        tracing::error!("{err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> snaptree::Result<()> {
    match cli.command {
        Commands::Create {
            source,
            dest,
            preserve,
        } => {
            ensure_subvolume(&source)?;
            let lister = BtrfsCliLister::new()?;
            let list = discover(&source, &lister)?;
            create_snapshots(&IoctlOps, &list, &dest, preserve, &mut |src, dst| {
                println!("{src} -> {dst}")
            })
        }
        Commands::Delete { source, force } => {
            ensure_subvolume(&source)?;
            let lister = BtrfsCliLister::new()?;
            let list = discover(&source, &lister)?;
            let outcome = delete_subvolumes(&IoctlOps, &list, force, &mut StdinPrompt, &mut |path| {
                println!("{path} deleted.")
            })?;
            if outcome == DeleteOutcome::Declined {
                tracing::info!("aborted on operator request, nothing deleted");
            }
            Ok(())
        }
        Commands::List { source, json } => {
            ensure_subvolume(&source)?;
            let lister = BtrfsCliLister::new()?;
            let list = discover(&source, &lister)?;

            let mut subvolumes = Vec::with_capacity(list.len());
            for path in &list {
                subvolumes.push(SubvolumeReport {
                    readonly: IoctlOps.get_readonly(path)?,
                    path: path.clone(),
                });
            }

            if json {
                let tree = TreeReport {
                    root: list[0].clone(),
                    subvolumes,
                };
                let rendered = serde_json::to_string(&tree).map_err(std::io::Error::from)?;
                println!("{rendered}");
            } else {
                for subvolume in &subvolumes {
                    if subvolume.readonly {
                        println!("{} (read-only)", subvolume.path);
                    } else {
                        println!("{}", subvolume.path);
                    }
                }
            }
            Ok(())
        }
    }
}
