// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cld_core::persistence::{self, FileStore};
use cld_core::{cascade_message, mdl, EntityId, Model};

#[derive(Parser)]
#[command(name = "cld")]
#[command(version, about = "Inspect and edit causal loop diagrams stored as Vensim .mdl files")]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an empty diagram
    New {
        /// Path to write to (stdout when absent)
        #[arg(long, short, env = "CLD_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Print entity counts and the id high-water mark
    Summary { path: PathBuf },

    /// Re-export a diagram in normalized form
    Convert {
        path: PathBuf,

        /// Path to write to (stdout when absent)
        #[arg(long, short, env = "CLD_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Dump the diagram as JSON
    Json { path: PathBuf },

    /// Print the content digest of a diagram
    Digest { path: PathBuf },

    /// Report whether OTHER differs from the document BASE was loaded from
    Changed { base: PathBuf, other: PathBuf },

    /// Delete an entity and print how many causal links went with it
    Delete {
        path: PathBuf,
        id: u32,

        /// Path to write to (defaults to editing PATH in place)
        #[arg(long, short, env = "CLD_OUTPUT")]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn open(path: &Path) -> Result<Model> {
    persistence::open(&mut FileStore::new(path))
        .with_context(|| format!("failed to open diagram '{}'", path.display()))
}

fn write_model(model: &Model, output: Option<&Path>) -> Result<()> {
    let export = mdl::export(model);
    match output {
        Some(path) => {
            let digest = export.digest();
            FileStore::new(path)
                .try_write(&export.into_bytes())
                .with_context(|| format!("failed to write diagram '{}'", path.display()))?;
            debug!(path = %path.display(), %digest, "saved diagram");
        }
        None => {
            io::stdout()
                .lock()
                .write_all(&export.into_bytes())
                .context("failed to write to stdout")?;
        }
    }
    Ok(())
}

fn summary(model: &Model) -> String {
    let largest = model
        .largest_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_owned());
    let digest = model
        .content_hash_at_load()
        .map(|d| d.to_hex())
        .unwrap_or_else(|| "none".to_owned());

    let mut out = format!(
        "variables: {}\ncausal links: {}\nloops: {}\nlargest id: {}\ndigest: {}\n",
        model.variables().count(),
        model.causal_links().count(),
        model.loops().count(),
        largest,
        digest,
    );
    for (id, var) in model.variables() {
        out.push_str(&format!(
            "  {id} {}: {} in, {} out\n",
            var.name,
            var.incoming_links().len(),
            var.outgoing_links().len()
        ));
    }
    out
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::New { output } => {
            write_model(&Model::new(), output.as_deref())?;
        }
        Commands::Summary { path } => {
            print!("{}", summary(&open(&path)?));
        }
        Commands::Convert { path, output } => {
            let model = open(&path)?;
            write_model(&model, output.as_deref())?;
        }
        Commands::Json { path } => {
            let model = open(&path)?;
            let json = serde_json::to_string_pretty(&model.snapshot_for_render())
                .context("failed to serialize diagram")?;
            println!("{json}");
        }
        Commands::Digest { path } => {
            let model = open(&path)?;
            let Some(digest) = model.content_hash_at_load() else {
                bail!("no digest recorded for '{}'", path.display());
            };
            println!("{digest}");
        }
        Commands::Changed { base, other } => {
            let base_model = open(&base)?;
            let Some(remote) = open(&other)?.content_hash_at_load() else {
                bail!("no digest recorded for '{}'", other.display());
            };
            if base_model.differs_from(&remote) {
                println!("changed");
                return Ok(ExitCode::from(1));
            }
            println!("unchanged");
        }
        Commands::Delete { path, id, output } => {
            let mut model = open(&path)?;
            let id = EntityId::new(id);
            let deleted = model
                .delete_entity(id)
                .with_context(|| format!("cannot delete {id} from '{}'", path.display()))?;
            write_model(&model, Some(output.as_deref().unwrap_or(path.as_path())))?;
            println!("{}", cascade_message(deleted));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
