//! The `argot` command-line tool.
//!
//! Works on YAML manifests only: every command is bound to a no-op handler, entities come from
//! an empty directory and every permission is granted. Nothing talks to a platform.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use miette::{miette, IntoDiagnostic, Result};
use walkdir::WalkDir;

use crate::cli::args::{ArgotArgs, Command};
use crate::config::FrameworkConfig;
use crate::declare::manifest::Manifest;
use crate::dispatch::{handler_fn, CommandManager, Reply, Responder};
use crate::model::{AllowAll, InvocationContext, NoEntities};
use crate::registrar::read_snapshot;
use crate::schema::{diff, SchemaPayload};

pub mod args;
pub mod output;

struct Silent;

#[async_trait]
impl Responder for Silent {
    async fn send(&self, _ctx: &InvocationContext, _reply: Reply) {}
}

pub fn run() -> Result<()> {
    let args = ArgotArgs::parse();
    let config = match &args.config {
        Some(path) => FrameworkConfig::load(path)?,
        None => FrameworkConfig::default(),
    };
    if args.verbose {
        crate::logging::init("debug");
    } else if args.config.is_some() {
        crate::logging::init_from_config(&config);
    } else {
        crate::logging::init("warn");
    }

    match args.command {
        Command::Schema { manifest, root } => handle_schema(&manifest, &config, root.as_deref()),
        Command::Check { path } => handle_check(&path, &config),
        Command::Usage { manifest, prefix } => {
            let config = match prefix {
                Some(prefix) => FrameworkConfig {
                    prefixes: vec![prefix],
                    ..config
                },
                None => config,
            };
            handle_usage(&manifest, &config)
        }
        Command::Diff { snapshot, manifest } => handle_diff(&snapshot, &manifest, &config),
    }
}

/// Compiles a manifest the way a bot would at startup.
fn compile_manifest(path: &Path, config: &FrameworkConfig) -> Result<CommandManager> {
    let manifest = Manifest::load(path)?;
    let manager = CommandManager::builder(
        config.clone(),
        Arc::new(NoEntities),
        Arc::new(AllowAll),
        Arc::new(Silent),
    )
    .manifest(&manifest, handler_fn(|_call| async { Ok(()) }))
    .build()?;
    Ok(manager)
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn handle_schema(path: &Path, config: &FrameworkConfig, root: Option<&str>) -> Result<()> {
    let manager = compile_manifest(path, config)?;
    let label = path.display().to_string();
    for failure in manager.failures() {
        output::print_failure(&label, failure);
    }

    let mut printed = 0;
    for tree in manager.trees() {
        if root.is_some_and(|r| !tree.name().eq_ignore_ascii_case(r)) {
            continue;
        }
        println!("{}", SchemaPayload::from_tree(tree).to_json_pretty()?);
        printed += 1;
    }
    match root {
        Some(r) if printed == 0 => Err(miette!("no compiled root named '{r}' in {label}")),
        _ => Ok(()),
    }
}

fn handle_check(path: &Path, config: &FrameworkConfig) -> Result<()> {
    let mut manifests = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.into_diagnostic()?;
        let is_yaml = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if entry.file_type().is_file() && is_yaml {
            manifests.push(entry.into_path());
        }
    }

    let mut failed = 0;
    for manifest in &manifests {
        let label = manifest.display().to_string();
        match compile_manifest(manifest, config) {
            Ok(manager) if manager.failures().is_empty() => {
                output::print_ok(&label, &format!("{} root(s) compiled", manager.trees().len()));
            }
            Ok(manager) => {
                failed += 1;
                for failure in manager.failures() {
                    output::print_failure(&label, failure);
                }
            }
            Err(err) => {
                failed += 1;
                output::print_error(&label, &err.to_string());
            }
        }
    }

    if failed > 0 {
        return Err(miette!("{failed} of {} manifest(s) failed", manifests.len()));
    }
    Ok(())
}

fn handle_usage(path: &Path, config: &FrameworkConfig) -> Result<()> {
    let manager = compile_manifest(path, config)?;
    for tree in manager.trees() {
        for command in manager.routing().get(tree.name()).unwrap_or_default() {
            println!("{}", manager.usage(command));
        }
    }
    Ok(())
}

fn handle_diff(snapshot: &Path, path: &Path, config: &FrameworkConfig) -> Result<()> {
    let registered = read_snapshot(snapshot)?;
    let manager = compile_manifest(path, config)?;
    let root = registered.root.name();
    let Some(compiled) = manager.trees().iter().find(|t| t.name().eq_ignore_ascii_case(root)) else {
        return Err(miette!("manifest {} has no compiled root '{root}'", path.display()));
    };

    match diff(&registered.root, compiled) {
        None => {
            output::print_ok(root, &format!("unchanged ({})", registered.external_id));
        }
        Some(difference) => {
            let old = SchemaPayload::from_tree(&registered.root).to_json_pretty()?;
            let new = SchemaPayload::from_tree(compiled).to_json_pretty()?;
            output::print_schema_diff(&difference, &old, &new);
        }
    }
    Ok(())
}
