// src/main.rs

use anyhow::{Context, Result};
use caravel::{
    manifest_path, ActionExecutor, DependencyResolver, ExecutionLease, FileCatalog, LogListener,
    PackageOperation, ProjectManifest, ResolverOptions, SemanticVersion, SharedPackageStore,
    SharedStoreHandler,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "caravel")]
#[command(author, version, about = "Dependency planning and execution with a shared package store", long_about = None)]
struct Cli {
    /// Shared package store directory
    #[arg(long, default_value = "packages")]
    store: PathBuf,

    /// Project directory holding the install manifest
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Package catalog file
    #[arg(long, default_value = "catalog.toml")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package into the project
    Install {
        /// Package id
        id: String,
        /// Exact version to install (default: highest available)
        #[arg(short, long)]
        version: Option<String>,
        /// Admit pre-release versions
        #[arg(long)]
        prerelease: bool,
        /// Install the target only, skipping its dependencies
        #[arg(long)]
        ignore_dependencies: bool,
        /// Update installed dependencies when ranges conflict
        #[arg(long)]
        dependency_updates: bool,
        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Uninstall a package from the project
    Uninstall {
        /// Package id
        id: String,
        /// Also remove dependencies nothing else needs
        #[arg(long)]
        remove_dependencies: bool,
        /// Proceed even when installed packages depend on the target
        #[arg(long)]
        force: bool,
        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Update an installed package
    Update {
        /// Package id
        id: String,
        /// Exact version to update to (default: highest available)
        #[arg(short, long)]
        version: Option<String>,
        /// Admit pre-release versions
        #[arg(long)]
        prerelease: bool,
        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// List packages installed in the project
    List,
    /// Show installed packages with a newer catalog version
    Outdated {
        /// Admit pre-release versions
        #[arg(long)]
        prerelease: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let Cli {
        store,
        project,
        catalog,
        command,
    } = Cli::parse();
    let manifest_file = manifest_path(&project);

    match command {
        Commands::Install {
            id,
            version,
            prerelease,
            ignore_dependencies,
            dependency_updates,
            dry_run,
        } => {
            let catalog = FileCatalog::load(&catalog)?;
            let manifest = ProjectManifest::load(&manifest_file)?;
            let state = manifest.snapshot();
            let options = ResolverOptions {
                allow_prerelease: prerelease,
                ignore_dependencies,
                allow_dependency_updates: dependency_updates,
                ..Default::default()
            };
            let version = parse_version(version.as_deref())?;
            let resolver = DependencyResolver::new(&catalog, &state, options);
            let plan = resolver
                .resolve_install(&id, version.as_ref())
                .with_context(|| format!("resolving install of {}", id))?;

            if plan.is_empty() {
                println!("{} is already installed", id);
                return Ok(());
            }
            if dry_run {
                print_plan(&plan);
                return Ok(());
            }
            apply(&store, manifest, &plan)?;
            promote_top_level(&manifest_file, &id)?;
            info!(package = %id, "install complete");
        }
        Commands::Uninstall {
            id,
            remove_dependencies,
            force,
            dry_run,
        } => {
            let catalog = FileCatalog::load(&catalog)?;
            let manifest = ProjectManifest::load(&manifest_file)?;
            let state = manifest.snapshot();
            let options = ResolverOptions {
                remove_dependencies,
                force,
                ..Default::default()
            };
            let resolver = DependencyResolver::new(&catalog, &state, options);
            let plan = resolver
                .resolve_uninstall(&id)
                .with_context(|| format!("resolving uninstall of {}", id))?;

            if dry_run {
                print_plan(&plan);
                return Ok(());
            }
            apply(&store, manifest, &plan)?;
            info!(package = %id, "uninstall complete");
        }
        Commands::Update {
            id,
            version,
            prerelease,
            dry_run,
        } => {
            let catalog = FileCatalog::load(&catalog)?;
            let manifest = ProjectManifest::load(&manifest_file)?;
            let state = manifest.snapshot();
            let options = ResolverOptions {
                allow_prerelease: prerelease,
                allow_dependency_updates: true,
                ..Default::default()
            };
            let version = parse_version(version.as_deref())?;
            let resolver = DependencyResolver::new(&catalog, &state, options);
            let plan = resolver
                .resolve_update(&id, version.as_ref())
                .with_context(|| format!("resolving update of {}", id))?;

            if plan.is_empty() {
                println!("{} is already up to date", id);
                return Ok(());
            }
            if dry_run {
                print_plan(&plan);
                return Ok(());
            }
            apply(&store, manifest, &plan)?;
            promote_top_level(&manifest_file, &id)?;
            info!(package = %id, "update complete");
        }
        Commands::List => {
            let manifest = ProjectManifest::load(&manifest_file)?;
            let state = manifest.snapshot();
            let mut identities: Vec<_> = state.identities().collect();
            identities.sort_by(|a, b| a.id.to_ascii_lowercase().cmp(&b.id.to_ascii_lowercase()));
            for identity in identities {
                let marker = if state.is_top_level(&identity.id) {
                    ""
                } else {
                    " (dependency)"
                };
                println!("{}{}", identity, marker);
            }
        }
        Commands::Outdated { prerelease } => {
            use caravel::Catalog;
            let catalog = FileCatalog::load(&catalog)?;
            let manifest = ProjectManifest::load(&manifest_file)?;
            let state = manifest.snapshot();
            let installed: Vec<_> = state.identities().cloned().collect();
            for update in catalog.updates(&installed, prerelease)? {
                let current = state
                    .installed_version(&update.id)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                println!("{}: {} -> {}", update.id, current, update.version);
            }
        }
    }

    Ok(())
}

fn parse_version(text: Option<&str>) -> Result<Option<SemanticVersion>> {
    text.map(SemanticVersion::parse)
        .transpose()
        .context("invalid version")
}

fn print_plan(plan: &[PackageOperation]) {
    for operation in plan {
        println!("{}", operation);
    }
}

/// Apply a plan under the store-wide execution lease
fn apply(store_dir: &Path, mut manifest: ProjectManifest, plan: &[PackageOperation]) -> Result<()> {
    let store = SharedPackageStore::open(store_dir)?;
    let _lease = ExecutionLease::acquire(store.root())?;

    let mut handler = SharedStoreHandler::new(&store, &mut manifest)?;
    let mut executor = ActionExecutor::new();
    executor.add_listener(Box::new(LogListener::new()));

    let report = executor.execute(plan, &mut handler)?;
    info!(
        execution = %report.execution_id,
        operations = report.executed.len(),
        duration_ms = report.duration_ms,
        "plan applied"
    );
    Ok(())
}

/// Mark the requested package as explicitly installed
fn promote_top_level(manifest_file: &Path, id: &str) -> Result<()> {
    let mut manifest = ProjectManifest::load(manifest_file)?;
    manifest.set_top_level(id, true);
    manifest.save()?;
    Ok(())
}
