//! Weft - component installer & action dispatcher
//!
//! Usage:
//!   weft install <COMPONENT> [--force] [-- <component flags...>]
//!   weft list [--detailed]
//!   weft dispatch <BATCH_FILE> --user <USER>

mod builtin;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weft_core::catalog::Catalog;
use weft_core::prelude::*;
use weft_core::transport;

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Component installer & cross-host action dispatcher", long_about = None)]
#[command(version)]
struct Cli {
    /// State directory holding installed records and configuration
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a component by id (e.g. Slave/Products/ExampleWiki)
    Install {
        /// Component id
        component: String,

        /// Reinstall even when an installed record exists. The record is
        /// replaced; hand-edited configuration is preserved.
        #[arg(short, long)]
        force: bool,

        /// Component-specific flags, after `--`
        #[arg(last = true)]
        component_args: Vec<String>,
    },

    /// List discoverable components and their install state
    List {
        /// Show descriptions, variables and install parameters
        #[arg(short, long)]
        detailed: bool,
    },

    /// Dispatch a JSON-encoded action batch to installed adapters
    Dispatch {
        /// Path of the encoded batch file
        batch: PathBuf,

        /// User the actions are applied on behalf of
        #[arg(short, long)]
        user: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "weft=debug,debug"
    } else {
        "weft=debug,info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state_dir = cli
        .state_dir
        .clone()
        .unwrap_or_else(InstallContext::default_state_dir);
    let ctx = InstallContext::new(state_dir)?.with_debug(cli.debug);
    tracing::debug!(state_dir = %ctx.state_dir().display(), "context ready");

    run_cli(cli.command, &ctx)
}

fn run_cli(command: Commands, ctx: &InstallContext) -> Result<()> {
    match command {
        Commands::Install {
            component,
            force,
            component_args,
        } => {
            let id: ComponentId = component.parse()?;
            let catalog = discover_catalog()?;

            let mut options = InstallOptions::new(id).with_args(component_args);
            if force {
                options = options.with_force();
            }

            let report = Installer::new(&catalog, ctx).install(&options)?;
            println!("Installed {}", report.record.component_id);
            if report.config == Some(ConfigSeedOutcome::Seeded) {
                println!("Seeded default configuration (edit under Config/)");
            }
            if report.adapter_registered {
                println!("Registered adapter for dispatch");
            }
            Ok(())
        }

        Commands::List { detailed } => {
            let catalog = discover_catalog()?;
            let ledger = ctx.ledger();

            for (id, component) in catalog.iter() {
                let record = ledger.get(id)?;
                let state = match &record {
                    Some(r) => format!("installed {}", r.installed_at.format("%Y-%m-%d %H:%M")),
                    None => "not installed".to_string(),
                };
                println!("{id}  [{state}]");

                if detailed {
                    let descriptor = &component.descriptor;
                    if !descriptor.description.is_empty() {
                        println!("    {}", descriptor.description);
                    }
                    if !descriptor.author.is_empty() {
                        println!("    author: {}", descriptor.author);
                    }
                    for option in &descriptor.variable_options {
                        let requirement = if option.flag.required {
                            "required"
                        } else {
                            "optional"
                        };
                        println!(
                            "    --{} <{}>  {} ({requirement})",
                            option.flag.long, option.flag.value_name, option.flag.help
                        );
                    }
                    if let Some(record) = &record {
                        if !record.parameters.is_empty() {
                            println!("    installed with: {}", record.parameters.join(" "));
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Dispatch { batch, user } => {
            let text = std::fs::read_to_string(&batch)?;
            let batch = transport::decode_batch(&text)?;

            let registrations = ctx.registrations().load()?;
            let resolver = builtin::builtin_resolver();
            let report = Router::new(registrations, &resolver).dispatch(&user, &batch);

            println!(
                "Dispatched {} action(s): {} failed, {} skipped",
                report.attempted,
                report.errors.len(),
                report.skipped.len()
            );
            for failure in &report.errors {
                eprintln!(
                    "  failed: {}/{}/{}: {}",
                    failure.product, failure.tool, failure.action, failure.error
                );
            }
            if !report.is_success() {
                anyhow::bail!("{} action(s) failed", report.errors.len());
            }
            Ok(())
        }
    }
}

fn discover_catalog() -> Result<Catalog> {
    let sources: Vec<Box<dyn DiscoverySource>> = vec![Box::new(builtin::builtin_source())];
    Catalog::discover(&sources)
}
