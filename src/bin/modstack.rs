//! Operator-facing entry point for inspecting the module subsystem.
//!
//! `catalog` lists registered module types, `reconcile` seeds stacks from the
//! configured credential store and workspace directory and reports the result,
//! and `listeners` dumps persisted listener records. Output is JSON on stdout;
//! logs go to stderr.

use anyhow::{Context, Result, bail};
use modstack::bootstrap::{
    JsonFileCredentials, JsonFileWorkspaces, StaticCredentials, StaticWorkspaces,
};
use modstack::persistence::FsStore;
use modstack::{
    CredentialStore, ListenerPersistence, ServerConfig, ServerContext, WorkspaceDirectory,
    WorkspaceRecord, logging, split_list,
};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse()?;
    let config = ServerConfig::discover(cli.config.as_deref())?;
    logging::init(&config.log_filter)?;

    match cli.command {
        Command::Catalog => list_catalog(&config),
        Command::Reconcile => run_reconcile(&cli, &config),
        Command::Listeners => list_listeners(&cli, &config),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Command {
    Catalog,
    Reconcile,
    Listeners,
}

struct Cli {
    command: Command,
    config: Option<PathBuf>,
    operators: Option<Vec<String>>,
    workspaces: Option<Vec<u64>>,
    protocols: Option<Vec<String>>,
}

impl Cli {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(command) = args.next() else {
            usage(1);
        };
        let command = match command.as_str() {
            "catalog" => Command::Catalog,
            "reconcile" => Command::Reconcile,
            "listeners" => Command::Listeners,
            "--help" | "-h" => usage(0),
            _ => usage(1),
        };

        let mut cli = Cli {
            command,
            config: None,
            operators: None,
            workspaces: None,
            protocols: None,
        };

        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("{flag} requires a value"))
            };
            match flag.as_str() {
                "--config" => cli.config = Some(PathBuf::from(value()?)),
                "--operators" => cli.operators = Some(split_list(&value()?)),
                "--workspaces" => {
                    let ids = split_list(&value()?)
                        .iter()
                        .map(|id| {
                            id.parse::<u64>()
                                .with_context(|| format!("invalid workspace id '{id}'"))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    cli.workspaces = Some(ids);
                }
                "--protocol" => cli.protocols = Some(split_list(&value()?)),
                "--help" | "-h" => usage(0),
                other => bail!("Unknown argument: {other}"),
            }
        }

        let seeds_given = cli.operators.is_some() || cli.workspaces.is_some();
        if cli.command != Command::Reconcile && seeds_given {
            bail!("--operators/--workspaces only apply to 'reconcile'");
        }
        if cli.command != Command::Listeners && cli.protocols.is_some() {
            bail!("--protocol only applies to 'listeners'");
        }
        Ok(cli)
    }
}

fn usage(code: i32) -> ! {
    eprintln!(
        "Usage: modstack (catalog | reconcile | listeners) [--config PATH] [options]\n\nCommands:\n  catalog     List registered module types as NDJSON descriptors.\n  reconcile   Create one stack per (workspace, operator) pair and print the report.\n              --operators LIST   operator names instead of operators_file\n              --workspaces LIST  workspace ids instead of workspaces_file\n  listeners   Print persisted listener records as NDJSON.\n              --protocol LIST    only records for these protocols\n\nThe config path may also come from MODSTACK_CONFIG."
    );
    std::process::exit(code);
}

fn list_catalog(config: &ServerConfig) -> Result<()> {
    let context = ServerContext::from_config(config)?;
    for descriptor in context.catalog().descriptors() {
        println!("{}", serde_json::to_string(&descriptor)?);
    }
    Ok(())
}

fn run_reconcile(cli: &Cli, config: &ServerConfig) -> Result<()> {
    let context = ServerContext::from_config(config)?;

    let credentials: Box<dyn CredentialStore> = match (&cli.operators, &config.operators_file) {
        (Some(names), _) => Box::new(StaticCredentials::new(names.clone())),
        (None, Some(path)) => Box::new(JsonFileCredentials::new(path)),
        (None, None) => bail!("no operators: set operators_file in the config or pass --operators"),
    };
    let directory: Box<dyn WorkspaceDirectory> = match (&cli.workspaces, &config.workspaces_file) {
        (Some(ids), _) => Box::new(StaticWorkspaces::new(
            ids.iter().map(|id| WorkspaceRecord::new(*id, format!("workspace-{id}"))),
        )),
        (None, Some(path)) => Box::new(JsonFileWorkspaces::new(path)),
        (None, None) => {
            bail!("no workspaces: set workspaces_file in the config or pass --workspaces")
        }
    };

    let report = context.reconcile(credentials.as_ref(), directory.as_ref())?;
    let output = json!({
        "report": report,
        "stacks": context.registry().keys(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn list_listeners(cli: &Cli, config: &ServerConfig) -> Result<()> {
    let store = FsStore::new(&config.store_dir);
    let persistence = ListenerPersistence::new(Arc::new(store));
    let listeners = persistence
        .load_all()
        .with_context(|| format!("reading listeners under {}", config.store_dir.display()))?;

    for listener in listeners {
        if let Some(protocols) = &cli.protocols {
            if !protocols.contains(&listener.config.protocol) {
                continue;
            }
        }
        let record = json!({ "key": listener.key, "listener": listener.config });
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}
