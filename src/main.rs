use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mesh_gateway::nodes::{load_directory, save_directory};
use mesh_gateway::replay::{self, ReplayOptions};
use mesh_gateway::storage::Eeprom;
use mesh_gateway::{Config, Dsk, Endpoint, FileEeprom, NodeId, NodeRecord, NodeStore};

/// meshgw - Application core of a home-automation mesh gateway
#[derive(Parser)]
#[command(name = "meshgw", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (default: ~/.config/meshgw/config.toml)
    #[arg(long, env = "MESHGW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the persisted node directory
    Nodes,
    /// Resolve a DSK to its node
    Lookup {
        /// DSK as dash-separated decimal groups or hex
        dsk: Dsk,
    },
    /// Provision a node in the persisted directory
    Add {
        /// Node id (1-232)
        #[arg(value_parser = parse_node_id)]
        node: NodeId,
        /// DSK as dash-separated decimal groups or hex
        #[arg(long)]
        dsk: Option<Dsk>,
        /// Endpoint ids to create
        #[arg(long = "endpoint")]
        endpoints: Vec<u8>,
        /// Node is always listening
        #[arg(long)]
        listening: bool,
    },
    /// Feed a script of inbound frames through a simulated gateway
    Replay {
        /// Script file: `<source> [scheme] <hex>` per line
        script: PathBuf,
        /// Nodes that never acknowledge (comma-separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_node_id)]
        unreachable: Vec<NodeId>,
        /// Nodes the controller finds still operating (comma-separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_node_id)]
        keep: Vec<NodeId>,
        /// Do not persist the resulting directory
        #[arg(long)]
        no_save: bool,
    },
}

fn parse_node_id(s: &str) -> Result<NodeId, String> {
    let id: u16 = s.parse().map_err(|e| format!("{s}: {e}"))?;
    let node = NodeId::new(id);
    if node.is_valid() {
        Ok(node)
    } else {
        Err(format!("{s}: node id must be in 1..=232"))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,mesh_gateway=info",
        1 => "info,mesh_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Nodes => cmd_nodes(&config),
        Command::Lookup { dsk } => cmd_lookup(&config, &dsk),
        Command::Add {
            node,
            dsk,
            endpoints,
            listening,
        } => cmd_add(&config, node, dsk.as_ref(), &endpoints, listening),
        Command::Replay {
            script,
            unreachable,
            keep,
            no_save,
        } => {
            let options = ReplayOptions {
                probe_delay: config.removal.probe_delay,
                unreachable: unreachable.into_iter().collect::<BTreeSet<_>>(),
                keep: keep.into_iter().collect(),
            };
            cmd_replay(&config, &script, &options, !no_save).await
        }
    }
}

/// Open the configured EEPROM and load the directory from it
fn open_directory(config: &Config) -> anyhow::Result<(FileEeprom, NodeStore)> {
    let mut eeprom = FileEeprom::new(&config.storage.eeprom_path, config.storage.eeprom_size);
    eeprom.init()?;
    let store = load_directory(&mut eeprom)?;
    Ok((eeprom, store))
}

fn persist_directory(mut eeprom: FileEeprom, store: &NodeStore) -> anyhow::Result<()> {
    save_directory(store, &mut eeprom)?;
    eeprom.close()?;
    Ok(())
}

fn print_record(record: &NodeRecord) {
    let dsk = record
        .dsk()
        .map_or_else(|| "-".to_string(), |d| Dsk::new(d).to_string());
    let endpoints: Vec<String> = record
        .endpoints()
        .iter()
        .map(|e| e.endpoint_id.to_string())
        .collect();

    println!(
        "{:>3}  {:<8}  {:<47}  [{}]",
        record.node_id().get(),
        record.state.to_string(),
        dsk,
        endpoints.join(",")
    );
}

fn cmd_nodes(config: &Config) -> anyhow::Result<()> {
    let (mut eeprom, store) = open_directory(config)?;
    eeprom.close()?;

    if store.is_empty() {
        println!("No nodes in {}", config.storage.eeprom_path.display());
        return Ok(());
    }

    println!("{:>3}  {:<8}  {:<47}  endpoints", "id", "state", "dsk");
    for record in store.iter() {
        print_record(record);
    }
    println!("---");
    println!("{} node(s)", store.len());
    Ok(())
}

fn cmd_lookup(config: &Config, dsk: &Dsk) -> anyhow::Result<()> {
    let (mut eeprom, store) = open_directory(config)?;
    eeprom.close()?;

    match store.lookup_by_dsk(dsk.as_bytes()) {
        Some(record) => {
            print_record(record);
            Ok(())
        }
        None => Err(mesh_gateway::Error::NotFound(format!("no node with dsk {dsk}")).into()),
    }
}

fn cmd_add(
    config: &Config,
    node: NodeId,
    dsk: Option<&Dsk>,
    endpoints: &[u8],
    listening: bool,
) -> anyhow::Result<()> {
    let (eeprom, mut store) = open_directory(config)?;

    let record = store.allocate(node)?;
    record.flags.listening = listening;
    for &endpoint_id in endpoints {
        record.endpoints_mut().add(Endpoint::new(endpoint_id))?;
    }
    if let Some(dsk) = dsk {
        store.set_dsk(node, dsk.as_bytes())?;
    }

    tracing::info!(node_id = %node, "node provisioned");
    persist_directory(eeprom, &store)
}

async fn cmd_replay(
    config: &Config,
    script: &Path,
    options: &ReplayOptions,
    save: bool,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(script)?;
    let frames = replay::parse_script(&text)?;
    let (eeprom, store) = open_directory(config)?;

    tracing::info!(
        script = %script.display(),
        frames = frames.len(),
        nodes = store.len(),
        "starting replay"
    );
    let report = replay::replay(store, frames, options).await?;

    for frame in &report.sent {
        println!(
            "sent    {:>3}  {:<10}  {:?}",
            frame.target.get(),
            hex::encode(&frame.payload),
            frame.status
        );
    }
    for update in &report.updates {
        println!("update  {:>3}  {:?}", update.node.get(), update.kind);
    }
    println!("---");
    println!(
        "{} frame(s) sent, {} removal(s) requested, {} node(s) remain",
        report.sent.len(),
        report.removals.len(),
        report.store.len()
    );

    if save {
        persist_directory(eeprom, &report.store)?;
    }
    Ok(())
}
