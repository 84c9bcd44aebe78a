//! `tessera`: run the KDC or a principal.

#![forbid(unsafe_code)]

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tessera_core::{AesGcmChannel, Driver, KdcService, SessionTable};
use tessera_node::{
    FileKeyStore, NodeConfig, NodeError, PrincipalNode, SystemEnv, TcpTransport,
    command::{Command, USAGE},
    config::with_port,
    logging, serve_kdc,
};
use tessera_proto::PrincipalId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Instrument;

type Node = PrincipalNode<SystemEnv, AesGcmChannel<SystemEnv>, FileKeyStore>;

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Needham-Schroeder key distribution node")]
struct Cli {
    /// Role to run
    #[arg(long, value_enum)]
    role: Role,

    /// Principal name, e.g. A
    #[arg(long, required_if_eq("role", "principal"))]
    name: Option<String>,

    /// Listening port, overriding the configured one
    #[arg(long)]
    port: Option<u16>,

    /// JSON configuration; the built-in demonstration table is used without it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Role {
    Kdc,
    Principal,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    let config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    match cli.role {
        Role::Kdc => {
            let span = logging::root_span("kdc", None);
            run_kdc(&config, cli.port).instrument(span).await
        },
        Role::Principal => {
            let name = cli.name.context("--name is required for a principal")?;
            let span = logging::root_span("principal", Some(name.as_str()));
            run_principal(&config, &name, cli.port).instrument(span).await
        },
    }
}

fn driver(config: &NodeConfig) -> Driver<SystemEnv, AesGcmChannel<SystemEnv>> {
    Driver::new(SystemEnv, AesGcmChannel::new(SystemEnv), config.driver_config())
}

async fn run_kdc(config: &NodeConfig, port: Option<u16>) -> Result<()> {
    let kdc = KdcService::new(Arc::new(config.registry()?));
    let addr = match port {
        Some(port) => with_port(&config.kdc_addr, port),
        None => config.kdc_addr.clone(),
    };

    let transport =
        TcpTransport::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "KDC listening");

    serve_kdc(transport, kdc, driver(config)).await?;
    Ok(())
}

async fn run_principal(config: &NodeConfig, name: &str, port: Option<u16>) -> Result<()> {
    let local =
        PrincipalId::new(name).with_context(|| format!("invalid principal name {name:?}"))?;
    let store = FileKeyStore::new(&config.key_dir);
    let node: Node = PrincipalNode::from_config(config, local.clone(), driver(config), store)?;

    let configured = config.listen_addr(&local)?;
    let addr = match port {
        Some(port) => with_port(&configured, port),
        None => configured,
    };
    let transport =
        TcpTransport::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;

    let mut listener = tokio::spawn({
        let node = node.clone();
        async move { node.listen(transport).await }.in_current_span()
    });

    println!("principal {local} listening on {addr}");
    println!("{USAGE}");

    let dialer = TcpTransport::dialer();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            result = &mut listener => {
                result.context("listener task failed")??;
                bail!("listener stopped");
            },
        };
        let Some(line) = line else {
            break;
        };

        match line.parse::<Command>() {
            Ok(Command::Empty) => {},
            Ok(Command::Exit) => break,
            Ok(Command::Sessions) => print_sessions(node.sessions()),
            Ok(Command::Connect(peer)) => connect(&node, &dialer, &peer).await,
            Err(err) => println!("{err}"),
        }
    }

    listener.abort();
    Ok(())
}

async fn connect(node: &Node, dialer: &TcpTransport, name: &str) {
    let result = match PrincipalId::new(name) {
        Ok(peer) => node.initiate(dialer, &peer).await,
        Err(_) => Err(NodeError::UnknownPrincipal(name.to_string())),
    };

    match result {
        Ok(established) => println!("session with {} established", established.peer),
        Err(NodeError::UnknownPrincipal(_)) => {
            let known: Vec<_> = node.known_peers().iter().map(ToString::to_string).collect();
            println!("unknown principal {name:?}; known: {}", known.join(", "));
        },
        Err(err) => println!("session with {name} failed: {err}"),
    }
}

fn print_sessions(sessions: &SessionTable) {
    let peers = sessions.peers();
    if peers.is_empty() {
        println!("no sessions");
        return;
    }
    for peer in peers {
        println!("  {peer}");
    }
}
