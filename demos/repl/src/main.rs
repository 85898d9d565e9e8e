//! Interactive console against a running (or freshly spawned) engine.
//!
//! Run with: cargo run -p fimm-repl -- --connect localhost:5101
//!       or: cargo run -p fimm-repl -- --spawn /path/to/engine [--port 5101]
//!
//! Plain command lines go straight to the engine and the decoded result
//! prints as JSON. Meta commands:
//!   :help [path]    show introspection text (default `app`)
//!   :batch on|off   toggle batched mode (off flushes)
//!   :flush          send the pending batch
//!   :quit           disconnect and exit

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use fimm_protocol::{decode_response, RemotePath};
use fimm_proxy::help_text;
use fimm_session::Session;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

enum Target {
    Connect { host: String, port: u16 },
    Spawn { executable: PathBuf, port: Option<u16> },
}

fn parse_args() -> Result<Target> {
    let mut args = std::env::args().skip(1);
    let mut connect: Option<String> = None;
    let mut spawn: Option<PathBuf> = None;
    let mut port: Option<u16> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--connect" => connect = Some(args.next().context("--connect needs host:port")?),
            "--spawn" => spawn = Some(PathBuf::from(args.next().context("--spawn needs a path")?)),
            "--port" => {
                port = Some(args.next().context("--port needs a number")?.parse()?);
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    if let Some(addr) = connect {
        let (host, port) = addr
            .split_once(':')
            .context("--connect expects host:port")?;
        return Ok(Target::Connect {
            host: host.to_owned(),
            port: port.parse()?,
        });
    }
    if let Some(executable) = spawn {
        return Ok(Target::Spawn { executable, port });
    }
    bail!("pass --connect host:port or --spawn /path/to/engine")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let session = Session::new();
    match parse_args()? {
        Target::Connect { host, port } => session.connect(&host, port).await?,
        Target::Spawn { executable, port } => {
            session.spawn_and_connect(&executable, port).await?;
        }
    }
    tracing::info!("session established");
    println!("connected; :quit to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = dispatch(&session, line).await {
            eprintln!("error: {e}");
        }
        if line == ":quit" {
            break;
        }
    }

    session.disconnect().await;
    Ok(())
}

async fn dispatch(session: &Session, line: &str) -> Result<()> {
    match line.split_once(' ').map_or((line, ""), |(a, b)| (a, b.trim())) {
        (":quit", _) => {}
        (":help", rest) => {
            let path = if rest.is_empty() {
                RemotePath::root(fimm_proxy::ROOT)
            } else {
                RemotePath::root(rest)
            };
            println!("{}", help_text(session, &path).await?);
        }
        (":batch", "on") => session.set_batched(true).await?,
        (":batch", "off") => session.set_batched(false).await?,
        (":batch", _) => bail!(":batch expects on or off"),
        (":flush", _) => {
            let raw = session.flush().await?;
            if !raw.is_empty() {
                println!("{}", serde_json::to_string_pretty(&decode_response(&raw)?)?);
            }
        }
        _ => {
            if let Some(raw) = session.submit(line).await? {
                println!("{}", serde_json::to_string_pretty(&decode_response(&raw)?)?);
            } else {
                println!("queued ({} pending)", session.pending_count().await);
            }
        }
    }
    Ok(())
}
