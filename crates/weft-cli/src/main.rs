use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use url::Url;
use weft_editor_core::{HeadlessWidget, Protocol, ReplicaId, Sequence, SequenceView};
use weft_transport::{BridgeHandle, Endpoint, TransportConfig, WsConnector};

mod command;

use command::{Command, HELP};

#[derive(Parser)]
#[command(version, about = "weft - headless replica of a shared text document", long_about = None)]
struct Cli {
    /// Full websocket URL of the document service (overrides host/port)
    #[arg(long)]
    url: Option<Url>,

    /// Host of the document service
    #[arg(long)]
    host: Option<String>,

    /// Port of the document service
    #[arg(long)]
    port: Option<u16>,

    /// Connect with wss
    #[arg(long)]
    secure: bool,

    /// Replica id (random when omitted)
    #[arg(long, env = "WEFT_REPLICA")]
    replica: Option<u32>,

    /// Wait between reconnect attempts, in milliseconds
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,

    /// Most operations buffered while disconnected
    #[arg(long)]
    outbox_capacity: Option<usize>,

    /// Emit addAtBeginning for inserts at the start of the document
    #[arg(long)]
    legacy: bool,
}

impl Cli {
    /// Environment first, then flags on top.
    fn transport_config(&self) -> Result<TransportConfig> {
        let mut config = TransportConfig::from_env()?;

        if let Some(url) = &self.url {
            config.url = url.clone();
        } else if self.host.is_some() || self.port.is_some() || self.secure {
            let host = self
                .host
                .clone()
                .or_else(|| config.url.host_str().map(str::to_string))
                .unwrap_or_else(|| TransportConfig::DEFAULT_HOST.to_string());
            let endpoint = Endpoint::new(host)
                .with_port(self.port.unwrap_or(Endpoint::DEFAULT_PORT))
                .with_secure(self.secure);
            config.url = endpoint.url()?;
        }

        if let Some(ms) = self.reconnect_delay_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(capacity) = self.outbox_capacity {
            config.outbox_capacity = capacity;
        }
        Ok(config)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_miette();
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = cli.transport_config()?;
    let replica = cli.replica.map(ReplicaId).unwrap_or_else(ReplicaId::random);
    let protocol = if cli.legacy {
        Protocol::Legacy
    } else {
        Protocol::Current
    };

    info!(%replica, url = %config.url, ?protocol, "starting replica");

    let sequence = Sequence::new(replica).with_protocol(protocol);
    let view = SequenceView::attach(HeadlessWidget::new(), sequence)?;
    let (bridge, mut updates) = weft_transport::spawn(config, WsConnector);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.into_diagnostic()? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if execute(&view, &bridge, command)? == Flow::Quit {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{:?}", miette::Report::new(e)),
                }
            }
            update = updates.recv() => {
                let Some(update) = update else {
                    warn!("transport bridge stopped");
                    break;
                };
                match view.apply_remote(update) {
                    Ok(report) => {
                        debug!(?report, "applied remote update");
                        println!("{}", view.text());
                    }
                    Err(e) => warn!(error = %e, "failed to apply remote update"),
                }
            }
        }
    }

    bridge.shutdown();
    Ok(())
}

fn execute(
    view: &SequenceView<HeadlessWidget>,
    bridge: &BridgeHandle,
    command: Command,
) -> Result<Flow> {
    match command {
        Command::Insert { offset, text } => view.widget().insert(offset, &text),
        Command::Delete { offset, len } => {
            view.widget().delete(offset..offset.saturating_add(len))
        }
        Command::Select { anchor, head } => view.widget().select(anchor, head),
        Command::Text => println!("{}", view.text()),
        Command::Nodes => {
            for node in view.sequence().nodes() {
                let mark = if node.is_deleted { " (deleted)" } else { "" };
                println!("{:>12} {:?}{mark}", node.id.to_string(), node.value);
            }
        }
        Command::State => println!("{}", bridge.state()),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(Flow::Quit),
    }

    for op in view.take_outgoing() {
        bridge.send(op)?;
    }
    Ok(Flow::Continue)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
