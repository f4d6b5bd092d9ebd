//! Line-oriented front end for docchat.
//!
//! Reads commands from stdin and renders the panel view after each one.
//! Logs go to stderr so they never interleave with the conversation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use docchat_core::{
    BannerKind, BridgeHost, DocumentUpload, HttpServiceClient, Panel, PanelView, Role,
    ServiceConfig, SessionOrchestrator, SkipReason, SqliteStateStore, StateStore, TurnOutcome,
    UploadOutcome, DEFAULT_BRIDGE_CAPACITY,
};

/// Chat with a PDF document through a document QA service.
#[derive(Parser, Debug)]
#[command(name = "docchat", version, about)]
struct CliArgs {
    /// Base URL of the document service.
    #[arg(short = 'u', long = "base-url")]
    base_url: Option<String>,

    /// SQLite file holding the session between runs.
    #[arg(short = 's', long = "store")]
    store: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    log_level: Option<String>,
}

impl CliArgs {
    /// Priority: --store flag > DOCCHAT_STORE env var > in-memory.
    fn resolve_store_path(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.store {
            return Some(expand(&p.to_string_lossy()));
        }
        std::env::var("DOCCHAT_STORE").ok().map(|p| expand(&p))
    }

    /// Priority: --base-url flag > DOCCHAT_BASE_URL env var > default.
    fn resolve_config(&self) -> ServiceConfig {
        let config = ServiceConfig::from_env();
        match self.base_url {
            Some(ref url) => config.with_base_url(url.as_str()),
            None => config,
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

const HELP: &str = "\
Commands:
  upload <path>   Upload a PDF and wait for it to be processed
  ask <question>  Ask about the document (bare text works too)
  clear           Clear the conversation, keep the document
  reset           Forget everything, including the document
  status          Show the session
  retry           Check the server again
  help            Show this help
  quit            Exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let filter = match args.log_level {
        Some(ref level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.resolve_config();
    config.validate()?;
    tracing::info!(base_url = %config.base_url, "Starting docchat v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn StateStore> = match args.resolve_store_path() {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using persistent store");
            Arc::new(SqliteStateStore::open(&path)?)
        }
        None => Arc::new(SqliteStateStore::in_memory()?),
    };

    let service = Arc::new(HttpServiceClient::new(config.clone())?);
    let (bridge, host) = BridgeHost::new(store, service.clone()).spawn(DEFAULT_BRIDGE_CAPACITY);

    let orchestrator = Arc::new(
        SessionOrchestrator::new(service, bridge.clone())
            .with_max_upload_bytes(config.max_upload_bytes),
    );
    let panel = Panel::new(orchestrator.clone(), bridge, &config.base_url);

    panel.open().await;
    render(&panel.view().await);
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "status" => render(&panel.view().await),
            "retry" => {
                panel.retry_connection().await;
                render(&panel.view().await);
            }
            "clear" => {
                if !orchestrator.clear().await {
                    println!("Busy, try again in a moment.");
                }
            }
            "reset" => match orchestrator.reset().await {
                Ok(true) => println!("Session reset."),
                Ok(false) => println!("Busy, try again in a moment."),
                Err(e) => println!("Reset failed: {}", e),
            },
            "upload" if rest.is_empty() => println!("Usage: upload <path>"),
            "upload" => upload(&orchestrator, rest, config.max_upload_bytes).await,
            "ask" => ask(&orchestrator, rest).await,
            _ => ask(&orchestrator, line).await,
        }
    }

    drop(panel);
    drop(orchestrator);
    host.abort();
    Ok(())
}

async fn upload(orchestrator: &SessionOrchestrator, path: &str, max_bytes: u64) {
    let document = match DocumentUpload::from_path(expand(path), max_bytes).await {
        Ok(document) => document,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };

    println!("Processing {}...", document.file_name);
    match orchestrator.start_upload(document).await {
        UploadOutcome::Processed(receipt) => {
            println!("{}: {}", receipt.file_name, receipt.message)
        }
        UploadOutcome::Failed(e) => println!("Upload failed: {}", e),
        UploadOutcome::Skipped(_) => println!("Busy, try again in a moment."),
    }
}

async fn ask(orchestrator: &SessionOrchestrator, question: &str) {
    match orchestrator.send_message(question).await {
        TurnOutcome::Answered(message) => {
            println!("\n{}", message.content);
            if !message.sources().is_empty() {
                println!("Sources: {}", message.sources().join(", "));
            }
            println!();
        }
        TurnOutcome::Failed(e) => println!("Error: {}", e),
        TurnOutcome::Skipped(SkipReason::NotReady) => println!("Upload a PDF first."),
        TurnOutcome::Skipped(SkipReason::EmptyInput) => {}
        TurnOutcome::Skipped(SkipReason::Busy) => println!("Busy, try again in a moment."),
    }
}

fn render(view: &PanelView) {
    let marker = match view.banner.kind {
        BannerKind::Success => "[ok]",
        BannerKind::Error => "[!!]",
        BannerKind::Info => "[--]",
    };
    println!("{} {}", marker, view.banner.text);
    if let Some(ref error) = view.session.last_error {
        println!("     last error: {}", error);
    }
    for message in &view.session.messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "doc",
        };
        println!("{:>4}> {}", who, message.content);
    }
}
