use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use url::Url;

use worker_driver::driver::{channel_pair, markup, InboundMessage, NativeEvent, OutboundMessage};
use worker_driver::{DriverConfig, DriverSession, HostCapabilities};

const DEFAULT_VIEWPORT_WIDTH: u32 = 375;

/// Host-side transcript line: `{"type":"nativeEvent","event":{...}}`.
#[derive(Deserialize)]
struct NativeEventStep {
    event: NativeEvent,
}

fn main() {
    let transcript = std::env::args().nth(1);

    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let config_path = std::env::var("WORKER_DRIVER_CONFIG")
        .ok()
        .map(PathBuf::from);
    let config = DriverConfig::load(config_path).unwrap_or_else(|err| {
        eprintln!("Failed to load driver config: {err}. Using defaults.");
        DriverConfig::default()
    });

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| {
            eprintln!("Failed to build runtime: {err}");
            std::process::exit(1);
        });

    if let Err(err) = rt.block_on(replay(transcript, config)) {
        eprintln!("Replay failed: {err:#}");
        std::process::exit(1);
    }
}

async fn replay(transcript: Option<String>, config: DriverConfig) -> Result<()> {
    let page_url = std::env::var("WORKER_DRIVER_URL").unwrap_or_else(|_| "about:blank".into());
    let page_url = Url::parse(&page_url).context("WORKER_DRIVER_URL is not a valid URL")?;

    let (host, mut worker) = channel_pair();
    let mut session = DriverSession::new(&config, host.channel, HostCapabilities::default());
    session.on_render(|tree| {
        debug!(target: "driver", markup = %markup::render(tree), "render");
    });
    session.start(page_url, DEFAULT_VIEWPORT_WIDTH)?;
    flush_outbound(&mut worker.outbound)?;

    let reader: Box<dyn AsyncBufRead + Unpin> = match &transcript {
        Some(path) => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open transcript {path}"))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut lines = reader.lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: JsonValue = serde_json::from_str(line)
            .with_context(|| format!("line {line_number} is not valid JSON"))?;
        if value.get("type").and_then(JsonValue::as_str) == Some("nativeEvent") {
            let step: NativeEventStep = serde_json::from_value(value)
                .with_context(|| format!("line {line_number} is not a native event"))?;
            session.dispatch_native_event(&step.event);
        } else {
            let message: InboundMessage = serde_json::from_value(value)
                .with_context(|| format!("line {line_number} is not a background message"))?;
            if let Err(err) = session.handle_message(message) {
                error!(target: "driver", line = line_number, error = %err, "batch rejected");
                return Err(err).context("background context violated the driver protocol");
            }
        }
        flush_outbound(&mut worker.outbound)?;
    }

    println!("{}", markup::render(session.tree()));
    Ok(())
}

fn flush_outbound(outbound: &mut UnboundedReceiver<OutboundMessage>) -> Result<()> {
    while let Ok(message) = outbound.try_recv() {
        println!("{}", serde_json::to_string(&message)?);
    }
    Ok(())
}
