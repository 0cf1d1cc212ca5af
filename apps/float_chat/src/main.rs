use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use session_core::{
    argo_overlay, load_settings, ChatSettings, ResolverFailurePolicy, ResolverKind,
    SessionController, SessionEvent,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{error::RecvError, Receiver},
};
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

use commands::{dispatch, parse_line, Flow};

#[derive(Parser, Debug)]
#[command(name = "float-chat", about = "Chat with ARGO oceanographic float data")]
struct Args {
    /// Settings file; defaults to ./float_chat.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    resolver: Option<ResolverKind>,
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    latency_ms: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    failure_policy: Option<ResolverFailurePolicy>,
    /// Timeout for the http resolver, in seconds.
    #[arg(long)]
    request_timeout_secs: Option<u64>,
}

impl Args {
    fn apply(&self, settings: &mut ChatSettings) {
        if let Some(resolver) = self.resolver {
            settings.resolver = resolver;
        }
        if let Some(url) = &self.backend_url {
            settings.backend_url = Some(url.clone());
        }
        if let Some(latency_ms) = self.latency_ms {
            settings.response_latency_ms = latency_ms;
        }
        if let Some(seed) = self.seed {
            settings.rng_seed = Some(seed);
        }
        if let Some(policy) = self.failure_policy {
            settings.failure_policy = policy;
        }
        if let Some(timeout) = self.request_timeout_secs {
            settings.request_timeout_secs = timeout;
        }
    }
}

async fn render_events(mut events: Receiver<SessionEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "renderer fell behind session events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            SessionEvent::MessageAppended(message) => println!("{}", render::message(&message)),
            SessionEvent::PendingChanged(true) => println!("{}", render::loading()),
            SessionEvent::PendingChanged(false) | SessionEvent::InputChanged(_) => {}
            SessionEvent::ViewChanged(view) => {
                println!("{}", render::view_status(&view));
                if view.map_visible {
                    println!("{}", render::overlay(&argo_overlay()));
                }
            }
            SessionEvent::TurnFailed { reason, .. } => println!("Query failed: {reason}"),
            SessionEvent::TurnCancelled { .. } => println!("Reply cancelled."),
            SessionEvent::Closed => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings =
        load_settings(args.config.as_deref()).context("failed to load float chat settings")?;
    args.apply(&mut settings);
    let resolver = settings
        .build_resolver()
        .context("failed to set up the query resolver")?;

    let session = SessionController::new(resolver, settings.failure_policy);
    let renderer = tokio::spawn(render_events(session.subscribe_events()));

    println!("Float Chat - ARGO Oceanographic Data Assistant");
    println!("{}", render::transcript(session.messages().await.messages()));
    if session.quick_queries_visible().await {
        println!("{}", render::quick_queries(session.quick_queries()));
    }
    println!("{}", render::prompt_hint());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("failed to read from stdin")?
    {
        let (flow, status) = dispatch(&session, parse_line(&line))
            .await
            .context("session command failed")?;
        if let Some(status) = status {
            println!("{status}");
        }
        if let Flow::Quit = flow {
            break;
        }
    }

    session.shutdown().await;
    let _ = renderer.await;
    Ok(())
}
