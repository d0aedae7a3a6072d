use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use shared::domain::{Direction, Role};
use swipe_core::{
    backend_from_config,
    gesture::GestureSample,
    input::{ArrowKey, InputEvent, InputOutcome},
    load_engine_config, BackendKind, Credential, CredentialStore, CoreError, SessionStatus,
    SwipeSession,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Terminal host for a swipe classification session.
#[derive(Parser, Debug)]
struct Args {
    /// Engine config file (defaults to ./swipe.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// `simulated` or `live`.
    #[arg(long)]
    backend: Option<BackendKind>,
    #[arg(long)]
    server_url: Option<String>,
    /// Access token for the live backend.
    #[arg(long)]
    token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Input(InputEvent),
    /// Full pointer gesture: down, move to (dx, dy), up.
    Drag(f32, f32),
    Reload,
    Restart,
    Status,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(Command::Status);
    };
    let command = match head {
        "drag" => {
            let dx = parts.next().context("usage: drag <dx> <dy>")?.parse()?;
            let dy = parts.next().context("usage: drag <dx> <dy>")?.parse()?;
            Command::Drag(dx, dy)
        }
        "reload" => Command::Reload,
        "restart" => Command::Restart,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => {
            if let Ok(key) = other.parse::<ArrowKey>() {
                Command::Input(InputEvent::Key(key))
            } else if let Ok(direction) = other.parse::<Direction>() {
                Command::Input(InputEvent::Button(direction))
            } else {
                bail!("unknown command '{other}' (try 'help')");
            }
        }
    };
    if parts.next().is_some() {
        bail!("unexpected arguments after '{head}'");
    }
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut config = load_engine_config(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(server_url) = args.server_url {
        config.server_url = Some(server_url);
    }
    config.validate()?;

    let credentials = Arc::new(CredentialStore::new());
    if let Some(token) = args.token {
        credentials.set(Credential::new(token, Role::User)).await;
    } else if config.backend == BackendKind::Live {
        warn!("no --token given; the live backend will likely reject requests");
    }

    let backend = backend_from_config(&config, credentials)?;
    info!(backend = ?config.backend, "starting session");
    let session = SwipeSession::new(backend, config);

    if let Err(err) = session.load().await {
        println!("could not load items: {err}");
    }
    render(&session).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match command {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Status => {}
            Command::Reload => {
                if let Err(err) = session.load().await {
                    println!("could not load items: {err}");
                }
            }
            Command::Restart => {
                if let Err(err) = session.restart().await {
                    println!("could not restart: {err}");
                }
            }
            Command::Input(event) => report(session.handle_input(event).await),
            Command::Drag(dx, dy) => {
                for event in [
                    InputEvent::PointerDown,
                    InputEvent::PointerMove(GestureSample::new(dx, dy)),
                    InputEvent::PointerUp,
                ] {
                    report(session.handle_input(event).await);
                }
            }
        }
        render(&session).await;
    }

    let results = session.results().await;
    info!(results = results.len(), "session finished");
    Ok(())
}

fn report(outcome: Result<InputOutcome, CoreError>) {
    match outcome {
        Ok(InputOutcome::Commit(direction)) => println!("recorded: {direction}"),
        Ok(InputOutcome::Cancel) => println!("below threshold, card returned"),
        Ok(InputOutcome::Rejected) => println!("busy, input ignored"),
        Ok(_) => {}
        Err(err) => println!("not recorded: {err}"),
    }
}

async fn render(session: &SwipeSession) {
    let (cursor, total) = session.progress().await;
    match session.status().await {
        SessionStatus::Failed(reason) => println!("[{cursor}/{total}] failed: {reason:?}"),
        SessionStatus::Empty => {
            println!("[{cursor}/{total}] queue finished; 'reload' fetches more, 'restart' clears");
            return;
        }
        _ => {}
    }
    if let Some(item) = session.current_item().await {
        println!("[{}/{total}] {}", cursor + 1, item.prompt);
        println!("  image: {}", item.image.describe());
        for reference in &item.reference_images {
            let caption = reference.caption.as_deref().unwrap_or("reference");
            println!("  {caption}: {}", reference.image.describe());
        }
    }
}

fn print_help() {
    println!("left/no, right/yes, up/dont-know, down/trash  judge the current item");
    println!("drag <dx> <dy>                                swipe by a displacement");
    println!("reload | restart | status | quit");
}
