//! Niva terminal client - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Build the backend gateway (HTTP flows, or scripted with `--offline`)
//! 3. Wire the console recognizer and the file sink into a `Session`
//! 4. Run the session loop and feed it from a stdin REPL

mod cli;
mod platform;
mod repl;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};

use niva_chat::{Session, SessionCommand};
use niva_core::config::NivaConfig;
use niva_gateway::{Gateway, HttpBackend, MockBackend};

use cli::{expand_home, CliArgs};
use platform::{ConsoleMicrophone, ConsoleRecognizer, FileSink};
use repl::ReplCommand;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn build_gateway(
    config: &NivaConfig,
    offline: bool,
) -> Result<Gateway, Box<dyn std::error::Error>> {
    if offline {
        tracing::info!("Using the offline scripted backend");
        return Ok(Gateway::new(Arc::new(MockBackend::new())));
    }
    let backend = HttpBackend::from_config(&config.backend)?;
    tracing::info!(base_url = backend.base_url(), "Using the HTTP flow backend");
    Ok(Gateway::new(Arc::new(backend)))
}

/// Print session events until the session goes away.
async fn print_events(mut events: broadcast::Receiver<niva_core::SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(line) = repl::render_event(&event) {
                    println!("{}", line);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Read stdin until `/quit`, end of input or Ctrl-C.
async fn repl_loop(
    commands: mpsc::Sender<SessionCommand>,
    mic: ConsoleMicrophone,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let Some(command) = repl::route_line(&line, &mic) else {
            continue;
        };

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", repl::HELP),
            ReplCommand::Invalid(message) => println!("{}", message),
            ReplCommand::History => {
                let (tx, rx) = oneshot::channel();
                if commands.send(SessionCommand::History(tx)).await.is_err() {
                    break;
                }
                if let Ok(turns) = rx.await {
                    for turn in &turns {
                        println!("{}", repl::render_turn(turn));
                    }
                }
            }
            other => {
                if let Some(command) = other.into_session_command() {
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first so its log level can seed the subscriber.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match NivaConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (NivaConfig::default(), Some(e)),
    };
    args.apply(&mut config);

    init_tracing(&config.general.log_level);
    tracing::info!("Starting Niva v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid config, using defaults")
        }
        Some(_) => tracing::info!(path = %config_file.display(), "No config file, using defaults"),
    }
    config.validate()?;

    let gateway = build_gateway(&config, args.offline)?;

    // Devices report into their own channel; it is forwarded to the session.
    let (device_tx, mut device_rx) = mpsc::unbounded_channel();
    let (recognizer, mic) = ConsoleRecognizer::new(device_tx.clone());
    let clip_dir = expand_home(&config.narration.clip_dir);
    let sink = FileSink::new(clip_dir, device_tx);

    let session = Session::new(&config, gateway, Box::new(recognizer), Box::new(sink));
    for turn in session.history() {
        println!("{}", repl::render_turn(turn));
    }
    println!("(type /help for commands)");

    let printer = tokio::spawn(print_events(session.subscribe()));
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let session_task = tokio::spawn(session.run(command_rx));

    let forward_tx = command_tx.clone();
    tokio::spawn(async move {
        while let Some(command) = device_rx.recv().await {
            if forward_tx.send(command).await.is_err() {
                break;
            }
        }
    });

    let repl_result = repl_loop(command_tx.clone(), mic).await;

    let _ = command_tx.send(SessionCommand::Shutdown).await;
    session_task.await?;
    printer.abort();
    tracing::info!("Niva stopped");

    repl_result?;
    Ok(())
}
