use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use shared::protocol::{Command as SequencerCommand, Notification, PlayState, SequencerSnapshot};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use visualizer_core::{
    catalog::{describe_step, CatalogRevision},
    config::DEFAULT_CONFIG_FILE,
    load_settings,
    overview::protocol_overview,
    spawn_sequencer, SequencerHandle,
};

mod render;

#[derive(Parser, Debug)]
#[command(name = "visualizer", about = "Walk through a TCP connection layer by layer")]
struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play the whole exchange from the first SYN to the final ACK.
    Play {
        #[arg(long)]
        speed: Option<f64>,
        #[arg(long)]
        revision: Option<CatalogRevision>,
        #[arg(long)]
        json: bool,
    },
    /// Step forward a number of times, letting each packet arrive.
    Step {
        #[arg(long, default_value_t = 1)]
        count: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the step table.
    Catalog {
        #[arg(long)]
        json: bool,
    },
    /// Print the layer model and packet kinds, marking the kind sent at `--step`.
    Overview {
        /// Step number as listed by `catalog` (1-based).
        #[arg(long)]
        step: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config);
    if let Command::Play {
        revision: Some(revision),
        ..
    } = &cli.command
    {
        settings.catalog_revision = *revision;
    }
    let settings = settings
        .validate()
        .with_context(|| format!("invalid configuration in '{}'", cli.config.display()))?;

    match cli.command {
        Command::Catalog { json } => render::print_catalog(settings.catalog_revision, json),
        Command::Overview { step, json } => {
            let active = match step {
                Some(step) => {
                    let Some(index) = step.checked_sub(1) else {
                        bail!("steps are numbered from 1");
                    };
                    describe_step(index, settings.catalog_revision)?.map(|d| d.kind)
                }
                None => None,
            };
            render::print_overview(&protocol_overview(active), json)
        }
        Command::Play { speed, json, .. } => {
            let handle = spawn_sequencer(settings);
            let mut stream = BroadcastStream::new(handle.subscribe());
            if let Some(speed) = speed {
                handle.send(SequencerCommand::SetSpeed { value: speed })?;
            }
            handle.send(SequencerCommand::TogglePlay)?;
            info!(revision = %settings.catalog_revision, "playing exchange");

            follow(&mut stream, json, |snapshot| {
                snapshot.play_state == PlayState::Complete
            })
            .await?;
            handle.shutdown().await
        }
        Command::Step { count, json } => {
            let handle = spawn_sequencer(settings);
            let mut stream = BroadcastStream::new(handle.subscribe());
            step(&handle, &mut stream, count, json).await?;
            handle.shutdown().await
        }
    }
}

async fn step(
    handle: &SequencerHandle,
    stream: &mut BroadcastStream<Notification>,
    count: usize,
    json: bool,
) -> Result<()> {
    for target in 1..=count {
        handle.send(SequencerCommand::StepForward)?;
        let snapshot = follow(stream, json, |snapshot| {
            snapshot.step >= target || snapshot.play_state == PlayState::Complete
        })
        .await?;
        if snapshot.play_state == PlayState::Complete {
            break;
        }
    }
    Ok(())
}

/// Prints notifications until a snapshot satisfies `done`, returning that snapshot.
async fn follow(
    stream: &mut BroadcastStream<Notification>,
    json: bool,
    done: impl Fn(&SequencerSnapshot) -> bool,
) -> Result<SequencerSnapshot> {
    while let Some(item) = stream.next().await {
        let notification = match item {
            Ok(notification) => notification,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "terminal fell behind the sequencer");
                continue;
            }
        };
        render::print_notification(&notification, json)?;
        if let Notification::Snapshot(snapshot) = notification {
            if done(&snapshot) {
                return Ok(snapshot);
            }
        }
    }
    bail!("sequencer stopped before the exchange finished")
}
