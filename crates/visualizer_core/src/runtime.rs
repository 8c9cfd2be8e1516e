//! Hosts a [`Sequencer`] on its own task and bridges it to front-ends.
//!
//! Commands go in over a bounded queue; everything the sequencer reports comes
//! back out on a broadcast channel, followed by a fresh snapshot.

use anyhow::Context;
use shared::{
    error::ApiError,
    protocol::{Command, Notification},
};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{Sequencer, SequencerSettings};

const COMMAND_QUEUE_DEPTH: usize = 64;
const NOTIFICATION_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum SequencerHandleError {
    #[error("sequencer command queue is full; retry")]
    QueueFull,
    #[error("sequencer task is no longer running")]
    Disconnected,
}

pub struct SequencerHandle {
    commands: mpsc::Sender<Command>,
    notifications: broadcast::Sender<Notification>,
    task: JoinHandle<()>,
}

impl SequencerHandle {
    pub fn send(&self, command: Command) -> Result<(), SequencerHandleError> {
        let name = command.name();
        match self.commands.try_send(command) {
            Ok(()) => {
                debug!(command = name, "queued sequencer command");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(command = name, "sequencer command queue is full");
                Err(SequencerHandleError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                warn!(command = name, "sequencer task is gone");
                Err(SequencerHandleError::Disconnected)
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Stops the sequencer task and waits for it to exit.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        // Already gone is as good as stopped.
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await.context("sequencer task failed")
    }
}

pub fn spawn_sequencer(settings: SequencerSettings) -> SequencerHandle {
    let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
    let task = tokio::spawn(run(
        Sequencer::new(settings),
        command_rx,
        notifications.clone(),
    ));

    SequencerHandle {
        commands,
        notifications,
        task,
    }
}

fn apply_command(sequencer: &mut Sequencer, command: Command) -> Option<Notification> {
    match command {
        Command::TogglePlay => sequencer.toggle_play(),
        Command::StepForward => sequencer.step_forward(),
        Command::Reset => sequencer.reset(),
        Command::SetSpeed { value } => {
            if let Err(err) = sequencer.set_speed(value) {
                return Some(Notification::Rejected(ApiError::from(err)));
            }
        }
        Command::Shutdown => {}
    }
    None
}

fn publish(sequencer: &mut Sequencer, notifications: &broadcast::Sender<Notification>) {
    // Sending fails only when nobody is subscribed.
    for notification in sequencer.drain_notifications() {
        let _ = notifications.send(notification);
    }
    let _ = notifications.send(Notification::Snapshot(sequencer.snapshot()));
}

async fn run(
    mut sequencer: Sequencer,
    mut commands: mpsc::Receiver<Command>,
    notifications: broadcast::Sender<Notification>,
) {
    info!("sequencer started");
    publish(&mut sequencer, &notifications);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let command = match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => command,
                };
                debug!(command = command.name(), "applying sequencer command");
                if let Some(rejected) = apply_command(&mut sequencer, command) {
                    let _ = notifications.send(rejected);
                }
            }
            Some(signal) = sequencer.next_signal() => sequencer.apply_signal(signal),
        }
        publish(&mut sequencer, &notifications);
    }

    info!(step = sequencer.step(), "sequencer stopped");
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
