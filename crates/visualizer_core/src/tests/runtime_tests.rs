use std::time::Duration;

use super::*;
use shared::{
    domain::{ConnectionPhase, PacketKind},
    error::ErrorCode,
    protocol::{PlayState, SequencerSnapshot},
};
use tokio::sync::broadcast::error::RecvError;

fn fast_settings() -> SequencerSettings {
    SequencerSettings {
        base_stage_duration: Duration::from_millis(50),
        ..SequencerSettings::default()
    }
}

async fn next_snapshot(rx: &mut broadcast::Receiver<Notification>) -> SequencerSnapshot {
    loop {
        match rx.recv().await {
            Ok(Notification::Snapshot(snapshot)) => return snapshot,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("sequencer closed its notifications"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn play_command_drives_the_exchange_to_step_one() {
    let handle = spawn_sequencer(fast_settings());
    let mut rx = handle.subscribe();

    handle.send(Command::TogglePlay).expect("queued");

    let mut finished = Vec::new();
    loop {
        match rx.recv().await.expect("notification") {
            Notification::TransitionFinished { kind, .. } => finished.push(kind),
            Notification::Snapshot(snapshot) if snapshot.step >= 1 => {
                assert_eq!(snapshot.phase, ConnectionPhase::Handshake);
                assert_eq!(snapshot.play_state, PlayState::Running);
                break;
            }
            _ => {}
        }
    }

    assert_eq!(finished, vec![PacketKind::Syn]);
    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn playing_through_reaches_complete() {
    let handle = spawn_sequencer(fast_settings());
    let mut rx = handle.subscribe();
    handle.send(Command::SetSpeed { value: 1.0 }).expect("queued");
    handle.send(Command::TogglePlay).expect("queued");

    let snapshot = loop {
        let snapshot = next_snapshot(&mut rx).await;
        if snapshot.play_state == PlayState::Complete {
            break snapshot;
        }
    };

    assert_eq!(snapshot.step, snapshot.total_steps);
    assert_eq!(snapshot.phase, ConnectionPhase::Complete);
    assert!(snapshot.event.is_none());
    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn invalid_speed_is_rejected_without_changing_speed() {
    let handle = spawn_sequencer(fast_settings());
    let mut rx = handle.subscribe();

    handle.send(Command::SetSpeed { value: -1.0 }).expect("queued");

    let rejected = loop {
        if let Notification::Rejected(err) = rx.recv().await.expect("notification") {
            break err;
        }
    };
    assert_eq!(rejected.code, ErrorCode::InvalidSpeed);

    let snapshot = next_snapshot(&mut rx).await;
    assert_eq!(snapshot.speed, 0.5);
    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn reset_command_returns_to_idle() {
    let handle = spawn_sequencer(fast_settings());
    let mut rx = handle.subscribe();
    handle.send(Command::StepForward).expect("queued");
    while next_snapshot(&mut rx).await.event.is_none() {}

    handle.send(Command::Reset).expect("queued");
    let snapshot = next_snapshot(&mut rx).await;

    assert_eq!(snapshot.step, 0);
    assert_eq!(snapshot.phase, ConnectionPhase::Idle);
    assert_eq!(snapshot.play_state, PlayState::Idle);
    assert!(snapshot.event.is_none());
    handle.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn commands_after_shutdown_are_refused() {
    let handle = spawn_sequencer(fast_settings());
    let commands = handle.commands.clone();

    handle.shutdown().await.expect("shutdown");

    assert!(commands.try_send(Command::TogglePlay).is_err());
}
