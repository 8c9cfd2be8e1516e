use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use super::*;
use crate::speed::SpeedRange;

const BASE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Seen {
    Stage(u8),
    Complete,
}

#[derive(Clone)]
struct RecordingObserver {
    started: Instant,
    seen: Arc<Mutex<Vec<(Seen, Duration)>>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, seen: Seen) {
        self.seen
            .lock()
            .expect("observer lock")
            .push((seen, self.started.elapsed()));
    }

    fn events(&self) -> Vec<Seen> {
        self.seen
            .lock()
            .expect("observer lock")
            .iter()
            .map(|(seen, _)| *seen)
            .collect()
    }

    fn offset_of(&self, wanted: Seen) -> Duration {
        self.seen
            .lock()
            .expect("observer lock")
            .iter()
            .find(|(seen, _)| *seen == wanted)
            .map(|(_, at)| *at)
            .expect("event recorded")
    }
}

impl TransitionObserver for RecordingObserver {
    fn on_stage(&self, _token: TransitionToken, stage: Stage) {
        self.record(Seen::Stage(stage.index()));
    }

    fn on_complete(&self, _token: TransitionToken) {
        self.record(Seen::Complete);
    }
}

fn speed(value: f64) -> Speed {
    SpeedRange::new(0.1, 1.0)
        .expect("range")
        .admit(value)
        .expect("speed")
}

#[test]
fn progress_walks_every_stage_then_finishes() {
    let mut progress = TransitionProgress::Idle;
    let mut stages = Vec::new();
    loop {
        progress = progress.advance();
        match progress {
            TransitionProgress::Stage(stage) => stages.push(stage.index()),
            TransitionProgress::Done => break,
            TransitionProgress::Idle => unreachable!("never goes back to idle"),
        }
    }
    assert_eq!(stages, (0..9).collect::<Vec<u8>>());
    assert_eq!(TransitionProgress::Done.advance(), TransitionProgress::Done);
}

#[tokio::test(start_paused = true)]
async fn stage_zero_is_reported_synchronously() {
    let observer = RecordingObserver::new();
    let (_speed_tx, speed_rx) = watch::channel(speed(1.0));
    let driver = TransitionDriver::new(BASE);

    let _handle = driver.begin(TransitionToken(1), speed_rx, observer.clone());

    assert_eq!(observer.events(), vec![Seen::Stage(0)]);
}

#[tokio::test(start_paused = true)]
async fn full_run_reports_each_stage_once_in_order_then_completes() {
    let observer = RecordingObserver::new();
    let (_speed_tx, speed_rx) = watch::channel(speed(1.0));
    let driver = TransitionDriver::new(BASE);

    let _handle = driver.begin(TransitionToken(1), speed_rx, observer.clone());
    tokio::time::sleep(BASE * 20).await;

    let mut expected: Vec<Seen> = (0..9).map(Seen::Stage).collect();
    expected.push(Seen::Complete);
    assert_eq!(observer.events(), expected);
    assert_eq!(observer.offset_of(Seen::Stage(8)), BASE * 8);
    assert_eq!(observer.offset_of(Seen::Complete), BASE * 9);
}

#[tokio::test(start_paused = true)]
async fn slower_speed_stretches_every_stage() {
    let observer = RecordingObserver::new();
    let (_speed_tx, speed_rx) = watch::channel(speed(0.5));
    let driver = TransitionDriver::new(BASE);

    let _handle = driver.begin(TransitionToken(1), speed_rx, observer.clone());
    tokio::time::sleep(BASE * 40).await;

    assert_eq!(observer.offset_of(Seen::Stage(1)), BASE * 2);
    assert_eq!(observer.offset_of(Seen::Complete), BASE * 18);
}

#[tokio::test(start_paused = true)]
async fn speed_change_applies_only_to_stages_not_yet_started() {
    let observer = RecordingObserver::new();
    let (speed_tx, speed_rx) = watch::channel(speed(1.0));
    let driver = TransitionDriver::new(BASE);

    let _handle = driver.begin(TransitionToken(1), speed_rx, observer.clone());
    // Stage 1 starts at 500ms; change speed part way through it.
    tokio::time::sleep(Duration::from_millis(600)).await;
    speed_tx.send(speed(0.5)).expect("driver still listening");
    tokio::time::sleep(BASE * 40).await;

    assert_eq!(observer.offset_of(Seen::Stage(1)), BASE);
    // The running stage keeps its 500ms delay.
    assert_eq!(observer.offset_of(Seen::Stage(2)), BASE * 2);
    // Later stages take 1000ms each.
    assert_eq!(observer.offset_of(Seen::Stage(3)), BASE * 4);
}

#[tokio::test(start_paused = true)]
async fn abort_silences_the_transition() {
    let observer = RecordingObserver::new();
    let (_speed_tx, speed_rx) = watch::channel(speed(1.0));
    let driver = TransitionDriver::new(BASE);

    let handle = driver.begin(TransitionToken(7), speed_rx, observer.clone());
    tokio::time::sleep(Duration::from_millis(1200)).await;
    let before_abort = observer.events();
    handle.abort();
    tokio::time::sleep(BASE * 20).await;

    assert_eq!(before_abort, vec![Seen::Stage(0), Seen::Stage(1), Seen::Stage(2)]);
    assert_eq!(observer.events(), before_abort);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_aborts_too() {
    let observer = RecordingObserver::new();
    let (_speed_tx, speed_rx) = watch::channel(speed(1.0));
    let driver = TransitionDriver::new(BASE);

    drop(driver.begin(TransitionToken(3), speed_rx, observer.clone()));
    tokio::time::sleep(BASE * 20).await;

    assert_eq!(observer.events(), vec![Seen::Stage(0)]);
}

#[tokio::test(start_paused = true)]
async fn dwell_completes_after_one_stage_delay() {
    let observer = RecordingObserver::new();
    let (_speed_tx, speed_rx) = watch::channel(speed(0.5));
    let driver = TransitionDriver::new(BASE);

    let _handle = driver.dwell(TransitionToken(2), speed_rx, observer.clone());
    tokio::time::sleep(BASE * 10).await;

    assert_eq!(observer.events(), vec![Seen::Complete]);
    assert_eq!(observer.offset_of(Seen::Complete), BASE * 2);
}

#[tokio::test]
async fn channel_observer_forwards_tagged_signals() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let stage = Stage::new(3).expect("stage");

    tx.on_stage(TransitionToken(4), stage);
    tx.on_complete(TransitionToken(4));

    assert_eq!(
        rx.recv().await,
        Some(DriverSignal::Stage {
            token: TransitionToken(4),
            stage
        })
    );
    let complete = rx.recv().await.expect("signal");
    assert_eq!(complete.token(), TransitionToken(4));
}
