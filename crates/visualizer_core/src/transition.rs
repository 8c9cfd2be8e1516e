//! Drives a single packet through stages 0..=8 on tokio timers.

use std::time::Duration;

use shared::domain::{Stage, TransitionToken};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::debug;

use crate::speed::Speed;

/// A report from a running transition, tagged with the token it was started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSignal {
    Stage {
        token: TransitionToken,
        stage: Stage,
    },
    Complete {
        token: TransitionToken,
    },
}

impl DriverSignal {
    pub fn token(&self) -> TransitionToken {
        match self {
            DriverSignal::Stage { token, .. } | DriverSignal::Complete { token } => *token,
        }
    }
}

/// Receives stage and completion reports from the driver.
pub trait TransitionObserver: Send + Sync + 'static {
    fn on_stage(&self, token: TransitionToken, stage: Stage);
    fn on_complete(&self, token: TransitionToken);
}

impl TransitionObserver for mpsc::UnboundedSender<DriverSignal> {
    fn on_stage(&self, token: TransitionToken, stage: Stage) {
        // Receiver gone means the sequencer shut down.
        let _ = self.send(DriverSignal::Stage { token, stage });
    }

    fn on_complete(&self, token: TransitionToken) {
        let _ = self.send(DriverSignal::Complete { token });
    }
}

/// Where a single transition is along its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionProgress {
    Idle,
    Stage(Stage),
    Done,
}

impl TransitionProgress {
    pub fn advance(self) -> Self {
        match self {
            TransitionProgress::Idle => TransitionProgress::Stage(Stage::ORIGIN),
            TransitionProgress::Stage(stage) => stage
                .next()
                .map(TransitionProgress::Stage)
                .unwrap_or(TransitionProgress::Done),
            TransitionProgress::Done => TransitionProgress::Done,
        }
    }
}

/// Owns the timer task of one transition. Dropping the handle aborts it.
#[derive(Debug)]
pub struct TransitionHandle {
    token: TransitionToken,
    task: JoinHandle<()>,
}

impl TransitionHandle {
    pub fn token(&self) -> TransitionToken {
        self.token
    }

    pub fn abort(self) {
        debug!(token = self.token.0, "transition aborted");
        drop(self);
    }
}

impl Drop for TransitionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionDriver {
    base_stage_duration: Duration,
}

impl TransitionDriver {
    pub fn new(base_stage_duration: Duration) -> Self {
        Self {
            base_stage_duration,
        }
    }

    pub fn stage_delay(&self, speed: Speed) -> Duration {
        speed.stage_delay(self.base_stage_duration)
    }

    /// Starts a transition. Stage 0 is reported before this returns; every
    /// later stage, and the final completion, after one stage delay each.
    ///
    /// Speed is sampled when a stage starts, so a change only affects stages
    /// that have not started yet.
    pub fn begin<O: TransitionObserver>(
        &self,
        token: TransitionToken,
        speed: watch::Receiver<Speed>,
        observer: O,
    ) -> TransitionHandle {
        let mut progress = TransitionProgress::Idle.advance();
        observer.on_stage(token, Stage::ORIGIN);

        let base = self.base_stage_duration;
        let task = tokio::spawn(async move {
            loop {
                let delay = speed.borrow().stage_delay(base);
                tokio::time::sleep(delay).await;
                progress = progress.advance();
                match progress {
                    TransitionProgress::Stage(stage) => observer.on_stage(token, stage),
                    TransitionProgress::Done => {
                        observer.on_complete(token);
                        break;
                    }
                    TransitionProgress::Idle => break,
                }
            }
        });

        TransitionHandle { token, task }
    }

    /// A stage-long pause with no packet, reported as a bare completion.
    pub fn dwell<O: TransitionObserver>(
        &self,
        token: TransitionToken,
        speed: watch::Receiver<Speed>,
        observer: O,
    ) -> TransitionHandle {
        let delay = self.stage_delay(*speed.borrow());
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            observer.on_complete(token);
        });

        TransitionHandle { token, task }
    }
}

#[cfg(test)]
#[path = "tests/transition_tests.rs"]
mod tests;
