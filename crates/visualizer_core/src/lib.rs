//! Animation sequencing engine for the TCP/IP handshake visualizer.
//!
//! The [`Sequencer`] owns the logical step counter and play controls. For each
//! step it asks the catalog for a packet, hands that packet to the
//! [`TransitionDriver`](transition::TransitionDriver) and advances once the
//! packet has travelled through all nine stages. Driver reports arrive over an
//! unbounded channel and are applied only when their token matches the
//! transition currently in flight, so reports from an aborted run are inert.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{
        phase_for_step, ConnectionPhase, PacketEvent, PacketKind, Stage, StageDirection,
        TransitionToken, TOTAL_STEPS,
    },
    error::VisualizerError,
    layout,
    protocol::{Notification, PlayState, SequencerSnapshot},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub mod catalog;
pub mod config;
pub mod narration;
pub mod overview;
pub mod runtime;
pub mod speed;
pub mod transition;

pub use config::{load_settings, SequencerSettings, Settings};
pub use runtime::{spawn_sequencer, SequencerHandle, SequencerHandleError};

use catalog::event_for_step;
use narration::{narration_for_stage, narration_for_step, COMPLETE_NARRATION, IDLE_NARRATION};
use overview::{protocol_overview, ProtocolOverview};
use speed::Speed;
use transition::{DriverSignal, TransitionDriver, TransitionHandle};

/// What to do with a step whose catalog entry has no packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyStepPolicy {
    /// Show the step's narration and move on straight away.
    #[default]
    Immediate,
    /// Hold the step's narration for one stage delay before moving on.
    Dwell,
}

impl FromStr for EmptyStepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(EmptyStepPolicy::Immediate),
            "dwell" => Ok(EmptyStepPolicy::Dwell),
            other => Err(format!("unknown empty step policy '{other}'")),
        }
    }
}

impl fmt::Display for EmptyStepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyStepPolicy::Immediate => f.write_str("immediate"),
            EmptyStepPolicy::Dwell => f.write_str("dwell"),
        }
    }
}

struct InFlight {
    handle: TransitionHandle,
    event: Option<PacketEvent>,
    stage: Option<Stage>,
    /// Set for step-forward runs.
    advance_on_complete: bool,
}

pub struct Sequencer {
    settings: SequencerSettings,
    driver: TransitionDriver,
    play_state: PlayState,
    started: bool,
    step: usize,
    speed: watch::Sender<Speed>,
    in_flight: Option<InFlight>,
    last_token: TransitionToken,
    last_event_kind: Option<PacketKind>,
    narration: String,
    stage_narration: Option<&'static str>,
    signals_tx: mpsc::UnboundedSender<DriverSignal>,
    signals_rx: mpsc::UnboundedReceiver<DriverSignal>,
    outbox: Vec<Notification>,
}

impl Sequencer {
    pub fn new(settings: SequencerSettings) -> Self {
        let (speed, _) = watch::channel(settings.default_speed);
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Self {
            driver: TransitionDriver::new(settings.base_stage_duration),
            settings,
            play_state: PlayState::Idle,
            started: false,
            step: 0,
            speed,
            in_flight: None,
            last_token: TransitionToken(0),
            last_event_kind: None,
            narration: IDLE_NARRATION.to_string(),
            stage_narration: None,
            signals_tx,
            signals_rx,
            outbox: Vec::new(),
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Running
    }

    /// Derived from the step counter on every read.
    pub fn phase(&self) -> ConnectionPhase {
        if self.started {
            phase_for_step(self.step)
        } else {
            ConnectionPhase::Idle
        }
    }

    pub fn current_event(&self) -> Option<&PacketEvent> {
        self.in_flight.as_ref().and_then(|f| f.event.as_ref())
    }

    pub fn current_stage(&self) -> Option<Stage> {
        self.in_flight.as_ref().and_then(|f| f.stage)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_event_kind(&self) -> Option<PacketKind> {
        self.last_event_kind
    }

    pub fn narration(&self) -> &str {
        &self.narration
    }

    pub fn stage_narration(&self) -> Option<&'static str> {
        self.stage_narration
    }

    pub fn speed(&self) -> Speed {
        *self.speed.borrow()
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        let event = self.current_event().cloned();
        let stage = self.current_stage();
        let placement = match (&event, stage) {
            (Some(event), Some(stage)) => Some(layout::placement(stage, event.origin)),
            _ => None,
        };
        let phase = self.phase();
        SequencerSnapshot {
            phase,
            phase_caption: phase.caption().to_string(),
            step: self.step,
            total_steps: TOTAL_STEPS,
            play_state: self.play_state,
            visible_layers: stage.map(layout::visible_layers).unwrap_or_default(),
            event,
            stage,
            placement,
            narration: self.narration.clone(),
            stage_narration: self.stage_narration.map(str::to_string),
            speed: self.speed().value(),
        }
    }

    /// Layer and packet reference with the kind currently on the wire marked.
    pub fn overview(&self) -> ProtocolOverview {
        protocol_overview(self.current_event().map(|e| e.kind))
    }

    /// Notifications produced since the last call, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    pub fn toggle_play(&mut self) {
        self.tracking_phase(|seq| match seq.play_state {
            PlayState::Complete => seq.reset_inner(),
            PlayState::Running => {
                // The packet on the wire still arrives; only a single-shot run
                // moves the step afterwards.
                info!(step = seq.step, "pausing");
                seq.play_state = PlayState::Paused;
            }
            PlayState::Idle | PlayState::Paused => {
                if seq.step >= TOTAL_STEPS {
                    seq.reset_inner();
                    return;
                }
                info!(step = seq.step, "playing");
                seq.play_state = PlayState::Running;
                if seq.in_flight.is_none() {
                    seq.start_step(false);
                }
            }
        });
    }

    pub fn step_forward(&mut self) {
        if self.step >= TOTAL_STEPS {
            debug!("step forward ignored; exchange complete");
            return;
        }
        self.tracking_phase(|seq| {
            if seq.play_state == PlayState::Idle {
                seq.play_state = PlayState::Paused;
            }
            match seq.in_flight.take() {
                Some(in_flight) => {
                    debug!(step = seq.step, "fast-resolving transition");
                    seq.finish_transition(in_flight, true);
                }
                None => seq.start_step(true),
            }
        });
    }

    pub fn reset(&mut self) {
        self.tracking_phase(Self::reset_inner);
    }

    /// Applies to stages that have not started yet.
    pub fn set_speed(&mut self, value: f64) -> Result<Speed, VisualizerError> {
        match self.settings.speed_range.admit(value) {
            Ok(speed) => {
                self.speed.send_replace(speed);
                debug!(speed = speed.value(), "speed changed");
                self.outbox.push(Notification::SpeedChanged {
                    speed: speed.value(),
                });
                Ok(speed)
            }
            Err(err) => {
                warn!("rejected speed change: {err}");
                Err(err)
            }
        }
    }

    /// Waits for the next driver report, pending forever when nothing is in flight.
    pub async fn next_signal(&mut self) -> Option<DriverSignal> {
        self.signals_rx.recv().await
    }

    /// Applies the next driver report. Returns `false` once nothing is in flight.
    pub async fn pump(&mut self) -> bool {
        if self.in_flight.is_none() {
            return false;
        }
        match self.next_signal().await {
            Some(signal) => {
                self.apply_signal(signal);
                true
            }
            None => false,
        }
    }

    pub fn apply_signal(&mut self, signal: DriverSignal) {
        self.tracking_phase(|seq| seq.apply_signal_inner(signal));
    }

    fn apply_signal_inner(&mut self, signal: DriverSignal) {
        let current = self.in_flight.as_ref().map(|f| f.handle.token());
        if current != Some(signal.token()) {
            debug!(token = signal.token().0, "ignoring stale driver signal");
            return;
        }

        match signal {
            DriverSignal::Stage { stage, .. } => {
                let text = narration_for_stage(stage, StageDirection::for_stage(stage));
                if let Some(in_flight) = self.in_flight.as_mut() {
                    in_flight.stage = Some(stage);
                }
                self.stage_narration = Some(text);
                debug!(step = self.step, stage = stage.index(), "{text}");
                self.outbox.push(Notification::StageChanged {
                    stage,
                    narration: text.to_string(),
                });
            }
            DriverSignal::Complete { .. } => {
                if let Some(in_flight) = self.in_flight.take() {
                    self.finish_transition(in_flight, false);
                }
            }
        }
    }

    fn tracking_phase<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.phase();
        let result = f(self);
        let after = self.phase();
        if before != after {
            info!(?before, ?after, "connection phase changed");
            self.outbox.push(Notification::PhaseChanged { phase: after });
        }
        result
    }

    fn reset_inner(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
        self.play_state = PlayState::Idle;
        self.started = false;
        self.last_event_kind = None;
        self.stage_narration = None;
        self.set_step(0);
        self.set_narration(IDLE_NARRATION.to_string());
        info!("sequencer reset");
    }

    fn next_token(&mut self) -> TransitionToken {
        self.last_token = self.last_token.next();
        self.last_token
    }

    fn set_step(&mut self, step: usize) {
        if self.step != step {
            self.step = step;
            self.outbox.push(Notification::StepChanged { step });
        }
    }

    fn set_narration(&mut self, text: String) {
        if self.narration != text {
            self.outbox.push(Notification::Narration { text: text.clone() });
            self.narration = text;
        }
    }

    /// Starts work for the current step, walking past packet-less steps as the
    /// empty-step policy allows.
    fn start_step(&mut self, advance_on_complete: bool) {
        loop {
            if self.step >= TOTAL_STEPS {
                self.complete();
                return;
            }
            self.started = true;

            let narration = match narration_for_step(Some(self.step)) {
                Ok(text) => text.into_owned(),
                Err(err) => {
                    error!("no narration for current step: {err}");
                    self.play_state = PlayState::Paused;
                    return;
                }
            };
            self.set_narration(narration);
            self.stage_narration = None;

            let event = match event_for_step(self.step, self.settings.catalog_revision) {
                Ok(event) => event,
                Err(err) => {
                    error!("no catalog entry for current step: {err}");
                    self.play_state = PlayState::Paused;
                    return;
                }
            };

            match event {
                Some(event) => {
                    self.begin_transition(event, advance_on_complete);
                    return;
                }
                None => match self.settings.empty_step_policy {
                    EmptyStepPolicy::Dwell => {
                        let token = self.next_token();
                        debug!(step = self.step, token = token.0, "dwelling on empty step");
                        let handle =
                            self.driver
                                .dwell(token, self.speed.subscribe(), self.signals_tx.clone());
                        self.in_flight = Some(InFlight {
                            handle,
                            event: None,
                            stage: None,
                            advance_on_complete,
                        });
                        return;
                    }
                    EmptyStepPolicy::Immediate => {
                        debug!(step = self.step, "no packet for step");
                        self.set_step(self.step + 1);
                        if self.step >= TOTAL_STEPS {
                            self.complete();
                            return;
                        }
                        if !self.is_playing() {
                            return;
                        }
                    }
                },
            }
        }
    }

    fn begin_transition(&mut self, event: PacketEvent, advance_on_complete: bool) {
        let token = self.next_token();
        info!(
            step = self.step,
            token = token.0,
            kind = %event.kind,
            origin = %event.origin,
            "transition started"
        );
        self.outbox.push(Notification::TransitionStarted {
            step: self.step,
            event: event.clone(),
        });

        let handle = self
            .driver
            .begin(token, self.speed.subscribe(), self.signals_tx.clone());
        self.in_flight = Some(InFlight {
            handle,
            event: Some(event),
            stage: None,
            advance_on_complete,
        });

        // Stage 0 is already queued; apply it before returning.
        while let Ok(signal) = self.signals_rx.try_recv() {
            self.apply_signal_inner(signal);
        }
    }

    fn finish_transition(&mut self, in_flight: InFlight, fast_resolved: bool) {
        let InFlight {
            handle,
            event,
            advance_on_complete,
            ..
        } = in_flight;
        handle.abort();
        self.stage_narration = None;

        if let Some(event) = event {
            info!(step = self.step, kind = %event.kind, fast_resolved, "transition finished");
            self.last_event_kind = Some(event.kind);
            self.outbox.push(Notification::TransitionFinished {
                step: self.step,
                kind: event.kind,
            });
        }

        if !(fast_resolved || advance_on_complete || self.is_playing()) {
            return;
        }

        self.set_step(self.step + 1);
        if self.step >= TOTAL_STEPS {
            self.complete();
        } else if self.is_playing() {
            self.start_step(false);
        }
    }

    fn complete(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
        self.play_state = PlayState::Complete;
        self.stage_narration = None;
        self.set_narration(COMPLETE_NARRATION.to_string());
        info!("exchange complete");
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
