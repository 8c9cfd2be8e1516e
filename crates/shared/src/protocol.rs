use serde::{Deserialize, Serialize};

use crate::{
    domain::{ConnectionPhase, Layer, PacketEvent, PacketKind, Stage},
    error::ApiError,
    layout::Placement,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    #[default]
    Idle,
    Running,
    Paused,
    Complete,
}

/// Intents accepted from the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Command {
    TogglePlay,
    StepForward,
    Reset,
    SetSpeed { value: f64 },
    Shutdown,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::TogglePlay => "toggle_play",
            Command::StepForward => "step_forward",
            Command::Reset => "reset",
            Command::SetSpeed { .. } => "set_speed",
            Command::Shutdown => "shutdown",
        }
    }
}

/// Everything a renderer needs to paint one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerSnapshot {
    pub phase: ConnectionPhase,
    pub phase_caption: String,
    pub step: usize,
    pub total_steps: usize,
    pub play_state: PlayState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<PacketEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visible_layers: Vec<Layer>,
    pub narration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_narration: Option<String>,
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    TransitionStarted {
        step: usize,
        event: PacketEvent,
    },
    StageChanged {
        stage: Stage,
        narration: String,
    },
    TransitionFinished {
        step: usize,
        kind: PacketKind,
    },
    StepChanged {
        step: usize,
    },
    PhaseChanged {
        phase: ConnectionPhase,
    },
    Narration {
        text: String,
    },
    SpeedChanged {
        speed: f64,
    },
    Rejected(ApiError),
    Snapshot(SequencerSnapshot),
}
