use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VisualizerError;

/// Number of logical steps in the canonical exchange.
pub const TOTAL_STEPS: usize = 14;
/// Steps `0..HANDSHAKE_STEPS` are the three-way handshake.
pub const HANDSHAKE_STEPS: usize = 3;
/// The last `TERMINATION_STEPS` steps tear the connection down.
pub const TERMINATION_STEPS: usize = 4;
/// First step of the termination range.
pub const TERMINATION_START: usize = TOTAL_STEPS - TERMINATION_STEPS;
/// Number of discrete positions along a packet's path.
pub const STAGE_COUNT: u8 = 9;

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub $inner);
    };
}

id_newtype!(EventId, Uuid);
id_newtype!(TransitionToken, u64);

impl EventId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl TransitionToken {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Client,
    Server,
}

impl Endpoint {
    pub fn peer(self) -> Self {
        match self {
            Endpoint::Client => Endpoint::Server,
            Endpoint::Server => Endpoint::Client,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Client => "Client",
            Endpoint::Server => "Server",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum PacketKind {
    Syn,
    SynAck,
    Ack,
    Data,
    Fin,
    FinAck,
}

impl PacketKind {
    pub const ALL: [PacketKind; 6] = [
        PacketKind::Syn,
        PacketKind::SynAck,
        PacketKind::Ack,
        PacketKind::Data,
        PacketKind::Fin,
        PacketKind::FinAck,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PacketKind::Syn => "SYN",
            PacketKind::SynAck => "SYN-ACK",
            PacketKind::Ack => "ACK",
            PacketKind::Data => "DATA",
            PacketKind::Fin => "FIN",
            PacketKind::FinAck => "FIN-ACK",
        }
    }

    /// Category color as a CSS hex string.
    pub fn color(self) -> &'static str {
        match self {
            PacketKind::Syn => "#f97316",
            PacketKind::SynAck => "#8b5cf6",
            PacketKind::Ack => "#06b6d4",
            PacketKind::Data => "#22c55e",
            PacketKind::Fin => "#ef4444",
            PacketKind::FinAck => "#f59e0b",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PacketKind::Syn => "Synchronize: Initiates a connection",
            PacketKind::SynAck => "Synchronize-Acknowledge: Acknowledges SYN and sends SYN",
            PacketKind::Ack => "Acknowledge: Confirms receipt of packets",
            PacketKind::Data => "Data: Contains actual information being transferred",
            PacketKind::Fin => "Finish: Initiates connection termination",
            PacketKind::FinAck => "Finish-Acknowledge: Acknowledges FIN request",
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four layers of the TCP/IP stack, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Application,
    Transport,
    Internet,
    NetworkInterface,
}

impl Layer {
    pub const STACK: [Layer; 4] = [
        Layer::Application,
        Layer::Transport,
        Layer::Internet,
        Layer::NetworkInterface,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Layer::Application => "Application",
            Layer::Transport => "Transport",
            Layer::Internet => "Internet",
            Layer::NetworkInterface => "Network Interface",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Layer::Application => "#f97316",
            Layer::Transport => "#8b5cf6",
            Layer::Internet => "#06b6d4",
            Layer::NetworkInterface => "#22c55e",
        }
    }

    /// What the layer is responsible for, with its usual protocols.
    pub fn role(self) -> &'static str {
        match self {
            Layer::Application => "Interfaces with applications (HTTP, FTP, SMTP)",
            Layer::Transport => "Provides end-to-end communication (TCP, UDP)",
            Layer::Internet => "Handles packet routing (IP)",
            Layer::NetworkInterface => "Transmits data between devices (Ethernet, Wi-Fi)",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Layer::Application => "HTTP/FTP Header",
            Layer::Transport => "TCP Header",
            Layer::Internet => "IP Header",
            Layer::NetworkInterface => "Ethernet Frame",
        }
    }

    /// Position in the stack, 0 for the application layer.
    pub fn depth(self) -> usize {
        match self {
            Layer::Application => 0,
            Layer::Transport => 1,
            Layer::Internet => 2,
            Layer::NetworkInterface => 3,
        }
    }
}

/// Position of a packet along its path from origin to destination.
///
/// Stage 0 sits at the origin before any wrapping, stages 1-3 add a layer each,
/// stage 4 is the wire, stages 5-7 strip a layer each and stage 8 is fully
/// delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stage(u8);

impl Stage {
    pub const ORIGIN: Stage = Stage(0);
    pub const TRANSIT: Stage = Stage(4);
    pub const ARRIVED: Stage = Stage(STAGE_COUNT - 1);

    pub fn new(index: u8) -> Result<Self, VisualizerError> {
        if index < STAGE_COUNT {
            Ok(Self(index))
        } else {
            Err(VisualizerError::InvalidStage { stage: index })
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }

    pub fn all() -> impl Iterator<Item = Stage> {
        (0..STAGE_COUNT).map(Stage)
    }

    /// The layer a packet is passing through at this stage, `None` on the wire.
    pub fn layer(self) -> Option<Layer> {
        match self.0 {
            0 | 8 => Some(Layer::Application),
            1 | 7 => Some(Layer::Transport),
            2 | 6 => Some(Layer::Internet),
            3 | 5 => Some(Layer::NetworkInterface),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = VisualizerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Stage::new(value)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a layer is wrapping (sender side) or unwrapping (receiver side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageDirection {
    Outbound,
    Inbound,
}

impl StageDirection {
    pub fn for_stage(stage: Stage) -> Self {
        if stage <= Stage::TRANSIT {
            StageDirection::Outbound
        } else {
            StageDirection::Inbound
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Idle,
    Handshake,
    DataTransfer,
    Termination,
    Complete,
}

impl ConnectionPhase {
    /// Status line shown next to the connection indicator.
    pub fn caption(self) -> &'static str {
        match self {
            ConnectionPhase::Idle => "Ready",
            ConnectionPhase::Handshake => "Establishing Connection",
            ConnectionPhase::DataTransfer => "Transferring Data",
            ConnectionPhase::Termination => "Terminating Connection",
            ConnectionPhase::Complete => "Connection Closed",
        }
    }
}

/// Phase of the exchange once a step has begun. Never returns `Idle`.
pub fn phase_for_step(step: usize) -> ConnectionPhase {
    if step < HANDSHAKE_STEPS {
        ConnectionPhase::Handshake
    } else if step < TERMINATION_START {
        ConnectionPhase::DataTransfer
    } else if step < TOTAL_STEPS {
        ConnectionPhase::Termination
    } else {
        ConnectionPhase::Complete
    }
}

pub fn is_data_step(step: usize) -> bool {
    (HANDSHAKE_STEPS..TERMINATION_START).contains(&step)
}

/// One protocol message travelling between the two endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketEvent {
    pub id: EventId,
    pub kind: PacketKind,
    pub origin: Endpoint,
    pub destination: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_label: Option<String>,
}

impl PacketEvent {
    pub fn new(kind: PacketKind, origin: Endpoint) -> Self {
        Self {
            id: EventId::fresh(),
            kind,
            origin,
            destination: origin.peer(),
            payload_label: None,
        }
    }

    pub fn data(origin: Endpoint, label: impl Into<String>) -> Self {
        Self {
            payload_label: Some(label.into()),
            ..Self::new(PacketKind::Data, origin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries_follow_step_ranges() {
        assert_eq!(phase_for_step(0), ConnectionPhase::Handshake);
        assert_eq!(phase_for_step(2), ConnectionPhase::Handshake);
        assert_eq!(phase_for_step(3), ConnectionPhase::DataTransfer);
        assert_eq!(
            phase_for_step(TERMINATION_START - 1),
            ConnectionPhase::DataTransfer
        );
        assert_eq!(
            phase_for_step(TERMINATION_START),
            ConnectionPhase::Termination
        );
        assert_eq!(
            phase_for_step(TOTAL_STEPS - 1),
            ConnectionPhase::Termination
        );
        assert_eq!(phase_for_step(TOTAL_STEPS), ConnectionPhase::Complete);
    }

    #[test]
    fn stage_rejects_out_of_range_index() {
        assert!(Stage::new(8).is_ok());
        assert!(matches!(
            Stage::new(9),
            Err(VisualizerError::InvalidStage { stage: 9 })
        ));
        assert_eq!(Stage::ARRIVED.next(), None);
    }

    #[test]
    fn stage_layers_mirror_around_transit() {
        for stage in Stage::all() {
            let mirrored = Stage::new(STAGE_COUNT - 1 - stage.index()).expect("stage");
            assert_eq!(stage.layer(), mirrored.layer());
        }
        assert_eq!(Stage::TRANSIT.layer(), None);
    }

    #[test]
    fn packet_event_destination_is_peer() {
        let event = PacketEvent::new(PacketKind::Syn, Endpoint::Client);
        assert_eq!(event.destination, Endpoint::Server);
        assert_ne!(
            event.id,
            PacketEvent::new(PacketKind::Syn, Endpoint::Client).id
        );
    }

    #[test]
    fn packet_kind_serializes_with_wire_names() {
        let json = serde_json::to_string(&PacketKind::SynAck).expect("serialize");
        assert_eq!(json, "\"SYN-ACK\"");
        let kind: PacketKind = serde_json::from_str("\"FIN-ACK\"").expect("deserialize");
        assert_eq!(kind, PacketKind::FinAck);
    }
}
