//! Reference material shown alongside the animation: the TCP/IP layer model and
//! the packet kinds that appear in the exchange.

use serde::Serialize;
use shared::domain::{Layer, PacketKind};

pub const PROTOCOL_SUMMARY: &str =
    "The Transmission Control Protocol/Internet Protocol (TCP/IP) is the basic \
     communication language of the Internet.";

/// The three processes the exchange walks through, with a one-line gloss each.
pub const PROCESSES: [(&str, &str); 3] = [
    ("Three-way Handshake", "Establishes a connection"),
    ("Data Transfer", "Sends data packets between client and server"),
    ("Connection Termination", "Closes the connection"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerEntry {
    pub layer: Layer,
    pub name: &'static str,
    pub role: &'static str,
    pub header: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketKindEntry {
    pub kind: PacketKind,
    pub description: &'static str,
    pub color: &'static str,
    /// Set for the kind of the packet currently on the wire.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolOverview {
    pub summary: &'static str,
    pub processes: Vec<Process>,
    pub layers: Vec<LayerEntry>,
    pub packet_kinds: Vec<PacketKindEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn protocol_overview(active: Option<PacketKind>) -> ProtocolOverview {
    ProtocolOverview {
        summary: PROTOCOL_SUMMARY,
        processes: PROCESSES
            .iter()
            .map(|&(name, description)| Process { name, description })
            .collect(),
        layers: Layer::STACK
            .iter()
            .map(|&layer| LayerEntry {
                layer,
                name: layer.name(),
                role: layer.role(),
                header: layer.header(),
                color: layer.color(),
            })
            .collect(),
        packet_kinds: PacketKind::ALL
            .iter()
            .map(|&kind| PacketKindEntry {
                kind,
                description: kind.description(),
                color: kind.color(),
                active: active == Some(kind),
            })
            .collect(),
    }
}
