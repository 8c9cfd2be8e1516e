//! Human-readable text for steps and stages.

use std::borrow::Cow;

use shared::{
    domain::{Layer, Stage, StageDirection, TERMINATION_START},
    error::VisualizerError,
};

use crate::catalog::{check_step, data_ordinal};

pub const IDLE_NARRATION: &str = "Press play to watch a TCP connection open, carry data and close";
pub const COMPLETE_NARRATION: &str = "Connection terminated";
pub const TRANSIT_NARRATION: &str = "Transmitting data across the network";

const HANDSHAKE_NARRATION: [&str; 3] = [
    "Step 1: Client sends SYN packet to initiate connection",
    "Step 2: Server responds with SYN-ACK packet",
    "Step 3: Client sends ACK packet, completing the three-way handshake",
];

const TERMINATION_NARRATION: [&str; 4] = [
    "Step 11: Client initiates connection termination with FIN packet",
    "Step 12: Server acknowledges with ACK",
    "Step 13: Server sends its own FIN packet",
    "Step 14: Client acknowledges with final ACK",
];

/// Narration for a logical step; `None` means nothing has started yet.
pub fn narration_for_step(step: Option<usize>) -> Result<Cow<'static, str>, VisualizerError> {
    let Some(step) = step else {
        return Ok(Cow::Borrowed(IDLE_NARRATION));
    };
    check_step(step)?;

    if let Some(&text) = HANDSHAKE_NARRATION.get(step) {
        return Ok(Cow::Borrowed(text));
    }
    if let Some(ordinal) = data_ordinal(step) {
        return Ok(Cow::Owned(format!(
            "Step {}: Data packet {ordinal} being transferred",
            step + 1
        )));
    }
    Ok(Cow::Borrowed(TERMINATION_NARRATION[step - TERMINATION_START]))
}

fn layer_narration(layer: Layer, direction: StageDirection) -> &'static str {
    use StageDirection::{Inbound, Outbound};

    match (layer, direction) {
        (Layer::Application, Outbound) => "Application Layer: Creating data payload",
        (Layer::Application, Inbound) => "Application Layer: Consuming data payload",
        (Layer::Transport, Outbound) => {
            "Transport Layer: Adding TCP header (ports, sequence numbers)"
        }
        (Layer::Transport, Inbound) => {
            "Transport Layer: Removing TCP header (ports, sequence numbers)"
        }
        (Layer::Internet, Outbound) => "Internet Layer: Adding IP header (addresses, routing)",
        (Layer::Internet, Inbound) => "Internet Layer: Removing IP header (addresses, routing)",
        (Layer::NetworkInterface, Outbound) => {
            "Network Interface Layer: Adding Ethernet frame header (MAC addressing)"
        }
        (Layer::NetworkInterface, Inbound) => {
            "Network Interface Layer: Removing Ethernet frame header (MAC addressing)"
        }
    }
}

/// What the layer at `stage` is doing to the packet.
pub fn narration_for_stage(stage: Stage, direction: StageDirection) -> &'static str {
    match stage.layer() {
        Some(layer) => layer_narration(layer, direction),
        None => TRANSIT_NARRATION,
    }
}
