//! Which packet, if any, travels at each logical step.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{
        is_data_step, Endpoint, PacketEvent, PacketKind, HANDSHAKE_STEPS, TERMINATION_START,
        TOTAL_STEPS,
    },
    error::VisualizerError,
};

/// How data-transfer steps are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogRevision {
    /// Every data step carries a DATA packet.
    #[default]
    Strict,
    /// Only the last data step carries a packet; the others are narration only.
    Sparse,
}

impl FromStr for CatalogRevision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CatalogRevision::Strict),
            "sparse" => Ok(CatalogRevision::Sparse),
            other => Err(format!("unknown catalog revision '{other}'")),
        }
    }
}

impl fmt::Display for CatalogRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogRevision::Strict => f.write_str("strict"),
            CatalogRevision::Sparse => f.write_str("sparse"),
        }
    }
}

/// The identity-free shape of a step's packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub kind: PacketKind,
    pub origin: Endpoint,
    pub destination: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_label: Option<String>,
}

impl StepDescriptor {
    fn new(kind: PacketKind, origin: Endpoint) -> Self {
        Self {
            kind,
            origin,
            destination: origin.peer(),
            payload_label: None,
        }
    }

    fn instantiate(self) -> PacketEvent {
        let mut event = PacketEvent::new(self.kind, self.origin);
        event.payload_label = self.payload_label;
        event
    }
}

pub(crate) fn check_step(step: usize) -> Result<(), VisualizerError> {
    if step < TOTAL_STEPS {
        Ok(())
    } else {
        Err(VisualizerError::InvalidStep {
            step,
            total: TOTAL_STEPS,
        })
    }
}

/// 1-based position of a data step within the data-transfer range.
pub fn data_ordinal(step: usize) -> Option<usize> {
    is_data_step(step).then(|| step - HANDSHAKE_STEPS + 1)
}

/// Data packets alternate direction, the first one following the handshake ACK.
fn data_origin(step: usize) -> Endpoint {
    if (step - HANDSHAKE_STEPS) % 2 == 0 {
        Endpoint::Client
    } else {
        Endpoint::Server
    }
}

pub fn describe_step(
    step: usize,
    revision: CatalogRevision,
) -> Result<Option<StepDescriptor>, VisualizerError> {
    check_step(step)?;

    let descriptor = match step {
        0 => StepDescriptor::new(PacketKind::Syn, Endpoint::Client),
        1 => StepDescriptor::new(PacketKind::SynAck, Endpoint::Server),
        2 => StepDescriptor::new(PacketKind::Ack, Endpoint::Client),
        s if is_data_step(s) => {
            if revision == CatalogRevision::Sparse && s + 1 < TERMINATION_START {
                return Ok(None);
            }
            let mut descriptor = StepDescriptor::new(PacketKind::Data, data_origin(s));
            descriptor.payload_label = data_ordinal(s).map(|n| format!("Data Packet {n}"));
            descriptor
        }
        s => match s - TERMINATION_START {
            0 => StepDescriptor::new(PacketKind::Fin, Endpoint::Client),
            1 => StepDescriptor::new(PacketKind::Ack, Endpoint::Server),
            2 => StepDescriptor::new(PacketKind::Fin, Endpoint::Server),
            _ => StepDescriptor::new(PacketKind::Ack, Endpoint::Client),
        },
    };

    Ok(Some(descriptor))
}

/// Fresh packet for `step`, or `None` for a narration-only step.
pub fn event_for_step(
    step: usize,
    revision: CatalogRevision,
) -> Result<Option<PacketEvent>, VisualizerError> {
    Ok(describe_step(step, revision)?.map(StepDescriptor::instantiate))
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
