//! Where a packet sits on screen for a given stage, and which layer borders wrap it.

use serde::{Deserialize, Serialize};

use crate::domain::{Endpoint, Layer, Stage};

const CLIENT_X_PERCENT: u8 = 20;
const SERVER_X_PERCENT: u8 = 80;
const TRANSIT_X_PERCENT: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Origin,
    Midpoint,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub side: Side,
    /// Horizontal position as a percentage of the stage width.
    pub x_percent: u8,
    /// Row within the layer stack, 0 at the application layer.
    pub depth: u8,
}

fn endpoint_x(endpoint: Endpoint) -> u8 {
    match endpoint {
        Endpoint::Client => CLIENT_X_PERCENT,
        Endpoint::Server => SERVER_X_PERCENT,
    }
}

pub fn placement(stage: Stage, origin: Endpoint) -> Placement {
    let index = stage.index();
    match index {
        0..=3 => Placement {
            side: Side::Origin,
            x_percent: endpoint_x(origin),
            depth: index,
        },
        4 => Placement {
            side: Side::Midpoint,
            x_percent: TRANSIT_X_PERCENT,
            depth: 3,
        },
        _ => Placement {
            side: Side::Destination,
            x_percent: endpoint_x(origin.peer()),
            depth: 8 - index,
        },
    }
}

/// Header layers wrapping the payload at `stage`, outermost last.
///
/// Layer `k` (transport = 1 .. network interface = 3) is visible for stages
/// `k..=8-k`.
pub fn visible_layers(stage: Stage) -> Vec<Layer> {
    let index = stage.index();
    Layer::STACK
        .iter()
        .copied()
        .filter(|layer| {
            let k = layer.depth() as u8;
            k > 0 && index >= k && index <= 8 - k
        })
        .collect()
}
