//! Fixed I/O pins around the die edge.

use crate::netlist::{Bit, PortDirection};
use sasic_common::{NetBit, PinId, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Die edge a pin sits on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Side {
    /// West edge, `x = 0`.
    W,
    /// South edge, `y = 0`.
    S,
    /// East edge.
    E,
    /// North edge.
    N,
    /// Not on a recognized edge.
    Unknown,
}

impl Side {
    /// Parses `north`/`n` style names, ignoring case.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "west" => Side::W,
            "s" | "south" => Side::S,
            "e" | "east" => Side::E,
            "n" | "north" => Side::N,
            _ => Side::Unknown,
        }
    }

    /// Ordering rank used for deterministic pin walks: W, S, E, N, then unknown.
    pub fn rank(self) -> u8 {
        match self {
            Side::W => 0,
            Side::S => 1,
            Side::E => 2,
            Side::N => 3,
            Side::Unknown => 4,
        }
    }

    /// Returns `true` for edges that run horizontally.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::S | Side::N)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::W => "west",
            Side::S => "south",
            Side::E => "east",
            Side::N => "north",
            Side::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The top-level port bit a pin carries after assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinBinding {
    /// Port name.
    pub port: String,
    /// Bit index within the port, LSB = 0.
    pub bit: usize,
    /// The netlist bit carried by that port bit.
    pub net: Bit,
}

/// One fixed I/O terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pin {
    /// Arena index.
    pub id: PinId,
    /// Pin name.
    pub name: String,
    /// Die edge.
    pub side: Side,
    /// Metal layer.
    pub layer: String,
    /// Location in database units.
    pub pos: Point,
    /// Declared direction.
    pub direction: PortDirection,
    /// Routing track index along the edge.
    pub track_idx: i64,
    /// Assigned port bit, once bound.
    pub binding: Option<PinBinding>,
}

impl Pin {
    /// Returns `true` if a port bit has been bound here.
    pub fn is_assigned(&self) -> bool {
        self.binding.is_some()
    }

    /// The bound net, if the binding is to a net rather than a constant.
    pub fn bound_net(&self) -> Option<NetBit> {
        self.binding.as_ref().and_then(|b| b.net.net())
    }

    /// Deterministic physical walk key: side, position along the side,
    /// position across it, then track.
    pub fn physical_key(&self) -> (u8, i64, i64, i64) {
        let (primary, secondary) = if self.side.is_horizontal() {
            (self.pos.x, self.pos.y)
        } else {
            (self.pos.y, self.pos.x)
        };
        (self.side.rank(), primary, secondary, self.track_idx)
    }
}

/// All pins of a die.
#[derive(Debug, Clone, Default)]
pub struct PinTable {
    pins: Vec<Pin>,
}

impl PinTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unbound pin and returns its ID.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        side: Side,
        layer: impl Into<String>,
        pos: Point,
        direction: PortDirection,
        track_idx: i64,
    ) -> PinId {
        let id = PinId::from_raw(self.pins.len() as u32);
        self.pins.push(Pin {
            id,
            name: name.into(),
            side,
            layer: layer.into(),
            pos,
            direction,
            track_idx,
            binding: None,
        });
        id
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        &self.pins[id.index()]
    }

    /// All pins in ID order.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Number of pins.
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Returns `true` if there are no pins.
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Binds a port bit to a pin, replacing any earlier binding.
    pub fn bind(&mut self, id: PinId, binding: PinBinding) {
        self.pins[id.index()].binding = Some(binding);
    }

    /// Drops every binding.
    pub fn clear_bindings(&mut self) {
        for pin in &mut self.pins {
            pin.binding = None;
        }
    }

    /// Pins bound to a net, as `(net, location)` pairs in pin order.
    pub fn bound_nets(&self) -> impl Iterator<Item = (NetBit, Point)> + '_ {
        self.pins
            .iter()
            .filter_map(|p| p.bound_net().map(|net| (net, p.pos)))
    }

    /// The first pin bound to `port`.
    pub fn pin_for_port(&self, port: &str) -> Option<&Pin> {
        self.pins
            .iter()
            .find(|p| p.binding.as_ref().is_some_and(|b| b.port == port))
    }
}
