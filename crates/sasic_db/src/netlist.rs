//! The logical netlist arena.
//!
//! Cells live in a `Vec` addressed by [`CellId`] with a name index beside
//! it. All mutation goes through explicit methods ([`Netlist::add_cell`],
//! [`Netlist::redirect_port`], [`Netlist::alloc_net`]) so the name index and
//! the next free net bit never drift from the arena. Cells are never removed.

use sasic_common::{CellId, NetBit};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// A constant driver value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ConstBit {
    /// Logic 0.
    Zero,
    /// Logic 1.
    One,
    /// Unknown.
    X,
    /// High impedance.
    Z,
}

impl ConstBit {
    /// The single-character netlist spelling (`0`, `1`, `x`, `z`).
    pub fn as_char(self) -> char {
        match self {
            ConstBit::Zero => '0',
            ConstBit::One => '1',
            ConstBit::X => 'x',
            ConstBit::Z => 'z',
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "0" => Some(ConstBit::Zero),
            "1" => Some(ConstBit::One),
            "x" | "X" => Some(ConstBit::X),
            "z" | "Z" => Some(ConstBit::Z),
            _ => None,
        }
    }
}

/// One bit of a connection: either a net or a constant.
///
/// Serialized the way synthesized JSON netlists spell bits: an integer for a
/// net, a one-character string for a constant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Bit {
    /// A single-bit net.
    Net(NetBit),
    /// A constant value.
    Const(ConstBit),
}

impl Bit {
    /// The net, if this bit is not a constant.
    pub fn net(self) -> Option<NetBit> {
        match self {
            Bit::Net(n) => Some(n),
            Bit::Const(_) => None,
        }
    }
}

impl From<NetBit> for Bit {
    fn from(net: NetBit) -> Self {
        Bit::Net(net)
    }
}

impl Serialize for Bit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bit::Net(n) => serializer.serialize_u32(n.as_raw()),
            Bit::Const(c) => serializer.serialize_str(&c.as_char().to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Bit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BitVisitor;

        impl Visitor<'_> for BitVisitor {
            type Value = Bit;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a net number or one of \"0\", \"1\", \"x\", \"z\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Bit, E> {
                u32::try_from(v)
                    .map(|raw| Bit::Net(NetBit::from_raw(raw)))
                    .map_err(|_| E::custom(format!("net number {v} out of range")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Bit, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(format!("negative net number {v}")))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Bit, E> {
                ConstBit::parse(v)
                    .map(Bit::Const)
                    .ok_or_else(|| E::custom(format!("unknown constant bit '{v}'")))
            }
        }

        deserializer.deserialize_any(BitVisitor)
    }
}

/// Direction of a cell port or top-level port.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Signal flows into the cell or module.
    Input,
    /// Signal flows out of the cell or module.
    Output,
    /// Bidirectional.
    Inout,
}

impl PortDirection {
    /// Parses a direction name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "input" | "in" => Some(PortDirection::Input),
            "output" | "out" => Some(PortDirection::Output),
            "inout" => Some(PortDirection::Inout),
            _ => None,
        }
    }

    /// Lowercase keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
            PortDirection::Inout => "inout",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A top-level module port.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    /// Port name.
    pub name: String,
    /// Declared direction.
    pub direction: PortDirection,
    /// Bits, LSB first.
    pub bits: Vec<Bit>,
}

/// A named group of bits (a wire or bus), LSB first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetName {
    /// Bits, LSB first.
    pub bits: Vec<Bit>,
    /// Tool-generated name that should lose to any user-visible name.
    pub hide_name: bool,
    /// Free-form attributes carried through from the input netlist.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl NetName {
    /// A visible single-bit name.
    pub fn single(net: NetBit) -> Self {
        Self {
            bits: vec![Bit::Net(net)],
            hide_name: false,
            attributes: BTreeMap::new(),
        }
    }
}

/// A logical cell instance.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCell {
    /// Arena index, assigned by [`Netlist::add_cell`].
    pub id: CellId,
    /// Instance name.
    pub name: String,
    /// Standard-cell type.
    pub cell_type: String,
    /// Port name to connected bits, LSB first.
    pub connections: BTreeMap<String, Vec<Bit>>,
    /// Port name to direction.
    pub port_directions: BTreeMap<String, PortDirection>,
    /// Free-form attributes.
    pub attributes: BTreeMap<String, serde_json::Value>,
    /// Cell parameters.
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl LogicalCell {
    /// A cell with no connections.
    pub fn new(name: impl Into<String>, cell_type: impl Into<String>) -> Self {
        Self {
            id: CellId::from_raw(0),
            name: name.into(),
            cell_type: cell_type.into(),
            connections: BTreeMap::new(),
            port_directions: BTreeMap::new(),
            attributes: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Adds a port connection with its direction.
    pub fn with_port(
        mut self,
        port: impl Into<String>,
        direction: PortDirection,
        bits: Vec<Bit>,
    ) -> Self {
        let port = port.into();
        self.port_directions.insert(port.clone(), direction);
        self.connections.insert(port, bits);
        self
    }

    /// Adds a string attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Direction of `port`, if declared.
    pub fn direction(&self, port: &str) -> Option<PortDirection> {
        self.port_directions.get(port).copied()
    }

    /// Nets on ports declared with `direction`.
    pub fn nets_with_direction(&self, direction: PortDirection) -> impl Iterator<Item = NetBit> + '_ {
        self.connections
            .iter()
            .filter(move |(port, _)| self.direction(port) == Some(direction))
            .flat_map(|(_, bits)| bits.iter().filter_map(|b| b.net()))
    }

    /// Every net this cell touches, on any port.
    pub fn nets(&self) -> impl Iterator<Item = NetBit> + '_ {
        self.connections
            .values()
            .flat_map(|bits| bits.iter().filter_map(|b| b.net()))
    }

    /// The `physical_name` attribute, if set.
    pub fn physical_name(&self) -> Option<&str> {
        self.attributes.get("physical_name").and_then(|v| v.as_str())
    }
}

/// Errors from netlist mutation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NetlistError {
    /// A cell with this name already exists.
    #[error("duplicate cell name '{0}'")]
    DuplicateCell(String),
    /// A net name with this name already exists.
    #[error("duplicate net name '{0}'")]
    DuplicateNetName(String),
    /// A top-level port with this name already exists.
    #[error("duplicate port name '{0}'")]
    DuplicatePort(String),
    /// The cell has no such port.
    #[error("cell '{cell}' has no port '{port}'")]
    UnknownPort {
        /// Cell name.
        cell: String,
        /// Port name.
        port: String,
    },
}

/// The netlist of one module.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    /// Module name.
    pub module_name: String,
    /// Module attributes carried through from the input.
    pub attributes: BTreeMap<String, serde_json::Value>,
    ports: Vec<Port>,
    cells: Vec<LogicalCell>,
    net_names: BTreeMap<String, NetName>,
    cell_by_name: HashMap<String, CellId>,
    next_bit: u32,
}

impl Netlist {
    /// An empty module.
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            next_bit: 2,
            ..Self::default()
        }
    }

    fn note_bits(&mut self, bits: &[Bit]) {
        for net in bits.iter().filter_map(|b| b.net()) {
            self.next_bit = self.next_bit.max(net.as_raw() + 1);
        }
    }

    /// Adds a top-level port.
    pub fn add_port(&mut self, port: Port) -> Result<(), NetlistError> {
        if self.ports.iter().any(|p| p.name == port.name) {
            return Err(NetlistError::DuplicatePort(port.name));
        }
        self.note_bits(&port.bits);
        self.ports.push(port);
        Ok(())
    }

    /// Adds a cell and returns its ID.
    pub fn add_cell(&mut self, mut cell: LogicalCell) -> Result<CellId, NetlistError> {
        if self.cell_by_name.contains_key(&cell.name) {
            return Err(NetlistError::DuplicateCell(cell.name));
        }
        let id = CellId::from_raw(self.cells.len() as u32);
        cell.id = id;
        let bits: Vec<Bit> = cell.connections.values().flatten().copied().collect();
        self.note_bits(&bits);
        self.cell_by_name.insert(cell.name.clone(), id);
        self.cells.push(cell);
        Ok(id)
    }

    /// Adds a net name.
    pub fn add_net_name(&mut self, name: impl Into<String>, net: NetName) -> Result<(), NetlistError> {
        let name = name.into();
        if self.net_names.contains_key(&name) {
            return Err(NetlistError::DuplicateNetName(name));
        }
        self.note_bits(&net.bits);
        self.net_names.insert(name, net);
        Ok(())
    }

    /// The bit the next [`alloc_net`](Self::alloc_net) call will hand out.
    pub fn next_net(&self) -> NetBit {
        NetBit::from_raw(self.next_bit)
    }

    /// Allocates a fresh single-bit net one above every bit in use and names it.
    pub fn alloc_net(&mut self, name: impl Into<String>) -> Result<NetBit, NetlistError> {
        let name = name.into();
        if self.net_names.contains_key(&name) {
            return Err(NetlistError::DuplicateNetName(name));
        }
        let net = NetBit::from_raw(self.next_bit);
        self.next_bit += 1;
        self.net_names.insert(name, NetName::single(net));
        Ok(net)
    }

    /// Reconnects `port` of `cell` to `bits`, returning the previous bits.
    pub fn redirect_port(
        &mut self,
        cell: CellId,
        port: &str,
        bits: Vec<Bit>,
    ) -> Result<Vec<Bit>, NetlistError> {
        self.note_bits(&bits);
        let c = &mut self.cells[cell.index()];
        match c.connections.get_mut(port) {
            Some(slot) => Ok(std::mem::replace(slot, bits)),
            None => Err(NetlistError::UnknownPort {
                cell: c.name.clone(),
                port: port.to_string(),
            }),
        }
    }

    /// Sets an attribute on a cell.
    pub fn set_attribute(&mut self, cell: CellId, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.cells[cell.index()]
            .attributes
            .insert(key.into(), value.into());
    }

    /// Returns the cell with the given ID.
    pub fn cell(&self, id: CellId) -> &LogicalCell {
        &self.cells[id.index()]
    }

    /// Looks up a cell ID by instance name.
    pub fn cell_id(&self, name: &str) -> Option<CellId> {
        self.cell_by_name.get(name).copied()
    }

    /// Looks up a cell by instance name.
    pub fn cell_by_name(&self, name: &str) -> Option<&LogicalCell> {
        self.cell_id(name).map(|id| self.cell(id))
    }

    /// All cells in ID order.
    pub fn cells(&self) -> &[LogicalCell] {
        &self.cells
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Top-level ports in declaration order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Looks up a top-level port.
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Net names, sorted.
    pub fn net_names(&self) -> &BTreeMap<String, NetName> {
        &self.net_names
    }

    /// The single net carried by a one-bit net name.
    pub fn net_by_name(&self, name: &str) -> Option<NetBit> {
        let net = self.net_names.get(name)?;
        match net.bits.as_slice() {
            [Bit::Net(n)] => Some(*n),
            _ => None,
        }
    }

    /// The highest net bit in use.
    pub fn max_net_bit(&self) -> Option<NetBit> {
        self.all_net_bits().into_iter().next_back()
    }

    /// Every net bit referenced by a port, cell or net name.
    pub fn all_net_bits(&self) -> BTreeSet<NetBit> {
        let ports = self.ports.iter().flat_map(|p| p.bits.iter());
        let cells = self.cells.iter().flat_map(|c| c.connections.values().flatten());
        let names = self.net_names.values().flat_map(|n| n.bits.iter());
        ports
            .chain(cells)
            .chain(names)
            .filter_map(|b| b.net())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(raw: u32) -> Bit {
        Bit::Net(NetBit::from_raw(raw))
    }

    fn inverter(name: &str, a: u32, y: u32) -> LogicalCell {
        LogicalCell::new(name, "sky130_fd_sc_hd__inv_1")
            .with_port("A", PortDirection::Input, vec![n(a)])
            .with_port("Y", PortDirection::Output, vec![n(y)])
    }

    #[test]
    fn bit_serde_matches_netlist_spelling() {
        let bits: Vec<Bit> = serde_json::from_str(r#"[2, "0", "1", "x", 17]"#).unwrap();
        assert_eq!(
            bits,
            vec![
                n(2),
                Bit::Const(ConstBit::Zero),
                Bit::Const(ConstBit::One),
                Bit::Const(ConstBit::X),
                n(17)
            ]
        );
        assert_eq!(serde_json::to_string(&bits).unwrap(), r#"[2,"0","1","x",17]"#);
    }

    #[test]
    fn bad_bit_rejected() {
        assert!(serde_json::from_str::<Bit>("\"q\"").is_err());
        assert!(serde_json::from_str::<Bit>("-3").is_err());
    }

    #[test]
    fn direction_parse() {
        assert_eq!(PortDirection::parse("INPUT"), Some(PortDirection::Input));
        assert_eq!(PortDirection::parse(" output"), Some(PortDirection::Output));
        assert_eq!(PortDirection::parse("sideways"), None);
    }

    #[test]
    fn add_cell_assigns_ids_and_rejects_duplicates() {
        let mut nl = Netlist::new("top");
        let a = nl.add_cell(inverter("u1", 2, 3)).unwrap();
        let b = nl.add_cell(inverter("u2", 3, 4)).unwrap();
        assert_eq!(a.as_raw(), 0);
        assert_eq!(b.as_raw(), 1);
        assert_eq!(nl.cell_id("u2"), Some(b));
        assert_eq!(
            nl.add_cell(inverter("u1", 5, 6)),
            Err(NetlistError::DuplicateCell("u1".into()))
        );
    }

    #[test]
    fn alloc_net_goes_above_every_bit() {
        let mut nl = Netlist::new("top");
        nl.add_cell(inverter("u1", 2, 40)).unwrap();
        let fresh = nl.alloc_net("cts_net").unwrap();
        assert_eq!(fresh.as_raw(), 41);
        assert_eq!(nl.net_by_name("cts_net"), Some(fresh));
        assert_eq!(nl.alloc_net("second").unwrap().as_raw(), 42);
        assert_eq!(nl.max_net_bit(), Some(NetBit::from_raw(42)));
        assert!(nl.alloc_net("second").is_err());
    }

    #[test]
    fn redirect_port_returns_old_bits() {
        let mut nl = Netlist::new("top");
        let id = nl.add_cell(inverter("u1", 2, 3)).unwrap();
        let old = nl.redirect_port(id, "A", vec![n(9)]).unwrap();
        assert_eq!(old, vec![n(2)]);
        assert_eq!(nl.cell(id).connections["A"], vec![n(9)]);
        assert!(matches!(
            nl.redirect_port(id, "CLK", vec![n(9)]),
            Err(NetlistError::UnknownPort { .. })
        ));
    }

    #[test]
    fn cell_net_queries() {
        let cell = inverter("u1", 2, 3);
        let ins: Vec<_> = cell.nets_with_direction(PortDirection::Input).collect();
        let outs: Vec<_> = cell.nets_with_direction(PortDirection::Output).collect();
        assert_eq!(ins, vec![NetBit::from_raw(2)]);
        assert_eq!(outs, vec![NetBit::from_raw(3)]);
        assert_eq!(cell.nets().count(), 2);
    }

    #[test]
    fn constants_are_not_nets() {
        let cell = LogicalCell::new("c", "t").with_port(
            "A",
            PortDirection::Input,
            vec![Bit::Const(ConstBit::One), n(5)],
        );
        assert_eq!(cell.nets().collect::<Vec<_>>(), vec![NetBit::from_raw(5)]);
    }

    #[test]
    fn physical_name_attribute() {
        let cell = inverter("u", 2, 3).with_attribute("physical_name", "T0__INV_0");
        assert_eq!(cell.physical_name(), Some("T0__INV_0"));
    }

    #[test]
    fn duplicate_port_rejected() {
        let mut nl = Netlist::new("top");
        let port = Port {
            name: "clk".into(),
            direction: PortDirection::Input,
            bits: vec![n(2)],
        };
        nl.add_port(port.clone()).unwrap();
        assert!(nl.add_port(port).is_err());
    }
}
