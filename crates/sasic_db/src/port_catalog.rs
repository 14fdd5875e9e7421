//! Port-direction lists per cell type.
//!
//! Unused fabric sites and clock buffers are instantiated without a logical
//! template, so their port lists are learned from the cells the netlist
//! already uses. A type the netlist never instantiates borrows the list of
//! another type in the same family (`nand2_1` from `nand2_4`), and failing
//! that, the input ports named in the leakage table.

use crate::leakage::LeakageTable;
use crate::netlist::{Netlist, PortDirection};
use crate::role::type_family;
use std::collections::BTreeMap;

/// Ordered port-name to direction list.
pub type PortList = BTreeMap<String, PortDirection>;

/// Known port lists keyed by cell type.
#[derive(Debug, Clone, Default)]
pub struct PortCatalog {
    by_type: BTreeMap<String, PortList>,
    from_leakage: BTreeMap<String, PortList>,
}

impl PortCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Learns port lists from every cell of `netlist` and any leakage vectors.
    pub fn from_sources(netlist: &Netlist, leakage: Option<&LeakageTable>) -> Self {
        let mut catalog = Self::new();
        for cell in netlist.cells() {
            if cell.port_directions.is_empty() {
                continue;
            }
            catalog
                .by_type
                .entry(cell.cell_type.clone())
                .or_insert_with(|| cell.port_directions.clone());
        }
        if let Some(leakage) = leakage {
            catalog.absorb_leakage(leakage);
        }
        catalog
    }

    fn absorb_leakage(&mut self, leakage: &LeakageTable) {
        for (cell_type, vector) in leakage.iter() {
            let ports = vector
                .keys()
                .map(|p| (p.clone(), PortDirection::Input))
                .collect();
            self.from_leakage.insert(cell_type.to_string(), ports);
        }
    }

    /// Registers a port list for a type, replacing any earlier one.
    pub fn insert(&mut self, cell_type: impl Into<String>, ports: PortList) {
        self.by_type.insert(cell_type.into(), ports);
    }

    /// The port list for `cell_type`, falling back to a same-family type.
    pub fn ports(&self, cell_type: &str) -> Option<&PortList> {
        if let Some(ports) = self.by_type.get(cell_type) {
            return Some(ports);
        }
        let family = type_family(cell_type);
        self.by_type
            .iter()
            .find(|(t, _)| type_family(t) == family)
            .map(|(_, ports)| ports)
            .or_else(|| self.from_leakage.get(cell_type))
    }

    /// Input port names of `cell_type`, sorted.
    pub fn inputs(&self, cell_type: &str) -> Option<Vec<&str>> {
        let ports = self.ports(cell_type)?;
        Some(
            ports
                .iter()
                .filter(|(_, d)| **d == PortDirection::Input)
                .map(|(p, _)| p.as_str())
                .collect(),
        )
    }

    /// Returns `true` if `cell_type` has an input named `input` and an output named `output`.
    pub fn has_pins(&self, cell_type: &str, input: &str, output: &str) -> bool {
        self.ports(cell_type).is_some_and(|ports| {
            ports.get(input) == Some(&PortDirection::Input)
                && ports.get(output) == Some(&PortDirection::Output)
        })
    }

    /// Number of types with an exact entry.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns `true` if no types are known.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
