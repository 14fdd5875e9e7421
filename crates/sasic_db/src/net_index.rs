//! Net-to-terminal index.
//!
//! Built once from a [`Netlist`] and read by leveling, placement and the
//! HPWL evaluator. Constant bits are not nets and never appear here.

use crate::netlist::{Netlist, PortDirection};
use sasic_common::{CellId, NetBit};
use std::collections::{BTreeMap, BTreeSet};

/// Which cells touch which nets, split by direction.
#[derive(Debug, Clone, Default)]
pub struct NetIndex {
    inputs: Vec<Vec<NetBit>>,
    outputs: Vec<Vec<NetBit>>,
    nets: Vec<Vec<NetBit>>,
    cells_on: BTreeMap<NetBit, Vec<CellId>>,
    drivers: BTreeMap<NetBit, Vec<CellId>>,
}

fn dedup_sorted<T: Ord>(items: impl Iterator<Item = T>) -> Vec<T> {
    items.collect::<BTreeSet<T>>().into_iter().collect()
}

impl NetIndex {
    /// Indexes every cell of `netlist`.
    pub fn build(netlist: &Netlist) -> Self {
        let mut index = Self::default();
        for cell in netlist.cells() {
            let ins = dedup_sorted(cell.nets_with_direction(PortDirection::Input));
            let outs = dedup_sorted(cell.nets_with_direction(PortDirection::Output));
            let all = dedup_sorted(cell.nets());
            for net in &all {
                index.cells_on.entry(*net).or_default().push(cell.id);
            }
            for net in &outs {
                index.drivers.entry(*net).or_default().push(cell.id);
            }
            index.inputs.push(ins);
            index.outputs.push(outs);
            index.nets.push(all);
        }
        index
    }

    /// Distinct nets on the input ports of `cell`, ascending.
    pub fn inputs(&self, cell: CellId) -> &[NetBit] {
        self.inputs.get(cell.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct nets on the output ports of `cell`, ascending.
    pub fn outputs(&self, cell: CellId) -> &[NetBit] {
        self.outputs.get(cell.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct nets on any port of `cell`, ascending.
    pub fn nets(&self, cell: CellId) -> &[NetBit] {
        self.nets.get(cell.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cells with any port on `net`, in ID order.
    pub fn cells_on(&self, net: NetBit) -> &[CellId] {
        self.cells_on.get(&net).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cells driving `net` through an output port.
    pub fn drivers(&self, net: NetBit) -> &[CellId] {
        self.drivers.get(&net).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every net touched by at least one cell, ascending.
    pub fn all_nets(&self) -> impl Iterator<Item = NetBit> + '_ {
        self.cells_on.keys().copied()
    }

    /// Number of indexed cells.
    pub fn cell_count(&self) -> usize {
        self.nets.len()
    }

    /// Union of the nets of several cells, ascending.
    pub fn nets_of<'a>(&self, cells: impl IntoIterator<Item = &'a CellId>) -> Vec<NetBit> {
        dedup_sorted(cells.into_iter().flat_map(|c| self.nets(*c).iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::{Bit, ConstBit, LogicalCell};

    fn n(raw: u32) -> Bit {
        Bit::Net(NetBit::from_raw(raw))
    }

    fn nb(raw: u32) -> NetBit {
        NetBit::from_raw(raw)
    }

    fn sample() -> Netlist {
        let mut nl = Netlist::new("top");
        nl.add_cell(
            LogicalCell::new("g1", "sky130_fd_sc_hd__nand2_1")
                .with_port("A", PortDirection::Input, vec![n(2)])
                .with_port("B", PortDirection::Input, vec![n(2)])
                .with_port("Y", PortDirection::Output, vec![n(3)]),
        )
        .unwrap();
        nl.add_cell(
            LogicalCell::new("g2", "sky130_fd_sc_hd__inv_1")
                .with_port("A", PortDirection::Input, vec![n(3)])
                .with_port("Y", PortDirection::Output, vec![n(4)]),
        )
        .unwrap();
        nl.add_cell(
            LogicalCell::new("g3", "sky130_fd_sc_hd__and2_1")
                .with_port("A", PortDirection::Input, vec![n(3)])
                .with_port("B", PortDirection::Input, vec![Bit::Const(ConstBit::One)])
                .with_port("X", PortDirection::Output, vec![n(5)]),
        )
        .unwrap();
        nl
    }

    #[test]
    fn per_cell_nets_are_deduplicated() {
        let idx = NetIndex::build(&sample());
        let g1 = CellId::from_raw(0);
        assert_eq!(idx.inputs(g1), &[nb(2)]);
        assert_eq!(idx.outputs(g1), &[nb(3)]);
        assert_eq!(idx.nets(g1), &[nb(2), nb(3)]);
    }

    #[test]
    fn fanout_and_drivers() {
        let idx = NetIndex::build(&sample());
        assert_eq!(
            idx.cells_on(nb(3)),
            &[CellId::from_raw(0), CellId::from_raw(1), CellId::from_raw(2)]
        );
        assert_eq!(idx.drivers(nb(3)), &[CellId::from_raw(0)]);
        assert!(idx.drivers(nb(2)).is_empty());
    }

    #[test]
    fn constants_are_skipped() {
        let idx = NetIndex::build(&sample());
        let g3 = CellId::from_raw(2);
        assert_eq!(idx.inputs(g3), &[nb(3)]);
        assert_eq!(idx.all_nets().collect::<Vec<_>>(), vec![nb(2), nb(3), nb(4), nb(5)]);
    }

    #[test]
    fn union_of_cell_nets() {
        let idx = NetIndex::build(&sample());
        let nets = idx.nets_of(&[CellId::from_raw(1), CellId::from_raw(2)]);
        assert_eq!(nets, vec![nb(3), nb(4), nb(5)]);
    }

    #[test]
    fn unknown_cell_is_empty() {
        let idx = NetIndex::build(&sample());
        assert!(idx.nets(CellId::from_raw(99)).is_empty());
        assert_eq!(idx.cell_count(), 3);
    }
}
