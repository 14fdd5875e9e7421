//! Half-perimeter wirelength.
//!
//! All arithmetic is on integer database units, so the sum over any net
//! subset is exact and incremental deltas never drift from a recomputation.

use crate::state::Placement;
use rayon::prelude::*;
use sasic_common::{BBox, NetBit, Point};
use sasic_db::{NetIndex, PinTable};
use std::collections::{BTreeMap, BTreeSet};

/// Fixed pin locations per net.
#[derive(Debug, Clone, Default)]
pub struct FixedPoints {
    by_net: BTreeMap<NetBit, Vec<Point>>,
}

impl FixedPoints {
    /// No fixed points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locations of every pin currently bound to a net.
    pub fn from_pins(pins: &PinTable) -> Self {
        let mut fixed = Self::new();
        for (net, pos) in pins.bound_nets() {
            fixed.add(net, pos);
        }
        fixed
    }

    /// Adds a fixed terminal on `net`.
    pub fn add(&mut self, net: NetBit, pos: Point) {
        self.by_net.entry(net).or_default().push(pos);
    }

    /// Fixed terminals on `net`.
    pub fn on(&self, net: NetBit) -> &[Point] {
        self.by_net.get(&net).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nets with at least one fixed terminal.
    pub fn nets(&self) -> impl Iterator<Item = NetBit> + '_ {
        self.by_net.keys().copied()
    }
}

/// Evaluates HPWL over placed-cell terminals and fixed pins.
#[derive(Debug, Clone, Copy)]
pub struct HpwlEvaluator<'a> {
    index: &'a NetIndex,
    fixed: &'a FixedPoints,
}

impl<'a> HpwlEvaluator<'a> {
    /// An evaluator over `index` and `fixed`.
    pub fn new(index: &'a NetIndex, fixed: &'a FixedPoints) -> Self {
        Self { index, fixed }
    }

    /// The net index this evaluator reads.
    pub fn index(&self) -> &'a NetIndex {
        self.index
    }

    /// The fixed pin locations this evaluator reads.
    pub fn fixed(&self) -> &'a FixedPoints {
        self.fixed
    }

    /// HPWL of one net. Nets with fewer than two placed terminals contribute zero.
    pub fn net(&self, placement: &Placement<'_>, net: NetBit) -> i64 {
        let cells = self
            .index
            .cells_on(net)
            .iter()
            .filter_map(|c| placement.pos(*c));
        let mut points = cells.chain(self.fixed.on(net).iter().copied());
        let Some(first) = points.next() else {
            return 0;
        };
        let mut bbox = BBox::from_point(first);
        let mut count = 1usize;
        for p in points {
            bbox.include(p);
            count += 1;
        }
        if count < 2 {
            0
        } else {
            bbox.half_perimeter()
        }
    }

    /// Sum over a net subset.
    pub fn sum(&self, placement: &Placement<'_>, nets: &[NetBit]) -> i64 {
        nets.iter().map(|n| self.net(placement, *n)).sum()
    }

    /// Every net touched by a cell or a fixed pin, ascending.
    pub fn all_nets(&self) -> Vec<NetBit> {
        self.index
            .all_nets()
            .chain(self.fixed.nets())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Global HPWL. Nets are evaluated in parallel; the result is a pure
    /// function of the placement.
    pub fn total(&self, placement: &Placement<'_>) -> i64 {
        self.all_nets()
            .par_iter()
            .map(|n| self.net(placement, *n))
            .sum()
    }
}
