//! Dependency leveling.
//!
//! Kahn-style layering seeded from the nets bound to input pins: a cell is
//! ready once every net on its inputs is known, and its outputs become known
//! one level later. When no cell is ready while some remain (a cycle through
//! sequential cells, or an undriven net) every remaining cell takes the
//! current level and is recorded in the fallback set.

use sasic_common::{CellId, NetBit};
use sasic_db::{NetIndex, Netlist, PinTable, PortDirection};
use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Leveling stopped early and assigned the remaining cells one level.
pub const CYCLE_FALLBACK: DiagnosticCode = DiagnosticCode::new(Category::Placement, 103);

/// Level of every cell.
#[derive(Debug, Clone, Default)]
pub struct Levels {
    levels: Vec<u32>,
    fallback: BTreeSet<CellId>,
}

impl Levels {
    /// Level of `cell`.
    pub fn level(&self, cell: CellId) -> u32 {
        self.levels.get(cell.index()).copied().unwrap_or(0)
    }

    /// Cells that received their level from the cycle fallback.
    pub fn fallback(&self) -> &BTreeSet<CellId> {
        &self.fallback
    }

    /// Returns `true` if `cell` was leveled by the fallback.
    pub fn in_fallback(&self, cell: CellId) -> bool {
        self.fallback.contains(&cell)
    }

    /// Highest level assigned, or `None` for an empty netlist.
    pub fn max_level(&self) -> Option<u32> {
        self.levels.iter().copied().max()
    }

    /// Cells grouped by level, each group sorted by cell name.
    pub fn by_level(&self, netlist: &Netlist) -> BTreeMap<u32, Vec<CellId>> {
        let mut groups: BTreeMap<u32, Vec<CellId>> = BTreeMap::new();
        for (i, level) in self.levels.iter().enumerate() {
            groups
                .entry(*level)
                .or_default()
                .push(CellId::from_raw(i as u32));
        }
        for cells in groups.values_mut() {
            cells.sort_by(|a, b| netlist.cell(*a).name.cmp(&netlist.cell(*b).name));
        }
        groups
    }
}

/// Levels every cell of the index, seeding known nets from input pins.
pub fn compute_levels(index: &NetIndex, pins: &PinTable, sink: &DiagnosticSink) -> Levels {
    let seeds = pins
        .pins()
        .iter()
        .filter(|p| p.direction == PortDirection::Input)
        .filter_map(|p| p.bound_net());
    level_from_seeds(index, seeds, sink)
}

/// Levels every cell of the index from an explicit set of known nets.
pub fn level_from_seeds(
    index: &NetIndex,
    seeds: impl IntoIterator<Item = NetBit>,
    sink: &DiagnosticSink,
) -> Levels {
    let count = index.cell_count();
    let mut known: HashSet<NetBit> = seeds.into_iter().collect();
    let mut consumers: BTreeMap<NetBit, Vec<CellId>> = BTreeMap::new();
    let mut pending = vec![0usize; count];
    let mut frontier = Vec::new();
    for i in 0..count {
        let cell = CellId::from_raw(i as u32);
        for net in index.inputs(cell) {
            if !known.contains(net) {
                pending[i] += 1;
                consumers.entry(*net).or_default().push(cell);
            }
        }
        if pending[i] == 0 {
            frontier.push(cell);
        }
    }

    let mut levels = vec![0u32; count];
    let mut done = vec![false; count];
    let mut fallback = BTreeSet::new();
    let mut remaining = count;
    let mut level = 0u32;
    while remaining > 0 {
        if frontier.is_empty() {
            for (i, is_done) in done.iter().enumerate() {
                if !is_done {
                    levels[i] = level;
                    fallback.insert(CellId::from_raw(i as u32));
                }
            }
            sink.emit(
                Diagnostic::warning(
                    CYCLE_FALLBACK,
                    format!("{remaining} cell(s) have inputs that never become known; assigned level {level}"),
                )
                .with_note("inputs are driven through a cycle or by an undriven net"),
            );
            break;
        }
        let mut newly_known = Vec::new();
        for cell in &frontier {
            levels[cell.index()] = level;
            done[cell.index()] = true;
            remaining -= 1;
            for net in index.outputs(*cell) {
                if known.insert(*net) {
                    newly_known.push(*net);
                }
            }
        }
        let mut next = Vec::new();
        for net in newly_known {
            for cell in consumers.get(&net).map(Vec::as_slice).unwrap_or(&[]) {
                if done[cell.index()] {
                    continue;
                }
                pending[cell.index()] -= 1;
                if pending[cell.index()] == 0 {
                    next.push(*cell);
                }
            }
        }
        next.sort();
        frontier = next;
        level += 1;
    }
    Levels { levels, fallback }
}
