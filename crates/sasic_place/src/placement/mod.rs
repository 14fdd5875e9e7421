//! Placement engine.
//!
//! Levels are processed in ascending order. Each level is first placed
//! greedily, then refined by annealing in name-ordered batches. One seeded
//! RNG drives the whole run, so a fixed seed reproduces the placement.

mod anneal;
mod greedy;

pub use anneal::{anneal_batch, AnnealBatch, AnnealParams, AnnealStats, SwapOutcome};
pub use greedy::{driver_points, place_greedy, NO_FREE_SITE, TYPE_NOT_IN_FABRIC};

use crate::hpwl::{FixedPoints, HpwlEvaluator};
use crate::levels::Levels;
use crate::state::Placement;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sasic_config::PlacementConfig;
use sasic_db::{NetIndex, Netlist, SitePool};
use sasic_diagnostics::DiagnosticSink;

/// Result of placing every level.
#[derive(Debug)]
pub struct PlaceOutcome<'f> {
    /// Final cell-to-site assignment.
    pub placement: Placement<'f>,
    /// Global HPWL of the final placement, in database units.
    pub hpwl: i64,
    /// Annealing counters summed over every batch.
    pub anneal: AnnealStats,
}

/// Places every cell of `netlist` level by level.
pub fn place<'f>(
    netlist: &Netlist,
    index: &NetIndex,
    fixed: &FixedPoints,
    levels: &Levels,
    pool: &mut SitePool<'f>,
    config: &PlacementConfig,
    sink: &DiagnosticSink,
) -> PlaceOutcome<'f> {
    let mut placement = Placement::new(pool.fabric(), netlist.cell_count());
    let eval = HpwlEvaluator::new(index, fixed);
    let params = AnnealParams::from_config(config);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut anneal = AnnealStats::default();
    let batch_size = config.batch_size.max(2);

    for cells in levels.by_level(netlist).values() {
        place_greedy(cells, netlist, index, fixed, &mut placement, pool, sink);
        if config.greedy_only {
            continue;
        }
        for chunk in cells.chunks(batch_size) {
            let batch: Vec<_> = chunk
                .iter()
                .copied()
                .filter(|c| placement.site(*c).is_some())
                .collect();
            if batch.len() < 2 {
                continue;
            }
            let stats = anneal_batch(&batch, netlist, &mut placement, pool, eval, &params, &mut rng);
            anneal.absorb(&stats);
        }
    }

    let hpwl = eval.total(&placement);
    PlaceOutcome {
        placement,
        hpwl,
        anneal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::level_from_seeds;
    use sasic_common::{CellId, NetBit, Point, SiteId};
    use sasic_db::{Bit, Fabric, LogicalCell, PortDirection, RoleTable};

    const NAND: &str = "sky130_fd_sc_hd__nand2_1";

    fn n(raw: u32) -> Bit {
        Bit::Net(NetBit::from_raw(raw))
    }

    fn grid_fabric(side: i64) -> Fabric {
        let mut f = Fabric::new(RoleTable::new());
        for y in 0..side {
            for x in 0..side {
                f.add_site(format!("T{x}_{y}__NAND"), format!("T{x}_{y}"), NAND, Point::new(x * 5000, y * 5000));
            }
        }
        f
    }

    fn chain(len: u32) -> Netlist {
        let mut nl = Netlist::new("top");
        for i in 0..len {
            let a = if i < 5 { n(2) } else { n(100 + i - 5) };
            nl.add_cell(
                LogicalCell::new(format!("g{i:02}"), NAND)
                    .with_port("A", PortDirection::Input, vec![a])
                    .with_port("B", PortDirection::Input, vec![n(2)])
                    .with_port("Y", PortDirection::Output, vec![n(100 + i)]),
            )
            .unwrap();
        }
        nl
    }

    fn run(config: &PlacementConfig) -> (i64, Vec<(CellId, SiteId)>, usize, AnnealStats) {
        let fabric = grid_fabric(6);
        let nl = chain(20);
        let index = NetIndex::build(&nl);
        let mut fixed = FixedPoints::new();
        fixed.add(NetBit::from_raw(2), Point::new(0, 0));
        let sink = DiagnosticSink::new();
        let levels = level_from_seeds(&index, [NetBit::from_raw(2)], &sink);
        let mut pool = SitePool::new(&fabric);
        let out = place(&nl, &index, &fixed, &levels, &mut pool, config, &sink);
        assert_eq!(pool.used_count(), out.placement.placed_count());
        (
            out.hpwl,
            out.placement.iter().collect(),
            out.placement.placed_count(),
            out.anneal,
        )
    }

    #[test]
    fn places_every_cell_on_distinct_sites() {
        let (_, sites, placed, anneal) = run(&PlacementConfig::default());
        assert_eq!(placed, 20);
        assert_eq!(anneal.batches, 4);
        let mut used: Vec<_> = sites.iter().map(|(_, s)| *s).collect();
        used.sort();
        used.dedup();
        assert_eq!(used.len(), 20);
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let config = PlacementConfig::default();
        assert_eq!(run(&config), run(&config));
    }

    #[test]
    fn greedy_only_skips_annealing() {
        let config = PlacementConfig {
            greedy_only: true,
            ..PlacementConfig::default()
        };
        let (hpwl, _, placed, anneal) = run(&config);
        assert_eq!(placed, 20);
        assert_eq!(anneal, AnnealStats::default());
        assert!(hpwl > 0);
    }
}
