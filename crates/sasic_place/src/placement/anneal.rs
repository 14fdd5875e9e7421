//! Batched simulated-annealing refinement.
//!
//! A batch is a handful of already-placed cells plus, for each of them, the
//! nearest free site of the same type. Moves swap the contents of two slots
//! (a cell may move into an empty slot). Every delta is computed over only
//! the nets touched by the two moved cells, so the tracked batch HPWL always
//! equals a fresh recomputation.

use crate::hpwl::HpwlEvaluator;
use crate::state::Placement;
use rand::Rng;
use sasic_common::geom::dbu_to_um;
use sasic_common::{CellId, NetBit, Point, SiteId};
use sasic_config::PlacementConfig;
use sasic_db::{Netlist, SiteFilter, SitePool};
use serde::Serialize;
use std::collections::BTreeSet;

/// Steps between cooling updates.
const COOL_EVERY: usize = 20;

/// Resampling attempts before a move falls back to a uniform pair.
const PAIR_ATTEMPTS: usize = 50;

/// Auto initial temperature as a fraction of the batch HPWL (microns).
const AUTO_TEMPERATURE_FRACTION: f64 = 0.002;

/// Floor applied to the temperature in the Metropolis test.
const MIN_TEMPERATURE: f64 = 1e-6;

/// Annealing knobs, with distances in database units.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealParams {
    /// Steps per batch.
    pub iters: usize,
    /// Cooling factor applied every [`COOL_EVERY`] steps.
    pub alpha: f64,
    /// Initial temperature in microns; derived from the batch HPWL when unset.
    pub t_initial: Option<f64>,
    /// Weight of refine moves.
    pub p_refine: f64,
    /// Weight of explore moves.
    pub p_explore: f64,
    /// Largest Manhattan distance between the two slots of a refine move.
    pub refine_max_distance: i64,
    /// Initial explore window as a fraction of the die size.
    pub initial_window: f64,
}

impl Default for AnnealParams {
    fn default() -> Self {
        Self::from_config(&PlacementConfig::default())
    }
}

impl AnnealParams {
    /// Converts the `[placement]` section.
    pub fn from_config(config: &PlacementConfig) -> Self {
        Self {
            iters: config.moves_per_temp,
            alpha: config.cooling_rate,
            t_initial: config.initial_temperature,
            p_refine: config.p_refine,
            p_explore: config.p_explore,
            refine_max_distance: sasic_common::geom::um_to_dbu(config.refine_max_distance),
            initial_window: config.initial_window,
        }
    }

    fn refine_probability(&self) -> f64 {
        let total = self.p_refine + self.p_explore;
        if total > 0.0 {
            self.p_refine / total
        } else {
            1.0
        }
    }
}

/// Result of one proposed swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Neither slot holds a cell, or both are the same slot.
    Noop,
    /// A cell's type does not match its destination site.
    Incompatible,
    /// The swap was kept; carries the HPWL delta.
    Accepted(i64),
    /// The swap was undone; carries the HPWL delta it would have caused.
    Rejected(i64),
}

/// Counters from annealing one or more batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnealStats {
    /// Batches annealed.
    pub batches: usize,
    /// Moves proposed.
    pub steps: usize,
    /// Moves kept.
    pub accepted: usize,
    /// Moves undone by the Metropolis test.
    pub rejected: usize,
    /// Moves refused for type incompatibility.
    pub incompatible: usize,
    /// Batch HPWL before annealing, summed over batches.
    pub start_hpwl: i64,
    /// Batch HPWL after annealing, summed over batches.
    pub end_hpwl: i64,
}

impl AnnealStats {
    /// Adds another batch's counters.
    pub fn absorb(&mut self, other: &AnnealStats) {
        self.batches += other.batches;
        self.steps += other.steps;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.incompatible += other.incompatible;
        self.start_hpwl += other.start_hpwl;
        self.end_hpwl += other.end_hpwl;
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    site: SiteId,
    pos: Point,
    cell: Option<CellId>,
}

/// One batch under refinement.
#[derive(Debug)]
pub struct AnnealBatch<'p, 'f> {
    netlist: &'p Netlist,
    placement: &'p mut Placement<'f>,
    eval: HpwlEvaluator<'p>,
    slots: Vec<Slot>,
    nets: Vec<NetBit>,
    cur: i64,
}

impl<'p, 'f> AnnealBatch<'p, 'f> {
    /// Builds the slot set for `cells`, claiming one spare site per cell
    /// from `pool`. Unplaced cells are ignored.
    pub fn new(
        cells: &[CellId],
        netlist: &'p Netlist,
        placement: &'p mut Placement<'f>,
        pool: &mut SitePool<'_>,
        eval: HpwlEvaluator<'p>,
    ) -> Self {
        let fabric = placement.fabric();
        let mut slots: Vec<Slot> = cells
            .iter()
            .filter_map(|c| {
                placement.site(*c).map(|site| Slot {
                    site,
                    pos: fabric.site(site).pos,
                    cell: Some(*c),
                })
            })
            .collect();
        let placed: Vec<CellId> = slots.iter().filter_map(|s| s.cell).collect();
        for slot in slots.clone() {
            let Some(cell) = slot.cell else { continue };
            let cell_type = &netlist.cell(cell).cell_type;
            if let Some(site) = pool.take_nearest(slot.pos, SiteFilter::CellType(cell_type)) {
                slots.push(Slot {
                    site,
                    pos: fabric.site(site).pos,
                    cell: None,
                });
            }
        }
        let nets = eval.index().nets_of(&placed);
        let cur = eval.sum(placement, &nets);
        Self {
            netlist,
            placement,
            eval,
            slots,
            nets,
            cur,
        }
    }

    /// Tracked HPWL over the batch nets.
    pub fn current_hpwl(&self) -> i64 {
        self.cur
    }

    /// HPWL over the batch nets, recomputed from scratch.
    pub fn recompute_hpwl(&self) -> i64 {
        self.eval.sum(&*self.placement, &self.nets)
    }

    /// Number of slots, spare sites included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot currently holding `cell`.
    pub fn slot_of(&self, cell: CellId) -> Option<usize> {
        self.slots.iter().position(|s| s.cell == Some(cell))
    }

    /// Site of slot `i`.
    pub fn slot_site(&self, i: usize) -> SiteId {
        self.slots[i].site
    }

    fn fits(&self, cell: Option<CellId>, site: SiteId) -> bool {
        match cell {
            None => true,
            Some(c) => self.netlist.cell(c).cell_type == self.placement.fabric().site(site).cell_type,
        }
    }

    fn moved_nets(&self, a: Option<CellId>, b: Option<CellId>) -> Vec<NetBit> {
        let index = self.eval.index();
        a.into_iter()
            .chain(b)
            .flat_map(|c| index.nets(c).iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Proposes exchanging the contents of slots `i` and `j`.
    ///
    /// A non-positive delta is always kept; otherwise `accept` decides.
    pub fn try_swap(&mut self, i: usize, j: usize, accept: impl FnOnce(i64) -> bool) -> SwapOutcome {
        let (a, b) = (self.slots[i].cell, self.slots[j].cell);
        if i == j || (a.is_none() && b.is_none()) {
            return SwapOutcome::Noop;
        }
        let (sa, sb) = (self.slots[i].site, self.slots[j].site);
        if !self.fits(a, sb) || !self.fits(b, sa) {
            return SwapOutcome::Incompatible;
        }
        let nets = self.moved_nets(a, b);
        let before = self.eval.sum(&*self.placement, &nets);
        if let Some(a) = a {
            self.placement.set(a, Some(sb));
        }
        if let Some(b) = b {
            self.placement.set(b, Some(sa));
        }
        let delta = self.eval.sum(&*self.placement, &nets) - before;
        if delta <= 0 || accept(delta) {
            self.slots[i].cell = b;
            self.slots[j].cell = a;
            self.cur += delta;
            SwapOutcome::Accepted(delta)
        } else {
            if let Some(a) = a {
                self.placement.set(a, Some(sa));
            }
            if let Some(b) = b {
                self.placement.set(b, Some(sb));
            }
            SwapOutcome::Rejected(delta)
        }
    }

    fn occupied(&self) -> Vec<usize> {
        (0..self.slots.len())
            .filter(|i| self.slots[*i].cell.is_some())
            .collect()
    }

    fn random_pair(&self, rng: &mut impl Rng, occupied: &[usize]) -> Option<(usize, usize)> {
        if occupied.is_empty() || self.slots.len() < 2 {
            return None;
        }
        let i = occupied[rng.gen_range(0..occupied.len())];
        let mut j = rng.gen_range(0..self.slots.len() - 1);
        if j >= i {
            j += 1;
        }
        Some((i, j))
    }

    fn pair_within(&self, rng: &mut impl Rng, occupied: &[usize], max_distance: f64) -> Option<(usize, usize)> {
        for _ in 0..PAIR_ATTEMPTS {
            let (i, j) = self.random_pair(rng, occupied)?;
            if self.slots[i].pos.manhattan(self.slots[j].pos) as f64 <= max_distance {
                return Some((i, j));
            }
        }
        None
    }

    /// Runs the annealing schedule.
    pub fn run(&mut self, params: &AnnealParams, rng: &mut impl Rng) -> AnnealStats {
        let mut stats = AnnealStats {
            batches: 1,
            start_hpwl: self.cur,
            ..AnnealStats::default()
        };
        let mut temperature = params
            .t_initial
            .unwrap_or_else(|| (AUTO_TEMPERATURE_FRACTION * dbu_to_um(self.cur)).max(1.0));
        let mut window = params.initial_window * self.placement.fabric().die_size() as f64;
        let p_refine = params.refine_probability();
        let refine_distance = params.refine_max_distance as f64;

        for step in 0..params.iters {
            let occupied = self.occupied();
            let limit = if rng.gen::<f64>() < p_refine {
                refine_distance
            } else {
                window
            };
            let pair = self
                .pair_within(rng, &occupied, limit)
                .or_else(|| self.random_pair(rng, &occupied));
            if let Some((i, j)) = pair {
                stats.steps += 1;
                let t = temperature.max(MIN_TEMPERATURE);
                let outcome = self.try_swap(i, j, |delta| {
                    rng.gen::<f64>() < (-dbu_to_um(delta) / t).exp()
                });
                match outcome {
                    SwapOutcome::Accepted(_) => stats.accepted += 1,
                    SwapOutcome::Rejected(_) => stats.rejected += 1,
                    SwapOutcome::Incompatible => stats.incompatible += 1,
                    SwapOutcome::Noop => {}
                }
            }
            if (step + 1) % COOL_EVERY == 0 {
                temperature *= params.alpha;
                window *= params.alpha;
            }
        }
        stats.end_hpwl = self.cur;
        stats
    }

    /// Returns every slot left without a cell to the pool.
    pub fn finish(self, pool: &mut SitePool<'_>) {
        for slot in &self.slots {
            if slot.cell.is_none() {
                pool.release(slot.site);
            }
        }
    }
}

/// Anneals one batch and releases its unused spare sites.
pub fn anneal_batch(
    cells: &[CellId],
    netlist: &Netlist,
    placement: &mut Placement<'_>,
    pool: &mut SitePool<'_>,
    eval: HpwlEvaluator<'_>,
    params: &AnnealParams,
    rng: &mut impl Rng,
) -> AnnealStats {
    let mut batch = AnnealBatch::new(cells, netlist, placement, pool, eval);
    if batch.slot_count() < 2 {
        batch.finish(pool);
        return AnnealStats::default();
    }
    let stats = batch.run(params, rng);
    batch.finish(pool);
    stats
}
