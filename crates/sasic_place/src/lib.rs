//! Placement engine for the structured-ASIC flow.
//!
//! This crate maps every logical cell of a synthesized netlist onto a
//! compatible pre-built site of the fabric, minimizing half-perimeter
//! wirelength. The output is a [`PlacementMap`] handed to the ECO stage.
//!
//! # Pipeline
//!
//! 1. **Ports**: bind top-level port bits to physical I/O pins
//! 2. **Levels**: topological levels seeded from the input pins
//! 3. **Greedy**: each level placed near the median of its drivers
//! 4. **Anneal**: batched simulated annealing within each level
//!
//! # Usage
//!
//! ```ignore
//! use sasic_place::run_placement;
//!
//! let mut pool = SitePool::new(&fabric);
//! let result = run_placement(&netlist, &mut pins, &mut pool, &config.placement, &sink)?;
//! std::fs::write("design.map", write_map(&result.placement_map, &fabric))?;
//! ```

#![warn(missing_docs)]

pub mod hpwl;
pub mod levels;
pub mod mapfile;
pub mod placement;
pub mod ports;
pub mod state;
pub mod validate;

pub use hpwl::{FixedPoints, HpwlEvaluator};
pub use levels::{compute_levels, level_from_seeds, Levels, CYCLE_FALLBACK};
pub use mapfile::{
    load_map, parse_map, restore_placement, write_map, write_placement_csv, MapFileError,
    UNKNOWN_MAP_ENTRY,
};
pub use placement::{place, AnnealStats, PlaceOutcome, NO_FREE_SITE, TYPE_NOT_IN_FABRIC};
pub use ports::{assign_ports, parse_bus, PortAssignment, PORT_WITHOUT_PIN};
pub use state::Placement;
pub use validate::{validate_placement, ValidationReport, ValidationStats};

use sasic_common::{InternalError, SasicResult};
use sasic_config::PlacementConfig;
use sasic_db::{NetIndex, Netlist, PinTable, PlacementMap, SitePool};
use sasic_diagnostics::DiagnosticSink;

/// Everything the placement stage produces.
#[derive(Debug)]
pub struct PlacementResult<'f> {
    /// Port-to-pin bindings, in pin order.
    pub assignments: Vec<PortAssignment>,
    /// Topological level of every cell.
    pub levels: Levels,
    /// Cell-to-site assignment by cell ID.
    pub placement: Placement<'f>,
    /// The same assignment keyed by cell name.
    pub placement_map: PlacementMap,
    /// Global HPWL in database units.
    pub hpwl: i64,
    /// Annealing counters.
    pub anneal: AnnealStats,
}

/// Runs the complete placement pipeline.
///
/// Binds ports to `pins`, levels the netlist, then places every cell by
/// claiming sites from `pool`. Data-quality problems are reported to `sink`;
/// only a broken internal invariant is an error.
pub fn run_placement<'f>(
    netlist: &Netlist,
    pins: &mut PinTable,
    pool: &mut SitePool<'f>,
    config: &PlacementConfig,
    sink: &DiagnosticSink,
) -> SasicResult<PlacementResult<'f>> {
    // 1. Ports
    let assignments = assign_ports(netlist, pins, sink);

    // 2. Levels
    let index = NetIndex::build(netlist);
    let levels = compute_levels(&index, pins, sink);

    // 3-4. Greedy + anneal
    let fixed = FixedPoints::from_pins(pins);
    let outcome = place(netlist, &index, &fixed, &levels, pool, config, sink);

    let placement_map = outcome
        .placement
        .to_map(netlist)
        .map_err(|e| InternalError::new(format!("placement map: {e}")))?;

    Ok(PlacementResult {
        assignments,
        levels,
        placement: outcome.placement,
        placement_map,
        hpwl: outcome.hpwl,
        anneal: outcome.anneal,
    })
}
