//! Post-placement netlist edits for the structured-ASIC flow.
//!
//! Both passes draw new cells from the sites placement left free and rewrite
//! the netlist in place:
//!
//! 1. **CTS**: an H-tree of buffers over the clock sinks ([`cts`])
//! 2. **Power-down**: tie cells plus a parked instance on every leftover
//!    general-logic site ([`power_down`])
//!
//! [`validate`] checks the rewritten netlist and [`emit`] renders it as
//! structural Verilog.

#![warn(missing_docs)]

pub mod cts;
pub mod emit;
pub mod power_down;
pub mod validate;

pub use cts::{
    synthesize_clock_tree, ClockTree, ClockTreeNode, ClockTreeReport, ClockTreeStats,
    BUFFER_POOL_EXHAUSTED, MULTIPLE_CLOCK_NETS, NO_CLOCK_NET,
};
pub use emit::{escape_identifier, write_verilog};
pub use power_down::{
    power_down, ties_high_by_name, unused_by_role, PowerDownReport, NO_TIE_CELLS, TIE_SHORTFALL,
    UNKNOWN_PORT_LIST,
};
pub use validate::{validate_eco, EcoValidationReport, EcoValidationStats};

use sasic_config::{CtsConfig, EcoConfig};
use sasic_db::{
    LeakageTable, Netlist, NetlistError, PinTable, PlacementMap, PlacementMapError, PortCatalog,
    SitePool,
};
use sasic_diagnostics::DiagnosticSink;

/// A netlist or placement-map edit was refused.
///
/// Both indicate a name collision between generated and existing cells or
/// nets, or a site handed out twice.
#[derive(Debug, thiserror::Error)]
pub enum EcoError {
    /// The netlist rejected an edit.
    #[error(transparent)]
    Netlist(#[from] NetlistError),
    /// The placement map rejected an entry.
    #[error(transparent)]
    PlacementMap(#[from] PlacementMapError),
}

/// Output of [`run_eco`].
#[derive(Debug, Clone)]
pub struct EcoOutcome {
    /// The clock tree, unless CTS was disabled or skipped.
    pub clock_tree: Option<ClockTree>,
    /// Power-down counters; default when the pass is disabled.
    pub power_down: PowerDownReport,
}

/// Runs clock-tree synthesis and then the power-down ECO.
///
/// Port lists for generated cells come from the netlist as it stands before
/// any edit, plus the leakage table.
#[allow(clippy::too_many_arguments)]
pub fn run_eco(
    netlist: &mut Netlist,
    map: &mut PlacementMap,
    pool: &mut SitePool<'_>,
    pins: &PinTable,
    leakage: Option<&LeakageTable>,
    cts: &CtsConfig,
    eco: &EcoConfig,
    sink: &DiagnosticSink,
) -> Result<EcoOutcome, EcoError> {
    let catalog = PortCatalog::from_sources(netlist, leakage);

    let clock_tree = if cts.enabled {
        synthesize_clock_tree(netlist, map, pool, &catalog, pins, cts, sink)?
    } else {
        None
    };

    let power_down = if eco.enabled {
        power_down::power_down(netlist, map, pool, &catalog, leakage, eco, sink)?
    } else {
        PowerDownReport::default()
    };

    Ok(EcoOutcome {
        clock_tree,
        power_down,
    })
}
