//! Structural checks over a finished placement.
//!
//! The validator never mutates anything. It reports what a downstream
//! signoff gate cares about: unplaced cells, sites that do not exist or
//! hold the wrong type, unassigned top-level ports and pins bound twice.

use sasic_common::SiteId;
use sasic_db::{Bit, Fabric, Netlist, PinTable, PlacementMap};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Counters gathered while validating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    /// Cells in the netlist.
    pub cells: usize,
    /// Netlist cells with a site.
    pub placed: usize,
    /// Distinct sites referenced by the map.
    pub sites_used: usize,
    /// Placed cells whose type differs from the site's type.
    pub type_mismatches: usize,
    /// Top-level port bits no pin carries.
    pub unassigned_ports: usize,
}

/// Outcome of [`validate_placement`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Violations that make the placement unusable.
    pub errors: Vec<String>,
    /// Suspicious but tolerated conditions.
    pub warnings: Vec<String>,
    /// Summary counters.
    pub stats: ValidationStats,
}

impl ValidationReport {
    /// Returns `true` when no errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks `map` against the netlist, the fabric and the pin bindings.
pub fn validate_placement(
    netlist: &Netlist,
    fabric: &Fabric,
    map: &PlacementMap,
    pins: &PinTable,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.stats.cells = netlist.cell_count();

    let mut seen_sites: HashSet<SiteId> = HashSet::new();
    for (name, site) in map.iter() {
        if site.index() >= fabric.site_count() {
            report
                .errors
                .push(format!("cell '{name}' is mapped to nonexistent site {site}"));
            continue;
        }
        if !seen_sites.insert(site) {
            report.errors.push(format!(
                "site {} is used more than once",
                fabric.site(site).name
            ));
        }
        let Some(cell) = netlist.cell_by_name(name) else {
            report
                .warnings
                .push(format!("map entry '{name}' has no netlist cell"));
            continue;
        };
        let site = fabric.site(site);
        if site.cell_type != cell.cell_type {
            report.stats.type_mismatches += 1;
            report.errors.push(format!(
                "cell '{name}' of type {} sits on {} of type {}",
                cell.cell_type, site.name, site.cell_type
            ));
        }
    }
    report.stats.sites_used = seen_sites.len();

    for cell in netlist.cells() {
        if map.site_of(&cell.name).is_some() {
            report.stats.placed += 1;
        } else {
            report.errors.push(format!("cell '{}' is not placed", cell.name));
        }
    }

    let mut bound: BTreeMap<(&str, usize), Vec<&str>> = BTreeMap::new();
    for pin in pins.pins() {
        if let Some(b) = &pin.binding {
            bound.entry((b.port.as_str(), b.bit)).or_default().push(&pin.name);
        }
    }
    for ((port, bit), names) in &bound {
        if names.len() > 1 {
            report.errors.push(format!(
                "port {port}[{bit}] is bound to several pins: {}",
                names.join(", ")
            ));
        }
    }
    for port in netlist.ports() {
        for (bit, value) in port.bits.iter().enumerate() {
            if matches!(value, Bit::Const(_)) {
                continue;
            }
            if !bound.contains_key(&(port.name.as_str(), bit)) {
                report.stats.unassigned_ports += 1;
                report
                    .warnings
                    .push(format!("port {}[{bit}] has no pin", port.name));
            }
        }
    }

    report
}
