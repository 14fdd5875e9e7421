//! Power-down ECO: every leftover general-logic site becomes a parked cell
//! with its inputs tied to constants. Spare buffer sites stay free unless
//! configured otherwise.
//!
//! Tie cells are spread over a coarse grid across the die, one per grid
//! cell, so that each parked cell finds a constant driver nearby. Each tie
//! cell drives a fresh `tie_low_<k>` and `tie_high_<k>` net.

use crate::EcoError;
use sasic_common::{NetBit, Point, SiteId, SiteRole};
use sasic_config::EcoConfig;
use sasic_db::{
    Bit, Fabric, LeakageTable, LogicalCell, Netlist, PlacementMap, PortCatalog, PortDirection,
    SiteFilter, SitePool,
};
use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use serde::Serialize;
use std::collections::BTreeMap;

/// No free tie site exists; the ECO is skipped.
pub const NO_TIE_CELLS: DiagnosticCode = DiagnosticCode::new(Category::Eco, 301);

/// A site type has no known input-port list; its sites stay unparked.
pub const UNKNOWN_PORT_LIST: DiagnosticCode = DiagnosticCode::new(Category::Eco, 302);

/// Fewer tie sites are free than the fan-out cap asks for.
pub const TIE_SHORTFALL: DiagnosticCode = DiagnosticCode::new(Category::Eco, 303);

/// Counters from one power-down run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PowerDownReport {
    /// Tie cells instantiated.
    pub tie_cells: usize,
    /// Unused sites instantiated as parked cells.
    pub parked: usize,
    /// Input ports tied to a tie-low net.
    pub tied_low: usize,
    /// Input ports tied to a tie-high net.
    pub tied_high: usize,
    /// Ties whose value came from the leakage table.
    pub from_leakage: usize,
    /// Parkable sites left alone because no tie cell was available.
    pub untied: usize,
    /// Sites skipped for lack of a port list.
    pub unknown_port_sites: usize,
    /// Types without a port list.
    pub unknown_types: Vec<String>,
}

/// Returns `true` if an input should idle high: active-low names ending in
/// `_B` or `_N`.
pub fn ties_high_by_name(port: &str) -> bool {
    let upper = port.to_ascii_uppercase();
    upper.ends_with("_B") || upper.ends_with("_N")
}

struct Tie {
    pos: Point,
    low: NetBit,
    high: NetBit,
    load: usize,
}

/// Parks every free logic site of `pool` behind tie cells.
///
/// Sequential sites are parked like logic; buffer sites only when
/// `park_spare_buffers` is set, which it is not by default. New cells are added to `netlist` and `map`
/// and their sites claimed from `pool`.
pub fn power_down(
    netlist: &mut Netlist,
    map: &mut PlacementMap,
    pool: &mut SitePool<'_>,
    catalog: &PortCatalog,
    leakage: Option<&LeakageTable>,
    config: &EcoConfig,
    sink: &DiagnosticSink,
) -> Result<PowerDownReport, EcoError> {
    let fabric = pool.fabric();
    let mut report = PowerDownReport::default();

    let mut parkable: Vec<(SiteId, Vec<String>)> = Vec::new();
    let mut unknown: BTreeMap<&str, usize> = BTreeMap::new();
    for site in pool.free_sites(SiteFilter::Any) {
        let s = fabric.site(site);
        let eligible = match s.role {
            SiteRole::Logic | SiteRole::Sink => true,
            SiteRole::Buffer => config.park_spare_buffers,
            SiteRole::Tie | SiteRole::Tap | SiteRole::Decap => false,
        };
        if !eligible {
            continue;
        }
        match catalog.inputs(&s.cell_type) {
            None => *unknown.entry(s.cell_type.as_str()).or_insert(0) += 1,
            Some(inputs) if inputs.is_empty() => {}
            Some(inputs) => parkable.push((site, inputs.into_iter().map(str::to_string).collect())),
        }
    }
    for (cell_type, count) in &unknown {
        sink.emit(
            Diagnostic::warning(
                UNKNOWN_PORT_LIST,
                format!("no input-port list for {cell_type}; {count} site(s) left unparked"),
            )
            .with_subject(cell_type.to_string())
            .with_help("instantiate the type in the design or list it in the leakage table"),
        );
        report.unknown_port_sites += count;
        report.unknown_types.push(cell_type.to_string());
    }
    if parkable.is_empty() {
        return Ok(report);
    }

    let cap = config.max_fanout_per_tie.max(1);
    let needed = parkable.len().div_ceil(cap);
    let available = pool.count_free(SiteFilter::Role(SiteRole::Tie));
    if available == 0 {
        sink.emit(
            Diagnostic::warning(NO_TIE_CELLS, "no free tie cell; power-down ECO skipped")
                .with_note(format!("{} unused site(s) left floating", parkable.len())),
        );
        report.untied = parkable.len();
        return Ok(report);
    }
    if available < needed {
        sink.emit(
            Diagnostic::warning(
                TIE_SHORTFALL,
                format!("{needed} tie cells wanted for {} unused sites, {available} free", parkable.len()),
            )
            .with_note(format!("tie fan-out will exceed {cap}")),
        );
    }

    let mut ties = Vec::new();
    for (k, site) in spread_ties(pool, needed.min(available)).into_iter().enumerate() {
        let s = fabric.site(site);
        let low = netlist.alloc_net(format!("tie_low_{k}"))?;
        let high = netlist.alloc_net(format!("tie_high_{k}"))?;
        let name = format!("tie_cell_{k}");
        netlist.add_cell(
            LogicalCell::new(&name, &s.cell_type)
                .with_port(&config.tie_low_port, PortDirection::Output, vec![Bit::from(low)])
                .with_port(&config.tie_high_port, PortDirection::Output, vec![Bit::from(high)])
                .with_attribute("physical_name", s.name.clone()),
        )?;
        map.insert(name, site)?;
        ties.push(Tie {
            pos: s.pos,
            low,
            high,
            load: 0,
        });
    }
    report.tie_cells = ties.len();

    for (site, inputs) in parkable {
        let s = fabric.site(site);
        let Some(k) = nearest_tie(&ties, s.pos, cap) else {
            report.untied += 1;
            continue;
        };
        let tie = &mut ties[k];
        tie.load += 1;

        let name = format!("unused_{}", s.name);
        let mut cell = LogicalCell::new(&name, &s.cell_type)
            .with_attribute("physical_name", s.name.clone())
            .with_attribute("unused", true);
        if let Some(ports) = catalog.ports(&s.cell_type) {
            cell.port_directions = ports.clone();
        }
        for port in inputs {
            let high = match leakage.and_then(|l| l.value(&s.cell_type, &port)) {
                Some(value) => {
                    report.from_leakage += 1;
                    value
                }
                None => ties_high_by_name(&port),
            };
            let net = if high {
                report.tied_high += 1;
                tie.high
            } else {
                report.tied_low += 1;
                tie.low
            };
            cell.port_directions.insert(port.clone(), PortDirection::Input);
            cell.connections.insert(port, vec![Bit::from(net)]);
        }

        pool.claim(site);
        netlist.add_cell(cell)?;
        map.insert(name, site)?;
        report.parked += 1;
    }

    Ok(report)
}

/// Claims up to `count` tie sites, one nearest each cell of a `g x g` grid
/// over the die, in row-major order.
fn spread_ties(pool: &mut SitePool<'_>, count: usize) -> Vec<SiteId> {
    let die = pool.fabric().die();
    let g = (1..).find(|g: &i64| (g * g) as usize >= count).unwrap_or(1);
    let mut out = Vec::with_capacity(count);
    'grid: for row in 0..g {
        for col in 0..g {
            if out.len() == count {
                break 'grid;
            }
            let target = Point::new(
                (2 * col + 1) * die.width / (2 * g),
                (2 * row + 1) * die.height / (2 * g),
            );
            match pool.take_nearest(target, SiteFilter::Role(SiteRole::Tie)) {
                Some(site) => out.push(site),
                None => break 'grid,
            }
        }
    }
    out
}

/// The nearest tie with spare capacity, else the nearest tie overall.
fn nearest_tie(ties: &[Tie], pos: Point, cap: usize) -> Option<usize> {
    let by_distance = |(i, t): &(usize, &Tie)| (t.pos.nearness(pos), *i);
    ties.iter()
        .enumerate()
        .filter(|(_, t)| t.load < cap)
        .min_by_key(by_distance)
        .or_else(|| ties.iter().enumerate().min_by_key(by_distance))
        .map(|(i, _)| i)
}

/// Sites of `fabric` still free in `pool`, per role.
pub fn unused_by_role(fabric: &Fabric, pool: &SitePool<'_>) -> BTreeMap<SiteRole, usize> {
    let mut counts = BTreeMap::new();
    for site in fabric.sites().iter().filter(|s| pool.is_free(s.id)) {
        *counts.entry(site.role).or_insert(0) += 1;
    }
    counts
}
