//! Structural checks over the netlist after CTS and the power-down ECO.
//!
//! Like the placement validator this never mutates anything. It walks the
//! synthesized tree against the rewritten netlist, looks for sequential
//! cells the tree does not reach, and confirms every parked cell has each
//! input on a tie net.

use crate::cts::{clock_bit, is_sink};
use crate::{ClockTree, ClockTreeNode, EcoOutcome};
use sasic_common::{CellId, NetBit, SiteRole};
use sasic_config::{CtsConfig, EcoConfig};
use sasic_db::{Bit, Fabric, LogicalCell, Netlist, PortDirection};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Buffers driving more children than this draw a warning.
pub const MAX_BUFFER_FANOUT: usize = 8;

/// Trees deeper than this draw a warning.
pub const MAX_TREE_DEPTH: usize = 10;

/// Counters gathered while validating the ECO output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EcoValidationStats {
    /// Sequential cells of the original design.
    pub sinks: usize,
    /// Sinks driven by a clock buffer.
    pub buffered_sinks: usize,
    /// Sinks in the tree but driven straight from the clock net.
    pub unbuffered_sinks: usize,
    /// Clock buffers in the tree.
    pub clock_buffers: usize,
    /// Largest child count of any clock buffer.
    pub max_buffer_fanout: usize,
    /// Most buffers between the clock net and a sink.
    pub tree_depth: usize,
    /// Constant-driver cells in the netlist.
    pub tie_cells: usize,
    /// Parked `unused_*` cells.
    pub parked_cells: usize,
    /// Parked-cell inputs on a tie net.
    pub tied_inputs: usize,
    /// Parked-cell inputs with no connection.
    pub floating_inputs: usize,
}

/// Outcome of [`validate_eco`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct EcoValidationReport {
    /// Violations that make the netlist unusable.
    pub errors: Vec<String>,
    /// Suspicious but tolerated conditions.
    pub warnings: Vec<String>,
    /// Summary counters.
    pub stats: EcoValidationStats,
}

impl EcoValidationReport {
    /// Returns `true` when no errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_parked(cell: &LogicalCell) -> bool {
    cell.attributes.get("unused").and_then(|v| v.as_bool()) == Some(true)
}

/// Checks the netlist `run_eco` produced.
pub fn validate_eco(
    netlist: &Netlist,
    fabric: &Fabric,
    outcome: &EcoOutcome,
    cts: &CtsConfig,
    eco: &EcoConfig,
) -> EcoValidationReport {
    let mut report = EcoValidationReport::default();
    check_clock(netlist, fabric, outcome.clock_tree.as_ref(), cts, &mut report);
    check_power_down(netlist, fabric, outcome, eco, &mut report);
    report
}

fn check_clock(
    netlist: &Netlist,
    fabric: &Fabric,
    tree: Option<&ClockTree>,
    cts: &CtsConfig,
    report: &mut EcoValidationReport,
) {
    let sinks: Vec<&LogicalCell> = netlist
        .cells()
        .iter()
        .filter(|c| is_sink(fabric, c) && !is_parked(c))
        .collect();
    report.stats.sinks = sinks.len();

    for cell in &sinks {
        if clock_bit(cell, cts).is_none() {
            report.errors.push(format!(
                "sequential cell '{}' has no '{}' connection",
                cell.name, cts.clock_port
            ));
        }
    }

    let Some(tree) = tree else {
        if cts.enabled && !sinks.is_empty() {
            report
                .warnings
                .push(format!("no clock tree was built for {} sequential cells", sinks.len()));
        }
        return;
    };

    let mut reached: HashSet<CellId> = HashSet::new();
    for root in &tree.roots {
        if let ClockTreeNode::Sink { .. } = root {
            report.stats.unbuffered_sinks += 1;
        }
        check_node(root, tree.clock_net, netlist, cts, &mut reached, report);
    }
    report.stats.tree_depth = tree.roots.iter().map(ClockTreeNode::depth).max().unwrap_or(0);
    report.stats.buffered_sinks = reached.len().saturating_sub(report.stats.unbuffered_sinks);

    let mut other_nets: BTreeSet<NetBit> = BTreeSet::new();
    for cell in &sinks {
        if reached.contains(&cell.id) {
            continue;
        }
        match clock_bit(cell, cts) {
            Some(net) if net == tree.clock_net => report.errors.push(format!(
                "'{}' is on the clock net but not in the clock tree",
                cell.name
            )),
            Some(net) => {
                other_nets.insert(net);
            }
            None => {}
        }
    }
    if !other_nets.is_empty() {
        report.warnings.push(format!(
            "{} sequential cell net(s) other than the buffered clock left unbuffered",
            other_nets.len()
        ));
    }
    if report.stats.unbuffered_sinks > 0 && report.stats.clock_buffers > 0 {
        report.warnings.push(format!(
            "{} clock sink(s) driven straight from the clock net",
            report.stats.unbuffered_sinks
        ));
    }
    if report.stats.max_buffer_fanout > MAX_BUFFER_FANOUT {
        report.warnings.push(format!(
            "clock buffer fan-out {} exceeds {MAX_BUFFER_FANOUT}",
            report.stats.max_buffer_fanout
        ));
    }
    if report.stats.tree_depth > MAX_TREE_DEPTH {
        report
            .warnings
            .push(format!("clock tree depth {} exceeds {MAX_TREE_DEPTH}", report.stats.tree_depth));
    }
}

/// Checks that `node` hangs off `driver` and recurses into its children.
fn check_node(
    node: &ClockTreeNode,
    driver: NetBit,
    netlist: &Netlist,
    cts: &CtsConfig,
    reached: &mut HashSet<CellId>,
    report: &mut EcoValidationReport,
) {
    match node {
        ClockTreeNode::Sink { cell, .. } => {
            reached.insert(*cell);
            let cell = netlist.cell(*cell);
            let actual = clock_bit(cell, cts);
            if actual != Some(driver) {
                report.errors.push(format!(
                    "clock pin of '{}' is on {}, expected net {driver}",
                    cell.name,
                    actual.map_or_else(|| "nothing".to_string(), |n| format!("net {n}"))
                ));
            }
        }
        ClockTreeNode::Buffer { name, children, .. } => {
            report.stats.clock_buffers += 1;
            report.stats.max_buffer_fanout = report.stats.max_buffer_fanout.max(children.len());
            let Some(buffer) = netlist.cell_by_name(name) else {
                report.errors.push(format!("clock buffer '{name}' is missing from the netlist"));
                return;
            };
            let pin = |port: &str| {
                buffer
                    .connections
                    .get(port)
                    .and_then(|bits| bits.first())
                    .and_then(|b| b.net())
            };
            if pin(cts.buffer_input.as_str()) != Some(driver) {
                report.errors.push(format!(
                    "clock buffer '{name}' input is not on net {driver}"
                ));
            }
            let Some(output) = pin(cts.buffer_output.as_str()) else {
                report.errors.push(format!("clock buffer '{name}' drives no net"));
                return;
            };
            for child in children {
                check_node(child, output, netlist, cts, reached, report);
            }
        }
    }
}

fn check_power_down(
    netlist: &Netlist,
    fabric: &Fabric,
    outcome: &EcoOutcome,
    eco: &EcoConfig,
    report: &mut EcoValidationReport,
) {
    let mut tie_nets: BTreeMap<NetBit, &str> = BTreeMap::new();
    for cell in netlist
        .cells()
        .iter()
        .filter(|c| fabric.roles().resolve(&c.cell_type) == SiteRole::Tie)
    {
        report.stats.tie_cells += 1;
        for port in [&eco.tie_low_port, &eco.tie_high_port] {
            match cell.connections.get(port.as_str()).and_then(|b| b.first()).and_then(|b| b.net()) {
                Some(net) => {
                    tie_nets.insert(net, cell.name.as_str());
                }
                None => report
                    .errors
                    .push(format!("tie cell '{}' has no '{port}' net", cell.name)),
            }
        }
    }

    let mut loads: BTreeMap<NetBit, usize> = BTreeMap::new();
    for cell in netlist.cells() {
        for net in cell.nets_with_direction(PortDirection::Input) {
            if tie_nets.contains_key(&net) {
                *loads.entry(net).or_insert(0) += 1;
            }
        }
    }

    for cell in netlist.cells().iter().filter(|c| is_parked(c)) {
        report.stats.parked_cells += 1;
        for (port, direction) in &cell.port_directions {
            if *direction != PortDirection::Input {
                continue;
            }
            match cell.connections.get(port).map(Vec::as_slice) {
                None | Some([]) => {
                    report.stats.floating_inputs += 1;
                    report
                        .errors
                        .push(format!("parked cell '{}' input {port} is floating", cell.name));
                }
                Some(bits) => {
                    if bits.iter().all(|b| matches!(b, Bit::Net(n) if tie_nets.contains_key(n))) {
                        report.stats.tied_inputs += 1;
                    } else {
                        report.errors.push(format!(
                            "parked cell '{}' input {port} is not on a tie net",
                            cell.name
                        ));
                    }
                }
            }
        }
    }

    if report.stats.parked_cells > 0 && tie_nets.is_empty() {
        report.errors.push(format!(
            "{} parked cells but no tie cell",
            report.stats.parked_cells
        ));
    }
    for (net, cell) in &tie_nets {
        if !loads.contains_key(net) && report.stats.parked_cells > 0 {
            report
                .warnings
                .push(format!("tie cell '{cell}' output net {net} drives nothing"));
        }
    }

    let pd = &outcome.power_down;
    if pd.untied > 0 {
        report.warnings.push(format!(
            "{} unused site(s) left floating for lack of a tie cell",
            pd.untied
        ));
    }
    if pd.unknown_port_sites > 0 {
        report.warnings.push(format!(
            "{} unused site(s) left unparked: no port list for {}",
            pd.unknown_port_sites,
            pd.unknown_types.join(", ")
        ));
    }
}
