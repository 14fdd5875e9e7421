//! H-tree clock-tree synthesis.
//!
//! Sinks are the placed sequential cells on the clock net. The node set is
//! split into quadrants around its bounding-box center until at most
//! `leaf_size` nodes remain, and a buffer is drawn from the free buffer
//! sites nearest each branching point. The finished tree is flattened into
//! netlist edits: one new net per buffer output, one buffer cell per node,
//! and every sink's clock pin moved onto its parent's output.
//!
//! Running out of buffer sites is not fatal. The subtree that could not be
//! buffered is handed to its parent as a forest of loose children.

use crate::EcoError;
use sasic_common::geom::{centroid, dbu_to_um};
use sasic_common::{BBox, CellId, NetBit, Point, SiteId, SiteRole};
use sasic_config::CtsConfig;
use sasic_db::{
    Bit, Fabric, LogicalCell, Netlist, PinTable, PlacementMap, PortCatalog, PortDirection,
    SiteFilter, SitePool,
};
use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// No clock net could be identified; clock-tree synthesis is skipped.
pub const NO_CLOCK_NET: DiagnosticCode = DiagnosticCode::new(Category::ClockTree, 201);

/// Sinks are clocked by several nets; only the dominant one is buffered.
pub const MULTIPLE_CLOCK_NETS: DiagnosticCode = DiagnosticCode::new(Category::ClockTree, 202);

/// The buffer pool ran out; part of the tree is unbuffered.
pub const BUFFER_POOL_EXHAUSTED: DiagnosticCode = DiagnosticCode::new(Category::ClockTree, 203);

/// One node of a clock tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockTreeNode {
    /// A clocked cell.
    Sink {
        /// The sink cell.
        cell: CellId,
        /// Location of its site.
        pos: Point,
    },
    /// An inserted clock buffer.
    Buffer {
        /// Logical instance name.
        name: String,
        /// Site the buffer occupies.
        site: SiteId,
        /// Location of that site.
        pos: Point,
        /// Distance from the root, in buffer levels.
        level: u32,
        /// Driven nodes.
        children: Vec<ClockTreeNode>,
    },
}

impl ClockTreeNode {
    /// Location of the node.
    pub fn pos(&self) -> Point {
        match self {
            ClockTreeNode::Sink { pos, .. } | ClockTreeNode::Buffer { pos, .. } => *pos,
        }
    }

    /// Sinks below (and including) this node.
    pub fn sink_count(&self) -> usize {
        match self {
            ClockTreeNode::Sink { .. } => 1,
            ClockTreeNode::Buffer { children, .. } => children.iter().map(Self::sink_count).sum(),
        }
    }

    /// Buffers below (and including) this node.
    pub fn buffer_count(&self) -> usize {
        match self {
            ClockTreeNode::Sink { .. } => 0,
            ClockTreeNode::Buffer { children, .. } => {
                1 + children.iter().map(Self::buffer_count).sum::<usize>()
            }
        }
    }

    /// Most buffers on any path from this node down to a sink.
    pub fn depth(&self) -> usize {
        match self {
            ClockTreeNode::Sink { .. } => 0,
            ClockTreeNode::Buffer { children, .. } => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }

    /// Largest child count of any buffer below (and including) this node.
    pub fn max_fanout(&self) -> usize {
        match self {
            ClockTreeNode::Sink { .. } => 0,
            ClockTreeNode::Buffer { children, .. } => children
                .iter()
                .map(Self::max_fanout)
                .max()
                .unwrap_or(0)
                .max(children.len()),
        }
    }
}

/// A point in microns, as written to the tree description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Xy {
    /// X in microns.
    pub x: f64,
    /// Y in microns.
    pub y: f64,
}

impl From<Point> for Xy {
    fn from(p: Point) -> Self {
        Self {
            x: p.x_um(),
            y: p.y_um(),
        }
    }
}

/// A sink in the tree description.
#[derive(Debug, Clone, Serialize)]
pub struct SinkEntry {
    /// Cell name.
    pub name: String,
    /// X in microns.
    pub x: f64,
    /// Y in microns.
    pub y: f64,
}

/// A buffer in the tree description.
#[derive(Debug, Clone, Serialize)]
pub struct BufferEntry {
    /// Logical name.
    pub name: String,
    /// Fabric site name.
    pub physical_name: String,
    /// X in microns.
    pub x: f64,
    /// Y in microns.
    pub y: f64,
    /// Buffer level, 0 at the root.
    pub level: u32,
}

/// A parent-to-child edge in the tree description.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    /// Driver location.
    pub from: Xy,
    /// Driven location.
    pub to: Xy,
}

/// The external clock pin feeding the tree.
#[derive(Debug, Clone, Serialize)]
pub struct ClockPinEntry {
    /// Pin name.
    pub name: String,
    /// X in microns.
    pub x: f64,
    /// Y in microns.
    pub y: f64,
}

/// Structure counters for the synthesized tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClockTreeStats {
    /// Clocked cells driven by the tree.
    pub sink_count: usize,
    /// Buffers inserted.
    pub buffer_count: usize,
    /// Largest fan-out of the clock net or any buffer.
    pub max_fanout: usize,
    /// Most buffers between the clock net and a sink.
    pub depth: usize,
    /// Spread of root-to-sink Manhattan path lengths, in microns.
    pub skew_estimate_um: f64,
    /// Nodes driven straight from the clock net.
    pub roots: usize,
}

/// The tree description handed to visualization.
#[derive(Debug, Clone, Serialize)]
pub struct ClockTreeReport {
    /// Name of the buffered clock net.
    pub clock_net: String,
    /// Every sink, in cell order.
    pub sinks: Vec<SinkEntry>,
    /// Every buffer, in pre-order.
    pub buffers: Vec<BufferEntry>,
    /// Parent-to-child edges, including pin-to-root edges.
    pub connections: Vec<Connection>,
    /// The pin bound to the clock net, if any.
    pub clock_pin: Option<ClockPinEntry>,
    /// Structure counters.
    pub stats: ClockTreeStats,
}

/// A synthesized clock tree.
#[derive(Debug, Clone)]
pub struct ClockTree {
    /// The original clock net, now driving only the roots.
    pub clock_net: NetBit,
    /// Nodes driven directly by the clock net.
    pub roots: Vec<ClockTreeNode>,
    /// Tree description.
    pub report: ClockTreeReport,
}

/// Builds an H-tree over the clock sinks and rewrites `netlist` to use it.
///
/// Buffers are claimed from `pool` and recorded in `map`. Returns `None`
/// when no clock net or no placed sink was found.
#[allow(clippy::too_many_arguments)]
pub fn synthesize_clock_tree(
    netlist: &mut Netlist,
    map: &mut PlacementMap,
    pool: &mut SitePool<'_>,
    catalog: &PortCatalog,
    pins: &PinTable,
    config: &CtsConfig,
    sink: &DiagnosticSink,
) -> Result<Option<ClockTree>, EcoError> {
    let fabric = pool.fabric();
    let Some(clock_net) = identify_clock_net(netlist, fabric, config, sink) else {
        return Ok(None);
    };

    let sinks = collect_sinks(netlist, fabric, map, clock_net, config);
    if sinks.is_empty() {
        return Ok(None);
    }

    let types = buffer_types(fabric, catalog, config);
    let mut builder = HTreeBuilder {
        pool,
        buffer_types: &types,
        leaf_size: config.leaf_size.max(2),
        seq: 0,
        exhausted: 0,
    };
    let roots = builder.build(sinks.clone(), 0);
    if builder.exhausted > 0 {
        sink.emit(
            Diagnostic::warning(
                BUFFER_POOL_EXHAUSTED,
                format!(
                    "no buffer site for {} clock-tree branch point(s); subtrees left unbuffered",
                    builder.exhausted
                ),
            )
            .with_help("add buffer sites to the fabric or widen [cts].buffer_types"),
        );
    }

    for root in &roots {
        wire_node(root, clock_net, netlist, map, fabric, config)?;
    }

    let report = describe(&roots, &sinks, clock_net, netlist, fabric, pins, config);
    Ok(Some(ClockTree {
        clock_net,
        roots,
        report,
    }))
}

pub(crate) fn is_sink(fabric: &Fabric, cell: &LogicalCell) -> bool {
    fabric.roles().resolve(&cell.cell_type) == SiteRole::Sink
}

pub(crate) fn clock_bit(cell: &LogicalCell, config: &CtsConfig) -> Option<NetBit> {
    cell.connections
        .get(&config.clock_port)
        .and_then(|bits| bits.first())
        .and_then(|b| b.net())
}

/// Picks the clock net: the configured name, else the net most sinks share.
fn identify_clock_net(
    netlist: &Netlist,
    fabric: &Fabric,
    config: &CtsConfig,
    sink: &DiagnosticSink,
) -> Option<NetBit> {
    if let Some(name) = &config.clock_net {
        let net = netlist.net_by_name(name);
        if net.is_none() {
            sink.emit(
                Diagnostic::warning(NO_CLOCK_NET, format!("clock net '{name}' not found"))
                    .with_note("clock-tree synthesis skipped"),
            );
        }
        return net;
    }

    let mut counts: BTreeMap<NetBit, usize> = BTreeMap::new();
    for cell in netlist.cells().iter().filter(|c| is_sink(fabric, c)) {
        if let Some(net) = clock_bit(cell, config) {
            *counts.entry(net).or_insert(0) += 1;
        }
    }
    let Some((&net, &count)) = counts.iter().max_by_key(|(n, c)| (**c, Reverse(**n))) else {
        sink.emit(
            Diagnostic::warning(
                NO_CLOCK_NET,
                format!("no sequential cell has a '{}' connection", config.clock_port),
            )
            .with_note("clock-tree synthesis skipped"),
        );
        return None;
    };
    if counts.len() > 1 {
        sink.emit(
            Diagnostic::warning(
                MULTIPLE_CLOCK_NETS,
                format!("{} clock nets drive sinks; buffering net {net}", counts.len()),
            )
            .with_note(format!("net {net} clocks {count} sinks"))
            .with_help("set [cts].clock_net to choose explicitly"),
        );
    }
    Some(net)
}

fn collect_sinks(
    netlist: &Netlist,
    fabric: &Fabric,
    map: &PlacementMap,
    clock_net: NetBit,
    config: &CtsConfig,
) -> Vec<ClockTreeNode> {
    netlist
        .cells()
        .iter()
        .filter(|c| is_sink(fabric, c) && clock_bit(c, config) == Some(clock_net))
        .filter_map(|c| {
            let site = map.site_of(&c.name)?;
            Some(ClockTreeNode::Sink {
                cell: c.id,
                pos: fabric.site(site).pos,
            })
        })
        .collect()
}

/// Fabric buffer types usable in the tree.
///
/// A type whose port list names its outputs must expose the configured
/// input and output pins, which rules out inverters. Leakage-derived lists
/// carry inputs only and are checked for the input pin alone.
fn buffer_types(fabric: &Fabric, catalog: &PortCatalog, config: &CtsConfig) -> Vec<String> {
    fabric
        .cell_types()
        .filter(|t| fabric.roles().resolve(t) == SiteRole::Buffer)
        .filter(|t| config.buffer_types.is_empty() || config.buffer_types.iter().any(|b| b == t))
        .filter(|t| match catalog.ports(t) {
            Some(ports) if ports.values().any(|d| *d == PortDirection::Output) => {
                catalog.has_pins(t, &config.buffer_input, &config.buffer_output)
            }
            Some(ports) => ports.get(&config.buffer_input) == Some(&PortDirection::Input),
            None => true,
        })
        .map(str::to_string)
        .collect()
}

struct HTreeBuilder<'a, 'f> {
    pool: &'a mut SitePool<'f>,
    buffer_types: &'a [String],
    leaf_size: usize,
    seq: usize,
    exhausted: usize,
}

impl HTreeBuilder<'_, '_> {
    fn build(&mut self, nodes: Vec<ClockTreeNode>, level: u32) -> Vec<ClockTreeNode> {
        if nodes.len() <= 1 {
            return nodes;
        }
        if nodes.len() <= self.leaf_size {
            let points: Vec<Point> = nodes.iter().map(ClockTreeNode::pos).collect();
            let target = centroid(&points).unwrap_or_default();
            return self.buffer_over(nodes, target, level);
        }

        let Some(bbox) = BBox::of_points(nodes.iter().map(ClockTreeNode::pos)) else {
            return nodes;
        };
        let (cx2, cy2) = bbox.center2();
        let total = nodes.len();
        // NE, NW, SE, SW; a node on a center line goes west or south.
        let mut quadrants: [Vec<ClockTreeNode>; 4] = Default::default();
        for node in nodes {
            let p = node.pos();
            let q = match (2 * p.x > cx2, 2 * p.y > cy2) {
                (true, true) => 0,
                (false, true) => 1,
                (true, false) => 2,
                (false, false) => 3,
            };
            quadrants[q].push(node);
        }

        let groups: Vec<Vec<ClockTreeNode>> = if quadrants.iter().any(|q| q.len() == total) {
            // Coincident nodes never split; cut them into leaf-sized runs.
            let all: Vec<ClockTreeNode> = quadrants.into_iter().flatten().collect();
            all.chunks(self.leaf_size).map(<[_]>::to_vec).collect()
        } else {
            quadrants.into_iter().filter(|q| !q.is_empty()).collect()
        };

        let mut children = Vec::new();
        for group in groups {
            children.extend(self.build(group, level + 1));
        }
        self.buffer_over(children, bbox.center(), level)
    }

    fn buffer_over(
        &mut self,
        children: Vec<ClockTreeNode>,
        target: Point,
        level: u32,
    ) -> Vec<ClockTreeNode> {
        let site = if self.buffer_types.is_empty() {
            None
        } else {
            self.pool
                .take_nearest(target, SiteFilter::RoleAmong(SiteRole::Buffer, self.buffer_types))
        };
        let Some(site) = site else {
            self.exhausted += 1;
            return children;
        };
        let name = format!("cts_htree_{level}_{}", self.seq);
        self.seq += 1;
        vec![ClockTreeNode::Buffer {
            name,
            site,
            pos: self.pool.fabric().site(site).pos,
            level,
            children,
        }]
    }
}

fn wire_node(
    node: &ClockTreeNode,
    input: NetBit,
    netlist: &mut Netlist,
    map: &mut PlacementMap,
    fabric: &Fabric,
    config: &CtsConfig,
) -> Result<(), EcoError> {
    match node {
        ClockTreeNode::Sink { cell, .. } => {
            netlist.redirect_port(*cell, &config.clock_port, vec![Bit::from(input)])?;
        }
        ClockTreeNode::Buffer {
            name,
            site,
            children,
            ..
        } => {
            let output = netlist.alloc_net(format!("cts_net_{}", netlist.next_net()))?;
            let s = fabric.site(*site);
            netlist.add_cell(
                LogicalCell::new(name, &s.cell_type)
                    .with_port(&config.buffer_input, PortDirection::Input, vec![Bit::from(input)])
                    .with_port(&config.buffer_output, PortDirection::Output, vec![Bit::from(output)])
                    .with_attribute("physical_name", s.name.clone()),
            )?;
            map.insert(name.clone(), *site)?;
            for child in children {
                wire_node(child, output, netlist, map, fabric, config)?;
            }
        }
    }
    Ok(())
}

fn describe(
    roots: &[ClockTreeNode],
    sinks: &[ClockTreeNode],
    clock_net: NetBit,
    netlist: &Netlist,
    fabric: &Fabric,
    pins: &PinTable,
    config: &CtsConfig,
) -> ClockTreeReport {
    let clock_name = config.clock_net.clone().unwrap_or_else(|| {
        netlist
            .net_names()
            .iter()
            .find(|(_, n)| n.bits == [Bit::from(clock_net)])
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| format!("net_{clock_net}"))
    });

    let sink_entries = sinks
        .iter()
        .filter_map(|node| match node {
            ClockTreeNode::Sink { cell, pos } => Some(SinkEntry {
                name: netlist.cell(*cell).name.clone(),
                x: pos.x_um(),
                y: pos.y_um(),
            }),
            ClockTreeNode::Buffer { .. } => None,
        })
        .collect();

    let pin = pins
        .pins()
        .iter()
        .find(|p| p.bound_net() == Some(clock_net));

    let mut buffers = Vec::new();
    let mut connections = Vec::new();
    let mut path_lengths = Vec::new();
    for root in roots {
        let start = match pin {
            Some(pin) => {
                connections.push(Connection {
                    from: pin.pos.into(),
                    to: root.pos().into(),
                });
                pin.pos.manhattan(root.pos())
            }
            None => 0,
        };
        collect(root, start, fabric, &mut buffers, &mut connections, &mut path_lengths);
    }

    let skew = match (path_lengths.iter().max(), path_lengths.iter().min()) {
        (Some(max), Some(min)) => dbu_to_um(max - min),
        _ => 0.0,
    };
    let stats = ClockTreeStats {
        sink_count: roots.iter().map(ClockTreeNode::sink_count).sum(),
        buffer_count: roots.iter().map(ClockTreeNode::buffer_count).sum(),
        max_fanout: roots
            .iter()
            .map(ClockTreeNode::max_fanout)
            .max()
            .unwrap_or(0)
            .max(roots.len()),
        depth: roots.iter().map(ClockTreeNode::depth).max().unwrap_or(0),
        skew_estimate_um: skew,
        roots: roots.len(),
    };

    ClockTreeReport {
        clock_net: clock_name,
        sinks: sink_entries,
        buffers,
        connections,
        clock_pin: pin.map(|p| ClockPinEntry {
            name: p.name.clone(),
            x: p.pos.x_um(),
            y: p.pos.y_um(),
        }),
        stats,
    }
}

fn collect(
    node: &ClockTreeNode,
    length: i64,
    fabric: &Fabric,
    buffers: &mut Vec<BufferEntry>,
    connections: &mut Vec<Connection>,
    path_lengths: &mut Vec<i64>,
) {
    match node {
        ClockTreeNode::Sink { .. } => path_lengths.push(length),
        ClockTreeNode::Buffer {
            name,
            site,
            pos,
            level,
            children,
        } => {
            buffers.push(BufferEntry {
                name: name.clone(),
                physical_name: fabric.site(*site).name.clone(),
                x: pos.x_um(),
                y: pos.y_um(),
                level: *level,
            });
            for child in children {
                connections.push(Connection {
                    from: (*pos).into(),
                    to: child.pos().into(),
                });
                let edge = pos.manhattan(child.pos());
                collect(child, length + edge, fabric, buffers, connections, path_lengths);
            }
        }
    }
}
