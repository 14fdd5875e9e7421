//! Small hand-built situations with exactly known outcomes.
//!
//! Each test pins one behavior of a stage: the four-sink H-tree collapse,
//! an accepted improving swap, the active-low tie heuristic and the
//! identically-named clock pin.

use sasic_common::{CellId, NetBit, Point};
use sasic_conformance::{BUF, CONB, DFF, NAND};
use sasic_config::{CtsConfig, EcoConfig};
use sasic_db::{
    Bit, Fabric, LogicalCell, NetIndex, Netlist, PinTable, PlacementMap, Port, PortCatalog,
    PortDirection, RoleTable, Side, SitePool,
};
use sasic_diagnostics::DiagnosticSink;
use sasic_eco::{run_eco, synthesize_clock_tree, ClockTreeNode};
use sasic_place::placement::{AnnealBatch, SwapOutcome};
use sasic_place::{assign_ports, FixedPoints, HpwlEvaluator, Placement};

fn net(n: u32) -> Vec<Bit> {
    vec![Bit::Net(NetBit::from_raw(n))]
}

// ---------------------------------------------------------------------------
// Clock tree: four sinks around one buffer site
// ---------------------------------------------------------------------------

#[test]
fn four_corner_sinks_share_the_center_buffer() {
    let mut fabric = Fabric::new(RoleTable::new());
    let mut map = PlacementMap::new();
    let mut netlist = Netlist::new("top");
    let corners = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
    for (i, (x, y)) in corners.iter().enumerate() {
        let site = fabric
            .add_site(format!("FF{i}__DFF"), format!("FF{i}"), DFF, Point::from_um(*x, *y))
            .unwrap();
        netlist
            .add_cell(
                LogicalCell::new(format!("ff{i}"), DFF)
                    .with_port("CLK", PortDirection::Input, net(2))
                    .with_port("D", PortDirection::Input, net(10 + i as u32))
                    .with_port("Q", PortDirection::Output, net(20 + i as u32)),
            )
            .unwrap();
        map.insert(format!("ff{i}"), site).unwrap();
    }
    let center = fabric
        .add_site("B0__BUF", "B0", BUF, Point::from_um(5.0, 5.0))
        .unwrap();

    let mut pool = SitePool::new(&fabric);
    for (_, site) in map.iter() {
        pool.claim(site);
    }
    let catalog = PortCatalog::from_sources(&netlist, None);
    let sink = DiagnosticSink::new();
    let tree = synthesize_clock_tree(
        &mut netlist,
        &mut map,
        &mut pool,
        &catalog,
        &PinTable::new(),
        &CtsConfig::default(),
        &sink,
    )
    .unwrap()
    .unwrap();

    assert_eq!(tree.roots.len(), 1);
    match &tree.roots[0] {
        ClockTreeNode::Buffer { site, children, .. } => {
            assert_eq!(*site, center);
            assert_eq!(children.len(), 4);
            assert!(children.iter().all(|c| matches!(c, ClockTreeNode::Sink { .. })));
        }
        other => panic!("expected a buffer root, got {other:?}"),
    }
    assert_eq!(tree.report.stats.buffer_count, 1);
    assert_eq!(tree.report.buffers.len(), 1);
    assert_eq!(tree.report.stats.skew_estimate_um, 0.0);
    assert!(!pool.is_free(center));
    assert_eq!(sink.warning_count(), 0);

    // Every sink now hangs off the buffer output, the buffer off the clock.
    let buffer = netlist
        .cells()
        .iter()
        .find(|c| c.name.starts_with("cts_htree_"))
        .unwrap();
    assert_eq!(buffer.connections["A"], net(2));
    let out = buffer.connections["X"].clone();
    for i in 0..4 {
        let ff = netlist.cell_by_name(&format!("ff{i}")).unwrap();
        assert_eq!(ff.connections["CLK"], out);
    }
}

// ---------------------------------------------------------------------------
// Annealing: moving into a free site that halves the wire
// ---------------------------------------------------------------------------

#[test]
fn improving_refine_swap_is_accepted_unconditionally() {
    let mut fabric = Fabric::new(RoleTable::new());
    let s0 = fabric.add_site("s0", "T0", NAND, Point::from_um(0.0, 0.0)).unwrap();
    let s1 = fabric.add_site("s1", "T1", NAND, Point::from_um(10.0, 0.0)).unwrap();
    let s2 = fabric.add_site("s2", "T2", NAND, Point::from_um(5.0, 0.0)).unwrap();

    let mut netlist = Netlist::new("top");
    let a = netlist
        .add_cell(LogicalCell::new("a", NAND).with_port("Y", PortDirection::Output, net(2)))
        .unwrap();
    let b = netlist
        .add_cell(LogicalCell::new("b", NAND).with_port("A", PortDirection::Input, net(2)))
        .unwrap();

    let index = NetIndex::build(&netlist);
    let fixed = FixedPoints::new();
    let eval = HpwlEvaluator::new(&index, &fixed);
    let mut pool = SitePool::new(&fabric);
    let mut placement = Placement::new(&fabric, netlist.cell_count());
    for (cell, site) in [(a, s0), (b, s1)] {
        pool.claim(site);
        placement.set(cell, Some(site));
    }
    assert_eq!(eval.total(&placement), 10_000);

    let mut batch = AnnealBatch::new(&[a, b], &netlist, &mut placement, &mut pool, eval);
    let slot_a = batch.slot_of(a).unwrap();
    let spare = (0..batch.slot_count())
        .find(|i| batch.slot_site(*i) == s2)
        .unwrap();
    // The acceptance callback is only consulted for uphill moves.
    let outcome = batch.try_swap(slot_a, spare, |_| panic!("downhill moves need no draw"));
    assert_eq!(outcome, SwapOutcome::Accepted(-5_000));
    assert_eq!(batch.current_hpwl(), 5_000);
    batch.finish(&mut pool);

    assert_eq!(placement.site(a), Some(s2));
    assert_eq!(eval.total(&placement), 5_000);
    assert!(pool.is_free(s0));
    assert_eq!(placement.site(CellId::from_raw(1)), Some(s1));
}

// ---------------------------------------------------------------------------
// Power-down: active-low enable tied high
// ---------------------------------------------------------------------------

#[test]
fn active_low_enable_is_tied_high_without_leakage_table() {
    const EBUF: &str = "sky130_fd_sc_hd__ebufn_1";

    let mut fabric = Fabric::new(RoleTable::new());
    let used = fabric.add_site("U0__E", "U0", EBUF, Point::from_um(0.0, 0.0)).unwrap();
    fabric.add_site("U1__E", "U1", EBUF, Point::from_um(10.0, 0.0));
    fabric.add_site("K0__TIE", "K0", CONB, Point::from_um(5.0, 5.0));

    // The one used instance teaches the catalog the port list.
    let mut netlist = Netlist::new("top");
    netlist
        .add_cell(
            LogicalCell::new("u_drv", EBUF)
                .with_port("A", PortDirection::Input, net(2))
                .with_port("TE_B", PortDirection::Input, net(3))
                .with_port("Z", PortDirection::Output, net(4)),
        )
        .unwrap();
    let mut map = PlacementMap::new();
    map.insert("u_drv", used).unwrap();
    let mut pool = SitePool::new(&fabric);
    pool.claim(used);

    let sink = DiagnosticSink::new();
    let cts = CtsConfig {
        enabled: false,
        ..CtsConfig::default()
    };
    let outcome = run_eco(
        &mut netlist,
        &mut map,
        &mut pool,
        &PinTable::new(),
        None,
        &cts,
        &EcoConfig::default(),
        &sink,
    )
    .unwrap();

    let parked = netlist.cell_by_name("unused_U1__E").unwrap();
    let high = netlist.net_by_name("tie_high_0").unwrap();
    let low = netlist.net_by_name("tie_low_0").unwrap();
    assert_eq!(parked.connections["TE_B"], vec![Bit::Net(high)]);
    assert_eq!(parked.connections["A"], vec![Bit::Net(low)]);
    assert_eq!(outcome.power_down.tied_high, 1);
    assert_eq!(outcome.power_down.tied_low, 1);
    assert_eq!(outcome.power_down.from_leakage, 0);
    assert_eq!(pool.free_count(), 0);
}

// ---------------------------------------------------------------------------
// Ports: identically named clock pin beats a closer pin
// ---------------------------------------------------------------------------

#[test]
fn clock_port_takes_its_named_pin() {
    let mut netlist = Netlist::new("top");
    netlist
        .add_port(Port {
            name: "clk".into(),
            direction: PortDirection::Input,
            bits: net(2),
        })
        .unwrap();
    netlist
        .add_port(Port {
            name: "a".into(),
            direction: PortDirection::Input,
            bits: net(3),
        })
        .unwrap();

    let mut pins = PinTable::new();
    // Earliest in the physical walk order, so a plain walk would pick it.
    let near = pins.add("in_0", Side::W, "met3", Point::from_um(0.0, 0.0), PortDirection::Input, 0);
    let named = pins.add("clk", Side::N, "met2", Point::from_um(90.0, 100.0), PortDirection::Input, 7);

    let sink = DiagnosticSink::new();
    assign_ports(&netlist, &mut pins, &sink);

    assert_eq!(pins.pin(named).bound_net(), Some(NetBit::from_raw(2)));
    assert_eq!(pins.pin(near).bound_net(), Some(NetBit::from_raw(3)));
    assert_eq!(pins.pin_for_port("clk").map(|p| p.id), Some(named));
    assert_eq!(sink.warning_count(), 0);
}
