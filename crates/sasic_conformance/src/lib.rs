//! Conformance test helpers for the structured-ASIC flow.
//!
//! Provides synthetic fabrics, pin rings and netlists, in memory and as the
//! JSON files the loaders read, plus [`run_flow`], which drives placement,
//! clock-tree synthesis and the power-down ECO over them and returns
//! everything the integration tests assert on.

#![warn(missing_docs)]

use sasic_config::{load_config_from_str, FlowConfig};
use sasic_db::load::{parse_fabric, parse_leakage, parse_pins};
use sasic_db::{
    Bit, Fabric, LeakageTable, LogicalCell, NetName, Netlist, PinTable, PlacementMap, Port,
    PortDirection, RoleTable, SitePool,
};
use sasic_common::NetBit;
use sasic_diagnostics::{Diagnostic, DiagnosticSink};
use sasic_eco::{run_eco, validate_eco, EcoOutcome, EcoValidationReport};
use sasic_place::{run_placement, Levels};
use serde_json::json;

/// Two-input NAND, the logic cell of the fixtures.
pub const NAND: &str = "sky130_fd_sc_hd__nand2_1";
/// Flip-flop, the clock sink of the fixtures.
pub const DFF: &str = "sky130_fd_sc_hd__dfxtp_1";
/// Clock buffer (`A` in, `X` out).
pub const BUF: &str = "sky130_fd_sc_hd__clkbuf_4";
/// Inverter (`A` in, `Y` out).
pub const INV: &str = "sky130_fd_sc_hd__inv_1";
/// Tie cell (`LO`/`HI` out).
pub const CONB: &str = "sky130_fd_sc_hd__conb_1";
/// Decoupling capacitor, physical only.
pub const DECAP: &str = "sky130_fd_sc_hd__decap_4";

/// Template name, cell type and offset in microns of every cell in a tile.
pub const TILE_CELLS: &[(&str, &str, f64, f64)] = &[
    ("NAND", NAND, 0.0, 0.0),
    ("DFF", DFF, 6.0, 0.0),
    ("BUF", BUF, 12.0, 0.0),
    ("INV", INV, 0.0, 10.0),
    ("TIE", CONB, 6.0, 10.0),
    ("DECAP", DECAP, 12.0, 10.0),
];

/// Tile pitch in microns.
pub const TILE_PITCH_UM: f64 = 20.0;

/// Fabric description JSON for a `cols` × `rows` grid of tiles.
pub fn fabric_json(cols: usize, rows: usize) -> String {
    let templates: serde_json::Map<String, serde_json::Value> = TILE_CELLS
        .iter()
        .map(|(template, cell_type, _, _)| (template.to_string(), json!(cell_type)))
        .collect();
    let mut tiles = serde_json::Map::new();
    for i in 0..cols {
        for j in 0..rows {
            let tile = format!("T{i}_{j}");
            let (x0, y0) = (i as f64 * TILE_PITCH_UM, j as f64 * TILE_PITCH_UM);
            let cells: Vec<serde_json::Value> = TILE_CELLS
                .iter()
                .map(|(template, _, dx, dy)| {
                    json!({
                        "name": format!("{tile}__{template}"),
                        "x_um": x0 + dx,
                        "y_um": y0 + dy,
                    })
                })
                .collect();
            tiles.insert(tile, json!({ "cells": cells }));
        }
    }
    json!({
        "die": {
            "width_um": cols as f64 * TILE_PITCH_UM,
            "height_um": rows as f64 * TILE_PITCH_UM,
        },
        "templates": templates,
        "tiles": tiles,
    })
    .to_string()
}

/// A `cols` × `rows` fabric built through the JSON loader.
pub fn grid_fabric(cols: usize, rows: usize) -> Fabric {
    let sink = DiagnosticSink::new();
    let fabric = parse_fabric(&fabric_json(cols, rows), RoleTable::new(), "grid", &sink)
        .expect("fixture fabric parses");
    assert_eq!(sink.warning_count(), 0, "fixture fabric is complete");
    fabric
}

/// Pin table JSON: `clk`, `din[i]` and a few spare inputs on the west edge,
/// `dout[i]` on the east edge of a die `width_um` × `height_um`.
pub fn pins_json(width: usize, width_um: f64, height_um: f64) -> String {
    let mut west: Vec<String> = vec!["clk".to_string()];
    west.extend((0..width).map(|i| format!("din[{i}]")));
    west.extend((0..2).map(|i| format!("gpio_in_{i}")));
    let east: Vec<String> = (0..width).map(|i| format!("dout[{i}]")).collect();

    let mut pins = Vec::new();
    for (side, x, names, direction) in [
        ("W", 0.0, &west, "input"),
        ("E", width_um, &east, "output"),
    ] {
        let step = height_um / (names.len() + 1) as f64;
        for (k, name) in names.iter().enumerate() {
            pins.push(json!({
                "name": name,
                "side": side,
                "layer": "met3",
                "x_um": x,
                "y_um": step * (k + 1) as f64,
                "direction": direction,
                "track_idx": k,
            }));
        }
    }
    json!({ "pins": pins }).to_string()
}

/// The pin ring of [`pins_json`], parsed.
pub fn pin_ring(width: usize, width_um: f64, height_um: f64) -> PinTable {
    parse_pins(&pins_json(width, width_um, height_um), "pins").expect("fixture pins parse")
}

/// Leakage vectors for the fixture cell types.
pub fn leakage_json() -> String {
    json!({
        NAND: { "A": 1, "B": 0 },
        BUF: { "A": 0 },
        INV: { "A": 1 },
    })
    .to_string()
}

/// The table of [`leakage_json`], parsed.
pub fn leakage_table() -> LeakageTable {
    parse_leakage(&leakage_json(), "leakage").expect("fixture leakage parses")
}

/// A `width`-bit, `depth`-stage pipeline.
///
/// Every stage mixes each bit with its neighbor through a NAND and registers
/// the result, so the netlist has `2 * width * depth` cells, one clock net
/// feeding `width * depth` flip-flops, and a level structure that alternates
/// NAND and DFF.
pub fn pipeline_netlist(width: usize, depth: usize) -> Netlist {
    let mut nl = Netlist::new("pipeline");
    let mut next = 2u32;
    let mut fresh = || {
        let n = NetBit::from_raw(next);
        next += 1;
        n
    };

    let clk = fresh();
    let din: Vec<NetBit> = (0..width).map(|_| fresh()).collect();
    let mut cur = din.clone();
    for s in 0..depth {
        let mut q = Vec::with_capacity(width);
        for b in 0..width {
            let y = fresh();
            let out = fresh();
            nl.add_cell(
                LogicalCell::new(format!("u_nand_{s}_{b}"), NAND)
                    .with_port("A", PortDirection::Input, vec![Bit::Net(cur[b])])
                    .with_port("B", PortDirection::Input, vec![Bit::Net(cur[(b + 1) % width])])
                    .with_port("Y", PortDirection::Output, vec![Bit::Net(y)]),
            )
            .expect("unique cell name");
            nl.add_cell(
                LogicalCell::new(format!("u_ff_{s}_{b}"), DFF)
                    .with_port("CLK", PortDirection::Input, vec![Bit::Net(clk)])
                    .with_port("D", PortDirection::Input, vec![Bit::Net(y)])
                    .with_port("Q", PortDirection::Output, vec![Bit::Net(out)]),
            )
            .expect("unique cell name");
            q.push(out);
        }
        cur = q;
    }

    let bus = |bits: &[NetBit]| bits.iter().map(|n| Bit::Net(*n)).collect::<Vec<_>>();
    for (name, direction, bits) in [
        ("clk", PortDirection::Input, vec![Bit::Net(clk)]),
        ("din", PortDirection::Input, bus(&din)),
        ("dout", PortDirection::Output, bus(&cur)),
    ] {
        nl.add_port(Port {
            name: name.to_string(),
            direction,
            bits: bits.clone(),
        })
        .expect("unique port name");
        nl.add_net_name(
            name,
            NetName {
                bits,
                ..NetName::default()
            },
        )
        .expect("unique net name");
    }
    nl
}

/// A flow configuration with default knobs and placeholder paths.
///
/// Clock buffers are restricted to [`BUF`]; the leakage table also gives
/// [`INV`] an input list, which would otherwise make it a candidate.
pub fn flow_config() -> FlowConfig {
    load_config_from_str(
        r#"
[design]
name = "pipeline"
netlist = "pipeline.json"
fabric = "fabric.json"
pins = "pins.json"

[cts]
buffer_types = ["sky130_fd_sc_hd__clkbuf_4"]
"#,
    )
    .expect("fixture config parses")
}

/// Everything one run of the flow produced.
#[derive(Debug)]
pub struct FlowRun {
    /// The netlist before any ECO edit.
    pub original: Netlist,
    /// The netlist after CTS and power-down.
    pub netlist: Netlist,
    /// Pins with their port bindings.
    pub pins: PinTable,
    /// Placement as produced by the placer.
    pub placement_map: PlacementMap,
    /// Placement after the ECO added its cells.
    pub final_map: PlacementMap,
    /// Global HPWL after placement, in database units.
    pub hpwl: i64,
    /// Topological levels.
    pub levels: Levels,
    /// CTS and power-down results.
    pub eco: EcoOutcome,
    /// Checks over the post-ECO netlist.
    pub eco_validation: EcoValidationReport,
    /// Fabric sites still free at the end.
    pub free_sites: usize,
    /// Fabric sites claimed at the end.
    pub used_sites: usize,
    /// Every diagnostic emitted.
    pub diagnostics: Vec<Diagnostic>,
}

impl FlowRun {
    /// Number of diagnostics carrying `code`.
    pub fn count(&self, code: sasic_diagnostics::DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }
}

/// Runs placement, CTS and the power-down ECO over one shared site pool.
pub fn run_flow(
    fabric: &Fabric,
    netlist: Netlist,
    mut pins: PinTable,
    leakage: Option<&LeakageTable>,
    config: &FlowConfig,
) -> FlowRun {
    let sink = DiagnosticSink::new();
    let mut pool = SitePool::new(fabric);
    let result = run_placement(&netlist, &mut pins, &mut pool, &config.placement, &sink)
        .expect("placement keeps its invariants");

    let original = netlist.clone();
    let mut netlist = netlist;
    let mut final_map = result.placement_map.clone();
    let eco = run_eco(
        &mut netlist,
        &mut final_map,
        &mut pool,
        &pins,
        leakage,
        &config.cts,
        &config.eco,
        &sink,
    )
    .expect("ECO edits apply");
    let eco_validation = validate_eco(&netlist, fabric, &eco, &config.cts, &config.eco);

    FlowRun {
        original,
        netlist,
        pins,
        placement_map: result.placement_map,
        final_map,
        hpwl: result.hpwl,
        levels: result.levels,
        eco,
        eco_validation,
        free_sites: pool.free_count(),
        used_sites: pool.used_count(),
        diagnostics: sink.take_all(),
    }
}

/// Runs [`run_flow`] over the standard fixtures: a `width`-bit,
/// `depth`-stage pipeline on a `cols` × `rows` grid with the leakage table.
pub fn run_standard_flow(
    width: usize,
    depth: usize,
    cols: usize,
    rows: usize,
    config: &FlowConfig,
) -> (Fabric, FlowRun) {
    let fabric = grid_fabric(cols, rows);
    let die = (cols as f64 * TILE_PITCH_UM, rows as f64 * TILE_PITCH_UM);
    let pins = pin_ring(width, die.0, die.1);
    let leakage = leakage_table();
    let run = run_flow(
        &fabric,
        pipeline_netlist(width, depth),
        pins,
        Some(&leakage),
        config,
    );
    (fabric, run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_fabric_has_every_template() {
        let fabric = grid_fabric(3, 2);
        assert_eq!(fabric.site_count(), 6 * TILE_CELLS.len());
        assert!(fabric.site_by_name("T2_1__DECAP").is_some());
        assert_eq!(fabric.sites_of_type(NAND).len(), 6);
    }

    #[test]
    fn pipeline_shape() {
        let nl = pipeline_netlist(4, 3);
        assert_eq!(nl.cell_count(), 24);
        assert_eq!(nl.port("din").map(|p| p.bits.len()), Some(4));
        assert_eq!(nl.net_by_name("clk"), Some(NetBit::from_raw(2)));
    }

    #[test]
    fn pin_ring_counts() {
        let pins = pin_ring(4, 100.0, 100.0);
        // clk + 4 din + 2 spare, 4 dout
        assert_eq!(pins.len(), 11);
    }
}
