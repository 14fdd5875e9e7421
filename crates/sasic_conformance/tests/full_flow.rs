//! End-to-end flow over files on disk: the inputs are written in the formats
//! the loaders read, loaded back, run through placement and the ECO, and the
//! artifacts written out.

use std::fs;
use std::path::Path;

use sasic_common::SiteRole;
use sasic_config::load_config;
use sasic_conformance::{
    fabric_json, leakage_json, pins_json, pipeline_netlist, run_flow, FlowRun, CONB, TILE_PITCH_UM,
};
use sasic_db::load::{load_fabric, load_leakage, load_netlist, load_pins};
use sasic_db::{yosys, Fabric, RoleTable};
use sasic_diagnostics::DiagnosticSink;
use sasic_eco::write_verilog;
use sasic_place::{load_map, validate_placement, write_map, write_placement_csv};

const COLS: usize = 6;
const ROWS: usize = 4;
const WIDTH: usize = 4;
const DEPTH: usize = 2;

fn write_inputs(dir: &Path, seed: u64) {
    let die = (COLS as f64 * TILE_PITCH_UM, ROWS as f64 * TILE_PITCH_UM);
    let netlist = yosys::write_netlist(&pipeline_netlist(WIDTH, DEPTH)).unwrap();
    fs::write(dir.join("pipeline.json"), netlist).unwrap();
    fs::write(dir.join("fabric.json"), fabric_json(COLS, ROWS)).unwrap();
    fs::write(dir.join("pins.json"), pins_json(WIDTH, die.0, die.1)).unwrap();
    fs::write(dir.join("leakage.json"), leakage_json()).unwrap();

    let path = |f: &str| dir.join(f).display().to_string().replace('\\', "/");
    let config = format!(
        r#"[design]
name = "pipeline"
netlist = "{}"
fabric = "{}"
pins = "{}"
leakage = "{}"
output_dir = "{}"

[placement]
seed = {seed}

[cts]
buffer_types = ["sky130_fd_sc_hd__clkbuf_4"]
"#,
        path("pipeline.json"),
        path("fabric.json"),
        path("pins.json"),
        path("leakage.json"),
        path("out"),
    );
    fs::write(dir.join("sasic.toml"), config).unwrap();
}

fn run_from_disk(dir: &Path) -> (Fabric, FlowRun) {
    let config = load_config(dir).unwrap();
    let design = &config.design;
    let sink = DiagnosticSink::new();
    let netlist = load_netlist(&design.netlist, design.top.as_deref()).unwrap();
    let fabric = load_fabric(&design.fabric, RoleTable::with_overrides(config.roles.clone()), &sink)
        .unwrap();
    let pins = load_pins(&design.pins).unwrap();
    let leakage = load_leakage(design.leakage.as_ref().unwrap()).unwrap();
    assert_eq!(sink.warning_count(), 0);

    let run = run_flow(&fabric, netlist, pins, Some(&leakage), &config);
    (fabric, run)
}

#[test]
fn flow_from_files_uses_every_logic_site() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 42);
    let (fabric, run) = run_from_disk(dir.path());

    assert!(!run.diagnostics.iter().any(|d| d.severity.is_error()));
    assert_eq!(run.placement_map.len(), 2 * WIDTH * DEPTH);

    let report = validate_placement(&run.original, &fabric, &run.placement_map, &run.pins);
    assert!(report.is_ok(), "{:?}", report.errors);

    // Logic and sink sites are all either placed or parked.
    let counts = sasic_eco::unused_by_role(&fabric, &{
        let mut pool = sasic_db::SitePool::new(&fabric);
        for (_, site) in run.final_map.iter() {
            pool.claim(site);
        }
        pool
    });
    for role in [SiteRole::Logic, SiteRole::Sink] {
        assert_eq!(counts.get(&role).copied().unwrap_or(0), 0, "{role} sites left free");
    }

    let tree = run.eco.clock_tree.as_ref().unwrap();
    assert_eq!(tree.report.stats.sink_count, WIDTH * DEPTH);
    assert!(tree.report.stats.buffer_count > 0);
    assert_eq!(run.eco.power_down.tie_cells, 1);

    let checks = &run.eco_validation;
    assert!(checks.is_ok(), "{:?}", checks.errors);
    assert_eq!(checks.stats.sinks, WIDTH * DEPTH);
    assert_eq!(checks.stats.buffered_sinks + checks.stats.unbuffered_sinks, WIDTH * DEPTH);
    assert_eq!(checks.stats.floating_inputs, 0);
    assert_eq!(checks.stats.parked_cells, run.eco.power_down.parked);

    let tie = run.netlist.cell_by_name("tie_cell_0").unwrap();
    assert_eq!(tie.cell_type, CONB);
    assert_eq!(fabric.site(run.final_map.site_of("tie_cell_0").unwrap()).role, SiteRole::Tie);
}

#[test]
fn verilog_carries_the_eco_cells() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 42);
    let (_fabric, run) = run_from_disk(dir.path());

    let verilog = write_verilog(&run.netlist);
    assert!(verilog.starts_with("module pipeline"));
    assert!(verilog.contains("cts_htree_"));
    assert!(verilog.contains("tie_cell_0"));
    assert!(verilog.contains("unused_"));
    assert!(verilog.trim_end().ends_with("endmodule"));
    for cell in run.original.cells() {
        assert!(verilog.contains(&cell.name), "{} missing from Verilog", cell.name);
    }
}

#[test]
fn artifacts_reload_to_the_same_placement() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), 42);
    let (fabric, run) = run_from_disk(dir.path());

    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("pipeline.map"), write_map(&run.placement_map, &fabric)).unwrap();
    let csv = write_placement_csv(&run.placement_map, &fabric);
    fs::write(out.join("pipeline_placement.csv"), &csv).unwrap();

    assert_eq!(csv.lines().count(), run.placement_map.len() + 1);
    assert!(csv.starts_with("cell_name,site_id,x_um,y_um"));

    let sink = DiagnosticSink::new();
    let reloaded = load_map(&out.join("pipeline.map"), &fabric, &sink).unwrap();
    assert_eq!(reloaded, run.placement_map);
    assert_eq!(sink.warning_count(), 0);
}

#[test]
fn same_seed_reproduces_and_other_seeds_still_validate() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    write_inputs(a.path(), 7);
    write_inputs(b.path(), 7);
    let (_, first) = run_from_disk(a.path());
    let (_, second) = run_from_disk(b.path());
    assert_eq!(first.placement_map, second.placement_map);
    assert_eq!(first.hpwl, second.hpwl);
    assert_eq!(write_verilog(&first.netlist), write_verilog(&second.netlist));

    let c = tempfile::tempdir().unwrap();
    write_inputs(c.path(), 8);
    let (fabric, third) = run_from_disk(c.path());
    let report = validate_placement(&third.original, &fabric, &third.placement_map, &third.pins);
    assert!(report.is_ok(), "{:?}", report.errors);
}
