//! `sasic eco`: clock-tree synthesis and power-down on a saved placement.
//!
//! Restores the placement from a map file, re-binds ports to pins so the
//! clock pin is known, runs the enabled passes and writes the tree
//! description, the final netlist and the final map.

use std::path::PathBuf;

use sasic_db::SitePool;
use sasic_diagnostics::DiagnosticSink;
use sasic_place::{assign_ports, load_map, restore_placement};

use crate::pipeline::{
    apply_overrides, eco_stage, finish_run, load_inputs, placement_hpwl, validate_stage,
    write_eco_outputs, RunSummary,
};
use crate::{EcoArgs, GlobalArgs};

/// Runs the `sasic eco` command.
///
/// Returns exit code 0 on success, 1 when an error diagnostic was raised or
/// `--strict` is set and validation failed.
pub fn run(args: &EcoArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let mut inputs = load_inputs(global, &sink)?;
    apply_overrides(&mut inputs.config, None, false, args.output_dir.as_deref());
    if args.no_cts {
        inputs.config.cts.enabled = false;
    }
    if args.no_power_down {
        inputs.config.eco.enabled = false;
    }
    let config = &inputs.config;
    let name = config.design.name.as_str();
    let out_dir = config.output_dir();

    let map_path = match args.map {
        Some(ref path) => PathBuf::from(path),
        None => out_dir.join(format!("{name}.map")),
    };

    assign_ports(&inputs.netlist, &mut inputs.pins, &sink);
    let mut pool = SitePool::new(&inputs.fabric);
    let parsed = load_map(&map_path, &inputs.fabric, &sink)?;
    let placement = restore_placement(&parsed, &inputs.netlist, &mut pool, &sink);
    let mut map = placement.to_map(&inputs.netlist)?;
    let hpwl = placement_hpwl(&inputs.netlist, &inputs.pins, &placement);

    if !global.quiet {
        eprintln!(
            "  Restored {} cells from {} (HPWL {:.3} um)",
            map.len(),
            map_path.display(),
            sasic_common::geom::dbu_to_um(hpwl)
        );
    }

    let report = validate_stage(&inputs.netlist, &inputs.fabric, &map, &inputs.pins, global);
    let mut summary = RunSummary::new(name, &inputs.netlist, &inputs.fabric);
    summary.hpwl_um = sasic_common::geom::dbu_to_um(hpwl);
    summary.set_validation(&report);

    let mut netlist = inputs.netlist;
    let (outcome, eco_report) = eco_stage(
        &mut netlist,
        &mut map,
        &mut pool,
        &inputs.pins,
        inputs.leakage.as_ref(),
        config,
        &sink,
        global,
    )?;

    write_eco_outputs(&out_dir, name, &netlist, &map, &inputs.fabric, &outcome, global)?;
    summary.set_eco(&outcome, &eco_report, &netlist, config.eco.enabled);
    summary.finish(&out_dir, &inputs.fabric, &pool, &sink, global)?;

    Ok(finish_run(
        &sink,
        args.format,
        &out_dir,
        args.strict && !(report.is_ok() && eco_report.is_ok()),
        global,
    ))
}
