//! `sasic flow`: placement followed by CTS and the power-down ECO.
//!
//! One site pool is threaded through every stage, so the ECO passes only
//! see the sites placement left free.

use sasic_db::SitePool;
use sasic_diagnostics::DiagnosticSink;

use crate::pipeline::{
    apply_overrides, eco_stage, finish_run, load_inputs, place_stage, validate_stage,
    write_eco_outputs, write_placement_outputs, RunSummary,
};
use crate::{FlowArgs, GlobalArgs};

/// Runs the `sasic flow` command.
///
/// Returns exit code 0 on success, 1 when an error diagnostic was raised or
/// `--strict` is set and validation failed.
pub fn run(args: &FlowArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let mut inputs = load_inputs(global, &sink)?;
    apply_overrides(
        &mut inputs.config,
        args.seed,
        args.greedy_only,
        args.output_dir.as_deref(),
    );
    if args.no_cts {
        inputs.config.cts.enabled = false;
    }
    if args.no_power_down {
        inputs.config.eco.enabled = false;
    }
    let config = &inputs.config;
    let name = config.design.name.as_str();
    let out_dir = config.output_dir();

    // Placement
    let mut pool = SitePool::new(&inputs.fabric);
    let (result, placement_summary) = place_stage(
        &inputs.netlist,
        &mut inputs.pins,
        &mut pool,
        config,
        &sink,
        global,
    )?;
    let report = validate_stage(
        &inputs.netlist,
        &inputs.fabric,
        &result.placement_map,
        &inputs.pins,
        global,
    );
    write_placement_outputs(&out_dir, name, &result.placement_map, &inputs.fabric, global)?;

    let mut summary = RunSummary::new(name, &inputs.netlist, &inputs.fabric);
    summary.hpwl_um = sasic_common::geom::dbu_to_um(result.hpwl);
    summary.placement = Some(placement_summary);
    summary.set_validation(&report);

    // CTS + power-down
    let mut map = result.placement_map;
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
