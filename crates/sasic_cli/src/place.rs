//! `sasic place`: placement only.
//!
//! Loads the inputs, binds ports to pins, levels and places the netlist,
//! then writes `<name>.map`, `<name>_placement.csv` and the run summary.

use sasic_db::SitePool;
use sasic_diagnostics::DiagnosticSink;

use crate::pipeline::{
    apply_overrides, finish_run, load_inputs, place_stage, validate_stage,
    write_placement_outputs, RunSummary,
};
use crate::{GlobalArgs, PlaceArgs};

/// Runs the `sasic place` command.
///
/// Returns exit code 0 on success, 1 when an error diagnostic was raised or
/// `--strict` is set and validation failed.
pub fn run(args: &PlaceArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let sink = DiagnosticSink::new();
    let mut inputs = load_inputs(global, &sink)?;
    apply_overrides(
        &mut inputs.config,
        args.seed,
        args.greedy_only,
        args.output_dir.as_deref(),
    );
    let config = &inputs.config;
    let name = config.design.name.as_str();
    let out_dir = config.output_dir();

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
    summary.finish(&out_dir, &inputs.fabric, &pool, &sink, global)?;

    Ok(finish_run(
        &sink,
        args.format,
        &out_dir,
        args.strict && !report.is_ok(),
        global,
    ))
}
