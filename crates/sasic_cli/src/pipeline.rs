//! Shared pipeline helpers for CLI commands.
//!
//! Contains the steps `place`, `eco` and `flow` have in common: config
//! discovery, input loading, the placement and ECO stages with their
//! progress output, artifact writing and the run summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sasic_common::geom::dbu_to_um;
use sasic_config::{FlowConfig, CONFIG_FILE_NAME};
use sasic_db::load::{load_fabric, load_leakage, load_netlist, load_pins};
use sasic_db::yosys::write_netlist;
use sasic_db::{
    Fabric, LeakageTable, NetIndex, Netlist, PinTable, PlacementMap, RoleTable, SitePool,
};
use sasic_diagnostics::{DiagnosticRenderer, DiagnosticSink, JsonRenderer, TerminalRenderer};
use sasic_eco::{
    run_eco, unused_by_role, validate_eco, write_verilog, ClockTreeStats, EcoOutcome,
    EcoValidationReport, EcoValidationStats, PowerDownReport,
};
use sasic_place::{
    run_placement, validate_placement, write_map, write_placement_csv, AnnealStats, FixedPoints,
    HpwlEvaluator, Placement, PlacementResult, ValidationReport, ValidationStats,
};
use serde::Serialize;

use crate::{GlobalArgs, ReportFormat};

/// Walks up from `start` looking for the nearest directory containing `sasic.toml`.
pub fn find_config(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the config file from global CLI args.
///
/// `--config` may name the file or its directory. Without it, the current
/// directory and its parents are searched.
pub fn resolve_config(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match global.config {
        Some(ref path) => Ok(PathBuf::from(path)),
        None => find_config(&std::env::current_dir()?),
    }
}

/// Everything read from disk before a run.
pub struct Inputs {
    /// Parsed flow configuration with paths rebased.
    pub config: FlowConfig,
    /// The synthesized netlist.
    pub netlist: Netlist,
    /// The fabric site table.
    pub fabric: Fabric,
    /// The I/O pin table, unbound.
    pub pins: PinTable,
    /// Leakage tie vectors, when configured.
    pub leakage: Option<LeakageTable>,
}

/// Loads the config and every input it names.
pub fn load_inputs(
    global: &GlobalArgs,
    sink: &DiagnosticSink,
) -> Result<Inputs, Box<dyn std::error::Error>> {
    let config_path = resolve_config(global)?;
    let config = sasic_config::load_config(&config_path)?;
    let design = &config.design;

    let netlist = load_netlist(&design.netlist, design.top.as_deref())?;
    let fabric = load_fabric(
        &design.fabric,
        RoleTable::with_overrides(config.roles.clone()),
        sink,
    )?;
    let pins = load_pins(&design.pins)?;
    let leakage = match design.leakage {
        Some(ref path) => Some(load_leakage(path)?),
        None => None,
    };

    if !global.quiet {
        eprintln!(
            "    Loaded {} ({} cells, {} sites, {} pins)",
            netlist.module_name,
            netlist.cell_count(),
            fabric.site_count(),
            pins.len()
        );
    }
    if global.verbose {
        for (role, count) in fabric.role_counts() {
            eprintln!("           {count:>7} {role} sites");
        }
        if let Some(ref table) = leakage {
            eprintln!("           {:>7} leakage vectors", table.len());
        }
    }

    Ok(Inputs {
        config,
        netlist,
        fabric,
        pins,
        leakage,
    })
}

/// Applies command-line overrides to the loaded configuration.
pub fn apply_overrides(
    config: &mut FlowConfig,
    seed: Option<u64>,
    greedy_only: bool,
    output_dir: Option<&str>,
) {
    if let Some(seed) = seed {
        config.placement.seed = seed;
    }
    if greedy_only {
        config.placement.greedy_only = true;
    }
    if let Some(dir) = output_dir {
        config.design.output_dir = Some(PathBuf::from(dir));
    }
}

/// Placement counters for the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementSummary {
    /// Port bits bound to pins.
    pub ports_bound: usize,
    /// Number of topological levels.
    pub levels: u32,
    /// Cells leveled by the cycle fallback.
    pub fallback_cells: usize,
    /// Annealing counters.
    pub anneal: AnnealStats,
}

/// Runs placement and reports progress.
pub fn place_stage<'f>(
    netlist: &Netlist,
    pins: &mut PinTable,
    pool: &mut SitePool<'f>,
    config: &FlowConfig,
    sink: &DiagnosticSink,
    global: &GlobalArgs,
) -> Result<(PlacementResult<'f>, PlacementSummary), Box<dyn std::error::Error>> {
    let result = run_placement(netlist, pins, pool, &config.placement, sink)?;

    if !global.quiet {
        eprintln!(
            "    Placed {} cells (HPWL {:.3} um)",
            result.placement.placed_count(),
            dbu_to_um(result.hpwl)
        );
    }
    if global.verbose {
        let a = &result.anneal;
        eprintln!(
            "           {} ports bound, {} levels, {} batches annealed",
            result.assignments.len(),
            result.levels.max_level().map_or(0, |l| l + 1),
            a.batches
        );
        eprintln!(
            "           {} moves: {} accepted, {} rejected, {} incompatible",
            a.steps, a.accepted, a.rejected, a.incompatible
        );
    }

    let summary = PlacementSummary {
        ports_bound: result.assignments.len(),
        levels: result.levels.max_level().map_or(0, |l| l + 1),
        fallback_cells: result.levels.fallback().len(),
        anneal: result.anneal,
    };
    Ok((result, summary))
}

/// Global HPWL of `placement` against the current pin bindings.
pub fn placement_hpwl(netlist: &Netlist, pins: &PinTable, placement: &Placement<'_>) -> i64 {
    let index = NetIndex::build(netlist);
    let fixed = FixedPoints::from_pins(pins);
    HpwlEvaluator::new(&index, &fixed).total(placement)
}

/// Validates `map` and reports any problems.
pub fn validate_stage(
    netlist: &Netlist,
    fabric: &Fabric,
    map: &PlacementMap,
    pins: &PinTable,
    global: &GlobalArgs,
) -> ValidationReport {
    let report = validate_placement(netlist, fabric, map, pins);
    if !global.quiet && !report.is_ok() {
        eprintln!(
            "warning: placement validation found {} error(s)",
            report.errors.len()
        );
    }
    if global.verbose {
        for e in &report.errors {
            eprintln!("           error: {e}");
        }
        for w in &report.warnings {
            eprintln!("           warning: {w}");
        }
    }
    report
}

/// Runs CTS and the power-down ECO, validates the result and reports
/// progress.
#[allow(clippy::too_many_arguments)]
pub fn eco_stage(
    netlist: &mut Netlist,
    map: &mut PlacementMap,
    pool: &mut SitePool<'_>,
    pins: &PinTable,
    leakage: Option<&LeakageTable>,
    config: &FlowConfig,
    sink: &DiagnosticSink,
    global: &GlobalArgs,
) -> Result<(EcoOutcome, EcoValidationReport), Box<dyn std::error::Error>> {
    let outcome = run_eco(netlist, map, pool, pins, leakage, &config.cts, &config.eco, sink)?;
    let report = validate_eco(netlist, pool.fabric(), &outcome, &config.cts, &config.eco);

    if !global.quiet {
        if let Some(ref tree) = outcome.clock_tree {
            let s = &tree.report.stats;
            eprintln!(
                "  Buffered {} clock sinks with {} buffers (depth {}, skew {:.3} um)",
                s.sink_count, s.buffer_count, s.depth, s.skew_estimate_um
            );
        }
        let pd = &outcome.power_down;
        if pd.tie_cells > 0 || pd.parked > 0 {
            eprintln!(
                "    Parked {} unused cells on {} tie cells",
                pd.parked, pd.tie_cells
            );
        }
    }
    if global.verbose {
        let pd = &outcome.power_down;
        eprintln!(
            "           {} inputs tied low, {} tied high, {} from leakage vectors",
            pd.tied_low, pd.tied_high, pd.from_leakage
        );
    }
    if !global.quiet && !report.is_ok() {
        eprintln!(
            "warning: ECO validation found {} error(s)",
            report.errors.len()
        );
    }
    if global.verbose {
        for e in &report.errors {
            eprintln!("           error: {e}");
        }
        for w in &report.warnings {
            eprintln!("           warning: {w}");
        }
    }
    Ok((outcome, report))
}

/// Writes one artifact into `dir`, creating the directory if needed.
pub fn write_artifact(
    dir: &Path,
    file: &str,
    contents: &str,
    global: &GlobalArgs,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file);
    std::fs::write(&path, contents)?;
    if global.verbose {
        eprintln!("     Wrote {}", path.display());
    }
    Ok(path)
}

/// Writes the placement map and the placement table.
pub fn write_placement_outputs(
    dir: &Path,
    name: &str,
    map: &PlacementMap,
    fabric: &Fabric,
    global: &GlobalArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    write_artifact(dir, &format!("{name}.map"), &write_map(map, fabric), global)?;
    write_artifact(
        dir,
        &format!("{name}_placement.csv"),
        &write_placement_csv(map, fabric),
        global,
    )?;
    Ok(())
}

/// Writes the tree description, the final netlist in both formats and the
/// final placement map.
pub fn write_eco_outputs(
    dir: &Path,
    name: &str,
    netlist: &Netlist,
    map: &PlacementMap,
    fabric: &Fabric,
    outcome: &EcoOutcome,
    global: &GlobalArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref tree) = outcome.clock_tree {
        let json = serde_json::to_string_pretty(&tree.report)?;
        write_artifact(dir, &format!("{name}_cts.json"), &json, global)?;
    }
    write_artifact(dir, &format!("{name}_final.v"), &write_verilog(netlist), global)?;
    write_artifact(dir, &format!("{name}_final.json"), &write_netlist(netlist)?, global)?;
    write_artifact(dir, &format!("{name}_final.map"), &write_map(map, fabric), global)?;
    Ok(())
}

/// Contents of `<name>_summary.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Design name.
    pub design: String,
    /// Netlist cells before any ECO edit.
    pub cells: usize,
    /// Fabric sites.
    pub sites: usize,
    /// Global HPWL in microns.
    pub hpwl_um: f64,
    /// Placement counters, when placement ran in this invocation.
    pub placement: Option<PlacementSummary>,
    /// Placement validation counters.
    pub validation: ValidationStats,
    /// Validation errors found.
    pub validation_errors: usize,
    /// Clock-tree statistics, when a tree was built.
    pub clock_tree: Option<ClockTreeStats>,
    /// Power-down counters, when the ECO ran.
    pub power_down: Option<PowerDownReport>,
    /// Netlist cells after the ECO.
    pub final_cells: Option<usize>,
    /// ECO validation counters, when the ECO ran.
    pub eco_validation: Option<EcoValidationStats>,
    /// ECO validation errors found.
    pub eco_validation_errors: usize,
    /// Sites still free at the end, per role.
    pub unused_sites: BTreeMap<String, usize>,
    /// Diagnostic counts per code.
    pub diagnostics: BTreeMap<String, usize>,
}

impl RunSummary {
    /// Starts a summary from the loaded inputs.
    pub fn new(name: &str, netlist: &Netlist, fabric: &Fabric) -> Self {
        Self {
            design: name.to_string(),
            cells: netlist.cell_count(),
            sites: fabric.site_count(),
            ..Self::default()
        }
    }

    /// Records the validation outcome.
    pub fn set_validation(&mut self, report: &ValidationReport) {
        self.validation = report.stats.clone();
        self.validation_errors = report.errors.len();
    }

    /// Records the ECO outcome and its validation.
    pub fn set_eco(
        &mut self,
        outcome: &EcoOutcome,
        report: &EcoValidationReport,
        netlist: &Netlist,
        enabled: bool,
    ) {
        self.clock_tree = outcome.clock_tree.as_ref().map(|t| t.report.stats.clone());
        if enabled {
            self.power_down = Some(outcome.power_down.clone());
        }
        self.final_cells = Some(netlist.cell_count());
        self.eco_validation = Some(report.stats.clone());
        self.eco_validation_errors = report.errors.len();
    }

    /// Fills the end-of-run counters and writes `<name>_summary.json`.
    pub fn finish(
        mut self,
        dir: &Path,
        fabric: &Fabric,
        pool: &SitePool<'_>,
        sink: &DiagnosticSink,
        global: &GlobalArgs,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.unused_sites = unused_by_role(fabric, pool)
            .into_iter()
            .map(|(role, n)| (role.to_string(), n))
            .collect();
        self.diagnostics = sink
            .counts_by_code()
            .into_iter()
            .map(|(code, n)| (code.to_string(), n))
            .collect();
        let json = serde_json::to_string_pretty(&self)?;
        write_artifact(dir, &format!("{}_summary.json", self.design), &json, global)?;
        Ok(())
    }
}

/// Renders all diagnostics from a sink to stderr.
///
/// Returns the number of diagnostics rendered.
pub fn render_diagnostics(sink: &DiagnosticSink, format: ReportFormat, color: bool) -> usize {
    let diagnostics = sink.diagnostics();
    match format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(color);
            for diag in &diagnostics {
                eprint!("{}", renderer.render(diag));
            }
        }
        ReportFormat::Json => {
            for diag in &diagnostics {
                eprintln!("{}", JsonRenderer.render(diag));
            }
        }
    }
    diagnostics.len()
}

/// Prints the closing line and returns the exit code.
pub fn finish_run(
    sink: &DiagnosticSink,
    format: ReportFormat,
    dir: &Path,
    validation_failed: bool,
    global: &GlobalArgs,
) -> i32 {
    if !global.quiet {
        render_diagnostics(sink, format, global.color);
        eprintln!(
            "  Finished with {} warning(s); outputs in {}",
            sink.warning_count(),
            dir.display()
        );
    } else if sink.has_errors() {
        render_diagnostics(sink, format, global.color);
    }
    if sink.has_errors() || validation_failed {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: None,
        }
    }

    #[test]
    fn find_config_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let found = find_config(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn find_config_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn resolve_prefers_explicit_path() {
        let global = GlobalArgs {
            config: Some("elsewhere/sasic.toml".to_string()),
            ..quiet()
        };
        assert_eq!(
            resolve_config(&global).unwrap(),
            PathBuf::from("elsewhere/sasic.toml")
        );
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = sasic_config::load_config_from_str(
            "[design]\nname = \"d\"\nnetlist = \"n\"\nfabric = \"f\"\npins = \"p\"\n",
        )
        .unwrap();
        apply_overrides(&mut config, Some(9), true, Some("out"));
        assert_eq!(config.placement.seed, 9);
        assert!(config.placement.greedy_only);
        assert_eq!(config.output_dir(), PathBuf::from("out"));

        apply_overrides(&mut config, None, false, None);
        assert_eq!(config.placement.seed, 9);
        assert!(config.placement.greedy_only);
    }

    #[test]
    fn write_artifact_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("build").join("d");
        let path = write_artifact(&out, "d.map", "# logical_name physical_name\n", &quiet()).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "# logical_name physical_name\n"
        );
    }

    #[test]
    fn summary_counts_diagnostics_per_code() {
        use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode};

        let dir = tempfile::tempdir().unwrap();
        let fabric = Fabric::new(RoleTable::new());
        let pool = SitePool::new(&fabric);
        let netlist = Netlist::new("top");
        let sink = DiagnosticSink::new();
        let code = DiagnosticCode::new(Category::Placement, 101);
        sink.emit(Diagnostic::warning(code, "a"));
        sink.emit(Diagnostic::warning(code, "b"));

        RunSummary::new("d", &netlist, &fabric)
            .finish(dir.path(), &fabric, &pool, &sink, &quiet())
            .unwrap();
        let text = std::fs::read_to_string(dir.path().join("d_summary.json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["design"], "d");
        assert_eq!(v["diagnostics"]["P101"], 2);
        assert!(v["clock_tree"].is_null());
        assert!(v["eco_validation"].is_null());
    }

    #[test]
    fn eco_stage_validates_and_summary_records_it() {
        use sasic_common::{NetBit, Point};
        use sasic_db::{Bit, LogicalCell, PortDirection};

        const DFF: &str = "sky130_fd_sc_hd__dfxtp_1";
        let mut fabric = Fabric::new(RoleTable::new());
        let mut netlist = Netlist::new("top");
        let mut map = PlacementMap::new();
        for i in 0..2u32 {
            let site = fabric
                .add_site(format!("F{i}__FF"), format!("F{i}"), DFF, Point::from_um(f64::from(i) * 10.0, 0.0))
                .unwrap();
            netlist
                .add_cell(
                    LogicalCell::new(format!("ff{i}"), DFF)
                        .with_port("CLK", PortDirection::Input, vec![Bit::Net(NetBit::from_raw(2))])
                        .with_port("D", PortDirection::Input, vec![Bit::Net(NetBit::from_raw(3))])
                        .with_port("Q", PortDirection::Output, vec![Bit::Net(NetBit::from_raw(4 + i))]),
                )
                .unwrap();
            map.insert(format!("ff{i}"), site).unwrap();
        }
        fabric.add_site("B0__BUF", "B0", "sky130_fd_sc_hd__clkbuf_1", Point::from_um(5.0, 0.0));

        let mut pool = SitePool::new(&fabric);
        for (_, site) in map.iter() {
            pool.claim(site);
        }
        let config = sasic_config::load_config_from_str(
            "[design]\nname = \"d\"\nnetlist = \"n\"\nfabric = \"f\"\npins = \"p\"\n",
        )
        .unwrap();
        let sink = DiagnosticSink::new();
        let (outcome, report) = eco_stage(
            &mut netlist,
            &mut map,
            &mut pool,
            &PinTable::new(),
            None,
            &config,
            &sink,
            &quiet(),
        )
        .unwrap();
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(report.stats.sinks, 2);
        assert_eq!(report.stats.buffered_sinks, 2);

        let dir = tempfile::tempdir().unwrap();
        let mut summary = RunSummary::new("d", &netlist, &fabric);
        summary.set_eco(&outcome, &report, &netlist, true);
        summary.finish(dir.path(), &fabric, &pool, &sink, &quiet()).unwrap();
        let text = std::fs::read_to_string(dir.path().join("d_summary.json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["eco_validation"]["buffered_sinks"], 2);
        assert_eq!(v["eco_validation_errors"], 0);
    }
}
