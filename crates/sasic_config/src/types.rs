//! Configuration types deserialized from `sasic.toml`.

use sasic_common::SiteRole;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The top-level flow configuration parsed from `sasic.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    /// Design name and input/output locations.
    pub design: DesignConfig,
    /// Greedy placement and annealing knobs.
    #[serde(default)]
    pub placement: PlacementConfig,
    /// Clock-tree synthesis options.
    #[serde(default)]
    pub cts: CtsConfig,
    /// Power-down ECO options.
    #[serde(default)]
    pub eco: EcoConfig,
    /// Exact cell-type to role overrides, applied after the default patterns.
    #[serde(default)]
    pub roles: BTreeMap<String, SiteRole>,
}

impl FlowConfig {
    /// Rewrites every relative path in `[design]` to be relative to `base`.
    pub fn rebase_paths(&mut self, base: &Path) {
        let d = &mut self.design;
        for path in [&mut d.netlist, &mut d.fabric, &mut d.pins] {
            rebase(path, base);
        }
        if let Some(leakage) = d.leakage.as_mut() {
            rebase(leakage, base);
        }
        if let Some(out) = d.output_dir.as_mut() {
            rebase(out, base);
        }
    }

    /// The directory artifacts are written to (`build/<name>` by default).
    pub fn output_dir(&self) -> PathBuf {
        self.design
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("build").join(&self.design.name))
    }
}

fn rebase(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

/// Design name and input/output locations.
#[derive(Debug, Clone, Deserialize)]
pub struct DesignConfig {
    /// Design name, used to derive artifact file names.
    pub name: String,
    /// Synthesized netlist (Yosys JSON).
    pub netlist: PathBuf,
    /// Fabric description (JSON).
    pub fabric: PathBuf,
    /// I/O pin table (JSON).
    pub pins: PathBuf,
    /// Optional leakage-optimal tie-vector table (JSON).
    #[serde(default)]
    pub leakage: Option<PathBuf>,
    /// Output directory; defaults to `build/<name>`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Top module to use when the netlist holds several.
    #[serde(default)]
    pub top: Option<String>,
}

/// Greedy placement and batched annealing knobs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Annealing steps per batch.
    pub moves_per_temp: usize,
    /// Temperature and window multiplier applied every 20 steps.
    pub cooling_rate: f64,
    /// Starting temperature in microns; derived from batch HPWL when absent.
    pub initial_temperature: Option<f64>,
    /// Relative weight of refine (short-range) moves.
    pub p_refine: f64,
    /// Relative weight of explore (windowed) moves.
    pub p_explore: f64,
    /// Maximum Manhattan distance of a refine swap, in microns.
    pub refine_max_distance: f64,
    /// Initial explore window as a fraction of the die size.
    pub initial_window: f64,
    /// Cells per annealing batch.
    pub batch_size: usize,
    /// RNG seed.
    pub seed: u64,
    /// Skip annealing and keep the greedy result.
    pub greedy_only: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            moves_per_temp: 200,
            cooling_rate: 0.90,
            initial_temperature: None,
            p_refine: 0.7,
            p_explore: 0.3,
            refine_max_distance: 100.0,
            initial_window: 0.5,
            batch_size: 24,
            seed: 42,
            greedy_only: false,
        }
    }
}

/// Clock-tree synthesis options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CtsConfig {
    /// Run clock-tree synthesis.
    pub enabled: bool,
    /// Clock net name; inferred from sink clock pins when absent.
    pub clock_net: Option<String>,
    /// Clock input port on sink cells.
    pub clock_port: String,
    /// Buffer input port.
    pub buffer_input: String,
    /// Buffer output port.
    pub buffer_output: String,
    /// Largest node group collapsed under a single buffer.
    pub leaf_size: usize,
    /// Exact cell types allowed as clock buffers; empty allows every buffer site.
    pub buffer_types: Vec<String>,
}

impl Default for CtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clock_net: None,
            clock_port: "CLK".to_string(),
            buffer_input: "A".to_string(),
            buffer_output: "X".to_string(),
            leaf_size: 4,
            buffer_types: Vec::new(),
        }
    }
}

/// Power-down ECO options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EcoConfig {
    /// Run the power-down ECO.
    pub enabled: bool,
    /// Unused cells served by one tie cell.
    pub max_fanout_per_tie: usize,
    /// Tie-low output port of the tie cell.
    pub tie_low_port: String,
    /// Tie-high output port of the tie cell.
    pub tie_high_port: String,
    /// Also park buffer sites the clock tree did not use. Off by default.
    pub park_spare_buffers: bool,
}

impl Default for EcoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_fanout_per_tie: 1000,
            tie_low_port: "LO".to_string(),
            tie_high_port: "HI".to_string(),
            park_spare_buffers: false,
        }
    }
}
