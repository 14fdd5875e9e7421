//! `sasic init-config`: starter configuration.
//!
//! Writes a `sasic.toml` listing every section with its default values, so
//! a new design only needs its input paths filled in.

use std::fs;
use std::path::PathBuf;

use sasic_config::CONFIG_FILE_NAME;

use crate::GlobalArgs;

/// Runs the `sasic init-config` command.
///
/// Refuses to overwrite an existing file unless `force` is set.
/// Returns exit code 0 on success.
pub fn run(
    name: Option<String>,
    output: Option<String>,
    force: bool,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let path = match output {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(CONFIG_FILE_NAME),
    };
    if path.exists() && !force {
        return Err(format!(
            "'{}' already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let design = name.as_deref().unwrap_or("design");
    fs::write(&path, default_config(design))?;

    if !global.quiet {
        eprintln!("   Created {}", path.display());
    }
    Ok(0)
}

/// Renders the starter configuration for `name`.
fn default_config(name: &str) -> String {
    format!(
        r#"[design]
name = "{name}"
netlist = "inputs/designs/{name}_mapped.json"
fabric = "inputs/platform/fabric.json"
pins = "inputs/platform/pins.json"
# leakage = "inputs/leakage_optimal_vectors.json"
# output_dir = "build/{name}"

[placement]
moves_per_temp = 200
cooling_rate = 0.90
# initial_temperature = 12.0
p_refine = 0.7
p_explore = 0.3
refine_max_distance = 100.0
initial_window = 0.5
batch_size = 24
seed = 42

[cts]
enabled = true
# clock_net = "clk"
clock_port = "CLK"
buffer_input = "A"
buffer_output = "X"
leaf_size = 4

[eco]
enabled = true
max_fanout_per_tie = 1000
tie_low_port = "LO"
tie_high_port = "HI"
park_spare_buffers = false

[roles]
# "sky130_fd_sc_hd__conb_1" = "tie"
"#
    )
}
