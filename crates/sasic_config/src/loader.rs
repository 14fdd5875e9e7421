//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::FlowConfig;
use std::path::Path;

/// Conventional configuration file name.
pub const CONFIG_FILE_NAME: &str = "sasic.toml";

/// Loads and validates a flow configuration.
///
/// `path` may name the file itself or a directory containing
/// [`CONFIG_FILE_NAME`]. Relative paths inside `[design]` are resolved
/// against the directory holding the file.
pub fn load_config(path: &Path) -> Result<FlowConfig, ConfigError> {
    let config_path = if path.is_dir() {
        path.join(CONFIG_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&config_path)?;
    let mut config = load_config_from_str(&content)?;
    if let Some(base) = config_path.parent() {
        config.rebase_paths(base);
    }
    Ok(config)
}

/// Parses and validates a flow configuration from a string.
///
/// Paths are left exactly as written.
pub fn load_config_from_str(content: &str) -> Result<FlowConfig, ConfigError> {
    let config: FlowConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields and value ranges.
fn validate_config(config: &FlowConfig) -> Result<(), ConfigError> {
    let d = &config.design;
    if d.name.is_empty() {
        return Err(ConfigError::MissingField("design.name".to_string()));
    }
    for (field, path) in [
        ("design.netlist", &d.netlist),
        ("design.fabric", &d.fabric),
        ("design.pins", &d.pins),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
    }

    let p = &config.placement;
    if p.p_refine < 0.0 || p.p_explore < 0.0 {
        return Err(invalid("placement move probabilities must be non-negative"));
    }
    if !(p.cooling_rate > 0.0 && p.cooling_rate <= 1.0) {
        return Err(invalid("placement.cooling_rate must be in (0, 1]"));
    }
    if p.batch_size < 2 {
        return Err(invalid("placement.batch_size must be >= 2"));
    }
    if p.refine_max_distance < 0.0 || p.initial_window < 0.0 {
        return Err(invalid("placement distances must be non-negative"));
    }
    if let Some(t) = p.initial_temperature {
        if t <= 0.0 {
            return Err(invalid("placement.initial_temperature must be positive"));
        }
    }
    if config.cts.leaf_size < 2 {
        return Err(invalid("cts.leaf_size must be >= 2"));
    }
    if config.eco.max_fanout_per_tie == 0 {
        return Err(invalid("eco.max_fanout_per_tie must be >= 1"));
    }
    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::ValidationError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasic_common::SiteRole;

    const MINIMAL: &str = r#"
[design]
name = "6502"
netlist = "designs/6502_mapped.json"
fabric = "platform/fabric.json"
pins = "platform/pins.json"
"#;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.design.name, "6502");
        assert!(config.design.leakage.is_none());
        assert_eq!(config.placement.batch_size, 24);
        assert!(config.cts.enabled);
        assert!(config.roles.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[design]
name = "arith"
netlist = "n.json"
fabric = "f.json"
pins = "p.json"
leakage = "leak.json"
output_dir = "out"
top = "arith_top"

[placement]
moves_per_temp = 500
cooling_rate = 0.95
initial_temperature = 12.5
p_refine = 0.5
p_explore = 0.5
refine_max_distance = 40.0
initial_window = 0.25
batch_size = 16
seed = 1

[cts]
clock_net = "clk"
leaf_size = 3
buffer_types = ["sky130_fd_sc_hd__clkbuf_4"]

[eco]
max_fanout_per_tie = 50
park_spare_buffers = true

[roles]
"sky130_fd_sc_hd__conb_1" = "tie"
"my_latch" = "sink"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.placement.moves_per_temp, 500);
        assert_eq!(config.placement.initial_temperature, Some(12.5));
        assert_eq!(config.cts.clock_net.as_deref(), Some("clk"));
        assert_eq!(config.cts.buffer_types.len(), 1);
        assert_eq!(config.eco.max_fanout_per_tie, 50);
        assert!(config.eco.park_spare_buffers);
        assert_eq!(config.roles["my_latch"], SiteRole::Sink);
        assert_eq!(config.design.top.as_deref(), Some("arith_top"));
    }

    #[test]
    fn missing_name_errors() {
        let toml = MINIMAL.replace("name = \"6502\"", "name = \"\"");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_design_section_is_parse_error() {
        let err = load_config_from_str("[placement]\nseed = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_role_is_parse_error() {
        let toml = format!("{MINIMAL}\n[roles]\n\"x\" = \"flux\"\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn bad_cooling_rate_errors() {
        let toml = format!("{MINIMAL}\n[placement]\ncooling_rate = 1.5\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn tiny_batch_errors() {
        let toml = format!("{MINIMAL}\n[placement]\nbatch_size = 1\n");
        assert!(matches!(
            load_config_from_str(&toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn zero_fanout_errors() {
        let toml = format!("{MINIMAL}\n[eco]\nmax_fanout_per_tie = 0\n");
        assert!(matches!(
            load_config_from_str(&toml).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn load_from_directory_rebases_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), MINIMAL).unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(
            config.design.netlist,
            dir.path().join("designs/6502_mapped.json")
        );
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here/sasic.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
