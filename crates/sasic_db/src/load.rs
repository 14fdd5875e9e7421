//! Readers for the fabric, pin and leakage JSON inputs.
//!
//! Malformed files are hard errors ([`LoadError`]). Well-formed files with
//! data-quality gaps load best-effort and report through the sink.

use crate::fabric::{Die, Fabric};
use crate::leakage::LeakageTable;
use crate::netlist::{Netlist, NetlistError, PortDirection};
use crate::pins::{PinTable, Side};
use crate::role::RoleTable;
use crate::yosys;
use sasic_common::geom::um_to_dbu;
use sasic_common::Point;
use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A fabric cell whose template has no cell type.
pub const UNRESOLVED_TEMPLATE: DiagnosticCode = DiagnosticCode::new(Category::Load, 401);

/// Errors from reading input files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON for its kind.
    #[error("invalid JSON in '{origin}': {source}")]
    Json {
        /// File path or other label.
        origin: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The file parsed but its content is unusable.
    #[error("{0}")]
    Invalid(String),
    /// The netlist violates arena rules.
    #[error(transparent)]
    Netlist(#[from] NetlistError),
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn from_json<T: for<'de> Deserialize<'de>>(text: &str, origin: &str) -> Result<T, LoadError> {
    serde_json::from_str(text).map_err(|source| LoadError::Json {
        origin: origin.to_string(),
        source,
    })
}

/// Reads a JSON netlist from disk.
pub fn load_netlist(path: &Path, top: Option<&str>) -> Result<Netlist, LoadError> {
    let text = read_text(path)?;
    yosys::parse_netlist(&text, top, &path.display().to_string())
}

#[derive(Debug, Deserialize)]
struct RawDie {
    width_um: f64,
    height_um: f64,
}

#[derive(Debug, Deserialize)]
struct RawFabric {
    #[serde(default)]
    die: Option<RawDie>,
    #[serde(default)]
    templates: BTreeMap<String, String>,
    tiles: BTreeMap<String, RawTile>,
}

#[derive(Debug, Deserialize)]
struct RawTile {
    #[serde(default)]
    cells: Vec<RawFabricCell>,
}

#[derive(Debug, Deserialize)]
struct RawFabricCell {
    name: String,
    x_um: f64,
    y_um: f64,
    #[serde(default)]
    cell_type: Option<String>,
}

/// Parses a fabric description.
///
/// Physical cells are named `TILE__TEMPLATE`; the template part is looked
/// up in `templates` unless the cell names its type directly. Cells whose
/// type cannot be resolved are dropped with an `L401` warning.
pub fn parse_fabric(
    text: &str,
    roles: RoleTable,
    origin: &str,
    sink: &DiagnosticSink,
) -> Result<Fabric, LoadError> {
    let raw: RawFabric = from_json(text, origin)?;
    let mut fabric = Fabric::new(roles);
    if let Some(die) = raw.die {
        fabric.set_die(Die {
            width: um_to_dbu(die.width_um),
            height: um_to_dbu(die.height_um),
        });
    }
    for (tile_name, tile) in &raw.tiles {
        for cell in &tile.cells {
            let template = cell
                .name
                .split_once("__")
                .map(|(_, t)| t)
                .unwrap_or(cell.name.as_str());
            let cell_type = cell
                .cell_type
                .as_ref()
                .or_else(|| raw.templates.get(template));
            let Some(cell_type) = cell_type else {
                sink.emit(
                    Diagnostic::warning(
                        UNRESOLVED_TEMPLATE,
                        format!("fabric cell '{}' has no cell type", cell.name),
                    )
                    .with_subject(cell.name.clone())
                    .with_note(format!("template '{template}' is not in the template table")),
                );
                continue;
            };
            let pos = Point::from_um(cell.x_um, cell.y_um);
            if fabric
                .add_site(cell.name.clone(), tile_name.clone(), cell_type.clone(), pos)
                .is_none()
            {
                return Err(LoadError::Invalid(format!(
                    "duplicate fabric cell '{}'",
                    cell.name
                )));
            }
        }
    }
    Ok(fabric)
}

/// Reads a fabric description from disk.
pub fn load_fabric(path: &Path, roles: RoleTable, sink: &DiagnosticSink) -> Result<Fabric, LoadError> {
    let text = read_text(path)?;
    parse_fabric(&text, roles, &path.display().to_string(), sink)
}

#[derive(Debug, Deserialize)]
struct RawPins {
    pins: Vec<RawPin>,
}

#[derive(Debug, Deserialize)]
struct RawPin {
    name: String,
    side: String,
    #[serde(default)]
    layer: String,
    x_um: f64,
    y_um: f64,
    direction: String,
    #[serde(default)]
    track_idx: i64,
}

/// Parses a pin table.
pub fn parse_pins(text: &str, origin: &str) -> Result<PinTable, LoadError> {
    let raw: RawPins = from_json(text, origin)?;
    let mut table = PinTable::new();
    for pin in raw.pins {
        let direction = PortDirection::parse(&pin.direction).ok_or_else(|| {
            LoadError::Invalid(format!(
                "pin '{}': unknown direction '{}'",
                pin.name, pin.direction
            ))
        })?;
        table.add(
            pin.name,
            Side::parse(&pin.side),
            pin.layer,
            Point::from_um(pin.x_um, pin.y_um),
            direction,
            pin.track_idx,
        );
    }
    Ok(table)
}

/// Reads a pin table from disk.
pub fn load_pins(path: &Path) -> Result<PinTable, LoadError> {
    let text = read_text(path)?;
    parse_pins(&text, &path.display().to_string())
}

/// Parses `{cell_type: {port: 0|1}}`. Booleans are accepted as well.
pub fn parse_leakage(text: &str, origin: &str) -> Result<LeakageTable, LoadError> {
    let raw: BTreeMap<String, BTreeMap<String, Value>> = from_json(text, origin)?;
    let mut table = LeakageTable::new();
    for (cell_type, ports) in raw {
        for (port, value) in ports {
            let high = match &value {
                Value::Bool(b) => *b,
                Value::Number(n) if n.as_u64() == Some(0) => false,
                Value::Number(n) if n.as_u64() == Some(1) => true,
                other => {
                    return Err(LoadError::Invalid(format!(
                        "leakage vector {cell_type}.{port}: expected 0 or 1, found {other}"
                    )))
                }
            };
            table.insert(cell_type.clone(), port, high);
        }
    }
    Ok(table)
}

/// Reads a leakage table from disk.
pub fn load_leakage(path: &Path) -> Result<LeakageTable, LoadError> {
    let text = read_text(path)?;
    parse_leakage(&text, &path.display().to_string())
}
