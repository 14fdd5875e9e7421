//! Placement artifacts: the `logical physical` map file and the placement CSV.
//!
//! The map file is both an output (handed to the ECO stage) and an input
//! (placement restart). Lines are `logical_name physical_name`; blank lines
//! and lines whose first non-blank character is `#` are ignored.

use crate::state::Placement;
use sasic_db::{Fabric, Netlist, PlacementMap, PlacementMapError, SitePool};
use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// A map entry names a site or cell that does not exist.
pub const UNKNOWN_MAP_ENTRY: DiagnosticCode = DiagnosticCode::new(Category::Placement, 105);

/// Errors from reading a map file.
#[derive(Debug, thiserror::Error)]
pub enum MapFileError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A line is not `logical physical`.
    #[error("line {line}: expected 'logical_name physical_name', found '{text}'")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Offending line.
        text: String,
    },
    /// A line places a cell twice or reuses a site.
    #[error("line {line}: {source}")]
    Conflict {
        /// 1-based line number.
        line: usize,
        /// Underlying conflict.
        #[source]
        source: PlacementMapError,
    },
}

/// Renders `map` as a map file, sorted by logical name.
pub fn write_map(map: &PlacementMap, fabric: &Fabric) -> String {
    let mut out = String::from("# logical_name physical_name\n");
    for (cell, site) in map.iter() {
        let _ = writeln!(out, "{cell} {}", fabric.site(site).name);
    }
    out
}

/// Parses a map file against `fabric`.
///
/// Entries naming an unknown physical site are skipped with a `P105`
/// warning; malformed lines and conflicting entries are errors.
pub fn parse_map(text: &str, fabric: &Fabric, sink: &DiagnosticSink) -> Result<PlacementMap, MapFileError> {
    let mut map = PlacementMap::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(logical), Some(physical), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(MapFileError::Malformed {
                line: i + 1,
                text: raw.to_string(),
            });
        };
        let Some(site) = fabric.site_by_name(physical) else {
            sink.emit(
                Diagnostic::warning(
                    UNKNOWN_MAP_ENTRY,
                    format!("map entry for '{logical}' names unknown site '{physical}'"),
                )
                .with_subject(logical.to_string())
                .with_note(format!("line {}", i + 1)),
            );
            continue;
        };
        map.insert(logical, site.id)
            .map_err(|source| MapFileError::Conflict { line: i + 1, source })?;
    }
    Ok(map)
}

/// Reads a map file from disk.
pub fn load_map(path: &Path, fabric: &Fabric, sink: &DiagnosticSink) -> Result<PlacementMap, MapFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| MapFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_map(&text, fabric, sink)
}

/// Renders `cell_name,site_id,x_um,y_um` rows sorted by cell name.
pub fn write_placement_csv(map: &PlacementMap, fabric: &Fabric) -> String {
    let mut out = String::from("cell_name,site_id,x_um,y_um\n");
    for (cell, site) in map.iter() {
        let pos = fabric.site(site).pos;
        let _ = writeln!(out, "{cell},{site},{:.3},{:.3}", pos.x_um(), pos.y_um());
    }
    out
}

/// Rebuilds a [`Placement`] from a parsed map, claiming every site in `pool`.
///
/// Entries for cells the netlist does not contain are skipped with `P105`.
pub fn restore_placement<'f>(
    map: &PlacementMap,
    netlist: &Netlist,
    pool: &mut SitePool<'f>,
    sink: &DiagnosticSink,
) -> Placement<'f> {
    let mut placement = Placement::new(pool.fabric(), netlist.cell_count());
    for (cell, site) in map.iter() {
        let Some(id) = netlist.cell_id(cell) else {
            sink.emit(
                Diagnostic::warning(
                    UNKNOWN_MAP_ENTRY,
                    format!("map entry names unknown cell '{cell}'"),
                )
                .with_subject(cell.to_string()),
            );
            continue;
        };
        if !pool.claim(site) {
            sink.emit(
                Diagnostic::warning(
                    UNKNOWN_MAP_ENTRY,
                    format!("site {} for cell '{cell}' is not free", pool.fabric().site(site).name),
                )
                .with_subject(cell.to_string()),
            );
            continue;
        }
        placement.set(id, Some(site));
    }
    placement
}
