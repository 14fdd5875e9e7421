//! Greedy initial placement.
//!
//! A single forward pass: each cell goes to the free site of its own type
//! nearest the coordinate-wise median of its placed drivers and bound pins.

use crate::hpwl::FixedPoints;
use crate::state::Placement;
use sasic_common::geom::median_point;
use sasic_common::{CellId, Point};
use sasic_db::{NetIndex, Netlist, SiteFilter, SitePool};
use sasic_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// No free site of the cell's type is left.
pub const NO_FREE_SITE: DiagnosticCode = DiagnosticCode::new(Category::Placement, 101);

/// The fabric has no site of the cell's type at all.
pub const TYPE_NOT_IN_FABRIC: DiagnosticCode = DiagnosticCode::new(Category::Placement, 102);

/// Points the target of `cell` is computed from: placed drivers of its
/// input nets and fixed pins on those nets.
pub fn driver_points(
    cell: CellId,
    index: &NetIndex,
    fixed: &FixedPoints,
    placement: &Placement<'_>,
) -> Vec<Point> {
    let mut points = Vec::new();
    for net in index.inputs(cell) {
        points.extend(
            index
                .drivers(*net)
                .iter()
                .filter(|d| **d != cell)
                .filter_map(|d| placement.pos(*d)),
        );
        points.extend_from_slice(fixed.on(*net));
    }
    points
}

/// Places `cells` in the given order. Returns the number placed.
pub fn place_greedy(
    cells: &[CellId],
    netlist: &Netlist,
    index: &NetIndex,
    fixed: &FixedPoints,
    placement: &mut Placement<'_>,
    pool: &mut SitePool<'_>,
    sink: &DiagnosticSink,
) -> usize {
    let fallback = pool.fabric().site_centroid();
    let mut placed = 0;
    for &cell in cells {
        if placement.site(cell).is_some() {
            continue;
        }
        let logical = netlist.cell(cell);
        let target = median_point(&driver_points(cell, index, fixed, placement)).unwrap_or(fallback);
        match pool.take_nearest(target, SiteFilter::CellType(&logical.cell_type)) {
            Some(site) => {
                placement.set(cell, Some(site));
                placed += 1;
            }
            None if !pool.fabric().has_type(&logical.cell_type) => {
                sink.emit(
                    Diagnostic::warning(
                        TYPE_NOT_IN_FABRIC,
                        format!(
                            "cell '{}' has type '{}' which the fabric does not provide",
                            logical.name, logical.cell_type
                        ),
                    )
                    .with_subject(logical.name.clone())
                    .with_help("the cell is left unplaced"),
                );
            }
            None => {
                sink.emit(
                    Diagnostic::warning(
                        NO_FREE_SITE,
                        format!(
                            "no free '{}' site left for cell '{}'",
                            logical.cell_type, logical.name
                        ),
                    )
                    .with_subject(logical.name.clone())
                    .with_help("the cell is left unplaced"),
                );
            }
        }
    }
    placed
}
