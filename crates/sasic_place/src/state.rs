//! Per-cell site assignment during placement.

use sasic_common::{CellId, Point, SiteId};
use sasic_db::{Fabric, Netlist, PlacementMap, PlacementMapError};

/// Which site each logical cell currently owns.
///
/// Site ownership is mirrored in the [`sasic_db::SitePool`]; this type only
/// records the cell side of the relation.
#[derive(Debug, Clone)]
pub struct Placement<'f> {
    fabric: &'f Fabric,
    sites: Vec<Option<SiteId>>,
}

impl<'f> Placement<'f> {
    /// No cell placed.
    pub fn new(fabric: &'f Fabric, cell_count: usize) -> Self {
        Self {
            fabric,
            sites: vec![None; cell_count],
        }
    }

    /// The fabric sites refer to.
    pub fn fabric(&self) -> &'f Fabric {
        self.fabric
    }

    /// Site owned by `cell`.
    pub fn site(&self, cell: CellId) -> Option<SiteId> {
        self.sites.get(cell.index()).copied().flatten()
    }

    /// Location of `cell`, if placed.
    pub fn pos(&self, cell: CellId) -> Option<Point> {
        self.site(cell).map(|s| self.fabric.site(s).pos)
    }

    /// Sets or clears the site of `cell`.
    pub fn set(&mut self, cell: CellId, site: Option<SiteId>) {
        if cell.index() >= self.sites.len() {
            self.sites.resize(cell.index() + 1, None);
        }
        self.sites[cell.index()] = site;
    }

    /// Number of placed cells.
    pub fn placed_count(&self) -> usize {
        self.sites.iter().filter(|s| s.is_some()).count()
    }

    /// `(cell, site)` for every placed cell, in cell order.
    pub fn iter(&self) -> impl Iterator<Item = (CellId, SiteId)> + '_ {
        self.sites
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (CellId::from_raw(i as u32), s)))
    }

    /// Cells with no site, in cell order.
    pub fn unplaced(&self) -> impl Iterator<Item = CellId> + '_ {
        self.sites
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| CellId::from_raw(i as u32))
    }

    /// The name-keyed map handed to later stages.
    pub fn to_map(&self, netlist: &Netlist) -> Result<PlacementMap, PlacementMapError> {
        let mut map = PlacementMap::new();
        for (cell, site) in self.iter() {
            map.insert(netlist.cell(cell).name.clone(), site)?;
        }
        Ok(map)
    }
}
