//! The immutable site table of a structured-ASIC fabric.

use crate::role::RoleTable;
use sasic_common::geom::centroid;
use sasic_common::{BBox, Point, SiteId, SiteRole};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One fixed physical slot on the fabric.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    /// Arena index.
    pub id: SiteId,
    /// Physical instance name, `TILE__TEMPLATE`.
    pub name: String,
    /// Owning tile.
    pub tile: String,
    /// Standard-cell type the site is pre-built as.
    pub cell_type: String,
    /// Role resolved from `cell_type` at load time.
    pub role: SiteRole,
    /// Location in database units.
    pub pos: Point,
}

/// Die outline in database units, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Die {
    /// Die width.
    pub width: i64,
    /// Die height.
    pub height: i64,
}

/// The full site table. Constructed once; never mutated after loading.
#[derive(Debug, Clone)]
pub struct Fabric {
    sites: Vec<Site>,
    die: Option<Die>,
    by_name: HashMap<String, SiteId>,
    by_type: BTreeMap<String, Vec<SiteId>>,
    roles: RoleTable,
}

impl Fabric {
    /// Creates an empty fabric that classifies types with `roles`.
    pub fn new(roles: RoleTable) -> Self {
        Self {
            sites: Vec::new(),
            die: None,
            by_name: HashMap::new(),
            by_type: BTreeMap::new(),
            roles,
        }
    }

    /// Sets the die outline.
    pub fn set_die(&mut self, die: Die) {
        self.die = Some(die);
    }

    /// Adds a site and returns its ID, or `None` if the name is already taken.
    pub fn add_site(
        &mut self,
        name: impl Into<String>,
        tile: impl Into<String>,
        cell_type: impl Into<String>,
        pos: Point,
    ) -> Option<SiteId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return None;
        }
        let cell_type = cell_type.into();
        let id = SiteId::from_raw(self.sites.len() as u32);
        let role = self.roles.resolve(&cell_type);
        self.by_name.insert(name.clone(), id);
        self.by_type.entry(cell_type.clone()).or_default().push(id);
        self.sites.push(Site {
            id,
            name,
            tile: tile.into(),
            cell_type,
            role,
            pos,
        });
        Some(id)
    }

    /// Returns the site with the given ID.
    pub fn site(&self, id: SiteId) -> &Site {
        &self.sites[id.index()]
    }

    /// All sites in ID order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Number of sites.
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Looks up a site by physical name.
    pub fn site_by_name(&self, name: &str) -> Option<&Site> {
        self.by_name.get(name).map(|id| self.site(*id))
    }

    /// Sites pre-built as `cell_type`, in ID order.
    pub fn sites_of_type(&self, cell_type: &str) -> &[SiteId] {
        self.by_type
            .get(cell_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns `true` if any site is pre-built as `cell_type`.
    pub fn has_type(&self, cell_type: &str) -> bool {
        self.by_type.contains_key(cell_type)
    }

    /// Every distinct site type.
    pub fn cell_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    /// The role table used to classify this fabric.
    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    /// Die outline, or the site bounding box grown from the origin if none was given.
    pub fn die(&self) -> Die {
        if let Some(die) = self.die {
            return die;
        }
        let bbox = BBox::of_points(self.sites.iter().map(|s| s.pos));
        match bbox {
            Some(b) => Die {
                width: b.max.x.max(0),
                height: b.max.y.max(0),
            },
            None => Die {
                width: 0,
                height: 0,
            },
        }
    }

    /// The larger die dimension.
    pub fn die_size(&self) -> i64 {
        let die = self.die();
        die.width.max(die.height)
    }

    /// Arithmetic mean of every site location.
    pub fn site_centroid(&self) -> Point {
        let points: Vec<Point> = self.sites.iter().map(|s| s.pos).collect();
        centroid(&points).unwrap_or_default()
    }

    /// Site count per role.
    pub fn role_counts(&self) -> BTreeMap<SiteRole, usize> {
        let mut counts = BTreeMap::new();
        for site in &self.sites {
            *counts.entry(site.role).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_fabric() -> Fabric {
        let mut f = Fabric::new(RoleTable::new());
        f.add_site("T0__A", "T0", "sky130_fd_sc_hd__nand2_1", Point::new(0, 0));
        f.add_site("T0__B", "T0", "sky130_fd_sc_hd__buf_1", Point::new(10, 0));
        f.add_site("T1__A", "T1", "sky130_fd_sc_hd__nand2_1", Point::new(0, 20));
        f
    }

    #[test]
    fn ids_are_dense_and_named() {
        let f = small_fabric();
        assert_eq!(f.site_count(), 3);
        let s = f.site_by_name("T1__A").unwrap();
        assert_eq!(s.id, SiteId::from_raw(2));
        assert_eq!(s.tile, "T1");
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut f = small_fabric();
        assert!(f
            .add_site("T0__A", "T0", "x", Point::new(1, 1))
            .is_none());
        assert_eq!(f.site_count(), 3);
    }

    #[test]
    fn roles_resolved_at_load() {
        let f = small_fabric();
        assert_eq!(f.site(SiteId::from_raw(1)).role, SiteRole::Buffer);
        assert_eq!(f.role_counts()[&SiteRole::Logic], 2);
    }

    #[test]
    fn type_index() {
        let f = small_fabric();
        assert_eq!(f.sites_of_type("sky130_fd_sc_hd__nand2_1").len(), 2);
        assert!(f.sites_of_type("missing").is_empty());
        assert!(f.has_type("sky130_fd_sc_hd__buf_1"));
    }

    #[test]
    fn die_falls_back_to_site_extent() {
        let mut f = small_fabric();
        assert_eq!(f.die(), Die { width: 10, height: 20 });
        assert_eq!(f.die_size(), 20);
        f.set_die(Die { width: 100, height: 50 });
        assert_eq!(f.die_size(), 100);
    }

    #[test]
    fn centroid_of_sites() {
        let f = small_fabric();
        assert_eq!(f.site_centroid(), Point::new(3, 6));
    }
}
