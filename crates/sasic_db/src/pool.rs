//! The free/used partition of fabric sites.
//!
//! A single [`SitePool`] is created per run and passed by `&mut` through
//! placement, clock-tree synthesis and the power-down ECO. It is not
//! `Clone`: every claim goes through the one pool, so no site can be handed
//! out twice.
//!
//! Free sites of each cell type are also bucketed on a uniform grid, and
//! nearest-site queries scan rings of buckets outward from the target
//! instead of every free site.

use crate::fabric::Fabric;
use sasic_common::{Point, SiteId, SiteRole};
use std::collections::{BTreeMap, BTreeSet};

/// Restricts which free sites a query may return.
#[derive(Debug, Clone, Copy)]
pub enum SiteFilter<'a> {
    /// Any free site.
    Any,
    /// Sites pre-built as exactly this cell type.
    CellType(&'a str),
    /// Sites whose type resolves to this role.
    Role(SiteRole),
    /// Sites of a role, further limited to the listed types when non-empty.
    RoleAmong(SiteRole, &'a [String]),
}

/// Average number of sites per grid bucket.
const SITES_PER_BUCKET: usize = 4;

type Nearness = (i64, i128);

/// Free sites of one cell type, bucketed on a square-pitch grid.
#[derive(Debug)]
struct TypeGrid {
    origin: Point,
    pitch: i64,
    cols: i64,
    rows: i64,
    buckets: Vec<Vec<SiteId>>,
}

impl TypeGrid {
    fn new(sites: &[(SiteId, Point)]) -> Self {
        let min_x = sites.iter().map(|(_, p)| p.x).min().unwrap_or(0);
        let min_y = sites.iter().map(|(_, p)| p.y).min().unwrap_or(0);
        let max_x = sites.iter().map(|(_, p)| p.x).max().unwrap_or(0);
        let max_y = sites.iter().map(|(_, p)| p.y).max().unwrap_or(0);
        let area = (max_x - min_x + 1) as f64 * (max_y - min_y + 1) as f64;
        let buckets = (sites.len() / SITES_PER_BUCKET).max(1) as f64;
        let pitch = ((area / buckets).sqrt().ceil() as i64).max(1);
        let cols = (max_x - min_x) / pitch + 1;
        let rows = (max_y - min_y) / pitch + 1;
        let mut grid = Self {
            origin: Point::new(min_x, min_y),
            pitch,
            cols,
            rows,
            buckets: vec![Vec::new(); (cols * rows) as usize],
        };
        for (id, pos) in sites {
            grid.insert(*id, *pos);
        }
        grid
    }

    /// Bucket coordinates of `p`; may lie outside the grid.
    fn cell_of(&self, p: Point) -> (i64, i64) {
        (
            (p.x - self.origin.x).div_euclid(self.pitch),
            (p.y - self.origin.y).div_euclid(self.pitch),
        )
    }

    fn bucket_mut(&mut self, pos: Point) -> &mut Vec<SiteId> {
        let (col, row) = self.cell_of(pos);
        &mut self.buckets[(row * self.cols + col) as usize]
    }

    fn insert(&mut self, site: SiteId, pos: Point) {
        self.bucket_mut(pos).push(site);
    }

    fn remove(&mut self, site: SiteId, pos: Point) {
        let bucket = self.bucket_mut(pos);
        if let Some(i) = bucket.iter().position(|s| *s == site) {
            bucket.swap_remove(i);
        }
    }

    /// The free site minimizing `(nearness, id)`.
    ///
    /// Every site in ring `r` is more than `(r - 1) * pitch` away on some
    /// axis, so the scan stops once the best distance is within that bound.
    fn nearest(&self, target: Point, fabric: &Fabric) -> Option<(Nearness, SiteId)> {
        let (tc, tr) = self.cell_of(target);
        let first = [0, -tc, tc - (self.cols - 1), -tr, tr - (self.rows - 1)]
            .into_iter()
            .max()
            .unwrap_or(0);
        let last = [tc, self.cols - 1 - tc, tr, self.rows - 1 - tr]
            .into_iter()
            .map(i64::abs)
            .max()
            .unwrap_or(0);

        let mut best: Option<(Nearness, SiteId)> = None;
        for r in first..=last {
            if let Some(((l1, _), _)) = best {
                if l1 <= (r - 1) * self.pitch {
                    break;
                }
            }
            for row in (tr - r).max(0)..=(tr + r).min(self.rows - 1) {
                let step = if (row - tr).abs() == r { 1 } else { 2 * r };
                let mut col = tc - r;
                while col <= tc + r {
                    if (0..self.cols).contains(&col) {
                        for site in &self.buckets[(row * self.cols + col) as usize] {
                            let key = (fabric.site(*site).pos.nearness(target), *site);
                            if best.map_or(true, |b| key < b) {
                                best = Some(key);
                            }
                        }
                    }
                    col += step;
                }
            }
        }
        best
    }
}

/// Free/used state of every site on one fabric.
#[derive(Debug)]
pub struct SitePool<'f> {
    fabric: &'f Fabric,
    free_by_type: BTreeMap<String, BTreeSet<SiteId>>,
    grids: BTreeMap<String, TypeGrid>,
    type_roles: BTreeMap<String, SiteRole>,
    used: Vec<bool>,
    free_count: usize,
}

impl<'f> SitePool<'f> {
    /// A pool in which every site of `fabric` is free.
    pub fn new(fabric: &'f Fabric) -> Self {
        let mut free_by_type: BTreeMap<String, BTreeSet<SiteId>> = BTreeMap::new();
        let mut by_type: BTreeMap<&str, Vec<(SiteId, Point)>> = BTreeMap::new();
        let mut type_roles = BTreeMap::new();
        for site in fabric.sites() {
            free_by_type
                .entry(site.cell_type.clone())
                .or_default()
                .insert(site.id);
            by_type
                .entry(site.cell_type.as_str())
                .or_default()
                .push((site.id, site.pos));
            type_roles.insert(site.cell_type.clone(), site.role);
        }
        let grids = by_type
            .into_iter()
            .map(|(t, sites)| (t.to_string(), TypeGrid::new(&sites)))
            .collect();
        Self {
            fabric,
            free_by_type,
            grids,
            type_roles,
            used: vec![false; fabric.site_count()],
            free_count: fabric.site_count(),
        }
    }

    /// The fabric this pool partitions.
    pub fn fabric(&self) -> &'f Fabric {
        self.fabric
    }

    /// Returns `true` if `site` exists and is unclaimed.
    pub fn is_free(&self, site: SiteId) -> bool {
        self.used.get(site.index()).is_some_and(|used| !used)
    }

    /// Number of unclaimed sites.
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Number of claimed sites.
    pub fn used_count(&self) -> usize {
        self.used.len() - self.free_count
    }

    /// Claims `site`. Returns `false` if it was already claimed or does not exist.
    pub fn claim(&mut self, site: SiteId) -> bool {
        if !self.is_free(site) {
            return false;
        }
        let s = self.fabric.site(site);
        if let Some(set) = self.free_by_type.get_mut(&s.cell_type) {
            set.remove(&site);
        }
        if let Some(grid) = self.grids.get_mut(&s.cell_type) {
            grid.remove(site, s.pos);
        }
        self.used[site.index()] = true;
        self.free_count -= 1;
        true
    }

    /// Returns `site` to the free set. Returns `false` if it was not claimed.
    pub fn release(&mut self, site: SiteId) -> bool {
        if site.index() >= self.used.len() || !self.used[site.index()] {
            return false;
        }
        let s = self.fabric.site(site);
        self.free_by_type
            .entry(s.cell_type.clone())
            .or_default()
            .insert(site);
        if let Some(grid) = self.grids.get_mut(&s.cell_type) {
            grid.insert(site, s.pos);
        }
        self.used[site.index()] = false;
        self.free_count += 1;
        true
    }

    fn type_matches(&self, cell_type: &str, filter: SiteFilter<'_>) -> bool {
        match filter {
            SiteFilter::Any => true,
            SiteFilter::CellType(t) => t == cell_type,
            SiteFilter::Role(role) => self.type_roles.get(cell_type) == Some(&role),
            SiteFilter::RoleAmong(role, types) => {
                self.type_roles.get(cell_type) == Some(&role)
                    && (types.is_empty() || types.iter().any(|t| t == cell_type))
            }
        }
    }

    /// Free sites passing `filter`, in ascending ID order.
    pub fn free_sites(&self, filter: SiteFilter<'_>) -> Vec<SiteId> {
        let mut out: Vec<SiteId> = match filter {
            SiteFilter::CellType(t) => self
                .free_by_type
                .get(t)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
            _ => self
                .free_by_type
                .iter()
                .filter(|(t, _)| self.type_matches(t, filter))
                .flat_map(|(_, set)| set.iter().copied())
                .collect(),
        };
        out.sort_unstable();
        out
    }

    /// Number of free sites passing `filter`.
    pub fn count_free(&self, filter: SiteFilter<'_>) -> usize {
        self.free_by_type
            .iter()
            .filter(|(t, _)| self.type_matches(t, filter))
            .map(|(_, set)| set.len())
            .sum()
    }

    /// The free site passing `filter` nearest to `target`.
    ///
    /// Manhattan distance is the primary key, squared Euclidean distance
    /// breaks ties, and the lower site ID breaks any remaining tie.
    pub fn nearest(&self, target: Point, filter: SiteFilter<'_>) -> Option<SiteId> {
        self.grids
            .iter()
            .filter(|(t, _)| self.type_matches(t, filter))
            .filter(|(t, _)| self.free_by_type.get(*t).is_some_and(|f| !f.is_empty()))
            .filter_map(|(_, grid)| grid.nearest(target, self.fabric))
            .min()
            .map(|(_, site)| site)
    }

    /// Claims and returns the free site passing `filter` nearest to `target`.
    pub fn take_nearest(&mut self, target: Point, filter: SiteFilter<'_>) -> Option<SiteId> {
        let site = self.nearest(target, filter)?;
        self.claim(site);
        Some(site)
    }
}
