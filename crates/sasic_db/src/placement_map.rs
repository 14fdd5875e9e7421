//! The cell-name to site mapping shared by every stage after placement.

use sasic_common::SiteId;
use std::collections::{BTreeMap, HashMap};

/// Errors from placement map updates.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlacementMapError {
    /// The cell already owns a site.
    #[error("cell '{cell}' is already placed on site {site}")]
    CellAlreadyPlaced {
        /// Cell name.
        cell: String,
        /// Site it already owns.
        site: SiteId,
    },
    /// The site is already owned by another cell.
    #[error("site {site} is already owned by cell '{owner}'")]
    SiteTaken {
        /// Contested site.
        site: SiteId,
        /// Current owner.
        owner: String,
    },
}

/// A one-to-one `cell_name -> site` mapping.
///
/// Iteration order is by cell name so written artifacts are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementMap {
    by_cell: BTreeMap<String, SiteId>,
    by_site: HashMap<SiteId, String>,
}

impl PlacementMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `cell` on `site`. Fails if either side is already taken.
    pub fn insert(&mut self, cell: impl Into<String>, site: SiteId) -> Result<(), PlacementMapError> {
        let cell = cell.into();
        if let Some(existing) = self.by_cell.get(&cell) {
            return Err(PlacementMapError::CellAlreadyPlaced {
                cell,
                site: *existing,
            });
        }
        if let Some(owner) = self.by_site.get(&site) {
            return Err(PlacementMapError::SiteTaken {
                site,
                owner: owner.clone(),
            });
        }
        self.by_site.insert(site, cell.clone());
        self.by_cell.insert(cell, site);
        Ok(())
    }

    /// Exchanges the sites of two placed cells. Returns `false` if either is unplaced.
    pub fn swap(&mut self, a: &str, b: &str) -> bool {
        let (Some(sa), Some(sb)) = (self.site_of(a), self.site_of(b)) else {
            return false;
        };
        self.by_cell.insert(a.to_string(), sb);
        self.by_cell.insert(b.to_string(), sa);
        self.by_site.insert(sb, a.to_string());
        self.by_site.insert(sa, b.to_string());
        true
    }

    /// Moves a placed cell onto an unowned site, returning the site it left.
    pub fn relocate(&mut self, cell: &str, to: SiteId) -> Result<Option<SiteId>, PlacementMapError> {
        if let Some(owner) = self.by_site.get(&to) {
            if owner == cell {
                return Ok(Some(to));
            }
            return Err(PlacementMapError::SiteTaken {
                site: to,
                owner: owner.clone(),
            });
        }
        let old = self.by_cell.insert(cell.to_string(), to);
        if let Some(old) = old {
            self.by_site.remove(&old);
        }
        self.by_site.insert(to, cell.to_string());
        Ok(old)
    }

    /// Removes a cell, returning the site it owned.
    pub fn remove(&mut self, cell: &str) -> Option<SiteId> {
        let site = self.by_cell.remove(cell)?;
        self.by_site.remove(&site);
        Some(site)
    }

    /// Site owned by `cell`.
    pub fn site_of(&self, cell: &str) -> Option<SiteId> {
        self.by_cell.get(cell).copied()
    }

    /// Cell owning `site`.
    pub fn cell_at(&self, site: SiteId) -> Option<&str> {
        self.by_site.get(&site).map(String::as_str)
    }

    /// Returns `true` if `site` is owned by some cell.
    pub fn is_site_used(&self, site: SiteId) -> bool {
        self.by_site.contains_key(&site)
    }

    /// `(cell, site)` pairs sorted by cell name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SiteId)> {
        self.by_cell.iter().map(|(c, s)| (c.as_str(), *s))
    }

    /// Number of placed cells.
    pub fn len(&self) -> usize {
        self.by_cell.len()
    }

    /// Returns `true` if nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.by_cell.is_empty()
    }
}
