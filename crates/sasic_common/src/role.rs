//! The closed set of roles a fabric site or cell type can play.
//!
//! Roles are resolved once per cell type when the fabric is loaded (see
//! `sasic_db::RoleTable`); downstream stages match on [`SiteRole`] instead of
//! inspecting type-name strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a site (or the cell type occupying it) is used for.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteRole {
    /// General combinational logic.
    Logic,
    /// Buffer or inverter; candidate for clock-tree insertion.
    Buffer,
    /// Constant driver with tie-low and tie-high outputs.
    Tie,
    /// Well tap; never holds logic.
    Tap,
    /// Decoupling capacitor or filler; never holds logic.
    Decap,
    /// Sequential element clocked by the clock tree.
    Sink,
}

impl SiteRole {
    /// All roles, in declaration order.
    pub const ALL: [SiteRole; 6] = [
        SiteRole::Logic,
        SiteRole::Buffer,
        SiteRole::Tie,
        SiteRole::Tap,
        SiteRole::Decap,
        SiteRole::Sink,
    ];

    /// Returns `true` for roles whose sites carry inputs that can be tied off.
    pub fn is_tieable(self) -> bool {
        matches!(self, SiteRole::Logic | SiteRole::Sink | SiteRole::Buffer)
    }

    /// Returns `true` for physical-only roles with no logical function.
    pub fn is_physical_only(self) -> bool {
        matches!(self, SiteRole::Tap | SiteRole::Decap)
    }

    /// Lowercase name, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            SiteRole::Logic => "logic",
            SiteRole::Buffer => "buffer",
            SiteRole::Tie => "tie",
            SiteRole::Tap => "tap",
            SiteRole::Decap => "decap",
            SiteRole::Sink => "sink",
        }
    }
}

impl fmt::Display for SiteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tieable_roles() {
        assert!(SiteRole::Logic.is_tieable());
        assert!(SiteRole::Sink.is_tieable());
        assert!(!SiteRole::Tie.is_tieable());
        assert!(!SiteRole::Tap.is_tieable());
        assert!(SiteRole::Decap.is_physical_only());
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&SiteRole::Buffer).unwrap();
        assert_eq!(json, "\"buffer\"");
        let back: SiteRole = serde_json::from_str("\"tie\"").unwrap();
        assert_eq!(back, SiteRole::Tie);
    }

    #[test]
    fn display_matches_as_str() {
        for role in SiteRole::ALL {
            assert_eq!(role.to_string(), role.as_str());
        }
    }
}
