//! Cell-type to role resolution.
//!
//! Each distinct cell type is classified exactly once, when the fabric is
//! loaded. Exact overrides from configuration win over the built-in
//! name patterns.

use sasic_common::SiteRole;
use std::collections::BTreeMap;

enum Rule {
    Prefix(&'static str),
    Contains(&'static str),
}

/// Built-in classification rules, checked in order against the
/// lowercased type name with any `library__` prefix removed.
const DEFAULT_RULES: &[(Rule, SiteRole)] = &[
    (Rule::Prefix("tap"), SiteRole::Tap),
    (Rule::Prefix("decap"), SiteRole::Decap),
    (Rule::Prefix("fill"), SiteRole::Decap),
    (Rule::Prefix("conb"), SiteRole::Tie),
    (Rule::Prefix("clkbuf"), SiteRole::Buffer),
    (Rule::Prefix("buf"), SiteRole::Buffer),
    (Rule::Prefix("clkinv"), SiteRole::Buffer),
    (Rule::Prefix("inv"), SiteRole::Buffer),
    (Rule::Contains("df"), SiteRole::Sink),
];

/// Resolves cell-type names to [`SiteRole`]s.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    overrides: BTreeMap<String, SiteRole>,
}

impl RoleTable {
    /// A table using only the built-in patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with exact per-type overrides.
    pub fn with_overrides(overrides: BTreeMap<String, SiteRole>) -> Self {
        Self { overrides }
    }

    /// Classifies `cell_type`.
    pub fn resolve(&self, cell_type: &str) -> SiteRole {
        if let Some(role) = self.overrides.get(cell_type) {
            return *role;
        }
        let base = type_base(cell_type).to_ascii_lowercase();
        DEFAULT_RULES
            .iter()
            .find(|(rule, _)| match rule {
                Rule::Prefix(p) => base.starts_with(p),
                Rule::Contains(p) => base.contains(p),
            })
            .map(|(_, role)| *role)
            .unwrap_or(SiteRole::Logic)
    }
}

/// Strips a `library__` prefix: `sky130_fd_sc_hd__nand2_1` becomes `nand2_1`.
pub fn type_base(cell_type: &str) -> &str {
    cell_type
        .rsplit_once("__")
        .map(|(_, base)| base)
        .unwrap_or(cell_type)
}

/// The drive-strength-free family of a type: `sky130_fd_sc_hd__nand2_1` is `nand2`.
pub fn type_family(cell_type: &str) -> &str {
    let base = type_base(cell_type);
    base.split('_').next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns() {
        let t = RoleTable::new();
        assert_eq!(t.resolve("sky130_fd_sc_hd__nand2_1"), SiteRole::Logic);
        assert_eq!(t.resolve("sky130_fd_sc_hd__buf_2"), SiteRole::Buffer);
        assert_eq!(t.resolve("sky130_fd_sc_hd__clkbuf_4"), SiteRole::Buffer);
        assert_eq!(t.resolve("sky130_fd_sc_hd__inv_2"), SiteRole::Buffer);
        assert_eq!(t.resolve("sky130_fd_sc_hd__conb_1"), SiteRole::Tie);
        assert_eq!(t.resolve("sky130_fd_sc_hd__tapvpwrvgnd_1"), SiteRole::Tap);
        assert_eq!(t.resolve("sky130_fd_sc_hd__decap_4"), SiteRole::Decap);
        assert_eq!(t.resolve("sky130_fd_sc_hd__fill_1"), SiteRole::Decap);
        assert_eq!(t.resolve("sky130_fd_sc_hd__dfxtp_1"), SiteRole::Sink);
        assert_eq!(t.resolve("sky130_fd_sc_hd__dfrtp_4"), SiteRole::Sink);
    }

    #[test]
    fn tristate_buffer_is_logic() {
        assert_eq!(
            RoleTable::new().resolve("sky130_fd_sc_hd__ebufn_2"),
            SiteRole::Logic
        );
    }

    #[test]
    fn override_wins() {
        let mut o = BTreeMap::new();
        o.insert("sky130_fd_sc_hd__buf_1".to_string(), SiteRole::Logic);
        let t = RoleTable::with_overrides(o);
        assert_eq!(t.resolve("sky130_fd_sc_hd__buf_1"), SiteRole::Logic);
        assert_eq!(t.resolve("sky130_fd_sc_hd__buf_2"), SiteRole::Buffer);
    }

    #[test]
    fn family_strips_library_and_drive() {
        assert_eq!(type_base("sky130_fd_sc_hd__nand2_1"), "nand2_1");
        assert_eq!(type_family("sky130_fd_sc_hd__nand2_1"), "nand2");
        assert_eq!(type_family("sky130_fd_sc_hd__nand2_4"), "nand2");
        assert_eq!(type_family("plain"), "plain");
    }
}
