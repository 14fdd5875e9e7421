//! Diagnostic codes with category prefixes for structured identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The flow stage a diagnostic code belongs to, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Input loading, prefixed with `L`.
    Load,
    /// Port assignment, leveling and placement, prefixed with `P`.
    Placement,
    /// Clock-tree synthesis, prefixed with `C`.
    ClockTree,
    /// Power-down ECO, prefixed with `E`.
    Eco,
    /// Post-stage validation, prefixed with `V`.
    Validation,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Load => 'L',
            Category::Placement => 'P',
            Category::ClockTree => 'C',
            Category::Eco => 'E',
            Category::Validation => 'V',
        }
    }
}

/// A structured diagnostic code: category prefix plus a numeric identifier.
///
/// Displayed as the prefix followed by a zero-padded 3-digit number,
/// e.g. `P101`, `C203`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}
