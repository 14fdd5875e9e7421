//! Opaque ID newtypes for fabric and netlist entities.
//!
//! [`SiteId`], [`CellId`] and [`PinId`] are arena indices. [`NetBit`] is the
//! integer net identifier carried over from the synthesized netlist, so it
//! is stable across load and save but not necessarily dense.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` value.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` value.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the raw value widened for slice indexing.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a physical site on the fabric.
    SiteId
);

define_id!(
    /// Opaque, copyable ID for a logical cell in the netlist arena.
    CellId
);

define_id!(
    /// Opaque, copyable ID for a top-level I/O pin.
    PinId
);

define_id!(
    /// Integer identifier of a single-bit net.
    NetBit
);
