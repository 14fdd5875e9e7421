//! Shared foundational types used across the structured-ASIC flow.
//!
//! This crate provides the opaque arena IDs, integer database-unit geometry,
//! the closed site/cell role enumeration, and the common internal result type.

#![warn(missing_docs)]

pub mod geom;
pub mod ids;
pub mod result;
pub mod role;

pub use geom::{BBox, Point, DBU_PER_MICRON};
pub use ids::{CellId, NetBit, PinId, SiteId};
pub use result::{InternalError, SasicResult};
pub use role::SiteRole;
