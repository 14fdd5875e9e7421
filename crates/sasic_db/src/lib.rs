//! In-memory data model for structured-ASIC placement and ECO.
//!
//! The [`Fabric`] is the immutable site table, [`SitePool`] the single
//! free/used partition threaded through every stage, and [`Netlist`] the
//! cell arena the clock-tree and power-down passes extend. Loaders in
//! [`load`] and [`yosys`] build these from JSON inputs.

#![warn(missing_docs)]

pub mod fabric;
pub mod leakage;
pub mod load;
pub mod net_index;
pub mod netlist;
pub mod pins;
pub mod placement_map;
pub mod pool;
pub mod port_catalog;
pub mod role;
pub mod yosys;

pub use fabric::{Die, Fabric, Site};
pub use leakage::LeakageTable;
pub use load::LoadError;
pub use net_index::NetIndex;
pub use netlist::{
    Bit, ConstBit, LogicalCell, NetName, Netlist, NetlistError, Port, PortDirection,
};
pub use pins::{Pin, PinBinding, PinTable, Side};
pub use placement_map::{PlacementMap, PlacementMapError};
pub use pool::{SiteFilter, SitePool};
pub use port_catalog::{PortCatalog, PortList};
pub use role::RoleTable;
