//! Register access layer for RustEVG.
//!
//! Outputs depend on the [`traits::RegisterCell`] capability rather than on raw
//! addresses, so the same code drives a mapped card ([`mmio`]) or a simulated
//! one ([`sim`]).

pub mod config;
pub mod mmio;
pub mod sim;
pub mod traits;
