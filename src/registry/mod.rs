//! Registry module orchestrator.
//!
//! The controller keeps one registry per backend kind and per hook slot;
//! the generic implementation lives in the private `core` module.

mod core;

pub use core::Registry;
