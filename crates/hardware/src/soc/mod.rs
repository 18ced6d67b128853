//! Memory devices behind the controller.
//!
//! The placement core never models memory internals; it only issues accesses
//! to the near-tier channel array and the far-tier device through [`memory::ports::TierPorts`].

/// Device timing models and the tier port array.
pub mod memory;
