//! Static layouts without migration.
//!
//! - `FarOnly`: the near tier is unused; every request goes to the far device.
//! - `FlatMap`: the highest `near_size` bytes of the physical space are backed by
//!   the near tier and everything below by the far tier.

use crate::common::constants::LINE_SIZE;
use crate::common::error::McError;
use crate::config::TierConfig;
use crate::mc::request::TierRequest;
use crate::soc::memory::device::{AccessKind, QueueHint};
use crate::soc::memory::ports::TierPorts;

use super::{Lookup, Outcome, PlacementEngine, Tier};

fn kind(req: &TierRequest) -> AccessKind {
    if req.write {
        AccessKind::Write
    } else {
        AccessKind::Read
    }
}

fn block_lines(tiers: &TierConfig) -> u32 {
    (tiers.block_size / LINE_SIZE).max(1) as u32
}

/// Serves every request from the far tier.
#[derive(Clone, Copy, Debug)]
pub struct FarOnly {
    lines: u32,
}

impl FarOnly {
    /// Creates the engine; only the block size matters.
    pub fn new(tiers: &TierConfig) -> Self {
        Self {
            lines: block_lines(tiers),
        }
    }
}

impl PlacementEngine for FarOnly {
    fn name(&self) -> &'static str {
        "FarOnly"
    }

    fn classify_and_migrate(
        &mut self,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        let ready = ports.far(req, req.addr.val(), kind(req), QueueHint::Immediate, self.lines);
        Ok(Outcome::new(ready, Tier::Far, Lookup::Untracked))
    }

    fn check_invariants(&self) -> Result<(), McError> {
        Ok(())
    }
}

/// Fixed split of the physical space between tiers.
#[derive(Clone, Copy, Debug)]
pub struct FlatMap {
    near_base: u64,
    lines: u32,
}

impl FlatMap {
    /// Creates the engine for the given tier sizes.
    pub fn new(tiers: &TierConfig) -> Self {
        Self {
            near_base: tiers.far_size(),
            lines: block_lines(tiers),
        }
    }

    /// Returns the first physical address backed by the near tier.
    pub fn near_base(&self) -> u64 {
        self.near_base
    }
}

impl PlacementEngine for FlatMap {
    fn name(&self) -> &'static str {
        "Flat"
    }

    fn classify_and_migrate(
        &mut self,
        req: &TierRequest,
        ports: &mut TierPorts,
    ) -> Result<Outcome, McError> {
        let addr = req.addr.val();
        let outcome = if addr >= self.near_base {
            let near = addr - self.near_base;
            let ready = ports.near(req, near, kind(req), QueueHint::Immediate, self.lines);
            Outcome::new(ready, Tier::Near, Lookup::Untracked)
        } else {
            let ready = ports.far(req, addr, kind(req), QueueHint::Immediate, self.lines);
            Outcome::new(ready, Tier::Far, Lookup::Untracked)
        };
        Ok(outcome)
    }

    fn check_invariants(&self) -> Result<(), McError> {
        Ok(())
    }
}
