//! Tier Port Unit Tests.
//!
//! Verifies near-channel interleaving, routing pass-through and that accesses are
//! delivered to the right device with the right hint and burst length.

use tiersim_core::mc::request::{Routing, TierRequest};
use tiersim_core::soc::memory::device::{AccessKind, MemoryDevice, QueueHint};
use tiersim_core::soc::memory::ports::TierPorts;

use crate::common::harness::Rig;
use crate::common::mocks::device::MockDevice;

// ══════════════════════════════════════════════════════════
// 1. Channel selection
// ══════════════════════════════════════════════════════════

#[test]
fn lines_interleave_round_robin() {
    let rig = Rig::with_channels(4);
    assert_eq!(rig.ports.near_channels(), 4);
    assert_eq!(rig.ports.near_channel(0), (0, 0));
    assert_eq!(rig.ports.near_channel(64), (1, 0));
    assert_eq!(rig.ports.near_channel(3 * 64 + 5), (3, 5));
    assert_eq!(rig.ports.near_channel(4 * 64), (0, 64));
    assert_eq!(rig.ports.near_channel(9 * 64 + 8), (1, 2 * 64 + 8));
}

#[test]
fn single_channel_is_identity() {
    let rig = Rig::new();
    assert_eq!(rig.ports.near_channel(0x12345), (0, 0x12345));
}

// ══════════════════════════════════════════════════════════
// 2. Delivery
// ══════════════════════════════════════════════════════════

#[test]
fn far_access_reaches_far_device_unchanged() {
    let mut near = MockDevice::new();
    let _ = near.expect_access().never();
    let mut far = MockDevice::new();
    let _ = far
        .expect_access()
        .withf(|req, hint, lines| {
            req.addr == 0xABC0
                && req.kind == AccessKind::Write
                && *hint == QueueHint::Background
                && *lines == 64
        })
        .times(1)
        .returning(|req, _, _| req.cycle + 7);

    let near: Vec<Box<dyn MemoryDevice>> = vec![Box::new(near)];
    let mut ports = TierPorts::new(near, Box::new(far));
    let req = TierRequest::new(0, false, 1000);
    let done = ports.far(&req, 0xABC0, AccessKind::Write, QueueHint::Background, 64);
    assert_eq!(done, 1007);
}

#[test]
fn near_access_selects_channel_and_local_address() {
    let mut ch0 = MockDevice::new();
    let _ = ch0.expect_access().never();
    let mut ch1 = MockDevice::new();
    let _ = ch1
        .expect_access()
        .withf(|req, _, _| req.addr == 64)
        .times(1)
        .returning(|req, _, _| req.cycle + 3);
    let mut far = MockDevice::new();
    let _ = far.expect_access().never();

    let near: Vec<Box<dyn MemoryDevice>> = vec![Box::new(ch0), Box::new(ch1)];
    let mut ports = TierPorts::new(near, Box::new(far));
    // Line 3 with two channels: channel 1, local line 1.
    let req = TierRequest::new(0, false, 10);
    assert_eq!(ports.near(&req, 3 * 64, AccessKind::Read, QueueHint::Immediate, 1), 13);
}

#[test]
fn routing_fields_pass_through() {
    let routing = Routing {
        child_id: 3,
        src_id: 9,
        flags: 1,
    };
    let mut far = MockDevice::new();
    let _ = far
        .expect_access()
        .withf(move |req, hint, lines| {
            req.routing == routing
                && req.cycle == 42
                && *hint == QueueHint::Immediate
                && *lines == 1
        })
        .times(1)
        .returning(|req, _, _| req.cycle);
    let near: Vec<Box<dyn MemoryDevice>> = vec![Box::new(MockDevice::new())];
    let mut ports = TierPorts::new(near, Box::new(far));
    let mut req = TierRequest::new(0, false, 42);
    req.routing = routing;
    let _ = ports.far(&req, 0, AccessKind::Read, QueueHint::Immediate, 1);
}

#[test]
fn stats_lists_near_channels_then_far() {
    let mut rig = Rig::with_channels(2);
    let req = TierRequest::new(0, false, 0);
    let _ = rig.ports.near(&req, 0, AccessKind::Read, QueueHint::Immediate, 1);
    let _ = rig.ports.far(&req, 0, AccessKind::Write, QueueHint::Immediate, 2);
    let stats = rig.ports.stats();
    let names: Vec<&str> = stats.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["near0", "near1", "far"]);
    assert_eq!(stats[2].1.writes, 1);
    assert_eq!(stats[2].1.lines, 2);
}
