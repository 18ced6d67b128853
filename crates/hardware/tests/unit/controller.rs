//! Memory Controller Unit Tests.
//!
//! Verifies coherence states, clean write-back short-circuiting, address
//! translation, end-to-end placement through the front end, statistics and
//! concurrent use.

use std::fs;
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tiersim_core::common::constants::{NO_EXCL_FLAG, TRACE_HEADER};
use tiersim_core::common::error::{ConfigError, McError};
use tiersim_core::config::{Config, LruTableConfig, Scheme};
use tiersim_core::mc::request::MesiState;
use tiersim_core::soc::memory::device::MemoryDevice;
use tiersim_core::{MemReq, MemoryController, ReqType};

use crate::common::harness::{FAR_LATENCY, NEAR_LATENCY, config, tiers};
use crate::common::mocks::device::{CallLog, RecordingDevice};

/// One-block pages: 64 near frames, 64 far frames.
fn tiny(scheme: Scheme) -> Config {
    config(scheme, tiers(4096, 8192, 64, 64))
}

fn controller(config: &Config) -> (MemoryController, CallLog, CallLog) {
    let (near, near_log) = RecordingDevice::new("near0", NEAR_LATENCY);
    let (far, far_log) = RecordingDevice::new("far", FAR_LATENCY);
    let near: Vec<Box<dyn MemoryDevice>> = vec![Box::new(near)];
    let mc = MemoryController::with_devices(config, near, Box::new(far)).unwrap();
    (mc, near_log, far_log)
}

// ══════════════════════════════════════════════════════════
// 1. Request kinds and coherence
// ══════════════════════════════════════════════════════════

#[test]
fn clean_writeback_returns_arrival_cycle() {
    let (mc, near, far) = controller(&tiny(Scheme::LruTable));
    let mut req = MemReq::new(5, ReqType::Puts, 42);
    req.state = MesiState::M;
    assert_eq!(mc.access(&mut req), 42);
    assert_eq!(req.state, MesiState::I);
    assert!(near.is_empty() && far.is_empty());

    let stats = mc.stats();
    assert_eq!(stats.clean_writebacks, 1);
    assert_eq!(stats.requests, 0);
}

#[rstest]
#[case::shared_read(ReqType::Gets, 0, MesiState::E)]
#[case::shared_read_no_exclusive(ReqType::Gets, NO_EXCL_FLAG, MesiState::S)]
#[case::exclusive_read(ReqType::Getx, 0, MesiState::M)]
#[case::dirty_writeback(ReqType::Putx, 0, MesiState::I)]
fn coherence_state_granted(#[case] kind: ReqType, #[case] flags: u32, #[case] expected: MesiState) {
    let (mc, _, _) = controller(&tiny(Scheme::FarOnly));
    let mut req = MemReq::new(3, kind, 0).with_flags(flags);
    let _ = mc.access(&mut req);
    assert_eq!(req.state, expected);
}

#[test]
fn unknown_request_code_is_rejected() {
    assert_eq!(ReqType::try_from(3), Ok(ReqType::Putx));
    assert_eq!(ReqType::try_from(9), Err(McError::UnknownRequestType(9)));
}

// ══════════════════════════════════════════════════════════
// 2. Construction
// ══════════════════════════════════════════════════════════

#[test]
fn construction_rejects_bad_geometry() {
    let mut cfg = tiny(Scheme::Flat);
    cfg.tiers.near_size = cfg.tiers.total_size;
    assert!(matches!(
        MemoryController::new(&cfg),
        Err(ConfigError::NearTooLarge { .. })
    ));
}

#[test]
fn construction_requires_a_near_channel() {
    let (far, _) = RecordingDevice::new("far", FAR_LATENCY);
    let result = MemoryController::with_devices(&tiny(Scheme::Flat), Vec::new(), Box::new(far));
    assert_eq!(
        result.err(),
        Some(ConfigError::Zero {
            field: "tiers.near_channels"
        })
    );
}

#[test]
fn default_controller_builds_its_own_devices() {
    let mc = MemoryController::new(&Config::default()).unwrap();
    assert_eq!(mc.scheme(), Scheme::default());
    let names: Vec<String> = mc.device_stats().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["mem-near0", "mem-near1", "mem-near2", "mem-near3", "mem-far"]);
}

// ══════════════════════════════════════════════════════════
// 3. Dispatch
// ══════════════════════════════════════════════════════════

#[test]
fn line_addresses_wrap_modulo_physical_size() {
    let (mc, _, far) = controller(&tiny(Scheme::FarOnly));
    // 8 KiB = 128 lines; line 129 lands on byte 64.
    let _ = mc.access(&mut MemReq::new(129, ReqType::Gets, 0));
    assert_eq!(far.calls()[0].addr, 64);
}

#[test]
fn lru_end_to_end_evicts_first_page() {
    let mut cfg = tiny(Scheme::LruTable);
    cfg.lru = LruTableConfig {
        cache_size: 128,
        ways: 2,
        ..LruTableConfig::default()
    };
    let (mc, _, _) = controller(&cfg);
    for (cycle, line) in [0u64, 1, 2, 1].into_iter().enumerate() {
        let _ = mc.access(&mut MemReq::new(line, ReqType::Gets, cycle as u64));
    }
    let stats = mc.stats();
    assert_eq!(stats.requests, 4);
    assert_eq!(stats.slot_misses, 3);
    assert_eq!(stats.block_hits, 1);
    assert_eq!(stats.clean_evictions, 1);
    assert_eq!(stats.placements, 2);
    assert!(mc.check_invariants().is_ok());
}

#[test]
fn stats_split_near_and_far_service() {
    let (mc, _, _) = controller(&tiny(Scheme::Flat));
    // Flat: the top 4 KiB (lines 64..128) is near.
    for line in [0u64, 1, 64, 65, 66] {
        let _ = mc.access(&mut MemReq::new(line, ReqType::Gets, 0));
    }
    let _ = mc.access(&mut MemReq::new(70, ReqType::Putx, 0));
    let stats = mc.stats();
    assert_eq!(stats.requests, 6);
    assert_eq!(stats.writebacks, 1);
    assert_eq!((stats.near_served, stats.far_served), (4, 2));
    assert!((stats.near_ratio() - 4.0 / 6.0).abs() < 1e-12);

    let devices = mc.device_stats();
    assert_eq!(devices[0].1.writes, 1);
    assert_eq!(devices[1].1.reads, 2);
}

// ══════════════════════════════════════════════════════════
// 4. Concurrency
// ══════════════════════════════════════════════════════════

#[test]
fn controller_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MemoryController>();
}

#[test]
fn concurrent_requests_are_serialized() {
    let mut cfg = tiny(Scheme::HotCold);
    cfg.hot_cold.near_slots = 4;
    let (mc, _, _) = controller(&cfg);
    let mc = Arc::new(mc);

    thread::scope(|s| {
        for t in 0..4u64 {
            let mc = Arc::clone(&mc);
            let _ = s.spawn(move || {
                for i in 0..100u64 {
                    let kind = if i % 3 == 0 { ReqType::Putx } else { ReqType::Gets };
                    let _ = mc.access(&mut MemReq::new(t * 37 + i, kind, i));
                }
            });
        }
    });

    let stats = mc.stats();
    assert_eq!(stats.requests, 400);
    assert_eq!(stats.near_served + stats.far_served, 400);
    assert!(mc.check_invariants().is_ok());
}

// ══════════════════════════════════════════════════════════
// 5. Diagnostic trace
// ══════════════════════════════════════════════════════════

#[test]
fn trace_records_serialized_requests() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = tiny(Scheme::FarOnly);
    cfg.general.trace_enabled = true;
    cfg.general.trace_dir = dir.path().display().to_string();
    cfg.general.name = "unit".to_string();
    let (mc, _, _) = controller(&cfg);

    let _ = mc.access(&mut MemReq::new(0x10, ReqType::Gets, 1));
    let _ = mc.access(&mut MemReq::new(0x11, ReqType::Puts, 2));
    let _ = mc.access(&mut MemReq::new(0x12, ReqType::Putx, 3));
    mc.flush_trace();

    let text = fs::read_to_string(dir.path().join("unittrace.txt")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec![TRACE_HEADER, "1, 10, 0", "3, 12, 1"]);
}
