/*!
 * Blocking Tests
 * I/O timers, pause, dependency waits, and rejected commands
 */

use pretty_assertions::assert_eq;
use sched_sim::{
    BlockKind, BlockReason, Pid, Priority, ProcessState, Scheduler, SchedulerError, SimConfig,
};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

/// Log sink shared with a scoped subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn scheduler() -> Scheduler {
    Scheduler::new(SimConfig::deterministic(21)).unwrap()
}

fn running(s: &mut Scheduler, burst: u32) -> Pid {
    let pid = s.create_process(burst, None).unwrap();
    s.admit_all_new();
    assert_eq!(s.dispatch(), Some(pid));
    pid
}

#[test]
fn test_io_countdown_then_redispatch() {
    let mut s = scheduler();
    let pid = running(&mut s, 20);
    s.block_running(BlockKind::IoFor(3)).unwrap();

    assert!(s.tick().unblocked.is_empty());
    assert!(s.tick().unblocked.is_empty());
    assert_eq!(s.get_process(pid).unwrap().io_remaining(), 1);

    let report = s.tick();
    assert_eq!(report.unblocked, vec![pid]);
    assert_eq!(report.dispatched, Some(pid));
    assert_eq!(report.executed, Some(pid));
    assert_eq!(s.get_process(pid).unwrap().block_reason(), None);
}

#[test]
fn test_pause_survives_ticks() {
    let mut s = scheduler();
    let pid = running(&mut s, 20);
    s.pause_running().unwrap();

    for _ in 0..10 {
        let report = s.tick();
        assert_eq!(report.executed, None);
    }
    assert_eq!(
        s.get_process(pid).unwrap().state,
        ProcessState::Blocked(BlockReason::Paused)
    );
    assert_eq!(s.get_process(pid).unwrap().state.label(), "paused");

    s.unblock_pid(pid).unwrap();
    assert_eq!(s.tick().executed, Some(pid));
}

#[test]
fn test_unblock_moves_to_class_tail() {
    let mut s = scheduler();
    let first = running(&mut s, 20);
    let second = s.create_process(20, None).unwrap();
    s.admit_all_new();
    s.block_running(BlockKind::IoFor(9)).unwrap();

    s.unblock_pid(first).unwrap();
    assert_eq!(s.ready_pids(), vec![second, first]);
}

#[test]
fn test_depend_on_from_every_live_state() {
    let mut s = scheduler();
    let callee = running(&mut s, 20);
    let from_new = s.create_process(5, None).unwrap();
    s.depend_on(from_new, callee).unwrap();
    assert!(s.new_pids().is_empty());
    assert_eq!(s.get_process(from_new).unwrap().waiting_for_pid(), Some(callee));

    let from_ready = s.create_process(5, None).unwrap();
    s.admit_all_new();
    s.depend_on(from_ready, callee).unwrap();
    assert!(s.ready_pids().is_empty());

    assert_eq!(s.blocked_pids(), &[from_new, from_ready]);
    assert_eq!(s.stats().dependency_waits, 2);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn test_depend_on_parks_running_caller() {
    let mut s = scheduler();
    let caller = running(&mut s, 20);
    let callee = s.create_process(5, None).unwrap();

    s.depend_on(caller, callee).unwrap();
    assert_eq!(s.running_pid(), None);
    assert_eq!(s.get_process(caller).unwrap().waiting_for_pid(), Some(callee));

    let report = s.tick();
    assert_eq!(report.dispatched, Some(callee));
    assert_eq!(report.unblocked, vec![caller]);
}

#[test]
fn test_depend_on_retargets_blocked_caller() {
    let mut s = scheduler();
    let caller = running(&mut s, 20);
    let callee = s.create_process(5, None).unwrap();
    s.block_running(BlockKind::IoFor(4)).unwrap();

    s.depend_on(caller, callee).unwrap();
    let process = s.get_process(caller).unwrap();
    assert_eq!(process.io_remaining(), 0);
    assert_eq!(process.waiting_for_pid(), Some(callee));
    assert_eq!(s.blocked_pids(), &[caller]);
}

#[test]
fn test_rejected_dependencies_change_nothing() {
    let mut s = scheduler();
    let a = s.create_process(5, Some("a")).unwrap();
    let b = s.create_process(5, Some("b")).unwrap();
    let done = s.create_process(5, Some("done")).unwrap();
    s.finalize_pid(done).unwrap();
    let before = s.snapshot();

    assert_eq!(s.depend_on(a, a), Err(SchedulerError::SelfDependency(a)));
    assert_eq!(s.depend_on(42, a), Err(SchedulerError::ProcessNotFound(42)));
    assert_eq!(s.depend_on(a, 42), Err(SchedulerError::ProcessNotFound(42)));
    assert!(matches!(
        s.depend_on(a, done),
        Err(SchedulerError::InvalidState { pid, .. }) if pid == done
    ));
    assert!(matches!(
        s.depend_on(done, b),
        Err(SchedulerError::InvalidState { pid, .. }) if pid == done
    ));

    assert_eq!(s.snapshot(), before);
}

#[test]
fn test_rejected_commands_log_warnings() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut s = scheduler();
        let a = s.create_process(5, None).unwrap();
        assert!(s.depend_on(a, a).is_err());
        assert!(s.block_running(BlockKind::Io).is_err());
        assert!(s.set_priority(42, Priority::High).is_err());
        assert!(s.finalize_pid(42).is_err());
        assert!(s.reply(a, 42, "OK").is_err());
    });

    let output = logs.contents();
    for event in [
        "Dependency rejected",
        "Block rejected",
        "Priority change rejected",
        "Finalize rejected",
        "Reply rejected",
    ] {
        assert!(output.contains(event), "missing {event:?} in {output}");
    }
}

#[test]
fn test_block_when_idle_is_rejected() {
    let mut s = scheduler();
    s.create_process(5, None).unwrap();
    let before = s.snapshot();

    assert_eq!(
        s.block_running(BlockKind::Io),
        Err(SchedulerError::NoRunningProcess)
    );
    assert_eq!(s.snapshot(), before);
}

#[test]
fn test_random_blocking_uses_configured_chance() {
    let config = SimConfig {
        auto_blocks: true,
        block_chance: 1.0,
        ..SimConfig::deterministic(21)
    };
    let mut s = Scheduler::new(config).unwrap();
    let pid = s.create_process(5, None).unwrap();

    let report = s.tick();
    assert_eq!(report.blocked, Some(pid));
    assert_eq!(report.executed, None);
    let process = s.get_process(pid).unwrap();
    assert_eq!(process.remaining_time, 5);
    assert!((3..=10).contains(&process.io_remaining()));
    assert_eq!(s.stats().io_blocks, 1);
}
