/*!
 * Scheduler Scenario Tests
 * End-to-end tick sequences with exact expected traces
 */

use pretty_assertions::assert_eq;
use sched_sim::{
    ClassPolicy, DependencyRelease, Pid, Priority, PriorityPolicy, ProcessSpec, ProcessState,
    Scheduler, SimConfig,
};

fn run(scheduler: &mut Scheduler, ticks: usize) -> Vec<Option<Pid>> {
    (0..ticks).map(|_| scheduler.tick().executed).collect()
}

fn state(scheduler: &Scheduler, pid: Pid) -> ProcessState {
    scheduler.get_process(pid).unwrap().state
}

#[test]
fn test_round_robin_in_chunks_of_quantum() {
    let policy = PriorityPolicy::default().with_class(Priority::Medium, ClassPolicy::new(2, 1));
    let mut s = Scheduler::new(SimConfig::deterministic(1).with_policy(policy)).unwrap();
    for _ in 0..3 {
        s.create_process(5, None).unwrap();
    }
    s.admit_all_new();

    let trace = run(&mut s, 15);
    let expected: Vec<Option<Pid>> = [1, 1, 2, 2, 3, 3, 1, 1, 2, 2, 3, 3, 1, 2, 3]
        .into_iter()
        .map(Some)
        .collect();
    assert_eq!(trace, expected);

    assert_eq!(s.finished_pids(), &[1, 2, 3]);
    for pid in 1..=3 {
        assert_eq!(s.get_process(pid).unwrap().cpu_ticks, 5);
    }
    assert_eq!(s.stats().preemptions, 6);
    assert!(s.check_invariants().is_ok());
}

#[test]
fn test_round_robin_cycles_in_repeat_mode() {
    let policy = PriorityPolicy::default().with_class(Priority::Medium, ClassPolicy::new(2, 1));
    let config = SimConfig::deterministic(1)
        .with_policy(policy)
        .with_repeat_mode(true);
    let mut s = Scheduler::new(config).unwrap();
    for _ in 0..3 {
        s.create_process(5, None).unwrap();
    }

    run(&mut s, 30);
    assert!(s.finished_pids().is_empty());
    assert_eq!(s.stats().completions, 6);
    for pid in 1..=3 {
        assert_eq!(s.get_process(pid).unwrap().cpu_ticks, 10);
    }
}

#[test]
fn test_dependency_released_by_callee_progress() {
    let mut s = Scheduler::new(SimConfig::deterministic(1)).unwrap();
    let a = s.create_process(10, Some("A")).unwrap();
    let b = s.create_process(3, Some("B")).unwrap();
    s.admit_all_new();
    s.depend_on(a, b).unwrap();

    let first = s.tick();
    assert_eq!(first.executed, Some(b));
    assert_eq!(first.unblocked, vec![a]);
    assert_eq!(state(&s, a), ProcessState::Ready);

    run(&mut s, 2);
    assert_eq!(state(&s, b), ProcessState::Finished);
    assert_eq!(state(&s, a), ProcessState::Ready);
    assert_eq!(s.stats().orphaned, 0);

    assert_eq!(s.tick().executed, Some(a));
}

#[test]
fn test_dependency_orphaned_without_reply() {
    let config = SimConfig::deterministic(1).with_dependency_release(DependencyRelease::OnReply);
    let mut s = Scheduler::new(config).unwrap();
    let a = s.create_process(10, Some("A")).unwrap();
    let b = s.create_process(3, Some("B")).unwrap();
    s.admit_all_new();
    s.depend_on(a, b).unwrap();

    run(&mut s, 2);
    assert_eq!(s.get_process(a).unwrap().waiting_for_pid(), Some(b));

    let last = s.tick();
    assert_eq!(last.completed, Some(b));
    assert_eq!(last.orphaned, vec![a]);
    assert_eq!(state(&s, b), ProcessState::Finished);
    assert_eq!(state(&s, a), ProcessState::Zombie);
    assert_eq!(s.stats().orphaned, 1);
}

#[test]
fn test_recycled_callee_orphans_reply_waiters() {
    let config = SimConfig::deterministic(1)
        .with_repeat_mode(true)
        .with_dependency_release(DependencyRelease::OnReply);
    let mut s = Scheduler::new(config).unwrap();
    let a = s.create_process(10, Some("A")).unwrap();
    let b = s.create_process(3, Some("B")).unwrap();
    s.admit_all_new();
    s.depend_on(a, b).unwrap();

    run(&mut s, 2);
    let last = s.tick();
    assert_eq!(last.completed, Some(b));
    assert_eq!(last.orphaned, vec![a]);
    assert_eq!(state(&s, a), ProcessState::Zombie);
    assert_eq!(state(&s, b), ProcessState::Ready);

    run(&mut s, 50);
    assert!(s.blocked_pids().is_empty());
    assert_eq!(s.stats().orphaned, 1);
}

#[test]
fn test_dependency_released_by_reply() {
    let config = SimConfig::deterministic(1).with_dependency_release(DependencyRelease::OnReply);
    let mut s = Scheduler::new(config).unwrap();
    let a = s.create_process(10, Some("A")).unwrap();
    let b = s.create_process(3, Some("B")).unwrap();
    let c = s.create_process(3, Some("C")).unwrap();
    s.admit_all_new();
    s.depend_on(a, b).unwrap();

    // A reply from the wrong sender does not count
    s.reply(c, a, "noise").unwrap();
    s.reply(b, a, "OK").unwrap();

    let report = s.tick();
    assert_eq!(report.unblocked, vec![a]);
    assert_eq!(state(&s, a), ProcessState::Ready);
    assert_eq!(s.mailbox(a).len(), 1);
    assert_eq!(s.mailbox(a)[0].from, c);
}

#[test]
fn test_finalize_running_frees_cpu_for_next_tick() {
    let mut s = Scheduler::new(SimConfig::deterministic(1)).unwrap();
    for _ in 0..3 {
        s.create_process(5, None).unwrap();
    }
    s.tick();
    assert_eq!(s.running_pid(), Some(1));

    assert_eq!(s.finalize_pid(1), Ok(ProcessState::Finished));
    assert_eq!(s.running_pid(), None);

    let report = s.tick();
    assert_eq!(report.dispatched, Some(2));
    assert_eq!(report.executed, Some(2));
}

#[test]
fn test_zombie_simulation_and_reap() {
    let mut s = Scheduler::new(SimConfig::deterministic(1).with_simulate_zombie(true)).unwrap();
    let pid = s.create_process(2, None).unwrap();
    run(&mut s, 2);

    assert_eq!(state(&s, pid), ProcessState::Zombie);
    assert_eq!(s.get_process(pid).unwrap().finished_at, None);

    assert_eq!(s.reap_zombies(), vec![pid]);
    assert_eq!(state(&s, pid), ProcessState::Finished);
    assert_eq!(s.get_process(pid).unwrap().finished_at, Some(2));
}

#[test]
fn test_child_of_live_parent_becomes_zombie() {
    let mut s = Scheduler::new(SimConfig::deterministic(1)).unwrap();
    let parent = s.create_process(10, Some("shell")).unwrap();
    let child = s
        .spawn(
            ProcessSpec::new(1)
                .with_name("ls")
                .with_priority(Priority::High)
                .with_parent(parent),
        )
        .unwrap();

    let report = s.tick();
    assert_eq!(report.completed, Some(child));
    assert_eq!(state(&s, child), ProcessState::Zombie);

    s.finalize_pid(parent).unwrap();
    assert_eq!(state(&s, parent), ProcessState::Finished);
    assert_eq!(state(&s, child), ProcessState::Zombie);

    s.reap_zombies();
    assert_eq!(state(&s, child), ProcessState::Finished);
}

#[test]
fn test_repeat_mode_revives_when_cpu_runs_dry() {
    let config = SimConfig::deterministic(1).with_simulate_zombie(true);
    let mut s = Scheduler::new(config).unwrap();
    let a = s.create_process(1, None).unwrap();
    let b = s.create_process(1, None).unwrap();
    run(&mut s, 2);
    assert_eq!(s.zombie_pids(), &[a, b]);

    s.set_repeat_mode(false);
    assert_eq!(s.tick().revived, Vec::<Pid>::new());

    // Turning repeat mode back on revives at once
    assert_eq!(s.set_repeat_mode(true), vec![a, b]);
    assert_eq!(s.ready_pids(), vec![a, b]);
    assert_eq!(s.stats().revived, 2);
}

#[test]
fn test_repeat_mode_tick_revival() {
    let mut s = Scheduler::new(SimConfig::deterministic(1).with_repeat_mode(true)).unwrap();
    let pid = s.create_process(1, None).unwrap();
    s.finalize_pid(pid).unwrap();
    assert_eq!(state(&s, pid), ProcessState::Finished);

    let report = s.tick();
    assert_eq!(report.revived, vec![pid]);
    assert_eq!(report.dispatched, Some(pid));
    assert_eq!(report.completed, Some(pid));
    assert_eq!(state(&s, pid), ProcessState::Ready);
    assert_eq!(s.get_process(pid).unwrap().remaining_time, 1);
}

#[test]
fn test_weighted_service_across_classes() {
    let mut s = Scheduler::new(SimConfig::deterministic(1)).unwrap();
    for priority in [Priority::Low, Priority::Medium, Priority::High] {
        for _ in 0..2 {
            s.spawn(ProcessSpec::new(1_000).with_priority(priority)).unwrap();
        }
    }

    let mut classes = Vec::new();
    for _ in 0..200 {
        if let Some(pid) = s.tick().dispatched {
            classes.push(s.get_process(pid).unwrap().priority);
        }
    }

    use Priority::*;
    assert_eq!(
        &classes[..10],
        &[High, High, Medium, Medium, Low, High, High, Medium, Medium, Low]
    );
}
