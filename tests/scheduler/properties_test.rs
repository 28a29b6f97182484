/*!
 * Scheduler Property Tests
 * Invariants over random command sequences
 */

use proptest::prelude::*;
use sched_sim::{
    BlockKind, ClassPolicy, DependencyRelease, Pid, Priority, PriorityPolicy, ProcessSpec,
    Scheduler, SimConfig,
};

#[derive(Debug, Clone)]
enum Command {
    Create(u32, Priority),
    Tick,
    BlockIo(u32),
    Pause,
    Unblock(Pid),
    Depend(Pid, Pid),
    Reply(Pid, Pid),
    Finalize(Pid),
    Reap,
    SetPriority(Pid, Priority),
    RepeatMode(bool),
}

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

fn command() -> impl Strategy<Value = Command> {
    let pid = 1u32..12;
    prop_oneof![
        3 => (1u32..8, priority()).prop_map(|(burst, prio)| Command::Create(burst, prio)),
        6 => Just(Command::Tick),
        1 => (1u32..5).prop_map(Command::BlockIo),
        1 => Just(Command::Pause),
        1 => pid.clone().prop_map(Command::Unblock),
        1 => (pid.clone(), pid.clone()).prop_map(|(a, b)| Command::Depend(a, b)),
        1 => (pid.clone(), pid.clone()).prop_map(|(a, b)| Command::Reply(a, b)),
        1 => pid.clone().prop_map(Command::Finalize),
        1 => Just(Command::Reap),
        1 => (pid, priority()).prop_map(|(p, prio)| Command::SetPriority(p, prio)),
        1 => any::<bool>().prop_map(Command::RepeatMode),
    ]
}

fn config() -> impl Strategy<Value = SimConfig> {
    (
        any::<u64>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        prop_oneof![Just(DependencyRelease::OnProgress), Just(DependencyRelease::OnReply)],
        prop::option::of(1u64..5),
    )
        .prop_map(
            |(seed, arrivals, blocks, zombie, repeat, release, ttl)| SimConfig {
                auto_arrivals: arrivals,
                auto_blocks: blocks,
                simulate_zombie: zombie,
                repeat_mode: repeat,
                dependency_release: release,
                arrival_chance: 0.3,
                block_chance: 0.2,
                dependency_injection_chance: 0.2,
                finished_ttl: ttl,
                ..SimConfig::deterministic(seed)
            },
        )
}

fn apply(s: &mut Scheduler, command: &Command) {
    // Rejected commands are part of the exercise; only the invariants matter
    let _ = match command {
        Command::Create(burst, prio) => s
            .spawn(ProcessSpec::new(*burst).with_priority(*prio))
            .map(|_| ()),
        Command::Tick => {
            s.tick();
            Ok(())
        }
        Command::BlockIo(ticks) => s.block_running(BlockKind::IoFor(*ticks)).map(|_| ()),
        Command::Pause => s.pause_running().map(|_| ()),
        Command::Unblock(pid) => s.unblock_pid(*pid),
        Command::Depend(a, b) => s.depend_on(*a, *b),
        Command::Reply(a, b) => s.reply(*a, *b, "OK"),
        Command::Finalize(pid) => s.finalize_pid(*pid).map(|_| ()),
        Command::Reap => {
            s.reap_zombies();
            Ok(())
        }
        Command::SetPriority(pid, prio) => s.set_priority(*pid, *prio),
        Command::RepeatMode(on) => {
            s.set_repeat_mode(*on);
            Ok(())
        }
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_invariants_hold_after_every_command(
        config in config(),
        commands in prop::collection::vec(command(), 1..120),
    ) {
        let mut s = Scheduler::new(config).unwrap();
        for command in &commands {
            apply(&mut s, command);

            prop_assert_eq!(s.check_invariants(), Ok(()));
            let stats = s.stats();
            prop_assert_eq!(stats.created, s.len() as u64 + stats.expired);
            prop_assert!(s.running_pid().map_or(true, |pid| s.get_process(pid).is_some()));
        }
    }

    #[test]
    fn prop_pids_strictly_increase(
        bursts in prop::collection::vec(0u32..6, 1..60),
        ticks_between in 0usize..3,
    ) {
        let mut s = Scheduler::with_seed(7);
        let mut last: Option<Pid> = None;
        for burst in bursts {
            match s.create_process(burst, None) {
                Ok(pid) => {
                    prop_assert!(last.map_or(true, |prev| pid > prev));
                    last = Some(pid);
                }
                Err(_) => prop_assert_eq!(burst, 0),
            }
            for _ in 0..ticks_between {
                s.tick();
            }
        }
    }

    #[test]
    fn prop_quantum_bound_with_ready_peers(
        seed in any::<u64>(),
        bursts in prop::collection::vec((1u32..15, priority()), 2..10),
        ticks in 1usize..80,
    ) {
        let config = SimConfig {
            auto_blocks: true,
            block_chance: 0.1,
            ..SimConfig::deterministic(seed)
        };
        let mut s = Scheduler::new(config).unwrap();
        for (burst, prio) in bursts {
            s.spawn(ProcessSpec::new(burst).with_priority(prio)).unwrap();
        }

        for _ in 0..ticks {
            s.tick();
            if let (Some(pid), Some(used)) = (s.running_pid(), s.quantum_used()) {
                let quantum = s.config().policy.quantum(s.get_process(pid).unwrap().priority);
                if !s.ready_pids().is_empty() {
                    prop_assert!(used < quantum);
                }
                prop_assert!(used >= 1);
            }
        }
    }

    #[test]
    fn prop_every_class_served_within_total_weight(
        weights in (1u32..4, 1u32..4, 1u32..4),
        quanta in (1u32..5, 1u32..5, 1u32..5),
        per_class in 1usize..3,
    ) {
        let policy = PriorityPolicy::default()
            .with_class(Priority::High, ClassPolicy::new(quanta.0, weights.0))
            .with_class(Priority::Medium, ClassPolicy::new(quanta.1, weights.1))
            .with_class(Priority::Low, ClassPolicy::new(quanta.2, weights.2));
        let window = policy.total_weight() as usize;
        let mut s = Scheduler::new(SimConfig::deterministic(3).with_policy(policy)).unwrap();
        for prio in Priority::CYCLE {
            for _ in 0..per_class {
                s.spawn(ProcessSpec::new(10_000).with_priority(prio)).unwrap();
            }
        }

        let mut served = Vec::new();
        for _ in 0..400 {
            if let Some(pid) = s.tick().dispatched {
                served.push(s.get_process(pid).unwrap().priority);
            }
        }

        prop_assert!(served.len() >= window * 3);
        for slice in served.windows(window) {
            for prio in Priority::CYCLE {
                prop_assert!(slice.contains(&prio), "{:?} missing from {:?}", prio, slice);
            }
        }
    }
}
