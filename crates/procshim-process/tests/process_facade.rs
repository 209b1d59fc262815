//! Facade behavior against a scripted host

mod common;

use std::sync::Arc;

use common::{FakeHost, SELF_PID};
use parking_lot::Mutex;
use procshim_process::{
    Capability, HrTime, IdEntry, IdentityStrategy, PermissionLevel, Permissions, Platform,
    Process, ProcessError, ProcessEvent, ProcessIdentity, ShimConfig, SignalArg, Warning,
    WarningEvent, WarningOptions,
};
use tokio::sync::broadcast::error::TryRecvError;

fn facade(host: Arc<FakeHost>) -> Process {
    Process::new(host, ShimConfig::default()).unwrap()
}

fn facade_with(host: Arc<FakeHost>, config: ShimConfig) -> Process {
    Process::new(host, config).unwrap()
}

#[test]
fn test_exit_publishes_before_exit_then_exit() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(Arc::clone(&host));
    let mut rx = process.subscribe();

    assert_eq!(process.exit_code(), None);
    process.exit(Some(3)).unwrap();

    assert!(matches!(rx.try_recv(), Ok(ProcessEvent::BeforeExit { code: 3 })));
    assert!(matches!(rx.try_recv(), Ok(ProcessEvent::Exit { code: 3 })));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(process.exit_code(), Some(3));
    assert_eq!(*host.exits.lock(), vec![3]);
}

#[test]
fn test_exit_code_is_set_once() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(Arc::clone(&host));

    process.exit(None).unwrap();
    assert_eq!(process.exit_code(), Some(0));

    assert!(matches!(process.exit(Some(9)), Err(ProcessError::AlreadyExiting)));
    assert_eq!(process.exit_code(), Some(0));
    assert_eq!(*host.exits.lock(), vec![0]);
}

#[test]
fn test_kill_defaults_to_sigterm() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(Arc::clone(&host));
    let mut rx = process.subscribe();

    process.kill(1, SignalArg::default()).unwrap();

    assert_eq!(*host.kills.lock(), vec![(1, 15)]);
    match rx.try_recv().unwrap() {
        ProcessEvent::Signal { pid, name, number } => {
            assert_eq!((pid, name, number), (1, Some("SIGTERM"), 15));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_kill_uses_platform_numbering() {
    let linux = Arc::new(FakeHost::linux());
    facade(Arc::clone(&linux)).kill(1, "SIGUSR1").unwrap();
    assert_eq!(*linux.kills.lock(), vec![(1, 10)]);

    let darwin = Arc::new(FakeHost::new(Platform::Darwin));
    facade(Arc::clone(&darwin)).kill(1, "SIGUSR1").unwrap();
    assert_eq!(*darwin.kills.lock(), vec![(1, 30)]);
}

#[test]
fn test_kill_missing_process() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(host);

    let err = process.kill(99_999, "SIGTERM").unwrap_err();
    assert!(matches!(err, ProcessError::ProcessNotFound { pid: 99_999 }));
}

#[test]
fn test_kill_rejects_unknown_signals_before_delivery() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(Arc::clone(&host));

    assert!(matches!(process.kill(1, 77), Err(ProcessError::InvalidSignal(_))));
    assert!(matches!(process.kill(1, "SIGINFO"), Err(ProcessError::InvalidSignal(_))));
    assert!(host.kills.lock().is_empty());
}

#[test]
fn test_kill_on_windows_is_not_implemented() {
    let host = Arc::new(FakeHost::new(Platform::Windows));
    let process = facade(Arc::clone(&host));

    assert!(matches!(
        process.kill(1, 9),
        Err(ProcessError::NotImplemented { member: "kill" })
    ));
    assert!(host.kills.lock().is_empty());
}

#[test]
fn test_abort_targets_self() {
    let host = Arc::new(FakeHost::linux());
    facade(Arc::clone(&host)).abort().unwrap();
    assert_eq!(*host.kills.lock(), vec![(SELF_PID as i32, 6)]);
}

#[test]
fn test_run_permission_gates_kill() {
    let host = Arc::new(FakeHost::linux());
    let mut config = ShimConfig::default();
    config.permissions = Permissions::allow_all().with(Capability::Run, PermissionLevel::Deny);
    let process = facade_with(Arc::clone(&host), config);

    assert!(matches!(
        process.kill(1, "SIGTERM"),
        Err(ProcessError::PermissionDenied { capability: Capability::Run })
    ));
    assert!(host.kills.lock().is_empty());
}

#[test]
fn test_env_and_argv_permissions() {
    let host = Arc::new(FakeHost::linux());
    let mut config = ShimConfig::default();
    config.permissions = Permissions::deny_all();
    let process = facade_with(host, config);

    assert!(matches!(
        process.env(),
        Err(ProcessError::PermissionDenied { capability: Capability::Env })
    ));
    assert!(matches!(
        process.argv(),
        Err(ProcessError::PermissionDenied { capability: Capability::Read })
    ));
    // the rest of the facade still works
    assert_eq!(process.pid(), SELF_PID);
}

#[test]
fn test_host_state_reads() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(Arc::clone(&host));

    assert_eq!(
        process.argv().unwrap(),
        vec!["/usr/local/bin/procshim", "script.js", "--flag"]
    );
    assert_eq!(process.argv0().unwrap(), "procshim");
    assert_eq!(process.env_var("HOME").unwrap().as_deref(), Some("/home/alice"));
    assert_eq!(process.env_var("MISSING").unwrap(), None);

    process.chdir("/tmp").unwrap();
    assert_eq!(process.cwd().unwrap().to_str(), Some("/tmp"));
    assert_eq!(process.platform(), "linux");
    assert_eq!(process.arch(), "x64");
    assert_eq!(process.ppid(), 1);
}

#[test]
fn test_identity_from_command() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(Arc::clone(&host));

    assert_eq!(process.getuid().unwrap(), Some(501));
    assert_eq!(process.geteuid().unwrap(), Some(501));
    assert_eq!(process.getgid().unwrap(), Some(20));
    assert_eq!(process.getegid().unwrap(), Some(20));
    assert_eq!(process.getgroups().unwrap(), Some(vec![20, 12, 61]));

    // resolved once, then cached
    assert_eq!(host.commands.lock().len(), 1);
}

#[test]
fn test_identity_prefers_native_accessor() {
    let mut host = FakeHost::linux();
    host.native = Some(ProcessIdentity {
        uid: IdEntry::new(1000, "bob"),
        gid: IdEntry::new(1000, "bob"),
        euid: Some(IdEntry::new(0, "root")),
        egid: None,
        groups: vec![IdEntry::new(1000, "bob")],
    });
    let host = Arc::new(host);
    let process = facade(Arc::clone(&host));

    assert_eq!(process.getuid().unwrap(), Some(1000));
    assert_eq!(process.geteuid().unwrap(), Some(0));
    assert!(host.commands.lock().is_empty());
}

#[test]
fn test_command_strategy_skips_native() {
    let mut host = FakeHost::linux();
    host.native = Some(ProcessIdentity {
        uid: IdEntry::unnamed(7),
        gid: IdEntry::unnamed(7),
        euid: None,
        egid: None,
        groups: vec![],
    });
    let host = Arc::new(host);
    let mut config = ShimConfig::default();
    config.identity.strategy = IdentityStrategy::Command;
    config.identity.command = "/usr/bin/id".to_string();
    let process = facade_with(Arc::clone(&host), config);

    assert_eq!(process.getuid().unwrap(), Some(501));
    assert_eq!(*host.commands.lock(), vec!["/usr/bin/id".to_string()]);
}

#[test]
fn test_eager_identity_resolves_at_construction() {
    let host = Arc::new(FakeHost::linux());
    let mut config = ShimConfig::default();
    config.identity.eager = true;
    let _process = facade_with(Arc::clone(&host), config);

    assert_eq!(host.commands.lock().len(), 1);
}

#[test]
fn test_identity_failure_is_local() {
    let mut host = FakeHost::linux();
    host.id_output = Some("garbage".to_string());
    let process = facade(Arc::new(host));

    assert!(matches!(process.getuid(), Err(ProcessError::Parse(_))));
    assert!(matches!(process.getgroups(), Err(ProcessError::Parse(_))));
    assert!(process.kill(1, "SIGHUP").is_ok());
    assert_eq!(process.env_var("HOME").unwrap().as_deref(), Some("/home/alice"));
}

#[test]
fn test_identity_command_failure_is_parse_error() {
    let mut host = FakeHost::linux();
    host.id_output = None;
    let process = facade(Arc::new(host));

    assert!(matches!(process.getgid(), Err(ProcessError::Parse(_))));
}

#[test]
fn test_identity_command_needs_run_permission() {
    let host = Arc::new(FakeHost::linux());
    let mut config = ShimConfig::default();
    config.permissions = Permissions::allow_all().with(Capability::Run, PermissionLevel::Deny);
    let process = facade_with(Arc::clone(&host), config);

    assert!(matches!(
        process.getuid(),
        Err(ProcessError::PermissionDenied { capability: Capability::Run })
    ));
    assert!(host.commands.lock().is_empty());
}

#[test]
fn test_identity_unsupported_on_windows() {
    let host = Arc::new(FakeHost::new(Platform::Windows));
    let process = facade(Arc::clone(&host));

    assert_eq!(process.getuid().unwrap(), None);
    assert_eq!(process.getgroups().unwrap(), None);
    assert_eq!(process.platform(), "win32");
    assert!(host.commands.lock().is_empty());
}

#[test]
fn test_emit_warning_defaults() {
    let process = facade(Arc::new(FakeHost::linux()));
    let mut rx = process.subscribe();

    process.emit_warning("oops", WarningOptions::new());

    match rx.try_recv().unwrap() {
        ProcessEvent::Warning(WarningEvent::Record(record)) => {
            assert_eq!(record.name, "Warning");
            assert_eq!(record.message, "oops");
            assert_eq!(record.code, None);
            assert_eq!(record.warning_type, None);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_emit_warning_positional_and_options_agree() {
    let process = facade(Arc::new(FakeHost::linux()));
    let mut rx = process.subscribe();

    process.emit_warning_with("slow", Some("PerfWarning"), Some("P1"), None);
    process.emit_warning(
        "slow",
        WarningOptions::new().warning_type("PerfWarning").code("P1"),
    );

    let records: Vec<_> = (0..2)
        .map(|_| match rx.try_recv().unwrap() {
            ProcessEvent::Warning(WarningEvent::Record(r)) => (r.warning_type, r.code, r.message),
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(records[0], records[1]);
    assert_eq!(records[0].1.as_deref(), Some("P1"));
}

#[test]
fn test_emit_warning_forwards_errors() {
    let process = facade(Arc::new(FakeHost::linux()));
    let mut rx = process.subscribe();

    let err = std::io::Error::new(std::io::ErrorKind::Other, "disk almost full");
    process.emit_warning(Warning::error(err), None);

    match rx.try_recv().unwrap() {
        ProcessEvent::Warning(WarningEvent::Error(e)) => {
            assert_eq!(e.to_string(), "disk almost full");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_no_deprecation_suppresses_deprecations_only() {
    let process = facade(Arc::new(FakeHost::linux()));
    process.set_no_deprecation(true);
    let mut rx = process.subscribe();

    process.emit_warning("old", "DeprecationWarning");
    process.emit_warning("other", "Warning");

    match rx.try_recv().unwrap() {
        ProcessEvent::Warning(event) => assert_eq!(event.message(), "other"),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_hrtime_from_host_clock() {
    let host = Arc::new(FakeHost::linux());
    let process = facade(Arc::clone(&host));

    host.advance(2_500.000_5);
    let start = process.hrtime();
    assert_eq!(start, HrTime::new(2, 500_000_500));

    host.advance(1.25);
    assert_eq!(process.hrtime_since(start), HrTime::new(0, 1_250_000));
    assert_eq!(process.hrtime_bigint(), 2_501_250_500);

    // prior reading from the future saturates at zero
    assert_eq!(process.hrtime_since(HrTime::new(10, 0)), HrTime::default());
}

#[test]
fn test_cpu_usage_is_load_average_delta() {
    let process = facade(Arc::new(FakeHost::linux()));

    let first = process.cpu_usage(None);
    assert_eq!((first.user, first.system), (1.5, 0.75));

    let delta = process.cpu_usage(Some(first));
    assert_eq!((delta.user, delta.system), (0.0, 0.0));
}

#[test]
fn test_next_tick_runs_after_current_work_in_order() {
    let process = facade(Arc::new(FakeHost::linux()));
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let log = Arc::clone(&log);
        process.next_tick(move || log.lock().push(format!("tick {}", i)));
    }
    {
        let log = Arc::clone(&log);
        process.next_tick_with(move |args: Vec<&str>| log.lock().push(args.join(",")), vec!["a", "b"]);
    }
    log.lock().push("sync".to_string());

    assert_eq!(process.pending_ticks(), 4);
    assert_eq!(process.run_ticks(), 4);
    assert_eq!(
        *log.lock(),
        vec!["sync", "tick 0", "tick 1", "tick 2", "a,b"]
    );
}

#[test]
fn test_exit_drains_ticks_before_before_exit() {
    let host = Arc::new(FakeHost::linux());
    let process = Arc::new(facade(Arc::clone(&host)));
    let mut rx = process.subscribe();
    let seen = Arc::new(Mutex::new(Vec::new()));

    {
        let (p, seen) = (Arc::clone(&process), Arc::clone(&seen));
        process.next_tick(move || {
            p.emit_warning("from tick", "Warning");
            seen.lock().push((p.exit_code(), p.exit(Some(7)).is_err()));
        });
    }

    process.exit(Some(2)).unwrap();

    // still closing while the tick ran, and a nested exit was refused
    assert_eq!(*seen.lock(), vec![(None, true)]);
    assert_eq!(process.pending_ticks(), 0);

    let names: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|event| event.name())
        .collect();
    assert_eq!(names, vec!["warning", "beforeExit", "exit"]);
    assert_eq!(process.exit_code(), Some(2));
    assert_eq!(*host.exits.lock(), vec![2]);
}

#[test]
fn test_concurrent_exit_publishes_once() {
    let host = Arc::new(FakeHost::linux());
    let process = Arc::new(facade(Arc::clone(&host)));
    let mut rx = process.subscribe();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let p = Arc::clone(&process);
            std::thread::spawn(move || p.exit(Some(i)))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ProcessError::AlreadyExiting)));

    let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    let before: Vec<i32> = events
        .iter()
        .filter_map(|e| match e {
            ProcessEvent::BeforeExit { code } => Some(*code),
            _ => None,
        })
        .collect();
    assert_eq!(before.len(), 1);
    assert_eq!(*host.exits.lock(), before);
    assert_eq!(process.exit_code(), Some(before[0]));
}
