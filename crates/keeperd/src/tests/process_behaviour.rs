//! Behaviour of the `start`, `stop` and `status` command plumbing.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use keeper_config::{CoordinationFile, RuntimeFiles};
use rstest::rstest;

use crate::boundary::ApplicationRegistry;
use crate::builtin::{IDLE_APPLICATION, builtin_registry};
use crate::exit::ExitStatus;
use crate::health::HealthReporter;
use crate::process::launch::{LaunchPlan, ServiceDeps, run_start_with};
use crate::process::{InstallationTarget, LaunchError, run_start, run_stop};
use crate::shutdown::ShutdownSettings;

use super::support::{
    ApplicationProbe, Hook, ImmediateShutdownSignal, RecordingHealthReporter, TestInstallation,
    installation,
};

fn plan<'a>(
    installation: &TestInstallation,
    registry: ApplicationRegistry,
    signal: &'a ImmediateShutdownSignal,
) -> LaunchPlan<&'a ImmediateShutdownSignal> {
    let reporter: Arc<dyn HealthReporter> = Arc::new(RecordingHealthReporter::default());
    LaunchPlan {
        layout: installation.layout(),
        services: ServiceDeps {
            registry: Arc::new(registry),
            reporter,
        },
        shutdown: signal,
        args: vec!["--flag".to_owned()],
    }
}

#[rstest]
fn start_runs_the_whole_lifecycle_and_cleans_up(installation: TestInstallation) {
    let probe = ApplicationProbe::default();
    let library = installation.add_library("server");
    let mut registry = ApplicationRegistry::new();
    registry.register_library(&library, "server", probe.factory());
    let signal = ImmediateShutdownSignal::default();

    run_start_with(plan(&installation, registry, &signal)).expect("lifecycle succeeds");

    assert_eq!(signal.waits(), 1);
    let hooks: Vec<Hook> = probe.calls().iter().map(|call| call.hook).collect();
    assert_eq!(hooks, vec![Hook::Init, Hook::Start, Hook::Stop, Hook::Destroy]);
    let files = RuntimeFiles::in_run_dir(installation.run_dir());
    assert!(!files.pid_path().exists());
    assert!(!files.health_path().exists());
}

#[rstest]
fn start_failure_skips_the_wait_and_maps_the_exit_status(installation: TestInstallation) {
    let probe = ApplicationProbe::default();
    probe.fail_on(Hook::Start);
    let library = installation.add_library("server");
    let mut registry = ApplicationRegistry::new();
    registry.register_library(&library, "server", probe.factory());
    let signal = ImmediateShutdownSignal::default();

    let error = run_start_with(plan(&installation, registry, &signal)).expect_err("start fails");

    assert_eq!(error.exit_status(), ExitStatus::Start);
    assert_eq!(signal.waits(), 0);
    assert!(!RuntimeFiles::in_run_dir(installation.run_dir()).pid_path().exists());
}

#[test]
fn missing_descriptor_creates_no_runtime_files() {
    let installation = TestInstallation::empty();
    std::fs::remove_dir_all(installation.run_dir()).expect("remove run dir");
    let signal = ImmediateShutdownSignal::default();

    let error = run_start_with(plan(&installation, builtin_registry(), &signal))
        .expect_err("configuration fails");

    assert_eq!(error.exit_status(), ExitStatus::ConfigurationLoad);
    assert!(!installation.run_dir().exists());
}

#[test]
fn builtin_idle_application_resolves_from_the_system_boundary() {
    let installation = TestInstallation::with_types(IDLE_APPLICATION, IDLE_APPLICATION);
    let signal = ImmediateShutdownSignal::default();

    run_start_with(plan(&installation, builtin_registry(), &signal)).expect("idle lifecycle");
    assert_eq!(signal.waits(), 1);
}

#[test]
fn stop_without_a_server_is_a_plain_failure() {
    let installation = TestInstallation::empty();
    let target = InstallationTarget::new(installation.home());

    let error = run_stop(&target, None).expect_err("no server");
    assert!(matches!(error, LaunchError::Shutdown { .. }));
    assert_eq!(error.exit_status(), ExitStatus::Failure);
}

#[test]
fn start_and_stop_round_trip_over_loopback() {
    let installation = TestInstallation::with_types(IDLE_APPLICATION, IDLE_APPLICATION);
    let target = InstallationTarget::new(installation.home());
    let coordination = CoordinationFile::in_run_dir(&installation.run_dir());

    let server_target = target.clone();
    let server = thread::spawn(move || {
        run_start(
            &server_target,
            ShutdownSettings::default().with_base_port(0),
            Vec::new(),
            Arc::new(builtin_registry()),
        )
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    while !coordination.exists() {
        assert!(Instant::now() < deadline, "listener never published its port");
        thread::sleep(Duration::from_millis(20));
    }
    let port = run_stop(&target, None).expect("stop");

    server
        .join()
        .expect("server thread")
        .expect("server lifecycle");
    assert!(port > 0);
    assert!(!coordination.exists());
}
