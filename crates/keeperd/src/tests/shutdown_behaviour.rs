//! Behaviour of the loopback shutdown channel.

use std::io::Write;
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::path::Path;
use std::thread;
use std::time::Duration;

use keeper_config::CoordinationFile;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::exit::ExitStatus;
use crate::shutdown::{ShutdownClient, ShutdownError, ShutdownListener, ShutdownSettings};

#[fixture]
fn run_dir() -> TempDir {
    TempDir::new().expect("create run dir")
}

fn settings() -> ShutdownSettings {
    ShutdownSettings::default()
        .with_base_port(0)
        .with_read_timeout(Duration::from_secs(2))
}

fn send_raw(port: u16, payload: &[u8]) {
    let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).expect("connect");
    stream.write_all(payload).expect("write payload");
}

fn coordination(dir: &Path) -> CoordinationFile {
    CoordinationFile::in_run_dir(dir)
}

#[rstest]
fn exact_token_releases_the_listener_and_removes_the_file(run_dir: TempDir) {
    let listener = ShutdownListener::bind(run_dir.path(), &settings()).expect("bind listener");
    let port = listener.port();
    assert_eq!(
        coordination(run_dir.path()).read_port().expect("read port"),
        Some(port)
    );

    let waiter = thread::spawn(move || listener.await_command());
    ShutdownClient::new(run_dir.path())
        .send_shutdown_command()
        .expect("send shutdown");
    let report = waiter
        .join()
        .expect("listener thread")
        .expect("listener result");

    assert_eq!(report.port(), port);
    assert!(report.rejected().is_empty());
    assert!(!coordination(run_dir.path()).exists());
}

#[rstest]
fn malformed_commands_are_rejected_and_the_wait_continues(run_dir: TempDir) {
    let listener = ShutdownListener::bind(run_dir.path(), &settings()).expect("bind listener");
    let port = listener.port();
    let waiter = thread::spawn(move || listener.await_command());

    for payload in [
        b"SHUTDOW".as_slice(),
        b"shutdown".as_slice(),
        b"SHUTDOWN\0extra".as_slice(),
    ] {
        send_raw(port, payload);
    }
    assert!(
        coordination(run_dir.path()).exists(),
        "listener must still be waiting"
    );
    ShutdownClient::new(run_dir.path())
        .with_port(port)
        .send_shutdown_command()
        .expect("send shutdown");

    let report = waiter
        .join()
        .expect("listener thread")
        .expect("listener result");
    assert_eq!(
        report.rejected(),
        ["SHUTDOW".to_owned(), "shutdown".to_owned(), "SHUTDOWN".to_owned()]
    );
    assert!(!coordination(run_dir.path()).exists());
}

#[rstest]
fn stale_coordination_file_is_replaced(run_dir: TempDir) {
    coordination(run_dir.path())
        .write_port(1)
        .expect("write stale file");

    let listener = ShutdownListener::bind(run_dir.path(), &settings()).expect("bind listener");
    let recorded = coordination(run_dir.path()).read_port().expect("read port");

    assert_eq!(recorded, Some(listener.port()));
    assert_ne!(recorded, Some(1));
}

#[rstest]
fn dropping_an_unused_listener_removes_the_file(run_dir: TempDir) {
    let listener = ShutdownListener::bind(run_dir.path(), &settings()).expect("bind listener");
    assert!(coordination(run_dir.path()).exists());
    drop(listener);
    assert!(!coordination(run_dir.path()).exists());
}

#[rstest]
fn occupied_base_port_moves_the_search_upward(run_dir: TempDir) {
    let occupied = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("occupy a port");
    let base_port = occupied.local_addr().expect("local addr").port();
    if base_port == u16::MAX {
        return;
    }

    let listener = ShutdownListener::bind(
        run_dir.path(),
        &ShutdownSettings::default().with_base_port(base_port),
    )
    .expect("bind listener");
    assert!(listener.port() > base_port);
}

#[rstest]
fn sender_without_coordination_file_reports_not_running(run_dir: TempDir) {
    let error = ShutdownClient::new(run_dir.path())
        .send_shutdown_command()
        .expect_err("no server is running");

    assert!(matches!(error, ShutdownError::NotRunning { .. }));
    assert_eq!(error.exit_status(), ExitStatus::Failure);
    assert!(error.to_string().contains("does not appear to be running"));
}

#[rstest]
fn sender_reports_connection_failures(run_dir: TempDir) {
    let port = {
        let probe = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("reserve port");
        probe.local_addr().expect("local addr").port()
    };
    coordination(run_dir.path())
        .write_port(port)
        .expect("write port");

    let error = ShutdownClient::new(run_dir.path())
        .send_shutdown_command()
        .expect_err("nothing listens on the port");
    assert!(matches!(error, ShutdownError::Connect { port: failed, .. } if failed == port));
}
