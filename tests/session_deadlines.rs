//! Deadline and liveness behaviour, run on Tokio's paused clock.

use std::time::Duration;

use tokio::time::Instant;

use stream_client::lifecycle::Shutdown;
use stream_client::resilience::timeouts::StreamTimeouts;
use stream_client::session::error::{ConnectFailure, ReadFailure, TlsFailure};
use stream_client::session::{Session, SessionError, SessionState};

mod common;
use common::*;

#[tokio::test(start_paused = true)]
async fn unresponsive_address_times_out_connect() {
    let reporter = RecordingReporter::new();
    let tls = FakeTls::new(TlsBehavior::PassThrough);
    let handshakes = tls.handshakes.clone();
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.99:443"]),
        ScriptedTransport::new(vec![Connect::Hang]),
        tls,
        settings(),
        reporter.clone(),
    );

    let start = Instant::now();
    let err = session.start("example.test", "443").await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, SessionError::Connect(ConnectFailure::TimedOut(_))));
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31), "{:?}", elapsed);
    assert_eq!(reporter.failures().len(), 1);
    assert_eq!(reporter.failures()[0].0, "connect");
    assert_eq!(handshakes.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn hanging_lookup_times_out_resolve() {
    let reporter = RecordingReporter::new();
    let transport = ScriptedTransport::new(Vec::new());
    let attempts = transport.attempts();
    let mut session = Session::new(
        StaticResolver::hang(),
        transport,
        FakeTls::new(TlsBehavior::PassThrough),
        settings(),
        reporter.clone(),
    );

    let start = Instant::now();
    let err = session.start("example.test", "443").await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, SessionError::Resolve { .. }));
    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31), "{:?}", elapsed);
    assert_eq!(reporter.failures().len(), 1);
    assert_eq!(reporter.failures()[0].0, "resolve");
    assert!(attempts.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn oversized_deadline_does_not_overflow() {
    let mut settings = settings();
    settings.deadline = Duration::from_secs(i64::MAX as u64);
    let reporter = RecordingReporter::new();
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.10:443"]),
        ScriptedTransport::new(vec![Connect::Refuse]),
        FakeTls::new(TlsBehavior::PassThrough),
        settings,
        reporter.clone(),
    );

    let err = session.start("example.test", "443").await.unwrap_err();
    assert!(matches!(err, SessionError::Connect(ConnectFailure::Exhausted(_))));
    assert_eq!(reporter.failures()[0].0, "connect");
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_a_stalled_tls_handshake() {
    let (client, _server) = tokio::io::duplex(1024);
    let shutdown = Shutdown::new();
    let reporter = RecordingReporter::new();
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.10:443"]),
        ScriptedTransport::new(vec![Connect::Accept(client)]),
        FakeTls::new(TlsBehavior::Hang),
        settings(),
        reporter.clone(),
    )
    .with_shutdown(shutdown.subscribe());

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.trigger();
    });

    let start = Instant::now();
    let err = session.start("example.test", "443").await.unwrap_err();

    assert!(matches!(err, SessionError::Interrupted(SessionState::TlsHandshaking)));
    assert!(!err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(6), "{:?}", start.elapsed());
    assert_eq!(reporter.failures()[0].0, "shutdown");
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn tls_gets_a_fresh_window() {
    let (client, _server) = tokio::io::duplex(1024);
    let reporter = RecordingReporter::new();
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.10:443"]),
        ScriptedTransport::new(vec![Connect::AcceptAfter(Duration::from_secs(20), client)]),
        FakeTls::new(TlsBehavior::Hang),
        settings(),
        reporter.clone(),
    );

    let start = Instant::now();
    let err = session.start("example.test", "443").await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, SessionError::TlsHandshake(TlsFailure::TimedOut(_))));
    assert!(elapsed >= Duration::from_secs(50) && elapsed < Duration::from_secs(51), "{:?}", elapsed);
    assert_eq!(
        reporter.stages(),
        vec![
            SessionState::Resolving,
            SessionState::Connecting,
            SessionState::TlsHandshaking,
            SessionState::Failed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn configured_deadline_is_honoured() {
    let mut settings = settings();
    settings.deadline = Duration::from_secs(5);
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.99:443"]),
        ScriptedTransport::new(vec![Connect::Hang]),
        FakeTls::new(TlsBehavior::PassThrough),
        settings,
        RecordingReporter::new(),
    );

    let start = Instant::now();
    let err = session.start("example.test", "443").await.unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn deadline_does_not_apply_once_streaming() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let _peer = spawn_peer(
        server,
        vec![
            PeerAction::Idle(Duration::from_secs(120)),
            PeerAction::Send(binary(16)),
            PeerAction::Close,
        ],
    );

    let reporter = RecordingReporter::new();
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.10:443"]),
        ScriptedTransport::new(vec![Connect::Accept(client)]),
        FakeTls::new(TlsBehavior::PassThrough),
        settings(),
        reporter.clone(),
    );

    session.start("example.test", "443").await.unwrap();
    assert_eq!(reporter.byte_reports(), vec![16]);
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn silent_peer_hits_idle_timeout() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let _peer = spawn_peer(server, vec![PeerAction::Idle(Duration::from_secs(60))]);

    let mut settings = settings();
    settings.stream = StreamTimeouts {
        handshake: Duration::from_secs(30),
        idle: Some(Duration::from_secs(10)),
        keep_alive_pings: false,
    };
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.10:443"]),
        ScriptedTransport::new(vec![Connect::Accept(client)]),
        FakeTls::new(TlsBehavior::PassThrough),
        settings,
        RecordingReporter::new(),
    );

    let err = session.start("example.test", "443").await.unwrap_err();
    assert!(matches!(err, SessionError::Read(ReadFailure::IdleTimeout(_))));
    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn keep_alive_pings_hold_a_quiet_stream_open() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let _peer = spawn_peer(
        server,
        vec![
            PeerAction::Idle(Duration::from_secs(25)),
            PeerAction::Send(binary(8)),
            PeerAction::Close,
        ],
    );

    let mut settings = settings();
    settings.stream = StreamTimeouts {
        handshake: Duration::from_secs(30),
        idle: Some(Duration::from_secs(10)),
        keep_alive_pings: true,
    };
    let reporter = RecordingReporter::new();
    let mut session = Session::new(
        StaticResolver::ok(&["192.0.2.10:443"]),
        ScriptedTransport::new(vec![Connect::Accept(client)]),
        FakeTls::new(TlsBehavior::PassThrough),
        settings,
        reporter.clone(),
    );

    session.start("example.test", "443").await.unwrap();
    assert_eq!(reporter.byte_reports(), vec![8]);
}
