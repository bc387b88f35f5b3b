//! The three-phase session state machine.
//!
//! ```text
//! Open → SettingsExchange → AckExchange → Phase1 → Phase2 → ReadySync → ResultsExchange → Closed
//!                         ↘────────────── Fail ──────────────↙
//! ```
//!
//! Both peers walk the same states; the roles differ only at the bootstrap
//! and in the write-first/read-first ordering of the results exchange. The
//! ready sync and the initiator-writes-first rule exist to break the
//! results-exchange deadlock of both peers reading first.

use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use serlink_core::constants::{BOOTSTRAP_ACK, PROTOCOL_VERSION, READY_FRAME_LEN};
use serlink_core::frame::{READY_WIRE, is_ready};
use serlink_core::results::RESULTS_LEN;
use serlink_core::settings::SETTINGS_LEN;
use serlink_core::{PayloadPattern, Results, Settings};
use serlink_link::{Link, LinkError};

use crate::config::HarnessConfig;
use crate::engine::{StaleFrames, run_receive_phase, run_send_phase};
use crate::error::SessionError;
use crate::stats::Stats;

/// Drain pause after writing the settings image, letting the cable carry it
/// before the first data frame follows.
const SETTINGS_DRAIN: Duration = Duration::from_millis(100);
/// Poll interval while waiting for the peer's ready frame.
const READY_POLL: Duration = Duration::from_millis(100);
/// Attempts to read the peer's results image.
const RESULTS_ATTEMPTS: u32 = 3;
/// Budget per results read attempt.
const RESULTS_BUDGET: Duration = Duration::from_secs(15);
/// Backoff between results read attempts.
const RESULTS_RETRY_PAUSE: Duration = Duration::from_millis(500);

/// Which side of the session this peer drives. On the wire the roles are
/// called client (initiator) and server (responder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Slave,
}

impl Role {
    /// Wire name, used for the CLI and log file naming.
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::Master => "client",
            Role::Slave => "server",
        }
    }

    /// The self-test pattern this role transmits.
    fn send_pattern(self) -> PayloadPattern {
        match self {
            Role::Master => PayloadPattern::Ascending,
            Role::Slave => PayloadPattern::Descending,
        }
    }
}

/// Both peers' results after a completed session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOutcome {
    pub local: Results,
    pub peer: Results,
}

/// Run the initiator side: propose settings, send phase 1, receive phase 2,
/// then exchange results writing first.
pub fn run_master(
    link: &dyn Link,
    payload_size: u32,
    frame_count: u32,
    config: &HarnessConfig,
    cancel: &AtomicBool,
) -> Result<SessionOutcome, SessionError> {
    if frame_count == 0 {
        return Err(SessionError::Config(
            "frame count must be at least 1".into(),
        ));
    }
    let window_params = config.window.params()?;

    tracing::info!(
        payload_size,
        frame_count,
        version = PROTOCOL_VERSION,
        "master session starting"
    );
    std::thread::sleep(config.session.stabilization());

    // SettingsExchange: a bare 16-byte record on a line trusted to be quiet.
    let settings = Settings::new(payload_size, frame_count);
    link.write(&settings.serialize())
        .map_err(|e| handshake("settings exchange", &e))?;
    std::thread::sleep(SETTINGS_DRAIN);

    // AckExchange.
    let mut ack = [0u8; BOOTSTRAP_ACK.len()];
    link.read_exact_with_timeout(&mut ack, config.session.bootstrap_timeout())
        .map_err(|e| handshake("bootstrap ack", &e))?;
    if &ack != BOOTSTRAP_ACK {
        return Err(SessionError::Handshake {
            stage: "bootstrap ack",
            reason: format!("unexpected response {ack:02x?}"),
        });
    }
    tracing::info!("bootstrap complete");

    let started = Instant::now();
    let send = run_send_phase(
        link,
        Role::Master.send_pattern(),
        payload_size,
        frame_count,
        window_params,
        config.burst.max_frames,
        config.session.stall_timeout(),
        // Data frames surfacing here belong to the peer's phase 2, which we
        // have not started receiving yet; leave them to its retransmit.
        StaleFrames::Discard,
        cancel,
    )?;
    let recv = run_receive_phase(
        link,
        Role::Slave.send_pattern(),
        payload_size,
        frame_count,
        config.session.stall_timeout(),
        cancel,
    )?;
    let elapsed = started.elapsed();

    let local = Stats {
        total_received_bytes: recv.total_received_bytes,
        received_count: recv.received_count,
        error_count: recv.error_count,
        retransmit_count: send.retransmit_count,
    }
    .into_results(elapsed);

    // ReadySync: the initiator speaks first.
    std::thread::sleep(config.session.ready_pause());
    send_ready(link)?;
    await_ready(link, config.session.ready_timeout())?;

    // ResultsExchange: initiator writes first, then reads.
    link.write(&local.serialize())?;
    link.flush()?;
    tracing::info!("local results sent");
    let peer = read_results_with_retry(link)?;

    log_report(Role::Master, &settings, &local, &peer);
    Ok(SessionOutcome { local, peer })
}

/// Run the responder side: accept settings, receive phase 1, send phase 2,
/// then exchange results reading first.
pub fn run_slave(
    link: &dyn Link,
    config: &HarnessConfig,
    cancel: &AtomicBool,
) -> Result<SessionOutcome, SessionError> {
    let window_params = config.window.params()?;

    tracing::info!(version = PROTOCOL_VERSION, "slave session starting");
    std::thread::sleep(config.session.stabilization());

    // SettingsExchange.
    let mut raw = [0u8; SETTINGS_LEN];
    link.read_exact_with_timeout(&mut raw, config.session.settings_timeout())
        .map_err(|e| handshake("settings exchange", &e))?;
    let settings =
        Settings::parse(&raw).map_err(|e| handshake("settings exchange", &e))?;

    if settings.protocol_version != PROTOCOL_VERSION {
        return Err(SessionError::VersionMismatch {
            peer: settings.protocol_version,
            local: PROTOCOL_VERSION,
        });
    }
    if settings.frame_count == 0 {
        return Err(SessionError::Config(
            "peer proposed a zero frame count".into(),
        ));
    }
    tracing::info!(
        payload_size = settings.payload_size,
        frame_count = settings.frame_count,
        "settings accepted"
    );

    // AckExchange.
    link.write(BOOTSTRAP_ACK)
        .map_err(|e| handshake("bootstrap ack", &e))?;

    let started = Instant::now();
    let recv = run_receive_phase(
        link,
        Role::Master.send_pattern(),
        settings.payload_size,
        settings.frame_count,
        config.session.stall_timeout(),
        cancel,
    )?;
    let send = run_send_phase(
        link,
        Role::Slave.send_pattern(),
        settings.payload_size,
        settings.frame_count,
        window_params,
        config.burst.max_frames,
        config.session.stall_timeout(),
        // Data frames surfacing here are phase-1 duplicates whose acks were
        // lost; re-acking them unblocks the peer's window.
        StaleFrames::Reack,
        cancel,
    )?;
    let elapsed = started.elapsed();

    let local = Stats {
        total_received_bytes: recv.total_received_bytes,
        received_count: recv.received_count,
        error_count: recv.error_count,
        retransmit_count: send.retransmit_count,
    }
    .into_results(elapsed);

    // ReadySync: the responder listens first.
    std::thread::sleep(config.session.ready_pause());
    await_ready(link, config.session.ready_timeout())?;
    send_ready(link)?;

    // ResultsExchange: responder reads first, then writes.
    let peer = read_results_with_retry(link)?;
    link.write(&local.serialize())?;
    link.flush()?;
    tracing::info!("local results sent");

    log_report(Role::Slave, &settings, &local, &peer);
    Ok(SessionOutcome { local, peer })
}

fn handshake(stage: &'static str, error: &dyn std::fmt::Display) -> SessionError {
    SessionError::Handshake {
        stage,
        reason: error.to_string(),
    }
}

fn send_ready(link: &dyn Link) -> Result<(), SessionError> {
    link.write(&READY_WIRE)?;
    tracing::info!("ready sent");
    Ok(())
}

/// Wait for the peer's ready frame, discarding stray bytes with the
/// remaining budget.
fn await_ready(link: &dyn Link, budget: Duration) -> Result<(), SessionError> {
    tracing::info!("waiting for ready");
    let deadline = Instant::now() + budget;
    let mut buf = [0u8; READY_FRAME_LEN];

    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(SessionError::Handshake {
                stage: "ready sync",
                reason: format!("no ready frame within {budget:?}"),
            });
        }
        match link.read_exact_with_timeout(&mut buf, READY_POLL.min(deadline - now)) {
            Ok(()) if is_ready(&buf) => {
                tracing::info!("ready received");
                return Ok(());
            }
            Ok(()) => {
                tracing::warn!(bytes = ?buf, "discarding unexpected bytes while awaiting ready");
            }
            Err(e) if e.is_timeout() => {}
            Err(e) => return Err(SessionError::Transport(e)),
        }
    }
}

fn read_results_with_retry(link: &dyn Link) -> Result<Results, SessionError> {
    let mut raw = [0u8; RESULTS_LEN];

    for attempt in 1..=RESULTS_ATTEMPTS {
        tracing::info!(attempt, max = RESULTS_ATTEMPTS, "reading peer results");
        match link.read_exact_with_timeout(&mut raw, RESULTS_BUDGET) {
            Ok(()) => {
                let results = Results::parse(&raw)
                    .map_err(|e| handshake("results exchange", &e))?;
                tracing::info!("peer results received");
                return Ok(results);
            }
            Err(LinkError::Timeout { received, expected }) if received > 0 => {
                tracing::warn!(received, expected, "partial results read, retrying");
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(attempt, "results read timed out, retrying");
            }
            Err(e) => return Err(SessionError::Transport(e)),
        }
        if attempt < RESULTS_ATTEMPTS {
            std::thread::sleep(RESULTS_RETRY_PAUSE);
        }
    }

    Err(SessionError::Handshake {
        stage: "results exchange",
        reason: format!("no results after {RESULTS_ATTEMPTS} attempts"),
    })
}

fn log_report(role: Role, settings: &Settings, local: &Results, peer: &Results) {
    tracing::info!(
        role = role.wire_name(),
        payload_size = settings.payload_size,
        frame_count = settings.frame_count,
        version = settings.protocol_version,
        "session complete"
    );
    for (side, results) in [("local", local), ("peer", peer)] {
        tracing::info!(
            side,
            received = results.received_count,
            bytes = results.total_received_bytes,
            errors = results.error_count,
            retransmits = results.retransmit_count,
            elapsed_s = results.elapsed_seconds,
            throughput_mb_per_s = results.throughput_mb_per_s,
            chars_per_s = results.chars_per_s,
            "results"
        );
    }
}
