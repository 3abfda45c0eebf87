//! Traffic source for legitimate nodes and sybil clones
//!
//! A sender uses one session id for its whole lifetime and counts sequence
//! numbers up from zero. A sybil sender is the same thing pointed at an
//! identity it does not own.

use futures::StreamExt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::RunManifest;
use crate::parser::Payload;
use crate::{GatewayError, Result};

/// Settings for one sending process.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderConfig {
    pub node_id: String,
    pub msg_type: String,
    pub rate_pps: f64,
    pub duration: Duration,
    pub start_delay: Duration,
    pub session_id: u16,
    pub target: SocketAddr,
}

impl SenderConfig {
    /// Build a sender with a random session id.
    pub fn new(
        node_id: impl Into<String>,
        msg_type: impl Into<String>,
        rate_pps: f64,
        duration: Duration,
        target: SocketAddr,
    ) -> Result<Self> {
        let config = Self {
            node_id: node_id.into(),
            msg_type: msg_type.into(),
            rate_pps,
            duration,
            start_delay: Duration::ZERO,
            session_id: rand::random(),
            target,
        };
        config.validate()?;
        Ok(config)
    }

    /// Legitimate node simulation from the manifest's `node` section.
    pub fn node(manifest: &RunManifest, target: SocketAddr) -> Result<Self> {
        let node = &manifest.node;
        Self::new(
            &node.node_id,
            &node.msg_type,
            node.rate_pps,
            Duration::from_secs(manifest.duration_s),
            target,
        )
    }

    /// Sybil clone from the manifest's `attacker` section.
    pub fn sybil(manifest: &RunManifest, target: SocketAddr) -> Result<Self> {
        let attacker = &manifest.attacker;
        if !attacker.enabled {
            return Err(GatewayError::config("attacker.enabled is false in manifest"));
        }
        let start_delay = Duration::try_from_secs_f64(attacker.start_delay_s).map_err(|_| {
            GatewayError::config(format!(
                "attacker.start_delay_s must be a non-negative duration, got {}",
                attacker.start_delay_s
            ))
        })?;
        let config = Self::new(
            &attacker.target_node_id,
            &attacker.msg_type,
            attacker.attack_rate_pps,
            Duration::from_secs(manifest.duration_s),
            target,
        )?;
        Ok(config.with_start_delay(start_delay))
    }

    pub fn with_session_id(mut self, session_id: u16) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() || self.msg_type.trim().is_empty() {
            return Err(GatewayError::config("node_id and msg_type must not be empty"));
        }
        self.period()?;
        Ok(())
    }

    /// Interval between two packets.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the rate is not positive, or if the
    /// period would round to zero or overflow a [`Duration`].
    pub fn period(&self) -> Result<Duration> {
        if !self.rate_pps.is_finite() || self.rate_pps <= 0.0 {
            return Err(GatewayError::config("send rate must be > 0 packets per second"));
        }
        match Duration::try_from_secs_f64(1.0 / self.rate_pps) {
            Ok(period) if !period.is_zero() => Ok(period),
            _ => Err(GatewayError::config(format!(
                "send rate {} pps has no representable period",
                self.rate_pps
            ))),
        }
    }

    /// Wire payload for sequence number `seq`.
    pub fn payload(&self, seq: u32) -> String {
        Payload {
            node_id: self.node_id.clone(),
            session_id: self.session_id,
            seq,
            msg_type: self.msg_type.clone(),
        }
        .to_string()
    }
}

/// What a sender did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderReport {
    pub sent: u64,
    pub session_id: u16,
    pub last_seq: Option<u32>,
}

/// Send paced datagrams until the duration elapses or `cancel` fires.
///
/// Pacing is catch-up: a late tick is followed by immediate sends until the
/// schedule is met again, so the long-run rate matches `rate_pps`.
pub async fn run_sender(config: &SenderConfig, cancel: CancellationToken) -> Result<SenderReport> {
    let period = config.period()?;
    let local = match config.target.ip() {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    let socket =
        UdpSocket::bind(local).await.map_err(|source| GatewayError::Bind { addr: local, source })?;

    info!(
        node_id = %config.node_id,
        msg_type = %config.msg_type,
        session_id = config.session_id,
        rate_pps = config.rate_pps,
        target = %config.target,
        "Sender starting"
    );

    let mut report = SenderReport { sent: 0, session_id: config.session_id, last_seq: None };

    if !config.start_delay.is_zero() {
        debug!("Waiting {:?} before first packet", config.start_delay);
        tokio::select! {
            _ = cancel.cancelled() => return Ok(report),
            _ = tokio::time::sleep(config.start_delay) => {}
        }
    }

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let ticks = IntervalStream::new(ticker)
        .take_until(tokio::time::sleep(config.duration))
        .take_until(cancel.clone().cancelled_owned());
    let mut ticks = std::pin::pin!(ticks);

    let progress_every = ((config.rate_pps * 5.0) as u64).max(1);
    let mut seq: u32 = 0;

    while ticks.next().await.is_some() {
        let payload = config.payload(seq);
        socket
            .send_to(payload.as_bytes(), config.target)
            .await
            .map_err(|source| GatewayError::Send { target: config.target, source })?;

        report.sent += 1;
        report.last_seq = Some(seq);
        seq = seq.wrapping_add(1);

        if report.sent % progress_every == 0 {
            info!("[TX] sent={} last_seq={}", report.sent, seq.wrapping_sub(1));
        }
    }

    info!("Sender stopped: packets_sent={}", report.sent);
    Ok(report)
}
