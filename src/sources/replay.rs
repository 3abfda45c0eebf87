//! Replay source for recorded captures
//!
//! Capture files hold one datagram per line:
//!
//! ```text
//! # arrival_ts payload
//! 1718000000.000000 ecg_01,41237,0,ECG
//! 1718000000.500000 ecg_01,41237,1,ECG
//! ```
//!
//! The arrival timestamp is kept verbatim, so a replayed capture classifies
//! exactly as it did live. Blank lines and `#` comments are skipped.

use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};

use crate::source::DatagramSource;
use crate::types::Datagram;
use crate::{GatewayError, Result};

/// Source that yields a fixed sequence of datagrams, then ends.
pub struct ReplaySource {
    datagrams: VecDeque<Datagram>,
    origin: String,
    total: usize,
}

impl ReplaySource {
    /// Create a replay source over in-memory datagrams.
    pub fn new(datagrams: impl IntoIterator<Item = Datagram>) -> Self {
        let datagrams: VecDeque<_> = datagrams.into_iter().collect();
        let total = datagrams.len();
        Self { datagrams, origin: "memory".to_string(), total }
    }

    /// Load a capture file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| GatewayError::file_error(path, e))?;
        let datagrams = parse_capture(&text, path)?;

        info!("Opened capture {}: {} datagrams", path.display(), datagrams.len());

        let mut source = Self::new(datagrams);
        source.origin = path.display().to_string();
        Ok(source)
    }

    /// Datagrams not yet handed out.
    pub fn remaining(&self) -> usize {
        self.datagrams.len()
    }

    /// Total datagrams in the replay.
    pub fn total(&self) -> usize {
        self.total
    }
}

#[async_trait::async_trait]
impl DatagramSource for ReplaySource {
    async fn next_datagram(&mut self) -> Result<Option<Datagram>> {
        let next = self.datagrams.pop_front();
        if next.is_none() {
            debug!("Reached end of replay");
        }
        Ok(next)
    }

    fn describe(&self) -> String {
        format!("replay://{}", self.origin)
    }
}

fn parse_capture(text: &str, path: &Path) -> Result<Vec<Datagram>> {
    let bad_line = |lineno: usize, reason: &str| GatewayError::Config {
        reason: format!("{}:{}: {}", path.display(), lineno + 1, reason),
    };

    let mut datagrams = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_start();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let (ts, payload) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| bad_line(lineno, "expected '<arrival_ts> <payload>'"))?;
        let arrival: f64 =
            ts.parse().map_err(|_| bad_line(lineno, "arrival timestamp is not a number"))?;
        if !arrival.is_finite() {
            return Err(bad_line(lineno, "arrival timestamp must be finite"));
        }

        datagrams.push(Datagram::new(payload.as_bytes(), None, arrival));
    }
    Ok(datagrams)
}
